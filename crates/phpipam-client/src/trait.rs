//! PhpIpamClient trait for mocking
//!
//! This trait abstracts the phpIPAM client to enable mocking in unit tests.
//! The concrete PhpIpamClient implements this trait, and tests use
//! `MockPhpIpamClient` (feature `test-util`).

use crate::error::PhpIpamError;
use crate::models::*;

/// Trait for phpIPAM API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PhpIpamClientTrait: Send + Sync {
    /// Get the server URL
    fn base_url(&self) -> &str;

    /// Log in and obtain a fresh API token
    async fn authenticate(&self) -> Result<(), PhpIpamError>;

    // Sections
    async fn list_sections(&self) -> Result<Vec<Section>, PhpIpamError>;
    async fn get_section(&self, id: &str) -> Result<Section, PhpIpamError>;
    async fn list_section_subnets(&self, section_id: &str) -> Result<Vec<Subnet>, PhpIpamError>;

    // Subnets
    async fn get_subnet(&self, id: &str) -> Result<Subnet, PhpIpamError>;

    // Addresses
    async fn get_address(&self, id: &str) -> Result<Address, PhpIpamError>;
    async fn search_addresses_by_hostname(&self, hostname: &str) -> Result<Vec<Address>, PhpIpamError>;
    async fn search_addresses_by_ip(&self, ip: &str) -> Result<Vec<Address>, PhpIpamError>;
    async fn create_address_first_free(&self, subnet_id: &str, request: FirstFreeRequest) -> Result<AllocatedAddress, PhpIpamError>;
    async fn update_address_hostname(&self, id: &str, hostname: &str) -> Result<(), PhpIpamError>;
    async fn delete_address(&self, id: &str) -> Result<(), PhpIpamError>;
}
