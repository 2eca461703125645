//! Mock PhpIpamClient for unit testing
//!
//! This module provides a mock implementation of PhpIpamClientTrait that can be used
//! in unit tests without requiring a running phpIPAM instance.
//!
//! The mock is organized into:
//! - `ipam.rs` - section, subnet and address operations over the in-memory store
//! - `helpers.rs` - IPv4 arithmetic for subnet calculations and first-free allocation

mod helpers;
mod ipam;

use crate::error::PhpIpamError;
use crate::models::*;
use crate::phpipam_trait::PhpIpamClientTrait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations whose failure can be injected into the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    ListSections,
    GetSection,
    ListSectionSubnets,
    GetSubnet,
    GetAddress,
    SearchAddresses,
    Allocate,
    UpdateHostname,
    Delete,
}

/// Mock PhpIpamClient for testing
///
/// This mock stores sections, subnets and addresses in memory, keyed by
/// numeric ID so listings come back in creation order.
#[derive(Clone)]
pub struct MockPhpIpamClient {
    pub(crate) base_url: String,
    // In-memory storage for resources
    pub(crate) sections: Arc<Mutex<BTreeMap<u64, Section>>>,
    pub(crate) subnets: Arc<Mutex<BTreeMap<u64, Subnet>>>,
    pub(crate) addresses: Arc<Mutex<BTreeMap<u64, Address>>>,
    // Injected failures and call accounting
    pub(crate) failures: Arc<Mutex<HashMap<MockOperation, String>>>,
    pub(crate) calls: Arc<Mutex<HashMap<MockOperation, usize>>>,
    // Allocation behaviour switches
    pub(crate) allocation_yield: Arc<AtomicBool>,
    pub(crate) omit_allocated_ids: Arc<AtomicBool>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPhpIpamClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            sections: Arc::new(Mutex::new(BTreeMap::new())),
            subnets: Arc::new(Mutex::new(BTreeMap::new())),
            addresses: Arc::new(Mutex::new(BTreeMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(HashMap::new())),
            allocation_yield: Arc::new(AtomicBool::new(false)),
            omit_allocated_ids: Arc::new(AtomicBool::new(false)),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a section to the mock store (for test setup)
    pub fn add_section(&self, name: &str) -> Section {
        let id = self.next_id();
        let section = Section {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
        };
        lock(&self.sections).insert(id, section.clone());
        section
    }

    /// Add a subnet to the mock store (for test setup)
    ///
    /// `cidr` is an IPv4 network such as "10.0.0.0/24"; the calculation block
    /// is derived from it the way phpIPAM does.
    pub fn add_subnet(&self, section_id: &str, cidr: &str, description: &str, gateway: Option<&str>) -> Subnet {
        let id = self.next_id();
        let subnet = helpers::build_subnet(id, section_id, cidr, description, gateway);
        lock(&self.subnets).insert(id, subnet.clone());
        subnet
    }

    /// Add an address record directly (for test setup)
    ///
    /// An empty `id` is replaced by a generated one.
    pub fn add_address(&self, mut address: Address) -> Address {
        let id = match address.id.parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                let id = self.next_id();
                address.id = id.to_string();
                id
            }
        };
        lock(&self.addresses).insert(id, address.clone());
        address
    }

    /// Remove a section without touching its subnets (dangling reference setup)
    pub fn remove_section(&self, id: &str) {
        if let Ok(id) = id.parse::<u64>() {
            lock(&self.sections).remove(&id);
        }
    }

    /// Remove a subnet without touching its addresses (dangling reference setup)
    pub fn remove_subnet(&self, id: &str) {
        if let Ok(id) = id.parse::<u64>() {
            lock(&self.subnets).remove(&id);
        }
    }

    /// Snapshot of every stored address
    pub fn addresses(&self) -> Vec<Address> {
        lock(&self.addresses).values().cloned().collect()
    }

    /// Make every subsequent call of `operation` fail with an API error
    pub fn fail_on(&self, operation: MockOperation, message: impl Into<String>) {
        lock(&self.failures).insert(operation, message.into());
    }

    /// Stop failing `operation`
    pub fn clear_failure(&self, operation: MockOperation) {
        lock(&self.failures).remove(&operation);
    }

    /// Number of times `operation` has been called
    pub fn call_count(&self, operation: MockOperation) -> usize {
        lock(&self.calls).get(&operation).copied().unwrap_or_default()
    }

    /// Yield to the runtime between the used-address scan and the insert of
    /// a first-free allocation
    ///
    /// Concurrent unsynchronised allocations can then pick the same address,
    /// as they can against a real phpIPAM.
    pub fn yield_during_allocation(&self, enabled: bool) {
        self.allocation_yield.store(enabled, Ordering::SeqCst);
    }

    /// Leave the new address ID out of first-free replies
    pub fn omit_allocated_ids(&self, omit: bool) {
        self.omit_allocated_ids.store(omit, Ordering::SeqCst);
    }

    /// Count the call and return the injected failure, if any
    pub(crate) fn enter(&self, operation: MockOperation) -> Result<(), PhpIpamError> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        match lock(&self.failures).get(&operation) {
            Some(message) => Err(PhpIpamError::Api(message.clone())),
            None => Ok(()),
        }
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }
}

#[async_trait::async_trait]
impl PhpIpamClientTrait for MockPhpIpamClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn authenticate(&self) -> Result<(), PhpIpamError> {
        Ok(())
    }

    async fn list_sections(&self) -> Result<Vec<Section>, PhpIpamError> {
        ipam::list_sections(self).await
    }

    async fn get_section(&self, id: &str) -> Result<Section, PhpIpamError> {
        ipam::get_section(self, id).await
    }

    async fn list_section_subnets(&self, section_id: &str) -> Result<Vec<Subnet>, PhpIpamError> {
        ipam::list_section_subnets(self, section_id).await
    }

    async fn get_subnet(&self, id: &str) -> Result<Subnet, PhpIpamError> {
        ipam::get_subnet(self, id).await
    }

    async fn get_address(&self, id: &str) -> Result<Address, PhpIpamError> {
        ipam::get_address(self, id).await
    }

    async fn search_addresses_by_hostname(&self, hostname: &str) -> Result<Vec<Address>, PhpIpamError> {
        ipam::search_addresses_by_hostname(self, hostname).await
    }

    async fn search_addresses_by_ip(&self, ip: &str) -> Result<Vec<Address>, PhpIpamError> {
        ipam::search_addresses_by_ip(self, ip).await
    }

    async fn create_address_first_free(&self, subnet_id: &str, request: FirstFreeRequest) -> Result<AllocatedAddress, PhpIpamError> {
        ipam::create_address_first_free(self, subnet_id, request).await
    }

    async fn update_address_hostname(&self, id: &str, hostname: &str) -> Result<(), PhpIpamError> {
        ipam::update_address_hostname(self, id, hostname).await
    }

    async fn delete_address(&self, id: &str) -> Result<(), PhpIpamError> {
        ipam::delete_address(self, id).await
    }
}
