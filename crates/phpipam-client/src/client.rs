//! phpIPAM API client
//!
//! Implements the phpIPAM REST API v2 client for section, subnet and address
//! operations. Based on the phpIPAM API structure: `/api/{app}/sections/`,
//! `/api/{app}/subnets/` and `/api/{app}/addresses/`.

use crate::common::{path_segment, HttpClient};
use crate::error::PhpIpamError;
use crate::models::*;
use crate::phpipam_trait::PhpIpamClientTrait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Connection settings for a phpIPAM server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server URL including scheme, e.g. "https://ipam.example.com"
    pub server_url: String,
    /// API application ID configured in phpIPAM (Administration > API)
    pub app_id: String,
    pub username: String,
    pub password: String,
    /// Accept self-signed or otherwise invalid TLS certificates
    pub ssl_skip_verify: bool,
}

/// phpIPAM API client
pub struct PhpIpamClient {
    http: HttpClient,
}

impl PhpIpamClient {
    /// Create a new phpIPAM client
    ///
    /// No request is made here; the API token is obtained on first use or by
    /// calling [`PhpIpamClient::authenticate`].
    pub fn new(config: ClientConfig) -> Result<Self, PhpIpamError> {
        if config.server_url.is_empty() {
            return Err(PhpIpamError::InvalidRequest("server URL is empty".to_string()));
        }
        if config.app_id.is_empty() {
            return Err(PhpIpamError::InvalidRequest("API application ID is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(config.ssl_skip_verify)
            .build()
            .map_err(PhpIpamError::Http)?;

        Ok(Self {
            http: HttpClient::new(
                client,
                config.server_url,
                config.app_id,
                config.username,
                config.password,
            ),
        })
    }

    /// Get the server URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Log in and cache a fresh API token
    ///
    /// Useful at configure time to surface bad credentials before any
    /// resource operation runs.
    pub async fn authenticate(&self) -> Result<(), PhpIpamError> {
        self.http.authenticate().await.map(|_| ())
    }

    /// List all sections
    pub async fn list_sections(&self) -> Result<Vec<Section>, PhpIpamError> {
        debug!("Listing phpIPAM sections");
        self.http.get_list("sections/").await
    }

    /// Get a section by ID
    pub async fn get_section(&self, id: &str) -> Result<Section, PhpIpamError> {
        debug!("Fetching section {} from phpIPAM", id);
        self.http
            .get(&format!("sections/{}/", path_segment(id)))
            .await
            .map_err(|e| match e {
                PhpIpamError::NotFound(_) => PhpIpamError::NotFound(format!("Section {} not found", id)),
                other => other,
            })
    }

    /// List the subnets of a section
    pub async fn list_section_subnets(&self, section_id: &str) -> Result<Vec<Subnet>, PhpIpamError> {
        debug!("Listing subnets of section {}", section_id);
        self.http
            .get_list(&format!("sections/{}/subnets/", path_segment(section_id)))
            .await
    }

    /// Get a subnet by ID
    pub async fn get_subnet(&self, id: &str) -> Result<Subnet, PhpIpamError> {
        debug!("Fetching subnet {} from phpIPAM", id);
        self.http
            .get(&format!("subnets/{}/", path_segment(id)))
            .await
            .map_err(|e| match e {
                PhpIpamError::NotFound(_) => PhpIpamError::NotFound(format!("Subnet {} not found", id)),
                other => other,
            })
    }

    /// Get an address by ID
    pub async fn get_address(&self, id: &str) -> Result<Address, PhpIpamError> {
        debug!("Fetching address {} from phpIPAM", id);
        self.http
            .get(&format!("addresses/{}/", path_segment(id)))
            .await
            .map_err(|e| match e {
                PhpIpamError::NotFound(_) => PhpIpamError::NotFound(format!("Address {} not found", id)),
                other => other,
            })
    }

    /// Search addresses by exact hostname
    pub async fn search_addresses_by_hostname(&self, hostname: &str) -> Result<Vec<Address>, PhpIpamError> {
        debug!("Searching addresses by hostname: {}", hostname);
        self.http
            .get_list(&format!("addresses/search_hostname/{}/", path_segment(hostname)))
            .await
    }

    /// Search addresses by literal IP
    pub async fn search_addresses_by_ip(&self, ip: &str) -> Result<Vec<Address>, PhpIpamError> {
        debug!("Searching addresses by IP: {}", ip);
        self.http
            .get_list(&format!("addresses/search/{}/", path_segment(ip)))
            .await
    }

    /// Allocate the first free address in a subnet
    ///
    /// phpIPAM picks the address server-side; the reply carries the new IP
    /// in `data` and the new record's ID in `id`.
    pub async fn create_address_first_free(
        &self,
        subnet_id: &str,
        request: FirstFreeRequest,
    ) -> Result<AllocatedAddress, PhpIpamError> {
        if request.hostname.is_empty() {
            return Err(PhpIpamError::InvalidRequest("hostname is required".to_string()));
        }

        let body = serde_json::to_value(&request)?;
        debug!("Allocating first free address in subnet {} for {}", subnet_id, request.hostname);

        let envelope: ApiResponse<String> = self.http
            .post(&format!("addresses/first_free/{}/", path_segment(subnet_id)), &body)
            .await?;

        let ip = envelope.data.filter(|ip| !ip.is_empty()).ok_or_else(|| {
            PhpIpamError::Api(format!(
                "No address was allocated in subnet {}: {}",
                subnet_id,
                envelope.message.unwrap_or_default()
            ))
        })?;

        Ok(AllocatedAddress {
            id: envelope.id,
            ip,
            subnet_id: subnet_id.to_string(),
        })
    }

    /// Change the hostname of an address
    pub async fn update_address_hostname(&self, id: &str, hostname: &str) -> Result<(), PhpIpamError> {
        debug!("Updating hostname of address {} to {}", id, hostname);
        let body = serde_json::json!({ "hostname": hostname });
        self.http
            .patch(&format!("addresses/{}/", path_segment(id)), &body)
            .await
    }

    /// Delete an address
    pub async fn delete_address(&self, id: &str) -> Result<(), PhpIpamError> {
        debug!("Deleting address: {}", id);
        self.http
            .delete(&format!("addresses/{}/", path_segment(id)))
            .await
    }
}

#[async_trait::async_trait]
impl PhpIpamClientTrait for PhpIpamClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn authenticate(&self) -> Result<(), PhpIpamError> {
        self.authenticate().await
    }

    async fn list_sections(&self) -> Result<Vec<Section>, PhpIpamError> {
        self.list_sections().await
    }

    async fn get_section(&self, id: &str) -> Result<Section, PhpIpamError> {
        self.get_section(id).await
    }

    async fn list_section_subnets(&self, section_id: &str) -> Result<Vec<Subnet>, PhpIpamError> {
        self.list_section_subnets(section_id).await
    }

    async fn get_subnet(&self, id: &str) -> Result<Subnet, PhpIpamError> {
        self.get_subnet(id).await
    }

    async fn get_address(&self, id: &str) -> Result<Address, PhpIpamError> {
        self.get_address(id).await
    }

    async fn search_addresses_by_hostname(&self, hostname: &str) -> Result<Vec<Address>, PhpIpamError> {
        self.search_addresses_by_hostname(hostname).await
    }

    async fn search_addresses_by_ip(&self, ip: &str) -> Result<Vec<Address>, PhpIpamError> {
        self.search_addresses_by_ip(ip).await
    }

    async fn create_address_first_free(&self, subnet_id: &str, request: FirstFreeRequest) -> Result<AllocatedAddress, PhpIpamError> {
        self.create_address_first_free(subnet_id, request).await
    }

    async fn update_address_hostname(&self, id: &str, hostname: &str) -> Result<(), PhpIpamError> {
        self.update_address_hostname(id, hostname).await
    }

    async fn delete_address(&self, id: &str) -> Result<(), PhpIpamError> {
        self.delete_address(id).await
    }
}
