//! Existing-address search and IP-to-ID resolution

use crate::error::ControllerError;
use crate::reconciler::AddressReconciler;
use phpipam_client::Address;
use tracing::debug;

impl AddressReconciler {
    /// Find the address already allocated for `hostname`, if any.
    ///
    /// With an index, only addresses whose description equals the index are
    /// considered. Without one, the hostname alone must be unique.
    pub async fn locate_existing(&self, hostname: &str, index: Option<&str>) -> Result<Option<Address>, ControllerError> {
        let mut candidates = self.client.search_addresses_by_hostname(hostname).await?;
        debug!("Found {} addresses for hostname {}", candidates.len(), hostname);

        if let Some(index) = index.filter(|index| !index.is_empty()) {
            candidates.retain(|address| address.description == index);
            if candidates.len() > 1 {
                return Err(ControllerError::AmbiguousIndex {
                    hostname: hostname.to_string(),
                    index: index.to_string(),
                });
            }
        } else if candidates.len() > 1 {
            return Err(ControllerError::AmbiguousHostname(hostname.to_string()));
        }

        Ok(candidates.pop())
    }

    /// Resolve an IP to the ID of the single address record holding it.
    pub async fn resolve_address_id(&self, ip: &str) -> Result<String, ControllerError> {
        let mut matches = self.client.search_addresses_by_ip(ip).await?;
        if matches.len() != 1 {
            return Err(ControllerError::OverAllocated {
                ip: ip.to_string(),
                count: matches.len(),
            });
        }

        let address = matches.remove(0);
        debug!("Resolved IP {} to address ID {}", ip, address.id);
        Ok(address.id)
    }
}
