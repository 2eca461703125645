//! Denormalized read view of a managed address

use crate::error::ControllerError;
use crate::reconciler::AddressReconciler;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Address joined with its subnet and section, as reported to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInformation {
    pub hostname: String,
    pub ip: String,
    /// Section name
    pub section: String,
    /// Subnet description
    pub subnet: String,
    pub broadcast: String,
    pub gateway: String,
    pub bitmask: String,
    /// Recovered from a numeric address description
    pub index: Option<String>,
}

impl AddressReconciler {
    /// Rebuild the view of an address from phpIPAM.
    ///
    /// Returns `Ok(None)` when the address itself is gone. A missing subnet or
    /// section is an error.
    pub async fn fetch_info(&self, address_id: &str) -> Result<Option<AddressInformation>, ControllerError> {
        let address = match self.client.get_address(address_id).await {
            Ok(address) => address,
            Err(e) if e.is_not_found() => {
                debug!("Address {} no longer exists", address_id);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let index = self
            .client
            .search_addresses_by_hostname(&address.hostname)
            .await?
            .into_iter()
            .find(|candidate| candidate.id == address.id)
            .and_then(|candidate| numeric_index(&candidate.description));

        let subnet = match self.client.get_subnet(&address.subnet_id).await {
            Ok(subnet) => subnet,
            Err(e) if e.is_not_found() => return Err(ControllerError::SubnetNotFound(address.subnet_id)),
            Err(e) => return Err(e.into()),
        };

        let section = match self.client.get_section(&subnet.section_id).await {
            Ok(section) => section,
            Err(e) if e.is_not_found() => return Err(ControllerError::SectionNotFound(subnet.section_id)),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(AddressInformation {
            gateway: subnet.gateway_ip().to_string(),
            hostname: address.hostname,
            ip: address.ip,
            section: section.name,
            subnet: subnet.description,
            broadcast: subnet.calculation.broadcast,
            bitmask: subnet.calculation.bitmask,
            index,
        }))
    }
}

/// Descriptions that are not integers are free text, not an index
fn numeric_index(description: &str) -> Option<String> {
    description.parse::<i64>().ok().map(|_| description.to_string())
}
