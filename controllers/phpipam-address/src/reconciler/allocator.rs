//! First-free allocation and release

use crate::error::ControllerError;
use crate::reconciler::AddressReconciler;
use phpipam_client::{AllocatedAddress, FirstFreeRequest};
use tracing::debug;

impl AddressReconciler {
    /// Allocate the first free address of a subnet for `hostname`.
    ///
    /// The index, when set, is stored as the address description so the
    /// locator can find the address again.
    pub async fn allocate(
        &self,
        subnet_id: &str,
        hostname: &str,
        index: Option<&str>,
    ) -> Result<AllocatedAddress, ControllerError> {
        let request = FirstFreeRequest {
            hostname: hostname.to_string(),
            description: index.filter(|index| !index.is_empty()).map(str::to_string),
            owner: Some(self.owner.clone()),
        };

        let allocated = self.client.create_address_first_free(subnet_id, request).await?;
        debug!("Allocated {} in subnet {} for {}", allocated.ip, subnet_id, hostname);
        Ok(allocated)
    }

    /// Delete an address.
    pub async fn release(&self, address_id: &str) -> Result<(), ControllerError> {
        self.client.delete_address(address_id).await?;
        debug!("Released address ID {}", address_id);
        Ok(())
    }
}
