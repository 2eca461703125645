//! Section and subnet name resolution
//!
//! phpIPAM identifies sections by name and, for this resource, subnets by
//! their description within a section. Both must match exactly one object.

use crate::error::{ControllerError, NameKind};
use crate::reconciler::AddressReconciler;
use tracing::debug;

impl AddressReconciler {
    /// Resolve a section name to its ID.
    pub async fn resolve_section(&self, name: &str) -> Result<String, ControllerError> {
        let sections = self.client.list_sections().await?;
        let matches: Vec<String> = sections
            .into_iter()
            .filter(|section| section.name == name)
            .map(|section| section.id)
            .collect();

        let id = single_match(NameKind::Section, name, matches)?;
        debug!("Resolved section {} to ID {}", name, id);
        Ok(id)
    }

    /// Resolve a subnet description within a section to the subnet ID.
    pub async fn resolve_subnet(&self, section_id: &str, description: &str) -> Result<String, ControllerError> {
        let subnets = self.client.list_section_subnets(section_id).await?;
        let matches: Vec<String> = subnets
            .into_iter()
            .filter(|subnet| subnet.description == description)
            .map(|subnet| subnet.id)
            .collect();

        let id = single_match(NameKind::Subnet, description, matches)?;
        debug!("Resolved subnet {} in section {} to ID {}", description, section_id, id);
        Ok(id)
    }
}

fn single_match(kind: NameKind, name: &str, mut ids: Vec<String>) -> Result<String, ControllerError> {
    match ids.len() {
        0 => Err(ControllerError::NotFound {
            kind,
            name: name.to_string(),
        }),
        1 => Ok(ids.remove(0)),
        count => Err(ControllerError::AmbiguousName {
            kind,
            name: name.to_string(),
            count,
        }),
    }
}
