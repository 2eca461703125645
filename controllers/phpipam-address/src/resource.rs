//! Resource data contract between the orchestration engine and the reconciler.
//!
//! A [`ResourceData`] carries the desired fields, the identity assigned by a
//! previous create, and the prior state used for change detection. The
//! `create`, `read`, `update` and `delete` functions here translate it into
//! reconciler calls and write the results back.

use crate::error::ControllerError;
use crate::provider::ProviderConfig;
use crate::reconciler::{AddressInformation, AddressReconciler, AddressSpec, ChangeSet};
use crate::schema::{self, Field};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Persisted state of one address resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressState {
    /// phpIPAM address ID; `None` until created or after the address is gone
    pub id: Option<String>,
    pub hostname: String,
    pub section: String,
    pub subnet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    pub ip_address: String,
    pub broadcast: String,
    pub gateway: String,
    pub bitmask: String,
}

/// JSON document exchanged on stdin
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateDocument {
    #[serde(flatten)]
    pub state: AddressState,
    /// State recorded by the previous operation, for change detection
    #[serde(default)]
    pub prior: Option<AddressState>,
    /// Explicit provider settings; unset values fall back to the environment
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Working copy of a resource during one operation
#[derive(Debug, Clone)]
pub struct ResourceData {
    state: AddressState,
    prior: Option<AddressState>,
}

impl ResourceData {
    pub fn new(state: AddressState, prior: Option<AddressState>) -> Self {
        Self { state, prior }
    }

    pub fn id(&self) -> Option<&str> {
        self.state.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.state.id = Some(id.into());
    }

    /// Mark the resource as absent
    pub fn clear_id(&mut self) {
        self.state.id = None;
    }

    pub fn state(&self) -> &AddressState {
        &self.state
    }

    /// Desired fields as a reconciler spec
    pub fn spec(&self) -> AddressSpec {
        AddressSpec {
            section: self.state.section.clone(),
            subnet: self.state.subnet.clone(),
            hostname: self.state.hostname.clone(),
            index: self.state.index.clone(),
        }
    }

    /// Whether `field` differs from the prior state; false without one
    pub fn has_change(&self, field: Field) -> bool {
        self.prior
            .as_ref()
            .is_some_and(|prior| field.value(prior) != field.value(&self.state))
    }

    /// Changes between prior and desired state
    pub fn changes(&self) -> ChangeSet {
        ChangeSet {
            hostname: self.has_change(Field::Hostname),
            section: self.has_change(Field::Section),
            subnet: self.has_change(Field::Subnet),
            index: self.has_change(Field::Index),
        }
    }

    /// Overwrite desired and computed fields with what phpIPAM reports
    pub fn apply(&mut self, info: AddressInformation) {
        self.state.hostname = info.hostname;
        self.state.section = info.section;
        self.state.subnet = info.subnet;
        self.state.index = info.index;
        self.state.ip_address = info.ip;
        self.state.broadcast = info.broadcast;
        self.state.gateway = info.gateway;
        self.state.bitmask = info.bitmask;
    }

    fn require_id(&self) -> Result<String, ControllerError> {
        self.id()
            .map(str::to_string)
            .ok_or_else(|| ControllerError::InvalidConfig("resource has no address ID".to_string()))
    }
}

/// Create the address and record its ID. No ID is set on failure.
pub async fn create(reconciler: &AddressReconciler, data: &mut ResourceData) -> Result<(), ControllerError> {
    schema::validate(data.state())?;
    let address_id = reconciler.create(&data.spec()).await?;
    data.set_id(address_id);
    read(reconciler, data).await
}

/// Refresh computed fields; clears the ID when the address is gone.
pub async fn read(reconciler: &AddressReconciler, data: &mut ResourceData) -> Result<(), ControllerError> {
    let Some(address_id) = data.id().map(str::to_string) else {
        return Ok(());
    };

    match reconciler.read(&address_id).await? {
        Some(info) => data.apply(info),
        None => {
            warn!("Address {} was removed outside of {}", address_id, schema::RESOURCE_TYPE);
            data.clear_id();
        }
    }
    Ok(())
}

/// Converge onto the desired fields, adopting a replacement ID if one is made.
pub async fn update(reconciler: &AddressReconciler, data: &mut ResourceData) -> Result<(), ControllerError> {
    schema::validate(data.state())?;
    let address_id = data.require_id()?;
    let changes = data.changes();

    match reconciler.update(&address_id, &data.spec(), &changes).await {
        Ok(outcome) => {
            data.set_id(outcome.address_id);
            match outcome.info {
                Some(info) => data.apply(info),
                None => data.clear_id(),
            }
            Ok(())
        }
        Err(e) => {
            if let ControllerError::PartialTransition {
                old_address_id,
                new_address_id,
                ..
            } = &e
            {
                info!("Adopting replacement address {} in place of {}", new_address_id, old_address_id);
                data.set_id(new_address_id.clone());
            } else if let ControllerError::UnresolvedReplacement { ip, .. } = &e {
                warn!("Replacement address {} is not tracked; {} is kept", ip, address_id);
            }
            Err(e)
        }
    }
}

/// Release the address and clear the ID.
pub async fn delete(reconciler: &AddressReconciler, data: &mut ResourceData) -> Result<(), ControllerError> {
    let address_id = data.require_id()?;
    reconciler.delete(&address_id).await?;
    data.clear_id();
    Ok(())
}
