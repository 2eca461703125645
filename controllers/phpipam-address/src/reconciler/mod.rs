//! Reconciliation logic for the phpIPAM address resource.
//!
//! The reconciler is split by concern, each file adding methods to
//! [`AddressReconciler`]:
//! - `naming`: section and subnet name resolution
//! - `locator`: existing-address search and IP-to-ID resolution
//! - `allocator`: first-free allocation and release
//! - `info`: the denormalized read view of an address
//!
//! This module drives them as create/read/update/delete. Create, update and
//! delete run under a single allocation lock shared by every resource the
//! process manages; read takes no lock.

pub mod allocator;
pub mod info;
pub mod locator;
pub mod naming;
#[cfg(test)]
mod reconciler_test;

pub use info::AddressInformation;

use crate::error::{ControllerError, Phase, PhaseContext};
use phpipam_client::{Address, PhpIpamClientTrait};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Desired state of a managed address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSpec {
    /// Section name
    pub section: String,
    /// Subnet description within the section
    pub subnet: String,
    pub hostname: String,
    /// Disambiguation tag stored as the address description
    pub index: Option<String>,
}

impl AddressSpec {
    /// Index, with an empty string treated as unset
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref().filter(|index| !index.is_empty())
    }
}

/// Which desired fields differ from the prior state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub hostname: bool,
    pub section: bool,
    pub subnet: bool,
    pub index: bool,
}

impl ChangeSet {
    /// Compare two specs field by field
    pub fn between(prior: &AddressSpec, desired: &AddressSpec) -> Self {
        Self {
            hostname: prior.hostname != desired.hostname,
            section: prior.section != desired.section,
            subnet: prior.subnet != desired.subnet,
            index: prior.index() != desired.index(),
        }
    }

    /// Whether a field that phpIPAM cannot change in place differs
    pub fn is_structural(&self) -> bool {
        self.section || self.subnet || self.index
    }

    /// Decide how an update converges
    pub fn plan(&self) -> UpdatePlan {
        if self.is_structural() {
            UpdatePlan::Replace
        } else if self.hostname {
            UpdatePlan::Rename
        } else {
            UpdatePlan::Unchanged
        }
    }
}

/// How an update is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Nothing to change remotely
    Unchanged,
    /// Patch the hostname of the existing address; identity is kept
    Rename,
    /// Allocate a new address, release the old one, adopt the new ID
    Replace,
}

/// Result of an update: the (possibly new) identity and resynced view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub address_id: String,
    pub info: Option<AddressInformation>,
}

/// Reconciles phpIPAM addresses against desired state.
pub struct AddressReconciler {
    pub(crate) client: Arc<dyn PhpIpamClientTrait>,
    /// Application identifier recorded as owner of allocated addresses
    pub(crate) owner: String,
    allocation_lock: Mutex<()>,
}

impl AddressReconciler {
    /// Creates a new reconciler over an injected phpIPAM client.
    pub fn new(client: Arc<dyn PhpIpamClientTrait>, owner: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
            allocation_lock: Mutex::new(()),
        }
    }

    /// Ensures an address exists for `spec` and returns its ID.
    ///
    /// This method:
    /// 1. Resolves the section and subnet names to IDs
    /// 2. Looks for an existing address for (hostname, index)
    /// 3. Allocates the first free address if none exists, else reuses it
    /// 4. Resolves the chosen IP back to its address ID
    ///
    /// The caller is expected to follow up with [`AddressReconciler::read`].
    pub async fn create(&self, spec: &AddressSpec) -> Result<String, ControllerError> {
        let _guard = self.allocation_lock.lock().await;
        self.create_locked(spec).await
    }

    /// Create sequence; the caller holds the allocation lock.
    async fn create_locked(&self, spec: &AddressSpec) -> Result<String, ControllerError> {
        let (subnet_id, existing) = self.resolve_target(spec).await?;

        let ip = match existing {
            Some(address) => {
                info!("Reusing existing address {} for {}", address.ip, spec.hostname);
                address.ip
            }
            None => {
                let allocated = self
                    .allocate(&subnet_id, &spec.hostname, spec.index())
                    .await
                    .phase(Phase::Allocation)?;
                info!("Address Allocated: {} for {}", allocated.ip, spec.hostname);
                allocated.ip
            }
        };

        let address_id = self.resolve_address_id(&ip).await.phase(Phase::AddressIdLookup)?;
        debug!("Address {} has ID {}", ip, address_id);
        Ok(address_id)
    }

    /// Resolve the subnet for `spec` and look for an address already held
    /// for its hostname and index.
    async fn resolve_target(&self, spec: &AddressSpec) -> Result<(String, Option<Address>), ControllerError> {
        let section_id = self.resolve_section(&spec.section).await.phase(Phase::SectionLookup)?;
        let subnet_id = self
            .resolve_subnet(&section_id, &spec.subnet)
            .await
            .phase(Phase::SubnetLookup)?;
        debug!("Section ID: {}, Subnet ID: {}", section_id, subnet_id);

        let existing = self
            .locate_existing(&spec.hostname, spec.index())
            .await
            .phase(Phase::ExistingAddressSearch)?;
        Ok((subnet_id, existing))
    }

    /// Reads the current view of an address.
    ///
    /// `Ok(None)` means the address no longer exists in phpIPAM.
    pub async fn read(&self, address_id: &str) -> Result<Option<AddressInformation>, ControllerError> {
        debug!("Reading address ID: {}", address_id);
        self.fetch_info(address_id).await.phase(Phase::InfoFetch)
    }

    /// Converges an existing address onto `spec`.
    ///
    /// A hostname-only change is patched in place. A change of section,
    /// subnet or index allocates a replacement, releases `address_id`, and
    /// reports the new ID. A failure after the replacement is allocated is
    /// [`ControllerError::PartialTransition`] carrying both IDs, or
    /// [`ControllerError::UnresolvedReplacement`] when the new ID is unknown.
    /// The computed view is re-read on success.
    pub async fn update(
        &self,
        address_id: &str,
        spec: &AddressSpec,
        changes: &ChangeSet,
    ) -> Result<UpdateOutcome, ControllerError> {
        let address_id = {
            let _guard = self.allocation_lock.lock().await;
            match changes.plan() {
                UpdatePlan::Unchanged => {
                    debug!("Address {} has no changes to apply", address_id);
                    address_id.to_string()
                }
                UpdatePlan::Rename => {
                    self.client
                        .update_address_hostname(address_id, &spec.hostname)
                        .await
                        .phase(Phase::HostnameUpdate)?;
                    info!("Address Updated: {} (ID {})", spec.hostname, address_id);
                    address_id.to_string()
                }
                UpdatePlan::Replace => self.replace_locked(address_id, spec).await?,
            }
        };

        let info = self.read(&address_id).await?;
        Ok(UpdateOutcome { address_id, info })
    }

    /// Allocate-then-release transition; the caller holds the allocation lock.
    ///
    /// A new address is always allocated, even when one already matches.
    /// Once it exists, every later failure is reported as a transition error.
    async fn replace_locked(&self, old_address_id: &str, spec: &AddressSpec) -> Result<String, ControllerError> {
        let (subnet_id, _) = self.resolve_target(spec).await?;
        let allocated = self
            .allocate(&subnet_id, &spec.hostname, spec.index())
            .await
            .phase(Phase::Allocation)?;
        info!("Replacement Address Allocated: {} for {}", allocated.ip, spec.hostname);

        let new_address_id = match self.resolve_address_id(&allocated.ip).await.phase(Phase::AddressIdLookup) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    "Replacement address {} allocated but its ID could not be resolved: {}",
                    allocated.ip, e
                );
                return Err(match allocated.id {
                    Some(new_address_id) => ControllerError::PartialTransition {
                        old_address_id: old_address_id.to_string(),
                        new_address_id,
                        source: Box::new(e),
                    },
                    None => ControllerError::UnresolvedReplacement {
                        old_address_id: old_address_id.to_string(),
                        ip: allocated.ip,
                        source: Box::new(e),
                    },
                });
            }
        };

        if let Err(e) = self.release(old_address_id).await.phase(Phase::Deletion) {
            warn!(
                "Replacement address {} allocated but old address {} was not released: {}",
                new_address_id, old_address_id, e
            );
            return Err(ControllerError::PartialTransition {
                old_address_id: old_address_id.to_string(),
                new_address_id,
                source: Box::new(e),
            });
        }

        info!("Address {} replaced by {}", old_address_id, new_address_id);
        Ok(new_address_id)
    }

    /// Releases an address.
    pub async fn delete(&self, address_id: &str) -> Result<(), ControllerError> {
        let _guard = self.allocation_lock.lock().await;
        self.release(address_id).await.phase(Phase::Deletion)?;
        info!("Address Removed: {}", address_id);
        Ok(())
    }
}
