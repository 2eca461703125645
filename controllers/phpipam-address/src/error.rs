//! Provider-specific error types.
//!
//! This module defines the failures of the address reconciler that are not
//! covered by the phpIPAM client's own errors.

use phpipam_client::PhpIpamError;
use std::fmt;
use thiserror::Error;

/// Kind of name being resolved to a phpIPAM ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Section,
    Subnet,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Section => write!(f, "Section"),
            NameKind::Subnet => write!(f, "Subnet"),
        }
    }
}

/// Step of a reconciliation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SectionLookup,
    SubnetLookup,
    ExistingAddressSearch,
    Allocation,
    AddressIdLookup,
    HostnameUpdate,
    Deletion,
    InfoFetch,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Phase::SectionLookup => "Error Getting Section ID",
            Phase::SubnetLookup => "Error Getting Subnet ID",
            Phase::ExistingAddressSearch => "Error Finding Existing Addresses",
            Phase::Allocation => "Error Allocating New Address",
            Phase::AddressIdLookup => "Error Getting Created Address ID",
            Phase::HostnameUpdate => "Address Update Failed",
            Phase::Deletion => "Delete Address Failed",
            Phase::InfoFetch => "Cannot Get Address Information",
        };
        f.write_str(text)
    }
}

/// Errors that can occur in the address provider.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// phpIPAM API error
    #[error("phpIPAM error: {0}")]
    PhpIpam(#[from] PhpIpamError),

    /// Section name or subnet description matched nothing
    #[error("{kind} Not Found: {name}")]
    NotFound { kind: NameKind, name: String },

    /// Section name or subnet description matched more than one object
    #[error("{kind} name is ambiguous: {count} matches for {name}")]
    AmbiguousName { kind: NameKind, name: String, count: usize },

    /// Several addresses share the hostname and no index was given
    #[error("Multiple Addresses Found for hostname {0}; set an index to disambiguate")]
    AmbiguousHostname(String),

    /// Several addresses share both the hostname and the index
    #[error("Multiple Indexed Addresses Found for hostname {hostname} with index {index}")]
    AmbiguousIndex { hostname: String, index: String },

    /// An IP resolved to other than exactly one address record
    #[error("Address Over Allocated: {ip} resolves to {count} address records")]
    OverAllocated { ip: String, count: usize },

    /// An address points at a subnet phpIPAM no longer has
    #[error("Address Subnet Not Found: {0}")]
    SubnetNotFound(String),

    /// A subnet points at a section phpIPAM no longer has
    #[error("Subnet Section Not Found: {0}")]
    SectionNotFound(String),

    /// Invalid configuration or resource input
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure annotated with the reconciliation step it happened in
    #[error("{phase}: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: Box<ControllerError>,
    },

    /// A replacement address was allocated but the transition did not finish
    #[error("Replacement of address {old_address_id} incomplete: new address {new_address_id} allocated: {source}")]
    PartialTransition {
        old_address_id: String,
        new_address_id: String,
        #[source]
        source: Box<ControllerError>,
    },

    /// A replacement was allocated at `ip` but no address ID is known for it
    #[error("Replacement of address {old_address_id} incomplete: new address {ip} allocated with unknown ID: {source}")]
    UnresolvedReplacement {
        old_address_id: String,
        ip: String,
        #[source]
        source: Box<ControllerError>,
    },
}

impl ControllerError {
    /// Innermost error, skipping phase annotations
    pub fn root(&self) -> &ControllerError {
        match self {
            ControllerError::Phase { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Attach a [`Phase`] to a fallible step
pub(crate) trait PhaseContext<T> {
    fn phase(self, phase: Phase) -> Result<T, ControllerError>;
}

impl<T, E: Into<ControllerError>> PhaseContext<T> for Result<T, E> {
    fn phase(self, phase: Phase) -> Result<T, ControllerError> {
        self.map_err(|e| ControllerError::Phase {
            phase,
            source: Box::new(e.into()),
        })
    }
}
