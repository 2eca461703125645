//! Field declarations of the `phpipam_address` resource

use crate::error::ControllerError;
use crate::resource::AddressState;

/// Resource type name exposed to the orchestration engine
pub const RESOURCE_TYPE: &str = "phpipam_address";

/// Fields of the address resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Hostname,
    Section,
    Subnet,
    Index,
    IpAddress,
    Broadcast,
    Gateway,
    Bitmask,
}

/// Who owns a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Set by the caller, must be non-empty
    Required,
    /// Set by the caller, may be left out
    Optional,
    /// Filled in from phpIPAM on read
    Computed,
}

/// Every field in declaration order
pub const FIELDS: [Field; 8] = [
    Field::Hostname,
    Field::Section,
    Field::Subnet,
    Field::Index,
    Field::IpAddress,
    Field::Broadcast,
    Field::Gateway,
    Field::Bitmask,
];

impl Field {
    /// Attribute name in the state document
    pub fn name(self) -> &'static str {
        match self {
            Field::Hostname => "hostname",
            Field::Section => "section",
            Field::Subnet => "subnet",
            Field::Index => "index",
            Field::IpAddress => "ip_address",
            Field::Broadcast => "broadcast",
            Field::Gateway => "gateway",
            Field::Bitmask => "bitmask",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Field::Hostname | Field::Section | Field::Subnet => Direction::Required,
            Field::Index => Direction::Optional,
            Field::IpAddress | Field::Broadcast | Field::Gateway | Field::Bitmask => Direction::Computed,
        }
    }

    /// Current value of this field in `state`
    pub fn value(self, state: &AddressState) -> Option<&str> {
        let value = match self {
            Field::Hostname => state.hostname.as_str(),
            Field::Section => state.section.as_str(),
            Field::Subnet => state.subnet.as_str(),
            Field::Index => state.index.as_deref().unwrap_or_default(),
            Field::IpAddress => state.ip_address.as_str(),
            Field::Broadcast => state.broadcast.as_str(),
            Field::Gateway => state.gateway.as_str(),
            Field::Bitmask => state.bitmask.as_str(),
        };
        Some(value).filter(|value| !value.is_empty())
    }
}

/// Check that every required field of `state` is set.
pub fn validate(state: &AddressState) -> Result<(), ControllerError> {
    let missing: Vec<&str> = FIELDS
        .iter()
        .filter(|field| field.direction() == Direction::Required)
        .filter(|field| field.value(state).is_none())
        .map(|field| field.name())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ControllerError::InvalidConfig(format!(
            "{} requires {}",
            RESOURCE_TYPE,
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AddressState {
        AddressState {
            hostname: "web-1".to_string(),
            section: "prod".to_string(),
            subnet: "10.0.0.0/24".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_required_fields() {
        assert!(validate(&state()).is_ok());
    }

    #[test]
    fn test_validate_names_missing_fields() {
        let mut state = state();
        state.hostname.clear();
        state.subnet.clear();

        let err = validate(&state).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: phpipam_address requires hostname, subnet"
        );
    }

    #[test]
    fn test_empty_index_has_no_value() {
        let mut state = state();
        state.index = Some(String::new());
        assert_eq!(Field::Index.value(&state), None);
        assert_eq!(Field::Index.direction(), Direction::Optional);
    }
}
