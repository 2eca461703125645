//! phpIPAM API models
//!
//! These models match the phpIPAM REST API v2 object controllers
//! (`sections`, `subnets`, `addresses`). phpIPAM is loose about JSON types:
//! identifiers and counters arrive as either strings or integers, and many
//! text fields may be `null`. All such fields are normalised to `String`.

use serde::{Deserialize, Deserializer, Serialize};

/// Response envelope wrapping every phpIPAM API reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: u16,
    pub message: Option<String>,
    pub data: Option<T>,
    /// ID of the created object (set on POST responses)
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub id: Option<String>,
}

/// Section model (`/api/{app}/sections/`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

/// Subnet model (`/api/{app}/subnets/`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// Network address, e.g. "10.0.0.0"
    #[serde(default, deserialize_with = "lenient_string")]
    pub subnet: String,
    /// Prefix length, e.g. "24"
    #[serde(default, deserialize_with = "lenient_string")]
    pub mask: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section_id: String,
    /// User-facing identifier of the subnet within its section
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default)]
    pub gateway: Option<Gateway>,
    #[serde(default)]
    pub calculation: Calculation,
}

impl Subnet {
    /// Gateway IP, or an empty string when the subnet has none
    pub fn gateway_ip(&self) -> &str {
        self.gateway.as_ref().map(|g| g.ip_addr.as_str()).unwrap_or_default()
    }

    /// CIDR notation of the subnet, e.g. "10.0.0.0/24"
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.subnet, self.mask)
    }
}

/// Subnet gateway reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip_addr: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
}

/// Derived subnet values computed by phpIPAM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    #[serde(rename = "Type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(rename = "Network", default, deserialize_with = "lenient_string")]
    pub network: String,
    #[serde(rename = "Broadcast", default, deserialize_with = "lenient_string")]
    pub broadcast: String,
    #[serde(rename = "Subnet bitmask", default, deserialize_with = "lenient_string")]
    pub bitmask: String,
    #[serde(rename = "Subnet netmask", default, deserialize_with = "lenient_string")]
    pub netmask: String,
    #[serde(rename = "Number of hosts", default, deserialize_with = "lenient_string")]
    pub hosts: String,
}

/// IP address model (`/api/{app}/addresses/`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subnet_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hostname: String,
    /// Free-form description; used as the index disambiguation tag
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub edit_date: Option<String>,
}

/// Request body for first-free address allocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstFreeRequest {
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Application identifier recorded as the address owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Result of a first-free allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedAddress {
    /// ID of the new address record, when phpIPAM reports it
    pub id: Option<String>,
    pub ip: String,
    pub subnet_id: String,
}

/// Login response payload (`POST /api/{app}/user/`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub token: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub expires: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl From<Lenient> for String {
    fn from(value: Lenient) -> Self {
        match value {
            Lenient::Text(s) => s,
            Lenient::Number(n) => n.to_string(),
            Lenient::Flag(b) => b.to_string(),
        }
    }
}

/// Accepts a string, number, bool or null and yields a `String` ("" for null)
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<Lenient>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Lenient>::deserialize(deserializer)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_decodes_mixed_types() {
        let body = serde_json::json!({
            "id": 7,
            "subnet": "10.0.0.0",
            "mask": "24",
            "sectionId": "1",
            "description": "prod-a",
            "gateway": {"ip_addr": "10.0.0.1", "id": "12"},
            "calculation": {
                "Type": "IPv4",
                "Network": "10.0.0.0",
                "Broadcast": "10.0.0.255",
                "Subnet bitmask": 24,
                "Subnet netmask": "255.255.255.0",
                "Number of hosts": 254
            }
        });

        let subnet: Subnet = serde_json::from_value(body).unwrap();
        assert_eq!(subnet.id, "7");
        assert_eq!(subnet.section_id, "1");
        assert_eq!(subnet.gateway_ip(), "10.0.0.1");
        assert_eq!(subnet.calculation.broadcast, "10.0.0.255");
        assert_eq!(subnet.calculation.bitmask, "24");
        assert_eq!(subnet.cidr(), "10.0.0.0/24");
    }

    #[test]
    fn test_address_null_fields_become_empty() {
        let body = serde_json::json!({
            "id": "42",
            "subnetId": "7",
            "ip": "10.0.0.5",
            "hostname": null,
            "description": null,
            "editDate": null
        });

        let address: Address = serde_json::from_value(body).unwrap();
        assert_eq!(address.hostname, "");
        assert_eq!(address.description, "");
        assert_eq!(address.owner, "");
        assert!(address.edit_date.is_none());
    }

    #[test]
    fn test_first_free_envelope() {
        let body = r#"{"code":201,"success":true,"message":"Address created","id":"42","subnetId":"7","data":"10.0.0.5"}"#;
        let response: ApiResponse<String> = serde_json::from_str(body).unwrap();
        assert_eq!(response.code, 201);
        assert_eq!(response.id.as_deref(), Some("42"));
        assert_eq!(response.data.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_first_free_request_omits_empty_fields() {
        let request = FirstFreeRequest {
            hostname: "web-1".to_string(),
            description: None,
            owner: Some("terraform".to_string()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, serde_json::json!({"hostname": "web-1", "owner": "terraform"}));
    }
}
