//! phpIPAM REST API Client
//!
//! A Rust client library for interacting with the phpIPAM REST API (v2).
//! Provides type-safe models and methods for the section, subnet and address
//! controllers needed to allocate and release IP addresses.
//!
//! # Example
//!
//! ```no_run
//! use phpipam_client::{ClientConfig, FirstFreeRequest, PhpIpamClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PhpIpamClient::new(ClientConfig {
//!     server_url: "https://ipam.example.com".to_string(),
//!     app_id: "terraform".to_string(),
//!     username: "admin".to_string(),
//!     password: "secret".to_string(),
//!     ssl_skip_verify: false,
//! })?;
//!
//! // Resolve a section and its subnets
//! let sections = client.list_sections().await?;
//! let subnets = client.list_section_subnets(&sections[0].id).await?;
//!
//! // Allocate the first free address
//! let allocated = client.create_address_first_free(&subnets[0].id, FirstFreeRequest {
//!     hostname: "web-1".to_string(),
//!     description: Some("1".to_string()),
//!     owner: Some("terraform".to_string()),
//! }).await?;
//! println!("allocated {}", allocated.ip);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Token authentication**: Lazily logs in and reuses the session token
//! - **Lenient decoding**: Normalises phpIPAM's mixed string/number/null fields
//! - **Mocking**: `MockPhpIpamClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod phpipam_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{ClientConfig, PhpIpamClient};
pub use common::HttpClient;
pub use error::PhpIpamError;
pub use models::*;
pub use phpipam_trait::PhpIpamClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockOperation, MockPhpIpamClient};
