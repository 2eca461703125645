//! Test utilities for unit testing the address reconciler
//!
//! This module provides helpers for seeding a mock phpIPAM and building
//! reconcilers over it.

#[cfg(test)]
use crate::reconciler::{AddressReconciler, AddressSpec};
#[cfg(test)]
use phpipam_client::{Address, MockPhpIpamClient, Section, Subnet};
#[cfg(test)]
use std::sync::Arc;

/// Seeded phpIPAM layout shared by reconciler tests
#[cfg(test)]
pub struct TestIpam {
    pub mock: MockPhpIpamClient,
    pub prod: Section,
    /// "10.0.0.0/24" in prod, gateway 10.0.0.1
    pub subnet_a: Subnet,
    /// "10.0.1.0/24" in prod, gateway 10.0.1.1
    pub subnet_b: Subnet,
}

/// Helper to create a mock phpIPAM with one section holding two subnets
///
/// Subnets are described by their CIDR, which is the name the resource uses.
#[cfg(test)]
pub fn create_test_ipam() -> TestIpam {
    let mock = MockPhpIpamClient::new("http://test-phpipam");
    let prod = mock.add_section("prod");
    let subnet_a = mock.add_subnet(&prod.id, "10.0.0.0/24", "10.0.0.0/24", Some("10.0.0.1"));
    let subnet_b = mock.add_subnet(&prod.id, "10.0.1.0/24", "10.0.1.0/24", Some("10.0.1.1"));
    TestIpam {
        mock,
        prod,
        subnet_a,
        subnet_b,
    }
}

/// Helper to create a reconciler over a mock client
#[cfg(test)]
pub fn create_test_reconciler(mock: &MockPhpIpamClient) -> AddressReconciler {
    AddressReconciler::new(Arc::new(mock.clone()), "terraform")
}

/// Helper to build a desired address in the prod section
#[cfg(test)]
pub fn create_test_spec(hostname: &str, subnet: &str, index: Option<&str>) -> AddressSpec {
    AddressSpec {
        section: "prod".to_string(),
        subnet: subnet.to_string(),
        hostname: hostname.to_string(),
        index: index.map(|s| s.to_string()),
    }
}

/// Helper to seed an address record directly into a subnet
#[cfg(test)]
pub fn create_test_address(mock: &MockPhpIpamClient, subnet: &Subnet, ip: &str, hostname: &str, description: &str) -> Address {
    mock.add_address(Address {
        subnet_id: subnet.id.clone(),
        ip: ip.to_string(),
        hostname: hostname.to_string(),
        description: description.to_string(),
        ..Default::default()
    })
}
