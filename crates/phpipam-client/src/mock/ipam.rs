//! Section, subnet and address operations for MockPhpIpamClient

use super::{helpers, lock, MockOperation, MockPhpIpamClient};
use crate::error::PhpIpamError;
use crate::models::*;
use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;

fn parse_id(id: &str, kind: &str) -> Result<u64, PhpIpamError> {
    id.parse::<u64>()
        .map_err(|_| PhpIpamError::NotFound(format!("{} {} not found", kind, id)))
}

pub async fn list_sections(client: &MockPhpIpamClient) -> Result<Vec<Section>, PhpIpamError> {
    client.enter(MockOperation::ListSections)?;
    Ok(lock(&client.sections).values().cloned().collect())
}

pub async fn get_section(client: &MockPhpIpamClient, id: &str) -> Result<Section, PhpIpamError> {
    client.enter(MockOperation::GetSection)?;
    let key = parse_id(id, "Section")?;
    lock(&client.sections)
        .get(&key)
        .cloned()
        .ok_or_else(|| PhpIpamError::NotFound(format!("Section {} not found", id)))
}

pub async fn list_section_subnets(client: &MockPhpIpamClient, section_id: &str) -> Result<Vec<Subnet>, PhpIpamError> {
    client.enter(MockOperation::ListSectionSubnets)?;
    Ok(lock(&client.subnets)
        .values()
        .filter(|subnet| subnet.section_id == section_id)
        .cloned()
        .collect())
}

pub async fn get_subnet(client: &MockPhpIpamClient, id: &str) -> Result<Subnet, PhpIpamError> {
    client.enter(MockOperation::GetSubnet)?;
    find_subnet(client, id)
}

fn find_subnet(client: &MockPhpIpamClient, id: &str) -> Result<Subnet, PhpIpamError> {
    let key = parse_id(id, "Subnet")?;
    lock(&client.subnets)
        .get(&key)
        .cloned()
        .ok_or_else(|| PhpIpamError::NotFound(format!("Subnet {} not found", id)))
}

pub async fn get_address(client: &MockPhpIpamClient, id: &str) -> Result<Address, PhpIpamError> {
    client.enter(MockOperation::GetAddress)?;
    let key = parse_id(id, "Address")?;
    lock(&client.addresses)
        .get(&key)
        .cloned()
        .ok_or_else(|| PhpIpamError::NotFound(format!("Address {} not found", id)))
}

pub async fn search_addresses_by_hostname(client: &MockPhpIpamClient, hostname: &str) -> Result<Vec<Address>, PhpIpamError> {
    client.enter(MockOperation::SearchAddresses)?;
    Ok(lock(&client.addresses)
        .values()
        .filter(|address| address.hostname == hostname)
        .cloned()
        .collect())
}

pub async fn search_addresses_by_ip(client: &MockPhpIpamClient, ip: &str) -> Result<Vec<Address>, PhpIpamError> {
    client.enter(MockOperation::SearchAddresses)?;
    Ok(lock(&client.addresses)
        .values()
        .filter(|address| address.ip == ip)
        .cloned()
        .collect())
}

pub async fn create_address_first_free(
    client: &MockPhpIpamClient,
    subnet_id: &str,
    request: FirstFreeRequest,
) -> Result<AllocatedAddress, PhpIpamError> {
    client.enter(MockOperation::Allocate)?;
    let subnet = find_subnet(client, subnet_id)?;

    let ip = {
        let addresses = lock(&client.addresses);
        let used: Vec<Ipv4Addr> = addresses
            .values()
            .filter(|address| address.subnet_id == subnet.id)
            .filter_map(|address| address.ip.parse().ok())
            .collect();
        helpers::first_free(&subnet, &used)
            .ok_or_else(|| PhpIpamError::Api(format!("No free addresses found in subnet {}", subnet_id)))?
    };

    if client.allocation_yield.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }

    let id = client.next_id();
    let address = Address {
        id: id.to_string(),
        subnet_id: subnet.id.clone(),
        ip: ip.to_string(),
        hostname: request.hostname,
        description: request.description.unwrap_or_default(),
        owner: request.owner.unwrap_or_default(),
        edit_date: Some(chrono::Utc::now().to_rfc3339()),
    };
    lock(&client.addresses).insert(id, address);

    let reported_id = if client.omit_allocated_ids.load(Ordering::SeqCst) {
        None
    } else {
        Some(id.to_string())
    };
    Ok(AllocatedAddress {
        id: reported_id,
        ip: ip.to_string(),
        subnet_id: subnet.id,
    })
}

pub async fn update_address_hostname(client: &MockPhpIpamClient, id: &str, hostname: &str) -> Result<(), PhpIpamError> {
    client.enter(MockOperation::UpdateHostname)?;
    let key = parse_id(id, "Address")?;
    let mut addresses = lock(&client.addresses);
    let address = addresses
        .get_mut(&key)
        .ok_or_else(|| PhpIpamError::NotFound(format!("Address {} not found", id)))?;

    address.hostname = hostname.to_string();
    address.edit_date = Some(chrono::Utc::now().to_rfc3339());
    Ok(())
}

pub async fn delete_address(client: &MockPhpIpamClient, id: &str) -> Result<(), PhpIpamError> {
    client.enter(MockOperation::Delete)?;
    let key = parse_id(id, "Address")?;
    lock(&client.addresses)
        .remove(&key)
        .map(|_| ())
        .ok_or_else(|| PhpIpamError::NotFound(format!("Address {} not found", id)))
}

#[cfg(test)]
mod tests {
    use crate::mock::{MockOperation, MockPhpIpamClient};
    use crate::{FirstFreeRequest, PhpIpamClientTrait, PhpIpamError};

    fn request(hostname: &str) -> FirstFreeRequest {
        FirstFreeRequest {
            hostname: hostname.to_string(),
            description: None,
            owner: Some("terraform".to_string()),
        }
    }

    #[tokio::test]
    async fn test_first_free_allocates_sequentially() {
        let mock = MockPhpIpamClient::new("http://test-phpipam");
        let section = mock.add_section("prod");
        let subnet = mock.add_subnet(&section.id, "10.0.0.0/24", "10.0.0.0/24", Some("10.0.0.1"));

        let first = mock.create_address_first_free(&subnet.id, request("a")).await.unwrap();
        let second = mock.create_address_first_free(&subnet.id, request("b")).await.unwrap();

        assert_eq!(first.ip, "10.0.0.2");
        assert_eq!(second.ip, "10.0.0.3");
        assert_ne!(first.id, second.id);

        let stored = mock.get_address(first.id.as_deref().unwrap()).await.unwrap();
        assert_eq!(stored.hostname, "a");
        assert_eq!(stored.owner, "terraform");
    }

    #[tokio::test]
    async fn test_deleted_address_is_not_found() {
        let mock = MockPhpIpamClient::new("http://test-phpipam");
        let section = mock.add_section("prod");
        let subnet = mock.add_subnet(&section.id, "10.0.0.0/24", "10.0.0.0/24", None);
        let allocated = mock.create_address_first_free(&subnet.id, request("a")).await.unwrap();
        let id = allocated.id.unwrap();

        mock.delete_address(&id).await.unwrap();

        assert!(matches!(mock.get_address(&id).await, Err(PhpIpamError::NotFound(_))));
        assert!(matches!(mock.delete_address(&id).await, Err(PhpIpamError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_injected_failure_is_counted() {
        let mock = MockPhpIpamClient::new("http://test-phpipam");
        mock.fail_on(MockOperation::ListSections, "backend down");

        assert!(matches!(mock.list_sections().await, Err(PhpIpamError::Api(_))));
        assert_eq!(mock.call_count(MockOperation::ListSections), 1);

        mock.clear_failure(MockOperation::ListSections);
        assert!(mock.list_sections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_allocation_yield_lets_concurrent_calls_collide() {
        let mock = MockPhpIpamClient::new("http://test-phpipam");
        let section = mock.add_section("prod");
        let subnet = mock.add_subnet(&section.id, "10.0.0.0/24", "10.0.0.0/24", Some("10.0.0.1"));
        mock.yield_during_allocation(true);

        let (a, b) = tokio::join!(
            mock.create_address_first_free(&subnet.id, request("a")),
            mock.create_address_first_free(&subnet.id, request("b")),
        );

        assert_eq!(a.unwrap().ip, "10.0.0.2");
        assert_eq!(b.unwrap().ip, "10.0.0.2");
        assert_eq!(mock.addresses().len(), 2);
    }

    #[tokio::test]
    async fn test_get_failures_are_injectable() {
        let mock = MockPhpIpamClient::new("http://test-phpipam");
        let section = mock.add_section("prod");
        mock.fail_on(MockOperation::GetSection, "timeout");

        assert!(matches!(mock.get_section(&section.id).await, Err(PhpIpamError::Api(_))));
        assert_eq!(mock.call_count(MockOperation::GetSection), 1);
    }

    #[tokio::test]
    async fn test_omitted_allocation_id() {
        let mock = MockPhpIpamClient::new("http://test-phpipam");
        let section = mock.add_section("prod");
        let subnet = mock.add_subnet(&section.id, "10.0.0.0/24", "10.0.0.0/24", None);
        mock.omit_allocated_ids(true);

        let allocated = mock.create_address_first_free(&subnet.id, request("a")).await.unwrap();

        assert!(allocated.id.is_none());
        assert_eq!(mock.addresses()[0].ip, allocated.ip);
    }
}
