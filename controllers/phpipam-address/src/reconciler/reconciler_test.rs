//! Unit tests for the create/read/update/delete sequences

#[cfg(test)]
mod tests {
    use crate::error::{ControllerError, Phase};
    use crate::reconciler::{ChangeSet, UpdatePlan};
    use crate::test_utils::*;
    use phpipam_client::MockOperation;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_then_read_matches_inputs() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let spec = create_test_spec("web-1", "10.0.0.0/24", Some("1"));

        let id = reconciler.create(&spec).await.unwrap();
        let info = reconciler.read(&id).await.unwrap().unwrap();

        assert_eq!(info.hostname, "web-1");
        assert_eq!(info.section, "prod");
        assert_eq!(info.subnet, "10.0.0.0/24");
        assert_eq!(info.index.as_deref(), Some("1"));
        assert_eq!(info.ip, "10.0.0.2");
        assert_eq!(info.gateway, "10.0.0.1");
        assert_eq!(info.broadcast, "10.0.0.255");
        assert_eq!(info.bitmask, "24");

        let stored = ipam.mock.addresses();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].owner, "terraform");
        assert_eq!(stored[0].description, "1");
    }

    #[tokio::test]
    async fn test_read_is_stable() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let id = reconciler
            .create(&create_test_spec("web-1", "10.0.0.0/24", None))
            .await
            .unwrap();

        let first = reconciler.read(&id).await.unwrap();
        let second = reconciler.read(&id).await.unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_create_reuses_existing_address() {
        let ipam = create_test_ipam();
        let seeded = create_test_address(&ipam.mock, &ipam.subnet_a, "10.0.0.50", "web-1", "");
        let reconciler = create_test_reconciler(&ipam.mock);

        let id = reconciler
            .create(&create_test_spec("web-1", "10.0.0.0/24", None))
            .await
            .unwrap();

        assert_eq!(id, seeded.id);
        assert_eq!(ipam.mock.call_count(MockOperation::Allocate), 0);
        assert_eq!(ipam.mock.addresses().len(), 1);
    }

    #[tokio::test]
    async fn test_create_unknown_section_fails_without_allocating() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let mut spec = create_test_spec("web-1", "10.0.0.0/24", None);
        spec.section = "staging".to_string();

        let err = reconciler.create(&spec).await.unwrap_err();

        assert!(matches!(err, ControllerError::Phase { phase: Phase::SectionLookup, .. }));
        assert!(matches!(err.root(), ControllerError::NotFound { .. }));
        assert_eq!(ipam.mock.call_count(MockOperation::Allocate), 0);
        assert!(ipam.mock.addresses().is_empty());
    }

    #[tokio::test]
    async fn test_create_allocation_failure_is_phased() {
        let ipam = create_test_ipam();
        ipam.mock.fail_on(MockOperation::Allocate, "subnet is full");
        let reconciler = create_test_reconciler(&ipam.mock);

        let err = reconciler
            .create(&create_test_spec("web-1", "10.0.0.0/24", None))
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::Phase { phase: Phase::Allocation, .. }));
        assert!(err.to_string().starts_with("Error Allocating New Address"));
    }

    #[test]
    fn test_change_set_plan() {
        let prior = create_test_spec("web-1", "10.0.0.0/24", None);

        let mut renamed = prior.clone();
        renamed.hostname = "web-2".to_string();
        assert_eq!(ChangeSet::between(&prior, &renamed).plan(), UpdatePlan::Rename);

        let mut moved = renamed.clone();
        moved.subnet = "10.0.1.0/24".to_string();
        assert_eq!(ChangeSet::between(&prior, &moved).plan(), UpdatePlan::Replace);

        let mut indexed = prior.clone();
        indexed.index = Some("1".to_string());
        assert_eq!(ChangeSet::between(&prior, &indexed).plan(), UpdatePlan::Replace);

        let mut blank_index = prior.clone();
        blank_index.index = Some(String::new());
        assert_eq!(ChangeSet::between(&prior, &blank_index).plan(), UpdatePlan::Unchanged);
    }

    #[tokio::test]
    async fn test_update_hostname_keeps_id_and_ip() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let prior = create_test_spec("web-1", "10.0.0.0/24", None);
        let id = reconciler.create(&prior).await.unwrap();
        let before = reconciler.read(&id).await.unwrap().unwrap();

        let desired = create_test_spec("web-renamed", "10.0.0.0/24", None);
        let outcome = reconciler
            .update(&id, &desired, &ChangeSet::between(&prior, &desired))
            .await
            .unwrap();

        assert_eq!(outcome.address_id, id);
        let info = outcome.info.unwrap();
        assert_eq!(info.hostname, "web-renamed");
        assert_eq!(info.ip, before.ip);
        assert_eq!(ipam.mock.call_count(MockOperation::Allocate), 1);
        assert_eq!(ipam.mock.call_count(MockOperation::Delete), 0);
    }

    #[tokio::test]
    async fn test_update_subnet_replaces_address() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let prior = create_test_spec("web-1", "10.0.0.0/24", None);
        let old_id = reconciler.create(&prior).await.unwrap();

        let desired = create_test_spec("web-1", "10.0.1.0/24", None);
        let outcome = reconciler
            .update(&old_id, &desired, &ChangeSet::between(&prior, &desired))
            .await
            .unwrap();

        assert_ne!(outcome.address_id, old_id);
        let info = outcome.info.unwrap();
        assert_eq!(info.subnet, "10.0.1.0/24");
        assert_eq!(info.ip, "10.0.1.2");
        assert!(reconciler.read(&old_id).await.unwrap().is_none());
        assert_eq!(ipam.mock.addresses().len(), 1);
        assert_eq!(ipam.mock.addresses()[0].subnet_id, ipam.subnet_b.id);
    }

    #[tokio::test]
    async fn test_update_without_changes_does_not_mutate() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let spec = create_test_spec("web-1", "10.0.0.0/24", None);
        let id = reconciler.create(&spec).await.unwrap();

        let outcome = reconciler.update(&id, &spec, &ChangeSet::default()).await.unwrap();

        assert_eq!(outcome.address_id, id);
        assert!(outcome.info.is_some());
        assert_eq!(ipam.mock.call_count(MockOperation::UpdateHostname), 0);
        assert_eq!(ipam.mock.call_count(MockOperation::Allocate), 1);
        assert_eq!(ipam.mock.call_count(MockOperation::Delete), 0);
    }

    #[tokio::test]
    async fn test_update_reports_partial_transition() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let prior = create_test_spec("web-1", "10.0.0.0/24", None);
        let old_id = reconciler.create(&prior).await.unwrap();
        ipam.mock.fail_on(MockOperation::Delete, "permission denied");

        let desired = create_test_spec("web-1", "10.0.1.0/24", None);
        let err = reconciler
            .update(&old_id, &desired, &ChangeSet::between(&prior, &desired))
            .await
            .unwrap_err();

        match err {
            ControllerError::PartialTransition {
                old_address_id,
                new_address_id,
                ..
            } => {
                assert_eq!(old_address_id, old_id);
                assert_ne!(new_address_id, old_id);
                assert!(reconciler.read(&new_address_id).await.unwrap().is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(reconciler.read(&old_id).await.unwrap().is_some());
        assert_eq!(ipam.mock.addresses().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_never_share_an_ip() {
        let ipam = create_test_ipam();
        ipam.mock.yield_during_allocation(true);
        let reconciler = Arc::new(create_test_reconciler(&ipam.mock));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let reconciler = Arc::clone(&reconciler);
                tokio::spawn(async move {
                    reconciler
                        .create(&create_test_spec(&format!("host-{n}"), "10.0.0.0/24", None))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for result in futures::future::join_all(handles).await {
            ids.push(result.unwrap().unwrap());
        }

        let mut ips = HashSet::new();
        for id in &ids {
            let info = reconciler.read(id).await.unwrap().unwrap();
            assert!(ips.insert(info.ip), "IP handed out twice");
        }
        assert_eq!(ips.len(), 8);
        assert!(!ips.contains("10.0.0.1"));
        assert_eq!(ipam.mock.addresses().len(), 8);
    }

    #[tokio::test]
    async fn test_update_hostname_failure_keeps_address() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let prior = create_test_spec("web-1", "10.0.0.0/24", None);
        let id = reconciler.create(&prior).await.unwrap();
        ipam.mock.fail_on(MockOperation::UpdateHostname, "read-only section");

        let desired = create_test_spec("web-renamed", "10.0.0.0/24", None);
        let err = reconciler
            .update(&id, &desired, &ChangeSet::between(&prior, &desired))
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::Phase { phase: Phase::HostnameUpdate, .. }));
        assert!(err.to_string().starts_with("Address Update Failed"));
        let info = reconciler.read(&id).await.unwrap().unwrap();
        assert_eq!(info.hostname, "web-1");
        assert_eq!(ipam.mock.call_count(MockOperation::Allocate), 1);
    }

    #[tokio::test]
    async fn test_update_id_lookup_failure_after_allocation_is_partial() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let prior = create_test_spec("web-1", "10.0.0.0/24", None);
        let old_id = reconciler.create(&prior).await.unwrap();
        // A stale record elsewhere holding the IP the replacement will get
        create_test_address(&ipam.mock, &ipam.subnet_a, "10.0.1.2", "stale", "");

        let desired = create_test_spec("web-1", "10.0.1.0/24", None);
        let err = reconciler
            .update(&old_id, &desired, &ChangeSet::between(&prior, &desired))
            .await
            .unwrap_err();

        match err {
            ControllerError::PartialTransition {
                old_address_id,
                new_address_id,
                source,
            } => {
                assert_eq!(old_address_id, old_id);
                assert!(matches!(*source, ControllerError::Phase { phase: Phase::AddressIdLookup, .. }));
                assert!(matches!(source.root(), ControllerError::OverAllocated { count: 2, .. }));
                let replacement = reconciler.read(&new_address_id).await.unwrap().unwrap();
                assert_eq!(replacement.ip, "10.0.1.2");
                assert_eq!(replacement.subnet, "10.0.1.0/24");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(reconciler.read(&old_id).await.unwrap().is_some());
        assert_eq!(ipam.mock.call_count(MockOperation::Delete), 0);
    }

    #[tokio::test]
    async fn test_update_without_allocated_id_is_unresolved_replacement() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let prior = create_test_spec("web-1", "10.0.0.0/24", None);
        let old_id = reconciler.create(&prior).await.unwrap();
        create_test_address(&ipam.mock, &ipam.subnet_a, "10.0.1.2", "stale", "");
        ipam.mock.omit_allocated_ids(true);

        let desired = create_test_spec("web-1", "10.0.1.0/24", None);
        let err = reconciler
            .update(&old_id, &desired, &ChangeSet::between(&prior, &desired))
            .await
            .unwrap_err();

        match err {
            ControllerError::UnresolvedReplacement { old_address_id, ip, .. } => {
                assert_eq!(old_address_id, old_id);
                assert_eq!(ip, "10.0.1.2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ipam.mock.call_count(MockOperation::Delete), 0);
    }

    #[tokio::test]
    async fn test_delete_then_read_is_absent() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);
        let id = reconciler
            .create(&create_test_spec("web-1", "10.0.0.0/24", None))
            .await
            .unwrap();

        reconciler.delete(&id).await.unwrap();

        assert!(reconciler.read(&id).await.unwrap().is_none());
        assert!(ipam.mock.addresses().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_address_surfaces_error() {
        let ipam = create_test_ipam();
        let reconciler = create_test_reconciler(&ipam.mock);

        let err = reconciler.delete("404").await.unwrap_err();

        assert!(matches!(err, ControllerError::Phase { phase: Phase::Deletion, .. }));
    }
}
