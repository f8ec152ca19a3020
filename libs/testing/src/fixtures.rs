//! Sample payloads.

use std::collections::BTreeMap;

use plfm_id::{AggregateUuid, ComputeNodeUuid, HostName, InstanceUuid};
use plfm_scheduler_client::{
    Aggregate, ComputeNode, Flavor, InstanceInfo, InstanceRecord, Inventory, InventoryRecord,
    RequestContext, RequestSpec, ResourceClass, Selection, VmState,
};

/// Parse a host name known to be valid.
pub fn host(name: &str) -> HostName {
    HostName::new(name).unwrap_or_else(|e| panic!("fixture host name '{name}': {e}"))
}

pub fn context() -> RequestContext {
    RequestContext::new().with_project("prj-test", "usr-test")
}

pub fn flavor() -> Flavor {
    Flavor {
        name: "m1.small".to_string(),
        vcpus: 1,
        memory_mb: 2048,
        root_gb: 20,
        ephemeral_gb: 0,
        swap_mb: 0,
    }
}

pub fn request_spec() -> RequestSpec {
    RequestSpec::new(InstanceUuid::new(), flavor())
}

pub fn selection(host_name: &str) -> Selection {
    Selection {
        compute_node_uuid: ComputeNodeUuid::new(),
        service_host: host(host_name),
        nodename: host_name.to_string(),
        cell_uuid: None,
        limits: None,
    }
}

pub fn aggregate(id: i64, name: &str, hosts: &[&str]) -> Aggregate {
    Aggregate {
        id,
        uuid: AggregateUuid::new(),
        name: name.to_string(),
        hosts: hosts.iter().map(|h| host(h)).collect(),
        metadata: BTreeMap::from([("availability_zone".to_string(), "az1".to_string())]),
    }
}

pub fn instance_info(host_name: &str, count: usize) -> InstanceInfo {
    InstanceInfo::List(
        (0..count)
            .map(|_| InstanceRecord {
                uuid: InstanceUuid::new(),
                host: host(host_name),
                node: Some(host_name.to_string()),
                vm_state: VmState::Active,
            })
            .collect(),
    )
}

pub fn inventory() -> Inventory {
    Inventory::from([
        (ResourceClass::Vcpu, InventoryRecord::new(32)),
        (
            ResourceClass::MemoryMb,
            InventoryRecord {
                reserved: 512,
                ..InventoryRecord::new(131072)
            },
        ),
        (ResourceClass::DiskGb, InventoryRecord::new(1024)),
    ])
}

pub fn compute_node(host_name: &str) -> ComputeNode {
    ComputeNode {
        uuid: ComputeNodeUuid::new(),
        host: host(host_name),
        hypervisor_hostname: format!("{host_name}.hv"),
        vcpus: 32,
        memory_mb: 131072,
        local_gb: 1024,
        vcpus_used: 4,
        memory_mb_used: 8192,
        local_gb_used: 80,
        cpu_allocation_ratio: 16.0,
        ram_allocation_ratio: 1.5,
        disk_allocation_ratio: 1.0,
        updated_at: None,
    }
}
