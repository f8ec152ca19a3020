//! Payloads exchanged with the scheduler collaborators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use plfm_id::{
    AggregateUuid, ComputeNodeUuid, HostName, InstanceUuid, RequestId, Uuid,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Request Context
// =============================================================================

/// Caller identity and correlation data passed with every query call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: RequestId,

    /// Request ID of the originating API call, when this call is part of a
    /// larger workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_request_id: Option<RequestId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub is_admin: bool,
}

impl RequestContext {
    /// A fresh context with a new request ID.
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            global_request_id: None,
            project_id: None,
            user_id: None,
            is_admin: false,
        }
    }

    /// A context for service-internal calls.
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            ..Self::new()
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self.user_id = Some(user_id.into());
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Destination Selection
// =============================================================================

/// Sizing of the instance being placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub name: String,
    pub vcpus: u32,
    pub memory_mb: u64,
    pub root_gb: u64,
    #[serde(default)]
    pub ephemeral_gb: u64,
    #[serde(default)]
    pub swap_mb: u64,
}

/// What the caller wants placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub instance_uuid: InstanceUuid,
    pub num_instances: u32,
    pub flavor: Flavor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    /// Hosts that must not be selected (e.g. the source host of a resize).
    #[serde(default)]
    pub ignore_hosts: Vec<HostName>,
    #[serde(default)]
    pub force_hosts: Vec<HostName>,
    #[serde(default)]
    pub force_nodes: Vec<String>,
    #[serde(default)]
    pub scheduler_hints: BTreeMap<String, Vec<String>>,
}

impl RequestSpec {
    /// A single-instance request with no placement constraints.
    pub fn new(instance_uuid: InstanceUuid, flavor: Flavor) -> Self {
        Self {
            instance_uuid,
            num_instances: 1,
            flavor,
            image_id: None,
            availability_zone: None,
            ignore_hosts: Vec::new(),
            force_hosts: Vec::new(),
            force_nodes: Vec::new(),
            scheduler_hints: BTreeMap::new(),
        }
    }
}

/// Oversubscription limits the chosen host reported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_gb: Option<u64>,
}

/// One candidate destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub compute_node_uuid: ComputeNodeUuid,
    pub service_host: HostName,
    pub nodename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<SelectionLimits>,
}

/// Placement result: for each requested instance, the chosen host followed
/// by its alternates.
pub type Destinations = Vec<Vec<Selection>>;

// =============================================================================
// Aggregates and Instance Info
// =============================================================================

/// A named group of hosts sharing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub id: i64,
    pub uuid: AggregateUuid,
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<HostName>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmState {
    Building,
    Active,
    Paused,
    Suspended,
    Stopped,
    Resized,
    Error,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub uuid: InstanceUuid,
    pub host: HostName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub vm_state: VmState,
}

/// Instance information pushed for a host: one instance or the full set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceInfo {
    List(Vec<InstanceRecord>),
    Single(InstanceRecord),
}

impl InstanceInfo {
    pub fn records(&self) -> &[InstanceRecord] {
        match self {
            InstanceInfo::List(records) => records,
            InstanceInfo::Single(record) => std::slice::from_ref(record),
        }
    }
}

// =============================================================================
// Inventory and Compute Nodes
// =============================================================================

/// Errors from parsing or building a [`ResourceClass`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceClassError {
    #[error("unknown resource class '{0}'")]
    Unknown(String),

    #[error("invalid custom resource class '{0}': expected CUSTOM_ followed by [A-Z0-9_]")]
    InvalidCustom(String),
}

/// Name of an operator-defined resource class, always `CUSTOM_[A-Z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomClass(String);

impl CustomClass {
    pub const PREFIX: &'static str = "CUSTOM_";

    pub fn new(name: impl Into<String>) -> Result<Self, ResourceClassError> {
        let name = name.into();
        let valid = name.strip_prefix(Self::PREFIX).is_some_and(|suffix| {
            !suffix.is_empty()
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        });
        if !valid {
            return Err(ResourceClassError::InvalidCustom(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Class of a consumable resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceClass {
    Vcpu,
    Pcpu,
    MemoryMb,
    DiskGb,
    Custom(CustomClass),
}

impl ResourceClass {
    /// An operator-defined class. `name` must include the `CUSTOM_` prefix.
    pub fn custom(name: impl Into<String>) -> Result<Self, ResourceClassError> {
        CustomClass::new(name).map(ResourceClass::Custom)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceClass::Vcpu => "VCPU",
            ResourceClass::Pcpu => "PCPU",
            ResourceClass::MemoryMb => "MEMORY_MB",
            ResourceClass::DiskGb => "DISK_GB",
            ResourceClass::Custom(class) => class.as_str(),
        }
    }
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceClass {
    type Err = ResourceClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VCPU" => Ok(ResourceClass::Vcpu),
            "PCPU" => Ok(ResourceClass::Pcpu),
            "MEMORY_MB" => Ok(ResourceClass::MemoryMb),
            "DISK_GB" => Ok(ResourceClass::DiskGb),
            custom if custom.starts_with(CustomClass::PREFIX) => Self::custom(custom),
            other => Err(ResourceClassError::Unknown(other.to_string())),
        }
    }
}

impl TryFrom<String> for ResourceClass {
    type Error = ResourceClassError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceClass> for String {
    fn from(class: ResourceClass) -> Self {
        match class {
            ResourceClass::Custom(CustomClass(name)) => name,
            other => other.as_str().to_string(),
        }
    }
}

/// Capacity of one resource class on a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub total: u64,
    #[serde(default)]
    pub reserved: u64,
    #[serde(default = "default_unit")]
    pub min_unit: u64,
    pub max_unit: u64,
    #[serde(default = "default_unit")]
    pub step_size: u64,
    #[serde(default = "default_allocation_ratio")]
    pub allocation_ratio: f64,
}

fn default_unit() -> u64 {
    1
}

fn default_allocation_ratio() -> f64 {
    1.0
}

impl InventoryRecord {
    /// All of `total` allocatable in single units without oversubscription.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            reserved: 0,
            min_unit: 1,
            max_unit: total,
            step_size: 1,
            allocation_ratio: 1.0,
        }
    }
}

/// Resource provider inventory keyed by class.
pub type Inventory = BTreeMap<ResourceClass, InventoryRecord>;

/// Capacity and usage snapshot of a hypervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeNode {
    pub uuid: ComputeNodeUuid,
    pub host: HostName,
    pub hypervisor_hostname: String,
    pub vcpus: u32,
    pub memory_mb: u64,
    pub local_gb: u64,
    #[serde(default)]
    pub vcpus_used: u32,
    #[serde(default)]
    pub memory_mb_used: u64,
    #[serde(default)]
    pub local_gb_used: u64,
    #[serde(default = "default_allocation_ratio")]
    pub cpu_allocation_ratio: f64,
    #[serde(default = "default_allocation_ratio")]
    pub ram_allocation_ratio: f64,
    #[serde(default = "default_allocation_ratio")]
    pub disk_allocation_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
