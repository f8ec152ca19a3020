//! Identifier definitions for scheduler resources.

use serde::{Deserialize, Serialize};

use crate::{define_uuid_id, IdError};

// =============================================================================
// Compute Resources
// =============================================================================

define_uuid_id!(InstanceUuid);
define_uuid_id!(ComputeNodeUuid);
define_uuid_id!(ResourceProviderUuid);
define_uuid_id!(AggregateUuid);

// =============================================================================
// Requests
// =============================================================================

define_uuid_id!(RequestId, "req-");

// =============================================================================
// Hosts
// =============================================================================

/// Maximum host name length in bytes.
pub const MAX_HOST_NAME_LEN: usize = 255;

/// Name of a compute host as registered with the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostName(String);

impl HostName {
    /// Validates and wraps a host name.
    pub fn new(name: impl Into<String>) -> Result<Self, IdError> {
        let name = name.into();

        if name.is_empty() {
            return Err(IdError::Empty);
        }
        if name.len() > MAX_HOST_NAME_LEN {
            return Err(IdError::InvalidHostName {
                message: format!("exceeds {MAX_HOST_NAME_LEN} bytes"),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidHostName {
                message: format!("'{name}' contains whitespace"),
            });
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HostName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for HostName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for HostName {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HostName> for String {
    fn from(host: HostName) -> Self {
        host.0
    }
}

impl AsRef<str> for HostName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
