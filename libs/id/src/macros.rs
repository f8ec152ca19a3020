//! Macros for defining typed UUID identifiers.

/// Define a newtype over [`uuid::Uuid`] for one resource kind.
///
/// The generated type has:
/// - A `PREFIX` constant (empty unless given)
/// - `new()` for a fresh random (v4) UUID and `from_uuid()` for wrapping
/// - `parse()` accepting the prefixed or bare form of any UUID layout the
///   `uuid` crate understands
/// - `Display`/`FromStr` and string-based `Serialize`/`Deserialize`
///
/// # Example
///
/// ```ignore
/// define_uuid_id!(InstanceUuid);
/// define_uuid_id!(RequestId, "req-");
///
/// let id: RequestId = "req-6f1c2a6e-3c1b-4d8e-9a51-0b9f6c3f2d11".parse()?;
/// ```
#[macro_export]
macro_rules! define_uuid_id {
    ($name:ident) => {
        $crate::define_uuid_id!($name, "");
    };
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::Uuid);

        impl $name {
            /// Rendering prefix for this identifier.
            pub const PREFIX: &'static str = $prefix;

            /// Creates a new identifier from a random UUID.
            #[must_use]
            pub fn new() -> Self {
                Self($crate::Uuid::new_v4())
            }

            #[must_use]
            pub const fn from_uuid(uuid: $crate::Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub const fn uuid(&self) -> $crate::Uuid {
                self.0
            }

            /// Parses an identifier, with or without its prefix.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err($crate::IdError::Empty);
                }

                let raw = if Self::PREFIX.is_empty() {
                    trimmed
                } else {
                    trimmed.strip_prefix(Self::PREFIX).unwrap_or(trimmed)
                };

                $crate::Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|e| $crate::IdError::InvalidUuid(e.to_string()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", Self::PREFIX, self.0.hyphenated())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$crate::Uuid> for $name {
            fn from(uuid: $crate::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
