//! What went wrong, independent of where.

use strum_macros::{Display, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The config file parsed as TOML but its values are unusable
    ConfigInvalid,

    /// A command-line flag is missing or contradicts another one
    InvalidArgument,

    /// The inventory file does not exist
    FileNotFound,

    PermissionDenied,

    /// Any other read or write failure
    IoFailed,

    /// The snapshot could not be written out as JSON
    SerializationFailed,

    /// The inventory is not the JSON shape the provider expects
    DeserializationFailed,

    /// The snapshot provider could not produce an inventory
    SnapshotUnavailable,

    /// No load balancer with the requested name exists in the snapshot
    LoadBalancerNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Kinds where the same call may succeed later without any change on our side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::IoFailed | ErrorKind::SnapshotUnavailable)
    }
}
