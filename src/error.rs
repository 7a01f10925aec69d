use std::{fmt, io, path::StripPrefixError, sync::mpsc::SendError};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

use crate::event::Event;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum WormholeError {
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Operation cancelled by the host")]
    OperationCancelled,
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("Missing precondition: {0}")]
    Precondition(String),
    #[error("Map '{0}' could not be saved: the host refused to name it")]
    SaveRefused(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Inconsistent persisted state: {0}")]
    Inconsistent(String),
    #[error("Unresolvable reference: no map reachable from '{spec}' contains component '{component}'")]
    Unresolvable { spec: String, component: String },
}

/// Failure taxonomy for wormhole operations. None of these are fatal to the host process; the
/// worst outcome is an incomplete or stale link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The path resolver exhausted every tier.
    Unresolvable,
    /// Null source node, empty component id, unnamed map the user declined to save.
    Precondition,
    /// A required map or node disappeared between persistence and restore.
    Inconsistent,
    /// Load/save failure propagated from the map store.
    Io,
    /// The host declined a choice (target map, save path).
    Cancelled,
}

impl WormholeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WormholeError::Io(_) => FailureKind::Io,
            WormholeError::NotFound(_) => FailureKind::Inconsistent,
            WormholeError::OperationCancelled => FailureKind::Cancelled,
            WormholeError::PermissionDenied => FailureKind::Io,
            WormholeError::Precondition(_) => FailureKind::Precondition,
            WormholeError::SaveRefused(_) => FailureKind::Precondition,
            WormholeError::Serialization(_) => FailureKind::Io,
            WormholeError::Inconsistent(_) => FailureKind::Inconsistent,
            WormholeError::Unresolvable { .. } => FailureKind::Unresolvable,
        }
    }

    /// Broken links are reported to the user, everything else is logged.
    pub fn is_broken_link(&self) -> bool {
        matches!(self.kind(), FailureKind::Unresolvable)
    }
}

impl From<StripPrefixError> for WormholeError {
    fn from(src: StripPrefixError) -> WormholeError {
        WormholeError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for WormholeError {
    fn from(src: toml::de::Error) -> WormholeError {
        WormholeError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for WormholeError {
    fn from(src: toml::ser::Error) -> WormholeError {
        WormholeError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for WormholeError {
    fn from(src: JsonError) -> WormholeError {
        WormholeError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<uuid::Error> for WormholeError {
    fn from(src: uuid::Error) -> WormholeError {
        WormholeError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<UrlParseError> for WormholeError {
    fn from(src: UrlParseError) -> WormholeError {
        WormholeError::Serialization(format!("Invalid URL: {src}"))
    }
}

impl From<io::Error> for WormholeError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => WormholeError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => WormholeError::PermissionDenied,
            _ => WormholeError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for WormholeError {
    fn from(x: fmt::Error) -> Self {
        WormholeError::Serialization(format!("{x}"))
    }
}

impl From<SendError<Event>> for WormholeError {
    fn from(x: SendError<Event>) -> Self {
        WormholeError::Io(format!(
            "Channel update send Error, could not transmit map event {:?}",
            x.0
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_is_inconsistent_state() {
        let err: WormholeError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), FailureKind::Inconsistent);
        let err: WormholeError = io::Error::new(io::ErrorKind::Other, "disk").into();
        assert_eq!(err.kind(), FailureKind::Io);
    }

    #[test]
    fn only_unresolvable_counts_as_broken_link() {
        let broken = WormholeError::Unresolvable {
            spec: "B.map".to_string(),
            component: "n42".to_string(),
        };
        assert!(broken.is_broken_link());
        assert!(!WormholeError::OperationCancelled.is_broken_link());
        assert!(!WormholeError::Precondition("source".to_string()).is_broken_link());
    }
}
