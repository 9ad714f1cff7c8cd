//! DHCP identity errors
//!
//! Absent inventory entries, absent reservations and already-exists conflicts
//! are outcomes, not errors, and have no variant here.

use object_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Inventory file is missing or cannot be read
    #[error("Inventory file {path} could not be read: {source}")]
    InventoryUnreadable {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Plugin arguments do not match the expected shape
    #[error("Invalid plugin arguments: {0}")]
    InvalidArguments(String),

    /// A setting required by the chosen mode is absent
    #[error("Missing configuration: {0}")]
    Missing(String),

    /// A setting has a value that does not parse
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Environment variable name
        key: String,
        /// Rejected value
        value: String,
    },
}

/// A single packet could not be decoded. The packet is dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// DHCPv6 message arrived without a relay envelope
    #[error("DHCPv6 message is not relay-encapsulated")]
    NotRelayed,

    /// Relay envelope carries no client message, or another relay
    #[error("Could not decapsulate relay message: {0}")]
    Decapsulation(String),

    /// Datagram ends inside a header or option
    #[error("Truncated packet: {0}")]
    Truncated(String),

    /// Client message could not be decoded
    #[error("Malformed packet: {0}")]
    Malformed(String),

    /// Neither relay address is EUI-64 derived
    #[error("No hardware address could be derived: {0}")]
    NoHardwareAddress(String),

    /// DHCPv4 hardware address is not a 6-byte MAC
    #[error("Unsupported hardware type: {0}")]
    UnsupportedHardware(String),
}

/// Reconciliation against the object store failed
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An object store call failed
    #[error("{context}: {source}")]
    Store {
        /// Operation that failed
        context: String,
        /// Store failure
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    pub(crate) fn store(context: impl Into<String>, source: StoreError) -> Self {
        ReconcileError::Store {
            context: context.into(),
            source,
        }
    }
}

/// Packet handling failed after decoding
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Packet could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Reservation lookup against the store failed
    #[error("Reservation lookup failed: {0}")]
    Lookup(#[from] StoreError),

    /// A reconciler failed
    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}
