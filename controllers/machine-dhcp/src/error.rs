//! Controller-specific error types.
//!
//! Errors surfaced by the DHCP identity controller at startup or when one of
//! its listeners exits.

use dhcp_identity::ConfigError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the DHCP identity controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Socket error in a DHCP listener
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Process setup failed
    #[error("Setup failed: {0}")]
    Setup(String),
}
