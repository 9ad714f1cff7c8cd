//! Machine DHCP Controller
//!
//! Listens for DHCPv4 and relayed DHCPv6 traffic from booting bare-metal
//! machines, resolves each requester against the machine inventory and its
//! IP reservations, and reconciles `Endpoint` and `IPReservation` CRDs.

mod controller;
mod error;

use controller::Controller;
use crate::error::ControllerError;
use dhcp_identity::Config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Machine DHCP Controller");

    // Load configuration from environment variables
    let config = Config::from_env()?;

    info!("Configuration:");
    info!(
        "  Inventory: {}",
        config
            .inventory_path
            .as_ref()
            .map_or_else(|| "none (MAC is identity)".to_string(), |p| p.display().to_string())
    );
    info!("  Namespace: {}", config.namespace);
    info!("  Reconcile mode: {:?}", config.reconcile_mode);
    info!("  Address source: {:?}", config.address_source);
    if let Some(subnet) = &config.subnet {
        info!("  Subnet: {}", subnet);
    }

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
