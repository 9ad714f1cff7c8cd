//! Plugin setup.
//!
//! Builds the v4 and v6 handlers from configuration and store handles. The
//! stores are injected so the same wiring runs against Kubernetes in
//! production and against in-memory stores in tests.

use crate::config::Config;
use crate::error::ConfigError;
use crate::handler::{Handler4, Handler6, Pipeline};
use crate::inventory::{self, Inventory};
use crate::reconciler::{EndpointReconciler, Reconcile, ReservationReconciler};
use crate::reservation::ReservationLookup;
use crate::resolver::IdentityResolver;
use crds::{Endpoint, IPReservation};
use object_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Load the inventory named by plugin arguments
///
/// Exactly one argument, the inventory path, is accepted.
pub fn setup(args: &[&str]) -> Result<Inventory, ConfigError> {
    let [path] = args else {
        return Err(ConfigError::InvalidArguments(format!(
            "want exactly one argument (inventory path), got {}",
            args.len()
        )));
    };
    inventory::load(Path::new(path))
}

/// Handlers ready to be driven by a server
#[derive(Debug, Clone)]
pub struct Plugin {
    /// DHCPv4 handler
    pub handler4: Handler4,
    /// DHCPv6 handler
    pub handler6: Handler6,
}

impl Plugin {
    /// Wire handlers for `config`
    ///
    /// The inventory is loaded from `config.inventory_path` if set.
    pub fn new(
        config: &Config,
        reservations: Arc<dyn ObjectStore<IPReservation>>,
        endpoints: Arc<dyn ObjectStore<Endpoint>>,
    ) -> Result<Self, ConfigError> {
        let inventory = match &config.inventory_path {
            Some(path) => {
                let path = path.to_string_lossy();
                Some(setup(&[path.as_ref()])?)
            }
            None => {
                info!("No inventory configured, every MAC is treated as known");
                None
            }
        };
        Self::with_inventory(config, inventory, reservations, endpoints)
    }

    /// Wire handlers for `config` around an already loaded inventory
    pub fn with_inventory(
        config: &Config,
        inventory: Option<Inventory>,
        reservations: Arc<dyn ObjectStore<IPReservation>>,
        endpoints: Arc<dyn ObjectStore<Endpoint>>,
    ) -> Result<Self, ConfigError> {
        let mut reconcilers: Vec<Box<dyn Reconcile>> = Vec::new();
        if config.reconcile_mode.writes_endpoints() {
            reconcilers.push(Box::new(EndpointReconciler::new(endpoints)));
        }
        if config.reconcile_mode.owns_reservations() {
            let subnet = config
                .subnet
                .clone()
                .ok_or_else(|| ConfigError::Missing("SUBNET_NAME".to_string()))?;
            reconcilers.push(Box::new(ReservationReconciler::new(Arc::clone(&reservations), subnet)));
        }

        let resolver = IdentityResolver::new(
            inventory.map(Arc::new),
            ReservationLookup::new(reservations),
            config.address_source,
        );
        let pipeline = Arc::new(Pipeline::new(resolver, reconcilers));
        info!(
            "DHCP identity plugin ready (mode {:?}, address source {:?})",
            config.reconcile_mode, config.address_source
        );

        Ok(Self {
            handler4: Handler4::new(Arc::clone(&pipeline)),
            handler6: Handler6::new(pipeline),
        })
    }
}
