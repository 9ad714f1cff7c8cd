//! Main controller implementation.
//!
//! Wires the Kubernetes-backed stores into the DHCP identity plugin, starts
//! the UDP server and waits for it to exit or for ctrl-c.

use crate::error::ControllerError;
use crds::{Endpoint, IPReservation};
use dhcp_identity::{Config, DhcpServer, Plugin};
use kube::Client;
use object_store::KubeStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Main controller for DHCP machine identity.
pub struct Controller {
    server: JoinHandle<std::io::Result<()>>,
    shutdown: watch::Sender<bool>,
}

impl Controller {
    /// Creates a new controller instance and starts the listeners.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing Machine DHCP Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        let reservations: Arc<KubeStore<IPReservation>> = Arc::new(KubeStore::namespaced(
            kube_client.clone(),
            &config.namespace,
            config.store_timeout,
        ));
        let endpoints: Arc<KubeStore<Endpoint>> = Arc::new(KubeStore::namespaced(
            kube_client,
            &config.namespace,
            config.store_timeout,
        ));

        let plugin = Plugin::new(&config, reservations, endpoints)?;
        if config.dhcp4_bind.is_none() && config.dhcp6_bind.is_none() {
            return Err(ControllerError::Setup(
                "both DHCP4_BIND and DHCP6_BIND are disabled".to_string(),
            ));
        }
        let server = DhcpServer::new(plugin, config.dhcp4_bind, config.dhcp6_bind);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(async move { server.run(shutdown_rx).await });

        Ok(Self { server, shutdown })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Machine DHCP Controller running");

        tokio::select! {
            result = &mut self.server => {
                result.map_err(|e| ControllerError::Setup(format!("DHCP server panicked: {}", e)))??;
                error!("DHCP server exited unexpectedly");
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received shutdown signal");
                let _ = self.shutdown.send(true);
                self.server
                    .await
                    .map_err(|e| ControllerError::Setup(format!("DHCP server panicked: {}", e)))??;
            }
        }

        info!("Machine DHCP Controller stopped");
        Ok(())
    }
}
