//! Runtime configuration.
//!
//! Read once at startup from environment variables:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `INVENTORY_PATH` | unset | YAML inventory; unset means every MAC is known |
//! | `WATCH_NAMESPACE` | `default` | Namespace of Endpoint and IPReservation objects |
//! | `SUBNET_NAME` | unset | Subnet written into owned reservations |
//! | `RECONCILE_MODE` | `endpoint` | `endpoint`, `reservation` or `both` |
//! | `ADDRESS_SOURCE` | `reservation` | `reservation` or `relay-derived` |
//! | `DHCP4_BIND` | `0.0.0.0:67` | DHCPv4 listen address, empty disables |
//! | `DHCP6_BIND` | `[::]:547` | DHCPv6 listen address, empty disables |
//! | `STORE_TIMEOUT_SECS` | `10` | Per-call object store timeout |

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which reconciler strategies run for a resolved machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Upsert Endpoint records only; reservations are owned elsewhere
    #[default]
    Endpoint,
    /// Own IPReservation records only
    Reservation,
    /// Upsert Endpoints and own IPReservations
    Both,
}

impl ReconcileMode {
    /// Whether Endpoint records are written
    pub fn writes_endpoints(self) -> bool {
        matches!(self, ReconcileMode::Endpoint | ReconcileMode::Both)
    }

    /// Whether IPReservation records are owned
    pub fn owns_reservations(self) -> bool {
        matches!(self, ReconcileMode::Reservation | ReconcileMode::Both)
    }
}

impl FromStr for ReconcileMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "endpoint" => Ok(ReconcileMode::Endpoint),
            "reservation" => Ok(ReconcileMode::Reservation),
            "both" => Ok(ReconcileMode::Both),
            _ => Err(ConfigError::InvalidValue {
                key: "RECONCILE_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Where a resolved machine's address comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressSource {
    /// Active IPReservation for the MAC
    #[default]
    Reservation,
    /// Link-local address derived from the DHCPv6 relay (DHCPv4 still uses reservations)
    RelayDerived,
}

impl FromStr for AddressSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reservation" => Ok(AddressSource::Reservation),
            "relay-derived" => Ok(AddressSource::RelayDerived),
            _ => Err(ConfigError::InvalidValue {
                key: "ADDRESS_SOURCE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Inventory file; `None` treats every MAC as known
    pub inventory_path: Option<PathBuf>,
    /// Namespace of Endpoint and IPReservation objects
    pub namespace: String,
    /// Subnet written into owned reservations
    pub subnet: Option<String>,
    /// Reconciler strategies to run
    pub reconcile_mode: ReconcileMode,
    /// Where resolved addresses come from
    pub address_source: AddressSource,
    /// DHCPv4 listen address; `None` disables the listener
    pub dhcp4_bind: Option<SocketAddr>,
    /// DHCPv6 listen address; `None` disables the listener
    pub dhcp6_bind: Option<SocketAddr>,
    /// Upper bound for each object store call
    pub store_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inventory_path: None,
            namespace: "default".to_string(),
            subnet: None,
            reconcile_mode: ReconcileMode::default(),
            address_source: AddressSource::default(),
            dhcp4_bind: Some(SocketAddr::from(([0, 0, 0, 0], 67))),
            dhcp6_bind: Some(SocketAddr::from(([0u16; 8], 547))),
            store_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let reconcile_mode: ReconcileMode = non_empty("RECONCILE_MODE")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();
        let address_source: AddressSource = non_empty("ADDRESS_SOURCE")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        let subnet = non_empty("SUBNET_NAME");
        if reconcile_mode.owns_reservations() && subnet.is_none() {
            return Err(ConfigError::Missing(
                "SUBNET_NAME is required when RECONCILE_MODE owns reservations".to_string(),
            ));
        }

        let bind = |key: &str, default: Option<SocketAddr>| -> Result<Option<SocketAddr>, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(v) if v.trim().is_empty() => Ok(None),
                Some(v) => v.trim().parse().map(Some).map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: format!("{} ({})", v, e),
                }),
            }
        };

        let store_timeout = match non_empty("STORE_TIMEOUT_SECS") {
            None => defaults.store_timeout,
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "STORE_TIMEOUT_SECS".to_string(),
                    value: v.clone(),
                })?,
        };

        Ok(Self {
            inventory_path: non_empty("INVENTORY_PATH").map(PathBuf::from),
            namespace: non_empty("WATCH_NAMESPACE").unwrap_or(defaults.namespace),
            subnet,
            reconcile_mode,
            address_source,
            dhcp4_bind: bind("DHCP4_BIND", defaults.dhcp4_bind)?,
            dhcp6_bind: bind("DHCP6_BIND", defaults.dhcp6_bind)?,
            store_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reconcile_mode, ReconcileMode::Endpoint);
        assert_eq!(config.dhcp6_bind.unwrap().port(), 547);
    }

    #[test]
    fn test_reservation_mode_requires_subnet() {
        let result = config_from(&[("RECONCILE_MODE", "reservation")]);
        assert!(matches!(result, Err(ConfigError::Missing(_))));

        let config = config_from(&[("RECONCILE_MODE", "Both"), ("SUBNET_NAME", "foo")]).unwrap();
        assert_eq!(config.reconcile_mode, ReconcileMode::Both);
        assert_eq!(config.subnet.as_deref(), Some("foo"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("RECONCILE_MODE", "sometimes")]).is_err());
        assert!(config_from(&[("ADDRESS_SOURCE", "magic")]).is_err());
        assert!(config_from(&[("DHCP4_BIND", "not-an-address")]).is_err());
        assert!(config_from(&[("STORE_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_empty_bind_disables_listener() {
        let config = config_from(&[("DHCP4_BIND", ""), ("DHCP6_BIND", "[::1]:5547")]).unwrap();
        assert_eq!(config.dhcp4_bind, None);
        assert_eq!(config.dhcp6_bind, Some("[::1]:5547".parse().unwrap()));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("INVENTORY_PATH", "/etc/dhcp/inventory.yaml"),
            ("WATCH_NAMESPACE", "metal"),
            ("ADDRESS_SOURCE", "relay-derived"),
            ("STORE_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(config.inventory_path, Some(PathBuf::from("/etc/dhcp/inventory.yaml")));
        assert_eq!(config.namespace, "metal");
        assert_eq!(config.address_source, AddressSource::RelayDerived);
        assert_eq!(config.store_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_mode_capabilities() {
        assert!(ReconcileMode::Endpoint.writes_endpoints());
        assert!(!ReconcileMode::Endpoint.owns_reservations());
        assert!(ReconcileMode::Both.writes_endpoints() && ReconcileMode::Both.owns_reservations());
        assert!(!ReconcileMode::Reservation.writes_endpoints());
    }
}
