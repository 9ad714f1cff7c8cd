//! Static machine inventory
//!
//! Maps MAC addresses to machine names. The source is a YAML sequence of
//! `{name, macAddress}` records:
//!
//! ```yaml
//! - name: compute-1
//!   macAddress: aa:bb:cc:dd:ee:ff
//! ```
//!
//! Loading is lenient: records that do not have both fields, or whose MAC does
//! not parse, are skipped, and content that is not UTF-8 YAML at all yields an
//! empty inventory. Only a missing or unreadable file is an error.

use crate::error::ConfigError;
use crate::mac;
use mac_address::MacAddress;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// One inventory record as it appears in the source file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    /// Machine name, used as the Endpoint name
    pub name: String,
    /// MAC address in any notation `mac::parse` accepts
    pub mac_address: String,
}

/// Immutable MAC-to-name mapping, keyed by canonical MAC
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    machines: HashMap<String, String>,
}

impl Inventory {
    /// Build an inventory from entries. Later entries win on duplicate MACs.
    pub fn from_entries(entries: impl IntoIterator<Item = InventoryEntry>) -> Self {
        let mut machines = HashMap::new();
        for entry in entries {
            if entry.name.is_empty() {
                debug!("Skipping inventory entry without name for {}", entry.mac_address);
                continue;
            }
            let Some(parsed) = mac::parse(&entry.mac_address) else {
                debug!("Skipping inventory entry {} with invalid MAC {:?}", entry.name, entry.mac_address);
                continue;
            };
            if let Some(previous) = machines.insert(mac::canonical(&parsed), entry.name.clone()) {
                warn!(
                    "Duplicate inventory MAC {}: {} replaces {}",
                    mac::canonical(&parsed),
                    entry.name,
                    previous
                );
            }
        }
        Self { machines }
    }

    /// Parse inventory YAML, skipping records that do not fit the expected shape
    pub fn from_yaml(source: &str) -> Self {
        Self::from_slice(source.as_bytes())
    }

    /// Parse raw inventory file content; bytes that are not UTF-8 YAML yield
    /// an empty inventory
    pub fn from_slice(source: &[u8]) -> Self {
        let document: serde_yaml::Value = match serde_yaml::from_slice(source) {
            Ok(value) => value,
            Err(e) => {
                warn!("Inventory is not valid YAML, treating as empty: {}", e);
                return Self::default();
            }
        };

        let records = match document {
            serde_yaml::Value::Sequence(records) => records,
            serde_yaml::Value::Null => return Self::default(),
            other => {
                warn!("Inventory is not a sequence of records, treating as empty: {:?}", other);
                return Self::default();
            }
        };

        let total = records.len();
        let entries: Vec<InventoryEntry> = records
            .into_iter()
            .filter_map(|record| serde_yaml::from_value(record).ok())
            .collect();
        if entries.len() < total {
            debug!("Skipped {} malformed inventory records", total - entries.len());
        }

        Self::from_entries(entries)
    }

    /// Name of the machine owning `mac`
    pub fn lookup(&self, mac: &MacAddress) -> Option<&str> {
        self.get(&mac::canonical(mac))
    }

    /// Name stored under a canonical MAC key
    pub fn get(&self, canonical_mac: &str) -> Option<&str> {
        self.machines.get(canonical_mac).map(String::as_str)
    }

    /// Number of known machines
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Whether no machine is known
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Iterate `(canonical MAC, name)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.machines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Load the inventory from `path`
///
/// Fails with `ConfigError::InventoryUnreadable` if the file is missing or
/// unreadable. Malformed content yields an empty inventory.
pub fn load(path: &Path) -> Result<Inventory, ConfigError> {
    let source = std::fs::read(path).map_err(|e| ConfigError::InventoryUnreadable {
        path: path.to_path_buf(),
        source: e,
    })?;
    let inventory = Inventory::from_slice(&source);
    info!("Loaded {} machines from inventory {}", inventory.len(), path.display());
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_inventory(content: &str) -> tempfile::NamedTempFile {
        write_raw_inventory(content.as_bytes())
    }

    fn write_raw_inventory(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let result = load(Path::new("does-not-exist.yaml"));
        assert!(matches!(result, Err(ConfigError::InventoryUnreadable { .. })));
    }

    #[test]
    fn test_load_malformed_records_yields_empty_inventory() {
        let file = write_inventory("- foo: compute-1\n  bar: aa:bb:cc:dd:ee:ff\n");
        let inventory = load(file.path()).unwrap();
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_load_non_utf8_content_yields_empty_inventory() {
        let file = write_raw_inventory(&[0xff, 0xfe, 0x00, 0x80, 0x81, b'-', b' ', 0xc3]);
        let inventory = load(file.path()).unwrap();
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_load_valid_inventory() {
        let file = write_inventory("- name: compute-1\n  macAddress: aa:bb:cc:dd:ee:ff\n");
        let inventory = load(file.path()).unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.get("aa:bb:cc:dd:ee:ff"), Some("compute-1"));
    }

    #[test]
    fn test_load_normalizes_mac_case() {
        let file = write_inventory("- name: compute-2\n  macAddress: AA:BB:CC:00:11:22\n");
        let inventory = load(file.path()).unwrap();
        assert_eq!(inventory.get("aa:bb:cc:00:11:22"), Some("compute-2"));
    }

    #[test]
    fn test_mixed_records_keep_only_valid_ones() {
        let inventory = Inventory::from_yaml(
            r#"
- name: compute-1
  macAddress: aa:bb:cc:dd:ee:ff
- name: missing-mac
- macAddress: 11:22:33:44:55:66
- name: bad-mac
  macAddress: zz:zz
- just a string
- name: compute-2
  macAddress: de:ad:be:ef:00:01
"#,
        );
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.get("aa:bb:cc:dd:ee:ff"), Some("compute-1"));
        assert_eq!(inventory.get("de:ad:be:ef:00:01"), Some("compute-2"));
    }

    #[test]
    fn test_non_sequence_document_yields_empty_inventory() {
        assert!(Inventory::from_yaml("name: compute-1\nmacAddress: aa:bb:cc:dd:ee:ff\n").is_empty());
        assert!(Inventory::from_yaml("{{{ not yaml").is_empty());
        assert!(Inventory::from_yaml("").is_empty());
    }

    #[test]
    fn test_duplicate_mac_last_wins() {
        let inventory = Inventory::from_entries(vec![
            InventoryEntry {
                name: "first".to_string(),
                mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
            },
            InventoryEntry {
                name: "second".to_string(),
                mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            },
        ]);
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.get("aa:bb:cc:dd:ee:ff"), Some("second"));
    }

    #[test]
    fn test_lookup_by_mac() {
        let inventory = Inventory::from_yaml("- name: compute-1\n  macAddress: aa:bb:cc:dd:ee:ff\n");
        let mac = MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(inventory.lookup(&mac), Some("compute-1"));
        assert_eq!(inventory.lookup(&MacAddress::new([0; 6])), None);
    }
}
