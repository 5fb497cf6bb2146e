//! Per-device settings and their persistence
//!
//! The host owns storage; the session reads a device's settings once at
//! start and writes them back when the endpoint is resolved or the power
//! flag flips.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use bravia_api::{Endpoint, ResolvedSettings};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors raised by a settings store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No settings directory available on this platform")]
    NoConfigDir,
}

/// Settings of one television
///
/// Field names follow the persisted key names (`ip`, `id`, `apiEndpoint`,
/// `power`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable identifier the settings are stored under
    #[serde(default)]
    pub id: String,

    /// Address of the set; trimmed before every use
    #[serde(default)]
    pub ip: String,

    /// Control path, once resolved
    #[serde(
        default,
        rename = "apiEndpoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_endpoint: Option<Endpoint>,

    /// Last observed power state
    #[serde(default)]
    pub power: bool,

    /// Display name used in logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DeviceConfig {
    pub fn new(id: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ip: ip.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.api_endpoint = Some(endpoint);
        self
    }

    /// Trimmed device address, `None` when empty
    pub fn address(&self) -> Option<&str> {
        let ip = self.ip.trim();
        (!ip.is_empty()).then_some(ip)
    }

    /// Name for log lines, falling back to the id
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }

    /// Address plus endpoint, when both are known
    pub fn resolved(&self) -> Option<ResolvedSettings> {
        ResolvedSettings::new(self.address()?, self.api_endpoint?)
    }

    /// Merge freshly supplied values with previously persisted ones
    ///
    /// A persisted value wins whenever it is set (non-empty string,
    /// `Some`, or `true`); otherwise the fresh value is kept.
    pub fn merged_with(self, persisted: Option<&DeviceConfig>) -> DeviceConfig {
        let Some(persisted) = persisted else {
            return self;
        };

        DeviceConfig {
            id: non_empty(&persisted.id).unwrap_or(self.id),
            ip: non_empty(&persisted.ip).unwrap_or(self.ip),
            api_endpoint: persisted.api_endpoint.or(self.api_endpoint),
            power: persisted.power || self.power,
            name: persisted
                .name
                .as_deref()
                .and_then(non_empty)
                .or(self.name),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

/// Key-value storage for device settings, keyed by device id
pub trait SettingsStore: Send + Sync {
    /// Settings stored for `id`, if any
    fn load(&self, id: &str) -> Result<Option<DeviceConfig>, StoreError>;

    /// Replace the settings stored under `settings.id`
    fn save(&self, settings: &DeviceConfig) -> Result<(), StoreError>;
}

/// In-process settings store
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    devices: RwLock<HashMap<String, DeviceConfig>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with previously persisted settings
    pub fn with_device(self, settings: DeviceConfig) -> Self {
        self.devices.write().insert(settings.id.clone(), settings);
        self
    }

    pub fn get(&self, id: &str) -> Option<DeviceConfig> {
        self.devices.read().get(id).cloned()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, id: &str) -> Result<Option<DeviceConfig>, StoreError> {
        Ok(self.get(id))
    }

    fn save(&self, settings: &DeviceConfig) -> Result<(), StoreError> {
        self.devices
            .write()
            .insert(settings.id.clone(), settings.clone());
        Ok(())
    }
}

/// Settings store backed by a single JSON file
///
/// The file holds an object of `id -> settings`. Every save rewrites the
/// whole file.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileSettingsStore {
    const FILE_NAME: &'static str = "devices.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store under the platform config directory (`bravia-sdk/devices.json`)
    pub fn in_config_dir() -> Result<Self, StoreError> {
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(Self::new(dir.join("bravia-sdk").join(Self::FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, DeviceConfig>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(json) if json.trim().is_empty() => Ok(HashMap::new()),
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self, id: &str) -> Result<Option<DeviceConfig>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(id))
    }

    fn save(&self, settings: &DeviceConfig) -> Result<(), StoreError> {
        let _guard = self.lock.lock();

        let mut devices = self.read_all()?;
        devices.insert(settings.id.clone(), settings.clone());

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Replace the file by rename so readers never see a partial write
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(&serde_json::to_vec_pretty(&devices)?)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), id = %settings.id, "saved device settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_merge_without_persisted_keeps_fresh() {
        let fresh = DeviceConfig::new("tv-1", "192.168.1.20");
        assert_eq!(fresh.clone().merged_with(None), fresh);
    }

    #[test]
    fn test_persisted_values_win_when_set() {
        let fresh = DeviceConfig::new("tv-1", "192.168.1.20").with_name("Fresh");
        let persisted = DeviceConfig {
            id: "tv-1".to_string(),
            ip: "192.168.1.99".to_string(),
            api_endpoint: Some(Endpoint::Sony),
            power: true,
            name: Some("Living Room".to_string()),
        };

        let merged = fresh.merged_with(Some(&persisted));
        assert_eq!(merged, persisted);
    }

    #[test]
    fn test_empty_persisted_values_do_not_override() {
        let fresh = DeviceConfig::new("tv-1", "192.168.1.20")
            .with_endpoint(Endpoint::Default)
            .with_name("Bedroom");
        let persisted = DeviceConfig {
            id: String::new(),
            ip: "  ".to_string(),
            api_endpoint: None,
            power: false,
            name: Some(String::new()),
        };

        let merged = fresh.clone().merged_with(Some(&persisted));
        assert_eq!(merged, fresh);
    }

    #[test]
    fn test_resolved_requires_address_and_endpoint() {
        let config = DeviceConfig::new("tv-1", " 10.0.0.5 ");
        assert!(config.resolved().is_none());

        let config = config.with_endpoint(Endpoint::Sony);
        let resolved = config.resolved().unwrap();
        assert_eq!(resolved.ip(), "10.0.0.5");
        assert_eq!(resolved.endpoint(), Endpoint::Sony);

        assert!(DeviceConfig::new("tv-1", "")
            .with_endpoint(Endpoint::Sony)
            .resolved()
            .is_none());
    }

    #[test]
    fn test_label_falls_back_to_id() {
        assert_eq!(DeviceConfig::new("tv-1", "x").label(), "tv-1");
        assert_eq!(DeviceConfig::new("tv-1", "x").with_name("Den").label(), "Den");
    }

    #[test]
    fn test_persisted_key_names() {
        let config = DeviceConfig::new("tv-1", "10.0.0.5").with_endpoint(Endpoint::Sony);
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["apiEndpoint"], "/sony/IRCC");
        assert_eq!(json["power"], false);
        assert!(json.get("name").is_none());

        let parsed: DeviceConfig =
            serde_json::from_str(r#"{ "id": "tv-2", "ip": "10.0.0.6" }"#).unwrap();
        assert_eq!(parsed.api_endpoint, None);
        assert!(!parsed.power);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySettingsStore::new();
        assert!(store.load("tv-1").unwrap().is_none());

        let config = DeviceConfig::new("tv-1", "10.0.0.5");
        store.save(&config).unwrap();
        assert_eq!(store.load("tv-1").unwrap(), Some(config));
    }

    #[test]
    fn test_json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("devices.json");

        let first = JsonFileSettingsStore::new(&path);
        assert!(first.load("tv-1").unwrap().is_none());

        let mut config = DeviceConfig::new("tv-1", "10.0.0.5").with_endpoint(Endpoint::Default);
        first.save(&config).unwrap();
        config.power = true;
        first.save(&config).unwrap();
        first.save(&DeviceConfig::new("tv-2", "10.0.0.6")).unwrap();

        let second = JsonFileSettingsStore::new(&path);
        assert_eq!(second.load("tv-1").unwrap(), Some(config));
        assert!(second.load("tv-2").unwrap().is_some());
    }

    #[test]
    fn test_json_store_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let store = JsonFileSettingsStore::new(&path);

        for power in [false, true, false] {
            let mut config = DeviceConfig::new("tv-1", "10.0.0.5");
            config.power = power;
            store.save(&config).unwrap();
        }

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("devices.json")]);

        let json = std::fs::read_to_string(&path).unwrap();
        let devices: HashMap<String, DeviceConfig> = serde_json::from_str(&json).unwrap();
        assert!(!devices["tv-1"].power);
    }

    #[test]
    fn test_json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileSettingsStore::new(&path);
        assert!(matches!(
            store.load("tv-1"),
            Err(StoreError::Serialization(_))
        ));
    }

    fn ip_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            (1u8..255, 0u8..255, 0u8..255, 1u8..255)
                .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
        ]
    }

    proptest! {
        /// A non-empty persisted address is never replaced by a fresh one
        #[test]
        fn prop_persisted_ip_wins(fresh_ip in ip_strategy(), stored_ip in ip_strategy()) {
            let fresh = DeviceConfig::new("tv", fresh_ip.clone());
            let persisted = DeviceConfig::new("tv", stored_ip.clone());

            let merged = fresh.merged_with(Some(&persisted));
            let expected = if stored_ip.is_empty() { fresh_ip } else { stored_ip };
            prop_assert_eq!(merged.ip, expected);
        }

        /// Power is only ever raised by the merge, never cleared
        #[test]
        fn prop_power_merge_is_or(fresh_power: bool, stored_power: bool) {
            let mut fresh = DeviceConfig::new("tv", "10.0.0.5");
            fresh.power = fresh_power;
            let mut persisted = DeviceConfig::new("tv", "");
            persisted.power = stored_power;

            let merged = fresh.merged_with(Some(&persisted));
            prop_assert_eq!(merged.power, fresh_power || stored_power);
        }
    }
}
