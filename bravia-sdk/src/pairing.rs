//! Pairing workflow state
//!
//! Devices seen during a pairing run are buffered in a [`PairingSession`]
//! owned by that run. Nothing outlives the session: dropping or finishing
//! it discards whatever was found but not listed.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::settings::DeviceConfig;

/// Buffer of found and accepted devices for one pairing run
#[derive(Debug, Default)]
pub struct PairingSession {
    found: Vec<DeviceConfig>,
    added: BTreeMap<String, DeviceConfig>,
}

impl PairingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a device seen on the network
    ///
    /// A device already buffered under the same id is replaced.
    pub fn record_found(&mut self, device: DeviceConfig) {
        debug!(id = %device.id, ip = %device.ip, "pairing: device found");
        self.found.retain(|d| d.id != device.id);
        self.found.push(device);
    }

    /// Hand the buffered devices to the pairing view and clear the buffer
    pub fn list_devices(&mut self) -> Vec<DeviceConfig> {
        let listed = std::mem::take(&mut self.found);
        debug!(count = listed.len(), "pairing: listing devices");
        listed
    }

    /// Accept a device, keyed by its id
    ///
    /// Returns every device accepted so far in this run.
    pub fn add_device(&mut self, device: DeviceConfig) -> Vec<&DeviceConfig> {
        info!(id = %device.id, device = device.label(), "pairing: device added");
        self.added.insert(device.id.clone(), device);
        self.added.values().collect()
    }

    pub fn found_count(&self) -> usize {
        self.found.len()
    }

    /// End the run, returning the accepted devices
    pub fn finish(self) -> Vec<DeviceConfig> {
        info!(
            added = self.added.len(),
            discarded = self.found.len(),
            "pairing finished"
        );
        self.added.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_drains_buffer() {
        let mut pairing = PairingSession::new();
        pairing.record_found(DeviceConfig::new("tv-1", "10.0.0.5"));
        pairing.record_found(DeviceConfig::new("tv-2", "10.0.0.6"));

        let listed = pairing.list_devices();
        assert_eq!(listed.len(), 2);
        assert_eq!(pairing.found_count(), 0);
        assert!(pairing.list_devices().is_empty());
    }

    #[test]
    fn test_record_found_replaces_same_id() {
        let mut pairing = PairingSession::new();
        pairing.record_found(DeviceConfig::new("tv-1", "10.0.0.5"));
        pairing.record_found(DeviceConfig::new("tv-1", "10.0.0.9"));

        let listed = pairing.list_devices();
        assert_eq!(listed, vec![DeviceConfig::new("tv-1", "10.0.0.9")]);
    }

    #[test]
    fn test_add_device_accumulates_by_id() {
        let mut pairing = PairingSession::new();
        assert_eq!(pairing.add_device(DeviceConfig::new("tv-1", "10.0.0.5")).len(), 1);
        assert_eq!(pairing.add_device(DeviceConfig::new("tv-2", "10.0.0.6")).len(), 2);
        assert_eq!(
            pairing
                .add_device(DeviceConfig::new("tv-1", "10.0.0.7").with_name("Den"))
                .len(),
            2
        );

        let accepted = pairing.finish();
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].ip, "10.0.0.7");
    }

    #[test]
    fn test_finish_discards_unlisted() {
        let mut pairing = PairingSession::new();
        pairing.record_found(DeviceConfig::new("tv-1", "10.0.0.5"));

        assert!(pairing.finish().is_empty());
        assert_eq!(PairingSession::new().found_count(), 0);
    }
}
