//! Simulated device collaborators for `devlink-sim` and integration tests.
//!
//! These stand in for real hardware: actuator values and configuration live
//! in maps, and firmware images are assembled in memory.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};
use tracing::info;

use devlink_core::{ActuatorState, Scalar, Value};

use crate::application::ports::{
    ActuationHandler, ActuatorStatusProvider, ConfigurationHandler, ConfigurationProvider,
    FirmwareHandler, FirmwareHandlerError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Actuators ─────────────────────────────────────────────────────────────────

/// Actuators whose value is whatever was last set.  Unset actuators read as
/// `false`.
#[derive(Debug, Default)]
pub struct SimulatedActuators {
    values: Mutex<BTreeMap<String, Scalar>>,
    actuations: Mutex<Vec<(String, Scalar)>>,
}

impl SimulatedActuators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, reference: &str) -> Option<Scalar> {
        lock(&self.values).get(reference).cloned()
    }

    /// Every actuation received, oldest first.
    pub fn actuations(&self) -> Vec<(String, Scalar)> {
        lock(&self.actuations).clone()
    }
}

impl ActuationHandler for SimulatedActuators {
    fn handle_actuation(&self, reference: &str, value: &Scalar) {
        info!(reference, ?value, "actuator set");
        lock(&self.values).insert(reference.to_string(), value.clone());
        lock(&self.actuations).push((reference.to_string(), value.clone()));
    }
}

impl ActuatorStatusProvider for SimulatedActuators {
    fn actuator_status(&self, reference: &str) -> (ActuatorState, Scalar) {
        let value = self.value(reference).unwrap_or(Scalar::Bool(false));
        (ActuatorState::Ready, value)
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Configuration held in a map; `SET` merges into it.
#[derive(Debug, Default)]
pub struct SimulatedConfiguration {
    values: Mutex<BTreeMap<String, Value>>,
}

impl SimulatedConfiguration {
    pub fn new(initial: BTreeMap<String, Value>) -> Self {
        Self {
            values: Mutex::new(initial),
        }
    }
}

impl ConfigurationHandler for SimulatedConfiguration {
    fn handle_configuration(&self, values: &BTreeMap<String, Value>) {
        info!(entries = values.len(), "configuration updated");
        lock(&self.values).extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl ConfigurationProvider for SimulatedConfiguration {
    fn configuration(&self) -> BTreeMap<String, Value> {
        lock(&self.values).clone()
    }
}

// ── Firmware ──────────────────────────────────────────────────────────────────

/// Firmware storage in a `Vec<u8>`.
///
/// Installing an image changes the running version to one derived from the
/// image's SHA-256, so a successful update is visible through
/// [`FirmwareHandler::firmware_version`].
#[derive(Debug)]
pub struct InMemoryFirmware {
    version: String,
    chunk_size: u64,
    max_file_size: u64,
    image: Vec<u8>,
    expected_size: u64,
    persisted_version: Option<String>,
    fail_install: bool,
}

impl InMemoryFirmware {
    pub fn new(version: impl Into<String>, chunk_size: u64, max_file_size: u64) -> Self {
        Self {
            version: version.into(),
            chunk_size,
            max_file_size,
            image: Vec::new(),
            expected_size: 0,
            persisted_version: None,
            fail_install: false,
        }
    }

    /// Makes every installation fail.
    pub fn with_failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    /// Simulates a device that rebooted mid-install with `version` persisted.
    pub fn with_persisted_version(mut self, version: impl Into<String>) -> Self {
        self.persisted_version = Some(version.into());
        self
    }
}

impl FirmwareHandler for InMemoryFirmware {
    fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn firmware_version(&self) -> String {
        self.version.clone()
    }

    fn update_start(&mut self, file_name: &str, file_size: u64) -> Result<(), FirmwareHandlerError> {
        info!(file_name, file_size, "receiving firmware image");
        self.image = Vec::with_capacity(usize::try_from(file_size).unwrap_or(0));
        self.expected_size = file_size;
        Ok(())
    }

    fn write_chunk(&mut self, data: &[u8]) -> Result<(), FirmwareHandlerError> {
        if self.image.len() as u64 + data.len() as u64 > self.expected_size {
            return Err(FirmwareHandlerError::Storage(format!(
                "image would exceed announced size of {} bytes",
                self.expected_size
            )));
        }
        self.image.extend_from_slice(data);
        Ok(())
    }

    fn install(&mut self) -> Result<(), FirmwareHandlerError> {
        if self.fail_install {
            return Err(FirmwareHandlerError::Installation("simulated failure".to_string()));
        }
        if self.image.is_empty() {
            return Err(FirmwareHandlerError::Installation("no image received".to_string()));
        }
        let digest = hex::encode(Sha256::digest(&self.image));
        self.version = format!("sim-{}", &digest[..8]);
        self.image.clear();
        info!(version = %self.version, "firmware image installed");
        Ok(())
    }

    fn update_abort(&mut self) {
        self.image.clear();
        self.expected_size = 0;
    }

    fn download_url(&mut self, url: &str) -> Result<(), FirmwareHandlerError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FirmwareHandlerError::Rejected(format!("unsupported scheme in {url}")));
        }
        // Stand-in image; there is no network access in the simulator.
        self.image = url.as_bytes().to_vec();
        self.expected_size = self.image.len() as u64;
        Ok(())
    }

    fn persist_version(&mut self, version: &str) {
        self.persisted_version = Some(version.to_string());
    }

    fn persisted_version(&self) -> Option<String> {
        self.persisted_version.clone()
    }

    fn unpersist_version(&mut self) {
        self.persisted_version = None;
    }
}
