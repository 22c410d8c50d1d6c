//! Device identity.

use std::collections::BTreeSet;

/// Everything required to identify a device on the platform.
///
/// The actuator reference set is fixed at construction; there is no way to
/// add or remove references afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    key: String,
    password: String,
    actuator_references: BTreeSet<String>,
}

impl Device {
    /// Creates a device.  Duplicate actuator references collapse into one.
    pub fn new<I, S>(key: impl Into<String>, password: impl Into<String>, actuators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            password: password.into(),
            actuator_references: actuators.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a device without actuators.
    pub fn without_actuators(key: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(key, password, std::iter::empty::<String>())
    }

    /// Device key, used as the username and as the topic scope.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Shared secret used by the transport to authenticate.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Actuator references in sorted order.
    pub fn actuator_references(&self) -> impl Iterator<Item = &str> {
        self.actuator_references.iter().map(String::as_str)
    }

    pub fn has_actuators(&self) -> bool {
        !self.actuator_references.is_empty()
    }

    pub fn has_actuator(&self, reference: &str) -> bool {
        self.actuator_references.contains(reference)
    }
}
