//! Simulated service registry
//!
//! Stands in for an external discovery source. Entries keep their
//! registration order, which decides which failure is named first.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::HealthError;

/// Liveness of a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceStatus {
    Online,
    Offline,
}

impl ServiceStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            ServiceStatus::Online
        } else {
            ServiceStatus::Offline
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Online => "ONLINE",
            ServiceStatus::Offline => "OFFLINE",
        }
    }
}

/// A monitored service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub status: ServiceStatus,
    /// A critical service being offline makes the system NOT_READY
    pub critical: bool,
}

impl ServiceEntry {
    pub fn new(name: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            status: ServiceStatus::Online,
            critical,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == ServiceStatus::Online
    }
}

/// Ordered set of services keyed by name.
///
/// Serializes as a JSON object `name -> {status, critical}` in registration
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRegistry {
    entries: Vec<ServiceEntry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service; re-registering a name replaces its criticality and
    /// resets it to ONLINE.
    pub fn register(&mut self, name: impl Into<String>, critical: bool) {
        let entry = ServiceEntry::new(name, critical);
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ServiceEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Set a service ONLINE or OFFLINE
    pub fn set_active(&mut self, name: &str, active: bool) -> Result<ServiceStatus, HealthError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| HealthError::ServiceNotFound(name.to_string()))?;

        entry.status = ServiceStatus::from_active(active);
        Ok(entry.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of offline services, split into (critical, non-critical)
    pub fn failures(&self) -> (Vec<&str>, Vec<&str>) {
        let mut critical = Vec::new();
        let mut degraded = Vec::new();

        for entry in self.entries.iter().filter(|e| !e.is_online()) {
            if entry.critical {
                critical.push(entry.name.as_str());
            } else {
                degraded.push(entry.name.as_str());
            }
        }

        (critical, degraded)
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for ServiceRegistry {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut registry = ServiceRegistry::new();
        for (name, critical) in iter {
            registry.register(name, critical);
        }
        registry
    }
}

#[derive(Serialize)]
struct EntryView {
    status: ServiceStatus,
    critical: bool,
}

impl Serialize for ServiceRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(
                &entry.name,
                &EntryView {
                    status: entry.status,
                    critical: entry.critical,
                },
            )?;
        }
        map.end()
    }
}
