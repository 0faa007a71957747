use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ContactMethod
// ---------------------------------------------------------------------------

/// How the server reaches the endpoint's agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactMethod {
    /// A resident agent process connected to the server.
    #[default]
    Default,
    /// Agentless: state files are pushed over SSH for every run.
    SshPush,
    SshPushTunnel,
}

impl ContactMethod {
    pub fn is_push_mode(self) -> bool {
        matches!(self, ContactMethod::SshPush | ContactMethod::SshPushTunnel)
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub minion_id: String,
    pub machine_id: String,
    #[serde(default)]
    pub contact_method: ContactMethod,
}

impl Endpoint {
    pub fn new(minion_id: impl Into<String>, machine_id: impl Into<String>) -> Self {
        Self {
            minion_id: minion_id.into(),
            machine_id: machine_id.into(),
            contact_method: ContactMethod::Default,
        }
    }

    pub fn with_contact_method(mut self, contact_method: ContactMethod) -> Self {
        self.contact_method = contact_method;
        self
    }

    /// Push-mode endpoints have no resident agent that could replace itself.
    pub fn is_push_mode(&self) -> bool {
        self.contact_method.is_push_mode()
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolves endpoints reported by the execution path back to their records.
pub trait EndpointLookup {
    fn find_by_minion_id(&self, minion_id: &str) -> Option<Endpoint>;
}

/// An endpoint list held in memory, optionally loaded from a YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

impl Inventory {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&data)?)
    }
}

impl EndpointLookup for Inventory {
    fn find_by_minion_id(&self, minion_id: &str) -> Option<Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.minion_id == minion_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_mode_follows_contact_method() {
        assert!(!Endpoint::new("web1", "m1").is_push_mode());
        assert!(Endpoint::new("web1", "m1")
            .with_contact_method(ContactMethod::SshPush)
            .is_push_mode());
        assert!(ContactMethod::SshPushTunnel.is_push_mode());
    }

    #[test]
    fn inventory_yaml_roundtrip_and_lookup() {
        let yaml = "endpoints:\n  - minion_id: web1\n    machine_id: aa11\n  - minion_id: db1\n    machine_id: bb22\n    contact_method: ssh-push\n";
        let inv: Inventory = serde_yaml::from_str(yaml).unwrap();
        let db = inv.find_by_minion_id("db1").unwrap();
        assert_eq!(db.machine_id, "bb22");
        assert!(db.is_push_mode());
        assert_eq!(
            inv.find_by_minion_id("web1").unwrap().contact_method,
            ContactMethod::Default
        );
        assert!(inv.find_by_minion_id("nope").is_none());
    }
}
