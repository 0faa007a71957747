use serde::{Deserialize, Serialize};

/// An ordered list of actions run on an endpoint as one unit.
///
/// Only `id` takes part in planning; the label is carried for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionChain {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ActionChain {
    pub fn new(id: u64) -> Self {
        Self { id, label: None }
    }
}
