use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A top file: environment → target → states to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopFile {
    pub environments: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl TopFile {
    /// A top file applying `states` to every target of the `base` environment.
    pub fn for_all_targets(states: Vec<String>) -> Self {
        let mut top = Self::default();
        top.add("base", "*", states);
        top
    }

    pub fn add(&mut self, env: &str, target: &str, states: Vec<String>) {
        self.environments
            .entry(env.to_string())
            .or_default()
            .entry(target.to_string())
            .or_default()
            .extend(states);
    }

    pub fn render(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
