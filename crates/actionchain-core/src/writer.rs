use crate::declaration::StateDeclaration;
use crate::error::{ActionChainError, Result};
use serde_yaml::Mapping;

/// Render a chunk as one state document, preserving declaration order.
pub fn render_chunk(states: &[StateDeclaration]) -> Result<String> {
    let mut doc = Mapping::new();
    for state in states {
        for (id, body) in state.to_sls() {
            if doc.contains_key(&id) {
                return Err(ActionChainError::MalformedDeclaration {
                    id: state.id().to_string(),
                    reason: "duplicate state id within one chunk".to_string(),
                });
            }
            doc.insert(id, body);
        }
    }
    Ok(serde_yaml::to_string(&doc)?)
}
