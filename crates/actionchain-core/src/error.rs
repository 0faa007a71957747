use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionChainError {
    #[error("could not get requisite reference for '{0}': expected '<module>.<function>'")]
    MalformedRequisite(String),

    #[error("malformed declaration '{id}': {reason}")]
    MalformedDeclaration { id: String, reason: String },

    #[error("invalid machine id '{0}': must be alphanumeric with hyphens")]
    InvalidMachineId(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ActionChainError>;
