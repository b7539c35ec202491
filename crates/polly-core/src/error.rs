use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollyError {
    #[error("template field '{0}' has no value")]
    MissingTemplateField(String),

    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("missing required artifact '{artifact}' for phase '{phase}'")]
    MissingPrerequisite { artifact: String, phase: String },

    #[error("malformed skill at {path}: {reason}")]
    MalformedSkill { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PollyError>;
