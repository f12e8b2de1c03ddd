// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpillwayError {
    #[error("unknown job '{0}'")]
    UnknownJob(String),

    #[error("unknown path '{0}'")]
    UnknownPath(String),

    #[error("invalid job id '{0}': already taken")]
    DuplicateJob(String),

    #[error("duplicate path '{path}' in job '{job}'")]
    DuplicatePath { job: String, path: String },

    #[error("invalid job '{0}': no input nor output declared")]
    EmptyJob(String),

    #[error("path '{path}' is created by more than one job: {producers}")]
    MultipleProducers { path: String, producers: String },

    #[error("unable to add job(s) {0} without creating cycles")]
    CycleDetected(String),

    #[error("invalid job id: {0}")]
    InvalidIdentifier(String),

    #[error("unable to render job content: {0}")]
    Render(String),

    #[error("invalid workflow document: {0}")]
    Document(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SpillwayError>;
