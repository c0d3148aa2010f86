//! @ai:module:intent Define error types for repository enrichment
//! @ai:module:layer domain
//! @ai:module:public_api Error, Result
//! @ai:module:stateless true

use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Unified error type for all enrichment operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source not found: {0}")]
    NotFound(PathBuf),

    #[error("Parse error at {file}:{line}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Cannot resolve type reference `{name}` in {context}")]
    UnresolvableReference { name: String, context: String },

    #[error("`{declaration}` extends `{base}` without the required type arguments")]
    MissingTypeArguments { base: String, declaration: String },

    #[error("Cyclic type hierarchy: {chain}")]
    CyclicHierarchy { chain: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// @ai:intent Check whether this error comes from a malformed declaration
    /// @ai:post true only for errors that abort a single root type, never the run
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingTypeArguments { .. } | Error::CyclicHierarchy { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        let malformed = Error::MissingTypeArguments {
            base: "CrudRepository".to_string(),
            declaration: "WidgetRepository".to_string(),
        };
        assert!(malformed.is_configuration());
        assert!(!Error::NotFound(PathBuf::from("Missing.java")).is_configuration());
    }
}
