//! Errors raised while loading or validating `quill.toml`.
//!
//! All of them are fatal: a build never starts on a config that fails here.

use crate::error::BuildError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid quill.toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("[site.url] must start with http:// or https://, got `{0}`")]
    SiteUrl(String),

    #[error("[build.content] `{0}` is not a directory")]
    ContentDir(PathBuf),

    #[error("[build.processors] {0}")]
    ProcessorOrder(#[source] BuildError),

    #[error("[images.transforms.\"{bucket}\"] unknown output type `{ty}`")]
    UnknownOutputType { bucket: String, ty: String },

    #[error("[images.transforms.\"{0}\"] max_size must be positive")]
    EmptyMaxSize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_error_names_file() {
        let err = ConfigError::Io(
            PathBuf::from("site/quill.toml"),
            Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "cannot read `site/quill.toml`");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_toml_error_keeps_parser_message() {
        let err = ConfigError::from(toml::from_str::<toml::Value>("[site").unwrap_err());
        assert!(err.to_string().starts_with("invalid quill.toml: "));
        assert!(err.to_string().len() > "invalid quill.toml: ".len());
    }

    #[test]
    fn test_validation_messages_name_the_section() {
        let err = ConfigError::ProcessorOrder(BuildError::ProcessorOrder {
            earlier: "markdown",
            later: "related",
        });
        assert_eq!(
            err.to_string(),
            "[build.processors] processor `related` must run after `markdown`"
        );

        let err = ConfigError::UnknownOutputType {
            bucket: "thumbs".into(),
            ty: "tiff2000".into(),
        };
        assert_eq!(
            err.to_string(),
            "[images.transforms.\"thumbs\"] unknown output type `tiff2000`"
        );

        let err = ConfigError::EmptyMaxSize(String::new());
        assert_eq!(err.to_string(), "[images.transforms.\"\"] max_size must be positive");
    }
}
