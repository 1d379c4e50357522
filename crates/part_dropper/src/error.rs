//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! asset probing failures, invalid arguments or configuration, failures reported by the
//! scene authoring adapter, and IO.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load asset '{}': {reason}", path.display())]
    AssetLoad { path: PathBuf, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("scene authoring error: {0}")]
    SceneAuthoring(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn asset_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::AssetLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::SceneAuthoring(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::SceneAuthoring(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_uses_scene_authoring_variant() {
        let err: Error = String::from("boom").into();
        matches!(err, Error::SceneAuthoring(_))
            .then_some(())
            .expect("expected SceneAuthoring variant");
    }

    #[test]
    fn from_str_allocates_owned_message() {
        let err: Error = "node missing".into();
        assert!(matches!(err, Error::SceneAuthoring(ref msg) if msg == "node missing"));
    }

    #[test]
    fn asset_load_message_names_path() {
        let err = Error::asset_load("/assets/box.usd", "no geometry");
        assert_eq!(
            err.to_string(),
            "failed to load asset '/assets/box.usd': no geometry"
        );
    }
}
