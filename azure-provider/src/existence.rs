//! Existence probing for remote fetches.
//!
//! This is the only place where "not found" is interpreted. A fetch either
//! yields the resource, reports that it is absent, or fails for real:
//!
//! ```text
//! Ok(Existence::Exists(lb))   // 2xx
//! Ok(Existence::NotFound)     // 404
//! Err(RemoteError)            // anything else, passed through unchanged
//! ```

use crate::cloud::{RemoteError, RemoteResult};

/// Outcome of a fetch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existence<T> {
    Exists(T),
    NotFound,
}

impl<T> Existence<T> {
    pub fn exists(&self) -> bool {
        matches!(self, Existence::Exists(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Existence::Exists(value) => Some(value),
            Existence::NotFound => None,
        }
    }
}

/// Classify the result of a remote fetch.
pub fn check_exists<T>(result: RemoteResult<T>) -> Result<Existence<T>, RemoteError> {
    match result {
        Ok(value) => Ok(Existence::Exists(value)),
        Err(e) if e.is_not_found() => Ok(Existence::NotFound),
        Err(e) => Err(e),
    }
}

/// Method form of [`check_exists`] for use in call chains.
pub trait ExistenceExt<T> {
    fn existence(self) -> Result<Existence<T>, RemoteError>;
}

impl<T> ExistenceExt<T> for RemoteResult<T> {
    fn existence(self) -> Result<Existence<T>, RemoteError> {
        check_exists(self)
    }
}
