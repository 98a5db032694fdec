//! The unified error handling system for the crate.

use std::fmt::Display;

pub use auth::AuthError;
pub use types::HtxpError;

/// A unified `Result` type for the entire crate.
pub type Result<T> = std::result::Result<T, HtxpError>;

pub mod auth;
pub mod macros;
pub mod types;

/// Context Trait for adding context to errors.
pub trait Context<T, E> {
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display;

    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<HtxpError>,
{
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display,
    {
        self.with_context(|| context)
    }

    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(HtxpError::Context {
                context: context().to_string(),
                source: Box::new(error.into()),
            }),
        }
    }
}

/// Helper to attach context to an error without intermediate boilerplate.
#[track_caller]
pub fn context_error<T>(err: impl Into<HtxpError>, context: impl Display) -> Result<T> {
    Err(err.into()).context(context)
}

/// Error Category for logging levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Errors caused by the client (bad input, invalid credentials).
    Client,
    /// Errors caused by the server or its dependencies.
    Server,
}
