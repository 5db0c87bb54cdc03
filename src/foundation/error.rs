/// Convenience result type used across quakereel.
pub type QuakereelResult<T> = Result<T, QuakereelError>;

/// Top-level error taxonomy used by planning, dispatch and sequence compilation.
#[derive(thiserror::Error, Debug)]
pub enum QuakereelError {
    /// Invalid user-provided configuration. Always raised before any worker starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// A timeline invariant was violated while building the plan.
    #[error("planning error: {0}")]
    Planning(String),

    /// The master/worker protocol received something it cannot interpret.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Frame sequence compilation failed.
    #[error("sequence error: {0}")]
    Sequence(String),

    /// An external collaborator (renderer or overlay preparation) failed.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuakereelError {
    /// Build a [`QuakereelError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`QuakereelError::Planning`] value.
    pub fn planning(msg: impl Into<String>) -> Self {
        Self::Planning(msg.into())
    }

    /// Build a [`QuakereelError::Dispatch`] value.
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    /// Build a [`QuakereelError::Sequence`] value.
    pub fn sequence(msg: impl Into<String>) -> Self {
        Self::Sequence(msg.into())
    }

    /// Build a [`QuakereelError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
