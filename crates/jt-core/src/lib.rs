//! Shared primitives used across JittyRunner crates.

use core::fmt;

/// Result alias used across the workspace.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Error carried across crate boundaries.
///
/// `code` is a stable dotted identifier (`net.url.invalid`,
/// `js.context.bootstrap_failed`, ...) that tests and callers match on;
/// `message` is the human-readable description that ends up in logs and in
/// script-visible rejection values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerError {
    pub code: &'static str,
    pub message: String,
}

impl RunnerError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RunnerError {}

#[cfg(test)]
mod tests {
    use super::RunnerError;

    #[test]
    fn display_includes_code_and_message() {
        let error = RunnerError::new("net.url.invalid", "failed to parse URL `x`");
        assert_eq!(error.to_string(), "net.url.invalid: failed to parse URL `x`");
    }
}
