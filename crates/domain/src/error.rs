use thiserror::Error;

/// Errors surfaced to callers of the printing client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrintError {
    #[error("Invalid argument `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    #[error("Printer service is not available")]
    ServiceUnavailable,

    #[error("Call to printer service timed out")]
    Timeout,

    #[error("Printer service reported failure (code {code}): {message}")]
    RemoteFailure { code: i32, message: String },

    /// Transport-level failure. Never handed to callers directly; the
    /// connection layer converts it into `ServiceUnavailable` and tears
    /// down the binding.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl PrintError {
    /// Build an `InvalidArgument` error naming the offending field.
    pub fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// Build a `RemoteFailure` from a vendor result code and message.
    pub fn remote(code: i32, message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            code,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_names_field() {
        let err = PrintError::invalid_argument("textSize", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid argument `textSize`: must be positive"
        );
    }

    #[test]
    fn test_remote_failure_carries_code_and_message() {
        let err = PrintError::remote(-3, "head overheated");
        match err {
            PrintError::RemoteFailure { code, message } => {
                assert_eq!(code, -3);
                assert_eq!(message, "head overheated");
            }
            _ => panic!("Wrong error variant"),
        }
    }
}
