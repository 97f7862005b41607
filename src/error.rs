use std::env;
use std::fmt;

/// Error codes are grouped by how the pipeline reacts to them:
///
/// * `1..=9` abort the whole batch (configuration, output sink setup).
/// * `10..=99` are transient request failures and get retried.
/// * `100..` are per-item outcomes that are recorded and never retried.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        matches!(self.code, 1..=9)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.code, 10..=99)
    }

    pub fn is_route_not_found(&self) -> bool {
        self.code == ROUTE_NOT_FOUND
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == CANCELLED
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        configuration_error(format!("environment variable error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        configuration_error(format!("failed to parse config: {}", err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return timeout_error();
        }
        if err.is_decode() {
            return malformed_response_error(err);
        }

        transport_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        malformed_response_error(err)
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        timeout_error()
    }
}

pub const CONFIGURATION: i32 = 1;
pub const SINK_UNAVAILABLE: i32 = 2;
pub const UNEXPECTED: i32 = 5;

pub const TRANSPORT: i32 = 10;
pub const UPSTREAM: i32 = 11;
pub const MALFORMED_RESPONSE: i32 = 12;
pub const TIMEOUT: i32 = 13;

pub const ROUTE_NOT_FOUND: i32 = 100;
pub const CANCELLED: i32 = 101;
pub const PERSISTENCE: i32 = 102;
pub const INVALID_STATE: i32 = 103;
pub const INVALID_INPUT: i32 = 104;

pub fn configuration_error(message: impl Into<String>) -> Error {
    Error {
        code: CONFIGURATION,
        message: message.into(),
    }
}

pub fn sink_unavailable_error<T: fmt::Display>(err: T) -> Error {
    Error {
        code: SINK_UNAVAILABLE,
        message: format!("output sink unavailable: {}", err),
    }
}

pub fn unexpected_error(message: impl Into<String>) -> Error {
    Error {
        code: UNEXPECTED,
        message: message.into(),
    }
}

pub fn transport_error<T: fmt::Display>(err: T) -> Error {
    Error {
        code: TRANSPORT,
        message: format!("failed to send request: {}", err),
    }
}

pub fn upstream_error(message: impl Into<String>) -> Error {
    Error {
        code: UPSTREAM,
        message: message.into(),
    }
}

pub fn malformed_response_error<T: fmt::Display>(err: T) -> Error {
    Error {
        code: MALFORMED_RESPONSE,
        message: format!("failed to parse response: {}", err),
    }
}

pub fn timeout_error() -> Error {
    Error {
        code: TIMEOUT,
        message: "attempt timed out".into(),
    }
}

pub fn route_not_found_error() -> Error {
    Error {
        code: ROUTE_NOT_FOUND,
        message: "no route found".into(),
    }
}

pub fn cancelled_error(message: impl Into<String>) -> Error {
    Error {
        code: CANCELLED,
        message: message.into(),
    }
}

pub fn persistence_error<T: fmt::Display>(err: T) -> Error {
    Error {
        code: PERSISTENCE,
        message: format!("failed to persist: {}", err),
    }
}

pub fn invalid_state_error(message: impl Into<String>) -> Error {
    Error {
        code: INVALID_STATE,
        message: message.into(),
    }
}

pub fn invalid_input_error(message: impl Into<String>) -> Error {
    Error {
        code: INVALID_INPUT,
        message: message.into(),
    }
}

#[test]
fn code_ranges_classify_errors() {
    assert!(configuration_error("bad").is_fatal());
    assert!(sink_unavailable_error("gone").is_fatal());

    assert!(transport_error("reset").is_retryable());
    assert!(upstream_error("500").is_retryable());
    assert!(timeout_error().is_retryable());

    let not_found = route_not_found_error();
    assert!(!not_found.is_retryable());
    assert!(!not_found.is_fatal());
    assert!(not_found.is_route_not_found());

    assert!(cancelled_error("deadline").is_cancelled());
    assert!(!persistence_error("disk full").is_fatal());
}
