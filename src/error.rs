// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `kasa_poller` library.
//!
//! Failures are classified where they happen: a [`DeviceClient`] returns a
//! [`ClientError`] carrying a [`FailureKind`], and the poller decides what to
//! do from that kind alone. Error messages are never re-parsed.
//!
//! [`DeviceClient`]: crate::client::DeviceClient

use std::fmt;
use std::io;

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The device client failed to talk to the device.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// The host platform rejected an operation.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// A value was outside its valid range.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A status payload could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Device was not found in the poller.
    #[error("device not found")]
    DeviceNotFound,

    /// Device model does not support the requested capability.
    #[error("device does not support this capability")]
    CapabilityNotSupported,
}

/// Classification of a device client failure.
///
/// The poller reacts to the kind only: unreachable hosts escalate towards
/// rediscovery, everything else is transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No route to the device (it moved or is powered off).
    HostUnreachable,
    /// The device dropped the connection mid-request.
    ConnectionReset,
    /// The request did not complete in time.
    Timeout,
    /// The device answered with something that could not be understood.
    MalformedResponse,
    /// Any other failure.
    Other,
}

impl FailureKind {
    /// Returns `true` if this failure should count towards rediscovery.
    #[must_use]
    pub const fn is_unreachable(self) -> bool {
        matches!(self, Self::HostUnreachable)
    }

    /// Returns a short lowercase name, used in logs and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HostUnreachable => "host unreachable",
            Self::ConnectionReset => "connection reset",
            Self::Timeout => "timeout",
            Self::MalformedResponse => "malformed response",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a [`DeviceClient`](crate::client::DeviceClient).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ClientError {
    kind: FailureKind,
    message: String,
}

impl ClientError {
    /// Creates a client error of the given kind.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a host-unreachable error.
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::HostUnreachable, message)
    }

    /// Creates a connection-reset error.
    #[must_use]
    pub fn connection_reset(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ConnectionReset, message)
    }

    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, message)
    }

    /// Classifies an I/O error from a socket operation.
    #[must_use]
    pub fn from_io(err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable => FailureKind::HostUnreachable,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => FailureKind::ConnectionReset,
            io::ErrorKind::TimedOut => FailureKind::Timeout,
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                FailureKind::MalformedResponse
            }
            _ => FailureKind::Other,
        };
        Self::new(kind, err.to_string())
    }

    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the human readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        Self::from_io(&err)
    }
}

impl From<ParseError> for ClientError {
    fn from(err: ParseError) -> Self {
        Self::malformed(err.to_string())
    }
}

/// Errors reported by a [`HostPlatform`](crate::host::HostPlatform).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The host does not know the device.
    #[error("unknown device: {0}")]
    UnknownDevice(String),

    /// The host rejected a capability value.
    #[error("capability {capability} rejected: {message}")]
    CapabilityRejected {
        /// The capability name.
        capability: String,
        /// Why it was rejected.
        message: String,
    },

    /// The settings store failed.
    #[error("settings store failed: {0}")]
    Settings(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// A polling interval of zero seconds was requested.
    #[error("polling interval must be at least one second")]
    ZeroInterval,

    /// A polling interval longer than one day was requested.
    #[error("polling interval of {0} seconds is too large")]
    IntervalTooLarge(u64),

    /// An unknown light mode string was provided.
    #[error("invalid light mode: {0}")]
    InvalidLightMode(String),

    /// An energy offset was negative or not a finite number.
    #[error("invalid energy offset: {0}")]
    InvalidEnergyOffset(f64),
}

/// Errors related to parsing device status payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the payload.
    #[error("missing field in status: {0}")]
    MissingField(String),

    /// The payload reported an error code.
    #[error("device reported error code {code}: {message}")]
    DeviceError {
        /// The vendor error code.
        code: i64,
        /// The vendor error message.
        message: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
        assert_eq!(
            ValueError::IntervalTooLarge(90_000).to_string(),
            "polling interval of 90000 seconds is too large"
        );
    }

    #[test]
    fn client_error_display() {
        let err = ClientError::unreachable("connect 10.0.0.7:9999");
        assert_eq!(err.to_string(), "host unreachable: connect 10.0.0.7:9999");
    }

    #[test]
    fn io_errors_are_classified() {
        let unreachable = io::Error::from(io::ErrorKind::HostUnreachable);
        assert_eq!(
            ClientError::from_io(&unreachable).kind(),
            FailureKind::HostUnreachable
        );

        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(
            ClientError::from(reset).kind(),
            FailureKind::ConnectionReset
        );

        let other = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(ClientError::from(other).kind(), FailureKind::Other);
    }

    #[test]
    fn only_unreachable_escalates() {
        assert!(FailureKind::HostUnreachable.is_unreachable());
        assert!(!FailureKind::ConnectionReset.is_unreachable());
        assert!(!FailureKind::Timeout.is_unreachable());
    }

    #[test]
    fn error_from_client_error() {
        let err: Error = ClientError::connection_reset("peer closed").into();
        assert!(matches!(err, Error::Client(e) if e.kind() == FailureKind::ConnectionReset));
    }

    #[test]
    fn parse_error_becomes_malformed_client_error() {
        let err: ClientError = ParseError::MissingField("relay_state".to_string()).into();
        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }
}
