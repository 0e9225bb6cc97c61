//! Error types for DS9 control operations
//!
//! This module defines all error types that can occur while talking to a
//! DS9 access point, including transport failures, server-side errors and
//! reply decoding problems.

use thiserror::Error;

/// DS9 client error types
///
/// All operations in this library return `Result<T, Ds9Error>` to provide
/// explicit error handling.
#[derive(Error, Debug)]
pub enum Ds9Error {
    /// The underlying transport could not be reached or opened
    ///
    /// This error occurs when:
    /// - No XPA tool could be spawned (binaries missing from `PATH`)
    /// - The access point socket refused the connection
    /// - The selected access point stopped answering and no replacement was found
    ///
    /// The core never retries; reconnecting is left to the next call.
    ///
    /// # Example
    /// ```no_run
    /// # use ds9_rust::error::Ds9Error;
    /// # use std::io;
    /// let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "Connection refused");
    /// let err = Ds9Error::Connection(io_err);
    /// ```
    #[error("Connection error: {0}")]
    Connection(#[source] std::io::Error),

    /// No access point answered a get request
    ///
    /// A timed-out request is reported the same way as an empty one.
    #[error("No reply from {target} to \"{command}\"")]
    NoReply {
        /// Access point template or address the request was sent to
        target: String,
        /// Command string that was sent
        command: String,
    },

    /// More than one access point answered when exactly one was expected
    ///
    /// Raised only under [`MultipleMatchPolicy::Error`](crate::io::MultipleMatchPolicy).
    #[error("Ambiguous access point {target}: {count} servers answered")]
    MultipleMatches {
        /// Access point template that matched several servers
        target: String,
        /// Number of servers that answered
        count: usize,
    },

    /// The viewer reported an error for the command
    ///
    /// The message text is kept verbatim.
    ///
    /// # Example
    /// ```no_run
    /// # use ds9_rust::error::Ds9Error;
    /// let err = Ds9Error::Server {
    ///     server: "DS9:ds9".to_string(),
    ///     message: "invalid command".to_string(),
    /// };
    /// ```
    #[error("Server {server} reported: {message}")]
    Server {
        /// Identifier of the server that answered
        server: String,
        /// Error message as sent by the server
        message: String,
    },

    /// Reply payload does not match the requested type
    ///
    /// This error occurs when:
    /// - A token is not a valid number of the requested type
    /// - A boolean literal is not one of `true`, `yes`, `false`, `no`
    /// - A version reply does not look like `<name> <major>.<minor>...`
    /// - A textual payload is not valid UTF-8
    #[error("Decode error: {0}")]
    Decode(String),

    /// Token count or byte length differs from the requested shape
    ///
    /// # Example
    /// ```no_run
    /// # use ds9_rust::error::Ds9Error;
    /// let err = Ds9Error::DimensionMismatch {
    ///     expected: 2,
    ///     actual: 1,
    /// };
    /// ```
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected number of tokens, bytes or dimensions
        expected: usize,
        /// Actual number found
        actual: usize,
    },

    /// Element type has no bitpix mapping, or array rank is not 2 or 3
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Malformed access point identifier or name-server entry
    #[error("Invalid access point: {0}")]
    InvalidAccessPoint(String),

    /// Other I/O error while running a transport
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for Ds9Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound
            | ErrorKind::ConnectionRefused
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset => Ds9Error::Connection(err),
            _ => Ds9Error::Io(err),
        }
    }
}

impl From<std::string::FromUtf8Error> for Ds9Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Ds9Error::Decode(format!("reply is not valid UTF-8: {}", err))
    }
}

impl From<std::str::Utf8Error> for Ds9Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Ds9Error::Decode(format!("reply is not valid UTF-8: {}", err))
    }
}

/// Result type alias for DS9 operations
pub type Result<T> = std::result::Result<T, Ds9Error>;
