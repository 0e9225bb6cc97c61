//! Reply returned by one access point for one request

use crate::error::{Ds9Error, Result};
use bytes::Bytes;

/// Data, message and error status returned by a single server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    /// Identifier of the server that answered (`class:name` or address)
    pub server: String,
    /// Raw payload
    pub data: Bytes,
    /// Optional textual message accompanying the payload
    pub message: Option<String>,
    /// Whether `message` reports an error
    pub is_error: bool,
}

impl Reply {
    /// Create a successful reply carrying `data`
    pub fn new(server: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Reply {
            server: server.into(),
            data: data.into(),
            message: None,
            is_error: false,
        }
    }

    /// Create a reply carrying a textual payload
    pub fn from_text(server: impl Into<String>, text: impl Into<String>) -> Self {
        Reply::new(server, Bytes::from(text.into()))
    }

    /// Create an error reply
    pub fn error(server: impl Into<String>, message: impl Into<String>) -> Self {
        Reply {
            server: server.into(),
            data: Bytes::new(),
            message: Some(message.into()),
            is_error: true,
        }
    }

    /// Attach a non-error message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Error message, if the server reported one
    ///
    /// An error flag with an empty message yields `None`.
    pub fn error_message(&self) -> Option<&str> {
        if !self.is_error {
            return None;
        }
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    /// Convert into `Err(Ds9Error::Server)` when the server reported an error
    pub fn into_result(self) -> Result<Self> {
        match self.error_message() {
            Some(message) => Err(Ds9Error::Server {
                server: self.server.clone(),
                message: message.to_string(),
            }),
            None => Ok(self),
        }
    }

    /// Payload interpreted as text
    pub fn text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.data)?)
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload() {
        let reply = Reply::from_text("DS9:ds9", "1024 768\n");
        assert_eq!(reply.text().unwrap(), "1024 768\n");
        assert_eq!(reply.len(), 9);
        assert!(reply.error_message().is_none());
    }

    #[test]
    fn test_error_reply() {
        let reply = Reply::error("DS9:ds9", "invalid command");
        assert_eq!(reply.error_message(), Some("invalid command"));

        match reply.into_result() {
            Err(Ds9Error::Server { server, message }) => {
                assert_eq!(server, "DS9:ds9");
                assert_eq!(message, "invalid command");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_message_without_error_flag() {
        let reply = Reply::new("DS9:ds9", Vec::<u8>::new()).with_message("loading");
        assert!(reply.error_message().is_none());
        assert!(reply.into_result().is_ok());
    }

    #[test]
    fn test_non_utf8_text_fails() {
        let reply = Reply::new("DS9:ds9", vec![0xFFu8, 0x00]);
        assert!(matches!(reply.text(), Err(Ds9Error::Decode(_))));
    }
}
