//! Scripted in-memory transport
//!
//! [`MockTransport`] stands in for a running viewer. Get replies are scripted
//! per command, set requests are recorded, and `array` uploads are checked
//! against their descriptor the way the viewer checks them.
//!
//! ```
//! use ds9_rust::io::mock::MockTransport;
//! use ds9_rust::io::SessionBuilder;
//!
//! let mut mock = MockTransport::new();
//! mock.on_get_text("version", "ds9 8.7b1\n");
//!
//! let mut session = SessionBuilder::new().transport(mock).build();
//! assert_eq!(session.version()?.minor, 7);
//! # Ok::<(), ds9_rust::Ds9Error>(())
//! ```

use std::collections::HashMap;
use std::io;

use crate::error::{Ds9Error, Result};
use crate::io::access_point::{AccessPoint, Target};
use crate::io::transport::Transport;
use crate::protocol::pixel::ArrayDescriptor;
use crate::protocol::reply::Reply;
use tracing::trace;

/// Kind of a recorded request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Get,
    Set,
}

/// One request seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub kind: RequestKind,
    pub target: String,
    pub command: String,
    pub payload: Option<Vec<u8>>,
}

/// In-memory transport answering from a script
#[derive(Debug, Clone)]
pub struct MockTransport {
    access_points: Vec<AccessPoint>,
    gets: HashMap<String, Vec<Reply>>,
    sets: HashMap<String, Vec<Reply>>,
    requests: Vec<RecordedRequest>,
    alive: bool,
    reachable: bool,
}

impl MockTransport {
    /// Mock with a single live `DS9:ds9` access point
    pub fn new() -> Self {
        MockTransport::with_access_points(vec![AccessPoint::new(
            "DS9",
            "ds9",
            "7f000001:14285",
        )])
    }

    pub fn with_access_points(access_points: Vec<AccessPoint>) -> Self {
        MockTransport {
            access_points,
            gets: HashMap::new(),
            sets: HashMap::new(),
            requests: Vec::new(),
            alive: true,
            reachable: true,
        }
    }

    /// Identifier used for scripted replies
    fn server_id(&self) -> String {
        self.access_points
            .first()
            .map(AccessPoint::id)
            .unwrap_or_else(|| "DS9:ds9".to_string())
    }

    /// Add one respondent's reply to `command`
    ///
    /// Calling this several times for the same command simulates several
    /// access points answering.
    pub fn on_get(&mut self, command: impl Into<String>, reply: Reply) -> &mut Self {
        self.gets.entry(command.into()).or_default().push(reply);
        self
    }

    /// Script a textual reply from the first access point
    pub fn on_get_text(
        &mut self,
        command: impl Into<String>,
        text: impl Into<String>,
    ) -> &mut Self {
        let reply = Reply::from_text(self.server_id(), text);
        self.on_get(command, reply)
    }

    /// Script a binary reply from the first access point
    pub fn on_get_bytes(&mut self, command: impl Into<String>, data: Vec<u8>) -> &mut Self {
        let reply = Reply::new(self.server_id(), data);
        self.on_get(command, reply)
    }

    /// Script the replies to a set command
    ///
    /// Unscripted set commands get one empty reply per matching access point.
    pub fn on_set(&mut self, command: impl Into<String>, reply: Reply) -> &mut Self {
        self.sets.entry(command.into()).or_default().push(reply);
        self
    }

    /// Make every access point stop (or resume) answering
    pub fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    /// Make every request fail as if the transport could not be reached
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Replace the registered access points
    pub fn set_access_points(&mut self, access_points: Vec<AccessPoint>) {
        self.access_points = access_points;
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> &[RecordedRequest] {
        &self.requests
    }

    /// Commands sent so far, oldest first
    pub fn commands(&self) -> Vec<&str> {
        self.requests.iter().map(|r| r.command.as_str()).collect()
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(Ds9Error::Connection(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "mock transport is unreachable",
            )))
        }
    }

    fn matching(&self, target: &str) -> Vec<&AccessPoint> {
        if !self.alive {
            return Vec::new();
        }
        match target.parse::<Target>() {
            Ok(t) => self.access_points.iter().filter(|ap| ap.matches(&t)).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Check an `array` upload against its descriptor
    fn check_array(&self, command: &str, payload: Option<&[u8]>) -> Option<String> {
        let text = command.strip_prefix("array ")?;
        let descriptor = match text.parse::<ArrayDescriptor>() {
            Ok(d) => d,
            Err(e) => return Some(e.to_string()),
        };
        let expected = match descriptor.byte_len() {
            Ok(n) => n,
            Err(e) => return Some(e.to_string()),
        };
        let len = payload.map_or(0, <[u8]>::len);
        if len != expected {
            return Some(format!("array: expected {} bytes, received {}", expected, len));
        }
        None
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn lookup(&mut self, template: &str) -> Result<Vec<AccessPoint>> {
        self.check_reachable()?;
        Ok(self.matching(template).into_iter().cloned().collect())
    }

    fn is_alive(&mut self, ap: &AccessPoint) -> bool {
        self.reachable && self.alive && self.access_points.iter().any(|a| a.address == ap.address)
    }

    fn request(&mut self, target: &str, command: &str, nmax: usize) -> Result<Vec<Reply>> {
        self.check_reachable()?;
        self.requests.push(RecordedRequest {
            kind: RequestKind::Get,
            target: target.to_string(),
            command: command.to_string(),
            payload: None,
        });

        if self.matching(target).is_empty() {
            return Ok(Vec::new());
        }
        let mut replies = self.gets.get(command).cloned().unwrap_or_default();
        replies.truncate(nmax);
        trace!("Mock answering \"{}\" with {} replies", command, replies.len());
        Ok(replies)
    }

    fn send(
        &mut self,
        target: &str,
        command: &str,
        payload: Option<&[u8]>,
        nmax: usize,
    ) -> Result<Vec<Reply>> {
        self.check_reachable()?;
        self.requests.push(RecordedRequest {
            kind: RequestKind::Set,
            target: target.to_string(),
            command: command.to_string(),
            payload: payload.map(<[u8]>::to_vec),
        });

        let respondents = self.matching(target);
        if respondents.is_empty() {
            return Ok(Vec::new());
        }

        let mut replies = match self.sets.get(command) {
            Some(scripted) => scripted.clone(),
            None => {
                let array_error = self.check_array(command, payload);
                respondents
                    .into_iter()
                    .map(|ap| match &array_error {
                        Some(msg) => Reply::error(ap.id(), msg.clone()),
                        None => Reply::new(ap.id(), Vec::<u8>::new()),
                    })
                    .collect()
            }
        };
        replies.truncate(nmax);
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_get() {
        let mut mock = MockTransport::new();
        mock.on_get_text("frame", "1\n");

        let replies = mock.request("DS9:*", "frame", 1).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text().unwrap(), "1\n");
        assert_eq!(replies[0].server, "DS9:ds9");

        assert!(mock.request("DS9:*", "zoom", 1).unwrap().is_empty());
        assert_eq!(mock.commands(), vec!["frame", "zoom"]);
    }

    #[test]
    fn test_nmax_truncates() {
        let mut mock = MockTransport::new();
        mock.on_get("frame", Reply::from_text("DS9:a", "1"))
            .on_get("frame", Reply::from_text("DS9:b", "2"));

        assert_eq!(mock.request("DS9:*", "frame", 1).unwrap().len(), 1);
        assert_eq!(mock.request("DS9:*", "frame", 5).unwrap().len(), 2);
    }

    #[test]
    fn test_unmatched_target_gets_nothing() {
        let mut mock = MockTransport::new();
        mock.on_get_text("frame", "1");
        assert!(mock.request("DS9:other", "frame", 1).unwrap().is_empty());
    }

    #[test]
    fn test_set_default_reply_and_recording() {
        let mut mock = MockTransport::new();
        let replies = mock.send("DS9:*", "zoom to 2", None, 1).unwrap();
        assert_eq!(replies.len(), 1);
        assert!(!replies[0].is_error);

        let recorded = &mock.requests()[0];
        assert_eq!(recorded.kind, RequestKind::Set);
        assert_eq!(recorded.command, "zoom to 2");
        assert_eq!(recorded.payload, None);
    }

    #[test]
    fn test_array_upload_checked() {
        let mut mock = MockTransport::new();
        let cmd = "array [xdim=2,ydim=2,bitpix=8,endian=little]";

        let ok = mock.send("DS9:*", cmd, Some(&[1, 2, 3, 4]), 1).unwrap();
        assert!(!ok[0].is_error);

        let short = mock.send("DS9:*", cmd, Some(&[1, 2, 3]), 1).unwrap();
        assert!(short[0].is_error);
        assert!(short[0].error_message().unwrap().contains("expected 4 bytes"));
    }

    #[test]
    fn test_array_upload_oversized_descriptor() {
        let mut mock = MockTransport::new();
        let cmd = "array [xdim=4294967296,ydim=4294967296,bitpix=16,endian=big]";

        let replies = mock.send("DS9:*", cmd, Some(&[0; 2]), 1).unwrap();
        assert!(replies[0].is_error);
        assert!(replies[0].error_message().unwrap().contains("too large"));
    }

    #[test]
    fn test_unreachable() {
        let mut mock = MockTransport::new();
        mock.set_reachable(false);
        assert!(matches!(
            mock.request("DS9:*", "frame", 1),
            Err(Ds9Error::Connection(_))
        ));
        assert!(mock.lookup("DS9:*").is_err());
    }

    #[test]
    fn test_lookup_and_liveness() {
        let mut mock = MockTransport::new();
        let found = mock.lookup("ds9").unwrap();
        assert_eq!(found.len(), 1);
        assert!(mock.is_alive(&found[0]));

        mock.set_alive(false);
        assert!(!mock.is_alive(&found[0]));
        assert!(mock.lookup("ds9").unwrap().is_empty());
    }
}
