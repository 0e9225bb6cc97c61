//! Request dispatcher
//!
//! Sends one get or set request through a [`Transport`] and turns the raw
//! replies into a result: the first reply for a get, the list of respondents
//! for a set. Failures are classified here (no reply, ambiguous target, server
//! error); nothing is retried.

use crate::error::{Ds9Error, Result};
use crate::io::transport::Transport;
use crate::protocol::reply::Reply;
use tracing::{debug, trace, warn};

/// What to do when several access points answer a single-target get
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultipleMatchPolicy {
    /// Fail with `MultipleMatches`
    Error,
    /// Use the first reply and log a warning
    #[default]
    Warn,
    /// Use the first reply silently
    First,
}

/// Options for a get request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// Maximum number of replies wanted
    pub nmax: usize,
    pub policy: MultipleMatchPolicy,
}

impl Default for GetOptions {
    fn default() -> Self {
        GetOptions {
            nmax: 1,
            policy: MultipleMatchPolicy::default(),
        }
    }
}

/// Options for a set request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOptions {
    /// Maximum number of respondents
    pub nmax: usize,
    /// Raise the first error message reported by a respondent
    pub throw_on_error: bool,
    /// Fail with `NoReply` when nobody answered
    pub fail_on_no_reply: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        SetOptions {
            nmax: 1,
            throw_on_error: true,
            fail_on_no_reply: false,
        }
    }
}

fn no_reply(target: &str, command: &str) -> Ds9Error {
    Ds9Error::NoReply {
        target: target.to_string(),
        command: command.to_string(),
    }
}

/// Send a get request and return the first reply
///
/// # Arguments
///
/// * `transport` - Transport carrying the request
/// * `target` - Access point template or address
/// * `command` - Command string, e.g. `"fits size"`
/// * `options` - Reply count and multiple-match policy
///
/// # Errors
///
/// * `NoReply` - nobody answered (also for an empty command)
/// * `MultipleMatches` - several servers answered under [`MultipleMatchPolicy::Error`]
/// * `Server` - the first reply carries an error message
/// * `Connection` - the transport could not be reached
///
/// # Examples
///
/// ```
/// use ds9_rust::io::dispatcher::{get, GetOptions};
/// use ds9_rust::io::mock::MockTransport;
///
/// let mut mock = MockTransport::new();
/// mock.on_get_text("frame", "1\n");
///
/// let reply = get(&mut mock, "DS9:*", "frame", &GetOptions::default())?;
/// assert_eq!(reply.text()?, "1\n");
/// # Ok::<(), ds9_rust::Ds9Error>(())
/// ```
pub fn get<T: Transport + ?Sized>(
    transport: &mut T,
    target: &str,
    command: &str,
    options: &GetOptions,
) -> Result<Reply> {
    if command.trim().is_empty() {
        return Err(no_reply(target, command));
    }

    let single = options.nmax <= 1;
    let ask = if single && options.policy != MultipleMatchPolicy::First {
        2
    } else {
        options.nmax.max(1)
    };

    debug!("GET {} \"{}\" (nmax={})", target, command, ask);
    let mut replies = transport.request(target, command, ask)?;
    trace!("Received {} replies", replies.len());

    if replies.is_empty() {
        return Err(no_reply(target, command));
    }

    if single && replies.len() > 1 {
        match options.policy {
            MultipleMatchPolicy::Error => {
                return Err(Ds9Error::MultipleMatches {
                    target: target.to_string(),
                    count: replies.len(),
                });
            }
            MultipleMatchPolicy::Warn => {
                warn!(
                    "{} servers answered \"{}\" on {}, using {}",
                    replies.len(),
                    command,
                    target,
                    replies[0].server
                );
            }
            MultipleMatchPolicy::First => {}
        }
    }

    let first = replies.swap_remove(0);
    trace!("Reply from {}: {} bytes", first.server, first.len());
    first.into_result()
}

/// Send a get request and return every reply, up to `nmax`
///
/// Fails with `NoReply` if nobody answered and with `Server` if any reply
/// carries an error message.
pub fn get_all<T: Transport + ?Sized>(
    transport: &mut T,
    target: &str,
    command: &str,
    nmax: usize,
) -> Result<Vec<Reply>> {
    if command.trim().is_empty() {
        return Err(no_reply(target, command));
    }

    debug!("GET {} \"{}\" (nmax={})", target, command, nmax);
    let replies = transport.request(target, command, nmax)?;
    if replies.is_empty() {
        return Err(no_reply(target, command));
    }
    replies.into_iter().map(Reply::into_result).collect()
}

/// Send a set request and return `(server, error message)` per respondent
///
/// # Arguments
///
/// * `transport` - Transport carrying the request
/// * `target` - Access point template or address
/// * `command` - Command string, e.g. `"zoom to 2"`
/// * `payload` - Optional binary data sent after the command
/// * `options` - Respondent count and failure switches
///
/// An empty command is not sent and yields an empty list.
///
/// # Examples
///
/// ```
/// use ds9_rust::io::dispatcher::{set, SetOptions};
/// use ds9_rust::io::mock::MockTransport;
///
/// let mut mock = MockTransport::new();
/// let respondents = set(&mut mock, "DS9:*", "zoom to 2", None, &SetOptions::default())?;
/// assert_eq!(respondents, vec![("DS9:ds9".to_string(), None)]);
/// # Ok::<(), ds9_rust::Ds9Error>(())
/// ```
pub fn set<T: Transport + ?Sized>(
    transport: &mut T,
    target: &str,
    command: &str,
    payload: Option<&[u8]>,
    options: &SetOptions,
) -> Result<Vec<(String, Option<String>)>> {
    if command.trim().is_empty() {
        debug!("Skipping empty set command for {}", target);
        return Ok(Vec::new());
    }

    debug!(
        "SET {} \"{}\" ({} payload bytes)",
        target,
        command,
        payload.map_or(0, <[u8]>::len)
    );
    let replies = transport.send(target, command, payload, options.nmax.max(1))?;

    if replies.is_empty() {
        warn!("No server answered \"{}\" on {}", command, target);
        if options.fail_on_no_reply {
            return Err(no_reply(target, command));
        }
        return Ok(Vec::new());
    }

    let respondents: Vec<(String, Option<String>)> = replies
        .into_iter()
        .map(|r| {
            let message = r.error_message().map(str::to_string);
            (r.server, message)
        })
        .collect();

    if options.throw_on_error {
        if let Some((server, Some(message))) = respondents.iter().find(|(_, m)| m.is_some()) {
            return Err(Ds9Error::Server {
                server: server.clone(),
                message: message.clone(),
            });
        }
    }

    Ok(respondents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::mock::{MockTransport, RequestKind};

    fn two_servers() -> MockTransport {
        let mut mock = MockTransport::new();
        mock.on_get("frame", Reply::from_text("DS9:a", "1"))
            .on_get("frame", Reply::from_text("DS9:b", "2"));
        mock
    }

    #[test]
    fn test_get_first_reply() {
        let mut mock = MockTransport::new();
        mock.on_get_text("zoom", "4\n");
        let reply = get(&mut mock, "DS9:*", "zoom", &GetOptions::default()).unwrap();
        assert_eq!(reply.text().unwrap(), "4\n");
    }

    #[test]
    fn test_get_no_reply() {
        let mut mock = MockTransport::new();
        match get(&mut mock, "DS9:*", "zoom", &GetOptions::default()) {
            Err(Ds9Error::NoReply { target, command }) => {
                assert_eq!(target, "DS9:*");
                assert_eq!(command, "zoom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_get_empty_command_is_not_sent() {
        let mut mock = MockTransport::new();
        assert!(matches!(
            get(&mut mock, "DS9:*", "  ", &GetOptions::default()),
            Err(Ds9Error::NoReply { .. })
        ));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_multiple_matches_policies() {
        let mut mock = two_servers();
        let strict = GetOptions {
            nmax: 1,
            policy: MultipleMatchPolicy::Error,
        };
        assert!(matches!(
            get(&mut mock, "DS9:*", "frame", &strict),
            Err(Ds9Error::MultipleMatches { count: 2, .. })
        ));

        let warn = GetOptions::default();
        let reply = get(&mut mock, "DS9:*", "frame", &warn).unwrap();
        assert_eq!(reply.server, "DS9:a");

        let first = GetOptions {
            nmax: 1,
            policy: MultipleMatchPolicy::First,
        };
        let reply = get(&mut mock, "DS9:*", "frame", &first).unwrap();
        assert_eq!(reply.server, "DS9:a");
    }

    #[test]
    fn test_get_server_error() {
        let mut mock = MockTransport::new();
        mock.on_get("bogus", Reply::error("DS9:ds9", "unknown command"));
        match get(&mut mock, "DS9:*", "bogus", &GetOptions::default()) {
            Err(Ds9Error::Server { server, message }) => {
                assert_eq!(server, "DS9:ds9");
                assert_eq!(message, "unknown command");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_get_all() {
        let mut mock = two_servers();
        let replies = get_all(&mut mock, "DS9:*", "frame", 10).unwrap();
        assert_eq!(replies.len(), 2);
        assert!(get_all(&mut mock, "DS9:*", "zoom", 10).is_err());
    }

    #[test]
    fn test_set_throw_on_error() {
        let mut mock = MockTransport::new();
        mock.on_set("zoom to x", Reply::new("DS9:ok", Vec::<u8>::new()))
            .on_set("zoom to x", Reply::error("DS9:ds9", "invalid zoom"));

        let opts = SetOptions {
            nmax: 10,
            ..SetOptions::default()
        };
        match set(&mut mock, "DS9:*", "zoom to x", None, &opts) {
            Err(Ds9Error::Server { server, message }) => {
                assert_eq!(server, "DS9:ds9");
                assert_eq!(message, "invalid zoom");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let lenient = SetOptions {
            throw_on_error: false,
            ..opts
        };
        let respondents = set(&mut mock, "DS9:*", "zoom to x", None, &lenient).unwrap();
        assert_eq!(
            respondents,
            vec![
                ("DS9:ok".to_string(), None),
                ("DS9:ds9".to_string(), Some("invalid zoom".to_string())),
            ]
        );
    }

    #[test]
    fn test_set_no_respondents() {
        let mut mock = MockTransport::new();
        mock.set_alive(false);

        let respondents =
            set(&mut mock, "DS9:*", "zoom to 2", None, &SetOptions::default()).unwrap();
        assert!(respondents.is_empty());

        let strict = SetOptions {
            fail_on_no_reply: true,
            ..SetOptions::default()
        };
        assert!(matches!(
            set(&mut mock, "DS9:*", "zoom to 2", None, &strict),
            Err(Ds9Error::NoReply { .. })
        ));
    }

    #[test]
    fn test_set_empty_command() {
        let mut mock = MockTransport::new();
        let respondents = set(&mut mock, "DS9:*", "", None, &SetOptions::default()).unwrap();
        assert!(respondents.is_empty());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_set_payload_forwarded() {
        let mut mock = MockTransport::new();
        let cmd = "array [xdim=1,ydim=2,bitpix=8,endian=big]";
        set(&mut mock, "DS9:*", cmd, Some(&[7, 9]), &SetOptions::default()).unwrap();

        let recorded = &mock.requests()[0];
        assert_eq!(recorded.kind, RequestKind::Set);
        assert_eq!(recorded.payload.as_deref(), Some(&[7u8, 9][..]));
    }

    #[test]
    fn test_connection_error_propagates() {
        let mut mock = MockTransport::new();
        mock.set_reachable(false);
        assert!(matches!(
            get(&mut mock, "DS9:*", "frame", &GetOptions::default()),
            Err(Ds9Error::Connection(_))
        ));
        assert!(matches!(
            set(&mut mock, "DS9:*", "frame 1", None, &SetOptions::default()),
            Err(Ds9Error::Connection(_))
        ));
    }
}
