//! Transport abstraction
//!
//! The library never talks to the viewer directly. A [`Transport`] carries
//! get/set requests to every access point selected by a target and hands the
//! replies back. Implementations decide how: [`XpaToolsTransport`] drives the
//! XPA command-line tools, [`MockTransport`] answers from a script.
//!
//! [`XpaToolsTransport`]: crate::io::xpa_tools::XpaToolsTransport
//! [`MockTransport`]: crate::io::mock::MockTransport

use crate::error::Result;
use crate::io::access_point::AccessPoint;
use crate::protocol::reply::Reply;

/// Messaging transport collaborator
///
/// Calls block until the transport answers or gives up. A timed-out request
/// is reported as an empty reply list, never as an error; errors are reserved
/// for failing to reach the transport at all.
pub trait Transport {
    /// List the access points matching `template`
    fn lookup(&mut self, template: &str) -> Result<Vec<AccessPoint>>;

    /// Whether `ap` still answers
    fn is_alive(&mut self, ap: &AccessPoint) -> bool;

    /// Get request: at most `nmax` replies from the access points matching `target`
    fn request(&mut self, target: &str, command: &str, nmax: usize) -> Result<Vec<Reply>>;

    /// Set request with an optional binary payload
    fn send(
        &mut self,
        target: &str,
        command: &str,
        payload: Option<&[u8]>,
        nmax: usize,
    ) -> Result<Vec<Reply>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn lookup(&mut self, template: &str) -> Result<Vec<AccessPoint>> {
        (**self).lookup(template)
    }

    fn is_alive(&mut self, ap: &AccessPoint) -> bool {
        (**self).is_alive(ap)
    }

    fn request(&mut self, target: &str, command: &str, nmax: usize) -> Result<Vec<Reply>> {
        (**self).request(target, command, nmax)
    }

    fn send(
        &mut self,
        target: &str,
        command: &str,
        payload: Option<&[u8]>,
        nmax: usize,
    ) -> Result<Vec<Reply>> {
        (**self).send(target, command, payload, nmax)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn lookup(&mut self, template: &str) -> Result<Vec<AccessPoint>> {
        (**self).lookup(template)
    }

    fn is_alive(&mut self, ap: &AccessPoint) -> bool {
        (**self).is_alive(ap)
    }

    fn request(&mut self, target: &str, command: &str, nmax: usize) -> Result<Vec<Reply>> {
        (**self).request(target, command, nmax)
    }

    fn send(
        &mut self,
        target: &str,
        command: &str,
        payload: Option<&[u8]>,
        nmax: usize,
    ) -> Result<Vec<Reply>> {
        (**self).send(target, command, payload, nmax)
    }
}
