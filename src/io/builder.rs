//! Type-state builder for viewer sessions
//!
//! A session cannot be built before a transport is chosen; the transport
//! selection moves the builder from [`Unspecified`] to a configured state, and
//! only configured builders have `build()`.
//!
//! # Examples
//!
//! ```no_run
//! use ds9_rust::io::builder::SessionBuilder;
//! use ds9_rust::io::MultipleMatchPolicy;
//!
//! let mut session = SessionBuilder::new()
//!     .xpa_tools()
//!     .target("DS9:ds9")
//!     .multiple_matches(MultipleMatchPolicy::Error)
//!     .build();
//! session.set("frame new")?;
//! # Ok::<(), ds9_rust::Ds9Error>(())
//! ```
//!
//! Not selecting a transport is a compile error:
//!
//! ```compile_fail
//! use ds9_rust::io::builder::SessionBuilder;
//!
//! let session = SessionBuilder::new().target("DS9:ds9").build();
//! ```

use crate::io::dispatcher::MultipleMatchPolicy;
use crate::io::session::{Session, SessionConfig};
use crate::io::transport::Transport;
use crate::io::xpa_tools::XpaToolsTransport;
use crate::protocol::pixel::{ArrayOrder, Endian};

/// No transport selected yet
pub struct Unspecified;

/// Type-state builder for [`Session`]
///
/// # Type Parameters
/// * `Tr` - Transport state ([`Unspecified`] or a [`Transport`] implementation)
pub struct SessionBuilder<Tr = Unspecified> {
    transport: Tr,
    config: SessionConfig,
}

impl SessionBuilder<Unspecified> {
    /// Create a new session builder with default settings
    ///
    /// # Examples
    ///
    /// ```
    /// use ds9_rust::io::builder::SessionBuilder;
    ///
    /// let builder = SessionBuilder::new();
    /// ```
    pub fn new() -> Self {
        SessionBuilder {
            transport: Unspecified,
            config: SessionConfig::default(),
        }
    }

    /// Use a custom transport
    ///
    /// # Examples
    ///
    /// ```
    /// use ds9_rust::io::builder::SessionBuilder;
    /// use ds9_rust::io::mock::MockTransport;
    ///
    /// let session = SessionBuilder::new().transport(MockTransport::new()).build();
    /// ```
    pub fn transport<T: Transport>(self, transport: T) -> SessionBuilder<T> {
        SessionBuilder {
            transport,
            config: self.config,
        }
    }

    /// Use the XPA command-line tools found on `PATH`
    pub fn xpa_tools(self) -> SessionBuilder<XpaToolsTransport> {
        self.transport(XpaToolsTransport::new())
    }
}

impl Default for SessionBuilder<Unspecified> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> SessionBuilder<T> {
    /// Build the session
    ///
    /// Nothing is contacted here; the access point is looked up by the first
    /// request.
    pub fn build(self) -> Session<T> {
        Session::with_config(self.transport, self.config)
    }
}

impl<Tr> SessionBuilder<Tr> {
    /// Access point template or address
    ///
    /// Default: `DS9:*`
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.config.target = target.into();
        self
    }

    /// Behavior when a template matches several access points
    ///
    /// Default: [`MultipleMatchPolicy::Warn`]
    pub fn multiple_matches(mut self, policy: MultipleMatchPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Raise server error messages on set requests
    ///
    /// Default: true
    pub fn throw_on_error(mut self, enabled: bool) -> Self {
        self.config.throw_on_error = enabled;
        self
    }

    /// Fail set requests nobody answered
    ///
    /// Default: false (a warning is logged)
    pub fn fail_on_no_reply(mut self, enabled: bool) -> Self {
        self.config.fail_on_no_reply = enabled;
        self
    }

    /// Array layout used for images
    ///
    /// Default: [`ArrayOrder::RowMajor`]
    pub fn array_order(mut self, order: ArrayOrder) -> Self {
        self.config.order = order;
        self
    }

    /// Byte order of binary transfers
    ///
    /// Default: [`Endian::Native`]
    pub fn endian(mut self, endian: Endian) -> Self {
        self.config.endian = endian;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::mock::MockTransport;
    use crate::io::session::DEFAULT_TARGET;

    #[test]
    fn test_builder_state_transitions() {
        let builder = SessionBuilder::new();
        let builder = builder.transport(MockTransport::new());
        let _session = builder.build();

        let _xpa = SessionBuilder::new().xpa_tools().build();
    }

    #[test]
    fn test_builder_defaults() {
        let session = SessionBuilder::new().transport(MockTransport::new()).build();
        let config = session.config();
        assert_eq!(config.target, DEFAULT_TARGET);
        assert_eq!(config.policy, MultipleMatchPolicy::Warn);
        assert!(config.throw_on_error);
        assert!(!config.fail_on_no_reply);
        assert_eq!(config.order, ArrayOrder::RowMajor);
        assert_eq!(config.endian, Endian::Native);
        assert!(session.current().is_none());
    }

    #[test]
    fn test_builder_options() {
        // options set before and after the transport are both kept
        let session = SessionBuilder::new()
            .target("DS9:viewer")
            .multiple_matches(MultipleMatchPolicy::Error)
            .transport(MockTransport::new())
            .throw_on_error(false)
            .fail_on_no_reply(true)
            .array_order(ArrayOrder::ColumnMajor)
            .endian(Endian::Big)
            .build();

        let config = session.config();
        assert_eq!(config.target, "DS9:viewer");
        assert_eq!(config.policy, MultipleMatchPolicy::Error);
        assert!(!config.throw_on_error);
        assert!(config.fail_on_no_reply);
        assert_eq!(config.order, ArrayOrder::ColumnMajor);
        assert_eq!(config.endian, Endian::Big);
    }

    #[test]
    fn test_build_does_not_contact_transport() {
        let mut mock = MockTransport::new();
        mock.set_reachable(false);
        let session = SessionBuilder::new().transport(mock).build();
        assert!(session.transport().requests().is_empty());
    }
}
