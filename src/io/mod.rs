//! Transport and session layer
//!
//! Everything that talks to a running viewer: access point lookup, the
//! transport trait and its implementations, request dispatching and the
//! session object built on top of them.

pub mod access_point;
pub mod builder;
pub mod commands;
pub mod dispatcher;
pub mod global;
pub mod mock;
pub mod session;
pub mod transport;
pub mod xpa_tools;

pub use access_point::{Access, AccessPoint, Target};
pub use builder::SessionBuilder;
pub use dispatcher::{GetOptions, MultipleMatchPolicy, SetOptions};
pub use mock::MockTransport;
pub use session::{Session, SessionConfig};
pub use transport::Transport;
pub use xpa_tools::XpaToolsTransport;
