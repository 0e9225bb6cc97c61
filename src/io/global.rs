//! Process-wide default session
//!
//! Scripts that drive a single viewer can skip threading a [`Session`]
//! through every call. The default session lives behind a mutex; it is
//! created on first use with the XPA tools transport unless one was installed
//! with [`install`].
//!
//! ```no_run
//! use ds9_rust::io::global;
//!
//! global::connect("DS9:ds9")?;
//! let zoom = global::with_default(|ds9| ds9.zoom())?;
//! global::with_default(|ds9| ds9.set_zoom(zoom * 2.0))?;
//! # Ok::<(), ds9_rust::Ds9Error>(())
//! ```

use std::sync::{Mutex, MutexGuard};

use crate::error::Result;
use crate::io::access_point::AccessPoint;
use crate::io::session::Session;
use crate::io::transport::Transport;
use crate::io::xpa_tools::XpaToolsTransport;
use tracing::debug;

/// Session type held as the process default
pub type DefaultSession = Session<Box<dyn Transport + Send>>;

static DEFAULT: Mutex<Option<DefaultSession>> = Mutex::new(None);

fn lock() -> MutexGuard<'static, Option<DefaultSession>> {
    // A panic inside a callback leaves the session itself usable
    DEFAULT.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn xpa_session() -> DefaultSession {
    let transport: Box<dyn Transport + Send> = Box::new(XpaToolsTransport::new());
    Session::new(transport)
}

/// Replace the default session
pub fn install<T: Transport + Send + 'static>(session: Session<T>) {
    let config = session.config().clone();
    let transport: Box<dyn Transport + Send> = Box::new(session.into_transport());
    debug!("Installing default session for {}", config.target);
    *lock() = Some(Session::with_config(transport, config));
}

/// Select the access point of the default session
pub fn connect(template: &str) -> Result<AccessPoint> {
    lock().get_or_insert_with(xpa_session).connect(template)
}

/// Run `f` against the default session
///
/// The default session stays locked while `f` runs. `f` must not call back
/// into this module ([`install`], [`connect`], [`with_default`] or
/// [`disconnect`]); that deadlocks. Use the session handed to `f` instead,
/// e.g. `ds9.connect(..)` rather than `global::connect(..)`.
pub fn with_default<R>(f: impl FnOnce(&mut DefaultSession) -> Result<R>) -> Result<R> {
    f(lock().get_or_insert_with(xpa_session))
}

/// Drop the default session
pub fn disconnect() {
    if lock().take().is_some() {
        debug!("Default session dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::mock::MockTransport;

    #[test]
    fn test_default_session_lifecycle() {
        let mut mock = MockTransport::new();
        mock.on_get_text("frame", "4\n");
        install(Session::new(mock));

        let ap = connect("DS9:ds9").unwrap();
        assert_eq!(ap.id(), "DS9:ds9");
        assert_eq!(with_default(|ds9| ds9.frame()).unwrap(), 4);
        with_default(|ds9| ds9.set_frame(5)).unwrap();

        let current = with_default(|ds9| Ok(ds9.current().cloned())).unwrap();
        assert_eq!(current, Some(ap));

        // reconnecting through the borrowed session, not the module
        let ap = with_default(|ds9| ds9.connect("7f000001:14285")).unwrap();
        assert_eq!(connect("7f000001:14285").unwrap(), ap);

        disconnect();
        assert!(lock().is_none());
    }
}
