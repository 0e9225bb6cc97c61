//! Client library for controlling SAOImage DS9 over XPA
//!
//! DS9 exposes its commands through XPA access points: a get request reads a
//! setting, a set request changes one, and both travel as plain command
//! strings. This crate builds those strings, dispatches them through a
//! pluggable transport, decodes the textual or binary replies and moves pixel
//! arrays in and out of the viewer.
//!
//! # Quick Start
//!
//! ```no_run
//! use ds9_rust::command;
//! use ds9_rust::io::SessionBuilder;
//! use ndarray::Array2;
//!
//! let mut ds9 = SessionBuilder::new().xpa_tools().target("DS9:*").build();
//!
//! println!("talking to DS9 {}", ds9.version()?);
//!
//! // Send an image and zoom on it
//! let image = Array2::<f32>::from_shape_fn((256, 512), |(y, x)| (x * y) as f32);
//! ds9.set_array(&image)?;
//! ds9.set(&command!("zoom", "to", "fit"))?;
//!
//! // Read it back; the pixel type follows what the viewer holds
//! if let Some(shown) = ds9.get_image_as::<f32>()? {
//!     assert_eq!(shown.shape(), &[256, 512]);
//! }
//! # Ok::<(), ds9_rust::Ds9Error>(())
//! ```
//!
//! # Architecture
//!
//! - **`protocol`** - Pure codecs, no I/O
//!   - `command` - Argument to token conversion and command joining
//!   - `reply` - Reply of one server to one request
//!   - `decode` - Reply decoding, at runtime ([`TargetType`]) or compile time ([`FromReply`])
//!   - `pixel` - Array descriptors, byte order and pixel buffers
//!   - `version` - Version string parsing
//!
//! - **`io`** - Talking to the viewer
//!   - `Transport` - Collaborator carrying get/set requests
//!   - `XpaToolsTransport` / `MockTransport` - Transport implementations
//!   - `dispatcher` - Reply counting and error classification
//!   - `Session` / `SessionBuilder` - Access point selection and typed requests
//!   - `global` - Optional process-wide default session
//!
//! - **`error`** - Error handling
//!   - `Ds9Error` - Unified error type for all operations
//!   - `Result<T>` - Type alias for `Result<T, Ds9Error>`
//!
//! # Error Handling
//!
//! Every operation returns [`Result`]. Transport failures, missing replies,
//! ambiguous targets, server-side error messages and decoding problems are
//! distinct [`Ds9Error`] variants:
//!
//! ```
//! use ds9_rust::io::mock::MockTransport;
//! use ds9_rust::io::Session;
//! use ds9_rust::protocol::Reply;
//! use ds9_rust::Ds9Error;
//!
//! let mut mock = MockTransport::new();
//! mock.on_set("cmap nosuch", Reply::error("DS9:ds9", "invalid colormap"));
//!
//! let mut ds9 = Session::new(mock);
//! match ds9.set_cmap("nosuch") {
//!     Err(Ds9Error::Server { message, .. }) => assert_eq!(message, "invalid colormap"),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```
//!
//! [`TargetType`]: protocol::TargetType
//! [`FromReply`]: protocol::FromReply

pub mod error;
pub mod io;
pub mod protocol;

// Re-export commonly used types
pub use error::{Ds9Error, Result};
