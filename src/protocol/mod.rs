//! DS9 request/reply codecs
//!
//! This module holds the pure (I/O free) half of the library: building
//! command strings, decoding replies and marshaling pixel arrays.

pub mod command;
pub mod decode;
pub mod pixel;
pub mod reply;
pub mod version;

// Re-export commonly used types
pub use command::{build, Token};
pub use decode::{decode, Decoded, FromReply, FromText, TargetType};
pub use pixel::{ArrayDescriptor, ArrayOrder, Bitpix, ByteOrder, Endian, PixelArray, PixelElement};
pub use reply::Reply;
pub use version::Version;
