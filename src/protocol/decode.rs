//! Type-directed reply decoding
//!
//! A reply is interpreted according to the shape the caller asks for. The
//! shape can be named at runtime with a [`TargetType`] and fed to [`decode`],
//! or fixed at compile time through the [`FromReply`] trait:
//!
//! | Target | Algorithm |
//! |--------|-----------|
//! | raw reply | returned unprocessed |
//! | text | payload verbatim |
//! | line (default) | a single trailing `\n` stripped |
//! | words | split on a delimiter, empty tokens dropped unless kept |
//! | scalar | trimmed payload parsed as one value |
//! | tuple of N | exactly N whitespace-separated values |
//! | vector | any number of whitespace-separated values |
//! | array | raw bytes reinterpreted with the given shape and element type |
//!
//! Booleans accept `true`/`yes` and `false`/`no` only, case-sensitive.
//!
//! # Examples
//!
//! ```
//! use ds9_rust::protocol::decode::{decode_scalar, decode_tuple};
//!
//! let frame: i32 = decode_scalar("3\n")?;
//! let size: [usize; 2] = decode_tuple("1024 768\n")?;
//! let locked: bool = decode_scalar("yes")?;
//! assert_eq!((frame, size, locked), (3, [1024, 768], true));
//! # Ok::<(), ds9_rust::Ds9Error>(())
//! ```

use crate::error::{Ds9Error, Result};
use crate::protocol::pixel::{
    decode_pixels, ArrayOrder, Bitpix, ByteOrder, Endian, PixelArray, PixelElement,
};
use crate::protocol::reply::Reply;
use crate::protocol::version::Version;
use ndarray::ArrayD;

/// Parse one textual token into a value
pub trait FromText: Sized {
    fn from_text(token: &str) -> Result<Self>;
}

fn parse_error(token: &str, type_name: &str) -> Ds9Error {
    Ds9Error::Decode(format!("cannot parse \"{}\" as {}", token, type_name))
}

macro_rules! from_text_numeric {
    ($($t:ty),*) => {
        $(
            impl FromText for $t {
                fn from_text(token: &str) -> Result<Self> {
                    token.parse::<$t>().map_err(|_| parse_error(token, stringify!($t)))
                }
            }
        )*
    };
}

from_text_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl FromText for bool {
    fn from_text(token: &str) -> Result<Self> {
        match token {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            _ => Err(parse_error(token, "bool")),
        }
    }
}

impl FromText for String {
    fn from_text(token: &str) -> Result<Self> {
        Ok(token.to_string())
    }
}

/// Strip a single trailing newline
pub fn strip_newline(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

/// Token separator for word splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// Any whitespace character; runs collapse unless empty tokens are kept
    #[default]
    Whitespace,
    Char(char),
}

/// Split text into words
pub fn split_words(text: &str, delimiter: Delimiter, keep_empty: bool) -> Vec<String> {
    let pieces: Vec<&str> = match delimiter {
        Delimiter::Whitespace => text.split(char::is_whitespace).collect(),
        Delimiter::Char(c) => text.split(c).collect(),
    };
    pieces
        .into_iter()
        .filter(|w| keep_empty || !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the whole (trimmed) payload as one value
pub fn decode_scalar<T: FromText>(text: &str) -> Result<T> {
    T::from_text(text.trim())
}

/// Parse exactly `N` whitespace-separated values
pub fn decode_tuple<T: FromText, const N: usize>(text: &str) -> Result<[T; N]> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != N {
        return Err(Ds9Error::DimensionMismatch {
            expected: N,
            actual: tokens.len(),
        });
    }

    let values = tokens
        .into_iter()
        .map(T::from_text)
        .collect::<Result<Vec<T>>>()?;
    values.try_into().map_err(|v: Vec<T>| Ds9Error::DimensionMismatch {
        expected: N,
        actual: v.len(),
    })
}

/// Parse any number of whitespace-separated values
pub fn decode_vector<T: FromText>(text: &str) -> Result<Vec<T>> {
    text.split_whitespace().map(T::from_text).collect()
}

/// Element kind of a scalar, tuple or vector target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
}

/// One decoded scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl ScalarKind {
    pub fn parse(self, token: &str) -> Result<Scalar> {
        Ok(match self {
            ScalarKind::Bool => Scalar::Bool(bool::from_text(token)?),
            ScalarKind::Int => Scalar::Int(i64::from_text(token)?),
            ScalarKind::UInt => Scalar::UInt(u64::from_text(token)?),
            ScalarKind::Float => Scalar::Float(f64::from_text(token)?),
        })
    }
}

/// Shape and encoding of a binary array target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraySpec {
    pub element: Bitpix,
    pub shape: Vec<usize>,
    pub order: ArrayOrder,
    pub byte_order: ByteOrder,
}

/// Requested decoded shape
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetType {
    /// The unprocessed reply
    Reply,
    /// Payload text verbatim
    Text,
    /// Payload text minus one trailing newline
    #[default]
    Line,
    /// Words, optionally with a fixed count
    Words {
        delimiter: Delimiter,
        keep_empty: bool,
        arity: Option<usize>,
    },
    Scalar(ScalarKind),
    Tuple(ScalarKind, usize),
    Vector(ScalarKind),
    Array(ArraySpec),
}

impl TargetType {
    /// Whitespace-separated words, empty tokens dropped
    pub fn words() -> Self {
        TargetType::Words {
            delimiter: Delimiter::Whitespace,
            keep_empty: false,
            arity: None,
        }
    }

    /// Array target of a declared rank
    ///
    /// Fails with `DimensionMismatch` if `shape` does not have exactly `rank`
    /// entries.
    pub fn array(element: Bitpix, rank: usize, shape: &[usize]) -> Result<Self> {
        if shape.len() != rank {
            return Err(Ds9Error::DimensionMismatch {
                expected: rank,
                actual: shape.len(),
            });
        }
        Ok(TargetType::Array(ArraySpec {
            element,
            shape: shape.to_vec(),
            order: ArrayOrder::RowMajor,
            byte_order: Endian::Native.resolve(),
        }))
    }
}

/// Result of [`decode`]
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Reply(Reply),
    Text(String),
    Words(Vec<String>),
    Scalar(Scalar),
    Tuple(Vec<Scalar>),
    Vector(Vec<Scalar>),
    Array(PixelArray),
}

/// Decode a reply according to `target`
pub fn decode(reply: Reply, target: &TargetType) -> Result<Decoded> {
    match target {
        TargetType::Reply => Ok(Decoded::Reply(reply)),
        TargetType::Text => Ok(Decoded::Text(reply.text()?.to_string())),
        TargetType::Line => Ok(Decoded::Text(strip_newline(reply.text()?).to_string())),
        TargetType::Words {
            delimiter,
            keep_empty,
            arity,
        } => {
            let words = split_words(reply.text()?, *delimiter, *keep_empty);
            match arity {
                Some(n) if words.len() != *n => Err(Ds9Error::DimensionMismatch {
                    expected: *n,
                    actual: words.len(),
                }),
                _ => Ok(Decoded::Words(words)),
            }
        }
        TargetType::Scalar(kind) => Ok(Decoded::Scalar(kind.parse(reply.text()?.trim())?)),
        TargetType::Tuple(kind, n) => {
            let tokens: Vec<&str> = reply.text()?.split_whitespace().collect();
            if tokens.len() != *n {
                return Err(Ds9Error::DimensionMismatch {
                    expected: *n,
                    actual: tokens.len(),
                });
            }
            let values = tokens
                .into_iter()
                .map(|t| kind.parse(t))
                .collect::<Result<Vec<_>>>()?;
            Ok(Decoded::Tuple(values))
        }
        TargetType::Vector(kind) => {
            let values = reply
                .text()?
                .split_whitespace()
                .map(|t| kind.parse(t))
                .collect::<Result<Vec<_>>>()?;
            Ok(Decoded::Vector(values))
        }
        TargetType::Array(spec) => Ok(Decoded::Array(decode_array_spec(&reply.data, spec)?)),
    }
}

/// Decode a textual payload according to `target`
pub fn decode_text(text: &str, target: &TargetType) -> Result<Decoded> {
    decode(Reply::from_text("", text), target)
}

fn decode_array_spec(data: &[u8], spec: &ArraySpec) -> Result<PixelArray> {
    fn typed<T: PixelElement>(data: &[u8], spec: &ArraySpec) -> Result<PixelArray> {
        Ok(T::wrap(decode_pixels::<T>(data, &spec.shape, spec.order, spec.byte_order)?))
    }

    match spec.element {
        Bitpix::Uint8 => typed::<u8>(data, spec),
        Bitpix::Int16 => typed::<i16>(data, spec),
        Bitpix::Int32 => typed::<i32>(data, spec),
        Bitpix::Int64 => typed::<i64>(data, spec),
        Bitpix::Float32 => typed::<f32>(data, spec),
        Bitpix::Float64 => typed::<f64>(data, spec),
    }
}

/// Compile-time selected decoding of a whole reply
pub trait FromReply: Sized {
    fn from_reply(reply: Reply) -> Result<Self>;
}

impl FromReply for Reply {
    fn from_reply(reply: Reply) -> Result<Self> {
        Ok(reply)
    }
}

impl FromReply for String {
    fn from_reply(reply: Reply) -> Result<Self> {
        Ok(strip_newline(reply.text()?).to_string())
    }
}

macro_rules! from_reply_scalar {
    ($($t:ty),*) => {
        $(
            impl FromReply for $t {
                fn from_reply(reply: Reply) -> Result<Self> {
                    decode_scalar(reply.text()?)
                }
            }
        )*
    };
}

from_reply_scalar!(bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: FromText> FromReply for Vec<T> {
    fn from_reply(reply: Reply) -> Result<Self> {
        decode_vector(reply.text()?)
    }
}

impl<T: FromText, const N: usize> FromReply for [T; N] {
    fn from_reply(reply: Reply) -> Result<Self> {
        decode_tuple(reply.text()?)
    }
}

impl FromReply for Version {
    fn from_reply(reply: Reply) -> Result<Self> {
        Version::from_reply_text(reply.text()?)
    }
}

/// Decode raw reply bytes as a typed array of the given shape
pub fn decode_array<T: PixelElement>(
    reply: &Reply,
    shape: &[usize],
    order: ArrayOrder,
    byte_order: ByteOrder,
) -> Result<ArrayD<T>> {
    decode_pixels(&reply.data, shape, order, byte_order)
}
