//! Pixel array marshaling
//!
//! DS9 exchanges image pixels through its `array` command. Sending an image
//! pairs a descriptor string with the raw pixel bytes:
//!
//! ```text
//! [xdim=512,ydim=512,bitpix=-32,endian=little]
//! ```
//!
//! Reading an image back takes three round trips: the bit depth
//! (`fits bitpix`), the dimension list (`fits size`) and finally the raw bytes
//! (`array <endian>`). This module holds the pure half of both directions;
//! [`Session`](crate::io::Session) drives the requests.
//!
//! # Element Types
//!
//! | bitpix | Rust type |
//! |--------|-----------|
//! | 8      | `u8`      |
//! | 16     | `i16`     |
//! | 32     | `i32`     |
//! | 64     | `i64`     |
//! | -32    | `f32`     |
//! | -64    | `f64`     |
//!
//! Arrays of other numeric types are widened before sending (see
//! [`IntoPixel`]): `i8` becomes `i16`, `u16` becomes `f32`, and wider or other
//! unsigned integers become `f64`.
//!
//! # Layout
//!
//! The wire buffer is always x-fastest. With [`ArrayOrder::RowMajor`] an image
//! is an array of shape `[ydim, xdim]` (or `[zdim, ydim, xdim]`); with
//! [`ArrayOrder::ColumnMajor`] it has shape `[xdim, ydim(, zdim)]` in Fortran
//! layout.
//!
//! # Examples
//!
//! ```
//! use ds9_rust::protocol::pixel::{describe, ArrayOrder, Endian};
//! use ndarray::Array2;
//!
//! // 3 rows of 4 pixels
//! let image = Array2::<u8>::zeros((3, 4));
//! let desc = describe(&image, ArrayOrder::RowMajor, Endian::Big)?;
//! assert_eq!(desc.to_string(), "[xdim=4,ydim=3,bitpix=8,endian=big]");
//! # Ok::<(), ds9_rust::Ds9Error>(())
//! ```

use crate::error::{Ds9Error, Result};
use bytes::{Buf, BufMut};
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn, ShapeBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FITS bits-per-pixel code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bitpix {
    Uint8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl Bitpix {
    /// Map a FITS code to a pixel type
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            8 => Ok(Bitpix::Uint8),
            16 => Ok(Bitpix::Int16),
            32 => Ok(Bitpix::Int32),
            64 => Ok(Bitpix::Int64),
            -32 => Ok(Bitpix::Float32),
            -64 => Ok(Bitpix::Float64),
            _ => Err(Ds9Error::UnsupportedType(format!(
                "bitpix {} has no pixel type",
                code
            ))),
        }
    }

    /// FITS code of this pixel type
    pub fn code(&self) -> i32 {
        match self {
            Bitpix::Uint8 => 8,
            Bitpix::Int16 => 16,
            Bitpix::Int32 => 32,
            Bitpix::Int64 => 64,
            Bitpix::Float32 => -32,
            Bitpix::Float64 => -64,
        }
    }

    /// Get size in bytes
    pub fn size(&self) -> usize {
        match self {
            Bitpix::Uint8 => 1,
            Bitpix::Int16 => 2,
            Bitpix::Int32 | Bitpix::Float32 => 4,
            Bitpix::Int64 | Bitpix::Float64 => 8,
        }
    }
}

impl fmt::Display for Bitpix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Concrete byte order of a pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Value whose in-memory bytes reveal the host byte order
const BYTE_ORDER_PROBE: u16 = 0x0102;

impl ByteOrder {
    /// Classify the in-memory bytes of `0x0102u16`
    ///
    /// Returns `None` if the bytes match neither order.
    pub fn detect(probe: [u8; 2]) -> Option<Self> {
        match probe {
            [0x01, 0x02] => Some(ByteOrder::Big),
            [0x02, 0x01] => Some(ByteOrder::Little),
            _ => None,
        }
    }

    /// Byte order of the running host
    pub fn native() -> Self {
        ByteOrder::detect(BYTE_ORDER_PROBE.to_ne_bytes()).unwrap_or(ByteOrder::Little)
    }

    /// Keyword used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ByteOrder::Big => "big",
            ByteOrder::Little => "little",
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ByteOrder {
    type Err = Ds9Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "big" => Ok(ByteOrder::Big),
            "little" => Ok(ByteOrder::Little),
            _ => Err(Ds9Error::UnsupportedType(format!("byte order \"{}\"", s))),
        }
    }
}

/// Requested byte order, possibly deferring to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Endian {
    #[default]
    Native,
    Big,
    Little,
}

impl Endian {
    /// Resolve against the running host
    pub fn resolve(self) -> ByteOrder {
        self.resolve_with(ByteOrder::native())
    }

    /// Resolve against an explicit host byte order
    pub fn resolve_with(self, host: ByteOrder) -> ByteOrder {
        match self {
            Endian::Native => host,
            Endian::Big => ByteOrder::Big,
            Endian::Little => ByteOrder::Little,
        }
    }
}

impl FromStr for Endian {
    type Err = Ds9Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "native" => Ok(Endian::Native),
            "big" => Ok(Endian::Big),
            "little" => Ok(Endian::Little),
            _ => Err(Ds9Error::UnsupportedType(format!("byte order \"{}\"", s))),
        }
    }
}

impl From<ByteOrder> for Endian {
    fn from(order: ByteOrder) -> Self {
        match order {
            ByteOrder::Big => Endian::Big,
            ByteOrder::Little => Endian::Little,
        }
    }
}

/// Index convention of arrays handed to or returned by the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArrayOrder {
    /// C layout, last axis varies fastest; images are `[ydim, xdim]`
    #[default]
    RowMajor,
    /// Fortran layout, first axis varies fastest; images are `[xdim, ydim]`
    ColumnMajor,
}

impl ArrayOrder {
    /// Image dimensions `(x, y[, z])` for an array of the given shape
    fn image_dims(self, shape: &[usize]) -> Vec<usize> {
        match self {
            ArrayOrder::RowMajor => shape.iter().rev().copied().collect(),
            ArrayOrder::ColumnMajor => shape.to_vec(),
        }
    }

    /// Array shape for image dimensions `(x, y[, z])`
    pub fn shape_of(self, dims: &[usize]) -> Vec<usize> {
        match self {
            ArrayOrder::RowMajor => dims.iter().rev().copied().collect(),
            ArrayOrder::ColumnMajor => dims.to_vec(),
        }
    }
}

/// Descriptor sent with the `array` command
///
/// Renders exactly as `[xdim=<int>,ydim=<int>(,zdim=<int>),bitpix=<int>,endian=<big|little>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    pub xdim: usize,
    pub ydim: usize,
    pub zdim: Option<usize>,
    pub bitpix: Bitpix,
    pub endian: ByteOrder,
}

impl ArrayDescriptor {
    /// Build a descriptor from image dimensions `(x, y[, z])`
    pub fn new(dims: &[usize], bitpix: Bitpix, endian: ByteOrder) -> Result<Self> {
        match *dims {
            [xdim, ydim] => Ok(ArrayDescriptor {
                xdim,
                ydim,
                zdim: None,
                bitpix,
                endian,
            }),
            [xdim, ydim, zdim] => Ok(ArrayDescriptor {
                xdim,
                ydim,
                zdim: Some(zdim),
                bitpix,
                endian,
            }),
            _ => Err(unsupported_rank(dims.len())),
        }
    }

    /// Image dimensions `(x, y[, z])`
    pub fn dims(&self) -> Vec<usize> {
        let mut dims = vec![self.xdim, self.ydim];
        dims.extend(self.zdim);
        dims
    }

    /// Number of pixels
    ///
    /// Fails with `UnsupportedType` when the count does not fit in `usize`.
    pub fn element_count(&self) -> Result<usize> {
        let dims = self.dims();
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| too_large(&dims))
    }

    /// Expected payload length in bytes
    pub fn byte_len(&self) -> Result<usize> {
        self.element_count()?
            .checked_mul(self.bitpix.size())
            .ok_or_else(|| too_large(&self.dims()))
    }
}

impl fmt::Display for ArrayDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[xdim={},ydim={}", self.xdim, self.ydim)?;
        if let Some(zdim) = self.zdim {
            write!(f, ",zdim={}", zdim)?;
        }
        write!(f, ",bitpix={},endian={}]", self.bitpix, self.endian)
    }
}

impl FromStr for ArrayDescriptor {
    type Err = Ds9Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Ds9Error::Decode(format!("malformed array descriptor \"{}\"", s));

        let body = s
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(malformed)?;
        let fields: Vec<(&str, &str)> = body
            .split(',')
            .map(|field| field.split_once('=').ok_or_else(malformed))
            .collect::<Result<_>>()?;

        let dim = |value: &str| value.parse::<usize>().map_err(|_| malformed());
        let (xdim, ydim, zdim, rest) = match fields.as_slice() {
            [("xdim", x), ("ydim", y), ("zdim", z), rest @ ..] => {
                (dim(*x)?, dim(*y)?, Some(dim(*z)?), rest)
            }
            [("xdim", x), ("ydim", y), rest @ ..] => (dim(*x)?, dim(*y)?, None, rest),
            _ => return Err(malformed()),
        };
        let (bitpix, endian) = match rest {
            [("bitpix", b), ("endian", e)] => (
                Bitpix::from_code(b.parse::<i32>().map_err(|_| malformed())?)?,
                e.parse::<ByteOrder>()?,
            ),
            _ => return Err(malformed()),
        };

        let descriptor = ArrayDescriptor {
            xdim,
            ydim,
            zdim,
            bitpix,
            endian,
        };
        descriptor.byte_len()?;
        Ok(descriptor)
    }
}

/// Element type with a bitpix mapping
pub trait PixelElement: Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// Bitpix code of this type
    const BITPIX: Bitpix;

    /// Read one element, advancing `buf`
    fn get(buf: &mut &[u8], order: ByteOrder) -> Self;

    /// Append one element to `buf`
    fn put(self, buf: &mut Vec<u8>, order: ByteOrder);

    /// Wrap a typed array into a [`PixelArray`]
    fn wrap(array: ArrayD<Self>) -> PixelArray;

    /// Extract a typed array, handing back the input on type mismatch
    fn unwrap(array: PixelArray) -> std::result::Result<ArrayD<Self>, PixelArray>;
}

macro_rules! pixel_element {
    ($t:ty, $variant:ident, $get_be:ident, $get_le:ident, $put_be:ident, $put_le:ident) => {
        impl PixelElement for $t {
            const BITPIX: Bitpix = Bitpix::$variant;

            fn get(buf: &mut &[u8], order: ByteOrder) -> Self {
                match order {
                    ByteOrder::Big => buf.$get_be(),
                    ByteOrder::Little => buf.$get_le(),
                }
            }

            fn put(self, buf: &mut Vec<u8>, order: ByteOrder) {
                match order {
                    ByteOrder::Big => buf.$put_be(self),
                    ByteOrder::Little => buf.$put_le(self),
                }
            }

            fn wrap(array: ArrayD<Self>) -> PixelArray {
                PixelArray::$variant(array)
            }

            fn unwrap(array: PixelArray) -> std::result::Result<ArrayD<Self>, PixelArray> {
                match array {
                    PixelArray::$variant(a) => Ok(a),
                    other => Err(other),
                }
            }
        }
    };
}

pixel_element!(u8, Uint8, get_u8, get_u8, put_u8, put_u8);
pixel_element!(i16, Int16, get_i16, get_i16_le, put_i16, put_i16_le);
pixel_element!(i32, Int32, get_i32, get_i32_le, put_i32, put_i32_le);
pixel_element!(i64, Int64, get_i64, get_i64_le, put_i64, put_i64_le);
pixel_element!(f32, Float32, get_f32, get_f32_le, put_f32, put_f32_le);
pixel_element!(f64, Float64, get_f64, get_f64_le, put_f64, put_f64_le);

/// Numeric type that can be sent as pixels, possibly after widening
pub trait IntoPixel: Copy {
    /// Supported type used on the wire
    type Pixel: PixelElement;

    fn into_pixel(self) -> Self::Pixel;
}

macro_rules! into_pixel {
    ($($t:ty => $p:ty),* $(,)?) => {
        $(
            impl IntoPixel for $t {
                type Pixel = $p;

                fn into_pixel(self) -> $p {
                    self as $p
                }
            }
        )*
    };
}

into_pixel! {
    u8 => u8,
    i16 => i16,
    i32 => i32,
    i64 => i64,
    f32 => f32,
    f64 => f64,
    i8 => i16,
    u16 => f32,
    u32 => f64,
    u64 => f64,
    usize => f64,
    isize => f64,
    u128 => f64,
    i128 => f64,
}

fn too_large(shape: &[usize]) -> Ds9Error {
    Ds9Error::UnsupportedType(format!("array shape {:?} is too large", shape))
}

fn unsupported_rank(rank: usize) -> Ds9Error {
    Ds9Error::UnsupportedType(format!(
        "array rank {} (only 2-D and 3-D images are supported)",
        rank
    ))
}

/// Descriptor for sending `array`
///
/// Fails with `UnsupportedType` unless the array is 2-D or 3-D.
pub fn describe<A, S, D>(
    array: &ArrayBase<S, D>,
    order: ArrayOrder,
    endian: Endian,
) -> Result<ArrayDescriptor>
where
    A: IntoPixel,
    S: Data<Elem = A>,
    D: Dimension,
{
    let shape = array.shape();
    if !(2..=3).contains(&shape.len()) {
        return Err(unsupported_rank(shape.len()));
    }
    ArrayDescriptor::new(
        &order.image_dims(shape),
        <A::Pixel as PixelElement>::BITPIX,
        endian.resolve(),
    )
}

/// Descriptor and x-fastest pixel bytes for sending `array`
pub fn encode_array<A, S, D>(
    array: &ArrayBase<S, D>,
    order: ArrayOrder,
    endian: Endian,
) -> Result<(ArrayDescriptor, Vec<u8>)>
where
    A: IntoPixel,
    S: Data<Elem = A>,
    D: Dimension,
{
    let descriptor = describe(array, order, endian)?;
    let mut data = Vec::with_capacity(descriptor.byte_len()?);

    match order {
        ArrayOrder::RowMajor => {
            for &value in array.iter() {
                value.into_pixel().put(&mut data, descriptor.endian);
            }
        }
        ArrayOrder::ColumnMajor => {
            for &value in array.view().reversed_axes().iter() {
                value.into_pixel().put(&mut data, descriptor.endian);
            }
        }
    }

    Ok((descriptor, data))
}

/// Reinterpret a flat buffer as an array of the given shape
///
/// The buffer length must equal `product(shape) * size_of::<T>()`, otherwise
/// the call fails with `DimensionMismatch`. `order` selects how the flat
/// buffer maps onto `shape`.
pub fn decode_pixels<T: PixelElement>(
    data: &[u8],
    shape: &[usize],
    order: ArrayOrder,
    byte_order: ByteOrder,
) -> Result<ArrayD<T>> {
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| too_large(shape))?;
    let expected = count
        .checked_mul(T::BITPIX.size())
        .ok_or_else(|| too_large(shape))?;

    if data.len() != expected {
        return Err(Ds9Error::DimensionMismatch {
            expected,
            actual: data.len(),
        });
    }

    let mut buf = data;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(T::get(&mut buf, byte_order));
    }

    let shape = IxDyn(shape).set_f(order == ArrayOrder::ColumnMajor);
    ArrayD::from_shape_vec(shape, values).map_err(|e| Ds9Error::Decode(e.to_string()))
}

/// Pixel array whose element type is only known at runtime
#[derive(Debug, Clone, PartialEq)]
pub enum PixelArray {
    Uint8(ArrayD<u8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
}

impl PixelArray {
    /// Decode an image buffer laid out as described by `descriptor`
    pub fn decode(descriptor: &ArrayDescriptor, data: &[u8], order: ArrayOrder) -> Result<Self> {
        let shape = order.shape_of(&descriptor.dims());
        let endian = descriptor.endian;
        Ok(match descriptor.bitpix {
            Bitpix::Uint8 => PixelArray::Uint8(decode_pixels(data, &shape, order, endian)?),
            Bitpix::Int16 => PixelArray::Int16(decode_pixels(data, &shape, order, endian)?),
            Bitpix::Int32 => PixelArray::Int32(decode_pixels(data, &shape, order, endian)?),
            Bitpix::Int64 => PixelArray::Int64(decode_pixels(data, &shape, order, endian)?),
            Bitpix::Float32 => PixelArray::Float32(decode_pixels(data, &shape, order, endian)?),
            Bitpix::Float64 => PixelArray::Float64(decode_pixels(data, &shape, order, endian)?),
        })
    }

    /// Pixel type of the array
    pub fn bitpix(&self) -> Bitpix {
        match self {
            PixelArray::Uint8(_) => Bitpix::Uint8,
            PixelArray::Int16(_) => Bitpix::Int16,
            PixelArray::Int32(_) => Bitpix::Int32,
            PixelArray::Int64(_) => Bitpix::Int64,
            PixelArray::Float32(_) => Bitpix::Float32,
            PixelArray::Float64(_) => Bitpix::Float64,
        }
    }

    /// Array shape
    pub fn shape(&self) -> &[usize] {
        match self {
            PixelArray::Uint8(a) => a.shape(),
            PixelArray::Int16(a) => a.shape(),
            PixelArray::Int32(a) => a.shape(),
            PixelArray::Int64(a) => a.shape(),
            PixelArray::Float32(a) => a.shape(),
            PixelArray::Float64(a) => a.shape(),
        }
    }

    /// Extract the typed array
    ///
    /// Fails with `UnsupportedType` if the pixel type is not `T`.
    pub fn into_typed<T: PixelElement>(self) -> Result<ArrayD<T>> {
        T::unwrap(self).map_err(|other| {
            Ds9Error::UnsupportedType(format!(
                "image has bitpix {}, requested bitpix {}",
                other.bitpix(),
                T::BITPIX
            ))
        })
    }
}
