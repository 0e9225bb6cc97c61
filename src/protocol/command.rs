//! Command string construction
//!
//! DS9 commands are plain ASCII: a handful of tokens joined by single spaces
//! (`"zoom to 3.7"`, `"frame 2"`, `"cmap heat"`). Arguments come from a closed
//! set of stringifiable cases so numbers, names and text always render the
//! same way regardless of locale.
//!
//! # Examples
//!
//! ```
//! use ds9_rust::command;
//!
//! assert_eq!(command!("zoom", "to", 3.7), "zoom to 3.7");
//! assert_eq!(command!("frame", 2), "frame 2");
//! assert_eq!(command!("crosshair", "lock", true), "crosshair lock yes");
//! ```

use std::fmt;

/// One argument of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Signed integer, rendered in decimal
    Int(i64),
    /// Unsigned integer, rendered in decimal
    UInt(u64),
    /// Floating point, rendered with the shortest exact decimal form
    Float(f64),
    /// Boolean, rendered as `yes` / `no`
    Bool(bool),
    /// Identifier passed by bare name (`wcs`, `fk5`, `image`)
    Symbol(String),
    /// Free text passed unchanged
    Text(String),
}

impl Token {
    /// Create a symbol token
    pub fn symbol(name: impl Into<String>) -> Self {
        Token::Symbol(name.into())
    }

    fn is_empty(&self) -> bool {
        match self {
            Token::Symbol(s) | Token::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(v) => write!(f, "{}", v),
            Token::UInt(v) => write!(f, "{}", v),
            Token::Float(v) => write!(f, "{}", v),
            Token::Bool(true) => f.write_str("yes"),
            Token::Bool(false) => f.write_str("no"),
            Token::Symbol(s) | Token::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! token_from {
    ($variant:ident as $repr:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Token {
                fn from(value: $t) -> Self {
                    Token::$variant(value as $repr)
                }
            }
        )*
    };
}

token_from!(Int as i64: i8, i16, i32, i64, isize);
token_from!(UInt as u64: u8, u16, u32, u64, usize);

impl From<f32> for Token {
    fn from(value: f32) -> Self {
        // Go through the f32 text form so 3.7f32 stays "3.7"
        Token::Float(value.to_string().parse().unwrap_or(value as f64))
    }
}

impl From<f64> for Token {
    fn from(value: f64) -> Self {
        Token::Float(value)
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Token::Bool(value)
    }
}

impl From<char> for Token {
    fn from(value: char) -> Self {
        Token::Text(value.to_string())
    }
}

impl From<crate::protocol::pixel::ByteOrder> for Token {
    fn from(value: crate::protocol::pixel::ByteOrder) -> Self {
        Token::symbol(value.as_str())
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Text(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Text(value)
    }
}

impl From<&String> for Token {
    fn from(value: &String) -> Self {
        Token::Text(value.clone())
    }
}

impl From<&Token> for Token {
    fn from(value: &Token) -> Self {
        value.clone()
    }
}

impl From<&crate::protocol::pixel::ArrayDescriptor> for Token {
    fn from(value: &crate::protocol::pixel::ArrayDescriptor) -> Self {
        Token::Text(value.to_string())
    }
}

/// Join tokens into a single command string
///
/// Tokens are separated by exactly one space. Empty text tokens are skipped,
/// so the result never starts or ends with a separator.
///
/// # Examples
///
/// ```
/// use ds9_rust::protocol::command::{build, Token};
///
/// let cmd = build(&[
///     Token::from("pan"),
///     Token::from(100),
///     Token::from(200.5),
///     Token::symbol("image"),
/// ]);
/// assert_eq!(cmd, "pan 100 200.5 image");
/// ```
pub fn build(tokens: &[Token]) -> String {
    let mut cmd = String::new();
    for token in tokens.iter().filter(|t| !t.is_empty()) {
        if !cmd.is_empty() {
            cmd.push(' ');
        }
        cmd.push_str(&token.to_string());
    }
    cmd
}

/// Build a command string from heterogeneous arguments
///
/// Each argument is converted with `Token::from` and the results are joined
/// by [`build`].
#[macro_export]
macro_rules! command {
    ($($arg:expr),* $(,)?) => {
        $crate::protocol::command::build(&[$($crate::protocol::command::Token::from($arg)),*])
    };
}
