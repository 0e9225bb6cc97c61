//! Viewer version parsing
//!
//! `xpaget ds9 version` answers with the product name followed by a dotted
//! version, optionally carrying a pre-release suffix:
//!
//! ```text
//! ds9 8.7b1
//! ds9 8.2.1-beta
//! ```

use crate::error::{Ds9Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const VERSION_PATTERN: &str =
    r"^(\d+)\.(\d+)(?:\.(\d+))?(?:-?([0-9A-Za-z][0-9A-Za-z.+\-]*))?$";

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern is valid"))
}

/// Structured viewer version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    /// Zero when the version string has no patch component
    pub patch: u64,
    /// Suffix such as `b1` or `beta`
    pub prerelease: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Parse a reply of the form `<product-name> <dotted-version>[suffix]`
    ///
    /// Only the version part is kept. A trailing newline is tolerated.
    ///
    /// # Examples
    ///
    /// ```
    /// use ds9_rust::protocol::version::Version;
    ///
    /// let v = Version::from_reply_text("ds9 8.7b1\n")?;
    /// assert_eq!((v.major, v.minor, v.patch), (8, 7, 0));
    /// assert_eq!(v.prerelease.as_deref(), Some("b1"));
    /// # Ok::<(), ds9_rust::Ds9Error>(())
    /// ```
    pub fn from_reply_text(text: &str) -> Result<Self> {
        let mut words = text.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some(_product), Some(version), None) => {
                version.parse().map_err(|_| invalid_version(text))
            }
            _ => Err(invalid_version(text)),
        }
    }
}

fn invalid_version(text: &str) -> Ds9Error {
    Ds9Error::Decode(format!("unexpected version string \"{}\"", text.trim_end()))
}

impl FromStr for Version {
    type Err = Ds9Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = version_regex()
            .captures(s)
            .ok_or_else(|| invalid_version(s))?;

        let number = |i: usize| -> Result<u64> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().map_err(|_| invalid_version(s)),
                None => Ok(0),
            }
        };

        Ok(Version {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beta_suffix() {
        let v = Version::from_reply_text("ds9 8.7b1").unwrap();
        assert_eq!(v.major, 8);
        assert_eq!(v.minor, 7);
        assert_eq!(v.patch, 0);
        assert_eq!(v.prerelease.as_deref(), Some("b1"));
    }

    #[test]
    fn test_patch_and_dash_suffix() {
        let v = Version::from_reply_text("ds9 8.2.1-beta\n").unwrap();
        assert_eq!(v, Version {
            major: 8,
            minor: 2,
            patch: 1,
            prerelease: Some("beta".to_string()),
        });
        assert_eq!(v.to_string(), "8.2.1-beta");
    }

    #[test]
    fn test_plain_release() {
        let v = Version::from_reply_text("ds9 8.4").unwrap();
        assert_eq!(v, Version::new(8, 4, 0));
    }

    #[test]
    fn test_invalid_version_names_input() {
        match Version::from_reply_text("not a version") {
            Err(Ds9Error::Decode(msg)) => assert!(msg.contains("not a version")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(Version::from_reply_text("8.7").is_err());
        assert!(Version::from_reply_text("ds9 eight").is_err());
        assert!(Version::from_reply_text("").is_err());
    }
}
