//! Access point identification
//!
//! An access point is one reachable server endpoint. It is named by a
//! `class:name` pair (`DS9:ds9`) and reached through an address, either
//! `host:port` for inet transports or a socket file path for local ones.
//!
//! Requests may target a template instead of a concrete address; `*` and `?`
//! wildcards are accepted on both halves and comparison ignores case:
//!
//! ```
//! use ds9_rust::io::access_point::{AccessPoint, Target};
//!
//! let ap = AccessPoint::parse_listing("DS9 ds9 gs 7f000001:46393 eric")?;
//! assert!(ap.matches(&"DS9:*".parse::<Target>()?));
//! assert!(ap.matches(&"ds9".parse::<Target>()?));
//! # Ok::<(), ds9_rust::Ds9Error>(())
//! ```

use crate::error::{Ds9Error, Result};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Operations an access point accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Access: u8 {
        /// Read (`xpaget`)
        const GET = 0b001;
        /// Write (`xpaset`)
        const SET = 0b010;
        /// Information (`xpainfo`)
        const INFO = 0b100;
    }
}

impl Access {
    /// Parse the name-server access column (`g`, `s`, `i` letters)
    pub fn from_letters(letters: &str) -> Result<Self> {
        letters.chars().try_fold(Access::empty(), |acc, c| match c {
            'g' => Ok(acc | Access::GET),
            's' => Ok(acc | Access::SET),
            'i' => Ok(acc | Access::INFO),
            _ => Err(Ds9Error::InvalidAccessPoint(format!(
                "unknown access mode '{}' in \"{}\"",
                c, letters
            ))),
        })
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, letter) in [(Access::GET, 'g'), (Access::SET, 's'), (Access::INFO, 'i')] {
            if self.contains(flag) {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

/// Where a request is sent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// `class:name` template, possibly with wildcards
    Template { class: String, name: String },
    /// Fully qualified `host:port` or socket path
    Address(String),
}

impl Target {
    /// Template matching every DS9 instance
    pub fn any_ds9() -> Self {
        Target::Template {
            class: "DS9".to_string(),
            name: "*".to_string(),
        }
    }
}

impl FromStr for Target {
    type Err = Ds9Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Ds9Error::InvalidAccessPoint("empty identifier".to_string()));
        }
        if s.contains('/') {
            return Ok(Target::Address(s.to_string()));
        }
        match s.rsplit_once(':') {
            Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                if host.is_empty() {
                    return Err(Ds9Error::InvalidAccessPoint(format!("missing host in \"{}\"", s)));
                }
                Ok(Target::Address(s.to_string()))
            }
            Some((class, name)) => {
                if class.is_empty() || name.is_empty() {
                    return Err(Ds9Error::InvalidAccessPoint(format!(
                        "expected class:name, got \"{}\"",
                        s
                    )));
                }
                Ok(Target::Template {
                    class: class.to_string(),
                    name: name.to_string(),
                })
            }
            None => Ok(Target::Template {
                class: "*".to_string(),
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Template { class, name } => write!(f, "{}:{}", class, name),
            Target::Address(addr) => f.write_str(addr),
        }
    }
}

/// One reachable server endpoint
///
/// Immutable once created. Liveness is not cached here; it is checked through
/// the transport before each use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessPoint {
    /// Server kind, e.g. `DS9`
    pub class: String,
    /// Instance name, e.g. `ds9`
    pub name: String,
    /// `host:port` or socket path
    pub address: String,
    /// Owning user
    pub user: String,
    /// Permitted operations
    pub access: Access,
}

impl AccessPoint {
    pub fn new(
        class: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        AccessPoint {
            class: class.into(),
            name: name.into(),
            address: address.into(),
            user: String::new(),
            access: Access::GET | Access::SET,
        }
    }

    /// Access point known only by its address
    pub fn from_address(address: impl Into<String>) -> Self {
        AccessPoint::new("", "", address)
    }

    /// Parse one name-server listing line: `CLASS name access address user`
    pub fn parse_listing(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [class, name, access, address, user] => Ok(AccessPoint {
                class: class.to_string(),
                name: name.to_string(),
                address: address.to_string(),
                user: user.to_string(),
                access: Access::from_letters(access)?,
            }),
            _ => Err(Ds9Error::InvalidAccessPoint(format!(
                "malformed name server entry \"{}\"",
                line
            ))),
        }
    }

    /// `class:name` when known, otherwise the address
    pub fn id(&self) -> String {
        if self.class.is_empty() && self.name.is_empty() {
            self.address.clone()
        } else {
            format!("{}:{}", self.class, self.name)
        }
    }

    /// Whether this access point is selected by `target`
    pub fn matches(&self, target: &Target) -> bool {
        match target {
            Target::Template { class, name } => {
                glob_match(class, &self.class) && glob_match(name, &self.name)
            }
            Target::Address(addr) => *addr == self.address,
        }
    }
}

impl fmt::Display for AccessPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.address)
    }
}

/// Case-insensitive glob with `*` and `?`
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let t: Vec<char> = text.to_lowercase().chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing() {
        let ap = AccessPoint::parse_listing("DS9 ds9 gs 7f000001:46393 eric").unwrap();
        assert_eq!(ap.class, "DS9");
        assert_eq!(ap.name, "ds9");
        assert_eq!(ap.address, "7f000001:46393");
        assert_eq!(ap.user, "eric");
        assert_eq!(ap.access, Access::GET | Access::SET);
        assert_eq!(ap.id(), "DS9:ds9");

        assert!(AccessPoint::parse_listing("DS9 ds9 gs").is_err());
        assert!(AccessPoint::parse_listing("DS9 ds9 gx 7f000001:1 eric").is_err());
    }

    #[test]
    fn test_access_letters() {
        let access = Access::from_letters("gsi").unwrap();
        assert!(access.contains(Access::GET | Access::SET | Access::INFO));
        assert_eq!(access.to_string(), "gsi");
        assert_eq!(Access::from_letters("").unwrap(), Access::empty());
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!(
            "DS9:*".parse::<Target>().unwrap(),
            Target::Template {
                class: "DS9".to_string(),
                name: "*".to_string()
            }
        );
        assert_eq!(
            "ds9".parse::<Target>().unwrap(),
            Target::Template {
                class: "*".to_string(),
                name: "ds9".to_string()
            }
        );
        assert_eq!(
            "localhost:14285".parse::<Target>().unwrap(),
            Target::Address("localhost:14285".to_string())
        );
        assert_eq!(
            "/tmp/.xpa/DS9_ds9.1234".parse::<Target>().unwrap(),
            Target::Address("/tmp/.xpa/DS9_ds9.1234".to_string())
        );
        assert!("".parse::<Target>().is_err());
        assert!(":14285".parse::<Target>().is_err());
        assert!("DS9:".parse::<Target>().is_err());
    }

    #[test]
    fn test_template_matching() {
        let ap = AccessPoint::new("DS9", "ds9", "7f000001:46393");
        assert!(ap.matches(&Target::any_ds9()));
        assert!(ap.matches(&"ds9:DS?".parse().unwrap()));
        assert!(ap.matches(&"*:*".parse().unwrap()));
        assert!(!ap.matches(&"DS9:other".parse().unwrap()));
        assert!(ap.matches(&Target::Address("7f000001:46393".to_string())));
        assert!(!ap.matches(&Target::Address("7f000001:1".to_string())));
    }

    #[test]
    fn test_glob() {
        assert!(glob_match("*", ""));
        assert!(glob_match("a*c", "abbbc"));
        assert!(glob_match("a*b*c", "axbyc"));
        assert!(!glob_match("a*c", "abd"));
        assert!(glob_match("?s9", "DS9"));
        assert!(!glob_match("ds", "ds9"));
    }

    #[test]
    fn test_address_only_id() {
        let ap = AccessPoint::from_address("/tmp/.xpa/DS9_ds9.1234");
        assert_eq!(ap.id(), "/tmp/.xpa/DS9_ds9.1234");
    }
}
