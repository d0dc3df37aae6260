//! Security identifiers.
//!
//! Profile records are keyed by their SID string (`S-1-5-21-...-1001`). This
//! module parses those keys into a structured [`Sid`] so that account-class
//! predicates work on the identifier authority and sub-authorities instead of
//! string prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// NT authority (`S-1-5`), the issuer of every local and domain account SID.
const NT_AUTHORITY: u64 = 5;

/// First sub-authority of machine and domain account SIDs.
const NT_NON_UNIQUE: u32 = 21;

/// Relative identifier of the built-in Administrator account.
pub const RID_ADMINISTRATOR: u32 = 500;

/// Errors produced when a registry key name is not a SID.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SidParseError {
    /// The key does not start with the `S-1-` revision prefix.
    #[error("not a SID (missing S-1- prefix): {0}")]
    MissingPrefix(String),

    /// A component is empty or not a decimal integer in range.
    #[error("invalid SID component '{component}' in {sid}")]
    InvalidComponent {
        /// The offending key.
        sid: String,
        /// The component that failed to parse.
        component: String,
    },

    /// The SID has an authority but no sub-authorities.
    #[error("SID has no sub-authorities: {0}")]
    NoSubAuthorities(String),
}

/// A parsed security identifier in canonical `S-1-<authority>-<sub>...` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sid {
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl Sid {
    /// Relative identifier: the last sub-authority.
    pub fn rid(&self) -> u32 {
        // Parsing guarantees at least one sub-authority.
        self.sub_authorities.last().copied().unwrap_or_default()
    }

    /// Well-known local system and service accounts (`S-1-5-18`, `S-1-5-19`,
    /// `S-1-5-20`, ...): NT authority with a single sub-authority.
    pub fn is_system_account(&self) -> bool {
        self.authority == NT_AUTHORITY && self.sub_authorities.len() == 1
    }

    /// Machine or domain account (`S-1-5-21-<a>-<b>-<c>-<rid>`).
    pub fn is_account(&self) -> bool {
        self.authority == NT_AUTHORITY
            && self.sub_authorities.first() == Some(&NT_NON_UNIQUE)
            && self.sub_authorities.len() >= 2
    }

    /// The built-in Administrator account of a machine or domain.
    pub fn is_builtin_administrator(&self) -> bool {
        self.is_account() && self.rid() == RID_ADMINISTRATOR
    }
}

impl FromStr for Sid {
    type Err = SidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rest = trimmed
            .strip_prefix("S-1-")
            .or_else(|| trimmed.strip_prefix("s-1-"))
            .ok_or_else(|| SidParseError::MissingPrefix(s.to_string()))?;

        let mut parts = rest.split('-');
        let invalid = |component: &str| SidParseError::InvalidComponent {
            sid: s.to_string(),
            component: component.to_string(),
        };

        let authority_str = parts.next().unwrap_or_default();
        let authority = parse_decimal::<u64>(authority_str).ok_or_else(|| invalid(authority_str))?;

        let sub_authorities = parts
            .map(|p| parse_decimal::<u32>(p).ok_or_else(|| invalid(p)))
            .collect::<Result<Vec<_>, _>>()?;

        if sub_authorities.is_empty() {
            return Err(SidParseError::NoSubAuthorities(s.to_string()));
        }

        Ok(Self {
            authority,
            sub_authorities,
        })
    }
}

/// Strict decimal parse: digits only, no sign, no whitespace.
fn parse_decimal<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-1-{}", self.authority)?;
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl Serialize for Sid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Sid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_domain_account() {
        let sid: Sid = "S-1-5-21-3623811015-3361044348-30300820-1013".parse().unwrap();
        assert_eq!(sid.rid(), 1013);
        assert!(sid.is_account());
        assert!(!sid.is_system_account());
        assert_eq!(
            sid.to_string(),
            "S-1-5-21-3623811015-3361044348-30300820-1013"
        );
    }

    #[test]
    fn test_system_accounts() {
        for key in ["S-1-5-18", "S-1-5-19", "S-1-5-20"] {
            let sid: Sid = key.parse().unwrap();
            assert!(sid.is_system_account(), "{key}");
            assert!(!sid.is_account());
        }
    }

    #[test]
    fn test_builtin_administrator() {
        let admin: Sid = "S-1-5-21-1-2-3-500".parse().unwrap();
        let user: Sid = "S-1-5-21-1-2-3-1001".parse().unwrap();
        assert!(admin.is_builtin_administrator());
        assert!(!user.is_builtin_administrator());
    }

    #[test]
    fn test_lowercase_prefix_is_canonicalized() {
        let sid: Sid = "s-1-5-18".parse().unwrap();
        assert_eq!(sid.to_string(), "S-1-5-18");
    }

    #[test]
    fn test_rejects_bak_keys_and_garbage() {
        assert!(matches!(
            "S-1-5-21-1-2-3-1001.bak".parse::<Sid>(),
            Err(SidParseError::InvalidComponent { .. })
        ));
        assert!(matches!(
            "ProfileList".parse::<Sid>(),
            Err(SidParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            "S-1-5".parse::<Sid>(),
            Err(SidParseError::NoSubAuthorities(_))
        ));
        assert!("S-1-5--18".parse::<Sid>().is_err());
        assert!("S-1-5-+18".parse::<Sid>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let sid: Sid = "S-1-5-21-1-2-3-1001".parse().unwrap();
        let json = serde_json::to_string(&sid).unwrap();
        assert_eq!(json, "\"S-1-5-21-1-2-3-1001\"");
        let back: Sid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sid);
    }
}
