//! Username directory types
//!
//! Users are addressed as `user@domain`. The domain's relay publishes each
//! user's public key at `/.well-known/p2pchat/{user}`.

use std::fmt;
use std::str::FromStr;

use p2pchat_crypto::PublicKey;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Path prefix of the well-known lookup route
pub const WELL_KNOWN_PREFIX: &str = "/.well-known/p2pchat";

/// Directory entry published for a user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserWellKnown {
    /// Local part of the username
    pub username: String,
    /// The user's identity key
    pub public_key: PublicKey,
    /// Free-form profile data
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// A parsed `user@domain` address
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Username {
    /// Local part
    pub user: String,
    /// Relay domain
    pub domain: String,
}

impl Username {
    /// URL of this user's well-known record
    pub fn well_known_url(&self) -> String {
        format!("http://{}{}/{}", self.domain, WELL_KNOWN_PREFIX, self.user)
    }
}

impl FromStr for Username {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(user), Some(domain), None) if !user.is_empty() && !domain.is_empty() => {
                Ok(Self {
                    user: user.to_string(),
                    domain: domain.to_string(),
                })
            }
            _ => Err(Error::InvalidUsername(s.to_string())),
        }
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.domain)
    }
}

/// Split `user@domain`
pub fn parse_username(s: &str) -> Result<Username> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_username() {
        let name = parse_username("alice@example.com").unwrap();
        assert_eq!(name.user, "alice");
        assert_eq!(name.domain, "example.com");
        assert_eq!(name.to_string(), "alice@example.com");
    }

    #[test]
    fn test_parse_username_rejects_bad_input() {
        for bad in ["alice", "alice@", "@example.com", "a@b@c", ""] {
            assert!(
                matches!(parse_username(bad), Err(Error::InvalidUsername(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_well_known_url() {
        let name = parse_username("bob@localhost:8080").unwrap();
        assert_eq!(
            name.well_known_url(),
            "http://localhost:8080/.well-known/p2pchat/bob"
        );
    }

    #[test]
    fn test_user_well_known_json() {
        let json = r#"{
            "username": "alice",
            "public_key": "0f8abf593879bca06435993639130ea2caf017196b3379dc208e003b9b411e48"
        }"#;
        let entry: UserWellKnown = serde_json::from_str(json).unwrap();
        assert_eq!(entry.username, "alice");
        assert!(entry.meta.is_null());

        let bad = r#"{"username": "eve", "public_key": "1234"}"#;
        assert!(serde_json::from_str::<UserWellKnown>(bad).is_err());
    }
}
