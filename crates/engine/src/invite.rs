//! Invite codes used to share a cloud trip.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Characters an invite code is made of. `I`, `O`, `0` and `1` are left out
/// because they are easily confused when read aloud or copied by hand.
pub const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const INVITE_CODE_LEN: usize = 6;

/// A six character code identifying a shared trip.
///
/// ```rust
/// use engine::InviteCode;
///
/// let code: InviteCode = " ab3xyz ".parse().unwrap();
/// assert_eq!(code.as_str(), "AB3XYZ");
/// assert!("AB0XYZ".parse::<InviteCode>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InviteCode(String);

impl InviteCode {
    /// Draw a fresh random code.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..INVITE_CODE_LEN)
            .map(|_| INVITE_ALPHABET[rng.random_range(0..INVITE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InviteCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() != INVITE_CODE_LEN {
            return Err(EngineError::InvalidInviteCode(format!(
                "expected {INVITE_CODE_LEN} characters, got {}",
                code.chars().count()
            )));
        }
        if let Some(bad) = code.bytes().find(|b| !INVITE_ALPHABET.contains(b)) {
            return Err(EngineError::InvalidInviteCode(format!(
                "unexpected character '{}'",
                bad as char
            )));
        }
        Ok(Self(code))
    }
}

impl Serialize for InviteCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for InviteCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
