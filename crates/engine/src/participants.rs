//! The trip participants.
//!
//! Participants are plain display names. The set keeps the order the user
//! typed them in and is unique by exact string match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Ordered, duplicate-free list of participant names.
///
/// Stored on disk and on the remote as a comma separated string
/// (`"Me, Buddy A"`), which is why it (de)serializes through its `Display`
/// and `FromStr` implementations.
///
/// ```rust
/// use engine::Participants;
///
/// let participants: Participants = "Anna, Bruno ,, Anna".parse().unwrap();
/// assert_eq!(participants.names(), ["Anna", "Bruno"]);
/// assert_eq!(participants.to_string(), "Anna, Bruno");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Participants(Vec<String>);

impl Participants {
    /// Build the set from names, dropping blanks and later duplicates.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || unique.iter().any(|n| n == name) {
                continue;
            }
            unique.push(name.to_string());
        }
        Self(unique)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Add a participant at the end. Adding an existing name is rejected.
    pub fn push(&mut self, name: &str) -> Result<(), EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidParticipant(
                "participant name must not be empty".to_string(),
            ));
        }
        if self.contains(name) {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        self.0.push(name.to_string());
        Ok(())
    }

    /// Remove a participant. Historical expenses keep their split untouched.
    pub fn remove(&mut self, name: &str) -> Result<(), EngineError> {
        match self.0.iter().position(|n| n == name) {
            Some(index) => {
                self.0.remove(index);
                Ok(())
            }
            None => Err(EngineError::KeyNotFound(name.to_string())),
        }
    }
}

impl fmt::Display for Participants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl FromStr for Participants {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.split(',')))
    }
}

impl<S: AsRef<str>> FromIterator<S> for Participants {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl Serialize for Participants {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Participants {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_deduplicates() {
        let participants: Participants = " Me,Buddy A , Me,, ".parse().unwrap();
        assert_eq!(participants.names(), ["Me", "Buddy A"]);
    }

    #[test]
    fn display_round_trips_through_comma_string() {
        let participants = Participants::new(["Anna", "Bruno", "Carla"]);
        assert_eq!(participants.to_string(), "Anna, Bruno, Carla");
        assert_eq!(
            participants.to_string().parse::<Participants>().unwrap(),
            participants
        );
    }

    #[test]
    fn push_rejects_duplicates() {
        let mut participants = Participants::new(["Anna"]);
        assert_eq!(
            participants.push("Anna"),
            Err(EngineError::ExistingKey("Anna".to_string()))
        );
        participants.push("Bruno").unwrap();
        assert_eq!(participants.len(), 2);
    }

    #[test]
    fn remove_unknown_participant() {
        let mut participants = Participants::new(["Anna"]);
        assert_eq!(
            participants.remove("Zed"),
            Err(EngineError::KeyNotFound("Zed".to_string()))
        );
    }

    #[test]
    fn serializes_as_string() {
        let participants = Participants::new(["Anna", "Bruno"]);
        let json = serde_json::to_string(&participants).unwrap();
        assert_eq!(json, "\"Anna, Bruno\"");
        let back: Participants = serde_json::from_str(&json).unwrap();
        assert_eq!(back, participants);
    }
}
