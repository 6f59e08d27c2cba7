//! Names of the remote sub-collections of a trip.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Days,
    SharedExpenses,
    PersonalExpenses,
}

impl CollectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::SharedExpenses => "sharedExpenses",
            Self::PersonalExpenses => "personalExpenses",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `trips/{trip_id}/{kind}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    pub trip_id: String,
    pub kind: CollectionKind,
}

impl CollectionPath {
    pub fn new(trip_id: &str, kind: CollectionKind) -> Self {
        Self {
            trip_id: trip_id.to_string(),
            kind,
        }
    }

    pub fn days(trip_id: &str) -> Self {
        Self::new(trip_id, CollectionKind::Days)
    }

    pub fn shared_expenses(trip_id: &str) -> Self {
        Self::new(trip_id, CollectionKind::SharedExpenses)
    }

    pub fn personal_expenses(trip_id: &str) -> Self {
        Self::new(trip_id, CollectionKind::PersonalExpenses)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trips/{}/{}", self.trip_id, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_like_a_document_path() {
        let path = CollectionPath::shared_expenses("abc");
        assert_eq!(path.to_string(), "trips/abc/sharedExpenses");
        assert_eq!(CollectionPath::days("abc").to_string(), "trips/abc/days");
    }
}
