use serde::{Serialize, Serializer};

/// Marker reported to callers for an accession without a resolvable result.
pub const EMPTY: &str = "EMPTY";

/// Outcome of a lookup that may legitimately find nothing.
///
/// `Absent` is a normal result (no CDS linkage, no matching window, no
/// promoter) and never an error. It serializes as the string `"EMPTY"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Absent,
    Found(T),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn as_ref(&self) -> Lookup<&T> {
        match self {
            Lookup::Absent => Lookup::Absent,
            Lookup::Found(value) => Lookup::Found(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Absent => Lookup::Absent,
            Lookup::Found(value) => Lookup::Found(f(value)),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Lookup<U>) -> Lookup<U> {
        match self {
            Lookup::Absent => Lookup::Absent,
            Lookup::Found(value) => f(value),
        }
    }

    pub fn found(self) -> Option<T> {
        self.into()
    }
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Lookup::Absent
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::Absent,
        }
    }
}

impl<T> From<Lookup<T>> for Option<T> {
    fn from(value: Lookup<T>) -> Self {
        match value {
            Lookup::Found(v) => Some(v),
            Lookup::Absent => None,
        }
    }
}

impl<T: Serialize> Serialize for Lookup<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Lookup::Found(value) => value.serialize(serializer),
            Lookup::Absent => serializer.serialize_str(EMPTY),
        }
    }
}
