//! Tri-state secure verdicts

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

/// Secure verdict for a single field.
/// - True: the observed configuration is secure
/// - False: the observed configuration is insecure
/// - Unknown: no claim can be made (not a negative claim)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Secure {
    True,
    False,
    #[default]
    Unknown,
}

impl Secure {
    pub fn from_option(value: Option<bool>) -> Self {
        value.map_or(Self::Unknown, Self::from)
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Three-valued OR: any True wins, both False is False, anything else is Unknown.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unknown,
        }
    }

    /// Three-valued AND: any False wins, both True is True, anything else is Unknown.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "secure",
            Self::False => "insecure",
            Self::Unknown => "unknown",
        }
    }
}

impl From<bool> for Secure {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl std::fmt::Display for Secure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mapping `name -> Secure`, one entry per declared field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecureAnnotations {
    entries: Vec<(&'static str, Secure)>,
}

impl SecureAnnotations {
    /// Start with every name `Unknown`
    pub fn unknown_for<I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        Self { entries: names.into_iter().map(|n| (n, Secure::Unknown)).collect() }
    }

    /// Update an existing entry. Names outside the declared set are rejected.
    pub fn set(&mut self, name: &str, secure: Secure) -> bool {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                entry.1 = secure;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Secure> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Secure)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, secure: Secure) -> usize {
        self.entries.iter().filter(|(_, s)| *s == secure).count()
    }
}

impl Serialize for SecureAnnotations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, secure) in &self.entries {
            map.serialize_entry(name, secure)?;
        }
        map.end()
    }
}
