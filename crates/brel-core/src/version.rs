use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// How a vendor family spells its release numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionScheme {
    /// A single monotonically increasing integer (`"120"`).
    Integer,
    /// One or more dot-separated integers (`"3.6"`, `"128"`).
    Dotted,
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Dotted => write!(f, "dotted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Empty release version")]
    Empty,
    #[error("Invalid component `{component}` in release version `{input}`")]
    InvalidComponent { input: String, component: String },
    #[error("Release version `{input}` does not match the {scheme} scheme")]
    SchemeMismatch {
        input: String,
        scheme: VersionScheme,
    },
}

/// A browser release identifier, ordered component by component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    components: Vec<u32>,
}

impl ReleaseVersion {
    #[must_use]
    pub fn from_major(major: u32) -> Self {
        Self {
            components: vec![major],
        }
    }

    /// Parse `input` and check it against `scheme`.
    ///
    /// # Errors
    /// Returns an error when a component is not a number or when an
    /// integer-scheme version carries more than one component.
    pub fn parse_with(input: &str, scheme: VersionScheme) -> Result<Self, VersionParseError> {
        let version: Self = input.parse()?;
        if scheme == VersionScheme::Integer && version.components.len() != 1 {
            return Err(VersionParseError::SchemeMismatch {
                input: input.trim().to_string(),
                scheme,
            });
        }
        Ok(version)
    }

    #[must_use]
    pub fn major(&self) -> u32 {
        self.components[0]
    }

    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.components
    }

    /// True when this is exactly the bare major `major` (`82` but not `82.1`).
    #[must_use]
    pub fn is_bare_major(&self, major: u32) -> bool {
        self.components.len() == 1 && self.components[0] == major
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for ReleaseVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let components = s
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| VersionParseError::InvalidComponent {
                        input: s.to_string(),
                        component: part.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }
}

impl Serialize for ReleaseVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReleaseVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
