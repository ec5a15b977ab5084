//! Dotted version numbers.
//!
//! Capella metamodels are versioned like `5.0.0` or `6.1`. Comparison is
//! component-wise and missing trailing components count as zero, so `5.2`
//! and `5.2.0` are equal.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::ModelError;

/// One dot-separated component of a [`Version`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionPart {
    /// A purely numeric component.
    Num(u64),
    /// Anything else (`rc1`, `0-SNAPSHOT`, ...). Sorts after numbers.
    Text(SmolStr),
}

impl VersionPart {
    fn is_zero(&self) -> bool {
        matches!(self, Self::Num(0))
    }
}

impl fmt::Display for VersionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// A parsed version number.
#[derive(Clone, Debug)]
pub struct Version {
    parts: Vec<VersionPart>,
}

impl Version {
    /// The lowest possible version, used as the default lower bound.
    pub fn zero() -> Self {
        Self {
            parts: vec![VersionPart::Num(0)],
        }
    }

    /// Parse a dotted version string.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ModelError::InvalidVersion(input.to_owned()));
        }

        let mut parts = Vec::new();
        for raw in input.split('.') {
            if raw.is_empty() {
                return Err(ModelError::InvalidVersion(input.to_owned()));
            }
            let part = if raw.bytes().all(|b| b.is_ascii_digit()) {
                raw.parse::<u64>()
                    .map(VersionPart::Num)
                    .map_err(|_| ModelError::InvalidVersion(input.to_owned()))?
            } else {
                VersionPart::Text(SmolStr::new(raw))
            };
            parts.push(part);
        }
        Ok(Self { parts })
    }

    /// The individual components.
    pub fn parts(&self) -> &[VersionPart] {
        &self.parts
    }

    /// Keep only the first `precision` components.
    pub fn trimmed(&self, precision: usize) -> Self {
        Self {
            parts: self.parts.iter().take(precision.max(1)).cloned().collect(),
        }
    }

    /// Extend with zero components until at least `len` are present.
    pub fn padded(&self, len: usize) -> Self {
        let mut parts = self.parts.clone();
        while parts.len() < len {
            parts.push(VersionPart::Num(0));
        }
        Self { parts }
    }

    fn significant(&self) -> &[VersionPart] {
        let end = self
            .parts
            .iter()
            .rposition(|p| !p.is_zero())
            .map_or(0, |i| i + 1);
        &self.parts[..end]
    }
}

impl FromStr for Version {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let zero = VersionPart::Num(0);
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let left = self.parts.get(i).unwrap_or(&zero);
            let right = other.parts.get(i).unwrap_or(&zero);
            match left.cmp(right) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}
