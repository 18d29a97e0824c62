use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::UpgradeError;

/// An upstream version: exactly four dot-separated components
/// (`major.minor.build.patch`). Ordering is lexicographic over the components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, build: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            build,
            patch,
        }
    }

    pub fn parse(text: &str) -> Result<Self, UpgradeError> {
        let malformed = || UpgradeError::MalformedVersion {
            value: text.to_string(),
        };

        let mut components = [0_u32; 4];
        let mut count = 0_usize;
        for part in text.trim().split('.') {
            if count == components.len() {
                return Err(malformed());
            }
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            components[count] = part.parse::<u32>().map_err(|_| malformed())?;
            count += 1;
        }
        if count != components.len() {
            return Err(malformed());
        }

        let [major, minor, build, patch] = components;
        Ok(Self::new(major, minor, build, patch))
    }

    pub fn components(&self) -> [u32; 4] {
        [self.major, self.minor, self.build, self.patch]
    }

    pub fn is_upgrade_from(&self, from: &Version) -> bool {
        for (target, origin) in self.components().into_iter().zip(from.components()) {
            if target > origin {
                return true;
            }
            if target < origin {
                return false;
            }
        }
        false
    }

    pub fn is_major_upgrade_from(&self, from: &Version) -> bool {
        self.major > from.major
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.patch
        )
    }
}

impl FromStr for Version {
    type Err = UpgradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Text-level upgrade check. Malformed input on either side is "not an
/// upgrade" rather than an error.
pub fn is_upgrade(target: &str, from: &str) -> bool {
    match (Version::parse(target), Version::parse(from)) {
        (Ok(target), Ok(from)) => target.is_upgrade_from(&from),
        _ => false,
    }
}

pub fn is_major_upgrade(target: &str, from: &str) -> bool {
    match (Version::parse(target), Version::parse(from)) {
        (Ok(target), Ok(from)) => target.is_major_upgrade_from(&from),
        _ => false,
    }
}
