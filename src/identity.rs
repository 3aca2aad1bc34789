use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An end user. Key for rate limiting and task ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub i64);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identity {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Identity)
    }
}

impl From<i64> for Identity {
    fn from(id: i64) -> Self {
        Identity(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let id: Identity = " 8484686373 ".parse().unwrap();
        assert_eq!(id, Identity(8484686373));
        assert_eq!(id.to_string(), "8484686373");
    }

    #[test]
    fn serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Identity(42)).unwrap(), "42");
    }
}
