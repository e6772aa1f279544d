// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AddonError;

/// Steam Workshop published file id of an addon.
///
/// Zero is never a valid published file id, so it is rejected on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct AddonId(u64);

impl AddonId {
    pub fn new(raw: u64) -> Result<Self, AddonError> {
        if raw == 0 {
            return Err(AddonError::InvalidAddonId(raw.to_string()));
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Parse a comma separated list such as `"3070284539, 3070280051"`.
    ///
    /// Empty segments are skipped; the first malformed id fails the whole list.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, AddonError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for AddonId {
    type Err = AddonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw = trimmed
            .parse::<u64>()
            .map_err(|_| AddonError::InvalidAddonId(s.to_string()))?;
        Self::new(raw).map_err(|_| AddonError::InvalidAddonId(s.to_string()))
    }
}

impl TryFrom<u64> for AddonId {
    type Error = AddonError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<AddonId> for u64 {
    fn from(id: AddonId) -> Self {
        id.0
    }
}

impl fmt::Display for AddonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_id() {
        let id: AddonId = "3070284539".parse().unwrap();
        assert_eq!(id.get(), 3070284539);
        assert_eq!(id.to_string(), "3070284539");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id: AddonId = "  42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "abc", "-5", "12ab", "0", "18446744073709551616"] {
            let result = input.parse::<AddonId>();
            assert_eq!(
                result,
                Err(AddonError::InvalidAddonId(input.to_string())),
                "input {input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_list() {
        let ids = AddonId::parse_list("100, 200,,300 ").unwrap();
        let raw: Vec<u64> = ids.into_iter().map(AddonId::get).collect();
        assert_eq!(raw, vec![100, 200, 300]);

        assert!(AddonId::parse_list("").unwrap().is_empty());
        assert!(AddonId::parse_list("100,nope").is_err());
    }

    #[test]
    fn test_serde_rejects_zero() {
        let id: AddonId = serde_json::from_str("123").unwrap();
        assert_eq!(id.get(), 123);
        assert_eq!(serde_json::to_string(&id).unwrap(), "123");

        assert!(serde_json::from_str::<AddonId>("0").is_err());
    }
}
