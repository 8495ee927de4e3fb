use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KiraError;

/// PubChem compound identifier. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Cid(u64);

impl Cid {
    pub const FIRST: Cid = Cid(1);

    pub fn new(value: u64) -> Result<Self, KiraError> {
        if value == 0 {
            return Err(KiraError::InvalidCid(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The CID `count` places after this one.
    pub fn offset(self, count: u64) -> Result<Self, KiraError> {
        self.0
            .checked_add(count)
            .map(Self)
            .ok_or_else(|| KiraError::InvalidCid(format!("{} + {count} overflows", self.0)))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cid {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u64>()
            .map_err(|_| KiraError::InvalidCid(value.to_string()))?;
        Self::new(parsed).map_err(|_| KiraError::InvalidCid(value.to_string()))
    }
}

impl TryFrom<u64> for Cid {
    type Error = KiraError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cid> for u64 {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

/// Decimal descriptor kept as the text PubChem sent, so `100.20` stays
/// `100.20` in the batch table. Only built from text that parses as a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Decimal(String);

impl Decimal {
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let value = trimmed.parse::<f64>().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_f64(&self) -> f64 {
        // validated in `parse`
        self.0.parse().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptor set for one compound. Each field is independently optional:
/// PubChem omits descriptors it cannot compute (e.g. XLogP for salts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompoundRecord {
    pub cid: Cid,
    pub molecular_weight: Option<Decimal>,
    pub xlogp: Option<Decimal>,
    pub hbond_donors: Option<u32>,
    pub hbond_acceptors: Option<u32>,
    pub tpsa: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StructureKind {
    #[serde(rename = "3d")]
    ThreeD,
    #[serde(rename = "2d")]
    TwoD,
}

impl StructureKind {
    pub fn record_type(self) -> &'static str {
        match self {
            StructureKind::ThreeD => "3d",
            StructureKind::TwoD => "2d",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureKind::ThreeD => write!(f, "3D"),
            StructureKind::TwoD => write!(f, "2D"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureOutcome {
    Saved3D,
    Saved2D,
    NotFound,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_cid_valid() {
        let cid: Cid = " 2244 ".parse().unwrap();
        assert_eq!(cid.get(), 2244);
        assert_eq!(cid.to_string(), "2244");
    }

    #[test]
    fn parse_cid_rejects_zero_and_garbage() {
        assert_matches!("0".parse::<Cid>(), Err(KiraError::InvalidCid(_)));
        assert_matches!("-3".parse::<Cid>(), Err(KiraError::InvalidCid(_)));
        assert_matches!("aspirin".parse::<Cid>(), Err(KiraError::InvalidCid(_)));
    }

    #[test]
    fn offset_is_checked() {
        let cid = Cid::new(5).unwrap();
        assert_eq!(cid.offset(3).unwrap().get(), 8);
        assert_matches!(
            Cid::new(u64::MAX).unwrap().offset(1),
            Err(KiraError::InvalidCid(_))
        );
    }

    #[test]
    fn decimal_keeps_source_text() {
        let mw = Decimal::parse(" 100.20 ").unwrap();
        assert_eq!(mw.as_str(), "100.20");
        assert_eq!(mw.as_f64(), 100.2);
        assert!(Decimal::parse("n/a").is_none());
        assert!(Decimal::parse("NaN").is_none());
        assert!(Decimal::parse("").is_none());
    }

    #[test]
    fn cid_deserializes_from_number() {
        let cid: Cid = serde_json::from_str("42").unwrap();
        assert_eq!(cid.get(), 42);
        assert!(serde_json::from_str::<Cid>("0").is_err());
    }
}
