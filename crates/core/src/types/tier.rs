//! Customer tiers and their delivery discounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer classification that grants a multiplicative delivery discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTier {
    /// No delivery discount.
    #[default]
    Regular,
    /// Pays 80% of the delivery fee.
    Gold,
    /// Pays 50% of the delivery fee.
    Premium,
}

impl CustomerTier {
    /// Every tier, cheapest discount first.
    pub const ALL: [Self; 3] = [Self::Regular, Self::Gold, Self::Premium];

    /// Default multiplicative factor applied to the final delivery fee.
    ///
    /// Pricing rules may override these per tier; this is the built-in table.
    #[must_use]
    pub fn default_discount_factor(self) -> Decimal {
        match self {
            Self::Regular => Decimal::ONE,
            Self::Gold => Decimal::new(8, 1),
            Self::Premium => Decimal::new(5, 1),
        }
    }

    /// The wire name used by the delivery API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Gold => "gold",
            Self::Premium => "premium",
        }
    }
}

impl std::fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown tier name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid customer tier: {0}")]
pub struct TierParseError(pub String);

impl std::str::FromStr for CustomerTier {
    type Err = TierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "gold" => Ok(Self::Gold),
            "premium" => Ok(Self::Premium),
            _ => Err(TierParseError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_discount_factors() {
        assert_eq!(CustomerTier::Regular.default_discount_factor(), Decimal::ONE);
        assert_eq!(
            CustomerTier::Gold.default_discount_factor(),
            Decimal::new(8, 1)
        );
        assert_eq!(
            CustomerTier::Premium.default_discount_factor(),
            Decimal::new(5, 1)
        );
    }

    #[test]
    fn test_tier_round_trips_through_str() {
        for tier in CustomerTier::ALL {
            assert_eq!(tier.to_string().parse::<CustomerTier>().unwrap(), tier);
        }
        assert!("platinum".parse::<CustomerTier>().is_err());
    }

    #[test]
    fn test_tier_serde_snake_case() {
        let json = serde_json::to_string(&CustomerTier::Premium).unwrap();
        assert_eq!(json, "\"premium\"");
    }
}
