use serde::{Deserialize, Serialize};
use std::fmt;

/// Reward tier of a member, ordered from the base tier upwards
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierLevel {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl TierLevel {
    pub fn name(&self) -> &'static str {
        match self {
            TierLevel::Bronze => "bronze",
            TierLevel::Silver => "silver",
            TierLevel::Gold => "gold",
            TierLevel::Platinum => "platinum",
        }
    }
}

impl fmt::Display for TierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Benefits and threshold of a tier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    #[serde(rename = "name")]
    pub level: TierLevel,
    /// Lifetime points needed to reach this tier
    pub min_points: i64,
    /// Share of the order amount paid back, e.g. `0.02` for 2%
    pub cashback_rate: f64,
    pub points_multiplier: f64,
    pub free_shipping: bool,
    /// Guaranteed support response time, if any
    pub priority_support_hours: Option<u32>,
}

impl Tier {
    pub fn name(&self) -> &'static str {
        self.level.name()
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TierCatalogError {
    #[error("tier catalog is empty")]
    Empty,
    /// Without a zero threshold some members would not map to any tier
    #[error("lowest tier threshold must be 0, got {0}")]
    MissingBaseThreshold(i64),
    #[error("duplicate tier threshold {0}")]
    DuplicateThreshold(i64),
    #[error("tier {higher} has a lower threshold than {lower}")]
    LevelOutOfOrder { lower: TierLevel, higher: TierLevel },
}

/// Ordered set of tiers
///
/// Tiers are kept sorted by strictly increasing `min_points`, and tier levels increase along with
/// the thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct TierCatalog {
    tiers: Vec<Tier>,
}

impl TierCatalog {
    pub fn new(mut tiers: Vec<Tier>) -> Result<Self, TierCatalogError> {
        tiers.sort_by_key(|tier| tier.min_points);

        let base = tiers.first().ok_or(TierCatalogError::Empty)?;
        if base.min_points != 0 {
            return Err(TierCatalogError::MissingBaseThreshold(base.min_points));
        }
        for pair in tiers.windows(2) {
            let (lower, higher) = (&pair[0], &pair[1]);
            if lower.min_points == higher.min_points {
                return Err(TierCatalogError::DuplicateThreshold(higher.min_points));
            }
            if lower.level >= higher.level {
                return Err(TierCatalogError::LevelOutOfOrder {
                    lower: lower.level,
                    higher: higher.level,
                });
            }
        }

        Ok(Self { tiers })
    }

    /// Catalog used when no tiers are configured
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                Tier {
                    level: TierLevel::Bronze,
                    min_points: 0,
                    cashback_rate: 0.0,
                    points_multiplier: 1.0,
                    free_shipping: false,
                    priority_support_hours: None,
                },
                Tier {
                    level: TierLevel::Silver,
                    min_points: 1_000,
                    cashback_rate: 0.01,
                    points_multiplier: 1.25,
                    free_shipping: false,
                    priority_support_hours: Some(48),
                },
                Tier {
                    level: TierLevel::Gold,
                    min_points: 5_000,
                    cashback_rate: 0.02,
                    points_multiplier: 1.5,
                    free_shipping: true,
                    priority_support_hours: Some(24),
                },
                Tier {
                    level: TierLevel::Platinum,
                    min_points: 15_000,
                    cashback_rate: 0.03,
                    points_multiplier: 2.0,
                    free_shipping: true,
                    priority_support_hours: Some(4),
                },
            ],
        }
    }

    /// All tiers, ascending by threshold
    pub fn all(&self) -> &[Tier] {
        &self.tiers
    }

    /// Highest tier whose threshold does not exceed `lifetime_points`
    pub fn tier_for_points(&self, lifetime_points: i64) -> &Tier {
        let reached = self
            .tiers
            .partition_point(|tier| tier.min_points <= lifetime_points);
        // The base threshold is 0, so only negative totals land before it
        &self.tiers[reached.saturating_sub(1)]
    }

    pub fn get(&self, level: TierLevel) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.level == level)
    }

    /// Tier following `level`, if `level` is not the top one
    pub fn next_after(&self, level: TierLevel) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.level > level)
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use speculoos::prelude::*;

    fn tier(level: TierLevel, min_points: i64) -> Tier {
        Tier {
            level,
            min_points,
            cashback_rate: 0.0,
            points_multiplier: 1.0,
            free_shipping: false,
            priority_support_hours: None,
        }
    }

    #[rstest]
    #[case(0, TierLevel::Bronze)]
    #[case(999, TierLevel::Bronze)]
    #[case(1_000, TierLevel::Silver)]
    #[case(1_200, TierLevel::Silver)]
    #[case(4_999, TierLevel::Silver)]
    #[case(5_000, TierLevel::Gold)]
    #[case(15_000, TierLevel::Platinum)]
    #[case(i64::MAX, TierLevel::Platinum)]
    fn test_tier_for_points(#[case] lifetime_points: i64, #[case] expected: TierLevel) {
        let catalog = TierCatalog::standard();

        let res = catalog.tier_for_points(lifetime_points);

        assert_that!(res.level).is_equal_to(expected);
    }

    #[test]
    fn test_new_sorts_by_threshold() {
        let catalog = TierCatalog::new(vec![
            tier(TierLevel::Gold, 500),
            tier(TierLevel::Bronze, 0),
            tier(TierLevel::Silver, 100),
        ])
        .unwrap();

        let levels: Vec<_> = catalog.all().iter().map(|tier| tier.level).collect();
        assert_that!(levels).is_equal_to(vec![TierLevel::Bronze, TierLevel::Silver, TierLevel::Gold]);
        assert_that!(catalog.tier_for_points(300).level).is_equal_to(TierLevel::Silver);
    }

    #[rstest]
    #[case(vec![], TierCatalogError::Empty)]
    #[case(vec![tier(TierLevel::Bronze, 10)], TierCatalogError::MissingBaseThreshold(10))]
    #[case(
        vec![tier(TierLevel::Bronze, 0), tier(TierLevel::Silver, 100), tier(TierLevel::Gold, 100)],
        TierCatalogError::DuplicateThreshold(100)
    )]
    #[case(
        vec![tier(TierLevel::Silver, 0), tier(TierLevel::Bronze, 100)],
        TierCatalogError::LevelOutOfOrder { lower: TierLevel::Silver, higher: TierLevel::Bronze }
    )]
    fn test_new_invalid(#[case] tiers: Vec<Tier>, #[case] expected: TierCatalogError) {
        let res = TierCatalog::new(tiers);

        assert_that!(res).is_err().is_equal_to(expected);
    }

    #[test]
    fn test_next_after() {
        let catalog = TierCatalog::standard();

        assert_that!(catalog.next_after(TierLevel::Bronze).map(|tier| tier.level))
            .is_equal_to(Some(TierLevel::Silver));
        assert_that!(catalog.next_after(TierLevel::Platinum)).is_none();
    }

    #[test]
    fn test_level_ordering() {
        assert_that!(TierLevel::Bronze < TierLevel::Silver).is_true();
        assert_that!(TierLevel::Gold < TierLevel::Platinum).is_true();
        assert_that!(TierLevel::Platinum.to_string()).is_equal_to("platinum".to_string());
    }
}
