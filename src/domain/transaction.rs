use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Kind of ledger entry
///
/// Only `Earn` and `Redeem` are produced by the engine. `Expire` and `Adjust` are valid entries
/// that may appear in a ledger written by other tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Earn,
    Redeem,
    Expire,
    Adjust,
}

/// Business event that produced an earn transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointsSource {
    Order,
    Review,
    Referral,
    Promotion,
    Signup,
}

impl PointsSource {
    pub fn name(&self) -> &'static str {
        match self {
            PointsSource::Order => "order",
            PointsSource::Review => "review",
            PointsSource::Referral => "referral",
            PointsSource::Promotion => "promotion",
            PointsSource::Signup => "signup",
        }
    }
}

impl fmt::Display for PointsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown points source: {0}")]
pub struct UnknownPointsSource(pub String);

impl FromStr for PointsSource {
    type Err = UnknownPointsSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(PointsSource::Order),
            "review" => Ok(PointsSource::Review),
            "referral" => Ok(PointsSource::Referral),
            "promotion" => Ok(PointsSource::Promotion),
            "signup" => Ok(PointsSource::Signup),
            other => Err(UnknownPointsSource(other.to_string())),
        }
    }
}

/// Immutable ledger entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsTransaction {
    pub id: Uuid,
    pub member_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Magnitude of the change
    ///
    /// This is always positive, the direction is given by `kind`.
    pub points: i64,
    /// Only meaningful for earn transactions. Redemptions always use `Order`.
    pub source: PointsSource,
    /// Identifier of the originating business event, such as an order or review ID
    ///
    /// This is supplied by the caller and not unique.
    pub reference_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PointsTransaction {
    pub fn earn(
        member_id: Uuid,
        points: i64,
        source: PointsSource,
        reference_id: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            kind: TransactionType::Earn,
            points,
            source,
            reference_id: reference_id.into(),
            description: description.into(),
            created_at,
        }
    }

    pub fn redeem(
        member_id: Uuid,
        points: i64,
        order_id: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            kind: TransactionType::Redeem,
            points,
            source: PointsSource::Order,
            reference_id: order_id.into(),
            description: description.into(),
            created_at,
        }
    }
}
