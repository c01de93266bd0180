use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod event;
mod page;
mod tier;
mod transaction;

pub use event::DomainEvent;
pub use page::{Page, PageRequest};
pub use tier::{Tier, TierCatalog, TierCatalogError, TierLevel};
pub use transaction::{PointsSource, PointsTransaction, TransactionType, UnknownPointsSource};

/// Loyalty membership of a member
///
/// This is a projection of the member's ledger, kept consistent by the engine on every commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique identifier for the member
    ///
    /// This is also used by other services.
    pub member_id: Uuid,
    /// Current tier
    pub tier: TierLevel,
    /// Points available for redemption
    pub points_balance: i64,
    /// Points ever earned
    ///
    /// Only earn transactions increase this total and nothing decreases it.
    pub lifetime_points: i64,
    /// Reserved for a tier expiry policy, never changed by the engine
    pub tier_expires_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
    /// Time of the last committed points change
    ///
    /// Ledger entries for this member are never stamped earlier than this.
    pub updated_at: DateTime<Utc>,
    /// Incremented on every committed points change, used for conditional updates
    pub version: u64,
}

impl Membership {
    pub fn new(member_id: Uuid, joined_at: DateTime<Utc>) -> Self {
        Self {
            member_id,
            tier: TierLevel::default(),
            points_balance: 0,
            lifetime_points: 0,
            tier_expires_at: None,
            joined_at,
            updated_at: joined_at,
            version: 0,
        }
    }

    /// Earliest timestamp a new ledger entry for this member may carry
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.updated_at)
    }
}
