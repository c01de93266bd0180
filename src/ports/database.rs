use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Membership, PageRequest, PointsTransaction, TierLevel};

/// Conditional change of a membership's points
///
/// The change only applies if the stored membership is still at `expected_version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointsUpdate {
    pub member_id: Uuid,
    pub expected_version: u64,
    pub points_balance: i64,
    pub lifetime_points: i64,
    pub updated_at: DateTime<Utc>,
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    async fn get_by_member(&self, member_id: Uuid) -> Result<Membership, Error>;
    async fn create_membership(&self, membership: Membership) -> Result<(), Error>;
    /// Moves the member from tier `from` to tier `to`
    ///
    /// Returns [`Error::Conflict`] if the member is no longer at tier `from`.
    async fn update_tier(
        &self,
        member_id: Uuid,
        from: TierLevel,
        to: TierLevel,
    ) -> Result<Membership, Error>;
    async fn update_points(&self, update: PointsUpdate) -> Result<Membership, Error>;
}

#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create_transaction(&self, transaction: PointsTransaction) -> Result<(), Error>;
    /// Page of a member's ledger, newest first, along with the total number of entries
    async fn list_by_member(
        &self,
        member_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<PointsTransaction>, u64), Error>;
    async fn get_by_id(&self, transaction_id: Uuid) -> Result<PointsTransaction, Error>;
}

/// Storage holding both the memberships and the ledger
#[async_trait::async_trait]
pub trait DatabasePort: MembershipStore + TransactionStore {
    /// Appends `transaction` to the ledger and applies `update` as a single atomic unit
    ///
    /// Either both changes are stored or none of them is.
    async fn record_transaction(
        &self,
        transaction: PointsTransaction,
        update: PointsUpdate,
    ) -> Result<Membership, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("member {0} does not exist")]
    MemberNotFound(Uuid),

    #[error("member {0} already exists")]
    MemberAlreadyExists(Uuid),

    #[error("transaction {0} does not exist")]
    TransactionNotFound(Uuid),

    /// The membership changed since it was read
    ///
    /// The operation can safely be retried from a fresh read.
    #[error("concurrent update of member {member_id}")]
    Conflict { member_id: Uuid },

    /// Trying to remove too many points
    ///
    /// This would result in a negative balance, which is not supported.
    #[error("points balance of {current_points} cannot go to {new_points}")]
    NegativePointsTotal { current_points: i64, new_points: i64 },

    #[error("lifetime points of member {member_id} cannot decrease")]
    LifetimePointsDecreased { member_id: Uuid },

    #[error("transaction {transaction_id} does not belong to member {member_id}")]
    MismatchedMember {
        transaction_id: Uuid,
        member_id: Uuid,
    },

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
