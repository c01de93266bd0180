use crate::{
    domain::{Membership, PageRequest, PointsTransaction, TierLevel},
    ports::database::{DatabasePort, Error, MembershipStore, PointsUpdate, TransactionStore},
};
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex, PoisonError},
};
use uuid::Uuid;

/// In-memory storage for memberships and the ledger
///
/// Both live behind a single lock, which makes [`DatabasePort::record_transaction`] atomic.
#[derive(Clone, Debug, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    memberships: HashMap<Uuid, Membership>,
    /// Append-only ledger, in insertion order
    transactions: Vec<PointsTransaction>,
    transaction_index: HashMap<Uuid, usize>,
}

impl Tables {
    /// Checks a points update and returns the membership as it would be after applying it
    fn prepare_points(&self, update: &PointsUpdate) -> Result<Membership, Error> {
        let current = self
            .memberships
            .get(&update.member_id)
            .ok_or(Error::MemberNotFound(update.member_id))?;

        if current.version != update.expected_version {
            return Err(Error::Conflict {
                member_id: update.member_id,
            });
        }
        // Return an error if this would make the number of loyalty points negative
        if update.points_balance < 0 {
            return Err(Error::NegativePointsTotal {
                current_points: current.points_balance,
                new_points: update.points_balance,
            });
        }
        if update.lifetime_points < current.lifetime_points {
            return Err(Error::LifetimePointsDecreased {
                member_id: update.member_id,
            });
        }

        let mut membership = current.clone();
        membership.points_balance = update.points_balance;
        membership.lifetime_points = update.lifetime_points;
        membership.updated_at = membership.updated_at.max(update.updated_at);
        membership.version += 1;
        Ok(membership)
    }

    fn append(&mut self, transaction: PointsTransaction) {
        self.transaction_index
            .insert(transaction.id, self.transactions.len());
        self.transactions.push(transaction);
    }
}

#[async_trait::async_trait]
impl MembershipStore for MemoryDatabase {
    async fn get_by_member(&self, member_id: Uuid) -> Result<Membership, Error> {
        self.tables
            .lock()?
            .memberships
            .get(&member_id)
            .cloned()
            .ok_or(Error::MemberNotFound(member_id))
    }

    async fn create_membership(&self, membership: Membership) -> Result<(), Error> {
        match self.tables.lock()?.memberships.entry(membership.member_id) {
            Entry::Occupied(_) => Err(Error::MemberAlreadyExists(membership.member_id)),
            Entry::Vacant(entry) => {
                entry.insert(membership);
                Ok(())
            }
        }
    }

    async fn update_tier(
        &self,
        member_id: Uuid,
        from: TierLevel,
        to: TierLevel,
    ) -> Result<Membership, Error> {
        let mut tables = self.tables.lock()?;
        let membership = tables
            .memberships
            .get_mut(&member_id)
            .ok_or(Error::MemberNotFound(member_id))?;

        if membership.tier != from {
            return Err(Error::Conflict { member_id });
        }
        membership.tier = to;
        Ok(membership.clone())
    }

    async fn update_points(&self, update: PointsUpdate) -> Result<Membership, Error> {
        let mut tables = self.tables.lock()?;
        let membership = tables.prepare_points(&update)?;
        tables
            .memberships
            .insert(membership.member_id, membership.clone());
        Ok(membership)
    }
}

#[async_trait::async_trait]
impl TransactionStore for MemoryDatabase {
    async fn create_transaction(&self, transaction: PointsTransaction) -> Result<(), Error> {
        self.tables.lock()?.append(transaction);
        Ok(())
    }

    async fn list_by_member(
        &self,
        member_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<PointsTransaction>, u64), Error> {
        let tables = self.tables.lock()?;
        let mut ledger: Vec<_> = tables
            .transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| tx.member_id == member_id)
            .collect();
        // Newest first, falling back to insertion order for identical timestamps
        ledger.sort_by(|(a_pos, a), (b_pos, b)| {
            b.created_at.cmp(&a.created_at).then(b_pos.cmp(a_pos))
        });

        let total = ledger.len() as u64;
        let items = ledger
            .into_iter()
            .skip(page.offset())
            .take(page.page_size() as usize)
            .map(|(_, tx)| tx.clone())
            .collect();
        Ok((items, total))
    }

    async fn get_by_id(&self, transaction_id: Uuid) -> Result<PointsTransaction, Error> {
        let tables = self.tables.lock()?;
        tables
            .transaction_index
            .get(&transaction_id)
            .map(|pos| tables.transactions[*pos].clone())
            .ok_or(Error::TransactionNotFound(transaction_id))
    }
}

#[async_trait::async_trait]
impl DatabasePort for MemoryDatabase {
    async fn record_transaction(
        &self,
        transaction: PointsTransaction,
        update: PointsUpdate,
    ) -> Result<Membership, Error> {
        if transaction.member_id != update.member_id {
            return Err(Error::MismatchedMember {
                transaction_id: transaction.id,
                member_id: update.member_id,
            });
        }

        let mut tables = self.tables.lock()?;
        // Nothing is written until the update is known to apply
        let membership = tables.prepare_points(&update)?;
        tables.append(transaction);
        tables
            .memberships
            .insert(membership.member_id, membership.clone());
        Ok(membership)
    }
}

/// Poisoned table lock
///
/// Only the message is kept, the guard inside [`PoisonError`] cannot cross threads.
#[derive(Debug, thiserror::Error)]
#[error("tables lock poisoned: {0}")]
pub struct PoisonedTables(String);

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(PoisonedTables(err.to_string())))
    }
}
