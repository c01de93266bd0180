use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-member mutual exclusion
///
/// Members never share a lock, and an entry only exists while someone holds or waits for it.
#[derive(Debug, Default)]
pub struct MemberLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl MemberLocks {
    pub async fn lock(&self, member_id: Uuid) -> MemberGuard<'_> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(member_id)
            .or_default()
            .clone();

        // Dropped while waiting, the guard still releases the entry
        let mut guard = MemberGuard {
            locks: self,
            member_id,
            guard: None,
        };
        guard.guard = Some(lock.lock_owned().await);
        guard
    }

    fn release(&self, member_id: Uuid) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Still referenced by a waiting task
        if locks
            .get(&member_id)
            .is_some_and(|lock| Arc::strong_count(lock) > 1)
        {
            return;
        }
        locks.remove(&member_id);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct MemberGuard<'a> {
    locks: &'a MemberLocks,
    member_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for MemberGuard<'_> {
    fn drop(&mut self) {
        // The guard owns a reference to the lock, drop it before checking for waiters
        self.guard.take();
        self.locks.release(self.member_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_member_is_exclusive() {
        let locks = MemberLocks::default();
        let member_id = Uuid::new_v4();

        let guard = locks.lock(member_id).await;
        let res = tokio::time::timeout(Duration::from_millis(20), locks.lock(member_id)).await;
        assert_that!(res.is_err()).is_true();

        drop(guard);
        let res = tokio::time::timeout(Duration::from_millis(20), locks.lock(member_id)).await;
        assert_that!(res.is_ok()).is_true();
    }

    #[tokio::test]
    async fn test_members_are_independent() {
        let locks = MemberLocks::default();

        let _first = locks.lock(Uuid::new_v4()).await;
        let res =
            tokio::time::timeout(Duration::from_millis(20), locks.lock(Uuid::new_v4())).await;

        assert_that!(res.is_ok()).is_true();
    }

    #[tokio::test]
    async fn test_entries_are_released() {
        let locks = MemberLocks::default();
        let member_id = Uuid::new_v4();

        {
            let _guard = locks.lock(member_id).await;
            assert_that!(locks.len()).is_equal_to(1);
        }

        assert_that!(locks.len()).is_equal_to(0);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_is_released() {
        // GIVEN a member whose lock is held, with another task waiting for it
        let locks = MemberLocks::default();
        let member_id = Uuid::new_v4();
        let holder = locks.lock(member_id).await;
        let mut waiter = Box::pin(locks.lock(member_id));
        let res = tokio::time::timeout(Duration::from_millis(10), &mut waiter).await;
        assert_that!(res.is_err()).is_true();

        // WHEN the holder unlocks and the waiter gives up
        drop(holder);
        drop(waiter);

        // THEN no entry is left behind
        assert_that!(locks.len()).is_equal_to(0);
    }
}
