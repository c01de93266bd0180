use std::{sync::Arc, time::Duration};

use crate::{
    config::EngineConfig,
    domain::{DomainEvent, TierLevel},
    ports::{
        database::{self, MembershipStore},
        events::EventPublisher,
        tier::TierStore,
    },
};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{publish_best_effort, Error};

/// Outcome of a tier check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierCheck {
    pub member_id: Uuid,
    /// Tier the check started from
    ///
    /// If another check moved the member in the meantime, this is the tier it left them at.
    pub previous: TierLevel,
    /// Tier after the check
    pub current: TierLevel,
}

impl TierCheck {
    /// Whether this check itself moved the member
    pub fn upgraded(&self) -> bool {
        self.current != self.previous
    }
}

/// Re-evaluates a member's tier from their lifetime points
#[mockall::automock]
#[async_trait::async_trait]
pub trait TierEvaluator: Send + Sync {
    async fn check_and_upgrade(&self, member_id: Uuid) -> Result<TierCheck, Error>;
}

/// Default [`TierEvaluator`]
///
/// Members only ever move up. A tier computed below the current one, which can happen after the
/// catalog is reseeded with higher thresholds, leaves the member where they are.
pub struct TierProgression<M, T, P> {
    memberships: Arc<M>,
    tiers: Arc<T>,
    publisher: Arc<P>,
    publish_timeout: Duration,
    max_attempts: u32,
}

impl<M, T, P> TierProgression<M, T, P> {
    pub fn new(memberships: Arc<M>, tiers: Arc<T>, publisher: Arc<P>, config: &EngineConfig) -> Self {
        Self {
            memberships,
            tiers,
            publisher,
            publish_timeout: config.publish_timeout(),
            max_attempts: config.max_conflict_retries,
        }
    }
}

#[async_trait::async_trait]
impl<M, T, P> TierEvaluator for TierProgression<M, T, P>
where
    M: MembershipStore,
    T: TierStore,
    P: EventPublisher + 'static,
{
    async fn check_and_upgrade(&self, member_id: Uuid) -> Result<TierCheck, Error> {
        for attempt in 1..=self.max_attempts {
            let membership = self.memberships.get_by_member(member_id).await?;
            let target = self
                .tiers
                .get_tier_for_points(membership.lifetime_points)
                .await?;

            if target.level <= membership.tier {
                debug!(%member_id, tier = %membership.tier, "tier unchanged");
                return Ok(TierCheck {
                    member_id,
                    previous: membership.tier,
                    current: membership.tier,
                });
            }

            match self
                .memberships
                .update_tier(member_id, membership.tier, target.level)
                .await
            {
                Ok(_) => {}
                // Another check moved the member first, evaluate again from where it left them
                Err(database::Error::Conflict { .. }) => {
                    debug!(%member_id, attempt, "tier changed concurrently, re-evaluating");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
            info!(
                %member_id,
                old_tier = %membership.tier,
                new_tier = %target.level,
                lifetime_points = membership.lifetime_points,
                "tier upgraded"
            );

            publish_best_effort(
                self.publisher.clone(),
                DomainEvent::TierUpgraded {
                    member_id,
                    old_tier: membership.tier,
                    new_tier: target.level,
                },
                self.publish_timeout,
            );

            return Ok(TierCheck {
                member_id,
                previous: membership.tier,
                current: target.level,
            });
        }

        error!(%member_id, max_attempts = self.max_attempts, "giving up on conflicting tier updates");
        Err(Error::Internal(
            format!("too many concurrent tier updates for member {member_id}").into(),
        ))
    }
}
