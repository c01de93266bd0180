use chrono::Utc;

use crate::{
    domain::{Membership, Tier},
    ports::{
        database::{self, MembershipStore},
        tier::TierStore,
    },
};
use tracing::info;
use uuid::Uuid;

use super::Error;

/// Provisions a membership on a member's first interaction
///
/// Existing memberships are returned unchanged.
#[derive(Clone, Copy, Debug)]
pub struct GetOrCreateMembershipRequest {
    pub member_id: Uuid,
}

#[derive(Clone, Copy, Debug)]
pub struct GetMembershipRequest {
    pub member_id: Uuid,
}

/// Membership along with the benefits of its tier and the distance to the next one
#[derive(Debug, PartialEq)]
pub struct MembershipSummary {
    pub membership: Membership,
    pub tier: Tier,
    /// `None` at the top tier
    pub next_tier: Option<Tier>,
    /// Lifetime points still needed for `next_tier`
    pub points_to_next_tier: Option<i64>,
}

/// All tiers, ascending by threshold
#[derive(Clone, Copy, Debug, Default)]
pub struct ListTiersRequest;

command_service!(GetOrCreateMembershipRequest => Membership, |engine, req| {
    let database = engine.database.clone();
    Box::pin(async move {
        match database.get_by_member(req.member_id).await {
            Ok(membership) => return Ok(membership),
            Err(database::Error::MemberNotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let membership = Membership::new(req.member_id, Utc::now());
        match database.create_membership(membership.clone()).await {
            Ok(()) => {
                info!(member_id = %req.member_id, "membership created");
                Ok(membership)
            }
            // Created concurrently by another request
            Err(database::Error::MemberAlreadyExists(_)) => {
                Ok(database.get_by_member(req.member_id).await?)
            }
            Err(err) => Err(err.into()),
        }
    })
});

command_service!(GetMembershipRequest => MembershipSummary, |engine, req| {
    let database = engine.database.clone();
    let tiers = engine.tiers.clone();
    Box::pin(async move {
        let membership = database.get_by_member(req.member_id).await?;
        let all = tiers.get_all().await?;

        let tier = all
            .iter()
            .find(|tier| tier.level == membership.tier)
            .cloned()
            .ok_or_else(|| {
                Error::Internal(
                    format!("tier {} is missing from the catalog", membership.tier).into(),
                )
            })?;
        let next_tier = all
            .into_iter()
            .find(|candidate| candidate.level > membership.tier);
        let points_to_next_tier = next_tier
            .as_ref()
            .map(|next| (next.min_points - membership.lifetime_points).max(0));

        Ok(MembershipSummary {
            membership,
            tier,
            next_tier,
            points_to_next_tier,
        })
    })
});

command_service!(ListTiersRequest => Vec<Tier>, |engine, _req| {
    let tiers = engine.tiers.clone();
    Box::pin(async move { Ok(tiers.get_all().await?) })
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::{earn_points::EarnPointsRequest, test_support::*},
        domain::{PointsSource, TierLevel},
    };
    use speculoos::prelude::*;
    use tower::{BoxError, ServiceExt};

    #[tokio::test]
    async fn test_get_or_create() -> Result<(), BoxError> {
        // GIVEN an unknown member
        let harness = harness();
        let member_id = Uuid::new_v4();

        // WHEN provisioning them twice
        let created = harness
            .domain
            .clone()
            .oneshot(GetOrCreateMembershipRequest { member_id })
            .await?;
        harness
            .domain
            .clone()
            .oneshot(EarnPointsRequest {
                member_id,
                points: 10,
                source: PointsSource::Signup,
                reference_id: "welcome".to_string(),
                description: "signup bonus".to_string(),
            })
            .await?;
        let existing = harness
            .domain
            .clone()
            .oneshot(GetOrCreateMembershipRequest { member_id })
            .await?;

        // THEN
        // * the first call creates a base tier membership with nothing on it
        // * the second call returns it as it is now
        assert_that!(created.tier).is_equal_to(TierLevel::Bronze);
        assert_that!(created.points_balance).is_equal_to(0);
        assert_that!(created.lifetime_points).is_equal_to(0);
        assert_that!(existing.points_balance).is_equal_to(10);
        assert_that!(existing.joined_at).is_equal_to(created.joined_at);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create() -> Result<(), BoxError> {
        let harness = harness();
        let member_id = Uuid::new_v4();

        let (first, second) = tokio::join!(
            harness
                .domain
                .clone()
                .oneshot(GetOrCreateMembershipRequest { member_id }),
            harness
                .domain
                .clone()
                .oneshot(GetOrCreateMembershipRequest { member_id }),
        );

        assert_that!(first?.joined_at).is_equal_to(second?.joined_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_summary() -> Result<(), BoxError> {
        // GIVEN a silver member with 1200 lifetime points
        let harness = harness();
        let member_id = harness.member().await;
        harness
            .domain
            .clone()
            .oneshot(EarnPointsRequest {
                member_id,
                points: 1_200,
                source: PointsSource::Order,
                reference_id: "ord-1".to_string(),
                description: "purchase".to_string(),
            })
            .await?;

        // WHEN fetching the summary
        let res = harness
            .domain
            .clone()
            .oneshot(GetMembershipRequest { member_id })
            .await?;

        // THEN it shows silver benefits and the way to gold
        assert_that!(res.tier.level).is_equal_to(TierLevel::Silver);
        assert_that!(res.tier.priority_support_hours).is_equal_to(Some(48));
        assert_that!(res.next_tier.map(|tier| tier.level)).is_equal_to(Some(TierLevel::Gold));
        assert_that!(res.points_to_next_tier).is_equal_to(Some(3_800));

        Ok(())
    }

    #[tokio::test]
    async fn test_summary_top_tier() -> Result<(), BoxError> {
        let harness = harness();
        let member_id = harness.member().await;
        harness
            .domain
            .clone()
            .oneshot(EarnPointsRequest {
                member_id,
                points: 20_000,
                source: PointsSource::Promotion,
                reference_id: "promo-1".to_string(),
                description: "launch promotion".to_string(),
            })
            .await?;

        let res = harness
            .domain
            .clone()
            .oneshot(GetMembershipRequest { member_id })
            .await?;

        assert_that!(res.tier.level).is_equal_to(TierLevel::Platinum);
        assert_that!(res.next_tier).is_none();
        assert_that!(res.points_to_next_tier).is_none();
        Ok(())
    }

    #[tokio::test]
    async fn test_list_tiers() -> Result<(), BoxError> {
        let harness = harness();

        let res = harness.domain.clone().oneshot(ListTiersRequest).await?;

        let thresholds: Vec<_> = res.iter().map(|tier| tier.min_points).collect();
        assert_that!(thresholds).is_equal_to(vec![0, 1_000, 5_000, 15_000]);
        Ok(())
    }
}
