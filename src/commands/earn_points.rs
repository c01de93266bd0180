use crate::{
    domain::{DomainEvent, PointsSource, PointsTransaction, TierLevel},
    ports::database::PointsUpdate,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    commit_points, publish_best_effort, validate_points, validate_reference, Error, TierEvaluator,
};

#[derive(Clone, Debug)]
pub struct EarnPointsRequest {
    pub member_id: Uuid,
    pub points: i64,
    pub source: PointsSource,
    /// Identifier of the order, review, etc. that earned the points
    pub reference_id: String,
    pub description: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct EarnPointsResponse {
    /// The committed ledger entry
    pub transaction: PointsTransaction,
    pub points_balance: i64,
    pub lifetime_points: i64,
    /// Tier after re-evaluation
    ///
    /// If the evaluation failed, this is the tier the member had before earning.
    pub tier: TierLevel,
}

command_service!(EarnPointsRequest => EarnPointsResponse, |engine, req| {
    let database = engine.database.clone();
    let publisher = engine.publisher.clone();
    let evaluator = engine.evaluator.clone();
    let locks = engine.locks.clone();
    let config = engine.config.clone();
    Box::pin(async move {
        validate_points(req.points)?;
        validate_reference("reference_id", &req.reference_id)?;

        let (transaction, membership) = commit_points(
            &*database,
            &locks,
            config.max_conflict_retries,
            req.member_id,
            |membership, created_at| {
                let update = PointsUpdate {
                    member_id: membership.member_id,
                    expected_version: membership.version,
                    points_balance: checked_add(membership.points_balance, req.points)?,
                    lifetime_points: checked_add(membership.lifetime_points, req.points)?,
                    updated_at: created_at,
                };
                let transaction = PointsTransaction::earn(
                    membership.member_id,
                    req.points,
                    req.source,
                    req.reference_id.as_str(),
                    req.description.as_str(),
                    created_at,
                );
                Ok((transaction, update))
            },
        )
        .await?;
        info!(
            member_id = %req.member_id,
            points = req.points,
            source = %req.source,
            balance = membership.points_balance,
            "points earned"
        );

        // The earn is committed at this point, a failed tier check is picked up on the next one
        let tier = match evaluator.check_and_upgrade(req.member_id).await {
            Ok(check) => check.current,
            Err(err) => {
                warn!(member_id = %req.member_id, error = %err, "tier check failed");
                membership.tier
            }
        };

        publish_best_effort(
            publisher,
            DomainEvent::PointsEarned {
                member_id: req.member_id,
                points: req.points,
                source: req.source,
                reference_id: req.reference_id.clone(),
            },
            config.publish_timeout(),
        );

        Ok(EarnPointsResponse {
            transaction,
            points_balance: membership.points_balance,
            lifetime_points: membership.lifetime_points,
            tier,
        })
    })
});

fn checked_add(total: i64, points: i64) -> Result<i64, Error> {
    total
        .checked_add(points)
        .ok_or(Error::InvalidArgument("points total would overflow".into()))
}
