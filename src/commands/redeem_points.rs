use crate::{
    domain::{DomainEvent, PointsTransaction},
    ports::database::PointsUpdate,
};
use tracing::info;
use uuid::Uuid;

use super::{commit_points, publish_best_effort, validate_points, validate_reference, Error};

#[derive(Clone, Debug)]
pub struct RedeemPointsRequest {
    pub member_id: Uuid,
    pub points: i64,
    /// Order the points are spent on
    pub order_id: String,
    pub description: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RedeemPointsResponse {
    /// The committed ledger entry
    pub transaction: PointsTransaction,
    pub points_balance: i64,
}

command_service!(RedeemPointsRequest => RedeemPointsResponse, |engine, req| {
    let database = engine.database.clone();
    let publisher = engine.publisher.clone();
    let locks = engine.locks.clone();
    let config = engine.config.clone();
    Box::pin(async move {
        validate_points(req.points)?;
        validate_reference("order_id", &req.order_id)?;

        let (transaction, membership) = commit_points(
            &*database,
            &locks,
            config.max_conflict_retries,
            req.member_id,
            |membership, created_at| {
                if membership.points_balance < req.points {
                    return Err(Error::InsufficientPoints {
                        required: req.points,
                        available: membership.points_balance,
                    });
                }
                // Lifetime points stay as they are, spending never costs a tier
                let update = PointsUpdate {
                    member_id: membership.member_id,
                    expected_version: membership.version,
                    points_balance: membership.points_balance - req.points,
                    lifetime_points: membership.lifetime_points,
                    updated_at: created_at,
                };
                let transaction = PointsTransaction::redeem(
                    membership.member_id,
                    req.points,
                    req.order_id.as_str(),
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
            order_id = %req.order_id,
            balance = membership.points_balance,
            "points redeemed"
        );

        publish_best_effort(
            publisher,
            DomainEvent::PointsRedeemed {
                member_id: req.member_id,
                points: req.points,
                order_id: req.order_id.clone(),
            },
            config.publish_timeout(),
        );

        Ok(RedeemPointsResponse {
            transaction,
            points_balance: membership.points_balance,
        })
    })
});
