use crate::{domain::TierLevel, ports::database::MembershipStore};
use uuid::Uuid;

#[derive(Clone, Copy, Debug)]
pub struct GetBalanceRequest {
    pub member_id: Uuid,
}

#[derive(Debug, PartialEq, Eq)]
pub struct GetBalanceResponse {
    pub member_id: Uuid,
    pub points_balance: i64,
    pub lifetime_points: i64,
    pub tier: TierLevel,
}

command_service!(GetBalanceRequest => GetBalanceResponse, |engine, req| {
    let database = engine.database.clone();
    Box::pin(async move {
        let membership = database.get_by_member(req.member_id).await?;

        Ok(GetBalanceResponse {
            member_id: membership.member_id,
            points_balance: membership.points_balance,
            lifetime_points: membership.lifetime_points,
            tier: membership.tier,
        })
    })
});
