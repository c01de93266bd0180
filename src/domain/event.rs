use serde_json::{json, Value};
use uuid::Uuid;

use super::{PointsSource, TierLevel};

/// Notification emitted after a change has been committed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    PointsEarned {
        member_id: Uuid,
        points: i64,
        source: PointsSource,
        reference_id: String,
    },
    PointsRedeemed {
        member_id: Uuid,
        points: i64,
        order_id: String,
    },
    TierUpgraded {
        member_id: Uuid,
        old_tier: TierLevel,
        new_tier: TierLevel,
    },
}

impl DomainEvent {
    pub const POINTS_EARNED: &'static str = "points.earned";
    pub const POINTS_REDEEMED: &'static str = "points.redeemed";
    pub const TIER_UPGRADED: &'static str = "tier.upgraded";

    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::PointsEarned { .. } => Self::POINTS_EARNED,
            DomainEvent::PointsRedeemed { .. } => Self::POINTS_REDEEMED,
            DomainEvent::TierUpgraded { .. } => Self::TIER_UPGRADED,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            DomainEvent::PointsEarned {
                member_id,
                points,
                source,
                reference_id,
            } => json!({
                "member_id": member_id,
                "points": points,
                "source": source,
                "reference_id": reference_id,
            }),
            DomainEvent::PointsRedeemed {
                member_id,
                points,
                order_id,
            } => json!({
                "member_id": member_id,
                "points": points,
                "order_id": order_id,
            }),
            DomainEvent::TierUpgraded {
                member_id,
                old_tier,
                new_tier,
            } => json!({
                "member_id": member_id,
                "old_tier": old_tier.name(),
                "new_tier": new_tier.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn test_tier_upgraded_payload() {
        let member_id = Uuid::new_v4();
        let event = DomainEvent::TierUpgraded {
            member_id,
            old_tier: TierLevel::Bronze,
            new_tier: TierLevel::Silver,
        };

        assert_that!(event.topic()).is_equal_to("tier.upgraded");
        assert_that!(event.payload()).is_equal_to(json!({
            "member_id": member_id.to_string(),
            "old_tier": "bronze",
            "new_tier": "silver",
        }));
    }

    #[test]
    fn test_points_earned_payload() {
        let member_id = Uuid::new_v4();
        let event = DomainEvent::PointsEarned {
            member_id,
            points: 120,
            source: PointsSource::Referral,
            reference_id: "ref-1".to_string(),
        };

        let payload = event.payload();

        assert_that!(event.topic()).is_equal_to("points.earned");
        assert_that!(payload["source"].as_str()).is_equal_to(Some("referral"));
        assert_that!(payload["points"].as_i64()).is_equal_to(Some(120));
    }
}
