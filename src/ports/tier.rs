use crate::domain::Tier;

/// Read access to the tier catalog
#[mockall::automock]
#[async_trait::async_trait]
pub trait TierStore: Send + Sync {
    /// All tiers, ascending by threshold
    async fn get_all(&self) -> Result<Vec<Tier>, Error>;
    /// Highest tier whose threshold does not exceed `lifetime_points`
    async fn get_tier_for_points(&self, lifetime_points: i64) -> Result<Tier, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
