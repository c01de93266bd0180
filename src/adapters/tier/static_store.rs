use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    domain::{Tier, TierCatalog},
    ports::tier::{Error, TierStore},
};

/// Tier catalog held in memory
///
/// Reads share the lock. The catalog only changes through [`StaticTierStore::reseed`], which is
/// an administrative action and never called by the engine.
#[derive(Clone, Debug, Default)]
pub struct StaticTierStore {
    catalog: Arc<RwLock<TierCatalog>>,
}

impl StaticTierStore {
    pub fn new(catalog: TierCatalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }

    /// Replaces the whole catalog
    pub fn reseed(&self, catalog: TierCatalog) {
        *self
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner) = catalog;
    }
}

#[async_trait::async_trait]
impl TierStore for StaticTierStore {
    async fn get_all(&self) -> Result<Vec<Tier>, Error> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        Ok(catalog.all().to_vec())
    }

    async fn get_tier_for_points(&self, lifetime_points: i64) -> Result<Tier, Error> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        Ok(catalog.tier_for_points(lifetime_points).clone())
    }
}
