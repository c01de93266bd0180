mod static_store;

pub use static_store::StaticTierStore;
