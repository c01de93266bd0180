pub mod database;
pub mod events;
pub mod tier;
