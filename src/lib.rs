pub mod auth;
pub mod calendar;
pub mod defaults;
pub mod engine;
pub mod inventory;
pub mod limits;
pub mod loader;
pub mod model;
pub mod notify;
pub mod observability;
pub mod rules;
pub mod tariff;
pub mod wal;
