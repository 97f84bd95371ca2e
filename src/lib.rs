pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod gemini;
pub mod identity;
pub mod metrics;
pub mod migrator;
pub mod notifications;
pub mod places;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod weather;
pub mod worker;

pub use sea_orm;
