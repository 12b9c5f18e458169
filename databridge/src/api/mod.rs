//! Web API routes

pub mod entities;
pub mod health;

pub use entities::entity_routes;
pub use health::health_routes;
