//! Sync engines: set-difference sync for flat resources, reconciliation for
//! the conversation graph, upsert import for products.

pub mod conversations;
pub mod flat;
pub mod products;
