//! Database access for DataBridge
//!
//! One module per persisted entity, in the shared SQLite database created
//! by `databridge-common`. Insert/update functions run inside the calling
//! engine's transaction; load functions read through the pool.

pub mod campaigns;
pub mod consumers;
pub mod conversations;
pub mod interactions;
pub mod messages;
pub mod products;
pub mod resources;
pub mod summaries;
pub mod surveys;
pub mod transfers;
