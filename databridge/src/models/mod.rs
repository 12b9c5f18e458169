//! Persisted entity models
//!
//! Every entity exposes an explicit, named natural key: the field or field
//! tuple that identifies it from the vendor's perspective. The sync engines
//! dedup and reconcile on these keys instead of surrogate ids. Entities
//! whose vendor key space is unreliable (sends, opens, clickthroughs,
//! transfers, consumer participants) use their full field tuple as the key.

pub mod campaign;
pub mod conversation;
pub mod product;

use std::hash::Hash;

pub use campaign::{Campaign, Clickthrough, MailingApproval, Open, Report, Segment, Send};
pub use conversation::{
    answer_score, decode_summary, ConsumerParticipant, Conversation, Interaction, Message,
    SummaryData, SummaryDecodeError, SummaryPayload, SurveyData, Transfer,
};
pub use product::Product;

/// Vendor-perspective identity for an entity type.
///
/// Returned keys are owned values so they can live in hash sets built from
/// rows that are dropped after the diff.
pub trait NaturalKey {
    type Key: Eq + Hash + std::marker::Send;

    fn natural_key(&self) -> Self::Key;
}
