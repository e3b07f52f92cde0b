//! Session finalization
//!
//! The end-of-session step: hand the accumulated transcript to the
//! external summarization service, replay any newly detected intents
//! through the action detector (confirmation still required), persist one
//! `ConversationRecord`, and return its durable identifier.

mod closer;
mod store;
mod summarizer;

pub use closer::{FinalizeInput, FinalizeOutcome, SessionCloser};
pub use store::{ConversationRecord, ConversationStore, MemoryStore};
pub use summarizer::{
    DetectedIntents, FollowupIntent, LabOrderIntent, SummarizerClient, SummaryResponse,
    VisitSummary,
};
