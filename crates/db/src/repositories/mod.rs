//! Repository abstractions for data access.
//!
//! One repository per entity, per the explicit-repository design: each
//! method sets whatever tenant/transaction context it needs internally.

pub mod account;
pub mod journal;
pub mod outbox;
pub mod recon;
pub mod rule;

pub use account::AccountRepository;
pub use journal::JournalRepository;
pub use outbox::{OutboxCounts, OutboxRepository};
pub use recon::ReconRepository;
pub use rule::{RuleRepository, RuleStoreError};
