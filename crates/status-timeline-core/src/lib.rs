//! # Status Timeline Core
//!
//! Storage-agnostic logic for Status Timeline: revision models, category
//! extraction, status canonicalization, the corpus snapshot engine, the
//! timeline builder, and the historical backfill.
//!
//! This crate contains no tokio, sqlx, network, or filesystem
//! dependencies. Persistence goes through the [`store::Store`] trait;
//! [`store::memory::InMemoryStore`] backs the tests.
//!
//! ## Data Flow
//!
//! ```text
//! Revision text ──▶ extract ──▶ status ──▶ CategoryFact (rev, label)
//!                                                │
//!           revision stamps ─────────────────────┤
//!                                                ▼
//!                                  snapshot::RevisionIndex
//!                                      │              │
//!                                      ▼              ▼
//!                                  timeline        backfill
//! ```

pub mod backfill;
pub mod error;
pub mod extract;
pub mod models;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod timeline;

pub use error::TimelineError;
pub use status::CanonicalStatus;
