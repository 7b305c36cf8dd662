//! Ranking subsystem.
//!
//! # Data Flow
//! ```text
//! Registration / classifier results
//!     → TableUpdate (mpsc channel from probe cycles)
//!     → publisher.rs (batch)
//!     → table.rs (apply batch, rebuild, ArcSwap store)
//!     → snapshot.rs (immutable, sorted by ranking key then tag)
//!     → selector and query readers
//! ```
//!
//! # Design Decisions
//! - Snapshots are replaced wholesale, never mutated
//! - Readers load an Arc and never wait for a rebuild
//! - The only lock covers one batch apply plus the publish step

pub mod publisher;
pub mod snapshot;
pub mod table;

pub use snapshot::{Availability, CandidateStatus, RankingSnapshot};
pub use table::{RankingTable, TableUpdate};
