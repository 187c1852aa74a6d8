//! Evidence corpus: fragments, candidates and the read-only store.
//!
//! ```ascii
//! Vec<EvidenceFragment> ──► EvidenceStore::new ──► Arc<[fragment]> + Arc<[tokens]>
//!                              │
//!                              └─ rejects duplicate fragment ids
//! ```

mod fragment;
mod store;

pub use fragment::{CandidateScore, EvidenceFragment};
pub use store::{tokenize, EvidenceStore};
