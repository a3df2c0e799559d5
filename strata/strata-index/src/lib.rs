//! External object index for the Strata platform.
//!
//! Answers "which nodes, in which repositories, reference this external
//! object?" without walking graphs. Index builds extract validated references
//! from scanned dependency graphs into a durable store; lookups read through
//! a two-tier cache (in-process L1, shared L2) in front of it.
//!
//! Storage and the shared cache sit behind traits from `strata-core`, with
//! in-memory implementations here for tests and single-node use.

pub mod cache;
pub mod engine;
pub mod mapper;
pub mod memory;
pub mod service;

pub use cache::{CacheStats, ExternalObjectCache};
pub use engine::{detect_reference_type, ExtractionReport, IndexEngine, InvalidReference};
pub use mapper::{EntryMapper, ExternalObjectRecord};
pub use memory::{InMemoryGraphProvider, InMemoryObjectStore, InMemorySharedCache};
pub use service::{BuildReport, ExternalObjectIndexService, LookupOutcome};
