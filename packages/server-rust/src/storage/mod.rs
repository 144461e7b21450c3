//! In-process document storage.
//!
//! Two layers:
//!
//! - **Engine** ([`DocumentEngine`]): synchronous id → document map
//! - **Collections** ([`MemoryCollections`]): named collections with live
//!   schemas, id assignment, and create/update/upsert/delete semantics,
//!   exposed through [`RecordCollection`](crate::traits::RecordCollection)

pub mod collections;
pub mod engine;
pub mod engines;
pub mod record;

pub use collections::{read_schema_file, MemoryCollections};
pub use engine::DocumentEngine;
pub use engines::HashMapEngine;
pub use record::{DocumentMetadata, StoredDocument};
