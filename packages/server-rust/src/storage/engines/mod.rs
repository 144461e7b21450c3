//! `DocumentEngine` implementations.
//!
//! Currently includes [`HashMapEngine`], the in-memory default.

mod hashmap;

pub use hashmap::HashMapEngine;
