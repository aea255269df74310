//! # World Bible
//!
//! The knowledge-base crate: the game design document (characters,
//! locations, items, species, communities, quests, narrative structures,
//! dialogue examples and the vision document) loaded into an immutable
//! snapshot and exposed through name-indexed lookups.
//!
//! ## Core Components
//!
//! - **value**: Untyped entity records and dotted field paths
//! - **category**: Category keys, element types, labels and display priority
//! - **snapshot**: Immutable snapshot, file loader and parsed-file cache
//! - **repository**: Lookups by normalized name
//! - **linker**: Relationship closures found by name matching
//!
//! This crate holds no prompt or rendering logic.

pub mod category;
pub mod entities;
pub mod error;
pub mod linker;
pub mod repository;
pub mod snapshot;
pub mod value;

pub use category::*;
pub use entities::*;
pub use error::LoadError;
pub use linker::*;
pub use repository::*;
pub use snapshot::*;
pub use value::*;
