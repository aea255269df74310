//! # Narrative Context
//!
//! Turns the World Bible and a scene request into one deterministic,
//! budget-constrained prompt document for a language model.
//!
//! ## Core Components
//!
//! - **fields**: Field configuration, path selection, detection and validation
//! - **dedup**: Removal of ancestor paths and value-identical paths
//! - **extract**: Labeled value extraction at field paths
//! - **organizer**: Default, narrative and minimal grouping strategies
//! - **tree**: Sections -> categories -> items -> subsections
//! - **serializer**: Flat text and tag tree renderings of the tree
//! - **truncator**: Token costs and budget truncation
//! - **builder**: Context construction from a selection request
//! - **context_assembler**: Prompt sections, rendering, validation and hashing
//! - **engine**: The façade tying loading, building and assembly together
//!
//! ## Pipeline
//!
//! ```text
//! selection -> entities -> field paths -> dedup -> extract -> organize
//!           -> tree -> serialize -> fit budget -> assemble -> validate
//! ```
//!
//! Per-item problems (missing entity, unknown field, unreadable file) are
//! logged and skipped. The only terminal error of a build is a rendered
//! markup document that fails validation.

pub mod builder;
pub mod context_assembler;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fields;
pub mod guides;
pub mod logging;
pub mod markup;
pub mod organizer;
pub mod serializer;
pub mod settings;
pub mod text;
pub mod tree;
pub mod truncator;

pub use builder::*;
pub use context_assembler::*;
pub use dedup::*;
pub use engine::*;
pub use error::{ContextError, MarkupDiagnostic};
pub use extract::*;
pub use fields::*;
pub use guides::*;
pub use logging::*;
pub use markup::*;
pub use organizer::*;
pub use serializer::*;
pub use settings::*;
pub use tree::*;
pub use truncator::*;
