//! Mind-map persistence seam.
//!
//! The migration engine never talks to a concrete backend: it consumes the
//! [`MindMapStore`] trait as `Arc<dyn MindMapStore>`. The [`memory`] backend
//! implements it over in-process maps, with failure injection for exercising
//! the engine's rollback and error-absorption paths.

pub mod memory;
pub mod models;
pub mod traits;

// Re-export primary types for convenience
pub use memory::MemoryMapStore;
pub use models::{CandidateFilter, MapContent, MigrationUpdate, MindMapRecord};
pub use traits::MindMapStore;
