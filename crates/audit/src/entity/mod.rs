//! SeaORM entities for the audit tables

pub mod revision_seq;
pub mod revisions;
pub mod snapshots;

// Re-export entities for convenience
pub use revision_seq::Entity as RevisionSeq;
pub use revisions::Entity as Revisions;
pub use snapshots::Entity as Snapshots;
