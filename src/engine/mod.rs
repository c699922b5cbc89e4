// Pure data model and change detection; nothing here does I/O
pub mod types;
pub mod diff;

pub use diff::diff;
pub use types::{CanonicalRecord, ChangeEvent, Percentage, Snapshot};
