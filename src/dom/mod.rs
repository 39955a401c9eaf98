pub mod classifier;
pub mod element;
pub mod processor;
pub mod roles;
pub mod snapshot;

pub use classifier::{classify_page, ClassifyRequest, ClassifyResponse};
pub use element::ElementCandidate;
pub use processor::DomProcessor;
pub use snapshot::{Snapshot, SnapshotElement, Verbosity};
