mod item;
mod job;
mod source;

pub use item::{content_fingerprint, CollectedItem};
pub use job::{Job, JobStatus};
pub use source::Source;
