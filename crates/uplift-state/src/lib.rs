mod continuation;
mod store;

pub use continuation::{ContinuationRecord, CONTINUATION_SCHEMA};
pub use store::ContinuationStore;
