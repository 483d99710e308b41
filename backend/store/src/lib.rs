pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::InMemoryStore;
pub use sqlite_store::SqliteStore;

use dprscope_core::{DprError, DprRecord, DprStatus};
use uuid::Uuid;

/// Error for a terminal transition attempted on a record that already left `processing`.
pub(crate) fn already_finalized(id: Uuid, status: DprStatus) -> DprError {
    DprError::InvalidInput(format!("record {id} is already {status}"))
}

pub(crate) fn not_found(id: Uuid) -> DprError {
    DprError::NotFound(format!("DPR record {id}"))
}

/// Records are listed newest first; ties fall back to id for a stable order.
pub(crate) fn newest_first(a: &DprRecord, b: &DprRecord) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
}
