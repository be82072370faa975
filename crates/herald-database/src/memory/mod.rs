//! In-process stores backed by `tokio::sync::RwLock<HashMap<..>>`.
//!
//! Used by the `memory` provider and as fixtures in tests. Semantics match
//! the PostgreSQL stores, including compare-and-set state transitions.

mod delivery;
mod notification;
mod preference;

pub use delivery::MemoryDeliveryStore;
pub use notification::MemoryNotificationStore;
pub use preference::MemoryPreferenceStore;

use herald_core::types::{PageRequest, PageResponse};
use serde::Serialize;

/// Slice an already ordered collection into a page.
fn paginate<T: Serialize>(items: Vec<T>, page: PageRequest) -> PageResponse<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    PageResponse::new(items, page, total)
}
