//! Custom Axum extractors.

pub mod pagination;
pub mod recipient;
pub mod validated;

pub use pagination::PaginationParams;
pub use recipient::{CallerRecipient, RECIPIENT_ID_HEADER, RECIPIENT_TYPE_HEADER};
pub use validated::ValidatedJson;
