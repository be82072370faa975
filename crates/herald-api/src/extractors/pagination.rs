//! Pagination query parameter extractor.

use serde::{Deserialize, Serialize};

use herald_core::types::PageRequest;

/// Query parameters for paginated endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Items per page (default: 25, max: 100).
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Items to skip.
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    25
}

impl PaginationParams {
    /// Converts to a clamped `PageRequest`.
    pub fn into_page_request(self) -> PageRequest {
        PageRequest::new(self.limit, self.offset)
    }
}
