//! Catch-all for unmatched paths.

use crate::error::AppError;

/// Any path no route claims.
pub async fn not_found_handler() -> AppError {
    AppError::NotFound
}
