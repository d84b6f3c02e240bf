use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{QueryError, Result};

/// Keyset position in the list ordering (`published_at DESC, place_id DESC`).
///
/// Rendered as URL-safe base64 JSON so it can travel in a query string untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    #[serde(rename = "p")]
    pub published_at: i64,
    #[serde(rename = "id")]
    pub place_id: u64,
}

impl PageCursor {
    pub fn new(published_at: i64, place_id: u64) -> Self {
        Self {
            published_at,
            place_id,
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|e| QueryError::InvalidCursor(format!("{raw}: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| QueryError::InvalidCursor(format!("{raw}: {e}")))
    }

    /// Row predicate selecting everything that sorts strictly after this position.
    pub fn rows_after(&self) -> Expr {
        col("published_at").lt(lit(self.published_at)).or(col("published_at")
            .eq(lit(self.published_at))
            .and(col("place_id").lt(lit(self.place_id))))
    }
}
