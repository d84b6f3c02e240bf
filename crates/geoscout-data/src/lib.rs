//! Place store data layer for geoscout.
//!
//! The exploration engine reads four tables, each exposed as a Polars [`LazyFrame`]:
//!
//! | table | columns |
//! |---|---|
//! | `places` | `place_id`, `latitude`, `longitude`, `published_at`, `photo` |
//! | `place_translations` | `place_id`, `locale`, `title`, `description`, `published` |
//! | `tags` | `tag_id`, `locale`, `slug`, `name` |
//! | `place_tags` | `place_id`, `tag_id` |
//!
//! Tables are either loaded from a directory of Parquet files or handed over as
//! in-memory frames. [`sample`] builds a small, deterministic store used by tests and docs.
//!
//! [`LazyFrame`]: polars::prelude::LazyFrame
use std::path::PathBuf;

use once_cell::sync::Lazy;

pub mod sample;
mod store;

pub const DATA_DIR_DEFAULT: &str = "./geoscout_data";

/// Directory the store is loaded from when no explicit path is given.
///
/// Reads `GEOSCOUT_DATA_DIR`, falling back to [`DATA_DIR_DEFAULT`].
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let dir =
        std::env::var("GEOSCOUT_DATA_DIR").unwrap_or_else(|_| DATA_DIR_DEFAULT.to_string());
    PathBuf::from(dir)
});

mod error {
    use std::path::PathBuf;

    use polars::prelude::PolarsError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Table '{table}' is missing required file {path}")]
        MissingTable { table: &'static str, path: PathBuf },
        #[error("Table '{table}' is missing column '{column}'")]
        MissingColumn {
            table: &'static str,
            column: &'static str,
        },
        #[error("Column '{table}.{column}' has type {found}, expected {expected}")]
        ColumnType {
            table: &'static str,
            column: &'static str,
            expected: String,
            found: String,
        },
        #[error("Invalid timestamp '{0}': {1}")]
        Timestamp(String, chrono::ParseError),
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use error::{DataError, Result};
pub use store::{PlaceStoreData, StoreTable};
