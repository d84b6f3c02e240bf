use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use once_cell::sync::OnceCell;
use polars::prelude::*;
use tracing::{debug, info, instrument};

use crate::error::{DataError, Result};

/// The four tables making up a place store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    Places,
    PlaceTranslations,
    Tags,
    PlaceTags,
}

impl StoreTable {
    pub const ALL: [Self; 4] = [
        Self::Places,
        Self::PlaceTranslations,
        Self::Tags,
        Self::PlaceTags,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Places => "places",
            Self::PlaceTranslations => "place_translations",
            Self::Tags => "tags",
            Self::PlaceTags => "place_tags",
        }
    }

    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.parquet", self.name())
    }

    /// Columns every frame of this table must carry, with their expected types.
    #[must_use]
    pub fn columns(self) -> Vec<(&'static str, DataType)> {
        match self {
            Self::Places => vec![
                ("place_id", DataType::UInt64),
                ("latitude", DataType::Float64),
                ("longitude", DataType::Float64),
                ("published_at", DataType::Int64),
                ("photo", DataType::String),
            ],
            Self::PlaceTranslations => vec![
                ("place_id", DataType::UInt64),
                ("locale", DataType::String),
                ("title", DataType::String),
                ("description", DataType::String),
                ("published", DataType::Boolean),
            ],
            Self::Tags => vec![
                ("tag_id", DataType::UInt64),
                ("locale", DataType::String),
                ("slug", DataType::String),
                ("name", DataType::String),
            ],
            Self::PlaceTags => vec![("place_id", DataType::UInt64), ("tag_id", DataType::UInt64)],
        }
    }

    fn sort_key(self) -> &'static str {
        match self {
            Self::Places | Self::PlaceTranslations | Self::PlaceTags => "place_id",
            Self::Tags => "tag_id",
        }
    }
}

impl fmt::Display for StoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lazily loaded handle over the place store tables.
///
/// Parquet-backed stores read each table into memory the first time it is requested
/// and hand out cheap [`LazyFrame`] clones afterwards. Clones of a store share its loaded
/// tables, so each table is read at most once.
#[derive(Clone)]
pub struct PlaceStoreData {
    dir: Option<PathBuf>,
    places: Arc<OnceCell<LazyFrame>>,
    place_translations: Arc<OnceCell<LazyFrame>>,
    tags: Arc<OnceCell<LazyFrame>>,
    place_tags: Arc<OnceCell<LazyFrame>>,
}

impl fmt::Debug for PlaceStoreData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceStoreData")
            .field("dir", &self.dir)
            .field("places_loaded", &self.is_loaded(StoreTable::Places))
            .field("tags_loaded", &self.is_loaded(StoreTable::Tags))
            .finish_non_exhaustive()
    }
}

impl PlaceStoreData {
    /// Point the store at a directory holding one Parquet file per table.
    ///
    /// Nothing is read until a table is first requested.
    pub fn from_parquet_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!(path = ?dir, "PlaceStoreData: using Parquet directory");
        Self {
            dir: Some(dir),
            places: Arc::default(),
            place_tags: Arc::default(),
            place_translations: Arc::default(),
            tags: Arc::default(),
        }
    }

    /// Store rooted at [`crate::DATA_DIR`].
    pub fn from_default_dir() -> Self {
        Self::from_parquet_dir(crate::DATA_DIR.clone())
    }

    /// Build a store from frames already in memory, checking every table's columns.
    pub fn from_frames(
        places: DataFrame,
        place_translations: DataFrame,
        tags: DataFrame,
        place_tags: DataFrame,
    ) -> Result<Self> {
        check_columns(StoreTable::Places, &places)?;
        check_columns(StoreTable::PlaceTranslations, &place_translations)?;
        check_columns(StoreTable::Tags, &tags)?;
        check_columns(StoreTable::PlaceTags, &place_tags)?;
        debug!(
            places = places.height(),
            translations = place_translations.height(),
            tags = tags.height(),
            "PlaceStoreData: using in-memory frames"
        );

        Ok(Self {
            dir: None,
            places: Arc::new(OnceCell::with_value(places.lazy())),
            place_translations: Arc::new(OnceCell::with_value(place_translations.lazy())),
            tags: Arc::new(OnceCell::with_value(tags.lazy())),
            place_tags: Arc::new(OnceCell::with_value(place_tags.lazy())),
        })
    }

    pub fn places(&self) -> Result<LazyFrame> {
        self.table(StoreTable::Places)
    }

    pub fn place_translations(&self) -> Result<LazyFrame> {
        self.table(StoreTable::PlaceTranslations)
    }

    pub fn tags(&self) -> Result<LazyFrame> {
        self.table(StoreTable::Tags)
    }

    pub fn place_tags(&self) -> Result<LazyFrame> {
        self.table(StoreTable::PlaceTags)
    }

    pub fn table(&self, table: StoreTable) -> Result<LazyFrame> {
        self.cell(table)
            .get_or_try_init(|| self.load(table))
            .cloned()
    }

    /// Whether `table` is already in memory.
    #[must_use]
    pub fn is_loaded(&self, table: StoreTable) -> bool {
        self.cell(table).get().is_some()
    }

    /// Write every table to `dir` as Parquet, sorted by its key column.
    #[instrument(name = "Write place store", level = "info", skip(self))]
    pub fn write_parquet_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        for table in StoreTable::ALL {
            let sink_time = std::time::Instant::now();
            let mut df = self
                .table(table)?
                .sort([table.sort_key()], SortMultipleOptions::default())
                .collect()?;
            let path = dir.join(table.file_name());
            let mut file = std::fs::File::create(&path)?;
            ParquetWriter::new(&mut file).finish(&mut df)?;
            info!(
                table = table.name(),
                rows = df.height(),
                sink_time = ?sink_time.elapsed(),
                "Saved table to parquet"
            );
        }
        Ok(())
    }

    fn cell(&self, table: StoreTable) -> &OnceCell<LazyFrame> {
        match table {
            StoreTable::Places => &*self.places,
            StoreTable::PlaceTranslations => &*self.place_translations,
            StoreTable::Tags => &*self.tags,
            StoreTable::PlaceTags => &*self.place_tags,
        }
    }

    fn load(&self, table: StoreTable) -> Result<LazyFrame> {
        let path = self
            .dir
            .as_ref()
            .map(|dir| dir.join(table.file_name()))
            .unwrap_or_default();
        if !path.exists() {
            return Err(DataError::MissingTable {
                table: table.name(),
                path,
            });
        }

        info!(
            table = table.name(),
            "Loading and collecting into memory for the first time..."
        );
        let t_load = std::time::Instant::now();
        let df = LazyFrame::scan_parquet(&path, Default::default())?.collect()?;
        check_columns(table, &df)?;
        info!(
            table = table.name(),
            rows = df.height(),
            load_time = ?t_load.elapsed(),
            "Table loaded"
        );
        Ok(df.lazy())
    }
}

fn check_columns(table: StoreTable, df: &DataFrame) -> Result<()> {
    for (column, expected) in table.columns() {
        let found = df
            .column(column)
            .map_err(|_| DataError::MissingColumn {
                table: table.name(),
                column,
            })?
            .dtype();
        if found != &expected {
            return Err(DataError::ColumnType {
                table: table.name(),
                column,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }
    Ok(())
}
