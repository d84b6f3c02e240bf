//! The [`PlaceExplorer`] facade wiring every component together.
//!
//! A request flows through the explorer as: raw parameters → [`FilterModel`] →
//! [`FilterValidator`] (Strict or Corrective) → [`ExplorationService`] → map or list result.
//!
//! ```rust
//! use geoscout::{Locale, PlaceExplorer, ValidationStrategy};
//!
//! let explorer = PlaceExplorer::new_sample()?;
//! let filters = explorer.parse_filters([("mode", "worldwide"), ("tags", "observatory")]);
//! let en: Locale = "en".parse()?;
//!
//! let map = explorer.map(&filters, &en, ValidationStrategy::Corrective, None)?;
//! assert_eq!(map.result.count, 4);
//! # Ok::<(), geoscout::error::GeoScoutError>(())
//! ```
use std::{path::PathBuf, sync::Arc, time::Instant};

use geoscout_data::PlaceStoreData;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    config::SearchConfig,
    error::Result,
    exploration::ExplorationService,
    filter::FilterModel,
    geo::BoundingBox,
    locale::Locale,
    query::{ListResult, MapResult},
    tags::{FrameTagCatalog, TagCatalog, TagResolver},
    validation::{FilterValidator, ValidationResult, ValidationStrategy},
};

/// A query result together with the validation that shaped its filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explored<T> {
    pub validation: ValidationResult,
    pub result: T,
}

/// Validated access to map and list exploration over one place store.
#[derive(Debug, Clone)]
pub struct PlaceExplorer {
    config: Arc<SearchConfig>,
    tags: TagResolver,
    validator: FilterValidator,
    service: ExplorationService,
}

impl PlaceExplorer {
    pub fn builder() -> PlaceExplorerBuilder {
        PlaceExplorerBuilder::default()
    }

    /// Explorer over the built-in sample store with the default configuration.
    #[instrument(name = "Create PlaceExplorer with sample data", level = "info")]
    pub fn new_sample() -> Result<Self> {
        Self::builder()
            .store(geoscout_data::sample::sample_store()?)
            .build()
    }

    /// Explorer over a directory of Parquet tables.
    pub fn from_parquet_dir(dir: impl Into<PathBuf>, config: SearchConfig) -> Result<Self> {
        Self::builder()
            .store(PlaceStoreData::from_parquet_dir(dir))
            .config(config)
            .build()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn tags(&self) -> &TagResolver {
        &self.tags
    }

    pub fn validator(&self) -> &FilterValidator {
        &self.validator
    }

    pub fn service(&self) -> &ExplorationService {
        &self.service
    }

    pub fn parse_filters<I, K, V>(&self, pairs: I) -> FilterModel
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.service.filters_from_query_pairs(pairs)
    }

    /// Validate `filters`, then fetch map coordinates for the corrected filters.
    pub fn map(
        &self,
        filters: &FilterModel,
        locale: &Locale,
        strategy: ValidationStrategy,
        bbox: Option<&BoundingBox>,
    ) -> Result<Explored<MapResult>> {
        let validation = self.validator.validate(filters, locale, strategy)?;
        let result = self
            .service
            .places_for_map(&validation.corrected_filters, locale, bbox)?;
        Ok(Explored { validation, result })
    }

    /// Validate `filters`, then fetch one list page for the corrected filters.
    pub fn list(
        &self,
        filters: &FilterModel,
        locale: &Locale,
        strategy: ValidationStrategy,
        bbox: &BoundingBox,
        page_size: Option<usize>,
    ) -> Result<Explored<ListResult>> {
        let validation = self.validator.validate(filters, locale, strategy)?;
        let result = self.service.places_for_list(
            &validation.corrected_filters,
            locale,
            bbox,
            page_size,
            None,
        )?;
        Ok(Explored { validation, result })
    }
}

/// Builder for [`PlaceExplorer`].
#[derive(Default)]
pub struct PlaceExplorerBuilder {
    config: Option<SearchConfig>,
    store: Option<PlaceStoreData>,
    catalog: Option<Arc<dyn TagCatalog>>,
}

impl PlaceExplorerBuilder {
    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn store(mut self, store: PlaceStoreData) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a tag catalog other than the store's `tags` table.
    pub fn tag_catalog(mut self, catalog: Arc<dyn TagCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Validate the configuration and assemble the explorer.
    ///
    /// Without an explicit store, tables are read from [`geoscout_data::DATA_DIR`].
    pub fn build(self) -> Result<PlaceExplorer> {
        let t_init = Instant::now();
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let config = Arc::new(config);

        let store = self.store.unwrap_or_else(PlaceStoreData::from_default_dir);
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(FrameTagCatalog::new(store.clone())));
        let tags = TagResolver::new(catalog, config.clone());
        let validator = FilterValidator::new(config.clone(), tags.clone());
        let service = ExplorationService::from_store(store, config.clone());

        info!(elapsed = ?t_init.elapsed(), "PlaceExplorer ready");
        Ok(PlaceExplorer {
            config,
            tags,
            validator,
            service,
        })
    }
}
