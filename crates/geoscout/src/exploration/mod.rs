//! The two entry points used by the map and list views.
//!
//! [`ExplorationService`] trusts that its filters were already run through
//! [`crate::FilterValidator`]; it only shapes them for querying, delegates to the
//! [`GeoQueryEngine`], and turns any lower-level failure into one retrieval error.
use std::sync::Arc;

use geoscout_data::PlaceStoreData;
use tracing::{debug, instrument};

mod cache;

use cache::{QuerySignature, ResultCache};
pub use error::ExplorationError;
use error::Result;

use crate::{
    config::SearchConfig,
    filter::FilterModel,
    geo::BoundingBox,
    locale::Locale,
    query::{GeoQueryEngine, ListResult, MapResult},
};

#[derive(Debug, Clone)]
pub struct ExplorationService {
    engine: GeoQueryEngine,
    config: Arc<SearchConfig>,
    cache: Option<ResultCache>,
}

impl ExplorationService {
    pub fn new(engine: GeoQueryEngine, config: Arc<SearchConfig>) -> Self {
        let cache = ResultCache::new(config.cache_max_entries, config.cache_ttl_seconds);
        debug!(
            cache_enabled = cache.is_some(),
            ttl = config.cache_ttl_seconds,
            "Created exploration service"
        );
        Self {
            engine,
            config,
            cache,
        }
    }

    pub fn from_store(store: PlaceStoreData, config: Arc<SearchConfig>) -> Self {
        Self::new(GeoQueryEngine::new(store, config.clone()), config)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Build filters from decoded URL query pairs using this service's configuration.
    pub fn filters_from_query_pairs<I, K, V>(&self, pairs: I) -> FilterModel
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        FilterModel::from_query_pairs(pairs, &self.config)
    }

    /// Page size actually used for a requested one.
    #[must_use]
    pub fn effective_page_size(&self, requested: Option<usize>) -> usize {
        let max = self.config.items_per_page.saturating_mul(5).max(1);
        requested.unwrap_or(self.config.items_per_page).clamp(1, max)
    }

    /// Coordinates for the map view.
    #[instrument(name = "Places for map", level = "info", skip_all, fields(locale = %locale))]
    pub fn places_for_map(
        &self,
        filters: &FilterModel,
        locale: &Locale,
        bbox: Option<&BoundingBox>,
    ) -> Result<MapResult> {
        let filters = filters.normalized();
        let key = QuerySignature::map(&filters, locale, bbox);
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.map(&key)) {
            debug!(count = hit.count, "Map result served from cache");
            return Ok(hit);
        }

        let result = self
            .engine
            .places_for_map(&filters, locale, bbox)
            .map_err(|source| ExplorationError::Retrieval {
                operation: "map",
                source,
            })?;
        debug!(count = result.count, truncated = result.truncated, "Map result ready");
        if let Some(cache) = &self.cache {
            cache.insert_map(key, result.clone());
        }
        Ok(result)
    }

    /// One page for the list view.
    ///
    /// `page_size` defaults to `items_per_page` and is clamped to `1..=items_per_page * 5`.
    /// An explicit `cursor` wins over the one carried by `filters`.
    #[instrument(name = "Places for list", level = "info", skip_all, fields(locale = %locale))]
    pub fn places_for_list(
        &self,
        filters: &FilterModel,
        locale: &Locale,
        bbox: &BoundingBox,
        page_size: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<ListResult> {
        let filters = filters.normalized();
        let page_size = self.effective_page_size(page_size);
        let cursor = cursor.or(filters.cursor.as_deref());
        let key = QuerySignature::list(&filters, locale, bbox, page_size, cursor);
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.list(&key)) {
            debug!(items = hit.items.len(), "List page served from cache");
            return Ok(hit);
        }

        let result = self
            .engine
            .places_for_list(&filters, locale, bbox, page_size, cursor)
            .map_err(|source| ExplorationError::Retrieval {
                operation: "list",
                source,
            })?;
        if let Some(cache) = &self.cache {
            cache.insert_list(key, result.clone());
        }
        Ok(result)
    }
}

mod error {
    use thiserror::Error;

    use crate::query::QueryError;

    #[derive(Error, Debug)]
    pub enum ExplorationError {
        #[error("Failed to retrieve places for {operation}: {source}")]
        Retrieval {
            operation: &'static str,
            #[source]
            source: QueryError,
        },
    }

    impl ExplorationError {
        /// The lower-level failure behind this error.
        pub fn query_error(&self) -> &QueryError {
            match self {
                Self::Retrieval { source, .. } => source,
            }
        }
    }

    pub type Result<T> = std::result::Result<T, ExplorationError>;
}
