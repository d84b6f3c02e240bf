//! Locale-aware tag resolution.
//!
//! A tag's slug is specific to a locale: the same concept is `observatory` in English and
//! `observatoire` in French, linked only through a shared identity owned by the catalog.
//! [`TagResolver`] wraps a [`TagCatalog`] and adds ordering, deduplication and limit
//! guarantees on top of it.
use std::sync::Arc;

use ahash::AHashSet as HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

mod catalog;

pub use catalog::FrameTagCatalog;
pub use error::TagError;
use error::Result;

use crate::{
    config::{SearchConfig, TagParseOrder},
    filter::FilterModel,
    locale::Locale,
};

/// A tag as shown to users in one locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub slug: String,
    pub name: String,
}

/// Source of tag data. Implementations only need to honour the set semantics;
/// ordering and caps are enforced by [`TagResolver`].
pub trait TagCatalog: Send + Sync {
    /// Every tag available in `locale`, sorted by name.
    fn list_for_locale(&self, locale: &Locale) -> Result<Vec<Tag>>;

    /// Tags in `locale` whose name contains `query`, ignoring case.
    fn search_by_name(&self, query: &str, locale: &Locale, limit: usize) -> Result<Vec<Tag>>;

    /// The subset of `slugs` that exists in `locale`.
    fn validate_slugs(&self, slugs: &[String], locale: &Locale) -> Result<Vec<String>>;

    /// Counterparts in `to` of the `slugs` known in `from`. Slugs without one are absent.
    fn translate_slugs(&self, slugs: &[String], from: &Locale, to: &Locale)
    -> Result<Vec<String>>;
}

/// Clean raw tag tokens according to `order`.
///
/// With [`TagParseOrder::FilterThenTrim`] a whitespace-only token survives as `""`.
pub fn clean_tag_tokens<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
    order: TagParseOrder,
) -> Vec<String> {
    match order {
        TagParseOrder::FilterThenTrim => tokens
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.trim().to_string())
            .collect(),
        TagParseOrder::TrimThenFilter => tokens
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string)
            .collect(),
    }
}

/// Split a comma-joined tag string.
pub fn parse_tag_csv(raw: &str, order: TagParseOrder) -> Vec<String> {
    clean_tag_tokens(raw.split(','), order)
}

/// Join tags into their URL form.
pub fn build_tag_csv(tags: &[String]) -> String {
    tags.join(",")
}

/// Drop repeated slugs, keeping the first occurrence.
pub(crate) fn dedup_preserving_order(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tags.len());
    tags.iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// Resolves tag slugs within a locale and across locale changes.
#[derive(Clone)]
pub struct TagResolver {
    catalog: Arc<dyn TagCatalog>,
    config: Arc<SearchConfig>,
}

impl std::fmt::Debug for TagResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagResolver")
            .field("tag_search_limit", &self.config.tag_search_limit)
            .finish_non_exhaustive()
    }
}

impl TagResolver {
    pub fn new(catalog: Arc<dyn TagCatalog>, config: Arc<SearchConfig>) -> Self {
        Self { catalog, config }
    }

    pub fn list_for_locale(&self, locale: &Locale) -> Result<Vec<Tag>> {
        self.catalog.list_for_locale(locale)
    }

    /// Case-insensitive name search, capped at `tag_search_limit`. A blank query finds nothing.
    #[instrument(name = "Tag search", level = "debug", skip(self))]
    pub fn search_by_name(&self, query: &str, locale: &Locale) -> Result<Vec<Tag>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.config.tag_search_limit;
        let mut hits = self.catalog.search_by_name(query, locale, limit)?;
        hits.truncate(limit);
        debug!(hits = hits.len(), "Tag search complete");
        Ok(hits)
    }

    /// Keep only the slugs that exist in `locale`, in input order, without repeats.
    #[instrument(name = "Validate tags", level = "debug", skip(self, slugs), fields(requested = slugs.len()))]
    pub fn validate_slugs(&self, slugs: &[String], locale: &Locale) -> Result<Vec<String>> {
        let candidates: Vec<String> = dedup_preserving_order(slugs)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let known: HashSet<String> = self
            .catalog
            .validate_slugs(&candidates, locale)?
            .into_iter()
            .collect();
        let valid: Vec<String> = candidates
            .into_iter()
            .filter(|s| known.contains(s))
            .collect();
        debug!(valid = valid.len(), "Tag validation complete");
        Ok(valid)
    }

    /// Translate slugs from one locale to another, dropping those without a counterpart.
    ///
    /// Not reversible in general: a slug dropped on the way out cannot come back.
    #[instrument(name = "Translate tags", level = "debug", skip(self, slugs))]
    pub fn translate_slugs(
        &self,
        slugs: &[String],
        from: &Locale,
        to: &Locale,
    ) -> Result<Vec<String>> {
        if from == to {
            return self.validate_slugs(slugs, from);
        }
        let candidates: Vec<String> = dedup_preserving_order(slugs)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let translated = self.catalog.translate_slugs(&candidates, from, to)?;
        let translated = dedup_preserving_order(&translated);
        if translated.len() < candidates.len() {
            debug!(
                dropped = candidates.len() - translated.len(),
                "Some tags have no counterpart in the target locale"
            );
        }
        Ok(translated)
    }

    /// Parse the comma-joined URL representation using the configured parse order.
    pub fn parse_csv(&self, raw: &str) -> Vec<String> {
        parse_tag_csv(raw, self.config.tag_parse_order)
    }

    pub fn build_csv(&self, tags: &[String]) -> String {
        build_tag_csv(tags)
    }

    /// Rewrite a filter's tags for a locale switch. Everything else is left untouched.
    pub fn relocalize(&self, filters: &FilterModel, from: &Locale, to: &Locale) -> Result<FilterModel> {
        let tags = self.translate_slugs(&filters.tags, from, to)?;
        Ok(FilterModel {
            tags,
            ..filters.clone()
        })
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum TagError {
        #[error("DataFrame error: {0}")]
        DataFrame(#[from] polars::prelude::PolarsError),
        #[error("Data error: {0}")]
        Data(#[from] geoscout_data::DataError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, TagError>;
}
