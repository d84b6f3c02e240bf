//! Process-wide search bounds.
//!
//! [`SearchConfig`] is built once at startup (from JSON or the [`SearchConfigBuilder`]),
//! validated, and shared as an `Arc` by every component. Nothing mutates it afterwards.
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use error::ConfigError;
use error::Result;

use crate::{
    filter::SearchMode,
    geo::{BoundingBox, CoordinateEnvelope},
};

/// How multiple requested tags combine when filtering places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatch {
    /// A place must carry every requested tag.
    #[default]
    All,
    /// A place must carry at least one requested tag.
    Any,
}

/// Order of operations when splitting a comma-joined tag string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagParseOrder {
    /// Drop empty tokens, then trim. A whitespace-only token survives as `""`.
    /// Matches URLs already persisted by earlier releases.
    #[default]
    FilterThenTrim,
    /// Trim, then drop empty tokens.
    TrimThenFilter,
}

/// Static bounds consumed by every exploration component.
///
/// # Examples
///
/// ```rust
/// use geoscout::{SearchConfig, SearchMode};
///
/// let config = SearchConfig::builder()
///     .radius_bounds(500, 50_000)
///     .radius_default(5_000)
///     .tags_max(5)
///     .build()?;
///
/// assert_eq!(config.radius_default, 5_000);
/// assert!(config.allows(&SearchMode::Worldwide));
/// # Ok::<(), geoscout::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Smallest accepted radius, in metres
    pub radius_min: i64,
    /// Largest accepted radius, in metres
    pub radius_max: i64,
    /// Radius used when none is given or the given one is rejected
    pub radius_default: i64,
    /// Increment offered by radius pickers
    pub radius_step: i64,
    pub allowed_modes: Vec<SearchMode>,
    pub default_mode: SearchMode,
    /// Maximum number of tags in one filter
    pub tags_max: usize,
    /// Default list page size
    pub items_per_page: usize,
    /// Hard cap on coordinates returned for a map
    pub max_map_coordinates: usize,
    /// Result cache lifetime; zero disables caching
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: u64,
    pub envelope: CoordinateEnvelope,
    pub default_bounding_box: BoundingBox,
    pub tag_match: TagMatch,
    pub tag_parse_order: TagParseOrder,
    /// Maximum number of hits for tag-name search
    pub tag_search_limit: usize,
    /// Characters kept from a description in list items
    pub excerpt_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let envelope = CoordinateEnvelope::default();
        Self {
            radius_min: 1_000,
            radius_max: 2_000_000,
            radius_default: 200_000,
            radius_step: 1_000,
            allowed_modes: vec![SearchMode::Proximity, SearchMode::Worldwide],
            default_mode: SearchMode::Proximity,
            tags_max: 10,
            items_per_page: 20,
            max_map_coordinates: 5_000,
            cache_ttl_seconds: 300,
            cache_max_entries: 10_000,
            envelope,
            default_bounding_box: envelope.as_bounding_box(),
            tag_match: TagMatch::default(),
            tag_parse_order: TagParseOrder::default(),
            tag_search_limit: 10,
            excerpt_length: 160,
        }
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = ?path, "Loading search configuration");
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    #[must_use]
    pub fn allows(&self, mode: &SearchMode) -> bool {
        mode.is_supported() && self.allowed_modes.contains(mode)
    }

    #[must_use]
    pub fn radius_in_bounds(&self, radius: i64) -> bool {
        (self.radius_min..=self.radius_max).contains(&radius)
    }

    /// Radius values offered by a picker, from `radius_min` to `radius_max` in `radius_step`s.
    pub fn radius_options(&self) -> impl Iterator<Item = i64> + '_ {
        (self.radius_min..=self.radius_max).step_by(self.radius_step.max(1) as usize)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(ConfigError::Invalid(msg)) };

        if self.radius_min < 0 || self.radius_min > self.radius_max {
            return invalid(format!(
                "radius bounds must satisfy 0 <= min <= max, got {}..{}",
                self.radius_min, self.radius_max
            ));
        }
        if !self.radius_in_bounds(self.radius_default) {
            return invalid(format!(
                "radius_default {} outside {}..={}",
                self.radius_default, self.radius_min, self.radius_max
            ));
        }
        if self.radius_step <= 0 {
            return invalid(format!("radius_step must be positive, got {}", self.radius_step));
        }
        if self.allowed_modes.is_empty() || self.allowed_modes.iter().any(|m| !m.is_supported()) {
            return invalid(format!(
                "allowed_modes must be a non-empty subset of proximity/worldwide, got {:?}",
                self.allowed_modes
            ));
        }
        if !self.allows(&self.default_mode) {
            return invalid(format!(
                "default_mode '{}' is not an allowed mode",
                self.default_mode
            ));
        }
        if self.tags_max == 0 || self.items_per_page == 0 || self.max_map_coordinates == 0 {
            return invalid(
                "tags_max, items_per_page and max_map_coordinates must be positive".to_string(),
            );
        }
        let env = &self.envelope;
        if !(env.lat_min < env.lat_max && env.lng_min < env.lng_max)
            || env.lat_min < -90.0
            || env.lat_max > 90.0
            || env.lng_min < -180.0
            || env.lng_max > 180.0
        {
            return invalid(format!("envelope {env:?} is not a valid lat/lng range"));
        }
        let bbox = &self.default_bounding_box;
        if bbox.south > bbox.north {
            return invalid(format!("default_bounding_box {bbox:?} has south above north"));
        }
        debug!("Search configuration validated");
        Ok(())
    }
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Preset for dense urban exploration (small radii, short pages, short cache)
    pub fn dense_city() -> Self {
        let mut builder = Self::new();
        builder.config.radius_min = 100;
        builder.config.radius_max = 50_000;
        builder.config.radius_default = 2_000;
        builder.config.radius_step = 100;
        builder.config.items_per_page = 12;
        builder.config.max_map_coordinates = 1_000;
        builder.config.cache_ttl_seconds = 60;
        builder
    }

    /// Preset for regional or continental exploration
    pub fn wide_area() -> Self {
        let mut builder = Self::new();
        builder.config.radius_min = 10_000;
        builder.config.radius_max = 5_000_000;
        builder.config.radius_default = 500_000;
        builder.config.radius_step = 10_000;
        builder.config.max_map_coordinates = 20_000;
        builder
    }

    pub fn radius_bounds(mut self, min: i64, max: i64) -> Self {
        self.config.radius_min = min;
        self.config.radius_max = max;
        self
    }

    pub fn radius_default(mut self, radius: i64) -> Self {
        self.config.radius_default = radius;
        self
    }

    pub fn radius_step(mut self, step: i64) -> Self {
        self.config.radius_step = step;
        self
    }

    pub fn allowed_modes(mut self, modes: impl IntoIterator<Item = SearchMode>) -> Self {
        self.config.allowed_modes = modes.into_iter().collect();
        self
    }

    pub fn default_mode(mut self, mode: SearchMode) -> Self {
        self.config.default_mode = mode;
        self
    }

    pub fn tags_max(mut self, max: usize) -> Self {
        self.config.tags_max = max;
        self
    }

    pub fn items_per_page(mut self, items: usize) -> Self {
        self.config.items_per_page = items;
        self
    }

    pub fn max_map_coordinates(mut self, cap: usize) -> Self {
        self.config.max_map_coordinates = cap;
        self
    }

    /// Set the result cache lifetime; `0` turns the cache off
    pub fn cache_ttl_seconds(mut self, ttl: u64) -> Self {
        self.config.cache_ttl_seconds = ttl;
        self
    }

    pub fn cache_max_entries(mut self, entries: u64) -> Self {
        self.config.cache_max_entries = entries;
        self
    }

    pub fn envelope(mut self, envelope: CoordinateEnvelope) -> Self {
        self.config.envelope = envelope;
        self
    }

    pub fn default_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.config.default_bounding_box = bbox;
        self
    }

    pub fn tag_match(mut self, tag_match: TagMatch) -> Self {
        self.config.tag_match = tag_match;
        self
    }

    pub fn tag_parse_order(mut self, order: TagParseOrder) -> Self {
        self.config.tag_parse_order = order;
        self
    }

    pub fn tag_search_limit(mut self, limit: usize) -> Self {
        self.config.tag_search_limit = limit;
        self
    }

    pub fn excerpt_length(mut self, chars: usize) -> Self {
        self.config.excerpt_length = chars;
        self
    }

    /// Validate and build the final configuration
    pub fn build(self) -> Result<SearchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum ConfigError {
        #[error("Invalid configuration: {0}")]
        Invalid(String),
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Configuration parse error: {0}")]
        Parse(#[from] serde_json::Error),
    }
    pub type Result<T> = std::result::Result<T, ConfigError>;
}
