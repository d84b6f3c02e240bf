//! GeoScout - Place Exploration Search Engine
//!
//! GeoScout finds geographically tagged points of interest either around a coordinate
//! (proximity) or across the whole world, filtered by locale-specific category tags. Results
//! come in two shapes: a lightweight coordinate set for map rendering and a cursor-paginated,
//! localized list for infinite scroll.
//!
//! # Quick Start
//!
//! ```rust
//! use geoscout::{Locale, PlaceExplorer, ValidationStrategy};
//!
//! // Explorer over the built-in sample store
//! let explorer = PlaceExplorer::new_sample()?;
//! let fr: Locale = "fr".parse()?;
//!
//! // Filters straight from a URL query string
//! let filters = explorer.parse_filters([
//!     ("lat", "48.8566"),
//!     ("lng", "2.3522"),
//!     ("radius", "20000"),
//! ]);
//!
//! // Bookmarked URLs go through the corrective strategy
//! let map = explorer.map(&filters, &fr, ValidationStrategy::Corrective, None)?;
//! println!("{} places on the map", map.result.count);
//!
//! // First list page for the whole world, newest first
//! let world = explorer.config().default_bounding_box;
//! let page = explorer.list(&filters, &fr, ValidationStrategy::Corrective, &world, Some(2))?;
//! for item in &page.result.items {
//!     println!("{}: {}", item.id, item.title);
//! }
//! assert!(page.result.has_more_pages);
//! # Ok::<(), geoscout::error::GeoScoutError>(())
//! ```
//!
//! # Components
//!
//! - [`SearchConfig`]: process-wide bounds (radius range, allowed modes, caps)
//! - [`FilterModel`]: canonical request, convertible from and to URL parameters
//! - [`FilterValidator`]: Strict or Corrective validation
//! - [`TagResolver`]: locale-aware tag lookup, validation and translation
//! - [`GeoQueryEngine`]: map and list queries over the Polars place store
//! - [`ExplorationService`]: entry points with result caching and error wrapping
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod core;
pub mod error;
mod exploration;
mod filter;
mod geo;
mod locale;
mod query;
mod tags;
mod validation;

pub use core::{Explored, PlaceExplorer, PlaceExplorerBuilder};

pub use config::{ConfigError, SearchConfig, SearchConfigBuilder, TagMatch, TagParseOrder};
pub use exploration::{ExplorationError, ExplorationService};
pub use filter::{
    AddressLookup, FilterField, FilterModel, LongFilterParams, NumberParam, SearchMode,
    ShortFilterParams, TagsParam,
};
pub use geo::{BoundingBox, CoordinateEnvelope, EARTH_RADIUS_M, haversine_distance_m};
pub use geoscout_data as data;
pub use geoscout_data::PlaceStoreData;
pub use locale::{InvalidLocale, Locale};
pub use polars;
pub use query::{
    GeoQueryEngine, ListResult, MapResult, PageCursor, PlaceCoordinate, PlaceListItem, QueryError,
};
pub use tags::{
    FrameTagCatalog, Tag, TagCatalog, TagError, TagResolver, build_tag_csv, parse_tag_csv,
};
pub use validation::{
    FilterValidator, ValidationError, ValidationResult, ValidationStrategy, ViolationCode,
};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for GeoScout.
///
/// Installs a `tracing` fmt subscriber once per process. `RUST_LOG` overrides `level`
/// when set. Later calls are no-ops.
///
/// # Examples
///
/// ```rust
/// use geoscout::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), geoscout::error::GeoScoutError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::GeoScoutError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("polars=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    #[test]
    fn test_explorer_creation() {
        setup_test_env();

        let explorer = PlaceExplorer::new_sample();
        assert!(
            explorer.is_ok(),
            "Should be able to create an explorer over sample data"
        );
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        setup_test_env();
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }

    #[test]
    fn test_tag_listing_per_locale() {
        setup_test_env();

        let explorer = PlaceExplorer::new_sample().unwrap();
        let en = explorer.tags().list_for_locale(&"en".parse().unwrap()).unwrap();
        let fr = explorer.tags().list_for_locale(&"fr".parse().unwrap()).unwrap();
        assert_eq!(en.len(), 16);
        assert_eq!(fr.len(), 11);
    }

    #[test]
    fn test_default_configuration() {
        setup_test_env();

        let explorer = PlaceExplorer::new_sample().unwrap();
        assert_eq!(explorer.config(), &SearchConfig::default());
        assert!(explorer.config().allows(&SearchMode::Worldwide));
    }
}
