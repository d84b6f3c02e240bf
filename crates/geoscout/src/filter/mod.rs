//! The canonical, strongly typed representation of a search request.
//!
//! A [`FilterModel`] is built per request from either the short URL parameter set
//! (`lat`, `lng`, …) or the long component set (`latitude`, `longitude`, …). Missing
//! fields take their defaults from [`SearchConfig`]; values are *not* validated here,
//! that is the job of [`crate::FilterValidator`].
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

mod params;

pub use params::{LongFilterParams, NumberParam, ShortFilterParams, TagsParam};

use crate::{
    config::SearchConfig,
    tags::{build_tag_csv, clean_tag_tokens, dedup_preserving_order, parse_tag_csv},
};

/// Search mode requested by the caller.
///
/// Unknown input is kept verbatim in [`SearchMode::Unsupported`] so validation can report it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SearchMode {
    /// Constrained to a radius around a coordinate pair
    Proximity,
    /// No distance constraint
    Worldwide,
    Unsupported(String),
}

impl SearchMode {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "proximity" => Self::Proximity,
            "worldwide" => Self::Worldwide,
            _ => Self::Unsupported(raw.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Proximity => "proximity",
            Self::Worldwide => "worldwide",
            Self::Unsupported(raw) => raw,
        }
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl From<String> for SearchMode {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<SearchMode> for String {
    fn from(value: SearchMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter fields that validation reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Mode,
    Radius,
    /// The latitude/longitude pair, which is only ever valid or invalid as a whole
    Coordinates,
    Tags,
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mode => "mode",
            Self::Radius => "radius",
            Self::Coordinates => "coordinates",
            Self::Tags => "tags",
        })
    }
}

/// Optional collaborator that turns coordinates into display text.
///
/// Only ever used to fill [`FilterModel::address`]; it never authorises coordinates.
pub trait AddressLookup {
    fn reverse(&self, latitude: f64, longitude: f64) -> anyhow::Result<Option<String>>;
}

/// Canonical search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterModel {
    pub mode: SearchMode,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Search radius in metres
    pub radius: i64,
    /// Display text only; never used to locate the search
    pub address: Option<String>,
    /// Locale-specific tag slugs. Order only matters for URL round-trips.
    pub tags: Vec<String>,
    pub page: u32,
    pub cursor: Option<String>,
}

/// Tag values from a list, each one possibly comma-joined itself (`?tags=a,b&tags=c`).
fn split_tag_values(values: &[String], config: &SearchConfig) -> Vec<String> {
    clean_tag_tokens(
        values.iter().flat_map(|v| v.split(',')),
        config.tag_parse_order,
    )
}

fn coerce_f64(field: &'static str, value: Option<&NumberParam>) -> Option<f64> {
    let value = value?;
    let coerced = value.as_f64();
    if coerced.is_none() && !matches!(value, NumberParam::Text(s) if s.trim().is_empty()) {
        debug!(field, ?value, "Unparsable number treated as absent");
    }
    coerced
}

fn coerce_i64(field: &'static str, value: Option<&NumberParam>) -> Option<i64> {
    let value = value?;
    let coerced = value.as_i64();
    if coerced.is_none() {
        debug!(field, ?value, "Unparsable integer treated as absent");
    }
    coerced
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn page_number(value: Option<&NumberParam>) -> u32 {
    coerce_i64("page", value)
        .map_or(1, |p| p.clamp(1, i64::from(u32::MAX)) as u32)
}

impl FilterModel {
    /// A request with no input at all.
    #[must_use]
    pub fn defaults(config: &SearchConfig) -> Self {
        Self {
            mode: config.default_mode.clone(),
            latitude: None,
            longitude: None,
            radius: config.radius_default,
            address: None,
            tags: Vec::new(),
            page: 1,
            cursor: None,
        }
    }

    /// Build from the short URL parameter set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geoscout::{FilterModel, SearchConfig, SearchMode, ShortFilterParams};
    ///
    /// let config = SearchConfig::default();
    /// let params = ShortFilterParams::from_pairs([("lat", "48.85"), ("lng", "2.35"), ("tags", "nasa,spacex")]);
    /// let filters = FilterModel::from_short(params, &config);
    ///
    /// assert_eq!(filters.mode, SearchMode::Proximity);
    /// assert_eq!(filters.latitude, Some(48.85));
    /// assert_eq!(filters.radius, config.radius_default);
    /// assert_eq!(filters.tags, vec!["nasa", "spacex"]);
    /// ```
    #[must_use]
    pub fn from_short(params: ShortFilterParams, config: &SearchConfig) -> Self {
        let tags = match params.tags {
            Some(TagsParam::Csv(csv)) => parse_tag_csv(&csv, config.tag_parse_order),
            Some(TagsParam::List(list)) => split_tag_values(&list, config),
            None => Vec::new(),
        };
        Self {
            mode: non_blank(params.mode)
                .map_or_else(|| config.default_mode.clone(), |m| SearchMode::parse(&m)),
            latitude: coerce_f64("lat", params.lat.as_ref()),
            longitude: coerce_f64("lng", params.lng.as_ref()),
            radius: coerce_i64("radius", params.radius.as_ref()).unwrap_or(config.radius_default),
            address: non_blank(params.address),
            tags,
            page: page_number(params.page.as_ref()),
            cursor: non_blank(params.cursor),
        }
    }

    /// Build from the long component parameter set.
    #[must_use]
    pub fn from_long(params: LongFilterParams, config: &SearchConfig) -> Self {
        let tags = params
            .tags
            .map(|list| split_tag_values(&list, config))
            .unwrap_or_default();
        Self {
            mode: non_blank(params.mode)
                .map_or_else(|| config.default_mode.clone(), |m| SearchMode::parse(&m)),
            latitude: coerce_f64("latitude", params.latitude.as_ref()),
            longitude: coerce_f64("longitude", params.longitude.as_ref()),
            radius: coerce_i64("radius", params.radius.as_ref()).unwrap_or(config.radius_default),
            address: non_blank(params.address),
            tags,
            page: page_number(params.page.as_ref()),
            cursor: non_blank(params.cursor),
        }
    }

    /// Build from decoded URL query pairs.
    pub fn from_query_pairs<I, K, V>(pairs: I, config: &SearchConfig) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::from_short(ShortFilterParams::from_pairs(pairs), config)
    }

    /// URL form. Tags are rendered comma-joined.
    #[must_use]
    pub fn to_short_form(&self) -> ShortFilterParams {
        ShortFilterParams {
            mode: Some(self.mode.to_string()),
            lat: self.latitude.map(NumberParam::Float),
            lng: self.longitude.map(NumberParam::Float),
            radius: Some(NumberParam::Integer(self.radius)),
            address: self.address.clone(),
            tags: (!self.tags.is_empty()).then(|| TagsParam::Csv(build_tag_csv(&self.tags))),
            page: Some(NumberParam::Integer(i64::from(self.page))),
            cursor: self.cursor.clone(),
        }
    }

    /// Component form. Tags are rendered as a list.
    #[must_use]
    pub fn to_long_form(&self) -> LongFilterParams {
        LongFilterParams {
            mode: Some(self.mode.to_string()),
            latitude: self.latitude.map(NumberParam::Float),
            longitude: self.longitude.map(NumberParam::Float),
            radius: Some(NumberParam::Integer(self.radius)),
            address: self.address.clone(),
            tags: Some(self.tags.clone()),
            page: Some(NumberParam::Integer(i64::from(self.page))),
            cursor: self.cursor.clone(),
        }
    }

    /// Both coordinates, when both are set.
    #[must_use]
    pub fn center(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    #[must_use]
    pub fn is_proximity(&self) -> bool {
        self.mode == SearchMode::Proximity
    }

    /// Shape the filter for querying: duplicate and blank tags removed, a half-set or
    /// non-finite coordinate pair cleared, page at least 1.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let center = self
            .center()
            .filter(|(lat, lng)| lat.is_finite() && lng.is_finite());
        let tags = dedup_preserving_order(&self.tags)
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            latitude: center.map(|c| c.0),
            longitude: center.map(|c| c.1),
            tags,
            page: self.page.max(1),
            ..self.clone()
        }
    }

    /// Fill [`Self::address`] from coordinates when it is empty. Lookup failures are logged
    /// and leave the address unset. Returns whether an address was filled.
    pub fn fill_address(&mut self, lookup: &dyn AddressLookup) -> bool {
        if self.address.is_some() {
            return false;
        }
        let Some((latitude, longitude)) = self.center() else {
            return false;
        };
        match lookup.reverse(latitude, longitude) {
            Ok(Some(address)) if !address.trim().is_empty() => {
                self.address = Some(address);
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "Address lookup failed; leaving address empty");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagParseOrder;

    fn legal() -> FilterModel {
        FilterModel {
            mode: SearchMode::Proximity,
            latitude: Some(48.8566),
            longitude: Some(2.3522),
            radius: 20_000,
            address: Some("Paris, France".into()),
            tags: vec!["observatory".into(), "museum".into()],
            page: 3,
            cursor: Some("abc".into()),
        }
    }

    #[test]
    fn test_defaults_from_config() {
        let config = SearchConfig::default();
        let filters = FilterModel::from_short(ShortFilterParams::default(), &config);
        assert_eq!(filters, FilterModel::defaults(&config));
        assert_eq!(filters.mode, SearchMode::Proximity);
        assert_eq!(filters.radius, 200_000);
        assert!(filters.tags.is_empty());
        assert_eq!(filters.page, 1);
        assert!(filters.center().is_none());
    }

    #[test]
    fn test_short_form_round_trip() {
        let config = SearchConfig::default();
        let filters = legal();
        assert_eq!(FilterModel::from_short(filters.to_short_form(), &config), filters);
    }

    #[test]
    fn test_long_form_round_trip() {
        let config = SearchConfig::default();
        let filters = legal();
        assert_eq!(FilterModel::from_long(filters.to_long_form(), &config), filters);
    }

    #[test]
    fn test_short_and_long_forms_agree() {
        let config = SearchConfig::default();
        let filters = legal();
        let via_short = FilterModel::from_short(filters.to_short_form(), &config);
        let via_long = FilterModel::from_long(via_short.to_long_form(), &config);
        assert_eq!(via_long, filters);
    }

    #[test]
    fn test_short_form_params_round_trip_through_json() {
        let config = SearchConfig::default();
        let short = legal().to_short_form();
        let json = serde_json::to_string(&short).unwrap();
        let parsed: ShortFilterParams = serde_json::from_str(&json).unwrap();
        assert_eq!(FilterModel::from_short(parsed, &config).to_short_form(), short);
    }

    #[test]
    fn test_query_pairs_round_trip() {
        let config = SearchConfig::default();
        let filters = legal();
        let pairs = filters.to_short_form().to_pairs();
        assert_eq!(FilterModel::from_query_pairs(pairs, &config), filters);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let config = SearchConfig::default();
        let filters = FilterModel::from_query_pairs(
            [
                ("mode", "Worldwide"),
                ("lat", "48.8"),
                ("lng", " 2.3 "),
                ("radius", "15000"),
                ("page", "2"),
            ],
            &config,
        );
        assert_eq!(filters.mode, SearchMode::Worldwide);
        assert_eq!(filters.center(), Some((48.8, 2.3)));
        assert_eq!(filters.radius, 15_000);
        assert_eq!(filters.page, 2);
    }

    #[test]
    fn test_unparsable_numbers_fall_back() {
        let config = SearchConfig::default();
        let filters = FilterModel::from_query_pairs(
            [("lat", "north"), ("lng", ""), ("radius", "far"), ("page", "-4")],
            &config,
        );
        assert_eq!(filters.latitude, None);
        assert_eq!(filters.longitude, None);
        assert_eq!(filters.radius, config.radius_default);
        assert_eq!(filters.page, 1);
    }

    #[test]
    fn test_unknown_mode_is_preserved_for_validation() {
        let config = SearchConfig::default();
        let filters = FilterModel::from_query_pairs([("mode", "invalid")], &config);
        assert_eq!(filters.mode, SearchMode::Unsupported("invalid".into()));
        assert!(!filters.mode.is_supported());
    }

    #[test]
    fn test_tag_csv_quirk_is_configurable() {
        let raw = [("tags", "nasa,,spacex,  ,observatory")];
        let quirky = FilterModel::from_query_pairs(raw, &SearchConfig::default());
        assert_eq!(quirky.tags, vec!["nasa", "spacex", "", "observatory"]);

        let config = SearchConfig {
            tag_parse_order: TagParseOrder::TrimThenFilter,
            ..SearchConfig::default()
        };
        let clean = FilterModel::from_query_pairs(raw, &config);
        assert_eq!(clean.tags, vec!["nasa", "spacex", "observatory"]);
    }

    #[test]
    fn test_tag_list_input_is_cleaned_like_csv() {
        let config = SearchConfig::default();
        let params = LongFilterParams {
            tags: Some(vec![" nasa ".into(), String::new(), "spacex".into()]),
            ..Default::default()
        };
        assert_eq!(FilterModel::from_long(params, &config).tags, vec!["nasa", "spacex"]);
    }

    #[test]
    fn test_repeated_tag_keys_mixed_with_csv() {
        let config = SearchConfig::default();
        let filters = FilterModel::from_query_pairs(
            [("tags", "nasa,spacex"), ("tags", "museum"), ("tags[]", "rocketry, aviation")],
            &config,
        );
        assert_eq!(
            filters.tags,
            vec!["nasa", "spacex", "museum", "rocketry", "aviation"]
        );

        let reparsed = FilterModel::from_short(filters.to_short_form(), &config);
        assert_eq!(reparsed.tags, filters.tags);
    }

    #[test]
    fn test_normalized_clears_half_set_coordinates() {
        let filters = FilterModel {
            longitude: None,
            tags: vec!["a".into(), String::new(), "a".into(), "b".into()],
            ..legal()
        };
        let normalized = filters.normalized();
        assert_eq!(normalized.center(), None);
        assert_eq!(normalized.latitude, None);
        assert_eq!(normalized.tags, vec!["a", "b"]);
    }

    struct FixedLookup(anyhow::Result<Option<String>>);

    impl AddressLookup for FixedLookup {
        fn reverse(&self, _latitude: f64, _longitude: f64) -> anyhow::Result<Option<String>> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    #[test]
    fn test_fill_address() {
        let mut filters = FilterModel {
            address: None,
            ..legal()
        };
        assert!(filters.fill_address(&FixedLookup(Ok(Some("Paris".into())))));
        assert_eq!(filters.address.as_deref(), Some("Paris"));
        assert_eq!(filters.center(), legal().center());

        // Existing address wins.
        assert!(!filters.fill_address(&FixedLookup(Ok(Some("Lyon".into())))));

        let mut failing = FilterModel {
            address: None,
            ..legal()
        };
        assert!(!failing.fill_address(&FixedLookup(Err(anyhow::anyhow!("offline")))));
        assert!(failing.address.is_none());
    }

    #[test]
    fn test_mode_serde_keeps_unknown_text() {
        let mode: SearchMode = serde_json::from_str("\"teleport\"").unwrap();
        assert_eq!(mode, SearchMode::Unsupported("teleport".into()));
        assert_eq!(serde_json::to_string(&SearchMode::Worldwide).unwrap(), "\"worldwide\"");
    }
}
