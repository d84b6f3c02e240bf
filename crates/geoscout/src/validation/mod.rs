//! Filter validation under a Strict or Corrective strategy.
//!
//! Both strategies run the same field rules in the same order (mode, radius, coordinates,
//! tags). They only differ in what happens on a violation: Strict stops with an error,
//! Corrective repairs the field and carries on.
use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

pub use error::ValidationError;
use error::Result;

use crate::{
    config::SearchConfig,
    filter::{FilterField, FilterModel},
    locale::Locale,
    tags::{TagResolver, dedup_preserving_order},
};

/// Reason attached to an invalid field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    InvalidMode,
    InvalidRadius,
    InvalidCoordinates,
    InvalidTags,
}

impl ViolationCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidMode => "invalid_mode",
            Self::InvalidRadius => "invalid_radius",
            Self::InvalidCoordinates => "invalid_coordinates",
            Self::InvalidTags => "invalid_tags",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStrategy {
    /// Fail on the first violation; never correct anything.
    Strict,
    /// Repair every violation to a safe value.
    #[default]
    Corrective,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<FilterField, ViolationCode>,
    pub corrected_filters: FilterModel,
    pub original_filters: FilterModel,
}

/// Applies the field rules of a [`SearchConfig`] to incoming filters.
#[derive(Debug, Clone)]
pub struct FilterValidator {
    config: Arc<SearchConfig>,
    tags: TagResolver,
}

/// Tag rule output: the usable slugs plus whether anything had to be dropped.
struct TagCheck {
    valid: Vec<String>,
    violated: bool,
}

impl FilterValidator {
    pub fn new(config: Arc<SearchConfig>, tags: TagResolver) -> Self {
        Self { config, tags }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Validate `filters` for `locale`.
    ///
    /// Strict returns `Err` on the first invalid field, so an `Ok` from it is always valid.
    /// Corrective always returns `Ok` with the repaired filters, listing what it changed in
    /// [`ValidationResult::errors`].
    #[instrument(
        name = "Validate filters",
        level = "debug",
        skip(self, filters),
        fields(strategy = ?strategy, locale = %locale)
    )]
    pub fn validate(
        &self,
        filters: &FilterModel,
        locale: &Locale,
        strategy: ValidationStrategy,
    ) -> Result<ValidationResult> {
        let mut corrected = filters.clone();
        let mut errors = BTreeMap::new();
        let mut violation = |field: FilterField, code: ViolationCode| -> Result<()> {
            match strategy {
                ValidationStrategy::Strict => Err(ValidationError::InvalidFilter { field, code }),
                ValidationStrategy::Corrective => {
                    errors.insert(field, code);
                    Ok(())
                }
            }
        };

        if !self.mode_is_valid(filters) {
            violation(FilterField::Mode, ViolationCode::InvalidMode)?;
            warn!(
                mode = %filters.mode,
                fallback = %self.config.default_mode,
                "Unsupported search mode replaced by default"
            );
            corrected.mode = self.config.default_mode.clone();
        }

        if !self.config.radius_in_bounds(filters.radius) {
            violation(FilterField::Radius, ViolationCode::InvalidRadius)?;
            warn!(
                radius = filters.radius,
                min = self.config.radius_min,
                max = self.config.radius_max,
                fallback = self.config.radius_default,
                "Radius out of bounds replaced by default"
            );
            corrected.radius = self.config.radius_default;
        }

        let (latitude, longitude) = self.checked_coordinates(filters);
        if latitude != filters.latitude || longitude != filters.longitude {
            violation(FilterField::Coordinates, ViolationCode::InvalidCoordinates)?;
            warn!(
                latitude = ?filters.latitude,
                longitude = ?filters.longitude,
                "Invalid coordinates cleared"
            );
            corrected.latitude = latitude;
            corrected.longitude = longitude;
        }

        let check = match self.check_tags(&filters.tags, locale) {
            Ok(check) => check,
            Err(e) if strategy == ValidationStrategy::Corrective => {
                warn!(error = %e, "Tag catalog unavailable; dropping all tags");
                TagCheck {
                    valid: Vec::new(),
                    violated: false,
                }
            }
            Err(e) => return Err(e),
        };
        if check.violated {
            violation(FilterField::Tags, ViolationCode::InvalidTags)?;
            warn!(
                requested = ?filters.tags,
                kept = ?check.valid,
                tags_max = self.config.tags_max,
                "Unknown or excess tags dropped"
            );
        }
        if strategy == ValidationStrategy::Corrective {
            corrected.tags = check.valid;
        }

        if strategy == ValidationStrategy::Strict {
            corrected = filters.clone();
        }
        debug!(violations = errors.len(), "Validation complete");
        Ok(ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            corrected_filters: corrected,
            original_filters: filters.clone(),
        })
    }

    fn mode_is_valid(&self, filters: &FilterModel) -> bool {
        self.config.allows(&filters.mode)
    }

    /// Each coordinate outside the envelope becomes `None`; then a half pair becomes `None` too.
    fn checked_coordinates(&self, filters: &FilterModel) -> (Option<f64>, Option<f64>) {
        let envelope = &self.config.envelope;
        let latitude = filters
            .latitude
            .filter(|lat| envelope.contains_latitude(*lat));
        let longitude = filters
            .longitude
            .filter(|lng| envelope.contains_longitude(*lng));
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => (Some(lat), Some(lng)),
            _ => (None, None),
        }
    }

    /// Drop duplicate and blank slugs silently, unknown slugs and anything past `tags_max`
    /// with a violation. Input order is kept.
    fn check_tags(&self, tags: &[String], locale: &Locale) -> Result<TagCheck> {
        let requested: Vec<String> = dedup_preserving_order(tags)
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect();
        if requested.is_empty() {
            return Ok(TagCheck {
                valid: requested,
                violated: false,
            });
        }
        let mut valid = self.tags.validate_slugs(&requested, locale)?;
        let mut violated = valid.len() < requested.len();
        if valid.len() > self.config.tags_max {
            valid.truncate(self.config.tags_max);
            violated = true;
        }
        Ok(TagCheck { valid, violated })
    }
}

mod error {
    use thiserror::Error;

    use super::ViolationCode;
    use crate::{filter::FilterField, tags::TagError};

    #[derive(Error, Debug)]
    pub enum ValidationError {
        #[error("Invalid filter '{field}': {code}")]
        InvalidFilter {
            field: FilterField,
            code: ViolationCode,
        },
        #[error("Tag catalog error: {0}")]
        TagCatalog(#[from] TagError),
    }

    impl ValidationError {
        /// The offending field and reason, for input errors.
        pub fn violation(&self) -> Option<(FilterField, ViolationCode)> {
            match self {
                Self::InvalidFilter { field, code } => Some((*field, *code)),
                Self::TagCatalog(_) => None,
            }
        }
    }

    pub type Result<T> = std::result::Result<T, ValidationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        filter::SearchMode,
        tags::{
            FrameTagCatalog, TagCatalog,
            tests::{StaticCatalog, locale},
        },
    };

    fn validator_with(catalog: impl TagCatalog + 'static, config: SearchConfig) -> FilterValidator {
        let config = Arc::new(config);
        let tags = TagResolver::new(Arc::new(catalog), config.clone());
        FilterValidator::new(config, tags)
    }

    fn validator() -> FilterValidator {
        validator_with(StaticCatalog::space(), SearchConfig::default())
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn paris() -> FilterModel {
        FilterModel {
            latitude: Some(48.8566),
            longitude: Some(2.3522),
            radius: 20_000,
            tags: strings(&["nasa", "spacex"]),
            ..FilterModel::defaults(&SearchConfig::default())
        }
    }

    #[test]
    fn test_valid_filters_pass_both_strategies() {
        for strategy in [ValidationStrategy::Strict, ValidationStrategy::Corrective] {
            let result = validator()
                .validate(&paris(), &locale("en"), strategy)
                .unwrap();
            assert!(result.is_valid);
            assert!(result.errors.is_empty());
            assert_eq!(result.corrected_filters, paris());
            assert_eq!(result.original_filters, paris());
        }
    }

    #[test]
    fn test_radius_below_min_is_defaulted() {
        let config = SearchConfig::builder()
            .radius_bounds(200_000, 2_000_000)
            .radius_default(200_000)
            .build()
            .unwrap();
        let validator = validator_with(StaticCatalog::space(), config);
        let filters = FilterModel {
            radius: 100,
            ..paris()
        };

        let result = validator
            .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert_eq!(result.corrected_filters.radius, 200_000);
        assert_eq!(result.errors.get(&FilterField::Radius), Some(&ViolationCode::InvalidRadius));
        assert!(!result.is_valid);
        assert_eq!(result.original_filters.radius, 100);

        let err = validator
            .validate(&filters, &locale("en"), ValidationStrategy::Strict)
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some((FilterField::Radius, ViolationCode::InvalidRadius))
        );
    }

    #[test]
    fn test_radius_above_max_is_defaulted() {
        let filters = FilterModel {
            radius: 2_000_001,
            ..paris()
        };
        let result = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert_eq!(result.corrected_filters.radius, 200_000);
    }

    #[test]
    fn test_invalid_mode() {
        let filters = FilterModel {
            mode: SearchMode::parse("invalid"),
            ..paris()
        };
        let err = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Strict)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidFilter {
                field: FilterField::Mode,
                code: ViolationCode::InvalidMode
            }
        ));
        assert_eq!(err.to_string(), "Invalid filter 'mode': invalid_mode");

        let result = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert_eq!(result.corrected_filters.mode, SearchMode::Proximity);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_disallowed_mode_is_invalid() {
        let config = SearchConfig::builder()
            .allowed_modes([SearchMode::Worldwide])
            .default_mode(SearchMode::Worldwide)
            .build()
            .unwrap();
        let validator = validator_with(StaticCatalog::space(), config);
        let result = validator
            .validate(&paris(), &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert_eq!(result.corrected_filters.mode, SearchMode::Worldwide);
    }

    #[test]
    fn test_out_of_range_longitude_clears_both_coordinates() {
        let filters = FilterModel {
            latitude: Some(48.8),
            longitude: Some(200.0),
            ..paris()
        };
        let result = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert_eq!(result.corrected_filters.latitude, None);
        assert_eq!(result.corrected_filters.longitude, None);
        assert_eq!(
            result.errors.get(&FilterField::Coordinates),
            Some(&ViolationCode::InvalidCoordinates)
        );

        let err = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Strict)
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some((FilterField::Coordinates, ViolationCode::InvalidCoordinates))
        );
    }

    #[test]
    fn test_coordinates_are_never_half_set_after_correction() {
        let cases = [
            (Some(91.0), Some(2.0)),
            (Some(48.0), None),
            (None, Some(2.0)),
            (Some(f64::NAN), Some(2.0)),
            (Some(48.0), Some(f64::INFINITY)),
            (None, None),
            (Some(-90.0), Some(180.0)),
        ];
        for (latitude, longitude) in cases {
            let filters = FilterModel {
                latitude,
                longitude,
                ..paris()
            };
            let corrected = validator()
                .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
                .unwrap()
                .corrected_filters;
            assert_eq!(
                corrected.latitude.is_none(),
                corrected.longitude.is_none(),
                "{latitude:?}, {longitude:?}"
            );
        }
    }

    #[test]
    fn test_missing_coordinates_are_not_a_violation() {
        let filters = FilterModel {
            latitude: None,
            longitude: None,
            ..paris()
        };
        let result = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Strict)
            .unwrap();
        assert!(result.is_valid);
    }

    #[test]
    fn test_tags_are_truncated_to_first_valid_in_order() {
        let store = geoscout_data::sample::sample_store().unwrap();
        let config = SearchConfig::default();
        assert_eq!(config.tags_max, 10);
        let validator = validator_with(FrameTagCatalog::new(store), config);

        let requested = strings(&[
            "dark-sky",
            "nasa",
            "bogus",
            "spacex",
            "observatory",
            "museum",
            "launch-site",
            "musee",
            "planetarium",
            "rocketry",
            "astronomy",
            "telescope",
            "space-history",
            "science-center",
            "aviation",
            "satellite",
            "mission-control",
        ]);
        let filters = FilterModel {
            tags: requested,
            ..paris()
        };
        let result = validator
            .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert_eq!(
            result.corrected_filters.tags,
            strings(&[
                "dark-sky",
                "nasa",
                "spacex",
                "observatory",
                "museum",
                "launch-site",
                "planetarium",
                "rocketry",
                "astronomy",
                "telescope",
            ])
        );
        assert_eq!(result.errors.get(&FilterField::Tags), Some(&ViolationCode::InvalidTags));
    }

    #[test]
    fn test_tag_count_never_exceeds_max() {
        for tags_max in 1..=4 {
            let config = SearchConfig {
                tags_max,
                ..SearchConfig::default()
            };
            let validator = validator_with(StaticCatalog::space(), config);
            let filters = FilterModel {
                tags: strings(&["planetarium", "nasa", "nasa", "spacex", "observatory", "x"]),
                ..paris()
            };
            let tags = validator
                .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
                .unwrap()
                .corrected_filters
                .tags;
            assert!(tags.len() <= tags_max);
            assert_eq!(tags[0], "planetarium");
        }
    }

    #[test]
    fn test_unknown_tag_in_locale() {
        let filters = FilterModel {
            tags: strings(&["observatory", "nasa"]),
            ..paris()
        };
        let err = validator()
            .validate(&filters, &locale("fr"), ValidationStrategy::Strict)
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some((FilterField::Tags, ViolationCode::InvalidTags))
        );

        let result = validator()
            .validate(&filters, &locale("fr"), ValidationStrategy::Corrective)
            .unwrap();
        assert_eq!(result.corrected_filters.tags, strings(&["nasa"]));
    }

    #[test]
    fn test_blank_and_repeated_tags_are_not_violations() {
        let filters = FilterModel {
            tags: strings(&["nasa", "", "spacex", "nasa"]),
            ..paris()
        };
        let result = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert!(result.is_valid);
        assert_eq!(result.corrected_filters.tags, strings(&["nasa", "spacex"]));

        let strict = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Strict)
            .unwrap();
        assert_eq!(strict.corrected_filters, filters);
    }

    #[test]
    fn test_catalog_failure_depends_on_strategy() {
        let validator = validator_with(StaticCatalog::failing(), SearchConfig::default());

        let result = validator
            .validate(&paris(), &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert!(result.corrected_filters.tags.is_empty());
        assert!(result.is_valid);

        let err = validator
            .validate(&paris(), &locale("en"), ValidationStrategy::Strict)
            .unwrap_err();
        assert!(matches!(err, ValidationError::TagCatalog(_)));
        assert_eq!(err.violation(), None);
    }

    #[test]
    fn test_strict_reports_first_violation_in_field_order() {
        let filters = FilterModel {
            mode: SearchMode::parse("teleport"),
            radius: -5,
            latitude: Some(500.0),
            tags: strings(&["bogus"]),
            ..paris()
        };
        let err = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Strict)
            .unwrap_err();
        assert_eq!(err.violation(), Some((FilterField::Mode, ViolationCode::InvalidMode)));

        let result = validator()
            .validate(&filters, &locale("en"), ValidationStrategy::Corrective)
            .unwrap();
        assert_eq!(
            result.errors.keys().copied().collect::<Vec<_>>(),
            vec![
                FilterField::Mode,
                FilterField::Radius,
                FilterField::Coordinates,
                FilterField::Tags
            ]
        );
        assert!(result.corrected_filters.tags.is_empty());
    }
}
