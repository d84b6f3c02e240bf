//! Untyped request parameters as they arrive from URLs or UI components.
//!
//! These types exist only at the boundary; [`super::FilterModel`] is built from them
//! immediately and nothing downstream sees them.
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A numeric parameter that may arrive as a JSON number or as text (`"48.8"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberParam {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl NumberParam {
    /// Coerce to a float; blank or unparsable text yields `None`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Coerce to an integer, rounding fractional input.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => f.is_finite().then(|| f.round() as i64),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.round() as i64)
                })
            }
        }
    }
}

impl From<f64> for NumberParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for NumberParam {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for NumberParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Tags given either as one comma-joined string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsParam {
    Csv(String),
    List(Vec<String>),
}

/// Short, URL-oriented parameter names: `mode, lat, lng, radius, address, tags, page`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortFilterParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<NumberParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<NumberParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<NumberParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagsParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<NumberParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ShortFilterParams {
    /// Collect already-decoded query-string pairs.
    ///
    /// A repeated `tags` key (or PHP-style `tags[]`) accumulates into a list; any other
    /// repeated key keeps its last value. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value: String = value.into();
            match key.as_ref() {
                "mode" => params.mode = Some(value),
                "lat" => params.lat = Some(NumberParam::Text(value)),
                "lng" => params.lng = Some(NumberParam::Text(value)),
                "radius" => params.radius = Some(NumberParam::Text(value)),
                "address" => params.address = Some(value),
                "page" => params.page = Some(NumberParam::Text(value)),
                "cursor" => params.cursor = Some(value),
                "tags" | "tags[]" => {
                    params.tags = Some(match params.tags.take() {
                        None if key.as_ref() == "tags" => TagsParam::Csv(value),
                        None => TagsParam::List(vec![value]),
                        Some(TagsParam::Csv(first)) => TagsParam::List(vec![first, value]),
                        Some(TagsParam::List(mut list)) => {
                            list.push(value);
                            TagsParam::List(list)
                        }
                    });
                }
                other => trace!(key = other, "Ignoring unknown filter parameter"),
            }
        }
        params
    }

    /// Render as `(key, value)` pairs ready for a query string.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let number = |n: &NumberParam| match n {
            NumberParam::Integer(i) => i.to_string(),
            NumberParam::Float(f) => f.to_string(),
            NumberParam::Text(s) => s.clone(),
        };
        let mut pairs = Vec::new();
        if let Some(mode) = &self.mode {
            pairs.push(("mode", mode.clone()));
        }
        if let Some(lat) = &self.lat {
            pairs.push(("lat", number(lat)));
        }
        if let Some(lng) = &self.lng {
            pairs.push(("lng", number(lng)));
        }
        if let Some(radius) = &self.radius {
            pairs.push(("radius", number(radius)));
        }
        if let Some(address) = &self.address {
            pairs.push(("address", address.clone()));
        }
        match &self.tags {
            Some(TagsParam::Csv(csv)) => pairs.push(("tags", csv.clone())),
            Some(TagsParam::List(list)) => pairs.push(("tags", list.join(","))),
            None => {}
        }
        if let Some(page) = &self.page {
            pairs.push(("page", number(page)));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs
    }
}

/// Long, component-oriented parameter names: `mode, latitude, longitude, radius, address, tags, page`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LongFilterParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<NumberParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<NumberParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<NumberParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<NumberParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_coercion() {
        assert_eq!(NumberParam::from("48.8").as_f64(), Some(48.8));
        assert_eq!(NumberParam::from(" 5000 ").as_i64(), Some(5000));
        assert_eq!(NumberParam::from("5000.6").as_i64(), Some(5001));
        assert_eq!(NumberParam::from("").as_f64(), None);
        assert_eq!(NumberParam::from("abc").as_i64(), None);
        assert_eq!(NumberParam::Float(f64::NAN).as_i64(), None);
        assert_eq!(NumberParam::Integer(7).as_f64(), Some(7.0));
    }

    #[test]
    fn test_deserialize_mixed_json() {
        let params: ShortFilterParams = serde_json::from_str(
            r#"{"mode": "worldwide", "lat": "48.8", "lng": 2.35, "radius": 5000, "tags": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(params.lat, Some(NumberParam::Text("48.8".into())));
        assert_eq!(params.lng, Some(NumberParam::Float(2.35)));
        assert_eq!(params.radius, Some(NumberParam::Integer(5000)));
        assert_eq!(
            params.tags,
            Some(TagsParam::List(vec!["a".into(), "b".into()]))
        );

        let params: ShortFilterParams = serde_json::from_str(r#"{"tags": "a,b"}"#).unwrap();
        assert_eq!(params.tags, Some(TagsParam::Csv("a,b".into())));
    }

    #[test]
    fn test_from_pairs_accumulates_tags() {
        let params = ShortFilterParams::from_pairs([
            ("mode", "proximity"),
            ("lat", "48.85"),
            ("tags", "nasa"),
            ("tags", "spacex"),
            ("utm_source", "newsletter"),
        ]);
        assert_eq!(params.mode.as_deref(), Some("proximity"));
        assert_eq!(params.lat, Some(NumberParam::Text("48.85".into())));
        assert_eq!(
            params.tags,
            Some(TagsParam::List(vec!["nasa".into(), "spacex".into()]))
        );

        let single = ShortFilterParams::from_pairs([("tags", "nasa,spacex")]);
        assert_eq!(single.tags, Some(TagsParam::Csv("nasa,spacex".into())));

        let bracketed = ShortFilterParams::from_pairs([("tags[]", "nasa")]);
        assert_eq!(bracketed.tags, Some(TagsParam::List(vec!["nasa".into()])));
    }

    #[test]
    fn test_to_pairs() {
        let params = ShortFilterParams {
            mode: Some("proximity".into()),
            radius: Some(NumberParam::Integer(5000)),
            tags: Some(TagsParam::List(vec!["a".into(), "b".into()])),
            ..Default::default()
        };
        assert_eq!(
            params.to_pairs(),
            vec![
                ("mode", "proximity".to_string()),
                ("radius", "5000".to_string()),
                ("tags", "a,b".to_string()),
            ]
        );
    }
}
