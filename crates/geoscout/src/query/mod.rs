//! Geospatial querying over the place store.
//!
//! Both views share one candidate pipeline so the map and the list always agree on which
//! places match a filter:
//!
//! 1. optional bounding box restriction,
//! 2. proximity pre-filter on the box enclosing the search circle,
//! 3. tag filter (ALL or ANY, see [`TagMatch`]),
//! 4. a published translation in the requested locale.
//!
//! Rows are then sorted newest first (`published_at DESC, place_id DESC`) and the exact
//! haversine distance is checked in Rust before any cap or page is cut.
use std::{sync::Arc, time::Instant};

use ahash::AHashMap as HashMap;
use geoscout_data::PlaceStoreData;
use itertools::izip;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

mod cursor;

pub use cursor::PageCursor;
pub use error::QueryError;
use error::Result;

use crate::{
    config::{SearchConfig, TagMatch},
    filter::FilterModel,
    geo::{BoundingBox, haversine_distance_m},
    locale::Locale,
    tags::{Tag, dedup_preserving_order},
};

/// A single map marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaceCoordinate {
    pub id: u64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapResult {
    pub coordinates: Vec<PlaceCoordinate>,
    pub count: usize,
    pub bounding_box: BoundingBox,
    /// More places matched than `max_map_coordinates` allows.
    pub truncated: bool,
}

/// A place as rendered in the list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceListItem {
    pub id: u64,
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<Tag>,
    pub photo: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Only set for proximity searches
    pub distance_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    pub items: Vec<PlaceListItem>,
    pub next_cursor: Option<String>,
    pub has_more_pages: bool,
}

/// A matching place before it is shaped for a view.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    id: u64,
    latitude: f64,
    longitude: f64,
    published_at: i64,
    photo: Option<String>,
    distance_m: Option<f64>,
}

impl Candidate {
    fn cursor(&self) -> PageCursor {
        PageCursor::new(self.published_at, self.id)
    }
}

fn bbox_expr(bbox: &BoundingBox) -> Expr {
    let latitude = col("latitude")
        .gt_eq(lit(bbox.south))
        .and(col("latitude").lt_eq(lit(bbox.north)));
    let longitude = if bbox.crosses_antimeridian() {
        col("longitude")
            .gt_eq(lit(bbox.west))
            .or(col("longitude").lt_eq(lit(bbox.east)))
    } else {
        col("longitude")
            .gt_eq(lit(bbox.west))
            .and(col("longitude").lt_eq(lit(bbox.east)))
    };
    latitude.and(longitude)
}

/// Cut a description down to `max_chars` characters on a word boundary where possible.
fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", cut.trim_end_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation()))
}

/// Read-only query engine over a [`PlaceStoreData`].
#[derive(Debug, Clone)]
pub struct GeoQueryEngine {
    store: PlaceStoreData,
    config: Arc<SearchConfig>,
}

impl GeoQueryEngine {
    pub fn new(store: PlaceStoreData, config: Arc<SearchConfig>) -> Self {
        Self { store, config }
    }

    /// Coordinates of every matching place, up to `max_map_coordinates`.
    #[instrument(
        name = "Map query",
        level = "debug",
        skip_all,
        fields(mode = %filters.mode, tags = filters.tags.len(), locale = %locale)
    )]
    pub fn places_for_map(
        &self,
        filters: &FilterModel,
        locale: &Locale,
        bbox: Option<&BoundingBox>,
    ) -> Result<MapResult> {
        let cap = self.config.max_map_coordinates;
        let mut matched = self.candidates(filters, locale, bbox, None)?;
        let truncated = matched.len() > cap;
        matched.truncate(cap);

        let coordinates: Vec<PlaceCoordinate> = matched
            .into_iter()
            .map(|c| PlaceCoordinate {
                id: c.id,
                latitude: c.latitude,
                longitude: c.longitude,
            })
            .collect();
        let bounding_box = bbox
            .copied()
            .or_else(|| BoundingBox::enclosing(coordinates.iter().map(|c| (c.latitude, c.longitude))))
            .unwrap_or(self.config.default_bounding_box);
        if truncated {
            debug!(cap, "Map result truncated");
        }
        Ok(MapResult {
            count: coordinates.len(),
            coordinates,
            bounding_box,
            truncated,
        })
    }

    /// One page of list items inside `bbox`.
    ///
    /// With a `cursor` the page starts right after it; without one `filters.page` selects
    /// the page by offset.
    #[instrument(
        name = "List query",
        level = "debug",
        skip_all,
        fields(mode = %filters.mode, tags = filters.tags.len(), locale = %locale, page_size = page_size)
    )]
    pub fn places_for_list(
        &self,
        filters: &FilterModel,
        locale: &Locale,
        bbox: &BoundingBox,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ListResult> {
        let page_size = page_size.max(1);
        let after = cursor.map(PageCursor::decode).transpose()?;
        let matched = self.candidates(filters, locale, Some(bbox), after.as_ref())?;

        let remaining: Vec<Candidate> = match after {
            Some(_) => matched.into_iter().take(page_size + 1).collect(),
            None => {
                let offset = (filters.page.max(1) as usize - 1) * page_size;
                matched.into_iter().skip(offset).take(page_size + 1).collect()
            }
        };
        let has_more_pages = remaining.len() > page_size;
        let page: Vec<Candidate> = remaining.into_iter().take(page_size).collect();
        let next_cursor = match page.last() {
            Some(last) if has_more_pages => Some(last.cursor().encode()?),
            _ => None,
        };

        let items = self.list_items(page, locale)?;
        debug!(items = items.len(), has_more_pages, "List page built");
        Ok(ListResult {
            items,
            next_cursor,
            has_more_pages,
        })
    }

    /// Every place matching `filters` after `after`, newest first, with exact distances applied.
    fn candidates(
        &self,
        filters: &FilterModel,
        locale: &Locale,
        bbox: Option<&BoundingBox>,
        after: Option<&PageCursor>,
    ) -> Result<Vec<Candidate>> {
        let t0 = Instant::now();
        let mut lf = self.store.places()?;
        if let Some(bbox) = bbox {
            lf = lf.filter(bbox_expr(bbox));
        }
        if let Some(after) = after {
            lf = lf.filter(after.rows_after());
        }

        let circle = filters
            .center()
            .filter(|_| filters.is_proximity())
            .map(|(lat, lng)| (lat, lng, filters.radius as f64));
        if let Some((lat, lng, radius)) = circle {
            lf = lf.filter(bbox_expr(&BoundingBox::around(lat, lng, radius)));
        } else if filters.is_proximity() {
            trace!("Proximity search without coordinates; no distance constraint");
        }

        if let Some(tagged) = self.tagged_places(&filters.tags, locale)? {
            lf = lf.join(
                tagged,
                [col("place_id")],
                [col("place_id")],
                JoinArgs::new(JoinType::Semi),
            );
        }

        let df = lf
            .join(
                self.published_translations(locale)?.select([col("place_id")]),
                [col("place_id")],
                [col("place_id")],
                JoinArgs::new(JoinType::Semi),
            )
            .sort(
                ["published_at", "place_id"],
                SortMultipleOptions::default().with_order_descending(true),
            )
            .collect()?;

        let rows = izip!(
            df.column("place_id")?.u64()?,
            df.column("latitude")?.f64()?,
            df.column("longitude")?.f64()?,
            df.column("published_at")?.i64()?,
            df.column("photo")?.str()?,
        );
        let matched: Vec<Candidate> = rows
            .filter_map(|(id, latitude, longitude, published_at, photo)| {
                Some(Candidate {
                    id: id?,
                    latitude: latitude?,
                    longitude: longitude?,
                    published_at: published_at?,
                    photo: photo.map(ToString::to_string),
                    distance_m: None,
                })
            })
            .filter_map(|mut c| match circle {
                Some((lat, lng, radius)) => {
                    let d = haversine_distance_m(lat, lng, c.latitude, c.longitude);
                    c.distance_m = Some(d);
                    (d <= radius).then_some(c)
                }
                None => Some(c),
            })
            .collect();

        debug!(
            prefiltered = df.height(),
            matched = matched.len(),
            elapsed = ?t0.elapsed(),
            "Candidate pipeline complete"
        );
        Ok(matched)
    }

    fn published_translations(&self, locale: &Locale) -> Result<LazyFrame> {
        Ok(self.store.place_translations()?.filter(
            col("locale")
                .eq(lit(locale.as_str()))
                .and(col("published").eq(lit(true))),
        ))
    }

    /// Place ids carrying the requested tags, or `None` when no tag filter applies.
    fn tagged_places(&self, tags: &[String], locale: &Locale) -> Result<Option<LazyFrame>> {
        let slugs: Vec<String> = dedup_preserving_order(tags)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if slugs.is_empty() {
            return Ok(None);
        }
        let requested = slugs.len() as u32;
        let wanted = self
            .store
            .tags()?
            .filter(col("locale").eq(lit(locale.as_str())))
            .join(
                df!("slug" => slugs)?.lazy(),
                [col("slug")],
                [col("slug")],
                JoinArgs::new(JoinType::Semi),
            )
            .select([col("tag_id")]);
        let links = self
            .store
            .place_tags()?
            .join(
                wanted,
                [col("tag_id")],
                [col("tag_id")],
                JoinArgs::new(JoinType::Semi),
            )
            .unique(None, UniqueKeepStrategy::First);

        Ok(Some(match self.config.tag_match {
            TagMatch::Any => links.select([col("place_id")]),
            TagMatch::All => links
                .group_by([col("place_id")])
                .agg([len().alias("matched")])
                .filter(col("matched").eq(lit(requested)))
                .select([col("place_id")]),
        }))
    }

    /// Attach locale text and tags to a page of candidates, keeping page order.
    fn list_items(&self, page: Vec<Candidate>, locale: &Locale) -> Result<Vec<PlaceListItem>> {
        if page.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<u64> = page.iter().map(|c| c.id).collect();
        let page_ids = df!("place_id" => ids)?.lazy();

        let text = self
            .published_translations(locale)?
            .join(
                page_ids.clone(),
                [col("place_id")],
                [col("place_id")],
                JoinArgs::new(JoinType::Semi),
            )
            .select([col("place_id"), col("title"), col("description")])
            .collect()?;
        let mut texts: HashMap<u64, (String, String)> = HashMap::with_capacity(text.height());
        for (id, title, description) in izip!(
            text.column("place_id")?.u64()?,
            text.column("title")?.str()?,
            text.column("description")?.str()?,
        ) {
            if let (Some(id), Some(title)) = (id, title) {
                texts.entry(id).or_insert_with(|| {
                    (
                        title.to_string(),
                        excerpt(description.unwrap_or_default(), self.config.excerpt_length),
                    )
                });
            }
        }

        let tag_rows = self
            .store
            .place_tags()?
            .join(
                page_ids,
                [col("place_id")],
                [col("place_id")],
                JoinArgs::new(JoinType::Semi),
            )
            .join(
                self.store
                    .tags()?
                    .filter(col("locale").eq(lit(locale.as_str()))),
                [col("tag_id")],
                [col("tag_id")],
                JoinArgs::new(JoinType::Inner),
            )
            .select([col("place_id"), col("slug"), col("name")])
            .sort(["name", "slug"], SortMultipleOptions::default())
            .collect()?;
        let mut tags: HashMap<u64, Vec<Tag>> = HashMap::new();
        for (id, slug, name) in izip!(
            tag_rows.column("place_id")?.u64()?,
            tag_rows.column("slug")?.str()?,
            tag_rows.column("name")?.str()?,
        ) {
            if let (Some(id), Some(slug), Some(name)) = (id, slug, name) {
                tags.entry(id).or_default().push(Tag {
                    slug: slug.to_string(),
                    name: name.to_string(),
                });
            }
        }

        Ok(page
            .into_iter()
            .filter_map(|c| {
                let (title, excerpt) = texts.remove(&c.id)?;
                Some(PlaceListItem {
                    id: c.id,
                    title,
                    excerpt,
                    tags: tags.remove(&c.id).unwrap_or_default(),
                    photo: c.photo,
                    latitude: c.latitude,
                    longitude: c.longitude,
                    distance_m: c.distance_m,
                })
            })
            .collect())
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum QueryError {
        #[error("DataFrame error: {0}")]
        DataFrame(#[from] polars::prelude::PolarsError),
        #[error("Data error: {0}")]
        Data(#[from] geoscout_data::DataError),
        #[error("Invalid cursor: {0}")]
        InvalidCursor(String),
        #[error("Cursor encoding error: {0}")]
        CursorEncoding(#[from] serde_json::Error),
    }

    pub type Result<T> = std::result::Result<T, QueryError>;
}
