use std::time::Duration;

use moka::sync::Cache;

use crate::{
    filter::{FilterModel, SearchMode},
    geo::BoundingBox,
    locale::Locale,
    query::{ListResult, MapResult},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum View {
    Map,
    List {
        page_size: usize,
        cursor: Option<String>,
    },
}

/// Canonical identity of a query. Two requests with the same signature always produce the
/// same result for the same store contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct QuerySignature {
    view: View,
    mode: SearchMode,
    center: Option<(u64, u64)>,
    radius: i64,
    /// Sorted; tag order never changes a result
    tags: Vec<String>,
    locale: Locale,
    bbox: Option<[u64; 4]>,
    page: u32,
}

impl QuerySignature {
    fn new(view: View, filters: &FilterModel, locale: &Locale, bbox: Option<&BoundingBox>) -> Self {
        let mut tags = filters.tags.clone();
        tags.sort_unstable();
        tags.dedup();
        Self {
            view,
            mode: filters.mode.clone(),
            center: filters
                .center()
                .map(|(lat, lng)| (lat.to_bits(), lng.to_bits())),
            radius: filters.radius,
            tags,
            locale: locale.clone(),
            bbox: bbox.map(|b| {
                [
                    b.north.to_bits(),
                    b.south.to_bits(),
                    b.east.to_bits(),
                    b.west.to_bits(),
                ]
            }),
            page: filters.page,
        }
    }

    pub(crate) fn map(filters: &FilterModel, locale: &Locale, bbox: Option<&BoundingBox>) -> Self {
        Self::new(View::Map, filters, locale, bbox)
    }

    pub(crate) fn list(
        filters: &FilterModel,
        locale: &Locale,
        bbox: &BoundingBox,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Self {
        let view = View::List {
            page_size,
            cursor: cursor.map(ToString::to_string),
        };
        Self::new(view, filters, locale, Some(bbox))
    }
}

/// Expiry-only result cache shared by all requests.
#[derive(Debug, Clone)]
pub(crate) struct ResultCache {
    maps: Cache<QuerySignature, MapResult>,
    lists: Cache<QuerySignature, ListResult>,
}

impl ResultCache {
    /// `None` when `ttl_seconds` is zero.
    pub(crate) fn new(max_entries: u64, ttl_seconds: u64) -> Option<Self> {
        if ttl_seconds == 0 {
            return None;
        }
        let max_capacity = max_entries.max(1);
        let ttl = Duration::from_secs(ttl_seconds);
        Some(Self {
            maps: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            lists: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        })
    }

    pub(crate) fn map(&self, key: &QuerySignature) -> Option<MapResult> {
        self.maps.get(key)
    }

    pub(crate) fn insert_map(&self, key: QuerySignature, result: MapResult) {
        self.maps.insert(key, result);
    }

    pub(crate) fn list(&self, key: &QuerySignature) -> Option<ListResult> {
        self.lists.get(key)
    }

    pub(crate) fn insert_list(&self, key: QuerySignature, result: ListResult) {
        self.lists.insert(key, result);
    }
}
