use ahash::AHashMap as HashMap;
use geoscout_data::PlaceStoreData;
use polars::prelude::*;
use tracing::trace;

use super::{Tag, TagCatalog, error::Result};
use crate::locale::Locale;

/// [`TagCatalog`] over the store's `tags` frame, where `tag_id` is the shared identity
/// linking one concept's slugs across locales.
#[derive(Debug, Clone)]
pub struct FrameTagCatalog {
    store: PlaceStoreData,
}

impl FrameTagCatalog {
    pub fn new(store: PlaceStoreData) -> Self {
        Self { store }
    }

    fn locale_tags(&self, locale: &Locale) -> Result<LazyFrame> {
        Ok(self
            .store
            .tags()?
            .filter(col("locale").eq(lit(locale.as_str()))))
    }

    fn requested(slugs: &[String]) -> Result<LazyFrame> {
        let slugs: Vec<&str> = slugs.iter().map(String::as_str).collect();
        Ok(df!("slug" => slugs)?.lazy())
    }
}

fn tags_from_df(df: &DataFrame) -> Result<Vec<Tag>> {
    let slugs = df.column("slug")?.str()?;
    let names = df.column("name")?.str()?;
    Ok(slugs
        .into_iter()
        .zip(names)
        .filter_map(|(slug, name)| {
            Some(Tag {
                slug: slug?.to_string(),
                name: name?.to_string(),
            })
        })
        .collect())
}

impl TagCatalog for FrameTagCatalog {
    fn list_for_locale(&self, locale: &Locale) -> Result<Vec<Tag>> {
        let df = self
            .locale_tags(locale)?
            .select([col("slug"), col("name")])
            .sort(["name", "slug"], SortMultipleOptions::default())
            .collect()?;
        trace!(locale = %locale, rows = df.height(), "Listed tags");
        tags_from_df(&df)
    }

    fn search_by_name(&self, query: &str, locale: &Locale, limit: usize) -> Result<Vec<Tag>> {
        let needle = query.to_lowercase();
        Ok(self
            .list_for_locale(locale)?
            .into_iter()
            .filter(|tag| tag.name.to_lowercase().contains(&needle))
            .take(limit)
            .collect())
    }

    fn validate_slugs(&self, slugs: &[String], locale: &Locale) -> Result<Vec<String>> {
        let df = self
            .locale_tags(locale)?
            .join(
                Self::requested(slugs)?,
                [col("slug")],
                [col("slug")],
                JoinArgs::new(JoinType::Semi),
            )
            .select([col("slug")])
            .collect()?;
        Ok(df
            .column("slug")?
            .str()?
            .into_iter()
            .flatten()
            .map(ToString::to_string)
            .collect())
    }

    fn translate_slugs(
        &self,
        slugs: &[String],
        from: &Locale,
        to: &Locale,
    ) -> Result<Vec<String>> {
        let source = self
            .locale_tags(from)?
            .join(
                Self::requested(slugs)?,
                [col("slug")],
                [col("slug")],
                JoinArgs::new(JoinType::Semi),
            )
            .select([col("slug"), col("tag_id")])
            .collect()?;
        let target = self
            .locale_tags(to)?
            .join(
                source.clone().lazy().select([col("tag_id")]),
                [col("tag_id")],
                [col("tag_id")],
                JoinArgs::new(JoinType::Semi),
            )
            .select([col("tag_id"), col("slug")])
            .collect()?;

        let identity: HashMap<&str, u64> = source
            .column("slug")?
            .str()?
            .into_iter()
            .zip(source.column("tag_id")?.u64()?)
            .filter_map(|(slug, id)| Some((slug?, id?)))
            .collect();
        let counterpart: HashMap<u64, &str> = target
            .column("tag_id")?
            .u64()?
            .into_iter()
            .zip(target.column("slug")?.str()?)
            .filter_map(|(id, slug)| Some((id?, slug?)))
            .collect();

        Ok(slugs
            .iter()
            .filter_map(|slug| {
                identity
                    .get(slug.as_str())
                    .and_then(|id| counterpart.get(id))
                    .map(|s| (*s).to_string())
            })
            .collect())
    }
}
