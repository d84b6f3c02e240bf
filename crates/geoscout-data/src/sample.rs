//! Deterministic sample place store.
//!
//! A dozen space-themed points of interest spread over three continents, translated into
//! English and French, with tags whose slugs differ per locale. Built for tests and
//! documentation; every coordinate is real so distance checks stay meaningful.
use itertools::multiunzip;
use polars::prelude::*;
use tracing::debug;

use crate::{
    PlaceStoreData,
    error::{DataError, Result},
};

/// The four raw frames behind [`sample_store`].
#[derive(Debug, Clone)]
pub struct SampleFrames {
    pub places: DataFrame,
    pub place_translations: DataFrame,
    pub tags: DataFrame,
    pub place_tags: DataFrame,
}

// (place_id, latitude, longitude, published_at, photo)
const PLACES: [(u64, f64, f64, &str, Option<&str>); 12] = [
    (1, 28.5729, -80.6490, "2024-01-10T09:00:00Z", Some("photos/ksc.jpg")),
    (2, 29.5593, -95.0900, "2024-01-20T09:00:00Z", Some("photos/jsc.jpg")),
    (3, 25.9971, -97.1554, "2024-02-01T09:00:00Z", None),
    (4, 34.1184, -118.3004, "2024-02-15T09:00:00Z", Some("photos/griffith.jpg")),
    (5, 48.8360, 2.3364, "2024-03-01T09:00:00Z", Some("photos/paris-obs.jpg")),
    (6, 43.5866, 1.4933, "2024-03-10T09:00:00Z", Some("photos/cite-espace.jpg")),
    (7, 5.2390, -52.7680, "2024-03-20T09:00:00Z", None),
    (8, 48.9463, 2.4335, "2024-03-01T09:00:00Z", Some("photos/le-bourget.jpg")),
    (9, 42.9364, 0.1425, "2024-04-01T09:00:00Z", Some("photos/pic-du-midi.jpg")),
    (10, 34.7420, -120.5724, "2024-04-15T09:00:00Z", None),
    (11, 19.8207, -155.4681, "2024-05-01T09:00:00Z", Some("photos/mauna-kea.jpg")),
    (12, 48.8663, 2.3108, "2024-03-01T09:00:00Z", None),
];

// (place_id, locale, title, description, published)
const TRANSLATIONS: [(u64, &str, &str, Option<&str>, bool); 22] = [
    (1, "en", "Kennedy Space Center", Some("Launch complex and visitor complex on Merritt Island, home of the Apollo and Shuttle programmes."), true),
    (1, "fr", "Centre spatial Kennedy", Some("Complexe de lancement et centre des visiteurs sur l'île Merritt."), true),
    (2, "en", "Johnson Space Center", Some("Mission control for human spaceflight, with Space Center Houston next door."), true),
    (2, "fr", "Centre spatial Johnson", Some("Centre de contrôle des vols habités près de Houston."), true),
    (3, "en", "Starbase", Some("Starship manufacturing and launch site at Boca Chica."), true),
    (3, "fr", "Starbase", Some("Site de fabrication et de lancement de Starship à Boca Chica."), true),
    (4, "en", "Griffith Observatory", Some("Public observatory and planetarium overlooking Los Angeles."), true),
    (4, "fr", "Observatoire Griffith", Some("Observatoire public et planétarium dominant Los Angeles."), true),
    (5, "en", "Paris Observatory", None, true),
    (5, "fr", "Observatoire de Paris", Some("Le plus ancien observatoire encore en activité."), true),
    (6, "en", "Cité de l'espace", Some("Space theme park in Toulouse with a full-size Ariane 5 mock-up."), true),
    (6, "fr", "Cité de l'espace", Some("Parc à thème consacré à l'espace à Toulouse."), true),
    (7, "fr", "Centre spatial guyanais", Some("Port spatial de l'Europe à Kourou."), true),
    (8, "en", "Air and Space Museum", Some("Aviation and space museum at Le Bourget airport."), true),
    (8, "fr", "Musée de l'Air et de l'Espace", Some("Musée de l'aéronautique et de l'espace au Bourget."), true),
    (9, "en", "Pic du Midi Observatory", Some("High-altitude observatory in the Pyrenees."), true),
    (9, "fr", "Observatoire du Pic du Midi", Some("Observatoire de haute montagne dans les Pyrénées."), true),
    (10, "en", "Vandenberg Space Force Base", Some("West coast launch site for polar orbits."), true),
    (10, "fr", "Base de Vandenberg", Some("Site de lancement de la côte ouest."), true),
    (11, "en", "Mauna Kea Observatories", Some("Summit observatories on the Big Island of Hawaii."), true),
    (12, "en", "Palais de la Découverte", Some("Science centre in the Grand Palais."), false),
    (12, "fr", "Palais de la Découverte", Some("Centre de culture scientifique au Grand Palais."), true),
];

// (tag_id, locale, slug, name)
const TAGS: [(u64, &str, &str, &str); 27] = [
    (1, "en", "nasa", "NASA"),
    (2, "en", "spacex", "SpaceX"),
    (3, "en", "observatory", "Observatory"),
    (4, "en", "museum", "Museum"),
    (5, "en", "launch-site", "Launch site"),
    (6, "en", "planetarium", "Planetarium"),
    (7, "en", "rocketry", "Rocketry"),
    (8, "en", "astronomy", "Astronomy"),
    (9, "en", "telescope", "Telescope"),
    (10, "en", "space-history", "Space history"),
    (11, "en", "science-center", "Science center"),
    (12, "en", "aviation", "Aviation"),
    (13, "en", "satellite", "Satellite"),
    (14, "en", "mission-control", "Mission control"),
    (15, "en", "visitor-center", "Visitor center"),
    (16, "en", "dark-sky", "Dark sky"),
    (1, "fr", "nasa", "NASA"),
    (2, "fr", "spacex", "SpaceX"),
    (3, "fr", "observatoire", "Observatoire"),
    (4, "fr", "musee", "Musée"),
    (5, "fr", "pas-de-tir", "Pas de tir"),
    (7, "fr", "fusees", "Fusées"),
    (8, "fr", "astronomie", "Astronomie"),
    (9, "fr", "telescope", "Télescope"),
    (11, "fr", "centre-scientifique", "Centre scientifique"),
    (12, "fr", "aviation", "Aviation"),
    (13, "fr", "satellite", "Satellite"),
];

// (place_id, tag_id)
const PLACE_TAGS: [(u64, u64); 24] = [
    (1, 1),
    (1, 2),
    (1, 4),
    (1, 5),
    (2, 1),
    (2, 4),
    (2, 14),
    (3, 2),
    (3, 5),
    (4, 3),
    (4, 4),
    (4, 6),
    (5, 3),
    (5, 8),
    (6, 4),
    (6, 6),
    (7, 5),
    (8, 4),
    (8, 12),
    (9, 3),
    (10, 2),
    (10, 5),
    (11, 3),
    (12, 4),
];

fn epoch_millis(timestamp: &str) -> Result<i64> {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| DataError::Timestamp(timestamp.to_string(), e))
}

/// Build the sample frames.
pub fn sample_frames() -> Result<SampleFrames> {
    let published_at = PLACES
        .iter()
        .map(|(_, _, _, ts, _)| epoch_millis(ts))
        .collect::<Result<Vec<_>>>()?;
    let (place_id, latitude, longitude, photo): (Vec<u64>, Vec<f64>, Vec<f64>, Vec<Option<&str>>) =
        multiunzip(PLACES.iter().map(|&(id, lat, lng, _, photo)| (id, lat, lng, photo)));
    let places = df!(
        "place_id" => place_id,
        "latitude" => latitude,
        "longitude" => longitude,
        "published_at" => published_at,
        "photo" => photo
    )?;

    let (t_place_id, t_locale, t_title, t_description, t_published): (
        Vec<u64>,
        Vec<&str>,
        Vec<&str>,
        Vec<Option<&str>>,
        Vec<bool>,
    ) = multiunzip(TRANSLATIONS);
    let place_translations = df!(
        "place_id" => t_place_id,
        "locale" => t_locale,
        "title" => t_title,
        "description" => t_description,
        "published" => t_published
    )?;

    let (tag_id, tag_locale, slug, name): (Vec<u64>, Vec<&str>, Vec<&str>, Vec<&str>) =
        multiunzip(TAGS);
    let tags = df!(
        "tag_id" => tag_id,
        "locale" => tag_locale,
        "slug" => slug,
        "name" => name
    )?;

    let (pt_place_id, pt_tag_id): (Vec<u64>, Vec<u64>) = PLACE_TAGS.into_iter().unzip();
    let place_tags = df!(
        "place_id" => pt_place_id,
        "tag_id" => pt_tag_id
    )?;

    debug!(
        places = places.height(),
        translations = place_translations.height(),
        tags = tags.height(),
        links = place_tags.height(),
        "Built sample frames"
    );

    Ok(SampleFrames {
        places,
        place_translations,
        tags,
        place_tags,
    })
}

/// In-memory [`PlaceStoreData`] over [`sample_frames`].
pub fn sample_store() -> Result<PlaceStoreData> {
    let frames = sample_frames()?;
    PlaceStoreData::from_frames(
        frames.places,
        frames.place_translations,
        frames.tags,
        frames.place_tags,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_timestamps_parse() {
        let frames = sample_frames().unwrap();
        let published = frames.places.column("published_at").unwrap().i64().unwrap();
        assert_eq!(published.null_count(), 0);
        assert!(published.into_iter().flatten().all(|ms| ms > 1_700_000_000_000));
    }

    #[test]
    fn test_invalid_timestamp_is_an_error() {
        assert!(matches!(
            epoch_millis("yesterday"),
            Err(DataError::Timestamp(..))
        ));
    }

    #[test]
    fn test_every_link_points_at_known_rows() {
        let place_ids: Vec<u64> = PLACES.iter().map(|p| p.0).collect();
        let tag_ids: Vec<u64> = TAGS.iter().map(|t| t.0).collect();
        for (place_id, tag_id) in PLACE_TAGS {
            assert!(place_ids.contains(&place_id), "unknown place {place_id}");
            assert!(tag_ids.contains(&tag_id), "unknown tag {tag_id}");
        }
    }
}
