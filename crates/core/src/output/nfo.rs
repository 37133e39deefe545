//! Kodi/Jellyfin style `.nfo` sidecars.

use quick_xml::escape::escape;

use crate::config::MediaType;
use crate::metadata::EnrichmentRecord;

/// Sidecar filename for a media type.
pub fn nfo_file_name(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movie.nfo",
        MediaType::TvShow => "tvshow.nfo",
        MediaType::EpisodeDetails => "episode.nfo",
        MediaType::Album => "album.nfo",
    }
}

/// Elements written for each media type, in document order.
fn fields(media_type: MediaType) -> &'static [&'static str] {
    match media_type {
        MediaType::Movie => &[
            "title",
            "originaltitle",
            "year",
            "releasedate",
            "rating",
            "plot",
            "tmdbid",
            "mpaa",
            "poster",
        ],
        MediaType::TvShow => &[
            "title",
            "originaltitle",
            "year",
            "rating",
            "plot",
            "id",
            "mpaa",
            "poster",
        ],
        MediaType::EpisodeDetails => &["title", "season", "episode", "aired", "plot", "id"],
        MediaType::Album => &[
            "title", "artist", "year", "genre", "rating", "plot", "id", "poster",
        ],
    }
}

fn field_value(record: &EnrichmentRecord, year: Option<&str>, field: &str) -> Option<String> {
    match field {
        "title" => Some(record.title.clone()),
        "originaltitle" => record.original_title.clone(),
        "year" => record.year.clone().or_else(|| year.map(String::from)),
        "releasedate" => record.release_date.clone(),
        "rating" => record.rating.map(|r| r.to_string()),
        "plot" => record.plot.clone(),
        "tmdbid" | "id" => record.catalog_id.clone(),
        "mpaa" => record.mpaa.clone(),
        "poster" => record.poster.clone(),
        "season" => record.season.clone(),
        "episode" => record.episode.clone(),
        "aired" => record.aired.clone(),
        "artist" => record.artist.clone(),
        "genre" => record.genre.clone(),
        _ => None,
    }
}

/// Render the sidecar document. Every field of the media type is present;
/// missing values become empty elements. `year` fills in when the record
/// has none.
pub fn render_nfo(
    media_type: MediaType,
    language: &str,
    year: Option<&str>,
    record: &EnrichmentRecord,
) -> String {
    let root = media_type.as_str();
    let mut lines = Vec::with_capacity(fields(media_type).len() + 4);
    lines.push(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#.to_string());
    lines.push(format!("<{}>", root));
    for field in fields(media_type) {
        let value = field_value(record, year, field).unwrap_or_default();
        lines.push(format!("  <{0}>{1}</{0}>", field, escape(value.as_str())));
    }
    lines.push(format!("  <language>{}</language>", escape(language)));
    lines.push(format!("</{}>", root));
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_file_names() {
        assert_eq!(nfo_file_name(MediaType::Movie), "movie.nfo");
        assert_eq!(nfo_file_name(MediaType::TvShow), "tvshow.nfo");
        assert_eq!(nfo_file_name(MediaType::EpisodeDetails), "episode.nfo");
        assert_eq!(nfo_file_name(MediaType::Album), "album.nfo");
    }

    #[test]
    fn test_movie_document() {
        let mut record = fixtures::enrichment("Inception", "2010");
        record.catalog_id = Some("27205".to_string());
        record.rating = Some(8.4);

        let nfo = render_nfo(MediaType::Movie, "en", Some("2010"), &record);
        assert!(nfo.starts_with("<?xml"));
        assert!(nfo.contains("<movie>\n  <title>Inception</title>"));
        assert!(nfo.contains("<year>2010</year>"));
        assert!(nfo.contains("<tmdbid>27205</tmdbid>"));
        assert!(nfo.contains("<rating>8.4</rating>"));
        assert!(nfo.contains("<mpaa></mpaa>"));
        assert!(nfo.contains("<language>en</language>"));
        assert!(nfo.trim_end().ends_with("</movie>"));
    }

    #[test]
    fn test_episode_fields() {
        let mut record = fixtures::enrichment("Pilot", "2008");
        record.aired = Some("2008-01-20".to_string());

        let nfo = render_nfo(MediaType::EpisodeDetails, "en", None, &record);
        assert!(nfo.contains("<episodedetails>"));
        assert!(nfo.contains("<aired>2008-01-20</aired>"));
        assert!(nfo.contains("<season></season>"));
        assert!(!nfo.contains("<poster>"));
    }

    #[test]
    fn test_values_are_escaped() {
        let mut record = fixtures::enrichment("Tom & Jerry <Remastered>", "1940");
        record.plot = None;

        let nfo = render_nfo(MediaType::Movie, "en", None, &record);
        assert!(nfo.contains("<title>Tom &amp; Jerry &lt;Remastered&gt;</title>"));
        assert!(nfo.contains("<plot></plot>"));
    }

    #[test]
    fn test_parsed_year_fills_missing_record_year() {
        let mut record = fixtures::enrichment("Heat", "1995");
        record.year = None;

        let nfo = render_nfo(MediaType::Movie, "en", Some("1995"), &record);
        assert!(nfo.contains("<year>1995</year>"));
    }
}
