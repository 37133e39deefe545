//! TMDB (The Movie Database) metadata provider.
//!
//! Movies go through `search/movie`, tv shows and episodes through
//! `search/tv`. The first search result is taken as the answer. TMDB has no
//! music catalog, so albums never resolve.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{EnrichmentRecord, MetadataError, MetadataProvider, MetadataQuery};
use crate::config::{MediaType, MetadataProviderConfig};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

pub struct TmdbProvider {
    name: String,
    client: Client,
    base_url: String,
    api_key: String,
    image_base_url: String,
}

impl TmdbProvider {
    pub fn new(config: &MetadataProviderConfig) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let image_base_url = config
            .image_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.to_string());

        Ok(Self {
            name: config.name.clone(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn search_movies(
        &self,
        query: &MetadataQuery,
    ) -> Result<Vec<TmdbMovieResult>, MetadataError> {
        debug!(
            "TMDB movie search: query='{}', year={:?}",
            query.title, query.year
        );
        self.search("movie", query, "year").await
    }

    async fn search_tv(&self, query: &MetadataQuery) -> Result<Vec<TmdbTvResult>, MetadataError> {
        debug!(
            "TMDB TV search: query='{}', year={:?}",
            query.title, query.year
        );
        self.search("tv", query, "first_air_date_year").await
    }

    async fn search<T: DeserializeOwned>(
        &self,
        kind: &str,
        query: &MetadataQuery,
        year_param: &str,
    ) -> Result<Vec<T>, MetadataError> {
        let url = format!("{}/search/{}", self.base_url, kind);

        let mut request = self.client.get(&url).query(&[
            ("api_key", self.api_key.as_str()),
            ("query", query.title.as_str()),
            ("language", query.language.as_str()),
        ]);
        if let Some(year) = &query.year {
            request = request.query(&[(year_param, year.as_str())]);
        }

        let response = request.send().await?;

        let status = response.status();
        if status == 401 {
            return Err(MetadataError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        if status == 429 {
            return Err(MetadataError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let search_result: TmdbSearchResponse<T> = response.json().await.map_err(|e| {
            MetadataError::ParseError(format!("Failed to parse {} search response: {}", kind, e))
        })?;

        Ok(search_result.results)
    }

    fn poster_url(&self, poster_path: Option<String>) -> Option<String> {
        poster_path.map(|path| format!("{}/w500{}", self.image_base_url, path))
    }

    fn movie_record(&self, movie: TmdbMovieResult) -> EnrichmentRecord {
        EnrichmentRecord {
            title: movie.title,
            original_title: movie.original_title,
            year: year_of(movie.release_date.as_deref()),
            release_date: movie.release_date.filter(|d| !d.is_empty()),
            rating: movie.vote_average,
            plot: movie.overview.filter(|o| !o.is_empty()),
            catalog_id: Some(movie.id.to_string()),
            poster: self.poster_url(movie.poster_path),
            ..Default::default()
        }
    }

    fn tv_record(&self, show: TmdbTvResult, media_type: MediaType) -> EnrichmentRecord {
        let release_date = show.first_air_date.filter(|d| !d.is_empty());
        let aired = match media_type {
            MediaType::EpisodeDetails => release_date.clone(),
            _ => None,
        };

        EnrichmentRecord {
            title: show.name,
            original_title: show.original_name,
            year: year_of(release_date.as_deref()),
            release_date,
            rating: show.vote_average,
            plot: show.overview.filter(|o| !o.is_empty()),
            catalog_id: Some(show.id.to_string()),
            poster: self.poster_url(show.poster_path),
            aired,
            ..Default::default()
        }
    }

    async fn lookup(&self, query: &MetadataQuery) -> Result<Option<EnrichmentRecord>, MetadataError> {
        let record = match query.media_type {
            MediaType::Movie => self
                .search_movies(query)
                .await?
                .into_iter()
                .next()
                .map(|movie| self.movie_record(movie)),
            MediaType::TvShow | MediaType::EpisodeDetails => self
                .search_tv(query)
                .await?
                .into_iter()
                .next()
                .map(|show| self.tv_record(show, query.media_type)),
            MediaType::Album => {
                debug!("TMDB has no album catalog, skipping '{}'", query.title);
                None
            }
        };
        Ok(record)
    }
}

/// Leading four characters of a `YYYY-MM-DD` date.
fn year_of(date: Option<&str>) -> Option<String> {
    date.and_then(|d| d.get(..4)).map(String::from)
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_info(&self, query: &MetadataQuery) -> Option<EnrichmentRecord> {
        match self.lookup(query).await {
            Ok(Some(record)) => {
                debug!(
                    "TMDB resolved '{}' to '{}' (id {:?})",
                    query.title, record.title, record.catalog_id
                );
                Some(record)
            }
            Ok(None) => {
                debug!("TMDB has no result for '{}'", query.title);
                None
            }
            Err(e) => {
                warn!("TMDB lookup for '{}' failed: {}", query.title, e);
                None
            }
        }
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct TmdbSearchResponse<T> {
    #[serde(default)]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieResult {
    id: u32,
    title: String,
    original_title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvResult {
    id: u32,
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn provider() -> TmdbProvider {
        TmdbProvider::new(&fixtures::provider_config("tmdb")).unwrap()
    }

    #[test]
    fn test_year_of() {
        assert_eq!(year_of(Some("2010-07-15")), Some("2010".to_string()));
        assert_eq!(year_of(Some("")), None);
        assert_eq!(year_of(None), None);
    }

    #[test]
    fn test_movie_record_from_search_result() {
        let json = r#"{
            "results": [{
                "id": 27205,
                "title": "Inception",
                "original_title": "Inception",
                "release_date": "2010-07-15",
                "overview": "Cobb steals secrets.",
                "poster_path": "/inception.jpg",
                "vote_average": 8.4,
                "genre_ids": [28, 878]
            }]
        }"#;
        let response: TmdbSearchResponse<TmdbMovieResult> = serde_json::from_str(json).unwrap();
        let movie = response.results.into_iter().next().unwrap();

        let record = provider().movie_record(movie);
        assert_eq!(record.title, "Inception");
        assert_eq!(record.year.as_deref(), Some("2010"));
        assert_eq!(record.release_date.as_deref(), Some("2010-07-15"));
        assert_eq!(record.catalog_id.as_deref(), Some("27205"));
        assert_eq!(
            record.poster.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/inception.jpg")
        );
        assert!(record.aired.is_none());
    }

    #[test]
    fn test_tv_record_for_episode_sets_aired() {
        let json = r#"{
            "results": [{
                "id": 1396,
                "name": "Breaking Bad",
                "original_name": "Breaking Bad",
                "first_air_date": "2008-01-20",
                "overview": "",
                "poster_path": null,
                "vote_average": 8.9
            }]
        }"#;
        let response: TmdbSearchResponse<TmdbTvResult> = serde_json::from_str(json).unwrap();
        let show = response.results.into_iter().next().unwrap();

        let record = provider().tv_record(show, MediaType::EpisodeDetails);
        assert_eq!(record.title, "Breaking Bad");
        assert_eq!(record.year.as_deref(), Some("2008"));
        assert_eq!(record.aired.as_deref(), Some("2008-01-20"));
        assert!(record.plot.is_none());
        assert!(record.poster.is_none());
    }

    #[test]
    fn test_missing_results_field_is_empty() {
        let response: TmdbSearchResponse<TmdbMovieResult> =
            serde_json::from_str(r#"{"page": 1}"#).unwrap();
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_album_is_never_resolved() {
        let query = MetadataQuery::new("Abbey Road", None, MediaType::Album, "en");
        assert!(provider().fetch_info(&query).await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_absent() {
        let mut config = fixtures::provider_config("tmdb");
        config.base_url = Some("http://127.0.0.1:9".to_string());
        config.timeout_secs = 2;
        let provider = TmdbProvider::new(&config).unwrap();

        let query = MetadataQuery::new("Inception", None, MediaType::Movie, "en");
        assert!(provider.fetch_info(&query).await.is_none());
    }
}
