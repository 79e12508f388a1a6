use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::media_fetch::HttpAssetFetcher;
use crate::download::errors::QueryError;
use crate::download::models::{
    Episode, LibraryItem, LibrarySection, Media, MediaPart, MediaType, Season,
};
use crate::download::plan::is_exported;
use crate::download::traits::LibraryQuery;

const PLEX_TOKEN: HeaderName = HeaderName::from_static("x-plex-token");
const PLEX_PRODUCT: HeaderName = HeaderName::from_static("x-plex-product");
const PLEX_CLIENT_ID: HeaderName = HeaderName::from_static("x-plex-client-identifier");

#[derive(Debug, Clone)]
pub(crate) struct PlexConfig {
    pub base_url: String,
    pub token: String,
    pub request_timeout: Duration,
    pub connect_timeout: Option<Duration>,
    pub insecure_tls: bool,
}

/// Blocking client for the parts of the Plex HTTP API the exporter reads.
pub(crate) struct PlexServer {
    client: Client,
    base_url: String,
}

impl PlexServer {
    pub(crate) fn new(config: &PlexConfig) -> Result<Self, QueryError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(PLEX_PRODUCT, HeaderValue::from_static("Plex Assets Exporter"));
        headers.insert(
            PLEX_CLIENT_ID,
            HeaderValue::from_static(concat!("plex-assets-exporter-", env!("CARGO_PKG_VERSION"))),
        );
        let mut token = HeaderValue::from_str(config.token.trim())
            .map_err(|_| QueryError::Client("token contains invalid characters".to_string()))?;
        token.set_sensitive(true);
        headers.insert(PLEX_TOKEN, token);

        let mut builder = Client::builder()
            .default_headers(headers)
            .redirect(same_host_redirects())
            .danger_accept_invalid_certs(config.insecure_tls)
            .timeout(config.request_timeout);
        if let Some(connect) = config.connect_timeout {
            builder = builder.connect_timeout(connect);
        }
        let client = builder
            .build()
            .map_err(|e| QueryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetcher sharing this server's connection pool and auth headers.
    pub(crate) fn asset_fetcher(&self) -> HttpAssetFetcher {
        HttpAssetFetcher::new(self.client.clone(), self.base_url.clone())
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, QueryError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(target: "plex", "GET {url}");
        let resp = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|source| QueryError::Http {
                url: url.clone(),
                source,
            })?;
        let envelope: Envelope<T> = resp.json().map_err(|e| QueryError::Response {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(envelope.container)
    }

    fn show_children(&self, rating_key: &str, item: &mut LibraryItem) -> Result<(), QueryError> {
        let leaves: MetadataContainer =
            self.get(&format!("/library/metadata/{rating_key}/allLeaves"))?;
        let seasons: MetadataContainer =
            self.get(&format!("/library/metadata/{rating_key}/children"))?;
        attach_show_children(item, leaves, seasons);
        Ok(())
    }
}

impl LibraryQuery for PlexServer {
    fn sections(&self) -> Result<Vec<LibrarySection>, QueryError> {
        let container: SectionsContainer = self.get("/library/sections")?;
        Ok(into_sections(container))
    }

    fn items(
        &self,
        section: &LibrarySection,
        include_overlays: bool,
    ) -> Result<Vec<LibraryItem>, QueryError> {
        let listing: MetadataContainer =
            self.get(&format!("/library/sections/{}/all", section.key))?;

        let mut items = Vec::with_capacity(listing.metadata.len());
        for entry in listing.metadata {
            let rating_key = entry.rating_key.clone();
            let Some(mut item) = into_item(entry, section.media_type) else {
                continue;
            };
            if !is_exported(&item, include_overlays) {
                debug!(target: "plex", "excluding overlayed item: {}", item.title);
                continue;
            }
            if item.media_type == MediaType::Show {
                self.show_children(&rating_key, &mut item)?;
            }
            items.push(item);
        }
        Ok(items)
    }
}

/// Follow redirects only while they stay on the host the token was meant for.
fn same_host_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        let stays = attempt
            .previous()
            .first()
            .is_some_and(|first| first.origin() == attempt.url().origin());
        if stays && attempt.previous().len() < 10 {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

// ── wire format ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    container: T,
}

#[derive(Debug, Default, Deserialize)]
struct SectionsContainer {
    #[serde(rename = "Directory", default)]
    directories: Vec<DirectoryEntry>,
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    key: String,
    title: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<MetadataEntry>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    #[serde(rename = "ratingKey", default)]
    rating_key: String,
    #[serde(rename = "parentRatingKey", default)]
    parent_rating_key: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    thumb: Option<String>,
    #[serde(default)]
    art: Option<String>,
    #[serde(default)]
    banner: Option<String>,
    #[serde(default)]
    theme: Option<String>,
    #[serde(rename = "Media", default)]
    media: Vec<MediaEntry>,
    #[serde(rename = "Label", default)]
    labels: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct MediaEntry {
    #[serde(rename = "Part", default)]
    parts: Vec<PartEntry>,
}

#[derive(Debug, Deserialize)]
struct PartEntry {
    #[serde(default)]
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    tag: String,
}

// ── conversion ────────────────────────────────────────────────────

fn into_sections(container: SectionsContainer) -> Vec<LibrarySection> {
    container
        .directories
        .into_iter()
        .filter_map(|d| {
            let media_type = MediaType::from_plex(&d.kind)?;
            Some(LibrarySection {
                key: d.key,
                title: d.title,
                media_type,
            })
        })
        .collect()
}

fn into_media(entries: Vec<MediaEntry>) -> Vec<Media> {
    entries
        .into_iter()
        .map(|m| Media {
            parts: m
                .parts
                .into_iter()
                .filter_map(|p| p.file)
                .filter(|f| !f.is_empty())
                .map(|file| MediaPart { file })
                .collect(),
        })
        .collect()
}

fn into_item(entry: MetadataEntry, section_type: MediaType) -> Option<LibraryItem> {
    let media_type = match entry.kind.as_deref() {
        Some(kind) => MediaType::from_plex(kind)?,
        None => section_type,
    };
    let title = entry.title.unwrap_or_else(|| entry.rating_key.clone());

    let mut item = LibraryItem::new(title, media_type);
    item.poster = non_empty(entry.thumb);
    item.background = non_empty(entry.art);
    item.banner = non_empty(entry.banner);
    item.theme = non_empty(entry.theme);
    item.labels = entry.labels.into_iter().map(|l| l.tag).collect();
    if media_type == MediaType::Movie {
        item.media = into_media(entry.media);
    }
    Some(item)
}

/// Fill a show's episodes and seasons. Season episodes are taken from the
/// show's leaves via their parent key, which saves one request per season.
fn attach_show_children(
    item: &mut LibraryItem,
    leaves: MetadataContainer,
    seasons: MetadataContainer,
) {
    let mut by_season: HashMap<String, Vec<Episode>> = HashMap::new();
    let mut episodes = Vec::with_capacity(leaves.metadata.len());
    for leaf in leaves.metadata {
        let episode = Episode {
            media: into_media(leaf.media),
        };
        match leaf.parent_rating_key {
            Some(parent) => by_season.entry(parent).or_default().push(episode.clone()),
            None => warn!(target: "plex", "episode without season in {}", item.title),
        }
        episodes.push(episode);
    }

    item.episodes = episodes;
    item.seasons = seasons
        .metadata
        .into_iter()
        .filter(|s| s.kind.as_deref().is_none_or(|k| k == "season"))
        .map(|s| Season {
            episodes: by_season.remove(&s.rating_key).unwrap_or_default(),
            title: s.title,
            poster: non_empty(s.thumb),
        })
        .collect();
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: DeserializeOwned>(json: &str) -> T {
        serde_json::from_str::<Envelope<T>>(json).unwrap().container
    }

    #[test]
    fn sections_keep_only_movies_and_shows() {
        let container: SectionsContainer = parse(
            r#"{"MediaContainer":{"size":3,"Directory":[
                {"key":"1","title":"Movies","type":"movie"},
                {"key":"2","title":"Music","type":"artist"},
                {"key":"3","title":"TV Shows","type":"show"}
            ]}}"#,
        );
        let sections = into_sections(container);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Movies");
        assert_eq!(sections[1].media_type, MediaType::Show);
        assert_eq!(sections[1].key, "3");
    }

    #[test]
    fn movie_entry_maps_accessors_parts_and_labels() {
        let listing: MetadataContainer = parse(
            r#"{"MediaContainer":{"Metadata":[{
                "ratingKey":"42","type":"movie","title":"Heat",
                "thumb":"/library/metadata/42/thumb/1700000000",
                "art":"/library/metadata/42/art/1700000000",
                "Media":[{"Part":[{"file":"/movies/Heat (1995)/Heat.mkv"}]}],
                "Label":[{"tag":"Overlay"}]
            }]}}"#,
        );
        let entry = listing.metadata.into_iter().next().unwrap();
        let item = into_item(entry, MediaType::Movie).unwrap();

        assert_eq!(item.title, "Heat");
        assert_eq!(item.poster.as_deref(), Some("/library/metadata/42/thumb/1700000000"));
        assert_eq!(item.background.as_deref(), Some("/library/metadata/42/art/1700000000"));
        assert_eq!(item.banner, None);
        assert_eq!(item.theme, None);
        assert_eq!(item.media[0].parts[0].file, "/movies/Heat (1995)/Heat.mkv");
        assert!(item.is_overlayed());
    }

    #[test]
    fn overlay_check_is_exact() {
        let listing: MetadataContainer = parse(
            r#"{"MediaContainer":{"Metadata":[
                {"ratingKey":"1","type":"movie","title":"A","Label":[{"tag":"overlay"}]},
                {"ratingKey":"2","type":"movie","title":"B","Label":[{"tag":"Overlays"},{"tag":"Overlay"}]},
                {"ratingKey":"3","type":"movie","title":"C"}
            ]}}"#,
        );
        let flags: Vec<_> = listing
            .metadata
            .into_iter()
            .map(|e| into_item(e, MediaType::Movie).unwrap().is_overlayed())
            .collect();
        assert_eq!(flags, [false, true, false]);
    }

    #[test]
    fn unsupported_entry_types_are_dropped_and_blank_accessors_ignored() {
        let listing: MetadataContainer = parse(
            r#"{"MediaContainer":{"Metadata":[
                {"ratingKey":"7","type":"collection","title":"Box"},
                {"ratingKey":"8","title":"Untyped","thumb":""}
            ]}}"#,
        );
        let mut entries = listing.metadata.into_iter();
        assert!(into_item(entries.next().unwrap(), MediaType::Movie).is_none());
        let untyped = into_item(entries.next().unwrap(), MediaType::Show).unwrap();
        assert_eq!(untyped.media_type, MediaType::Show);
        assert_eq!(untyped.poster, None);
    }

    #[test]
    fn show_children_group_episodes_by_season() {
        let mut item = LibraryItem::new("Severance", MediaType::Show);
        let leaves: MetadataContainer = parse(
            r#"{"MediaContainer":{"Metadata":[
                {"ratingKey":"101","parentRatingKey":"11","type":"episode",
                 "Media":[{"Part":[{"file":"/tv/Severance/Season 01/S01E01.mkv"}]}]},
                {"ratingKey":"201","parentRatingKey":"12","type":"episode",
                 "Media":[{"Part":[{"file":"/tv/Severance/Season 02/S02E01.mkv"}]}]}
            ]}}"#,
        );
        let seasons: MetadataContainer = parse(
            r#"{"MediaContainer":{"Metadata":[
                {"ratingKey":"10","type":"season","title":"Specials","thumb":"/s/10"},
                {"ratingKey":"11","type":"season","title":"Season 1","thumb":"/s/11"},
                {"ratingKey":"12","type":"season","thumb":"/s/12"}
            ]}}"#,
        );

        attach_show_children(&mut item, leaves, seasons);

        assert_eq!(item.episodes.len(), 2);
        assert_eq!(item.seasons.len(), 3);
        assert!(item.seasons[0].episodes.is_empty());
        assert_eq!(item.seasons[1].title.as_deref(), Some("Season 1"));
        assert_eq!(
            item.seasons[1].episodes[0].media[0].parts[0].file,
            "/tv/Severance/Season 01/S01E01.mkv"
        );
        assert_eq!(item.seasons[2].title, None);
        assert_eq!(item.seasons[2].poster.as_deref(), Some("/s/12"));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let config = PlexConfig {
            base_url: "http://127.0.0.1:32400/".to_string(),
            token: "abc\ndef".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: None,
            insecure_tls: false,
        };
        assert!(matches!(PlexServer::new(&config), Err(QueryError::Client(_))));
    }

    #[test]
    fn base_url_is_normalized() {
        let config = PlexConfig {
            base_url: " http://127.0.0.1:32400/ ".to_string(),
            token: "token".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Some(Duration::from_secs(1)),
            insecure_tls: false,
        };
        let server = PlexServer::new(&config).unwrap();
        assert_eq!(server.base_url(), "http://127.0.0.1:32400");
    }
}
