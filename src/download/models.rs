//! Data model shared by the export pipeline.
//!
//! Library items arrive fully populated from the library collaborator: every
//! optional asset accessor is resolved once at ingestion, and shows carry their
//! episodes and seasons so the pipeline never has to query the server again.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;

/// Label Plex Meta Manager puts on items whose poster carries an overlay.
pub const OVERLAY_LABEL: &str = "Overlay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Movie,
    Show,
}

impl MediaType {
    pub fn from_plex(kind: &str) -> Option<Self> {
        match kind {
            "movie" => Some(Self::Movie),
            "show" => Some(Self::Show),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => f.write_str("movie"),
            Self::Show => f.write_str("show"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    /// File path as reported by the server (server-side filesystem).
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Media {
    pub parts: Vec<MediaPart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Episode {
    pub media: Vec<Media>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Season {
    pub title: Option<String>,
    pub poster: Option<String>,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryItem {
    pub title: String,
    pub media_type: MediaType,
    /// Movie files. Empty for shows.
    pub media: Vec<Media>,
    pub poster: Option<String>,
    pub background: Option<String>,
    pub banner: Option<String>,
    pub theme: Option<String>,
    pub labels: Vec<String>,
    /// Every episode of a show, in listing order. Empty for movies.
    pub episodes: Vec<Episode>,
    pub seasons: Vec<Season>,
}

impl LibraryItem {
    pub fn new(title: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            title: title.into(),
            media_type,
            media: Vec::new(),
            poster: None,
            background: None,
            banner: None,
            theme: None,
            labels: Vec::new(),
            episodes: Vec::new(),
            seasons: Vec::new(),
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn is_overlayed(&self) -> bool {
        self.has_label(OVERLAY_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,
    pub media_type: MediaType,
}

/// Which assets a run should export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AssetRequest {
    All,
    Posters,
    Backgrounds,
    Banners,
    Themes,
}

impl AssetRequest {
    pub fn wants(self, kind: AssetKind) -> bool {
        match self {
            Self::All => true,
            Self::Posters => matches!(kind, AssetKind::Poster | AssetKind::SeasonPoster),
            Self::Backgrounds => kind == AssetKind::Background,
            Self::Banners => kind == AssetKind::Banner,
            Self::Themes => kind == AssetKind::Theme,
        }
    }
}

impl fmt::Display for AssetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::All => "all",
            Self::Posters => "posters",
            Self::Backgrounds => "backgrounds",
            Self::Banners => "banners",
            Self::Themes => "themes",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Poster,
    Background,
    Banner,
    Theme,
    SeasonPoster,
}

/// One file the run may write: `dir/filename`, fetched from `accessor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub kind: AssetKind,
    pub dir: PathBuf,
    pub filename: String,
    pub accessor: String,
}

impl ExportTarget {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    pub downloaded: usize,
    pub skipped: usize,
}

/// Immutable settings for one export run.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub assets: AssetRequest,
    pub overwrite: bool,
    pub max_workers: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            assets: AssetRequest::All,
            overwrite: false,
            max_workers: 1,
        }
    }
}

/// Observable steps of a run, for verbose output and progress bars.
#[derive(Debug, Clone)]
pub enum ExportEvent {
    ItemStarted { title: String },
    Downloaded { path: PathBuf },
    Skipped { path: PathBuf },
    ItemFinished,
}
