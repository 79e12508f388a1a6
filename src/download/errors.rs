//! Error types of the export pipeline and its collaborators.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while talking to the media server's library API.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("http client setup failed: {0}")]
    Client(String),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },
    #[error("unexpected response from {url}: {message}")]
    Response { url: String, message: String },
}

/// Failure of a single asset transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}")]
    Status { status: u16 },
    #[error("{url} is not on the Plex server")]
    OffServer { url: String },
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("{0}")]
    Other(String),
}

/// Fatal conditions that abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to extract the path of {}", describe(.item, .season.as_deref()))]
    PathUnresolvable {
        item: String,
        season: Option<String>,
    },
    #[error("download failed: {}: {source}", .path.display())]
    Transfer {
        path: PathBuf,
        #[source]
        source: TransferError,
    },
    #[error("no available libraries")]
    NoLibrariesAvailable,
    #[error(transparent)]
    Query(#[from] QueryError),
}

fn describe(item: &str, season: Option<&str>) -> String {
    match season {
        Some(season) => format!("\"{item}\" / \"{season}\""),
        None => format!("\"{item}\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolvable_message_names_item_and_season() {
        let err = ExportError::PathUnresolvable {
            item: "Severance".to_string(),
            season: Some("Season 2".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to extract the path of \"Severance\" / \"Season 2\""
        );

        let err = ExportError::PathUnresolvable {
            item: "Heat".to_string(),
            season: None,
        };
        assert_eq!(err.to_string(), "failed to extract the path of \"Heat\"");
    }

    #[test]
    fn transfer_message_names_destination() {
        let err = ExportError::Transfer {
            path: PathBuf::from("/movies/Heat (1995)/poster.jpg"),
            source: TransferError::Status { status: 404 },
        };
        assert_eq!(
            err.to_string(),
            "download failed: /movies/Heat (1995)/poster.jpg: server answered 404"
        );
    }
}
