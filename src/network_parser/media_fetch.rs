use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::Url;
use reqwest::blocking::Client;

use crate::download::errors::TransferError;
use crate::download::traits::AssetFetcher;

/// Downloads server resources (artwork, theme music) to local files.
///
/// The body is streamed into a temporary file next to the destination and
/// renamed into place, so a failed transfer never leaves a truncated asset.
#[derive(Clone)]
pub(crate) struct HttpAssetFetcher {
    client: Client,
    base_url: String,
}

impl HttpAssetFetcher {
    pub(crate) fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn fetch(&self, accessor: &str, dir: &Path, filename: &str) -> Result<PathBuf, TransferError> {
        if accessor.trim().is_empty() {
            return Err(TransferError::Other("empty resource accessor".to_string()));
        }
        let url = asset_url(&self.base_url, accessor)?;

        let mut resp = self.client.get(&url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                status: status.as_u16(),
            });
        }

        fs::create_dir_all(dir).map_err(|source| TransferError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".asset-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|source| TransferError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        resp.copy_to(&mut tmp)?;
        tmp.flush().map_err(|source| TransferError::Io {
            path: tmp.path().to_path_buf(),
            source,
        })?;

        let path = dir.join(filename);
        tmp.persist(&path).map_err(|e| TransferError::Io {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(path)
    }
}

/// Plex hands out server-relative accessors (`/library/metadata/1/thumb/…`).
/// Absolute urls are only accepted on the server itself, since the client
/// carries the token.
pub(crate) fn asset_url(base_url: &str, accessor: &str) -> Result<String, TransferError> {
    let accessor = accessor.trim();
    let base = base_url.trim_end_matches('/');
    if accessor.starts_with("http://") || accessor.starts_with("https://") {
        if !same_origin(base, accessor) {
            return Err(TransferError::OffServer {
                url: accessor.to_string(),
            });
        }
        return Ok(accessor.to_string());
    }
    if accessor.starts_with('/') {
        Ok(format!("{base}{accessor}"))
    } else {
        Ok(format!("{base}/{accessor}"))
    }
}

fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, ErrorKind};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::network_parser::plex::{PlexConfig, PlexServer};

    const TOKEN: &str = "SECRET-TOKEN";

    fn plex_fetcher(base_url: &str) -> HttpAssetFetcher {
        PlexServer::new(&PlexConfig {
            base_url: base_url.to_string(),
            token: TOKEN.to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Some(Duration::from_secs(1)),
            insecure_tls: false,
        })
        .unwrap()
        .asset_fetcher()
    }

    fn response(status: &str, headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\n{headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Answers a single request with `reply`; joins to the lowercased request head.
    fn serve_once(reply: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line.to_ascii_lowercase());
            }
            stream.write_all(reply.as_bytes()).unwrap();
            head
        });
        (base, handle)
    }

    /// Listener nobody answers; used to check that no connection was made.
    fn silent_host() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    fn never_contacted(listener: &TcpListener) -> bool {
        matches!(listener.accept(), Err(e) if e.kind() == ErrorKind::WouldBlock)
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn relative_accessors_are_joined_to_the_server() {
        assert_eq!(
            asset_url("http://plex:32400", "/library/metadata/1/thumb/99").unwrap(),
            "http://plex:32400/library/metadata/1/thumb/99"
        );
        assert_eq!(
            asset_url("http://plex:32400/", "library/metadata/1/theme/99").unwrap(),
            "http://plex:32400/library/metadata/1/theme/99"
        );
    }

    #[test]
    fn absolute_accessors_must_point_at_the_server() {
        assert_eq!(
            asset_url("http://plex:32400", "http://plex:32400/library/metadata/1/art/5").unwrap(),
            "http://plex:32400/library/metadata/1/art/5"
        );
        for foreign in [
            "https://metadata-static.plex.tv/p/poster.jpg",
            "http://plex:32401/library/metadata/1/art/5",
            "https://plex:32400/library/metadata/1/art/5",
        ] {
            assert!(matches!(
                asset_url("http://plex:32400", foreign),
                Err(TransferError::OffServer { .. })
            ));
        }
    }

    #[test]
    fn token_is_never_sent_to_another_host() {
        let (foreign, foreign_base) = silent_host();
        let dir = TempDir::new().unwrap();
        let fetcher = plex_fetcher("http://plex.invalid:32400");

        let err = fetcher
            .fetch(&format!("{foreign_base}/poster.jpg"), dir.path(), "poster.jpg")
            .unwrap_err();
        assert!(matches!(err, TransferError::OffServer { .. }));
        assert!(never_contacted(&foreign));
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn redirects_off_the_server_are_not_followed() {
        let (foreign, foreign_base) = silent_host();
        let (base, server) = serve_once(response(
            "302 Found",
            &format!("Location: {foreign_base}/poster.jpg\r\n"),
            "",
        ));
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("Heat (1995)");

        let err = plex_fetcher(&base)
            .fetch("/library/metadata/42/thumb/1", &target, "poster.jpg")
            .unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, TransferError::Status { status: 302 }));
        assert!(never_contacted(&foreign));
        assert!(!target.exists());
    }

    #[test]
    fn successful_transfer_writes_exactly_one_file() {
        let (base, server) = serve_once(response("200 OK", "", "JPEGDATA"));
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("Movies").join("Heat (1995)");

        let path = plex_fetcher(&base)
            .fetch("/library/metadata/42/thumb/1", &target, "poster.jpg")
            .unwrap();
        let head = server.join().unwrap();

        assert_eq!(path, target.join("poster.jpg"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "JPEGDATA");
        assert_eq!(entries(&target), ["poster.jpg"]);
        assert!(head.starts_with("get /library/metadata/42/thumb/1 http/1.1"));
        assert!(head.contains(&format!("x-plex-token: {}", TOKEN.to_ascii_lowercase())));
    }

    #[test]
    fn error_status_writes_nothing() {
        let (base, server) = serve_once(response("404 Not Found", "", "missing"));
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("Heat (1995)");

        let err = plex_fetcher(&base)
            .fetch("/library/metadata/42/art/1", &target, "background.jpg")
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, TransferError::Status { status: 404 }));
        assert!(!target.exists());
    }

    #[test]
    fn existing_file_is_replaced_whole() {
        let (base, server) = serve_once(response("200 OK", "", "NEW"));
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("theme.mp3"), "OLD-AND-LONGER").unwrap();

        plex_fetcher(&base)
            .fetch("/library/metadata/7/theme/1", dir.path(), "theme.mp3")
            .unwrap();
        server.join().unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("theme.mp3")).unwrap(), "NEW");
        assert_eq!(entries(dir.path()), ["theme.mp3"]);
    }

    #[test]
    fn empty_accessor_fails_without_touching_disk() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested");
        let fetcher = HttpAssetFetcher::new(Client::new(), "http://127.0.0.1:9".to_string());
        let err = fetcher.fetch("  ", &target, "poster.jpg").unwrap_err();
        assert!(matches!(err, TransferError::Other(_)));
        assert!(!target.exists());
    }
}
