//! Global configuration (`Config`) and its defaults.
//!
//! Also carries the field metadata used to write a commented `config.yml`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub library: String,

    // Network
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: f64,
    #[serde(default = "default_false")]
    pub insecure_tls: bool,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    // Export
    #[serde(default = "default_false")]
    pub overwrite: bool,
    #[serde(default = "default_false")]
    pub include_overlays: bool,

    // Logging
    #[serde(default = "default_true")]
    pub save_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            token: String::new(),
            library: String::new(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            insecure_tls: default_false(),
            max_workers: default_max_workers(),
            overwrite: default_false(),
            include_overlays: default_false(),
            save_log: default_true(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 10] = [
            FieldMeta {
                name: "server_url",
                description: "Plex server URL, e.g. http://127.0.0.1:32400 (empty: ask on start)",
            },
            FieldMeta {
                name: "token",
                description: "Plex authentication token / X-Plex-Token (empty: ask on start)",
            },
            FieldMeta {
                name: "library",
                description: "Library name to export from (empty: pick from a list)",
            },
            FieldMeta {
                name: "request_timeout",
                description: "Request timeout in seconds",
            },
            FieldMeta {
                name: "connect_timeout",
                description: "Connect timeout in seconds (0 disables)",
            },
            FieldMeta {
                name: "insecure_tls",
                description: "Accept invalid TLS certificates (self-signed Plex certs)",
            },
            FieldMeta {
                name: "max_workers",
                description: "Number of items exported in parallel (1 = strictly sequential)",
            },
            FieldMeta {
                name: "overwrite",
                description: "Overwrite existing assets",
            },
            FieldMeta {
                name: "include_overlays",
                description: "Also export items labelled \"Overlay\" by Plex Meta Manager",
            },
            FieldMeta {
                name: "save_log",
                description: "Write logs/latest.log and archive it on exit",
            },
        ];
        &FIELDS
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        if self.connect_timeout <= 0.0 {
            return None;
        }
        let ms = (self.connect_timeout * 1000.0).round() as u64;
        if ms == 0 {
            None
        } else {
            Some(Duration::from_millis(ms))
        }
    }

    /// Non-empty server url, stripped of trailing slashes.
    pub fn server_url(&self) -> Option<String> {
        let url = self.server_url.trim().trim_end_matches('/');
        (!url.is_empty()).then(|| url.to_string())
    }

    pub fn token(&self) -> Option<String> {
        let token = self.token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn library(&self) -> Option<&str> {
        let library = self.library.trim();
        (!library.is_empty()).then_some(library)
    }
}

/// Make `name` safe to use as a single path component.
///
/// Separators and characters Windows rejects are replaced, trailing dots and
/// spaces are dropped, and reserved device names get a leading underscore.
pub fn safe_fs_name(name: &str, replacement: &str, max_len: usize) -> String {
    let fallback = replacement.chars().next().unwrap_or('_');
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            ':' | '"' | '<' | '>' | '/' | '\\' | '|' | '?' | '*' => fallback,
            c if (c as u32) < 32 => fallback,
            _ => ch,
        })
        .collect();

    while cleaned.ends_with(' ') || cleaned.ends_with('.') {
        cleaned.pop();
    }

    if cleaned.is_empty() {
        cleaned.push_str("unnamed");
    }

    const RESERVED: [&str; 22] = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let upper = cleaned.to_uppercase();
    if RESERVED.contains(&upper.as_str()) {
        cleaned = format!("_{}", cleaned);
    }

    if cleaned.len() > max_len {
        // Never cut inside a multi-byte character.
        let mut end = max_len;
        while !cleaned.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        cleaned.truncate(end);
        while cleaned.ends_with(' ') || cleaned.ends_with('.') {
            cleaned.pop();
        }
        if cleaned.is_empty() {
            cleaned.push_str("unnamed");
        }
    }

    cleaned
}

fn default_false() -> bool {
    false
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> f64 {
    5.0
}

fn default_max_workers() -> usize {
    1
}
