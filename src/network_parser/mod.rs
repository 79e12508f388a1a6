//! Plex server access: library queries and asset downloads.

pub(crate) mod media_fetch;
pub(crate) mod plex;
