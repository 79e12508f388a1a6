//! Which files an item or season contributes to an export.

use std::path::Path;

use super::models::{AssetKind, AssetRequest, ExportTarget, LibraryItem, Season};
use crate::base_system::context::safe_fs_name;

pub const POSTER_FILE: &str = "poster.jpg";
pub const BACKGROUND_FILE: &str = "background.jpg";
pub const BANNER_FILE: &str = "banner.jpg";
pub const THEME_FILE: &str = "theme.mp3";
pub const SPECIALS_POSTER_FILE: &str = "season-specials-poster.jpg";

const SPECIALS_TITLE: &str = "Specials";

/// Item-level targets in dir, always ordered poster, background, banner, theme.
pub fn candidates_for_item(
    item: &LibraryItem,
    request: AssetRequest,
    dir: &Path,
) -> Vec<ExportTarget> {
    let slots = [
        (AssetKind::Poster, item.poster.as_deref(), POSTER_FILE),
        (AssetKind::Background, item.background.as_deref(), BACKGROUND_FILE),
        (AssetKind::Banner, item.banner.as_deref(), BANNER_FILE),
        (AssetKind::Theme, item.theme.as_deref(), THEME_FILE),
    ];

    slots
        .into_iter()
        .filter(|(kind, _, _)| request.wants(*kind))
        .filter_map(|(kind, accessor, filename)| {
            let accessor = accessor?;
            Some(ExportTarget {
                kind,
                dir: dir.to_path_buf(),
                filename: filename.to_string(),
                accessor: accessor.to_string(),
            })
        })
        .collect()
}

/// The season poster target, if the season has both a poster and a title.
pub fn candidates_for_season(
    season: &Season,
    request: AssetRequest,
    dir: &Path,
) -> Vec<ExportTarget> {
    if !request.wants(AssetKind::SeasonPoster) {
        return Vec::new();
    }
    let (Some(accessor), Some(filename)) = (season.poster.as_deref(), season_poster_filename(season))
    else {
        return Vec::new();
    };
    vec![ExportTarget {
        kind: AssetKind::SeasonPoster,
        dir: dir.to_path_buf(),
        filename,
        accessor: accessor.to_string(),
    }]
}

pub fn season_poster_filename(season: &Season) -> Option<String> {
    let title = season.title.as_deref()?;
    if title == SPECIALS_TITLE {
        return Some(SPECIALS_POSTER_FILE.to_string());
    }
    Some(format!("{}.jpg", safe_fs_name(title, "_", 120)))
}
