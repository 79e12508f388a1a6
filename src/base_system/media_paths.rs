//! Destination directories derived from where an item's media lives.
//!
//! Movies export next to their file. Show files sit in a season folder below
//! the show root, so a show resolves two levels up and a season one level up.

use std::path::PathBuf;

use crate::download::errors::ExportError;
use crate::download::models::{Episode, LibraryItem, Media, MediaType, Season};

/// Directory for item-level assets (poster, background, banner, theme).
pub fn item_dir(item: &LibraryItem) -> Result<PathBuf, ExportError> {
    let (file, levels) = match item.media_type {
        MediaType::Movie => (first_media_file(&item.media), 1),
        MediaType::Show => (first_episode_file(&item.episodes), 2),
    };
    file.and_then(|f| strip_components(f, levels))
        .map(PathBuf::from)
        .ok_or_else(|| ExportError::PathUnresolvable {
            item: item.title.clone(),
            season: None,
        })
}

/// Directory for a season poster: the folder holding the season's first episode.
pub fn season_dir(item: &LibraryItem, season: &Season) -> Result<PathBuf, ExportError> {
    first_episode_file(&season.episodes)
        .and_then(|f| strip_components(f, 1))
        .map(PathBuf::from)
        .ok_or_else(|| ExportError::PathUnresolvable {
            item: item.title.clone(),
            season: Some(
                season
                    .title
                    .clone()
                    .unwrap_or_else(|| "untitled season".to_string()),
            ),
        })
}

fn first_media_file(media: &[Media]) -> Option<&str> {
    media
        .iter()
        .flat_map(|m| m.parts.iter())
        .map(|p| p.file.as_str())
        .next()
}

fn first_episode_file(episodes: &[Episode]) -> Option<&str> {
    episodes.iter().find_map(|e| first_media_file(&e.media))
}

/// Drop the last `levels` components of a server path.
///
/// Both separators are accepted since Windows-hosted servers report `\` paths.
fn strip_components(file: &str, levels: usize) -> Option<&str> {
    let mut rest = file;
    for _ in 0..levels {
        let idx = rest.rfind(['/', '\\'])?;
        rest = &rest[..idx];
    }
    (!rest.is_empty()).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::models::MediaPart;

    fn media(files: &[&str]) -> Media {
        Media {
            parts: files
                .iter()
                .map(|f| MediaPart {
                    file: f.to_string(),
                })
                .collect(),
        }
    }

    fn episode(files: &[&str]) -> Episode {
        Episode {
            media: vec![media(files)],
        }
    }

    #[test]
    fn movie_resolves_to_parent_of_first_part() {
        let mut item = LibraryItem::new("Heat", MediaType::Movie);
        item.media = vec![
            media(&["/movies/Heat (1995)/Heat.cd1.mkv", "/other/Heat.cd2.mkv"]),
            media(&["/elsewhere/Heat.4k.mkv"]),
        ];
        assert_eq!(item_dir(&item).unwrap(), PathBuf::from("/movies/Heat (1995)"));
    }

    #[test]
    fn movie_skips_empty_media_entries() {
        let mut item = LibraryItem::new("Heat", MediaType::Movie);
        item.media = vec![Media::default(), media(&["/movies/Heat/Heat.mkv"])];
        assert_eq!(item_dir(&item).unwrap(), PathBuf::from("/movies/Heat"));
    }

    #[test]
    fn show_resolves_to_grandparent_and_season_to_parent() {
        let mut item = LibraryItem::new("Severance", MediaType::Show);
        item.episodes = vec![
            Episode::default(),
            episode(&["/tv/Severance/Season 01/S01E01.mkv"]),
            episode(&["/tv/Elsewhere/Season 01/S01E02.mkv"]),
        ];
        let season = Season {
            title: Some("Season 1".to_string()),
            poster: None,
            episodes: vec![episode(&["/tv/Severance/Season 01/S01E01.mkv"])],
        };

        assert_eq!(item_dir(&item).unwrap(), PathBuf::from("/tv/Severance"));
        assert_eq!(
            season_dir(&item, &season).unwrap(),
            PathBuf::from("/tv/Severance/Season 01")
        );
    }

    #[test]
    fn windows_paths_are_split_on_backslash() {
        let mut item = LibraryItem::new("Heat", MediaType::Movie);
        item.media = vec![media(&[r"D:\Movies\Heat (1995)\Heat.mkv"])];
        assert_eq!(item_dir(&item).unwrap(), PathBuf::from(r"D:\Movies\Heat (1995)"));
    }

    #[test]
    fn missing_parts_are_unresolvable() {
        let item = LibraryItem::new("Empty", MediaType::Movie);
        assert!(matches!(
            item_dir(&item),
            Err(ExportError::PathUnresolvable { season: None, .. })
        ));

        let show = LibraryItem::new("Empty Show", MediaType::Show);
        assert!(item_dir(&show).is_err());

        let season = Season {
            title: Some("Specials".to_string()),
            ..Season::default()
        };
        match season_dir(&show, &season) {
            Err(ExportError::PathUnresolvable { item, season }) => {
                assert_eq!(item, "Empty Show");
                assert_eq!(season.as_deref(), Some("Specials"));
            }
            other => panic!("expected PathUnresolvable, got {other:?}"),
        }
    }

    #[test]
    fn too_shallow_paths_are_unresolvable() {
        let mut item = LibraryItem::new("Flat", MediaType::Show);
        item.episodes = vec![episode(&["/S01E01.mkv"])];
        assert!(item_dir(&item).is_err());
        item.episodes = vec![episode(&["Flat/S01E01.mkv"])];
        assert!(item_dir(&item).is_err());

        let mut movie = LibraryItem::new("Bare", MediaType::Movie);
        movie.media = vec![media(&["Bare.mkv"])];
        assert!(item_dir(&movie).is_err());
    }
}
