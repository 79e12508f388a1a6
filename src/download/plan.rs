//! Library selection and export plan preparation.

use tracing::info;

use super::errors::ExportError;
use super::models::{LibraryItem, LibrarySection};
use super::traits::LibraryQuery;

/// Outcome of matching the requested library name against the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionChoice {
    Selected(LibrarySection),
    /// No name given, or the name matched nothing: the caller has to ask.
    Ask(Vec<LibrarySection>),
}

/// Overlay-labelled items only take part when overlays are included.
pub fn is_exported(item: &LibraryItem, include_overlays: bool) -> bool {
    include_overlays || !item.is_overlayed()
}

pub fn fetch_sections(query: &dyn LibraryQuery) -> Result<Vec<LibrarySection>, ExportError> {
    let sections = query.sections()?;
    if sections.is_empty() {
        return Err(ExportError::NoLibrariesAvailable);
    }
    Ok(sections)
}

pub fn choose_section(sections: Vec<LibrarySection>, wanted: Option<&str>) -> SectionChoice {
    if let Some(name) = wanted
        && let Some(section) = sections.iter().find(|s| s.title == name)
    {
        return SectionChoice::Selected(section.clone());
    }
    SectionChoice::Ask(sections)
}

#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub section: LibrarySection,
    pub items: Vec<LibraryItem>,
}

pub fn prepare_export_plan(
    query: &dyn LibraryQuery,
    section: LibrarySection,
    include_overlays: bool,
) -> Result<ExportPlan, ExportError> {
    let items = query.items(&section, include_overlays)?;
    info!(
        target: "plan",
        "library \"{}\" ({}): {} items (overlays {})",
        section.title,
        section.media_type,
        items.len(),
        if include_overlays { "included" } else { "excluded" }
    );
    Ok(ExportPlan { section, items })
}
