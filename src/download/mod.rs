//! Export pipeline.
//!
//! Submodules:
//! - `models`     — data model (LibraryItem / Season / ExportTarget / ExportReport …)
//! - `errors`     — fatal run errors and collaborator errors
//! - `traits`     — library query, transfer and filesystem-probe seams
//! - `plan`       — library selection and item enumeration
//! - `catalog`    — asset kind → (accessor, canonical filename)
//! - `decision`   — fetch-or-skip policy
//! - `progress`   — CLI progress bar
//! - `downloader` — export main flow and counters

pub mod catalog;
pub mod decision;
pub mod downloader;
pub mod errors;
pub mod models;
pub mod plan;
pub(crate) mod progress;
pub mod traits;
