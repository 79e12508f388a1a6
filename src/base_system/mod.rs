pub mod config;
pub mod context;
pub mod logging;
pub mod media_paths;
