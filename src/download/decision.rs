#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fetch,
    Skip,
}

/// Existing files are only replaced when overwriting is enabled.
pub fn decide(overwrite: bool, exists: bool) -> Decision {
    if !overwrite && exists {
        Decision::Skip
    } else {
        Decision::Fetch
    }
}
