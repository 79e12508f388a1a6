//! Interactive layer.
//!
//! Only the plain stdin/stdout front end exists; it owns every prompt and
//! every line printed to the terminal.

pub mod noui;
