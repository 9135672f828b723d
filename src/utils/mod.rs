//! Utility modules shared by the build engine.

pub mod glob;
pub mod minify;
pub mod path;
