//! Library surface of the `uplift` binary: config loading and text rendering.

pub mod config;
pub mod render;
