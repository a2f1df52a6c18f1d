//! Colour nodes

mod rgb_remap;

pub use rgb_remap::RgbRemapNode;
