//! Pure Rust skeleton model and clipping for Spine exported data (unofficial).
//!
//! This crate is renderer-agnostic: it poses a skeleton, clips attachment triangles against
//! clipping attachments and produces a flat [`DrawList`] for a host renderer to upload.

#![forbid(unsafe_code)]

mod clipping;
mod error;
pub mod geometry;
mod model;
pub mod ordered_map;
mod render;
mod runtime;
mod version;

#[cfg(feature = "json")]
pub mod json;

pub use clipping::*;
pub use error::*;
pub use geometry::{ClosedPolygon, Triangulator, make_clockwise, signed_area};
pub use model::*;
pub use ordered_map::{Cursor, OrderedMap};
pub use render::*;
pub use runtime::*;
pub use version::*;

#[cfg(test)]
mod ordered_map_tests;




#[cfg(test)]
mod version_tests;
