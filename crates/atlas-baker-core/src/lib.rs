//! Core library for baking sprites into texture atlases.
//!
//! - Sources: whole textures or sheet regions, optional global downscale (box filter at 1/2 and 1/4)
//! - Processing: trim, pad (transparent/extend/wrap), premultiplied alpha, 16-bit dithering, dicing
//! - Packing: MaxRects portfolio (BAF/BSSF/BLSF/BL/CP), auto-sized pages, optional multi-page spill
//! - Geometry: quads, diced quads, triangulated custom polygons, box and extruded polygon colliders
//! - Fonts: BMFont glyphs baked alongside sprites, with per-glyph placement tables
//!
//! Quick example:
//! ```ignore
//! use atlas_baker_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let sheet = image::open("hero.png")?.to_rgba8();
//! let input = BakeInput {
//!     textures: vec![sheet],
//!     sprites: vec![SpriteRequest::new("hero", SourceRef::Texture(0))],
//!     fonts: vec![],
//! };
//! let out = bake(input, &BakeConfig::default())?;
//! println!("{}", out.stats().summary());
//! # Ok(()) }
//! ```

pub mod collider;
pub mod compositing;
pub mod config;
pub mod dedup;
pub mod dice;
pub mod dither;
pub mod error;
pub mod export;
pub mod font;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod process;
pub mod request;
pub mod source;
pub mod triangulate;

pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use pipeline::*;
pub use request::*;

/// Convenience prelude for common types and functions.
/// Importing `atlas_baker_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{
        BakeConfig, BakeConfigBuilder, DiceFilter, FilterMode, MaxRectsHeuristic, NormalGeneration, PadMode,
        PolygonCap, TextureCompression,
    };
    pub use crate::error::{BakeError, FailureReason};
    pub use crate::font::{FontDefinition, FontTable, GlyphPlacement, parse_bmfont};
    pub use crate::model::{AtlasPage, BakeStats, Bounds, ColliderGeometry, Placeholder, Rect, SpriteDefinition};
    pub use crate::request::{
        Anchor, AttachPointSpec, BakeInput, ColliderSpec, DiceSettings, FontRequest, GeometryIsland, SourceRef,
        SpriteRequest,
    };
    pub use crate::{BakeOutput, bake, to_json};
}
