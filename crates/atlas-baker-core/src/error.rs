use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BakeError {
    #[error("Invalid dimensions: {width}x{height} (must be > 0)")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Nothing to bake")]
    Empty,
    #[error(
        "Texture for atlas slot {slot} is {width}x{height}, larger than the maximum page size {max_width}x{max_height}"
    )]
    OversizeTexture {
        slot: usize,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("Too many textures: placed {placed}/{total} across {pages} page(s)")]
    TooManyTextures {
        placed: usize,
        total: usize,
        pages: usize,
    },
    #[error("Sprite '{sprite}' is diced, which cannot be combined with multiple atlas pages")]
    DiceWithMultiplePages { sprite: String },
    #[error("Font parse error on line {line}: {message}")]
    FontParse { line: usize, message: String },
}

/// Machine-readable category for a failed build.
///
/// Capacity failures are split in two because they call for different fixes:
/// an oversize texture needs a larger page or a smaller sprite, while an
/// exhausted page budget needs more pages or fewer sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    OversizeTexture,
    CapacityExceeded,
    Configuration,
    InvalidInput,
}

impl BakeError {
    pub fn reason(&self) -> FailureReason {
        match self {
            BakeError::OversizeTexture { .. } => FailureReason::OversizeTexture,
            BakeError::TooManyTextures { .. } => FailureReason::CapacityExceeded,
            BakeError::InvalidDimensions { .. }
            | BakeError::InvalidConfig(_)
            | BakeError::DiceWithMultiplePages { .. } => FailureReason::Configuration,
            BakeError::Empty | BakeError::FontParse { .. } => FailureReason::InvalidInput,
        }
    }
}

pub type Result<T> = std::result::Result<T, BakeError>;
