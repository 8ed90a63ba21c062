use hexview_core::HexCoord;

/// Errors raised while producing raster images.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The font data could not be parsed.
    #[error("invalid font data")]
    InvalidFont,
    /// A bitmap of the requested size could not be allocated.
    #[error("cannot allocate a {width}x{height} bitmap")]
    Allocation { width: u32, height: u32 },
    /// A hex descriptor failed validation during composition.
    #[error("malformed terrain at {coord}: {reason}")]
    InvalidTerrain {
        coord: HexCoord,
        reason: &'static str,
    },
    /// Composition was asked for a coordinate outside the board.
    #[error("hex {0} is not on the board")]
    OffBoard(HexCoord),
}
