use hexview_core::HexCoord;
use hexview_render::RenderError;

/// Errors returned by [`BoardView`](crate::BoardView) operations.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Render(#[from] RenderError),
    /// An edit addressed a hex outside the board.
    #[error("hex {0} is not on the board")]
    OffBoard(HexCoord),
}
