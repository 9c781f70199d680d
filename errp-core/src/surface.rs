use thiserror::Error;

use crate::scene::{Key, SceneElement};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("presentation surface backend error: {0}")]
    Backend(String),
    #[error("presentation surface closed")]
    Closed,
}

/// Narrow presentation interface. The core pushes abstract scene elements
/// and polls for operator input; the surface owns no experiment state.
pub trait Surface {
    /// Replaces the pending frame with the given scene.
    fn draw_frame(&mut self, scene: &[SceneElement]) -> Result<(), SurfaceError>;

    /// Presents the pending frame.
    fn flip(&mut self) -> Result<(), SurfaceError>;

    /// True once the operator has requested an abort. Polled at the top of
    /// every phase and on every refresh tick.
    fn poll_escape(&mut self) -> Result<bool, SurfaceError>;

    /// Blocks until one of `keys` is pressed and returns it. `Key::Escape`
    /// is always reported, whether listed or not.
    fn wait_for_key(&mut self, keys: &[Key]) -> Result<Key, SurfaceError>;
}
