/// Abstract draw commands handed to the presentation surface. Coordinates
/// are logical pixels relative to the screen center (positive x rightward);
/// colors and sizes are owned by the renderer, not the experiment core.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneElement {
    /// Central fixation cross.
    Fixation,
    /// Cursor disc at the given x coordinate on the movement axis.
    Cursor { x: f32 },
    /// Target disc; `reached` switches it to the feedback color.
    Target { x: f32, reached: bool },
    /// Centered block of instruction text.
    Text { content: String },
    /// "TARGET REACHED!" style banner above the movement axis.
    Banner { content: String },
}

/// Keys the experiment core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Enter,
    Escape,
}
