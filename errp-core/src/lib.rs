pub mod position;
pub mod scene;
pub mod surface;
pub mod trial;

pub use position::PositionMap;
pub use scene::{Key, SceneElement};
pub use surface::{Surface, SurfaceError};
pub use trial::{Direction, ErrorKind, PhaseTimes, TrialRecord, TrialType};
