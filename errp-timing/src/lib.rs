pub mod clock;

pub use clock::{Clock, SessionClock, precise_sleep};
