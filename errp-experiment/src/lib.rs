pub mod config;
pub mod output;
pub mod sequence;
pub mod session;
pub mod trial;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError};
pub use output::{CsvSink, RecordSink};
pub use sequence::{generate_sequence, target_position};
pub use session::{Session, SessionError, SessionInfo};
