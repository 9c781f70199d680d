use serde::{Deserialize, Serialize};

/// Whether the cursor moves toward the target or away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialType {
    Correct,
    Error,
}

impl TrialType {
    pub fn as_str(self) -> &'static str {
        match self {
            TrialType::Correct => "correct",
            TrialType::Error => "error",
        }
    }
}

/// Error subtype. The 1-D task can only reverse the movement, so `Opposite`
/// is the single kind ever produced; `None` marks correct trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    None,
    Opposite,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::None => "none",
            ErrorKind::Opposite => "opposite",
        }
    }
}

/// Horizontal movement direction along the position axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Signed single-step offset on the index axis.
    pub fn step(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Phase-entry timestamps, seconds relative to session zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PhaseTimes {
    pub trial_start: f64,
    pub target_onset: f64,
    pub movement_onset: f64,
    pub movement_end: f64,
    pub trial_end: f64,
}

/// One executed trial, frozen at trial end. Insertion order in the session's
/// record list is temporal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub subject_id: String,
    pub session_date: String,
    pub session_num: u32,
    /// Block 0 is the practice block.
    pub block_num: usize,
    /// 1-based within the block.
    pub trial_num: usize,
    pub trial_type: TrialType,
    pub error_kind: ErrorKind,
    pub start_idx: usize,
    pub target_idx: usize,
    pub end_idx: usize,
    pub start_x: f32,
    pub target_x: f32,
    pub end_x: f32,
    pub direction: Direction,
    pub times: PhaseTimes,
    pub response_key: Option<String>,
    pub response_time: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involutive() {
        assert_eq!(Direction::Left.opposite(), Direction::Right);
        assert_eq!(Direction::Right.opposite().opposite(), Direction::Right);
    }

    #[test]
    fn step_signs() {
        assert_eq!(Direction::Left.step(), -1);
        assert_eq!(Direction::Right.step(), 1);
    }

    #[test]
    fn labels_match_output_schema() {
        assert_eq!(TrialType::Error.as_str(), "error");
        assert_eq!(ErrorKind::Opposite.as_str(), "opposite");
        assert_eq!(ErrorKind::None.as_str(), "none");
        assert_eq!(Direction::Left.as_str(), "left");
    }
}
