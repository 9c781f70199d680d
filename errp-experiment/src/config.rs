use serde::Serialize;
use thiserror::Error;

/// Seconds of instruction reading assumed by the duration estimate.
const INSTRUCTION_TIME_S: f64 = 120.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown preset '{0}' (run with 'help' to list presets)")]
    UnknownPreset(String),
    #[error("invalid configuration: {0}")]
    InvalidParameter(String),
}

/// A named bundle of timing/count parameters. Presets only tune the fixed
/// schema below; they cannot introduce new parameter names.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub n_practice_trials: usize,
    pub n_blocks: usize,
    pub n_trials_per_block: usize,
    pub iti_min: f64,
    pub iti_max: f64,
    pub target_presentation: f64,
    pub movement_duration: f64,
    pub post_movement: f64,
    pub break_duration: f64,
    pub error_rate: f64,
    pub show_target_reached: bool,
    pub target_reached_duration: f64,
}

/// Registered presets, in presentation order.
pub fn preset_names() -> Vec<&'static str> {
    vec!["paper", "quick", "full", "debug", "v1_style"]
}

pub fn preset(key: &str) -> Option<Preset> {
    let preset = match key {
        // Original Chavarriaga & Millán (2010) parameters.
        "paper" => Preset {
            name: "Paper Standard",
            description: "Original Chavarriaga & Millán (2010) parameters",
            n_practice_trials: 20,
            n_blocks: 3,
            n_trials_per_block: 80,
            iti_min: 1.5,
            iti_max: 2.5,
            target_presentation: 0.5,
            movement_duration: 0.5,
            post_movement: 0.5,
            break_duration: 60.0,
            error_rate: 0.25,
            show_target_reached: false,
            target_reached_duration: 0.0,
        },
        "quick" => Preset {
            name: "Quick Session",
            description: "Shortened version (~10 minutes)",
            n_practice_trials: 10,
            n_blocks: 2,
            n_trials_per_block: 40,
            iti_min: 1.0,
            iti_max: 1.5,
            target_presentation: 0.5,
            movement_duration: 0.5,
            post_movement: 0.3,
            break_duration: 30.0,
            error_rate: 0.25,
            show_target_reached: false,
            target_reached_duration: 0.0,
        },
        "full" => Preset {
            name: "Full Session",
            description: "Extended session for maximum data collection",
            n_practice_trials: 20,
            n_blocks: 4,
            n_trials_per_block: 60,
            iti_min: 1.0,
            iti_max: 1.5,
            target_presentation: 0.5,
            movement_duration: 0.5,
            post_movement: 0.5,
            break_duration: 30.0,
            error_rate: 0.25,
            show_target_reached: false,
            target_reached_duration: 0.0,
        },
        "debug" => Preset {
            name: "Debug Mode",
            description: "Minimal trials for testing",
            n_practice_trials: 3,
            n_blocks: 1,
            n_trials_per_block: 10,
            iti_min: 0.5,
            iti_max: 0.8,
            target_presentation: 0.3,
            movement_duration: 0.3,
            post_movement: 0.2,
            break_duration: 5.0,
            error_rate: 0.3,
            show_target_reached: true,
            target_reached_duration: 0.5,
        },
        // First-version task behavior, with TARGET REACHED feedback.
        "v1_style" => Preset {
            name: "Version 1 Style",
            description: "First-version behavior with success feedback",
            n_practice_trials: 15,
            n_blocks: 2,
            n_trials_per_block: 30,
            iti_min: 0.5,
            iti_max: 0.5,
            target_presentation: 1.0,
            movement_duration: 0.8,
            post_movement: 0.0,
            break_duration: 30.0,
            error_rate: 0.2,
            show_target_reached: true,
            target_reached_duration: 1.0,
        },
        _ => return None,
    };
    Some(preset)
}

/// Fully resolved, immutable run configuration: preset fields merged over
/// the fixed parameter table, plus derived values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub preset_key: String,
    pub name: String,
    pub description: String,

    // Preset-tuned parameters.
    pub n_practice_trials: usize,
    pub n_blocks: usize,
    pub n_trials_per_block: usize,
    pub iti_min: f64,
    pub iti_max: f64,
    pub target_presentation: f64,
    pub movement_duration: f64,
    pub post_movement: f64,
    pub break_duration: f64,
    pub error_rate: f64,
    pub show_target_reached: bool,
    pub target_reached_duration: f64,

    // Fixed spatial parameters.
    pub n_positions: usize,
    pub start_position_idx: usize,
    pub min_target_distance: usize,

    // Fixed sequencing constraints.
    pub max_consecutive_errors: usize,
    pub max_consecutive_correct: usize,

    // Fixed visual parameters.
    pub window_size: (u32, u32),
    pub fullscreen: bool,
    pub cursor_radius: f32,
    pub target_radius: f32,
    pub fixation_size: f32,
    pub background_color: [u8; 4],
    pub cursor_color: [u8; 4],
    pub target_color: [u8; 4],
    pub target_reached_color: [u8; 4],
    pub fixation_color: [u8; 4],
    pub text_color: [u8; 4],

    // Derived.
    pub total_trials: usize,
    pub estimated_duration_minutes: f64,
}

/// Pure lookup-and-merge: no randomness, no hidden counters, so resolving
/// the same name twice yields identical values.
pub fn resolve(preset_key: &str) -> Result<Config, ConfigError> {
    let preset =
        preset(preset_key).ok_or_else(|| ConfigError::UnknownPreset(preset_key.to_string()))?;

    let mut config = Config {
        preset_key: preset_key.to_string(),
        name: preset.name.to_string(),
        description: preset.description.to_string(),

        n_practice_trials: preset.n_practice_trials,
        n_blocks: preset.n_blocks,
        n_trials_per_block: preset.n_trials_per_block,
        iti_min: preset.iti_min,
        iti_max: preset.iti_max,
        target_presentation: preset.target_presentation,
        movement_duration: preset.movement_duration,
        post_movement: preset.post_movement,
        break_duration: preset.break_duration,
        error_rate: preset.error_rate,
        show_target_reached: preset.show_target_reached,
        target_reached_duration: preset.target_reached_duration,

        n_positions: 20,
        start_position_idx: 10,
        min_target_distance: 3,

        max_consecutive_errors: 3,
        max_consecutive_correct: 5,

        window_size: (1920, 1080),
        fullscreen: true,
        cursor_radius: 15.0,
        target_radius: 20.0,
        fixation_size: 30.0,
        background_color: [0, 0, 0, 255],
        cursor_color: [255, 255, 255, 255],
        target_color: [0, 255, 0, 255],
        target_reached_color: [255, 255, 0, 255],
        fixation_color: [255, 255, 255, 255],
        text_color: [255, 255, 255, 255],

        total_trials: 0,
        estimated_duration_minutes: 0.0,
    };

    config.total_trials = config.n_blocks * config.n_trials_per_block;
    config.estimated_duration_minutes = estimate_duration_minutes(&config);
    config.validate()?;
    Ok(config)
}

fn estimate_duration_minutes(config: &Config) -> f64 {
    let avg_iti = (config.iti_min + config.iti_max) / 2.0;
    let mut trial_duration =
        avg_iti + config.target_presentation + config.movement_duration + config.post_movement;
    if config.show_target_reached {
        trial_duration += config.target_reached_duration;
    }

    let practice_time = config.n_practice_trials as f64 * trial_duration;
    let experimental_time = config.total_trials as f64 * trial_duration;
    let break_time = (config.n_blocks as f64 - 1.0) * config.break_duration;

    (practice_time + experimental_time + break_time + INSTRUCTION_TIME_S) / 60.0
}

impl Config {
    /// Rejects malformed parameters before any stimulus is shown. Every
    /// violation here is fatal; nothing is discovered mid-trial.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::InvalidParameter(msg));

        if !(0.0..=1.0).contains(&self.error_rate) {
            return fail(format!("error_rate {} outside [0, 1]", self.error_rate));
        }
        if self.max_consecutive_errors < 1 || self.max_consecutive_correct < 1 {
            return fail("run-length maxima must be at least 1".into());
        }
        if self.n_positions < 2 {
            return fail(format!("n_positions {} < 2", self.n_positions));
        }
        if self.start_position_idx >= self.n_positions {
            return fail(format!(
                "start_position_idx {} outside [0, {})",
                self.start_position_idx, self.n_positions
            ));
        }
        if self.iti_min > self.iti_max {
            return fail(format!(
                "iti_min {} exceeds iti_max {}",
                self.iti_min, self.iti_max
            ));
        }
        for (label, value) in [
            ("iti_min", self.iti_min),
            ("target_presentation", self.target_presentation),
            ("movement_duration", self.movement_duration),
            ("post_movement", self.post_movement),
            ("break_duration", self.break_duration),
            ("target_reached_duration", self.target_reached_duration),
        ] {
            if value < 0.0 {
                return fail(format!("{label} is negative ({value})"));
            }
        }

        let satisfiable = (0..self.n_positions)
            .any(|i| i.abs_diff(self.start_position_idx) >= self.min_target_distance);
        if !satisfiable {
            return fail(format!(
                "no position satisfies min_target_distance {} from start index {}",
                self.min_target_distance, self.start_position_idx
            ));
        }

        Ok(())
    }

    /// Operator-facing preset summary, shown before the session starts.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let line = "=".repeat(60);
        out.push_str(&format!("{line}\nPRESET: {}\n{line}\n", self.name));
        out.push_str(&format!("Description: {}\n", self.description));
        out.push_str("\nSession Structure:\n");
        out.push_str(&format!("  Practice trials: {}\n", self.n_practice_trials));
        out.push_str(&format!("  Experimental blocks: {}\n", self.n_blocks));
        out.push_str(&format!("  Trials per block: {}\n", self.n_trials_per_block));
        out.push_str(&format!("  Total trials: {}\n", self.total_trials));
        out.push_str("\nTiming:\n");
        out.push_str(&format!(
            "  ITI: {:.1}-{:.1}s\n",
            self.iti_min, self.iti_max
        ));
        out.push_str(&format!(
            "  Target presentation: {:.1}s\n",
            self.target_presentation
        ));
        out.push_str(&format!(
            "  Movement duration: {:.1}s\n",
            self.movement_duration
        ));
        out.push_str(&format!("  Post-movement: {:.1}s\n", self.post_movement));
        out.push_str(&format!("  Break duration: {:.0}s\n", self.break_duration));
        out.push_str("\nError Parameters:\n");
        out.push_str(&format!("  Error rate: {:.0}%\n", self.error_rate * 100.0));
        out.push_str(&format!(
            "  Max consecutive errors: {}\n",
            self.max_consecutive_errors
        ));
        out.push_str(&format!(
            "  Max consecutive correct: {}\n",
            self.max_consecutive_correct
        ));
        out.push_str("\nFeedback:\n");
        out.push_str(&format!(
            "  Show 'TARGET REACHED': {}\n",
            self.show_target_reached
        ));
        if self.show_target_reached {
            out.push_str(&format!(
                "  Duration: {:.1}s\n",
                self.target_reached_duration
            ));
        }
        out.push_str(&format!(
            "\nEstimated Duration: {:.1} minutes\n{line}\n",
            self.estimated_duration_minutes
        ));
        out
    }
}

/// One line per registered preset, for the CLI `help` path and the
/// interactive selection prompt.
pub fn list_presets() -> String {
    let mut out = String::from("Available Presets:\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    for key in preset_names() {
        let config = resolve(key).expect("registered presets are valid");
        out.push_str(&format!(
            "\n'{key}':\n  {}\n  Duration: ~{:.0} minutes\n  Trials: {} ({} blocks x {})\n",
            config.description,
            config.estimated_duration_minutes,
            config.total_trials,
            config.n_blocks,
            config.n_trials_per_block
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_registered_presets() {
        for key in preset_names() {
            let config = resolve(key).unwrap();
            assert_eq!(config.preset_key, key);
            assert_eq!(
                config.total_trials,
                config.n_blocks * config.n_trials_per_block
            );
        }
    }

    #[test]
    fn unknown_preset_is_fatal() {
        assert!(matches!(
            resolve("bogus"),
            Err(ConfigError::UnknownPreset(name)) if name == "bogus"
        ));
    }

    #[test]
    fn resolve_is_idempotent() {
        assert_eq!(resolve("paper").unwrap(), resolve("paper").unwrap());
        assert_eq!(resolve("debug").unwrap(), resolve("debug").unwrap());
    }

    #[test]
    fn derived_trial_counts() {
        assert_eq!(resolve("paper").unwrap().total_trials, 240);
        assert_eq!(resolve("quick").unwrap().total_trials, 80);
        assert_eq!(resolve("full").unwrap().total_trials, 240);
        assert_eq!(resolve("debug").unwrap().total_trials, 10);
    }

    #[test]
    fn paper_duration_estimate() {
        // avg ITI 2.0 + 0.5 * 3 = 3.5 s/trial; (20 + 240) * 3.5 + 2 * 60
        // breaks + 120 s instructions = 1150 s.
        let config = resolve("paper").unwrap();
        assert!((config.estimated_duration_minutes - 1150.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn feedback_duration_counts_when_enabled() {
        // v1_style: 0.5 + 1.0 + 0.8 + 0.0 + 1.0 = 3.3 s/trial.
        let config = resolve("v1_style").unwrap();
        let expected = ((15.0 + 60.0) * 3.3 + 30.0 + 120.0) / 60.0;
        assert!((config.estimated_duration_minutes - expected).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let base = resolve("quick").unwrap();

        let mut config = base.clone();
        config.error_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.n_positions = 1;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.start_position_idx = 20;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.iti_min = 2.0;
        config.iti_max = 1.0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.max_consecutive_errors = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsatisfiable_target_distance() {
        let mut config = resolve("quick").unwrap();
        config.n_positions = 5;
        config.start_position_idx = 2;
        config.min_target_distance = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter(_))
        ));
    }
}
