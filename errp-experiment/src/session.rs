use thiserror::Error;
use tracing::{debug, info, warn};

use rand::Rng;

use errp_core::{Key, PositionMap, SceneElement, Surface, SurfaceError, TrialRecord, TrialType};
use errp_timing::Clock;

use crate::config::Config;
use crate::output::RecordSink;
use crate::sequence::generate_sequence;
use crate::trial::{check_abort, hold, run_trial};

const COMPLETION_HOLD_S: f64 = 3.0;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Operator-issued abort: a controlled early termination. Progress so
    /// far is still flushed before the session returns.
    #[error("session aborted by operator")]
    Aborted,
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("failed to write session data: {0}")]
    Sink(#[from] std::io::Error),
}

/// Subject and session identity, fixed before the first trial.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub subject_id: String,
    pub session_num: u32,
    pub experimenter: String,
    /// `YYYY-MM-DD`.
    pub session_date: String,
    /// `HH:MM:SS`.
    pub session_time: String,
    pub preset_key: String,
}

impl SessionInfo {
    #[cfg(test)]
    pub(crate) fn test_info(preset_key: &str) -> Self {
        Self {
            subject_id: "S01".into(),
            session_num: 1,
            experimenter: "tester".into(),
            session_date: "2026-01-01".into(),
            session_time: "12:00:00".into(),
            preset_key: preset_key.into(),
        }
    }
}

/// Owns the resolved configuration, the session metadata, the ordered trial
/// record list and the session clock. Runs practice plus experimental blocks
/// and flushes the record list to the persistence sink exactly once, on
/// every exit path.
pub struct Session<C: Clock, R: Rng> {
    config: Config,
    positions: PositionMap,
    info: SessionInfo,
    records: Vec<TrialRecord>,
    clock: C,
    rng: R,
}

impl<C: Clock, R: Rng> Session<C, R> {
    pub fn new(config: Config, info: SessionInfo, clock: C, rng: R) -> Self {
        let positions = PositionMap::new(config.n_positions, config.window_size.0);
        Self {
            config,
            positions,
            info,
            records: Vec::new(),
            clock,
            rng,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Runs the full session. Whatever happens inside the loops, the sink is
    /// flushed exactly once before this returns; on abort or surface failure
    /// the flush is best-effort and the original error is reported.
    pub fn run<S, K>(&mut self, surface: &mut S, sink: &mut K) -> Result<(), SessionError>
    where
        S: Surface + ?Sized,
        K: RecordSink + ?Sized,
    {
        let outcome = self.run_inner(surface);
        let flushed = sink.flush(&self.info, &self.records);

        match outcome {
            Ok(()) => {
                flushed?;
                info!(records = self.records.len(), "session complete");
                Ok(())
            }
            Err(err) => {
                match &flushed {
                    Ok(()) => info!(
                        records = self.records.len(),
                        "session ended early, partial data flushed"
                    ),
                    Err(io) => warn!(error = %io, "flush after early termination failed"),
                }
                Err(err)
            }
        }
    }

    fn run_inner<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<(), SessionError> {
        for text in self.main_instructions() {
            self.show_screen(surface, &text)?;
        }

        self.run_practice(surface)?;

        for block_num in 1..=self.config.n_blocks {
            check_abort(surface)?;
            let sequence = self.generate_block_sequence(self.config.n_trials_per_block);

            self.show_screen(
                surface,
                &format!(
                    "Block {} of {}\n\nPress SPACE to begin",
                    block_num, self.config.n_blocks
                ),
            )?;

            info!(block = block_num, trials = sequence.len(), "block start");
            self.run_block(surface, block_num, &sequence)?;

            if block_num < self.config.n_blocks {
                self.show_screen(
                    surface,
                    &format!(
                        "Break Time!\n\nCompleted: {} / {} blocks\n\n\
                         Take a {:.0} second break.\nRelax and rest your eyes.\n\n\
                         Press SPACE when ready to continue",
                        block_num, self.config.n_blocks, self.config.break_duration
                    ),
                )?;
            }
        }

        hold(
            surface,
            &self.clock,
            &[SceneElement::Text {
                content: "Experiment Complete!\n\nThank you for participating.\n\n\
                          Please inform the experimenter."
                    .to_string(),
            }],
            COMPLETION_HOLD_S,
        )
    }

    fn run_practice<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<(), SessionError> {
        self.show_screen(
            surface,
            "Practice Block\n\nYou will now complete a short practice block.\n\n\
             Remember:\n\
             - Watch the cursor move toward the green target\n\
             - The cursor may sometimes move in the WRONG direction\n\
             - Simply observe - you do not control anything\n\n\
             Press SPACE to begin practice",
        )?;

        let sequence = self.generate_block_sequence(self.config.n_practice_trials);
        info!(trials = sequence.len(), "practice start");
        self.run_block(surface, 0, &sequence)?;

        self.show_screen(
            surface,
            "Practice Complete!\n\nYou are now ready for the main experiment.\n\n\
             Press SPACE to begin",
        )
    }

    /// Runs one block's trials. Only this orchestrator appends to the record
    /// list, and records land in execution order.
    fn run_block<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        block_num: usize,
        sequence: &[TrialType],
    ) -> Result<(), SessionError> {
        for (i, &trial_type) in sequence.iter().enumerate() {
            check_abort(surface)?;
            let trial_num = i + 1;
            let record = run_trial(
                &self.config,
                &self.positions,
                &self.info,
                block_num,
                trial_num,
                trial_type,
                surface,
                &self.clock,
                &mut self.rng,
            )?;
            debug!(
                block = block_num,
                trial = trial_num,
                trial_type = trial_type.as_str(),
                start = record.times.trial_start,
                "trial complete"
            );
            self.records.push(record);
        }
        Ok(())
    }

    fn generate_block_sequence(&mut self, n_trials: usize) -> Vec<TrialType> {
        let (sequence, satisfied) = generate_sequence(
            n_trials,
            self.config.error_rate,
            self.config.max_consecutive_errors,
            self.config.max_consecutive_correct,
            &mut self.rng,
        );
        if !satisfied {
            warn!(
                n_trials,
                "no constraint-satisfying trial sequence found within the attempt budget; \
                 proceeding with the best available shuffle"
            );
        }
        sequence
    }

    fn show_screen<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        text: &str,
    ) -> Result<(), SessionError> {
        surface.draw_frame(&[SceneElement::Text {
            content: text.to_string(),
        }])?;
        surface.flip()?;
        match surface.wait_for_key(&[Key::Space])? {
            Key::Escape => Err(SessionError::Aborted),
            _ => Ok(()),
        }
    }

    fn main_instructions(&self) -> Vec<String> {
        vec![
            "Welcome to the Observation ErrP Experiment\n\n\
             In this task, you will observe a cursor moving on the screen.\n\n\
             Your goal is to watch the cursor and determine whether it moves\n\
             CORRECTLY toward the green target or INCORRECTLY (wrong direction).\n\n\
             You do NOT control the cursor. Simply observe and pay attention.\n\n\
             Press SPACE to continue"
                .to_string(),
            "Instructions:\n\n\
             - Each trial begins with a fixation cross (+)\n\
             - A green target will appear\n\
             - The white cursor will move toward the target\n\
             - Sometimes the cursor will move in the WRONG direction\n\
             - This is intentional and happens automatically\n\n\
             Press SPACE to continue"
                .to_string(),
            format!(
                "Your Task:\n\n\
                 Simply OBSERVE the cursor movements.\n\
                 Pay attention to when errors occur.\n\n\
                 The experiment will take approximately {} minutes.\n\
                 Total trials: {} ({} blocks)\n\
                 There will be short breaks between blocks.\n\n\
                 Press SPACE when ready to start",
                self.config.estimated_duration_minutes as u64,
                self.config.total_trials,
                self.config.n_blocks
            ),
        ]
    }
}
