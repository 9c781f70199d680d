//! Test doubles: a fake clock driven by frame flips and sleeps, and a mock
//! presentation surface that records every frame, so trial and session logic
//! runs without any rendering backend.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use errp_core::{Key, SceneElement, Surface, SurfaceError, TrialRecord};
use errp_timing::Clock;

use crate::output::RecordSink;
use crate::session::SessionInfo;

/// Simulated presentation latency added per flip.
const FLIP_LATENCY_S: f64 = 0.001;

#[derive(Clone)]
pub struct FakeClock {
    now: Rc<Cell<f64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(0.0)),
        }
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d.as_secs_f64());
    }
}

/// When the mock reports an operator abort request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortRule {
    Never,
    /// Arm the abort once the cursor is seen moving during the n-th trial
    /// (1-based; trials are counted by their fixation onsets).
    OnMovementOfTrial(usize),
}

pub struct MockSurface {
    clock: FakeClock,
    abort_rule: AbortRule,
    escape_armed: bool,
    frames: Vec<Vec<SceneElement>>,
    pending: Vec<SceneElement>,
    trials_started: usize,
    prev_had_fixation: bool,
    last_cursor_x: Option<f32>,
    key_script: VecDeque<Key>,
    flips: usize,
    fail_on_flip: Option<usize>,
}

impl MockSurface {
    pub fn new(clock: FakeClock, abort_rule: AbortRule) -> Self {
        Self {
            clock,
            abort_rule,
            escape_armed: false,
            frames: Vec::new(),
            pending: Vec::new(),
            trials_started: 0,
            prev_had_fixation: false,
            last_cursor_x: None,
            key_script: VecDeque::new(),
            flips: 0,
            fail_on_flip: None,
        }
    }

    /// Queue keys to be returned by `wait_for_key`; once exhausted the mock
    /// presses the first requested key.
    pub fn script_keys(&mut self, keys: &[Key]) {
        self.key_script.extend(keys.iter().copied());
    }

    /// Make the n-th flip (1-based) fail, simulating a lost backend.
    pub fn fail_on_flip(&mut self, n: usize) {
        self.fail_on_flip = Some(n);
    }

    pub fn frames(&self) -> &[Vec<SceneElement>] {
        &self.frames
    }

    pub fn saw_reached_target(&self) -> bool {
        self.frames.iter().flatten().any(
            |e| matches!(e, SceneElement::Target { reached, .. } if *reached),
        )
    }

    fn observe(&mut self, scene: &[SceneElement]) {
        let has_fixation = scene.iter().any(|e| matches!(e, SceneElement::Fixation));
        if has_fixation && !self.prev_had_fixation {
            self.trials_started += 1;
        }
        if has_fixation {
            // ITI separates trials; forget the cursor so the jump back to
            // the start position is not mistaken for movement.
            self.last_cursor_x = None;
        }
        self.prev_had_fixation = has_fixation;

        let cursor_x = scene.iter().find_map(|e| match e {
            SceneElement::Cursor { x } => Some(*x),
            _ => None,
        });
        if let Some(x) = cursor_x {
            if let Some(prev) = self.last_cursor_x {
                if (x - prev).abs() > f32::EPSILON {
                    // Cursor in motion.
                    if let AbortRule::OnMovementOfTrial(n) = self.abort_rule {
                        if self.trials_started == n {
                            self.escape_armed = true;
                        }
                    }
                }
            }
            self.last_cursor_x = Some(x);
        }
    }
}

impl Surface for MockSurface {
    fn draw_frame(&mut self, scene: &[SceneElement]) -> Result<(), SurfaceError> {
        self.observe(scene);
        self.pending = scene.to_vec();
        Ok(())
    }

    fn flip(&mut self) -> Result<(), SurfaceError> {
        self.flips += 1;
        if let Some(n) = self.fail_on_flip {
            if self.flips >= n {
                return Err(SurfaceError::Backend("mock backend lost".into()));
            }
        }
        self.frames.push(std::mem::take(&mut self.pending));
        self.clock.advance(FLIP_LATENCY_S);
        Ok(())
    }

    fn poll_escape(&mut self) -> Result<bool, SurfaceError> {
        Ok(self.escape_armed)
    }

    fn wait_for_key(&mut self, keys: &[Key]) -> Result<Key, SurfaceError> {
        if self.escape_armed {
            return Ok(Key::Escape);
        }
        if let Some(key) = self.key_script.pop_front() {
            return Ok(key);
        }
        Ok(keys.first().copied().unwrap_or(Key::Space))
    }
}

/// Records flush calls instead of touching the filesystem.
#[derive(Default)]
pub struct MockSink {
    pub flushes: usize,
    pub last: Vec<TrialRecord>,
}

impl RecordSink for MockSink {
    fn flush(&mut self, _info: &SessionInfo, records: &[TrialRecord]) -> std::io::Result<()> {
        self.flushes += 1;
        self.last = records.to_vec();
        Ok(())
    }
}
