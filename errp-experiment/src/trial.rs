use std::time::Duration;

use rand::Rng;

use errp_core::{
    Direction, ErrorKind, PhaseTimes, PositionMap, SceneElement, Surface, TrialRecord, TrialType,
};
use errp_timing::Clock;

use crate::config::Config;
use crate::sequence::target_position;
use crate::session::{SessionError, SessionInfo};

/// Nominal refresh tick; waits are sliced into ticks so the abort request
/// can be polled while a phase runs.
pub(crate) const FRAME_TICK: Duration = Duration::from_micros(16_667);

/// Direction the cursor should move to approach the target.
pub fn correct_direction(start: usize, target: usize) -> Direction {
    if target > start {
        Direction::Right
    } else {
        Direction::Left
    }
}

/// One step from `start` in `direction`, clamped to `[0, n_positions)`.
pub fn end_index(start: usize, direction: Direction, n_positions: usize) -> usize {
    let raw = start as isize + direction.step();
    raw.clamp(0, n_positions as isize - 1) as usize
}

/// Executes exactly one trial through the ordered phase protocol:
/// ITI (uniform in `[iti_min, iti_max]`, fixation only), target presentation,
/// movement, post-movement hold, and the optional target-reached feedback.
/// Phase transitions are timestamped at entry from the session clock; the
/// abort request is polled at the top of every phase and on every tick, and
/// aborting discards the partially built record.
pub fn run_trial<S, C, R>(
    config: &Config,
    positions: &PositionMap,
    info: &SessionInfo,
    block_num: usize,
    trial_num: usize,
    trial_type: TrialType,
    surface: &mut S,
    clock: &C,
    rng: &mut R,
) -> Result<TrialRecord, SessionError>
where
    S: Surface + ?Sized,
    C: Clock + ?Sized,
    R: Rng + ?Sized,
{
    let trial_start = clock.now();

    // Phase 1: inter-trial interval.
    let iti = rng.random_range(config.iti_min..=config.iti_max);
    hold(surface, clock, &[SceneElement::Fixation], iti)?;

    // Phase 2: target presentation.
    let start_idx = config.start_position_idx;
    let target_idx = target_position(
        start_idx,
        config.n_positions,
        config.min_target_distance,
        rng,
    );
    let start_x = positions.x(start_idx);
    let target_x = positions.x(target_idx);
    let target_onset = clock.now();
    hold(
        surface,
        clock,
        &[
            SceneElement::Target {
                x: target_x,
                reached: false,
            },
            SceneElement::Cursor { x: start_x },
        ],
        config.target_presentation,
    )?;

    // Phase 3: movement. Error trials reverse the correct direction; in one
    // dimension reversal is the only possible error.
    let correct = correct_direction(start_idx, target_idx);
    let (direction, error_kind) = match trial_type {
        TrialType::Correct => (correct, ErrorKind::None),
        TrialType::Error => (correct.opposite(), ErrorKind::Opposite),
    };
    let end_idx = end_index(start_idx, direction, config.n_positions);
    let end_x = positions.x(end_idx);

    let movement_onset = clock.now();
    loop {
        check_abort(surface)?;
        let t = if config.movement_duration > 0.0 {
            ((clock.now() - movement_onset) / config.movement_duration).min(1.0)
        } else {
            1.0
        };
        let x = start_x + t as f32 * (end_x - start_x);
        surface.draw_frame(&[
            SceneElement::Target {
                x: target_x,
                reached: false,
            },
            SceneElement::Cursor { x },
        ])?;
        surface.flip()?;
        if t >= 1.0 {
            break;
        }
        clock.sleep(FRAME_TICK);
    }
    let movement_end = clock.now();

    // Phase 4: post-movement hold at the end position.
    hold(
        surface,
        clock,
        &[
            SceneElement::Target {
                x: target_x,
                reached: false,
            },
            SceneElement::Cursor { x: end_x },
        ],
        config.post_movement,
    )?;

    // Phase 5: target-reached feedback, only when enabled and actually reached.
    if config.show_target_reached && end_idx == target_idx {
        hold(
            surface,
            clock,
            &[
                SceneElement::Target {
                    x: target_x,
                    reached: true,
                },
                SceneElement::Cursor { x: end_x },
                SceneElement::Banner {
                    content: "TARGET REACHED!".to_string(),
                },
            ],
            config.target_reached_duration,
        )?;
    }

    let trial_end = clock.now();

    Ok(TrialRecord {
        subject_id: info.subject_id.clone(),
        session_date: info.session_date.clone(),
        session_num: info.session_num,
        block_num,
        trial_num,
        trial_type,
        error_kind,
        start_idx,
        target_idx,
        end_idx,
        start_x,
        target_x,
        end_x,
        direction,
        times: PhaseTimes {
            trial_start,
            target_onset,
            movement_onset,
            movement_end,
            trial_end,
        },
        response_key: None,
        response_time: None,
    })
}

pub(crate) fn check_abort<S: Surface + ?Sized>(surface: &mut S) -> Result<(), SessionError> {
    if surface.poll_escape()? {
        Err(SessionError::Aborted)
    } else {
        Ok(())
    }
}

/// Presents `scene` for `duration` seconds, redrawing every tick and polling
/// the abort request each time. Draws at least one frame even for a zero
/// duration.
pub(crate) fn hold<S, C>(
    surface: &mut S,
    clock: &C,
    scene: &[SceneElement],
    duration: f64,
) -> Result<(), SessionError>
where
    S: Surface + ?Sized,
    C: Clock + ?Sized,
{
    let deadline = clock.now() + duration;
    loop {
        check_abort(surface)?;
        surface.draw_frame(scene)?;
        surface.flip()?;
        let remaining = deadline - clock.now();
        if remaining <= 0.0 {
            return Ok(());
        }
        clock.sleep(FRAME_TICK.min(Duration::from_secs_f64(remaining)));
    }
}
