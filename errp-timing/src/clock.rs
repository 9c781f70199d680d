use std::time::{Duration, Instant};

/// Monotonic session clock. One instance is created at session start and
/// every timestamp in the session is read from it, so timestamps are
/// non-decreasing within and across trials.
pub trait Clock {
    /// Seconds elapsed since session zero.
    fn now(&self) -> f64;

    /// Suspends the calling thread for `d`.
    fn sleep(&self, d: Duration);
}

/// High-resolution wall clock with its zero point fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SessionClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&self, d: Duration) {
        precise_sleep(d);
    }
}

/// Sleeps with the best precision the platform offers. Frame-tick waits are
/// in the low-millisecond range where the default scheduler quantum on some
/// platforms is too coarse.
pub fn precise_sleep(duration: Duration) {
    #[cfg(target_os = "windows")]
    windows_sleep(duration);
    #[cfg(target_os = "linux")]
    linux_sleep(duration);
    #[cfg(target_os = "macos")]
    macos_sleep(duration);
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    std::thread::sleep(duration);
}

#[cfg(target_os = "linux")]
fn linux_sleep(duration: Duration) {
    use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

    let req = timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };

    unsafe {
        clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
    }
}

#[cfg(target_os = "windows")]
fn windows_sleep(duration: Duration) {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{
        CreateWaitableTimerW, SetWaitableTimer, WaitForSingleObject,
    };

    unsafe {
        if let Ok(timer) = CreateWaitableTimerW(None, true, None) {
            // Negative due time = relative wait, in 100 ns intervals.
            let due_time = -(duration.as_nanos() as i64 / 100);
            if SetWaitableTimer(timer, &due_time, 0, None, None, false).is_ok() {
                WaitForSingleObject(timer, u32::MAX);
            }
            let _ = CloseHandle(timer);
        } else {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(target_os = "macos")]
fn macos_sleep(duration: Duration) {
    use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

    if duration.as_nanos() < 100_000 {
        unsafe {
            let start = mach_absolute_time();
            let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
            mach_timebase_info(&mut timebase);

            let target_ticks =
                duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

            while mach_absolute_time() - start < target_ticks {
                std::hint::spin_loop();
            }
        }
    } else {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic() {
        let clock = SessionClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn sleep_waits_at_least_requested() {
        let clock = SessionClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now() - before >= 0.005);
    }
}
