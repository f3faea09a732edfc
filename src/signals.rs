//! Signal handling: SIGINT
//! during editing cancels the current line; during a foreground pipeline it
//! is delivered to the child and the shell waits for it to exit. SIGTERM
//! triggers a graceful shutdown (save history, terminate background jobs
//! with a grace period, restore the terminal, exit). SIGWINCH just sets a
//! flag the editor's redraw loop polls.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// PID of the current foreground child process group, or -1 when the shell
/// itself is in the foreground.
pub static FOREGROUND_PID: AtomicI32 = AtomicI32::new(-1);

/// Set by the SIGTSTP handler; consumed by the REPL's top-of-loop poll.
pub static SIGTSTP_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Set by the SIGINT handler; consumed by the line editor (cancel current
/// line) or the executor (wait for the foreground child, then set `$?`).
pub static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Set by the SIGTERM handler; consumed by the REPL's top-of-loop poll to
/// begin graceful shutdown.
pub static SIGTERM_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Register handlers for every signal this shell cares about. Safe to call
/// once at startup; a no-op on non-unix targets.
#[cfg(unix)]
pub fn setup_signal_handlers() {
    use signal_hook::low_level;

    unsafe {
        let _ = low_level::register(signal_hook::consts::SIGTSTP, || {
            SIGTSTP_RECEIVED.store(true, Ordering::SeqCst);
        });
        let _ = low_level::register(signal_hook::consts::SIGINT, || {
            SIGINT_RECEIVED.store(true, Ordering::SeqCst);
        });
        let _ = low_level::register(signal_hook::consts::SIGTERM, || {
            SIGTERM_RECEIVED.store(true, Ordering::SeqCst);
        });
        let _ = low_level::register(signal_hook::consts::SIGWINCH, || {
            crate::terminal::mark_resize_pending();
        });
    }
}

#[cfg(not(unix))]
pub fn setup_signal_handlers() {}

pub fn set_foreground_pid(pid: i32) {
    FOREGROUND_PID.store(pid, Ordering::SeqCst);
}

pub fn clear_foreground_pid() {
    FOREGROUND_PID.store(-1, Ordering::SeqCst);
}

pub fn get_foreground_pid() -> Option<i32> {
    let pid = FOREGROUND_PID.load(Ordering::SeqCst);
    if pid > 0 {
        Some(pid)
    } else {
        None
    }
}

/// Check and clear the SIGTSTP-received flag.
pub fn check_sigtstp() -> bool {
    SIGTSTP_RECEIVED.swap(false, Ordering::SeqCst)
}

/// Check and clear the SIGINT-received flag.
pub fn check_sigint() -> bool {
    SIGINT_RECEIVED.swap(false, Ordering::SeqCst)
}

/// Check and clear the SIGTERM-received flag.
pub fn check_sigterm() -> bool {
    SIGTERM_RECEIVED.swap(false, Ordering::SeqCst)
}

#[cfg(unix)]
pub fn stop_process(pid: u32) -> Result<(), String> {
    let pid = Pid::from_raw(pid as i32);
    kill(pid, Signal::SIGSTOP).map_err(|e| format!("Failed to stop process {pid}: {e}"))
}

#[cfg(not(unix))]
pub fn stop_process(_pid: u32) -> Result<(), String> {
    Err("Signal handling not supported on this platform".into())
}

#[cfg(unix)]
pub fn continue_process(pid: u32) -> Result<(), String> {
    let pid = Pid::from_raw(pid as i32);
    kill(pid, Signal::SIGCONT).map_err(|e| format!("Failed to continue process {pid}: {e}"))
}

#[cfg(not(unix))]
pub fn continue_process(_pid: u32) -> Result<(), String> {
    Err("Signal handling not supported on this platform".into())
}

#[cfg(unix)]
pub fn terminate_process(pid: u32) -> Result<(), String> {
    let pid = Pid::from_raw(pid as i32);
    kill(pid, Signal::SIGTERM).map_err(|e| format!("Failed to terminate process {pid}: {e}"))
}

#[cfg(not(unix))]
pub fn terminate_process(_pid: u32) -> Result<(), String> {
    Err("Signal handling not supported on this platform".into())
}

#[cfg(unix)]
pub fn kill_process(pid: u32) -> Result<(), String> {
    let pid = Pid::from_raw(pid as i32);
    kill(pid, Signal::SIGKILL).map_err(|e| format!("Failed to kill process {pid}: {e}"))
}

#[cfg(not(unix))]
pub fn kill_process(_pid: u32) -> Result<(), String> {
    Err("Signal handling not supported on this platform".into())
}

/// Graceful shutdown for every still-running background job: SIGTERM each,
/// wait up to `grace`, then SIGKILL any
/// survivor. Callers are expected to save history and restore the terminal
/// mode themselves before exiting.
#[cfg(unix)]
pub fn shutdown_jobs(jobs: &crate::jobs::JobTable, grace: std::time::Duration) {
    let pids: Vec<u32> = jobs
        .iter()
        .filter(|j| !matches!(j.status, crate::jobs::JobStatus::Done(_)))
        .map(|j| j.pid)
        .collect();
    for pid in &pids {
        let _ = terminate_process(*pid);
    }
    if pids.is_empty() {
        return;
    }
    std::thread::sleep(grace);
    for pid in &pids {
        use nix::sys::wait::{waitpid, WaitPidFlag};
        let still_alive = waitpid(Pid::from_raw(*pid as i32), Some(WaitPidFlag::WNOHANG))
            .map(|status| matches!(status, nix::sys::wait::WaitStatus::StillAlive))
            .unwrap_or(false);
        if still_alive {
            let _ = kill_process(*pid);
        }
    }
}

#[cfg(not(unix))]
pub fn shutdown_jobs(_jobs: &crate::jobs::JobTable, _grace: std::time::Duration) {}

/// Non-blocking `waitpid` over every `Running` job, marking exited ones
/// `Done(code)` in place. The REPL calls this at the top of its loop (per
/// the "check for completed background jobs" step) so `[id] Done (code)
/// command` prints before the next prompt, never interleaved mid-input.
#[cfg(unix)]
pub fn reap_jobs(jobs: &mut crate::jobs::JobTable) {
    use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

    let running_pids: Vec<(u32, u32)> = jobs
        .iter()
        .filter(|j| matches!(j.status, crate::jobs::JobStatus::Running))
        .map(|j| (j.job_id, j.pid))
        .collect();

    for (job_id, pid) in running_pids {
        match waitpid(Pid::from_raw(pid as i32), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => {
                jobs.set_status(job_id, crate::jobs::JobStatus::Done(code));
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                jobs.set_status(job_id, crate::jobs::JobStatus::Done(128 + sig as i32));
            }
            _ => {}
        }
    }
}

#[cfg(not(unix))]
pub fn reap_jobs(_jobs: &mut crate::jobs::JobTable) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreground_pid_round_trips() {
        set_foreground_pid(1234);
        assert_eq!(get_foreground_pid(), Some(1234));
        clear_foreground_pid();
        assert_eq!(get_foreground_pid(), None);
    }

    #[test]
    fn sigint_flag_clears_on_check() {
        SIGINT_RECEIVED.store(true, Ordering::SeqCst);
        assert!(check_sigint());
        assert!(!check_sigint());
    }

    #[test]
    fn sigterm_flag_clears_on_check() {
        SIGTERM_RECEIVED.store(true, Ordering::SeqCst);
        assert!(check_sigterm());
        assert!(!check_sigterm());
    }
}
