//! Scoped execution of the external ZFS tools.
//!
//! Every child process is owned by a [`ChildGuard`]; whichever way `run`
//! returns (success, failure, cancellation) the guard makes sure the process
//! has exited and been reaped before the call completes.

use super::CollectError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

const WAIT_STEP:  Duration = Duration::from_millis(25);
const TERM_GRACE: u32      = 8;   // WAIT_STEPs between SIGTERM and SIGKILL

/// Shared cancellation flag handed to an in-flight collection.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

/// Runs one external command to completion and returns its stdout.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str], cancel: &CancelToken) -> Result<String, CollectError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cancel: &CancelToken) -> Result<String, CollectError> {
        let command = display_command(program, args);
        if cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }

        trace!(%command, "spawning");
        let child = Command::new(program)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => CollectError::ToolUnavailable { tool: program.to_string() },
                _ => CollectError::Io { command: command.clone(), source: e },
            })?;

        let mut guard = ChildGuard { child, reaped: false };

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe.
        let stdout = guard.child.stdout.take().map(drain);
        let stderr = guard.child.stderr.take().map(drain);

        let status = loop {
            if cancel.is_cancelled() {
                debug!(%command, "cancelled while running");
                return Err(CollectError::Cancelled);
            }
            match guard.child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None)         => thread::sleep(WAIT_STEP),
                Err(e)           => return Err(CollectError::Io { command, source: e }),
            }
        };
        guard.reaped = true;

        let out = collect_pipe(stdout);
        let err = collect_pipe(stderr);

        if !status.success() {
            return Err(CollectError::CommandFailed {
                command,
                code:   status.code(),
                stderr: err.trim().to_string(),
            });
        }
        Ok(out)
    }
}

/// Owns a spawned child; terminates and reaps it on drop unless it already exited.
struct ChildGuard {
    child:  Child,
    reaped: bool,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.reaped { return; }
        if let Ok(pid) = i32::try_from(self.child.id()) {
            let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
        }
        for _ in 0..TERM_GRACE {
            if let Ok(Some(_)) = self.child.try_wait() { return; }
            thread::sleep(WAIT_STEP);
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect_pipe(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn missing_binary_is_tool_unavailable() {
        let err = SystemRunner
            .run("zdash-definitely-not-a-binary", &[], &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, CollectError::ToolUnavailable { ref tool } if tool == "zdash-definitely-not-a-binary"));
    }

    #[test]
    fn non_zero_exit_is_command_failed() {
        let err = SystemRunner
            .run("sh", &["-c", "echo broken >&2; exit 3"], &CancelToken::new())
            .unwrap_err();
        match err {
            CollectError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn captures_stdout() {
        let out = SystemRunner.run("sh", &["-c", "printf 'a\\tb\\n'"], &CancelToken::new()).unwrap();
        assert_eq!(out, "a\tb\n");
    }

    #[test]
    fn cancellation_stops_a_running_child() {
        let cancel = CancelToken::new();
        let flag = cancel.clone();
        let killer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            flag.cancel();
        });
        let started = Instant::now();
        let err = SystemRunner.run("sleep", &["10"], &cancel).unwrap_err();
        killer.join().unwrap();
        assert!(matches!(err, CollectError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn display_joins_args() {
        assert_eq!(display_command("zpool", &["list", "-Hp"]), "zpool list -Hp");
    }
}
