//! Streaming execution of external commands.
//!
//! Long-running tools (the schema compiler, `psql -f`) can fill a pipe buffer
//! and stall the parent if their output is not consumed, so both output
//! streams are drained concurrently while the caller blocks on process exit.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

use crate::core::error::Result;

/// Sink for a spawned command's output streams. stdout lines arrive at the
/// low-severity tier, stderr lines at the high-severity tier. Implementations
/// must be append-safe: the two reader threads write concurrently.
pub trait ProcessLog: Sync {
    fn output_line(&self, line: &str);
    fn error_line(&self, line: &str);
}

/// Kills and reaps the child on every early-exit path so an aborted pipeline
/// step never leaks an OS process.
struct ChildGuard {
    child: Child,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Run an external command, forwarding its output to `log`, and return
/// whether it exited successfully.
///
/// The child gets a closed stdin up front. One scoped thread drains stdout
/// into `output_line`, another drains stderr into `error_line`; both readers
/// terminate at end-of-file when the child exits and are joined before this
/// function returns, so no draining is still in flight once the caller
/// observes the exit. Stream read failures cost only diagnostics and are
/// logged, never propagated. Spawn and wait failures surface as `Err`.
pub fn execute(program: &str, args: &[String], log: &dyn ProcessLog) -> Result<bool> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut guard = ChildGuard { child };

    let status = thread::scope(|scope| {
        if let Some(out) = stdout {
            scope.spawn(move || {
                for line in BufReader::new(out).lines() {
                    match line {
                        Ok(line) => log.output_line(&line),
                        Err(err) => {
                            log.error_line(&format!("Error draining stdout: {err}"));
                            break;
                        }
                    }
                }
            });
        }
        if let Some(err_stream) = stderr {
            scope.spawn(move || {
                for line in BufReader::new(err_stream).lines() {
                    match line {
                        Ok(line) => log.error_line(&line),
                        Err(err) => {
                            log.error_line(&format!("Error draining stderr: {err}"));
                            break;
                        }
                    }
                }
            });
        }
        guard.child.wait()
    })?;

    Ok(status.success())
}

/// Best-effort `u+x` on a generated script. Failure is logged and reported as
/// `false`; it never aborts the caller.
pub fn make_executable(path: &Path, log: &dyn ProcessLog) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                log.error_line(&format!("Unable to inspect {}: {err}", path.display()));
                return false;
            }
        };
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o100);
        match std::fs::set_permissions(path, permissions) {
            Ok(()) => true,
            Err(err) => {
                log.error_line(&format!(
                    "Unable to mark {} executable: {err}",
                    path.display()
                ));
                false
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (path, log);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct CapturingLog {
        out: Mutex<Vec<String>>,
        err: Mutex<Vec<String>>,
    }

    impl ProcessLog for CapturingLog {
        fn output_line(&self, line: &str) {
            self.out.lock().unwrap().push(line.to_string());
        }

        fn error_line(&self, line: &str) {
            self.err.lock().unwrap().push(line.to_string());
        }
    }

    #[test]
    fn routes_stdout_and_stderr_to_separate_tiers() {
        let log = CapturingLog::default();
        let args = vec![
            "-c".to_string(),
            "echo one; echo two 1>&2; echo three".to_string(),
        ];

        let success = execute("sh", &args, &log).unwrap();

        assert!(success);
        assert_eq!(*log.out.lock().unwrap(), vec!["one", "three"]);
        assert_eq!(*log.err.lock().unwrap(), vec!["two"]);
    }

    #[test]
    fn reports_nonzero_exit_as_unsuccessful() {
        let log = CapturingLog::default();
        let args = vec!["-c".to_string(), "exit 3".to_string()];

        assert!(!execute("sh", &args, &log).unwrap());
    }

    #[test]
    fn missing_program_surfaces_spawn_error() {
        let log = CapturingLog::default();
        assert!(execute("dslc-no-such-binary", &[], &log).is_err());
    }

    #[test]
    fn returns_only_after_child_exit() {
        let log = CapturingLog::default();
        let args = vec!["-c".to_string(), "sleep 0.3; echo done".to_string()];

        let started = Instant::now();
        let success = execute("sh", &args, &log).unwrap();

        assert!(success);
        assert!(started.elapsed() >= Duration::from_millis(250));
        assert_eq!(*log.out.lock().unwrap(), vec!["done"]);
    }

    #[test]
    fn child_stdin_is_closed() {
        // cat with an open stdin would block forever; a closed stdin means
        // immediate end-of-file and a clean exit.
        let log = CapturingLog::default();
        assert!(execute("cat", &[], &log).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn make_executable_sets_owner_execute_bit() {
        use std::os::unix::fs::PermissionsExt;

        let file = tempfile::NamedTempFile::new().unwrap();
        let log = CapturingLog::default();

        assert!(make_executable(file.path(), &log));
        let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
        assert_ne!(mode & 0o100, 0);
    }

    #[cfg(unix)]
    #[test]
    fn make_executable_logs_and_degrades_on_missing_file() {
        let log = CapturingLog::default();
        assert!(!make_executable(Path::new("/no/such/script.sh"), &log));
        assert_eq!(log.err.lock().unwrap().len(), 1);
    }
}
