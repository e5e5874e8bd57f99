use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::SolverCommand;
use crate::error::ProcessError;
use crate::paths;

/// Environment variable carrying the absolute path of the dataset snapshot.
pub const DATASET_ENV: &str = "PLANNER_DATASET";
/// Environment variable carrying `regular` or `exam`.
pub const KIND_ENV: &str = "PLANNER_KIND";

// ─── Invocation ───────────────────────────────────────────────────────────

/// A fully resolved solver command line, ready to spawn.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl Invocation {
    /// Resolve a configured command against the project root. Relative
    /// working directories and program paths containing a separator are
    /// joined onto `root`; bare program names are looked up on `PATH`.
    pub fn from_command(command: &SolverCommand, root: &Path, timeout: Duration) -> Self {
        let program = if command.program.contains('/') {
            paths::resolve(root, Path::new(&command.program))
                .to_string_lossy()
                .into_owned()
        } else {
            command.program.clone()
        };
        Self {
            program,
            args: command.args.clone(),
            working_dir: paths::resolve(root, &command.working_dir),
            env: Vec::new(),
            timeout,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

// ─── RawOutput ────────────────────────────────────────────────────────────

/// Everything the solver printed, stdout and stderr interleaved by line in
/// arrival order.
#[derive(Debug, Clone)]
pub struct RawOutput {
    pub text: String,
    /// `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl RawOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ─── invoke ───────────────────────────────────────────────────────────────

/// Run the solver to completion and capture its combined output.
///
/// The child gets a null stdin and is killed if this future is dropped or
/// `timeout` elapses. On unix the child leads its own process group and the
/// whole group is killed, so processes started by a wrapper script go with it.
/// A non-zero exit is reported in [`RawOutput::exit_code`], not as an error.
/// Output that is not valid UTF-8 is decoded lossily.
pub async fn invoke(invocation: &Invocation) -> Result<RawOutput, ProcessError> {
    if !invocation.working_dir.is_dir() {
        return Err(ProcessError::Spawn {
            program: invocation.program.clone(),
            reason: format!(
                "working directory '{}' does not exist",
                invocation.working_dir.display()
            ),
        });
    }

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    for (k, v) in &invocation.env {
        cmd.env(k, v);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ProcessError::ExecutableNotFound(invocation.program.clone()),
        _ => ProcessError::Spawn {
            program: invocation.program.clone(),
            reason: e.to_string(),
        },
    })?;
    let mut group = ProcessGroup::new(child.id());

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("stderr not captured"))?;

    let mut text = String::new();
    let run = async {
        let mut out = LossyLines::new(stdout);
        let mut err = LossyLines::new(stderr);
        let (mut out_open, mut err_open) = (true, true);

        while out_open || err_open {
            tokio::select! {
                line = out.next_line(), if out_open => match line? {
                    Some(line) => capture(&mut text, "stdout", line),
                    None => out_open = false,
                },
                line = err.next_line(), if err_open => match line? {
                    Some(line) => capture(&mut text, "stderr", line),
                    None => err_open = false,
                },
            }
        }
        child.wait().await
    };

    let outcome = tokio::time::timeout(invocation.timeout, run).await;
    let status: ExitStatus = match outcome {
        Ok(status) => status?,
        Err(_) => {
            group.kill();
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill timed-out solver");
            }
            return Err(ProcessError::Timeout {
                after: invocation.timeout,
                output: text,
            });
        }
    };

    group.disarm();

    Ok(RawOutput {
        text,
        exit_code: status.code(),
        elapsed: start.elapsed(),
    })
}

/// Line reader that keeps partial lines across cancelled reads and never
/// fails on invalid UTF-8.
struct LossyLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LossyLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        let mut line: &[u8] = &self.buf;
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest.strip_suffix(b"\r").unwrap_or(rest);
        }
        let line = String::from_utf8_lossy(line).into_owned();
        self.buf.clear();
        Ok(Some(line))
    }
}

/// The solver's process group. Dropping it while armed sends `SIGKILL` to
/// every member.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.filter(|_| cfg!(unix)),
        }
    }

    /// The child exited on its own; leave the group alone.
    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        let target = format!("-{pgid}");
        let result = std::process::Command::new("kill")
            .args(["-KILL", "--", &target])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = result {
            warn!(error = %e, pgid, "failed to signal solver process group");
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

fn capture(buf: &mut String, stream: &'static str, line: String) {
    debug!(stream, "{line}");
    buf.push_str(&line);
    buf.push('\n');
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str, dir: &Path, timeout: Duration) -> Invocation {
        Invocation {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            working_dir: dir.to_path_buf(),
            env: Vec::new(),
            timeout,
        }
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let dir = TempDir::new().unwrap();
        let inv = sh(
            "echo 'INFO starting' >&2; echo '{\"timetable\":[]}'",
            dir.path(),
            Duration::from_secs(10),
        );
        let out = invoke(&inv).await.unwrap();
        assert!(out.success());
        assert!(out.text.contains("INFO starting\n"), "{}", out.text);
        assert!(out.text.contains("{\"timetable\":[]}\n"), "{}", out.text);
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let dir = TempDir::new().unwrap();
        let inv = sh(
            "printf 'Caf\\351 diag\\n'; echo '{\"timetable\":[]}'",
            dir.path(),
            Duration::from_secs(10),
        );
        let out = invoke(&inv).await.unwrap();
        assert!(out.success());
        assert_eq!(out.text, "Caf\u{FFFD} diag\n{\"timetable\":[]}\n");
        assert!(crate::solver::extract(crate::types::ScheduleKind::Regular, &out.text)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unterminated_last_line_is_kept() {
        let dir = TempDir::new().unwrap();
        let inv = sh("printf 'done'", dir.path(), Duration::from_secs(10));
        let out = invoke(&inv).await.unwrap();
        assert_eq!(out.text, "done\n");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timeout_kills_processes_started_by_wrapper() {
        let dir = TempDir::new().unwrap();
        let inv = sh(
            "sleep 30 & echo $! > helper.pid; wait",
            dir.path(),
            Duration::from_millis(500),
        );
        let err = invoke(&inv).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));

        let pid = std::fs::read_to_string(dir.path().join("helper.pid")).unwrap();
        let stat = std::path::PathBuf::from(format!("/proc/{}/stat", pid.trim()));
        let mut alive = true;
        for _ in 0..20 {
            // A killed helper is either reaped or left as a zombie.
            alive = std::fs::read_to_string(&stat)
                .map(|s| !s.contains(") Z "))
                .unwrap_or(false);
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!alive, "helper process outlived the timed-out solver");
    }

    #[tokio::test]
    async fn sequential_lines_keep_order() {
        let dir = TempDir::new().unwrap();
        let inv = sh(
            "echo one; sleep 0.1; echo two >&2; sleep 0.1; echo three",
            dir.path(),
            Duration::from_secs(10),
        );
        let out = invoke(&inv).await.unwrap();
        assert_eq!(out.text, "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let inv = sh("echo partial; exit 3", dir.path(), Duration::from_secs(10));
        let out = invoke(&inv).await.unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
        assert_eq!(out.text, "partial\n");
    }

    #[tokio::test]
    async fn empty_output_is_empty_text() {
        let dir = TempDir::new().unwrap();
        let out = invoke(&sh("true", dir.path(), Duration::from_secs(10)))
            .await
            .unwrap();
        assert!(out.text.is_empty());
    }

    #[tokio::test]
    async fn timeout_kills_and_keeps_partial_output() {
        let dir = TempDir::new().unwrap();
        let inv = sh(
            "echo searching; exec sleep 30",
            dir.path(),
            Duration::from_millis(500),
        );
        let started = Instant::now();
        let err = invoke(&inv).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            ProcessError::Timeout { after, output } => {
                assert_eq!(after, Duration::from_millis(500));
                assert_eq!(output, "searching\n");
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_executable_is_reported() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation {
            program: "__planner_no_such_solver__".into(),
            args: Vec::new(),
            working_dir: dir.path().to_path_buf(),
            env: Vec::new(),
            timeout: Duration::from_secs(5),
        };
        let err = invoke(&inv).await.unwrap_err();
        assert!(
            matches!(err, ProcessError::ExecutableNotFound(ref p) if p == "__planner_no_such_solver__"),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn missing_working_dir_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let inv = sh("true", &dir.path().join("absent"), Duration::from_secs(5));
        let err = invoke(&inv).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn env_and_working_dir_are_applied() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let inv = sh(
            "cat marker.txt; echo; echo \"$PLANNER_KIND\"",
            dir.path(),
            Duration::from_secs(10),
        )
        .env(KIND_ENV, "exam");
        let out = invoke(&inv).await.unwrap();
        assert_eq!(out.text, "here\nexam\n");
    }

    #[test]
    fn from_command_resolves_relative_paths() {
        let cmd = SolverCommand {
            program: "bin/solve".into(),
            args: vec!["--fast".into()],
            working_dir: PathBuf::from("solver"),
        };
        let inv = Invocation::from_command(&cmd, Path::new("/srv/planner"), Duration::from_secs(1));
        assert_eq!(inv.program, "/srv/planner/bin/solve");
        assert_eq!(inv.working_dir, PathBuf::from("/srv/planner/solver"));

        let bare = SolverCommand {
            program: "python3".into(),
            args: Vec::new(),
            working_dir: PathBuf::from("/opt/solver"),
        };
        let inv = Invocation::from_command(&bare, Path::new("/srv/planner"), Duration::from_secs(1));
        assert_eq!(inv.program, "python3");
        assert_eq!(inv.working_dir, PathBuf::from("/opt/solver"));
    }
}
