//! Subprocess execution with a bounded, line-oriented stdout stream.
//!
//! The runner owns the whole child lifecycle: spawn with an argument vector (no shell),
//! read stdout one line at a time, stop and kill the child at the line cap or deadline,
//! and resolve the exit status. Exit codes 0 and 1 are success; 1 is ripgrep's
//! "searched, found nothing".

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{Instant, timeout_at};

use super::SearchError;

const MAX_STDERR_BYTES: u64 = 64 * 1024;

/// Variables removed from the child environment before spawn.
pub const DEFAULT_ENV_DENYLIST: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "LD_AUDIT",
    "DYLD_*",
    "RIPGREP_CONFIG_PATH",
];

/// RAII guard that kills a child process (and its process group on Unix) on drop.
///
/// Wrap a spawned `tokio::process::Child` immediately after `spawn()` to ensure
/// cleanup if the owning future is cancelled. Call `disarm()` after the process
/// exits normally to prevent the kill.
pub struct ChildGuard {
    child: Option<tokio::process::Child>,
}

impl ChildGuard {
    #[must_use]
    pub fn new(child: tokio::process::Child) -> Self {
        Self { child: Some(child) }
    }

    pub fn child_mut(&mut self) -> &mut tokio::process::Child {
        self.child.as_mut().expect("child present")
    }

    pub fn disarm(&mut self) {
        self.child = None;
    }

    /// Kill the child's whole process group (Unix) and reap it.
    pub async fn kill_group(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            unsafe {
                libc::killpg(pid as i32, libc::SIGKILL);
            }
        }
        let _ = child.kill().await;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                unsafe {
                    if libc::killpg(pid as i32, libc::SIGKILL) == -1 {
                        let _ = child.start_kill();
                    }
                }
            }
            let _ = child.try_wait();
        }
        #[cfg(windows)]
        {
            let _ = child.start_kill();
            let _ = child.try_wait();
        }
    }
}

/// Put the child process in its own session (Unix only) so the entire process
/// group can be killed via `killpg` in `ChildGuard::drop`.
#[cfg(unix)]
pub fn set_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            // Linux-only: the search process must not outlive us.
            #[cfg(target_os = "linux")]
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// Strips loader-injection and search-config variables from the child environment.
#[derive(Debug, Clone)]
pub struct EnvSanitizer {
    denylist: GlobSet,
}

impl EnvSanitizer {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, SearchError> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let pat = pat.as_ref();
            let glob = GlobBuilder::new(pat)
                .case_insensitive(true)
                .build()
                .map_err(|e| SearchError::InvalidRequest {
                    message: format!("invalid env denylist pattern '{pat}': {e}"),
                })?;
            builder.add(glob);
        }
        let denylist = builder.build().map_err(|e| SearchError::InvalidRequest {
            message: format!("invalid env denylist: {e}"),
        })?;
        Ok(Self { denylist })
    }

    pub fn with_defaults() -> Result<Self, SearchError> {
        Self::new(DEFAULT_ENV_DENYLIST)
    }

    #[must_use]
    pub fn should_strip(&self, key: &str) -> bool {
        self.denylist.is_match(key)
    }

    fn apply(&self, cmd: &mut Command) {
        for (key, _) in std::env::vars_os() {
            if key.to_str().is_some_and(|k| self.should_strip(k)) {
                cmd.env_remove(&key);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub cwd: Option<PathBuf>,
    /// Hard ceiling on stdout lines read before the child is killed.
    pub max_lines: usize,
    pub timeout: Option<Duration>,
}

impl RunOptions {
    #[must_use]
    pub fn new(max_lines: usize) -> Self {
        Self {
            cwd: None,
            max_lines,
            timeout: None,
        }
    }

    #[must_use]
    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Why stdout reading stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStop {
    /// The child closed stdout on its own.
    Exhausted,
    /// The line cap was reached and the child was killed.
    LineCap,
    /// The deadline passed and the child was killed.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub lines_read: usize,
    pub exit_code: Option<i32>,
    pub stop: RunStop,
    /// Non-empty stderr from a successful run.
    pub diagnostic: Option<String>,
}

impl RunSummary {
    #[must_use]
    pub fn stopped_early(&self) -> bool {
        !matches!(self.stop, RunStop::Exhausted)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub lines: Vec<String>,
    pub summary: RunSummary,
}

/// Spawns the search binary and feeds its stdout lines to a consumer.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
    env: EnvSanitizer,
}

impl ProcessRunner {
    #[must_use]
    pub fn new(binary: PathBuf, env: EnvSanitizer) -> Self {
        Self { binary, env }
    }

    /// Run to completion (or the cap) and collect the non-empty stdout lines.
    pub async fn run<I, S>(&self, args: I, options: &RunOptions) -> Result<ProcessOutput, SearchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut lines = Vec::new();
        let summary = self
            .stream(args, options, |line| lines.push(line.to_string()))
            .await?;
        Ok(ProcessOutput { lines, summary })
    }

    /// Run and hand each non-empty stdout line to `on_line` as it arrives.
    ///
    /// Every line read counts against `max_lines`, blank ones included. Reaching the cap
    /// breaks out of the read loop and kills the child; that is not an error.
    pub async fn stream<I, S, F>(
        &self,
        args: I,
        options: &RunOptions,
        mut on_line: F,
    ) -> Result<RunSummary, SearchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
        F: FnMut(&str),
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        self.env.apply(&mut cmd);

        #[cfg(unix)]
        set_new_session(&mut cmd);

        tracing::debug!(binary = %self.binary.display(), max_lines = options.max_lines, "Spawning search process");
        let child = cmd.spawn().map_err(|source| SearchError::ProcessSpawn {
            binary: self.binary.clone(),
            source,
        })?;
        let mut guard = ChildGuard::new(child);

        let stdout = guard
            .child_mut()
            .stdout
            .take()
            .ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = guard
            .child_mut()
            .stderr
            .take()
            .ok_or_else(|| missing_pipe("stderr"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::with_capacity(1024);
            let _ = stderr.take(MAX_STDERR_BYTES).read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        let deadline = options.timeout.map(|t| Instant::now() + t);
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::with_capacity(4096);
        let mut lines_read = 0usize;
        let mut stop = RunStop::Exhausted;

        if options.max_lines == 0 {
            stop = RunStop::LineCap;
        }
        while stop == RunStop::Exhausted {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf);
            let n = match deadline {
                Some(deadline) => match timeout_at(deadline, read).await {
                    Ok(result) => result?,
                    Err(_) => {
                        stop = RunStop::TimedOut;
                        break;
                    }
                },
                None => read.await?,
            };
            if n == 0 {
                break;
            }
            lines_read += 1;
            let line = decode_line(&buf);
            if !line.trim().is_empty() {
                on_line(&line);
            }
            if lines_read >= options.max_lines {
                stop = RunStop::LineCap;
            }
        }

        if stop != RunStop::Exhausted {
            tracing::debug!(?stop, lines_read, "Stopping search process early");
            guard.kill_group().await;
        }

        let status = guard.child_mut().wait().await?;
        guard.disarm();

        let stderr_text = stderr_task
            .await
            .unwrap_or_else(|e| format!("[stderr task failed: {e}]"));
        let exit_code = status.code();

        if stop == RunStop::Exhausted && !matches!(exit_code, Some(0 | 1)) {
            return Err(SearchError::ProcessExit {
                code: exit_code,
                stderr: stderr_text.trim().to_string(),
            });
        }

        let diagnostic = if stderr_text.trim().is_empty() {
            None
        } else {
            tracing::warn!(stderr = %stderr_text.trim(), "Search process reported diagnostics");
            Some(stderr_text.trim().to_string())
        };

        Ok(RunSummary {
            lines_read,
            exit_code,
            stop,
            diagnostic,
        })
    }
}

fn missing_pipe(name: &str) -> SearchError {
    SearchError::Io(std::io::Error::other(format!("failed to capture {name}")))
}

/// Decode one raw stdout line, dropping the `\n` or `\r\n` terminator.
fn decode_line(raw: &[u8]) -> String {
    let trimmed = raw
        .strip_suffix(b"\n")
        .map(|rest| rest.strip_suffix(b"\r").unwrap_or(rest))
        .unwrap_or(raw);
    String::from_utf8_lossy(trimmed).into_owned()
}
