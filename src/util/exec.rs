use std::ffi::OsString;
use std::io::{self, BufRead, BufReader};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use wait_timeout::ChildExt;

/// How the child's stdio is wired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// stdout and stderr are piped and returned.
    #[default]
    Capture,
    /// stdio is inherited; nothing is returned.
    Inherit,
    /// stdout is inherited; stderr is echoed line by line and also returned.
    TeeStderr,
}

/// Structured command execution with optional timeouts.
#[derive(Debug, Clone)]
pub struct ExecService {
    default_timeout: Duration,
}

impl ExecService {
    /// A zero timeout waits indefinitely.
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn run(&self, request: ExecRequest) -> Result<ExecOutput> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args);

        match request.mode {
            OutputMode::Capture => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            OutputMode::Inherit => {}
            OutputMode::TeeStderr => {
                cmd.stderr(Stdio::piped());
            }
        }

        tracing::debug!(program = ?request.program, args = ?request.args, "spawning");
        let mut child = cmd.spawn().with_context(|| {
            format!(
                "failed to spawn {:?} with args {:?}",
                request.program, request.args
            )
        })?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if request.mode == OutputMode::TeeStderr {
            if let Some(pipe) = child.stderr.take() {
                for line in BufReader::new(pipe).lines() {
                    let line = line.context("failed to read process stderr")?;
                    eprintln!("{line}");
                    stderr.push_str(&line);
                    stderr.push('\n');
                }
            }
        }

        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let status = match request.mode {
            OutputMode::Capture if timeout.is_zero() => {
                let out = child
                    .wait_with_output()
                    .context("failed to wait for process")?;
                stdout = String::from_utf8_lossy(&out.stdout).into_owned();
                stderr = String::from_utf8_lossy(&out.stderr).into_owned();
                out.status
            }
            OutputMode::Capture => {
                let mut stdout_pipe = child.stdout.take();
                let mut stderr_pipe = child.stderr.take();
                let status = match child
                    .wait_timeout(timeout)
                    .context("failed to wait with timeout")?
                {
                    Some(status) => status,
                    None => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(anyhow!(
                            "command {:?} timed out after {:?}",
                            request.program,
                            timeout
                        ));
                    }
                };
                stdout = read_stream(stdout_pipe.as_mut())?;
                stderr = read_stream(stderr_pipe.as_mut())?;
                status
            }
            OutputMode::Inherit | OutputMode::TeeStderr => {
                child.wait().context("failed to wait for process")?
            }
        };

        Ok(ExecOutput {
            status,
            stdout,
            stderr,
        })
    }
}

fn read_stream(stream: Option<&mut impl io::Read>) -> Result<String> {
    let mut buf = String::new();
    if let Some(reader) = stream {
        io::Read::read_to_string(reader, &mut buf).context("failed to read process output")?;
    }
    Ok(buf)
}

impl Default for ExecService {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[derive(Debug, Default)]
pub struct ExecRequest {
    program: OsString,
    args: Vec<OsString>,
    timeout: Option<Duration>,
    mode: OutputMode,
}

impl ExecRequest {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Human-readable rendering of the command line for error messages.
    pub fn display(&self) -> String {
        let mut words = vec![self.program.to_string_lossy().into_owned()];
        words.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        crate::util::shell_join(&words)
    }
}

#[derive(Debug)]
pub struct ExecOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, with signal termination reported as 1.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(1)
    }
}
