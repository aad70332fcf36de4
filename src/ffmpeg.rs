//! FFmpeg/FFprobe command wrapper utilities
//!
//! Every probe and extraction runs exactly one external process. Commands that
//! stream a buffer into the child feed stdin from a scoped thread while the
//! calling thread drains stdout and stderr, so neither side can stall the other.

use std::ffi::{OsStr, OsString};
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use std::process::{ChildStdin, Command, Output, Stdio};
use std::thread;
use thiserror::Error;
use tracing::debug;

/// Input specifier that makes the engine read from stdin.
pub const PIPE_INPUT: &str = "pipe:0";

/// Output specifier that makes the engine write to stdout.
pub const PIPE_OUTPUT: &str = "pipe:1";

#[derive(Debug, Error)]
pub enum FfmpegError {
    #[error("{program} not found in system PATH")]
    NotInstalled { program: String },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {code:?}: {stderr}")]
    ExecutionFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FfmpegError {
    /// Diagnostic text the engine wrote to stderr, if it got that far.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            FfmpegError::ExecutionFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl FfmpegCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push("-i".into());
        self.args.push(path.as_ref().as_os_str().to_os_string());
        self
    }

    /// Read the media stream from stdin.
    pub fn input_pipe(mut self) -> Self {
        self.args.push("-i".into());
        self.args.push(PIPE_INPUT.into());
        self
    }

    pub fn output(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push(path.as_ref().as_os_str().to_os_string());
        self
    }

    /// Write the encoded result to stdout.
    pub fn output_pipe(mut self) -> Self {
        self.args.push(PIPE_OUTPUT.into());
        self
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(OsString::from));
        self
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn command(&self) -> Command {
        debug!(program = %self.program_name(), args = ?self.args, "invoking media engine");
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn spawn_error(&self, source: io::Error) -> FfmpegError {
        if source.kind() == ErrorKind::NotFound {
            FfmpegError::NotInstalled {
                program: self.program_name(),
            }
        } else {
            FfmpegError::Spawn {
                program: self.program_name(),
                source,
            }
        }
    }

    fn check_status(&self, output: Output) -> Result<Output, FfmpegError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FfmpegError::ExecutionFailed {
                program: self.program_name(),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run with stdin closed and capture stdout/stderr.
    pub fn execute(self) -> Result<Output, FfmpegError> {
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        self.check_status(output)
    }

    /// Run while streaming `input` into stdin.
    ///
    /// The feeder runs on its own thread for the whole lifetime of the child;
    /// stdout and stderr are drained concurrently by `wait_with_output`. A child
    /// that exits before consuming all input (ffprobe typically stops after the
    /// headers) closes the pipe early, which is not treated as a failure.
    pub fn execute_with_input(self, input: &[u8]) -> Result<Output, FfmpegError> {
        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(ErrorKind::BrokenPipe, "child stdin was not captured"))?;

        let (output, fed) = thread::scope(|scope| {
            let feeder = scope.spawn(move || feed(stdin, input));
            let output = child.wait_with_output();
            let fed = feeder
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(ErrorKind::Other, "stdin feeder panicked")));
            (output, fed)
        });

        let output = self.check_status(output?)?;
        fed?;
        Ok(output)
    }
}

fn feed(mut stdin: ChildStdin, input: &[u8]) -> io::Result<()> {
    match stdin.write_all(input) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            debug!(bytes = input.len(), "engine closed stdin before consuming all input");
            Ok(())
        }
        Err(e) => Err(e),
    }
    // stdin dropped here: the child sees EOF
}

/// Whether `program` can be spawned at all.
pub fn is_installed(program: impl AsRef<OsStr>) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
