//! External command abstraction
//!
//! Every external tool (downloader, sort, bgzip, tabix, samtools, LAST,
//! the jbrowse CLI) is invoked through [`CommandRunner`], so the pipeline
//! can be driven by [`SystemRunner`] in production and by a fake in tests.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to start {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("{program} exited with status {code:?}: {stderr}")]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Failed to redirect output of {program} to {path}: {message}")]
    Redirect {
        program: String,
        path: PathBuf,
        message: String,
    },
}

impl CommandError {
    pub fn program(&self) -> &str {
        match self {
            CommandError::Spawn { program, .. }
            | CommandError::Exit { program, .. }
            | CommandError::Redirect { program, .. } => program,
        }
    }
}

/// One external program call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
    /// Capture stdout into this file instead of inheriting it
    pub stdout: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdout: None,
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

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, value)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        if let Some(path) = &self.stdout {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

/// Runs external programs to completion
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), CommandError>;

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<(), CommandError> {
        (**self).run(invocation)
    }

    fn is_available(&self, program: &str) -> bool {
        (**self).is_available(program)
    }
}

/// Runs programs as blocking child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Sibling path that redirected output is written to before it is renamed into place
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), CommandError> {
        log::debug!("Running: {}", invocation);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let partial = invocation.stdout.as_deref().map(partial_path);
        match &partial {
            Some(path) => {
                let file = File::create(path).map_err(|e| CommandError::Redirect {
                    program: invocation.program.clone(),
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                cmd.stdout(Stdio::from(file));
            }
            None => {
                cmd.stdout(Stdio::inherit());
            }
        }

        let output = cmd.output().map_err(|e| CommandError::Spawn {
            program: invocation.program.clone(),
            message: e.to_string(),
        });
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                if let Some(path) = &partial {
                    let _ = fs::remove_file(path);
                }
                return Err(e);
            }
        };

        if !output.status.success() {
            if let Some(path) = &partial {
                let _ = fs::remove_file(path);
            }
            return Err(CommandError::Exit {
                program: invocation.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if let (Some(partial), Some(target)) = (partial, invocation.stdout.as_ref()) {
            fs::rename(&partial, target).map_err(|e| CommandError::Redirect {
                program: invocation.program.clone(),
                path: target.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(())
    }
}
