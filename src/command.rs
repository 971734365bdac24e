use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

use crate::error::ToolFailure;

/// Invocation of an external tool, built up argument by argument
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<OsString>,
    pub description: String,
}

impl ToolCommand {
    /// Create a new command for the given program
    pub fn new<S1: Into<String>, S2: Into<String>>(program: S1, description: S2) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a path argument without lossy conversion
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().as_os_str())
    }

    /// Add a flag followed by its value
    pub fn option<S1: Into<OsString>, S2: Into<OsString>>(self, flag: S1, value: S2) -> Self {
        self.arg(flag).arg(value)
    }

    /// Arguments as displayable strings, for logging and tests
    pub fn display_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    /// Run the command to completion, capturing its output.
    ///
    /// Blocks (asynchronously) until the process exits; there is no timeout.
    pub async fn execute(&self) -> Result<Output, ToolFailure> {
        debug!("Executing {}: {} {}", self.description, self.program, self.display_args().join(" "));

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ToolFailure::NotFound {
                    program: self.program.clone(),
                },
                _ => ToolFailure::Spawn {
                    program: self.program.clone(),
                    source: e,
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            debug!("{} failed with status {:?}", self.description, output.status.code());
            return Err(ToolFailure::Exited {
                program: self.program.clone(),
                status: output.status.code(),
                stderr,
            });
        }

        Ok(output)
    }
}
