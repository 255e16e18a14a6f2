//! External programs: the conversion engine and the end-of-run suspend hook.

use std::path::Path;
use std::process::{Command, Output};

use docsync_core::config::CommandConfig;
use docsync_core::{Converter, RemoteError, SuspendHook};

const INPUT_PLACEHOLDER: &str = "{input}";
const LANGUAGE_PLACEHOLDER: &str = "{language}";

fn run(program: &str, args: &[String]) -> Result<Output, RemoteError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| RemoteError::Command {
            program: program.to_string(),
            message: e.to_string(),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RemoteError::Command {
            program: program.to_string(),
            message: format!("{}: {}", output.status, stderr.trim()),
        });
    }
    Ok(output)
}

/// Runs `program args...` with `{input}` and `{language}` substituted and
/// takes its stdout as the extracted text.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(config: &CommandConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn args_for(&self, document: &Path, language: &str) -> Vec<String> {
        let input = document.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(LANGUAGE_PLACEHOLDER, language)
            })
            .collect()
    }
}

impl Converter for CommandConverter {
    fn convert(&self, document: &Path, language: &str) -> Result<String, RemoteError> {
        let args = self.args_for(document, language);
        let output = run(&self.program, &args)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs a configured command to suspend or shut down the host.
#[derive(Debug, Clone)]
pub struct CommandHook {
    program: String,
    args: Vec<String>,
}

impl CommandHook {
    pub fn new(config: &CommandConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }
}

impl SuspendHook for CommandHook {
    fn suspend(&self) -> Result<(), RemoteError> {
        tracing::info!(program = %self.program, "running suspend command");
        run(&self.program, &self.args).map(|_| ())
    }
}
