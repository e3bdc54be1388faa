//! External process invocation with placeholder substitution.
//!
//! Commands are described as a program plus argument templates. A template
//! that is exactly `${key}` is replaced by the bound value as a single argv
//! entry, with no shell in between, so paths containing spaces, quotes or `;`
//! arrive at the tool intact. Templates that merely *contain* `${key}` get a
//! textual replacement.
//!
//! ## Runtime
//!
//! The pipeline is synchronous, but a bounded wait on a child process needs
//! a timer racing the child. [`CommandLine::run`] drives the child on a
//! throwaway current-thread runtime; on timeout the child is killed *and*
//! reaped before returning, so no process or pipe outlives the call.
//! Called from inside an async runtime, `run` returns
//! [`DocViewError::Internal`] without spawning anything; wrap the call in
//! `tokio::task::spawn_blocking` there.

use crate::error::DocViewError;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// Maximum number of stderr characters carried inside error values.
const STDERR_EXCERPT_CHARS: usize = 500;

/// A program plus argument templates and their substitutions.
#[derive(Debug, Clone)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    substitutions: BTreeMap<String, OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            substitutions: BTreeMap::new(),
        }
    }

    /// Append one argument template.
    pub fn arg(mut self, template: impl Into<String>) -> Self {
        self.args.push(template.into());
        self
    }

    /// Append every token of an unparsed parameter string.
    pub fn args_str(mut self, parameters: &str) -> Self {
        self.args.extend(split_parameters(parameters));
        self
    }

    /// Bind `${key}` to `value`.
    pub fn substitute(mut self, key: impl Into<String>, value: impl AsRef<OsStr>) -> Self {
        self.substitutions
            .insert(key.into(), value.as_ref().to_os_string());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// File name of the program, used to label logs and errors.
    pub fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }

    /// The final argv (without the program), substitutions applied.
    pub fn render(&self) -> Vec<OsString> {
        self.args.iter().map(|a| self.render_arg(a)).collect()
    }

    fn render_arg(&self, template: &str) -> OsString {
        if let Some(key) = template
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
        {
            if let Some(value) = self.substitutions.get(key) {
                return value.clone();
            }
        }
        if !template.contains("${") {
            return OsString::from(template);
        }
        let mut out = template.to_string();
        for (key, value) in &self.substitutions {
            out = out.replace(&format!("${{{key}}}"), &value.to_string_lossy());
        }
        OsString::from(out)
    }

    /// Run to completion, optionally bounded by `timeout`.
    ///
    /// A non-zero exit code is *not* an error here; inspect
    /// [`ProcessOutput::exit_code`] and decide at the call site.
    ///
    /// # Errors
    ///
    /// [`DocViewError::Internal`] when called from a thread that is already
    /// driving a tokio runtime, where `block_on` would panic.
    pub fn run(&self, timeout: Option<Duration>) -> Result<ProcessOutput, DocViewError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(DocViewError::Internal(format!(
                "cannot run {} from inside an async runtime; use tokio::task::spawn_blocking",
                self.tool_name()
            )));
        }
        debug!("Executing command: {}", self);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DocViewError::Internal(format!("Failed to create process runtime: {e}")))?;
        runtime.block_on(self.run_async(timeout))
    }

    async fn run_async(&self, timeout: Option<Duration>) -> Result<ProcessOutput, DocViewError> {
        let tool = self.tool_name();
        let started = Instant::now();

        let mut child = tokio::process::Command::new(&self.program)
            .args(self.render())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DocViewError::ToolNotFound {
                tool: tool.clone(),
                source: e,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Pipes are drained while waiting so a chatty tool cannot block on a
        // full pipe buffer.
        let collect = async { tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr)) };

        let joined = match timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, collect).await;
                match waited {
                    Ok(joined) => joined,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill timed-out {}: {}", tool, e);
                        }
                        return Err(DocViewError::ToolTimeout {
                            tool,
                            secs: limit.as_secs(),
                        });
                    }
                }
            }
            None => collect.await,
        };

        let (status, stdout, stderr) = joined;
        let status = status.map_err(|e| DocViewError::io(format!("wait for {tool}"), e))?;

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration: started.elapsed(),
        })
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in self.render() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!("Stopped reading child pipe: {}", e);
        }
    }
    buf
}

/// Result of a completed process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Trailing part of stderr, bounded for use in error values.
    pub fn stderr_excerpt(&self) -> String {
        let trimmed = self.stderr.trim();
        let count = trimmed.chars().count();
        if count <= STDERR_EXCERPT_CHARS {
            trimmed.to_string()
        } else {
            let tail: String = trimmed.chars().skip(count - STDERR_EXCERPT_CHARS).collect();
            format!("…{tail}")
        }
    }

    /// Build the error for a failed run of `tool`.
    pub fn failure(&self, tool: impl Into<String>) -> DocViewError {
        DocViewError::ExternalToolFailure {
            tool: tool.into(),
            exit_code: self.exit_code,
            stderr: self.stderr_excerpt(),
        }
    }
}

/// Split a parameter string on whitespace; quotes group a token.
///
/// `-s "font dir=/a b" -f` → `["-s", "font dir=/a b", "-f"]`.
pub fn split_parameters(parameters: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in parameters.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}
