//! Subprocess predictor.
//!
//! Runs a local program per request: the JSON history context is written to
//! its stdin and its stdout is taken as the response payload. Suits local
//! model scripts that print `{"pick": "..."}`. The child is killed if the
//! call is abandoned by the timeout guard.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{request_context, Predictor};
use crate::types::{RoundwatchError, SymbolSequence};

pub struct CommandPredictor {
    program: String,
    args: Vec<String>,
    label: String,
}

impl CommandPredictor {
    /// `argv[0]` is the program, the rest are its arguments.
    pub fn new(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| RoundwatchError::Predictor {
            predictor: "command".to_string(),
            message: "command must name a program".to_string(),
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            label: argv.join(" "),
        })
    }
}

#[async_trait]
impl Predictor for CommandPredictor {
    async fn predict(&self, history: &SymbolSequence, retry: bool) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn predictor: {}", self.label))?;

        let input = request_context(history, retry);
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .context("Failed to write predictor stdin")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to read predictor output")?;

        if !output.status.success() {
            anyhow::bail!("Predictor exited with {}", output.status);
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(predictor = %self.label, bytes = text.len(), "Predictor responded");
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
