//! Replay of recorded brightness frames.
//!
//! File format: one frame per line, values separated by commas and/or
//! whitespace, `#` starts a comment, blank lines are skipped. After the
//! last frame the final frame is returned forever, like a screen that has
//! stopped changing.

use anyhow::{Context, Result};
use std::path::Path;

use super::Sampler;
use crate::types::RoundwatchError;

#[derive(Debug, Clone)]
pub struct ReplaySampler {
    frames: Vec<Vec<f64>>,
    next: usize,
}

impl ReplaySampler {
    pub fn from_frames(frames: Vec<Vec<f64>>) -> Self {
        Self { frames, next: 0 }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file: {}", path.display()))?;
        let sampler = Self::parse(&text)
            .with_context(|| format!("Failed to parse replay file: {}", path.display()))?;
        Ok(sampler)
    }

    pub fn parse(text: &str) -> Result<Self, RoundwatchError> {
        let mut frames = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let frame = content
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|v| !v.is_empty())
                .map(|v| {
                    v.parse::<f64>().map_err(|e| {
                        RoundwatchError::Sampler(format!("line {}: bad value {v:?}: {e}", lineno + 1))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            frames.push(frame);
        }
        Ok(Self::from_frames(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Sampler for ReplaySampler {
    fn sample(&mut self) -> Option<Vec<f64>> {
        let last = self.frames.len().checked_sub(1)?;
        let frame = self.frames[self.next.min(last)].clone();
        self.next = self.next.saturating_add(1);
        Some(frame)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
