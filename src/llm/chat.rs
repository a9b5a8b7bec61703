//! Chat-completions predictor.
//!
//! Talks to any OpenAI-compatible chat completions endpoint (OpenRouter by
//! default, OpenAI or a local gateway via `base_url`). The system prompt
//! carries the run/alternation scoring rules; the user message is the
//! JSON history context.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::{request_context, Predictor};
use crate::types::SymbolSequence;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_MAX_TOKENS: u32 = 512;

/// Retries on 429 / 5xx. Kept low: the caller's timeout bounds the whole call.
const MAX_RETRIES: u32 = 1;
const BASE_BACKOFF_MS: u64 = 500;

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

impl ChatResponse {
    fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ChatPredictor {
    http: Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    max_tokens: u32,
    total_calls: AtomicU64,
    total_tokens: AtomicU64,
}

impl ChatPredictor {
    /// - `base_url`: API root without the `/chat/completions` suffix.
    pub fn new(
        api_key: SecretString,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build chat HTTP client")?;

        let base = base_url.unwrap_or_else(|| OPENROUTER_BASE_URL.to_string());
        Ok(Self {
            http,
            api_key,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            total_calls: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens.load(Ordering::Relaxed)
    }

    pub fn system_prompt() -> &'static str {
        "ROLE\n\
         You are a cold, rational pattern analyst for a two-outcome round game that may be manipulated.\n\
         The input is the most recent round results, oldest first, newest last: \"T\" and \"X\" are the two outcomes.\n\
         Output exactly one pick: T, X, or S (skip).\n\n\
         ANALYSIS\n\
         1. Last run: symbol and length of the final streak.\n\
         2. Previous run: symbol and length of the streak before it.\n\
         3. Proportions p_T and p_X over the whole history.\n\
         4. Alternation rate: symbol changes divided by (length - 1).\n\
         5. Oscillation: last and previous runs both have length >= 4 and opposite symbols.\n\
         6. Dominance: max(p_T, p_X).\n\n\
         SCORING (anti-run, follow, skip all start at 0)\n\
         - Oscillation: anti-run += 2.\n\
         - Last run >= 5 and previous run <= 2: anti-run += 1.\n\
         - Last run >= 5 and no oscillation: skip += 1.\n\
         - Last run between 1 and 3 and dominance >= 0.6: follow += 1.\n\
         - Alternation >= 0.7: skip += 2.\n\
         - Dominance >= 0.65: follow += 1.\n\n\
         DECISION\n\
         - anti-run strictly highest: pick the opposite of the last run symbol.\n\
         - follow strictly highest: pick the last run symbol.\n\
         - otherwise: S.\n\n\
         OUTPUT\n\
         Respond with strict JSON only:\n\
         {\"pick\": \"T\" | \"X\" | \"S\", \"signals\": {\"last_streak\": int, \"prev_streak\": int, \"p_T\": float, \"p_X\": float, \"alternation\": float, \"oscillation\": bool, \"scores\": {\"anti-run\": int, \"follow\": int, \"skip\": int}}, \"rationale\": \"at most 20 words\"}"
    }

    pub fn build_user_prompt(history: &SymbolSequence, retry: bool) -> String {
        let mut prompt = format!("History JSON: {}", request_context(history, retry));
        if retry {
            prompt.push_str(
                "\nYour previous answer was a skip. Re-evaluate the scores once more; \
                 skip again only if no rule gives a strict winner.",
            );
        }
        prompt
    }

    /// Send one chat completion with retry + backoff.
    async fn call_api(&self, user_message: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, model = %self.model, "Retrying chat call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(self.api_key.expose_secret())
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to parse chat completion response")?;

                        let tokens = body.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0);
                        self.total_calls.fetch_add(1, Ordering::Relaxed);
                        self.total_tokens.fetch_add(tokens, Ordering::Relaxed);

                        return Ok(body.text());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, error = %error_text, "Retryable chat API error");
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("Chat API error {status} (model={}): {error_text}", self.model);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Chat request failed");
                    last_error = Some(format!("Request error: {e}"));
                }
            }
        }

        anyhow::bail!(
            "Chat API failed after {} retries (model={}): {}",
            MAX_RETRIES,
            self.model,
            last_error.unwrap_or_default()
        )
    }
}

#[async_trait]
impl Predictor for ChatPredictor {
    async fn predict(&self, history: &SymbolSequence, retry: bool) -> Result<String> {
        debug!(history = %history, retry, model = %self.model, "Requesting pick");
        self.call_api(&Self::build_user_prompt(history, retry)).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
