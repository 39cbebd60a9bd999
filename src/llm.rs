//! Chat-completion client for turning document text into JSON.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint; the defaults
//! point at Groq. Responses are requested as a server-sent event stream and
//! relayed chunk by chunk into a writer as they arrive.

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";
/// Environment variable overriding the API base URL.
pub const BASE_URL_VAR: &str = "GROQ_BASE_URL";
/// Environment variable overriding the model.
pub const MODEL_VAR: &str = "GROQ_MODEL";

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.2-1b-preview";

const DEFAULT_SYSTEM_PROMPT: &str = "Convert the following text content to a well-structured JSON format. Create appropriate keys and organize the content logically. Ensure the output is valid JSON.";
const ASSISTANT_PREFILL: &str =
    "I will convert this text to JSON format, organizing it in a logical structure.";

/// Connection and sampling settings for the completion request.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Config with default endpoint and sampling settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            top_p: 1.0,
            timeout_secs: 120,
        }
    }

    /// Read the key, base URL and model from the environment.
    ///
    /// Fails with [`Error::MissingApiKey`] when `GROQ_API_KEY` is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingApiKey(API_KEY_VAR))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        if let Some(model) = lookup(MODEL_VAR) {
            config.model = model;
        }
        Ok(config)
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the completion token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Blocking client for streamed chat completions.
pub struct GroqClient {
    http: reqwest::blocking::Client,
    config: LlmConfig,
}

impl GroqClient {
    /// Build a client for the given config.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let mut builder =
            reqwest::blocking::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        // Local OpenAI-compatible servers must not go through a system proxy.
        if is_loopback(&config.base_url) {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    /// Build a client from `GROQ_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(LlmConfig::from_env()?)
    }

    /// Config in use.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn build_request<'a>(&'a self, text: &str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage::new("system", self.config.system_prompt.as_str()),
                ChatMessage::new("user", text),
                ChatMessage::new("assistant", ASSISTANT_PREFILL),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            stream: true,
        }
    }

    /// Send `text` as the user turn and stream the answer into `sink`.
    ///
    /// Returns the complete answer once the stream ends.
    pub fn stream_completion<W: Write>(&self, text: &str, sink: &mut W) -> Result<String> {
        let request = self.build_request(text);
        log::info!(
            "Requesting completion from {} ({} chars of input)",
            self.config.model,
            text.len()
        );

        let response = self
            .http
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Llm(format!(
                "request failed with status {}: {}",
                status, body
            )));
        }

        relay_event_stream(BufReader::new(response), sink)
    }
}

fn is_loopback(base_url: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(base_url) else {
        return false;
    };
    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case("localhost") => true,
        Some(host) => host
            .trim_matches(|c| c == '[' || c == ']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

/// Copy the content deltas of a chat-completion event stream into `sink`.
///
/// Each event is a `data: {json}` line; `data: [DONE]` ends the stream.
/// Blank lines, comments and other SSE fields are skipped. The sink is
/// flushed after every chunk so output shows up as it is generated.
pub fn relay_event_stream<R: BufRead, W: Write>(reader: R, sink: &mut W) -> Result<String> {
    let mut full = String::new();

    for line in reader.lines() {
        let line = line?;
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            break;
        }
        if data.is_empty() {
            continue;
        }

        let chunk: StreamChunk = serde_json::from_str(data)
            .map_err(|e| Error::Llm(format!("malformed stream chunk: {}", e)))?;

        let content = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .unwrap_or_default();

        if !content.is_empty() {
            sink.write_all(content.as_bytes())?;
            sink.flush()?;
            full.push_str(&content);
        }
    }

    Ok(full)
}
