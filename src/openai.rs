//! OpenAI client configuration with sensible defaults.

use crate::error::{Result, VidqaError};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Error code returned by the API when a prompt does not fit the model.
const CONTEXT_LENGTH_EXCEEDED: &str = "context_length_exceeded";

/// Credentials for the hosted API, passed explicitly to every client.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    api_base: Option<String>,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: None,
        }
    }

    /// Point the client at a different API base URL (proxies, compatible servers).
    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        self.api_base = api_base.filter(|b| !b.is_empty());
        self
    }

    fn to_config(&self) -> OpenAIConfig {
        let config = OpenAIConfig::new().with_api_key(self.api_key.clone());
        match &self.api_base {
            Some(base) => config.with_api_base(base.clone()),
            None => config,
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Create an OpenAI client with the default timeout.
pub fn create_client(credentials: &ApiCredentials) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(credentials, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(
    credentials: &ApiCredentials,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(credentials.to_config()).with_http_client(http_client))
}

/// Convert an API error into a library error.
///
/// Context-length failures become [`VidqaError::ContextWindowExceeded`] so callers
/// can pick a strategy that fits; everything else is reported as an API error.
pub fn map_api_error(context: &str, err: OpenAIError) -> VidqaError {
    if let OpenAIError::ApiError(api) = &err {
        if api.code.as_deref() == Some(CONTEXT_LENGTH_EXCEEDED) {
            let (limit, tokens) = parse_context_length_message(&api.message);
            return VidqaError::ContextWindowExceeded { tokens, limit };
        }
    }
    VidqaError::OpenAI(format!("{}: {}", context, err))
}

/// Pull "(limit, tokens)" out of the API's context length message.
///
/// The message reads like "maximum context length is 16385 tokens. However, your
/// messages resulted in 20112 tokens". Missing numbers come back as 0.
fn parse_context_length_message(message: &str) -> (usize, usize) {
    static LIMIT: OnceLock<Regex> = OnceLock::new();
    static TOKENS: OnceLock<Regex> = OnceLock::new();

    let limit_re = LIMIT.get_or_init(|| {
        Regex::new(r"maximum context length is (\d+)").expect("static regex")
    });
    let tokens_re = TOKENS.get_or_init(|| {
        Regex::new(r"resulted in (\d+) tokens").expect("static regex")
    });

    let grab = |re: &Regex| {
        re.captures(message)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    (grab(limit_re), grab(tokens_re))
}
