use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RequestError;
use crate::state::ChatTurn;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: String,
}

/// Endpoint and timeout settings, fixed for the lifetime of a client
#[derive(Debug, Clone)]
pub struct GeminiOptions {
    pub api_base: String,
    pub model: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for GeminiOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    url: String,
}

impl GeminiClient {
    /// Build a client for `generateContent`.
    ///
    /// A missing key is not an error here; every call will then be rejected
    /// by the endpoint and reported as a protocol failure.
    pub fn new(options: &GeminiOptions, api_key: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let url = format!(
            "{}/v1/models/{}:generateContent?key={}",
            options.api_base.trim_end_matches('/'),
            options.model,
            urlencoding::encode(api_key.unwrap_or_default())
        );

        Ok(Self { client, url })
    }

    /// Send the whole transcript and return the model's reply text.
    pub async fn generate(&self, turns: &[ChatTurn]) -> Result<String, RequestError> {
        let request = GenerateRequest {
            contents: turns
                .iter()
                .map(|turn| GeminiContent {
                    role: turn.role.as_str(),
                    parts: [GeminiPart { text: &turn.text }],
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RequestError::transport(&self.url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::transport(&self.url, e))?;

        if !status.is_success() {
            return Err(RequestError::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        debug!(bytes = body.len(), "Received generateContent reply");
        parse_reply(&body)
    }
}

fn parse_reply(body: &str) -> Result<String, RequestError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| RequestError::Decode {
            message: e.to_string(),
        })?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| RequestError::Decode {
            message: "reply has no candidate text".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let turns = vec![ChatTurn::user("hi"), ChatTurn::model("hello [F05]")];
        let request = GenerateRequest {
            contents: turns
                .iter()
                .map(|turn| GeminiContent {
                    role: turn.role.as_str(),
                    parts: [GeminiPart { text: &turn.text }],
                })
                .collect(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello [F05]"}]}
                ]
            })
        );
    }

    #[test]
    fn test_parse_reply_takes_first_candidate_part() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"first"},{"text":"second"}]}},
            {"content":{"parts":[{"text":"other"}]}}]}"#;
        assert_eq!(parse_reply(body).unwrap(), "first");
    }

    #[test]
    fn test_parse_reply_rejects_empty_candidates() {
        let err = parse_reply(r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, RequestError::Decode { .. }));
    }

    #[test]
    fn test_parse_reply_rejects_malformed_json() {
        let err = parse_reply("<html>oops</html>").unwrap_err();
        assert_eq!(err.code(), 0);
    }

    #[test]
    fn test_key_is_url_encoded() {
        let client = GeminiClient::new(&GeminiOptions::default(), Some("a b/c")).unwrap();
        assert!(client.url.ends_with("gemini-2.5-flash:generateContent?key=a%20b%2Fc"));
    }
}
