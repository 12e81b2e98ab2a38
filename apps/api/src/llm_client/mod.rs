/// LLM Client — the single point of entry for all Gemini API calls.
///
/// Wraps the `generateContent` endpoint with bounded retry and exponential
/// backoff. Callers hand in a finished prompt and get back the decoded
/// response envelope; interpreting the generated text is their job.
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::GeminiConfig;

pub mod prompts;
pub mod retry;

use retry::{AttemptOutcome, RetryPolicy};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingConfiguration,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response envelope: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Upstream unavailable (status {status}): {message}")]
    UpstreamUnavailable { status: u16, message: String },

    #[error("Upstream rejected request (status {status}): {message}")]
    UpstreamRejected { status: u16, message: String },

    #[error("empty response")]
    EmptyResponse,

    #[error("Gemini API unavailable after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if non-empty.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Pulls `error.message` out of a Gemini error body, falling back to the raw body.
fn upstream_message(body: String) -> String {
    serde_json::from_str::<GeminiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            retry: RetryPolicy::default(),
        })
    }

    #[allow(dead_code)]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sends `prompt` to the generation endpoint.
    ///
    /// Retryable failures (5xx, 429, transport errors, a missing API key) are
    /// retried with exponential backoff until the policy runs out of attempts;
    /// the last such error is returned. Any other non-success status returns
    /// immediately.
    pub async fn generate(&self, prompt: &str) -> Result<GenerateContentResponse, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let max_attempts = self.retry.max_attempts;
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..max_attempts {
            info!("[Attempt {}/{}] Calling Gemini API", attempt + 1, max_attempts);

            match self.attempt(&request_body).await {
                AttemptOutcome::Success(response) => return Ok(response),
                AttemptOutcome::Terminal(e) => {
                    error!("Gemini API rejected request: {e}");
                    return Err(e);
                }
                AttemptOutcome::Retryable(e) => {
                    if self.retry.has_attempts_left(attempt) {
                        let delay = self.retry.delay_after(attempt);
                        warn!(
                            "Gemini attempt {} failed: {e}. Retrying in {}ms",
                            attempt + 1,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        let e = last_error.unwrap_or(LlmError::ExhaustedRetries {
            attempts: max_attempts,
        });
        error!("Gemini call failed, all retries exhausted: {e}");
        Err(e)
    }

    async fn attempt(
        &self,
        request_body: &GenerateContentRequest<'_>,
    ) -> AttemptOutcome<GenerateContentResponse> {
        // Checked per attempt: a missing key is treated like any thrown call.
        let Some(api_key) = self.config.api_key.as_deref() else {
            return AttemptOutcome::Retryable(LlmError::MissingConfiguration);
        };

        let response = match self
            .client
            .post(&self.config.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(request_body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return AttemptOutcome::Retryable(LlmError::Http(e)),
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return AttemptOutcome::Retryable(LlmError::UpstreamUnavailable {
                status: status.as_u16(),
                message: upstream_message(body),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return AttemptOutcome::Terminal(LlmError::UpstreamRejected {
                status: status.as_u16(),
                message: upstream_message(body),
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return AttemptOutcome::Retryable(LlmError::Http(e)),
        };
        debug!("Gemini raw response: {body}");

        match serde_json::from_str::<GenerateContentResponse>(&body) {
            Ok(parsed) => AttemptOutcome::Success(parsed),
            Err(e) => AttemptOutcome::Retryable(LlmError::Decode(e)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) const TEST_API_KEY: &str = "test-key";

    pub(crate) fn test_config(server: &MockServer, api_key: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.map(str::to_string),
            endpoint: format!("{}/generate", server.uri()),
            temperature: 0.2,
            timeout: Duration::from_secs(5),
        }
    }

    pub(crate) fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        }
    }

    pub(crate) fn candidate_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ], "role": "model" } }
            ]
        })
    }

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(test_config(server, Some(TEST_API_KEY)))
            .unwrap()
            .with_retry_policy(fast_retry())
    }

    async fn mount_status(server: &MockServer, status: u16, times: u64) {
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "error": { "code": status, "message": "boom" } })),
            )
            .up_to_n_times(times)
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_sends_prompt_and_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(header(API_KEY_HEADER, TEST_API_KEY))
            .and(body_partial_json(json!({
                "contents": [ { "parts": [ { "text": "hello" } ] } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("hi")))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).generate("hello").await.unwrap();
        assert_eq!(response.text(), Some("hi"));
    }

    #[tokio::test]
    async fn test_two_server_errors_then_success_makes_three_attempts() {
        let server = MockServer::start().await;
        mount_status(&server, 500, 2).await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("third")))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).generate("p").await.unwrap();
        assert_eq!(response.text(), Some("third"));
    }

    #[tokio::test]
    async fn test_default_backoff_waits_one_then_two_seconds() {
        let server = MockServer::start().await;
        mount_status(&server, 503, 2).await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(&server, Some(TEST_API_KEY))).unwrap();
        let started = Instant::now();
        client.generate("p").await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_three_server_errors_exhaust_attempts() {
        let server = MockServer::start().await;
        mount_status(&server, 500, 3).await;

        let err = client(&server).generate("p").await.unwrap_err();
        match err {
            LlmError::UpstreamUnavailable { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected UpstreamUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        mount_status(&server, 429, 1).await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).generate("p").await.is_ok());
    }

    #[tokio::test]
    async fn test_client_error_fails_after_one_attempt() {
        let server = MockServer::start().await;
        mount_status(&server, 400, 1).await;

        let started = Instant::now();
        let err = client(&server).generate("p").await.unwrap_err();

        assert!(matches!(
            err,
            LlmError::UpstreamRejected { status: 400, .. }
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_retried_without_calling_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(&server, None))
            .unwrap()
            .with_retry_policy(fast_retry());

        let err = client.generate("p").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingConfiguration));
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).generate("p").await.unwrap();
        assert_eq!(response.text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_zero_attempt_policy_reports_exhaustion() {
        let server = MockServer::start().await;
        let client = GeminiClient::new(test_config(&server, Some(TEST_API_KEY)))
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 0,
                base_delay: Duration::from_millis(1),
            });

        let err = client.generate("p").await.unwrap_err();
        assert!(matches!(err, LlmError::ExhaustedRetries { attempts: 0 }));
        assert_eq!(
            err.to_string(),
            "Gemini API unavailable after 0 attempts"
        );
    }

    #[test]
    fn test_text_reads_first_part_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "first" }, { "text": "second" } ] } },
                { "content": { "parts": [ { "text": "other" } ] } }
            ]
        }))
        .unwrap();
        assert_eq!(response.text(), Some("first"));
    }

    #[test]
    fn test_text_is_none_for_missing_or_empty_content() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [ {} ] }),
            json!({ "candidates": [ { "content": { "parts": [] } } ] }),
            json!({ "candidates": [ { "content": { "parts": [ { "text": "" } ] } } ] }),
        ] {
            let response: GenerateContentResponse = serde_json::from_value(body.clone()).unwrap();
            assert!(response.text().is_none(), "expected no text for {body}");
        }
    }

    #[test]
    fn test_upstream_message_prefers_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(upstream_message(body.to_string()), "API key not valid");
        assert_eq!(upstream_message("plain".to_string()), "plain");
    }
}
