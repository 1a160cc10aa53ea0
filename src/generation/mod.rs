//! 응답 생성 모듈 - OpenAI Chat Completions
//!
//! 검색된 FAQ 컨텍스트와 대화 이력을 받아
//! 최종 자연어 답변을 생성하는 LLM 프로바이더입니다.
//!
//! source: https://platform.openai.com/docs/api-reference/chat

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::get_api_key;

/// Chat Completions API 엔드포인트
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// 기본 채팅 모델
pub const CHAT_MODEL: &str = "gpt-4";

/// 기본 temperature (사실 기반 답변을 위해 낮게 유지)
pub const CHAT_TEMPERATURE: f32 = 0.1;

/// 429 에러 시 최대 재시도 횟수
const MAX_RETRIES: u32 = 3;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;

// ============================================================================
// Types
// ============================================================================

/// 채팅 메시지
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// system 역할 메시지
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// user 역할 메시지
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// ============================================================================
// ChatProvider Trait
// ============================================================================

/// 응답 생성 프로바이더 트레이트
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// 메시지 목록으로 답변 생성
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Chat
// ============================================================================

/// OpenAI Chat Completions 구현체
#[derive(Debug)]
pub struct OpenAiChat {
    api_key: String,
    client: reqwest::Client,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    /// 새 인스턴스 생성 (기본 모델)
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_model(api_key, CHAT_MODEL.to_string(), CHAT_TEMPERATURE)
    }

    /// 모델/temperature 지정하여 생성
    pub fn with_model(api_key: String, model: String, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            client,
            model,
            temperature,
        })
    }

    /// 환경변수(OPENAI_API_KEY)에서 API 키를 읽어 생성
    pub fn from_env() -> Result<Self> {
        let api_key = get_api_key()?;
        Self::new(api_key)
    }
}

/// Chat Completions 요청 본문
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

/// Chat Completions 응답
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// OpenAI API 에러 응답
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type", default)]
    error_type: String,
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            anyhow::bail!("Cannot complete with empty messages");
        }

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let mut last_error: Option<anyhow::Error> = None;

        // 재시도 루프 (429 에러 시 지수 백오프)
        for attempt in 0..=MAX_RETRIES {
            let response = match self
                .client
                .post(OPENAI_CHAT_URL)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Failed to send chat request: {}", e));
                    if attempt < MAX_RETRIES {
                        let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            "Request failed, retrying in {:?} (attempt {}/{})",
                            backoff,
                            attempt + 1,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            let body = response
                .text()
                .await
                .context("Failed to read response body")?;

            // 성공
            if status.is_success() {
                let completion: ChatCompletionResponse =
                    serde_json::from_str(&body).context("Failed to parse chat response")?;

                let answer = completion
                    .choices
                    .into_iter()
                    .next()
                    .context("Chat response contained no choices")?
                    .message
                    .content;

                return Ok(answer);
            }

            // 429 Rate Limit 에러 - 재시도
            if status.as_u16() == 429 {
                let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                tracing::warn!(
                    "Rate limit hit (429), backing off {:?} (attempt {}/{})",
                    backoff,
                    attempt + 1,
                    MAX_RETRIES
                );
                last_error = Some(anyhow::anyhow!("Rate limit exceeded (429)"));

                if attempt < MAX_RETRIES {
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            } else {
                // 다른 에러 - 즉시 실패
                if let Ok(error) = serde_json::from_str::<OpenAiErrorResponse>(&body) {
                    anyhow::bail!(
                        "OpenAI API error ({}): {}",
                        error.error.error_type,
                        error.error.message
                    );
                }
                anyhow::bail!("OpenAI API error ({}): {}", status, body);
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after {} retries", MAX_RETRIES)))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 채팅 프로바이더 생성 (OpenAI API)
pub fn create_chat_model() -> Result<OpenAiChat> {
    let chat = OpenAiChat::from_env()?;
    tracing::info!(
        "Using OpenAI chat model {} (temperature: {})",
        chat.name(),
        CHAT_TEMPERATURE
    );
    Ok(chat)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let system = ChatMessage::system("You are helpful.");
        assert_eq!(system.role, "system");
        assert_eq!(system.content, "You are helpful.");

        let user = ChatMessage::user("How do I earn gold?");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn test_chat_request_json() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatRequest {
            model: CHAT_MODEL,
            messages: &messages,
            temperature: CHAT_TEMPERATURE,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""model":"gpt-4""#));
        assert!(json.contains(r#""role":"user""#));
        assert!(json.contains(r#""temperature":0.1"#));
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Gold can be earned daily."}}
            ],
            "model": "gpt-4"
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content,
            "Gold can be earned daily."
        );
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_messages() {
        let chat = OpenAiChat::new("fake_key".to_string()).unwrap();
        let result = chat.complete(&[]).await;
        assert!(result.is_err());
    }
}
