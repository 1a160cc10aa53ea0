//! 임베딩 모듈 - OpenAI API를 통한 텍스트 벡터화
//!
//! FAQ 제목과 사용자 질문을 벡터로 변환하는 임베딩 프로바이더입니다.
//! 시맨틱 검색을 위한 핵심 모듈입니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::from_env()?;
//! let embedding = embedder.embed("How do I earn gold?").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// OpenAI 임베딩 API 엔드포인트
/// source: https://platform.openai.com/docs/api-reference/embeddings
const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

/// 임베딩 모델
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// 임베딩 차원 (text-embedding-ada-002 고정값)
pub const EMBEDDING_DIMENSION: usize = 1536;

/// Rate Limiter 설정 (OpenAI 기본 티어: 500 RPM)
const RATE_LIMIT_RPM: u32 = 500;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
/// 호출 간 최소 딜레이 (버스트 방지)
const MIN_DELAY_MS: u64 = 50;
/// 429 에러 시 최대 재시도 횟수
const MAX_RETRIES: u32 = 3;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;
/// 배치 요청당 최대 입력 수
const MAX_BATCH_INPUTS: usize = 64;

/// OpenAI 임베딩 구현체
#[derive(Debug)]
pub struct OpenAiEmbedding {
    api_key: String,
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

/// Rate Limiter with minimum delay between requests
#[derive(Debug)]
struct RateLimiter {
    requests: Vec<Instant>,
    max_requests: u32,
    window: Duration,
    min_delay: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Vec::new(),
            max_requests,
            window,
            min_delay: Duration::from_millis(MIN_DELAY_MS),
            last_request: None,
        }
    }

    /// 요청 가능 여부 확인 및 대기
    async fn acquire(&mut self) {
        // 1. 최소 딜레이 적용 (버스트 방지)
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                tracing::debug!("Min delay: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        let now = Instant::now();

        // 2. 윈도우 밖의 오래된 요청 제거
        self.requests.retain(|&t| now.duration_since(t) < self.window);

        // 3. Rate limit 초과 시 대기
        if self.requests.len() >= self.max_requests as usize {
            if let Some(&oldest) = self.requests.first() {
                let wait_time = self.window - now.duration_since(oldest);
                if !wait_time.is_zero() {
                    tracing::debug!("Rate limit reached, waiting {:?}", wait_time);
                    tokio::time::sleep(wait_time).await;
                }
                // 대기 후 다시 정리
                let now = Instant::now();
                self.requests.retain(|&t| now.duration_since(t) < self.window);
            }
        }

        // 4. 현재 요청 기록
        let now = Instant::now();
        self.requests.push(now);
        self.last_request = Some(now);
    }
}

impl OpenAiEmbedding {
    /// 새 OpenAI 임베딩 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API 키
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limiter = Arc::new(Mutex::new(RateLimiter::new(
            RATE_LIMIT_RPM,
            RATE_LIMIT_WINDOW,
        )));

        Ok(Self {
            api_key,
            client,
            rate_limiter,
        })
    }

    /// 환경변수(OPENAI_API_KEY)에서 API 키를 읽어 생성
    pub fn from_env() -> Result<Self> {
        let api_key = get_api_key()?;
        Self::new(api_key)
    }

    /// 임베딩 요청 실행 (재시도 포함)
    async fn request_embeddings(&self, input: EmbedInput<'_>) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: EMBEDDING_MODEL,
            input,
        };

        let mut last_error: Option<anyhow::Error> = None;

        // 재시도 루프 (429 에러 시 지수 백오프)
        for attempt in 0..=MAX_RETRIES {
            // Rate limiting (매 시도마다)
            {
                let mut limiter = self.rate_limiter.lock().await;
                limiter.acquire().await;
            }

            let response = match self
                .client
                .post(OPENAI_EMBED_URL)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Failed to send embedding request: {}", e));
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
                let embed_response: EmbedResponse =
                    serde_json::from_str(&body).context("Failed to parse embedding response")?;

                // index 순서 보장
                let mut data = embed_response.data;
                data.sort_by_key(|d| d.index);

                return Ok(data.into_iter().map(|d| d.embedding).collect());
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

        // 모든 재시도 실패
        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Embedding failed after {} retries", MAX_RETRIES)))
    }
}

/// OpenAI API 요청 본문
/// source: https://platform.openai.com/docs/api-reference/embeddings
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: EmbedInput<'a>,
}

/// 입력: 단일 문자열 또는 문자열 배열
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbedInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

/// OpenAI API 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
    index: usize,
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
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // 빈 텍스트 처리
        if text.trim().is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIMENSION]);
        }

        let mut vectors = self.request_embeddings(EmbedInput::Single(text)).await?;

        vectors
            .pop()
            .context("Embedding response contained no vectors")
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // 빈 문자열은 API가 거부하므로 공백으로 대체
        let sanitized: Vec<String> = texts
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    " ".to_string()
                } else {
                    t.clone()
                }
            })
            .collect();

        let mut results = Vec::with_capacity(texts.len());

        for (i, batch) in sanitized.chunks(MAX_BATCH_INPUTS).enumerate() {
            tracing::debug!(
                "Embedding batch {}/{}",
                i + 1,
                sanitized.len().div_ceil(MAX_BATCH_INPUTS)
            );
            let vectors = self.request_embeddings(EmbedInput::Batch(batch)).await?;

            if vectors.len() != batch.len() {
                anyhow::bail!(
                    "Embedding count mismatch: requested {}, got {}",
                    batch.len(),
                    vectors.len()
                );
            }

            results.extend(vectors);
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn name(&self) -> &str {
        EMBEDDING_MODEL
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (OPENAI_API_KEY 환경변수)
pub fn get_api_key() -> Result<String> {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            tracing::debug!("Using API key from OPENAI_API_KEY");
            return Ok(key);
        }
    }

    anyhow::bail!(
        "API key not found. Set OPENAI_API_KEY environment variable.\n\
         Get your API key at: https://platform.openai.com/api-keys"
    )
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    std::env::var("OPENAI_API_KEY")
        .map(|key| !key.is_empty())
        .unwrap_or(false)
}

// ============================================================================
// Factory Function
// ============================================================================

/// 임베딩 프로바이더 생성 (OpenAI API)
///
/// 환경변수에서 API 키를 읽어 OpenAiEmbedding을 생성합니다.
pub fn create_embedder() -> Result<OpenAiEmbedding> {
    if !has_api_key() {
        anyhow::bail!(
            "OPENAI_API_KEY not set.\n\
             Set: export OPENAI_API_KEY=your-api-key\n\
             Get your API key at: https://platform.openai.com/api-keys"
        );
    }

    let embedder = OpenAiEmbedding::from_env()?;
    tracing::info!(
        "Using OpenAI embedding {} (dimension: {})",
        EMBEDDING_MODEL,
        embedder.dimension()
    );
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_api_key() {
        // 환경변수 설정 여부에 따라 결과가 달라짐
        let _ = has_api_key();
    }

    #[test]
    fn test_embed_request_single_json() {
        let request = EmbedRequest {
            model: EMBEDDING_MODEL,
            input: EmbedInput::Single("hello"),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"model":"text-embedding-ada-002","input":"hello"}"#
        );
    }

    #[test]
    fn test_embed_request_batch_json() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let request = EmbedRequest {
            model: EMBEDDING_MODEL,
            input: EmbedInput::Batch(&texts),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""input":["a","b"]"#));
    }

    #[test]
    fn test_parse_embed_response_sorted_by_index() {
        let body = r#"{
            "data": [
                {"embedding": [0.2], "index": 1},
                {"embedding": [0.1], "index": 0}
            ],
            "model": "text-embedding-ada-002"
        }"#;
        let mut parsed: EmbedResponse = serde_json::from_str(body).unwrap();
        parsed.data.sort_by_key(|d| d.index);
        assert_eq!(parsed.data[0].embedding, vec![0.1]);
        assert_eq!(parsed.data[1].embedding, vec![0.2]);
    }

    #[tokio::test]
    async fn test_embed_empty_text_returns_zero_vector() {
        let embedder = OpenAiEmbedding::new("fake_key".to_string()).unwrap();
        let vector = embedder.embed("   ").await.unwrap();
        assert_eq!(vector.len(), EMBEDDING_DIMENSION);
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_embed_batch_empty_input() {
        let embedder = OpenAiEmbedding::new("fake_key".to_string()).unwrap();
        let vectors = embedder.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn test_create_embedder_without_key_returns_error() {
        // 환경변수 제거 (테스트용)
        std::env::remove_var("OPENAI_API_KEY");

        let result = create_embedder();
        assert!(result.is_err());
    }
}
