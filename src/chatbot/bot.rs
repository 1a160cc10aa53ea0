//! FAQ 챗봇 - 검색/응답 오케스트레이션
//!
//! 질문 한 건의 처리 순서:
//! 인사/작별 → 완전성 검사 → 모호성 검사 → 복합 질문 분리 →
//! 정규화 → 임베딩 랭킹 → 프롬프트 구성 → LLM 응답 생성.
//! 외부 호출 실패는 고정 안내 문구로 대체되며 에러로 전파되지 않습니다.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::corpus::FaqEntry;
use crate::embedding::EmbeddingProvider;
use crate::feedback::{FeedbackStore, NewFeedback};
use crate::generation::{ChatMessage, ChatProvider};

use super::history::{ConversationHistory, Interaction, HISTORY_WINDOW};
use super::query::{QueryProcessor, MAX_QUESTION_PARTS};
use super::ranker::{FaqIndex, RankedFaq, DEFAULT_TOP_K, RELEVANCE_THRESHOLD};

// ============================================================================
// Canned Replies
// ============================================================================

const GREETING_REPLY: &str =
    "Hello! I'm the Highrise FAQ chatbot. How can I help you today?";

const GOODBYE_REPLY: &str =
    "Goodbye! Feel free to come back if you have more questions about Highrise!";

const INCOMPLETE_REPLY: &str =
    "Could you please ask a complete question? I'm here to help with any Highrise-related queries!";

const TOO_MANY_PARTS_REPLY: &str =
    "That's a lot to cover at once! Could you ask one question at a time? \
     Starting with the most specific one helps me give you an accurate answer.";

const CLARIFICATION_SUFFIX: &str = "This will help me provide a more accurate answer.";

const GENERATION_FAILURE_REPLY: &str =
    "I apologize, but I'm having trouble generating a response. \
     Please try asking your question again.";

const HANDLER_ERROR_REPLY: &str = "I'm sorry, I encountered an error processing your message.";

fn no_match_reply(faq_page_url: &str) -> String {
    format!(
        "I'm not quite sure about that. Could you rephrase your question? \
         Alternatively, you can visit our FAQ page at {}",
        faq_page_url
    )
}

// ============================================================================
// Types
// ============================================================================

/// 챗봇 설정
#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    /// 검색 결과 상위 k개
    pub top_k: usize,
    /// 관련성 임계값 (최고 점수가 이보다 낮으면 답변 포기)
    pub relevance_threshold: f32,
    /// 프롬프트에 포함할 최근 대화 수
    pub history_window: usize,
    /// 답변 포기 시 안내할 FAQ 페이지 URL
    pub faq_page_url: String,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            relevance_threshold: RELEVANCE_THRESHOLD,
            history_window: HISTORY_WINDOW,
            faq_page_url: "https://support.highrise.game/en/".to_string(),
        }
    }
}

/// 처리 결과 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// API 응답 포맷
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub message_id: String,
    pub session_id: String,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// FaqChatbot
// ============================================================================

/// FAQ 챗봇
///
/// 임베딩 캐시, 질문 전처리기, LLM 프로바이더를 묶어
/// 질문 → 답변 파이프라인을 제공합니다.
pub struct FaqChatbot {
    index: FaqIndex,
    embedder: Box<dyn EmbeddingProvider>,
    chat: Box<dyn ChatProvider>,
    query: QueryProcessor,
    store: FeedbackStore,
    config: ChatbotConfig,
    history: Mutex<ConversationHistory>,
    unanswered: Mutex<Vec<String>>,
}

impl FaqChatbot {
    /// 챗봇 생성
    ///
    /// FAQ 제목 임베딩 캐시를 여기서 구성합니다 (프로세스 시작 시 1회).
    pub async fn new(
        entries: Vec<FaqEntry>,
        embedder: Box<dyn EmbeddingProvider>,
        chat: Box<dyn ChatProvider>,
        store: FeedbackStore,
        config: ChatbotConfig,
    ) -> Result<Self> {
        if entries.is_empty() {
            anyhow::bail!("FAQ corpus is empty");
        }

        let index = FaqIndex::build(entries, embedder.as_ref())
            .await
            .context("Failed to build FAQ embedding cache")?;

        Ok(Self {
            index,
            embedder,
            chat,
            query: QueryProcessor::new(),
            store,
            config,
            history: Mutex::new(ConversationHistory::new()),
            unanswered: Mutex::new(Vec::new()),
        })
    }

    /// 캐시된 FAQ 항목 수
    pub fn faq_count(&self) -> usize {
        self.index.len()
    }

    /// 질문 처리 (파이프라인 전체)
    pub async fn ask(&self, question: &str) -> Result<String> {
        tracing::info!("Received question: {}", question);
        let trimmed = question.trim();

        if self.query.is_greeting(trimmed) {
            return Ok(GREETING_REPLY.to_string());
        }

        if self.query.is_goodbye(trimmed) {
            return Ok(GOODBYE_REPLY.to_string());
        }

        if self.query.is_too_short(trimmed) {
            return Ok(INCOMPLETE_REPLY.to_string());
        }

        // 모호한 질문은 되묻기
        if let Some(clarification) = self.query.clarification_for(trimmed) {
            return Ok(format!("{} {}", clarification, CLARIFICATION_SUFFIX));
        }

        // 복합 질문은 분리하여 각각 처리
        if self.query.is_multi_part(trimmed) {
            let parts = self.query.split_parts(trimmed);

            if parts.len() > MAX_QUESTION_PARTS {
                return Ok(TOO_MANY_PARTS_REPLY.to_string());
            }

            let mut responses = Vec::with_capacity(parts.len());
            for part in &parts {
                let processed = self.query.normalize(part);
                responses.push(self.generate_response(&processed).await?);
            }

            return Ok(responses.join("\n\n"));
        }

        let processed = self.query.normalize(trimmed);
        self.generate_response(&processed).await
    }

    /// 정규화된 단일 질문에 대한 응답 생성
    async fn generate_response(&self, question: &str) -> Result<String> {
        // 유사 FAQ 검색
        let query_embedding = self
            .embedder
            .embed(question)
            .await
            .context("Failed to embed question")?;

        let ranked = self.index.rank(&query_embedding, self.config.top_k);
        let best_score = ranked.first().map(|r| r.score).unwrap_or(0.0);

        if ranked.is_empty() || best_score < self.config.relevance_threshold {
            self.record_unanswered(question).await;
            tracing::warn!("No relevant answer found for: {}", question);
            return Ok(no_match_reply(&self.config.faq_page_url));
        }

        let context = self.build_context(&ranked);
        let history_text = self
            .history
            .lock()
            .await
            .format_recent(self.config.history_window);

        let messages = build_prompt(&history_text, &context, question);

        match self.chat.complete(&messages).await {
            Ok(answer) => {
                let sources: Vec<String> = ranked
                    .iter()
                    .filter_map(|r| self.index.entry(r.index))
                    .map(|e| e.url.clone())
                    .collect();

                self.history.lock().await.push(Interaction {
                    question: question.to_string(),
                    answer: answer.clone(),
                    timestamp: Utc::now(),
                    sources,
                });

                tracing::info!("Generated response for question: {}", question);
                Ok(answer)
            }
            Err(e) => {
                tracing::error!("Error generating response: {:#}", e);
                Ok(GENERATION_FAILURE_REPLY.to_string())
            }
        }
    }

    /// 검색된 FAQ를 프롬프트 컨텍스트 블록으로 포맷
    fn build_context(&self, ranked: &[RankedFaq]) -> String {
        ranked
            .iter()
            .filter_map(|r| self.index.entry(r.index))
            .map(|entry| {
                format!(
                    "Title: {}\nContent: {}\nSource: {}",
                    entry.title, entry.content, entry.url
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// 답변하지 못한 질문 기록 (메모리 + 저장소)
    async fn record_unanswered(&self, question: &str) {
        self.unanswered.lock().await.push(question.to_string());

        if let Err(e) = self.store.add_unanswered(question) {
            tracing::warn!("Failed to log unanswered question: {}", e);
        }
    }

    /// 메시지 처리 (API 진입점)
    ///
    /// 내부 오류를 흡수하고 항상 응답 객체를 반환합니다.
    pub async fn handle_message(&self, message: &str, session_id: Option<String>) -> ChatResponse {
        let session_id = session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match self.ask(message).await {
            Ok(answer) => ChatResponse {
                message: answer,
                message_id: Uuid::new_v4().to_string(),
                session_id,
                status: ResponseStatus::Success,
                error: None,
            },
            Err(e) => {
                tracing::error!("Error processing message: {:#}", e);
                ChatResponse {
                    message: HANDLER_ERROR_REPLY.to_string(),
                    message_id: Uuid::new_v4().to_string(),
                    session_id,
                    status: ResponseStatus::Error,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// 사용자 피드백 저장
    pub fn store_feedback(&self, feedback: NewFeedback) -> Result<i64> {
        self.store.add_feedback(feedback)
    }

    /// 답변하지 못한 질문 목록 (프로세스 생명주기 동안)
    pub async fn unanswered_questions(&self) -> Vec<String> {
        self.unanswered.lock().await.clone()
    }
}

/// LLM 프롬프트 구성
fn build_prompt(history: &str, context: &str, question: &str) -> Vec<ChatMessage> {
    let system = "You are a friendly and helpful assistant for the Highrise game. \
        Use the provided FAQ entries to answer the user's question. \
        If you can't find a relevant answer in the provided FAQ entries, \
        ask for clarification or suggest visiting the FAQ website. \
        Provide a clear, concise, and friendly answer based on the FAQ entries. \
        Include the source URL if relevant. If the question is unclear, ask for \
        clarification. If you're not sure about something, be honest about it.";

    let user = format!(
        "Previous conversation:\n{}\n\nFAQ Entries:\n{}\n\nUser Question: {}",
        history, context, question
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

// ============================================================================
// Tests
// ============================================================================
