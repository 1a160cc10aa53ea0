//! Chatbot 모듈 - 검색/응답 오케스트레이션
//!
//! - QueryProcessor: 오타/동의어 정규화, 복합 질문 분리, 모호성 감지
//! - FaqIndex: 메모리 내 임베딩 캐시 + 내적 기반 top-k 랭킹
//! - ConversationHistory: 프롬프트용 최근 대화 이력
//! - FaqChatbot: 전체 파이프라인

mod bot;
mod history;
mod query;
mod ranker;

// Re-exports
pub use bot::{ChatResponse, ChatbotConfig, FaqChatbot, ResponseStatus};
pub use history::{ConversationHistory, Interaction, HISTORY_WINDOW};
pub use query::{QueryProcessor, MAX_QUESTION_PARTS};
pub use ranker::{
    FaqIndex, RankedFaq, dot_product, DEFAULT_TOP_K, RELEVANCE_THRESHOLD,
};
