//! faqbot - Highrise 게임 고객지원 FAQ 챗봇
//!
//! 지원 사이트 크롤링 → 전처리/청킹 → 임베딩 검색 → GPT 응답 생성으로
//! 이어지는 FAQ 챗봇 파이프라인입니다.

pub mod chatbot;
pub mod cli;
pub mod corpus;
pub mod embedding;
pub mod feedback;
pub mod generation;
pub mod scraper;
pub mod server;

// Re-exports
pub use chatbot::{
    ChatResponse, ChatbotConfig, ConversationHistory, FaqChatbot, FaqIndex, QueryProcessor,
    RankedFaq, ResponseStatus, dot_product,
};
pub use corpus::{
    Article, ChunkConfig, ChunkRecord, Chunker, ContentBlock, CorpusStats, FaqEntry,
    RecursiveChunker, RelatedArticle, build_chunks, clean_text, default_chunker, faq_entries,
    get_data_dir, load_articles, save_articles,
};
pub use embedding::{EmbeddingProvider, OpenAiEmbedding, get_api_key, has_api_key};
pub use feedback::{FeedbackStore, NewFeedback};
pub use generation::{ChatMessage, ChatProvider, OpenAiChat};
pub use scraper::{ScraperConfig, SupportScraper};
pub use server::ServerConfig;
