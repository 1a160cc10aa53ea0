//! FAQ 코퍼스 - 아티클 데이터 모델 및 JSON 입출력
//!
//! 크롤러가 수집한 아티클 레코드를 저장하고,
//! 챗봇/전처리 단계에서 사용하는 형태로 변환합니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::chunker::{clean_text, Chunker};

/// 기본 코퍼스 파일 이름
pub const DEFAULT_CORPUS_FILE: &str = "highrise_faq.json";

/// 기본 전처리 청크 파일 이름
pub const DEFAULT_CHUNKS_FILE: &str = "processed_chunks.json";

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.faqbot/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".faqbot")
}

/// 기본 코퍼스 파일 경로
pub fn default_corpus_path() -> PathBuf {
    get_data_dir().join(DEFAULT_CORPUS_FILE)
}

/// 기본 청크 파일 경로
pub fn default_chunks_path() -> PathBuf {
    get_data_dir().join(DEFAULT_CHUNKS_FILE)
}

// ============================================================================
// Types
// ============================================================================

/// 아티클 본문의 구조화된 콘텐츠 블록
///
/// 크롤러가 페이지에서 추출한 블록을 타입별로 보존합니다.
/// JSON 표현: `{"type": "paragraph", "content": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading(String),
    Subheading(String),
    Paragraph(String),
    Image(ImageContent),
    Divider(String),
}

/// 이미지 블록 콘텐츠
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub alignment: String,
}

/// 관련 아티클 링크
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedArticle {
    pub title: String,
    pub url: String,
}

/// 수집된 아티클 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub article_url: String,
    pub article_title: String,
    pub collection_title: String,
    pub collection_url: String,
    #[serde(default)]
    pub structured_content: Vec<ContentBlock>,
    #[serde(default)]
    pub related_articles: Vec<RelatedArticle>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Article {
    /// 문단 블록만 이어붙인 본문 텍스트
    pub fn paragraph_text(&self) -> String {
        let paragraphs: Vec<&str> = self
            .structured_content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Paragraph(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();

        paragraphs.join(" ")
    }
}

/// 챗봇이 사용하는 평탄화된 FAQ 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// 전처리된 청크 레코드 (임베딩 입력 단위)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// 청크 메타데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub title: String,
    pub url: String,
    pub collection: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_url: Option<String>,
}

/// 코퍼스 통계
#[derive(Debug, Default, Clone, Serialize)]
pub struct CorpusStats {
    pub article_count: usize,
    pub collection_count: usize,
    pub total_content_bytes: usize,
}

impl CorpusStats {
    /// 아티클 목록에서 통계 계산
    pub fn from_articles(articles: &[Article]) -> Self {
        let mut collections: Vec<&str> = articles
            .iter()
            .map(|a| a.collection_title.as_str())
            .collect();
        collections.sort_unstable();
        collections.dedup();

        let total_content_bytes = articles.iter().map(|a| a.paragraph_text().len()).sum();

        Self {
            article_count: articles.len(),
            collection_count: collections.len(),
            total_content_bytes,
        }
    }
}

// ============================================================================
// JSON I/O
// ============================================================================

/// 코퍼스 파일 로드
pub fn load_articles(path: &Path) -> Result<Vec<Article>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

    let articles: Vec<Article> =
        serde_json::from_str(&raw).context("Failed to parse corpus JSON")?;

    tracing::info!("Loaded {} articles from {}", articles.len(), path.display());
    Ok(articles)
}

/// 코퍼스 파일 저장 (pretty JSON)
pub fn save_articles(path: &Path, articles: &[Article]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create corpus directory")?;
        }
    }

    let json = serde_json::to_string_pretty(articles).context("Failed to serialize corpus")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write corpus file: {}", path.display()))?;

    tracing::info!("Saved {} articles to {}", articles.len(), path.display());
    Ok(())
}

/// 청크 파일 저장 (pretty JSON)
pub fn save_chunks(path: &Path, chunks: &[ChunkRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create chunks directory")?;
        }
    }

    let json = serde_json::to_string_pretty(chunks).context("Failed to serialize chunks")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write chunks file: {}", path.display()))?;

    tracing::info!("Saved {} chunks to {}", chunks.len(), path.display());
    Ok(())
}

// ============================================================================
// Processing
// ============================================================================

/// 아티클 목록을 FAQ 항목으로 평탄화
///
/// 제목이 비어 있거나 본문 문단이 전혀 없는 아티클은 제외합니다.
pub fn faq_entries(articles: &[Article]) -> Vec<FaqEntry> {
    articles
        .iter()
        .filter(|a| !a.article_title.trim().is_empty())
        .map(|a| FaqEntry {
            title: a.article_title.clone(),
            content: a.paragraph_text(),
            url: a.article_url.clone(),
        })
        .filter(|e| !e.content.trim().is_empty())
        .collect()
}

/// 아티클 목록을 임베딩용 청크 레코드로 변환
///
/// 본문은 정제 후 청킹하고, 관련 아티클은 각각 별도 청크로 추가합니다.
pub fn build_chunks(articles: &[Article], chunker: &dyn Chunker) -> Vec<ChunkRecord> {
    let mut records = Vec::new();

    for article in articles {
        let metadata = ChunkMetadata {
            title: article.article_title.clone(),
            url: article.article_url.clone(),
            collection: article.collection_title.clone(),
            kind: None,
            related_title: None,
            related_url: None,
        };

        let cleaned = clean_text(&article.paragraph_text());

        for chunk in chunker.chunk(&cleaned) {
            records.push(ChunkRecord {
                text: chunk,
                metadata: metadata.clone(),
            });
        }

        // 관련 아티클도 문맥 청크로 추가
        for related in &article.related_articles {
            records.push(ChunkRecord {
                text: format!(
                    "Related article: {} - For more information visit: {}",
                    related.title, related.url
                ),
                metadata: ChunkMetadata {
                    kind: Some("related_article".to_string()),
                    related_title: Some(related.title.clone()),
                    related_url: Some(related.url.clone()),
                    ..metadata.clone()
                },
            });
        }
    }

    tracing::info!(
        "Built {} chunks from {} articles",
        records.len(),
        articles.len()
    );
    records
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::chunker::RecursiveChunker;

    fn sample_article() -> Article {
        Article {
            article_url: "https://support.highrise.game/en/articles/1-gold".to_string(),
            article_title: "How to earn Gold".to_string(),
            collection_title: "Currency".to_string(),
            collection_url: "https://support.highrise.game/en/collections/currency".to_string(),
            structured_content: vec![
                ContentBlock::Heading("How to earn Gold".to_string()),
                ContentBlock::Paragraph("Gold is the premium currency.".to_string()),
                ContentBlock::Divider("---".to_string()),
                ContentBlock::Paragraph("You can buy gold in the store.".to_string()),
            ],
            related_articles: vec![RelatedArticle {
                title: "Gold bars".to_string(),
                url: "https://support.highrise.game/en/articles/2-gold-bars".to_string(),
            }],
            timestamp: Some("2024-03-01T00:00:00Z".to_string()),
        }
    }

    #[test]
    fn test_content_block_json_shape() {
        let block = ContentBlock::Paragraph("Hello".to_string());
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"type":"paragraph","content":"Hello"}"#);

        let parsed: ContentBlock = serde_json::from_str(
            r#"{"type": "image", "content": {"src": "https://cdn.example/img.png", "alignment": "center"}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            ContentBlock::Image(ImageContent {
                src: "https://cdn.example/img.png".to_string(),
                alignment: "center".to_string(),
            })
        );
    }

    #[test]
    fn test_paragraph_text_joins_paragraphs_only() {
        let article = sample_article();
        assert_eq!(
            article.paragraph_text(),
            "Gold is the premium currency. You can buy gold in the store."
        );
    }

    #[test]
    fn test_faq_entries() {
        let articles = vec![sample_article()];
        let entries = faq_entries(&articles);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "How to earn Gold");
        assert!(entries[0].content.contains("premium currency"));
    }

    #[test]
    fn test_faq_entries_skips_empty_articles() {
        let mut empty = sample_article();
        empty.structured_content = vec![ContentBlock::Heading("Title only".to_string())];

        let entries = faq_entries(&[empty]);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_build_chunks_includes_related() {
        let articles = vec![sample_article()];
        let chunker = RecursiveChunker::with_defaults();

        let chunks = build_chunks(&articles, &chunker);

        // 본문 청크 1개 + 관련 아티클 청크 1개
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("premium currency"));
        assert_eq!(chunks[0].metadata.kind, None);

        let related = &chunks[1];
        assert!(related.text.starts_with("Related article: Gold bars"));
        assert_eq!(related.metadata.kind.as_deref(), Some("related_article"));
        assert_eq!(related.metadata.related_title.as_deref(), Some("Gold bars"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");

        let articles = vec![sample_article()];
        save_articles(&path, &articles).unwrap();

        let loaded = load_articles(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].article_title, "How to earn Gold");
        assert_eq!(loaded[0].structured_content, articles[0].structured_content);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = load_articles(&dir.path().join("missing.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_corpus_stats() {
        let mut second = sample_article();
        second.article_url = "https://support.highrise.game/en/articles/3-rooms".to_string();
        second.article_title = "Decorating rooms".to_string();
        second.collection_title = "Rooms".to_string();

        let articles = vec![sample_article(), second];
        let stats = CorpusStats::from_articles(&articles);

        assert_eq!(stats.article_count, 2);
        assert_eq!(stats.collection_count, 2);
        assert!(stats.total_content_bytes > 0);
    }
}
