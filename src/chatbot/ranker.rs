//! 유사도 랭킹 모듈 - 메모리 내 임베딩 캐시
//!
//! 프로세스 시작 시 FAQ 제목별 임베딩을 한 번 계산해 메모리에 보관하고,
//! 질문 임베딩과의 내적(dot product)으로 상위 k개를 선별합니다.
//! ada-002 임베딩은 단위 벡터이므로 내적이 곧 코사인 유사도입니다.

use anyhow::{Context, Result};

use crate::corpus::FaqEntry;
use crate::embedding::EmbeddingProvider;

/// 관련성 임계값 - 최고 점수가 이보다 낮으면 답변을 포기
pub const RELEVANCE_THRESHOLD: f32 = 0.5;

/// 기본 top-k
pub const DEFAULT_TOP_K: usize = 3;

// ============================================================================
// Types
// ============================================================================

/// 랭킹 결과 (FAQ 인덱스 + 유사도 점수)
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFaq {
    pub index: usize,
    pub score: f32,
}

// ============================================================================
// FaqIndex
// ============================================================================

/// FAQ 임베딩 인덱스
///
/// 항목과 제목 임베딩을 같은 순서로 보관합니다.
/// 영속화하지 않으며, 프로세스 시작 시마다 다시 계산됩니다.
pub struct FaqIndex {
    entries: Vec<FaqEntry>,
    embeddings: Vec<Vec<f32>>,
}

impl FaqIndex {
    /// FAQ 항목의 제목을 임베딩하여 인덱스 구성
    pub async fn build(
        entries: Vec<FaqEntry>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let titles: Vec<String> = entries.iter().map(|e| e.title.clone()).collect();

        let embeddings = embedder
            .embed_batch(&titles)
            .await
            .context("Failed to embed FAQ titles")?;

        if embeddings.len() != entries.len() {
            anyhow::bail!(
                "Embedding count mismatch: {} entries, {} vectors",
                entries.len(),
                embeddings.len()
            );
        }

        tracing::info!(
            "Cached {} FAQ title embeddings ({})",
            embeddings.len(),
            embedder.name()
        );

        Ok(Self {
            entries,
            embeddings,
        })
    }

    /// 질문 임베딩과 전체 FAQ 임베딩의 내적을 계산해 상위 k개 반환
    pub fn rank(&self, query_embedding: &[f32], top_k: usize) -> Vec<RankedFaq> {
        let mut scored: Vec<RankedFaq> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(index, embedding)| RankedFaq {
                index,
                score: dot_product(query_embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    /// 인덱스로 FAQ 항목 조회
    pub fn entry(&self, index: usize) -> Option<&FaqEntry> {
        self.entries.get(index)
    }

    /// 전체 항목
    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 내적 계산
///
/// 길이가 다르거나 빈 벡터면 0.0을 반환합니다.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[test]
    fn test_dot_product_identity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((dot_product(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_dot_product_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!((dot_product(&a, &c) - 0.0).abs() < 0.0001);
    }

    #[test]
    fn test_dot_product_empty() {
        let a: Vec<f32> = vec![];
        let b: Vec<f32> = vec![];
        assert_eq!(dot_product(&a, &b), 0.0);
    }

    #[test]
    fn test_dot_product_length_mismatch() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0];
        assert_eq!(dot_product(&a, &b), 0.0);
    }

    /// 제목 키워드로 고정 벡터를 돌려주는 테스트용 임베더
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let lowered = text.to_lowercase();
            if lowered.contains("gold") {
                Ok(vec![1.0, 0.0, 0.0])
            } else if lowered.contains("avatar") {
                Ok(vec![0.0, 1.0, 0.0])
            } else {
                Ok(vec![0.0, 0.0, 0.2])
            }
        }

        fn dimension(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "keyword-test"
        }
    }

    fn entries() -> Vec<FaqEntry> {
        vec![
            FaqEntry {
                title: "How to earn Gold".to_string(),
                content: "Gold is earned through events.".to_string(),
                url: "https://support.example/gold".to_string(),
            },
            FaqEntry {
                title: "Customize your avatar".to_string(),
                content: "Open the closet to customize.".to_string(),
                url: "https://support.example/avatar".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_index_build_and_rank() {
        let index = FaqIndex::build(entries(), &KeywordEmbedder).await.unwrap();
        assert_eq!(index.len(), 2);

        let query = vec![1.0, 0.0, 0.0]; // "gold" 방향
        let ranked = index.rank(&query, 3);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].index, 0);
        assert!(ranked[0].score > ranked[1].score);
        assert!(ranked[0].score >= RELEVANCE_THRESHOLD);
    }

    #[tokio::test]
    async fn test_rank_truncates_to_top_k() {
        let index = FaqIndex::build(entries(), &KeywordEmbedder).await.unwrap();
        let ranked = index.rank(&[0.0, 1.0, 0.0], 1);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].index, 1);
    }

    #[tokio::test]
    async fn test_low_scores_stay_below_threshold() {
        let index = FaqIndex::build(entries(), &KeywordEmbedder).await.unwrap();

        // 어느 제목과도 정렬되지 않는 질문 벡터
        let ranked = index.rank(&[0.0, 0.0, 1.0], 3);
        assert!(ranked[0].score < RELEVANCE_THRESHOLD);
    }
}
