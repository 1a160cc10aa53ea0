//! 텍스트 정제 및 청킹 모듈
//!
//! FAQ 본문을 임베딩 입력 한도에 맞는 크기로 분할합니다.
//! 문단 → 줄 → 문장 → 단어 순서의 계층적 분할로
//! 가능한 한 자연스러운 경계에서 자릅니다.

use regex::Regex;

/// 분할 경계 우선순위 (앞쪽일수록 먼저 시도)
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

// ============================================================================
// Text Cleaning
// ============================================================================

/// 텍스트 정제
///
/// HTML 태그를 제거하고 연속 공백을 단일 공백으로 정리합니다.
pub fn clean_text(text: &str) -> String {
    let tag_re = Regex::new(r"<[^>]+>").unwrap();
    let without_tags = tag_re.replace_all(text, "");

    let ws_re = Regex::new(r"\s+").unwrap();
    ws_re.replace_all(&without_tags, " ").trim().to_string()
}

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 최소 청크 크기 (문자 수, 이보다 작으면 이전 청크에 병합)
    pub min_characters: usize,
    /// 최대 청크 크기 (문자 수)
    pub max_characters: usize,
    /// 오버랩 크기 (문자 수)
    pub overlap_characters: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_characters: 100,
            max_characters: 1000,
            overlap_characters: 200,
        }
    }
}

impl ChunkConfig {
    /// 임베딩용 설정 (ada-002 입력 한도 대비 여유)
    pub fn for_embedding() -> Self {
        Self::default()
    }

    /// 크기 지정 설정
    pub fn with_sizes(max_characters: usize, overlap_characters: usize) -> Self {
        Self {
            min_characters: 100.min(max_characters / 2),
            max_characters,
            overlap_characters,
        }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// RecursiveChunker
// ============================================================================

/// 계층적 분할 청커
///
/// 문단 경계를 우선 시도하고, 조각이 여전히 크면
/// 줄 → 문장 → 단어 순서로 내려가며 분할합니다.
/// 마지막 수단으로 문자 경계에서 강제 분할합니다.
pub struct RecursiveChunker {
    config: ChunkConfig,
}

impl RecursiveChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// 텍스트를 최대 크기 이하 조각으로 분할
    ///
    /// 구분자는 조각 끝에 유지되어 병합 시 원문이 보존됩니다.
    fn split_pieces(&self, text: &str, level: usize) -> Vec<String> {
        if text.len() <= self.config.max_characters {
            return vec![text.to_string()];
        }

        if level >= SEPARATORS.len() {
            return self.hard_split(text);
        }

        let mut pieces = Vec::new();

        for part in text.split_inclusive(SEPARATORS[level]) {
            if part.trim().is_empty() {
                continue;
            }

            if part.len() > self.config.max_characters {
                pieces.extend(self.split_pieces(part, level + 1));
            } else {
                pieces.push(part.to_string());
            }
        }

        if pieces.is_empty() {
            self.hard_split(text)
        } else {
            pieces
        }
    }

    /// 문자 경계 기준 강제 분할 (구분자가 전혀 없는 경우)
    fn hard_split(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < text.len() {
            let mut end = (start + self.config.max_characters).min(text.len());
            end = floor_char_boundary(text, end);

            if end <= start {
                // 경계 조정으로 전진하지 못하면 다음 문자 경계까지 이동
                end = (start + 1..=text.len())
                    .find(|&i| text.is_char_boundary(i))
                    .unwrap_or(text.len());
            }

            pieces.push(text[start..end].to_string());
            start = end;
        }

        pieces
    }

    /// 조각들을 최대 크기까지 이어붙여 청크 구성
    fn merge_pieces(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in pieces {
            if !current.is_empty() && current.len() + piece.len() > self.config.max_characters {
                chunks.push(current.trim().to_string());
                current = String::new();
            }
            current.push_str(&piece);
        }

        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }

        self.merge_small_chunks(chunks)
    }

    /// 너무 작은 청크를 이전 청크에 병합
    fn merge_small_chunks(&self, chunks: Vec<String>) -> Vec<String> {
        if self.config.min_characters == 0 {
            return chunks;
        }

        let mut result: Vec<String> = Vec::new();

        for chunk in chunks {
            if let Some(last) = result.last_mut() {
                if chunk.len() < self.config.min_characters
                    && last.len() + chunk.len() + 1 <= self.config.max_characters
                {
                    last.push(' ');
                    last.push_str(&chunk);
                    continue;
                }
            }
            result.push(chunk);
        }

        result
    }

    /// 오버랩 적용
    ///
    /// 각 청크 앞에 이전 청크의 끝부분을 붙여 문맥을 유지합니다.
    fn apply_overlap(&self, chunks: Vec<String>) -> Vec<String> {
        if self.config.overlap_characters == 0 || chunks.len() < 2 {
            return chunks;
        }

        let mut result = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                result.push(chunk.clone());
                continue;
            }

            // 이전 청크의 끝부분 가져오기
            let prev = &chunks[i - 1];
            let overlap_start = prev.len().saturating_sub(self.config.overlap_characters);

            // UTF-8 경계 조정
            let overlap_start = floor_char_boundary(prev, overlap_start);

            // 단어 경계에서 시작
            let overlap_text = &prev[overlap_start..];
            let word_start = overlap_text
                .find(char::is_whitespace)
                .map(|p| overlap_start + p + 1)
                .unwrap_or(overlap_start);

            let overlap = prev[word_start..].trim();

            if !overlap.is_empty() && overlap.len() > 20 {
                result.push(format!("{} {}", overlap, chunk));
            } else {
                result.push(chunk.clone());
            }
        }

        result
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return vec![];
        }

        if text.len() <= self.config.max_characters {
            return vec![text.to_string()];
        }

        let pieces = self.split_pieces(text, 0);
        let mut chunks = self.merge_pieces(pieces);
        chunks.retain(|c| !c.trim().is_empty());

        self.apply_overlap(chunks)
    }

    fn name(&self) -> &'static str {
        "RecursiveChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// UTF-8 경계 조정 (인덱스 이하로)
#[inline]
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(RecursiveChunker::with_defaults())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_tags() {
        let html = "<p>Gold bars are <b>premium</b> currency.</p>";
        assert_eq!(clean_text(html), "Gold bars are premium currency.");
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        let text = "Line one.\n\n  Line   two.\t End.";
        assert_eq!(clean_text(text), "Line one. Line two. End.");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text("   "), "");
        assert_eq!(clean_text("<br/><br/>"), "");
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = RecursiveChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n  ").is_empty());
    }

    #[test]
    fn test_chunker_small_text_single_chunk() {
        let chunker = RecursiveChunker::with_defaults();
        let chunks = chunker.chunk("Short answer about avatars.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Short answer about avatars.");
    }

    #[test]
    fn test_chunker_splits_on_sentences() {
        let config = ChunkConfig {
            min_characters: 10,
            max_characters: 80,
            overlap_characters: 0,
        };
        let chunker = RecursiveChunker::new(config);

        let text = "First sentence about gold. Second sentence about avatars. \
                    Third sentence about events. Fourth sentence about rooms.";
        let chunks = chunker.chunk(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 80, "chunk too long: {}", chunk.len());
        }
        // 문장이 중간에서 잘리지 않음
        assert!(chunks[0].starts_with("First sentence"));
    }

    #[test]
    fn test_chunker_hard_split_without_separators() {
        let config = ChunkConfig {
            min_characters: 0,
            max_characters: 50,
            overlap_characters: 0,
        };
        let chunker = RecursiveChunker::new(config);

        let text = "x".repeat(130);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 50);
        assert_eq!(chunks[2].len(), 30);
    }

    #[test]
    fn test_chunker_overlap_carries_context() {
        let config = ChunkConfig {
            min_characters: 10,
            max_characters: 100,
            overlap_characters: 40,
        };
        let chunker = RecursiveChunker::new(config);

        let text = "Gold bars can be purchased from the store menu. \
                    They unlock premium avatar items and room decorations. \
                    Daily events sometimes award a small amount for free.";
        let chunks = chunker.chunk(text);

        assert!(chunks.len() >= 2);
        // 두 번째 청크는 첫 청크의 끝부분으로 시작
        let prev_tail: String = chunks[0].chars().rev().take(20).collect();
        let tail_word = prev_tail
            .split_whitespace()
            .next()
            .map(|w| w.chars().rev().collect::<String>())
            .unwrap_or_default();
        assert!(
            chunks[1].contains(&tail_word),
            "expected overlap from previous chunk in: {}",
            chunks[1]
        );
    }

    #[test]
    fn test_merge_small_chunks() {
        let config = ChunkConfig {
            min_characters: 50,
            max_characters: 200,
            overlap_characters: 0,
        };
        let chunker = RecursiveChunker::new(config);

        let chunks = vec![
            "A reasonably sized chunk of text that stands on its own fine.".to_string(),
            "Tiny tail.".to_string(),
        ];

        let merged = chunker.merge_small_chunks(chunks);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].ends_with("Tiny tail."));
    }

    #[test]
    fn test_config_presets() {
        let default = ChunkConfig::default();
        assert_eq!(default.max_characters, 1000);
        assert_eq!(default.overlap_characters, 200);

        let sized = ChunkConfig::with_sizes(400, 50);
        assert_eq!(sized.max_characters, 400);
        assert_eq!(sized.overlap_characters, 50);
        assert!(sized.min_characters <= 200);
    }

    #[test]
    fn test_floor_char_boundary() {
        let s = "Hello, 세계!"; // UTF-8 다중 바이트 문자

        // ASCII 범위는 그대로
        assert_eq!(floor_char_boundary(s, 5), 5);

        // 문자열 끝 초과
        assert_eq!(floor_char_boundary(s, 100), s.len());

        // 빈 문자열
        assert_eq!(floor_char_boundary("", 0), 0);
    }

    #[test]
    fn test_hard_split_multibyte_safe() {
        let config = ChunkConfig {
            min_characters: 0,
            max_characters: 10,
            overlap_characters: 0,
        };
        let chunker = RecursiveChunker::new(config);

        let text = "가나다라마바사아자차카타파하".repeat(2);
        let chunks = chunker.chunk(&text);

        // 모든 청크가 유효한 UTF-8 경계에서 잘림 (패닉 없이 재결합 가능)
        let rejoined: String = chunks.concat();
        assert_eq!(rejoined, text);
    }
}
