//! 대화 이력 모듈
//!
//! 프로세스 생명주기 동안의 질문/답변 기록을 보관하고,
//! 최근 이력을 프롬프트용 텍스트로 포맷합니다.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 프롬프트에 포함할 최근 대화 수
pub const HISTORY_WINDOW: usize = 3;

/// 한 번의 질문/답변 기록
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
    pub sources: Vec<String>,
}

/// 대화 이력
#[derive(Debug, Default)]
pub struct ConversationHistory {
    interactions: Vec<Interaction>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록 추가
    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    /// 최근 n개 기록
    pub fn recent(&self, n: usize) -> &[Interaction] {
        let start = self.interactions.len().saturating_sub(n);
        &self.interactions[start..]
    }

    /// 최근 n개 기록을 프롬프트용 텍스트로 포맷
    pub fn format_recent(&self, n: usize) -> String {
        self.recent(n)
            .iter()
            .map(|i| format!("User: {}\nAssistant: {}\n", i.question, i.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(question: &str, answer: &str) -> Interaction {
        Interaction {
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now(),
            sources: vec![],
        }
    }

    #[test]
    fn test_empty_history_formats_to_empty_string() {
        let history = ConversationHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.format_recent(HISTORY_WINDOW), "");
    }

    #[test]
    fn test_recent_window() {
        let mut history = ConversationHistory::new();
        for i in 0..5 {
            history.push(interaction(&format!("q{}", i), &format!("a{}", i)));
        }

        let recent = history.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].question, "q2");
        assert_eq!(recent[2].question, "q4");
    }

    #[test]
    fn test_recent_with_fewer_entries() {
        let mut history = ConversationHistory::new();
        history.push(interaction("only", "one"));

        assert_eq!(history.recent(3).len(), 1);
    }

    #[test]
    fn test_format_recent() {
        let mut history = ConversationHistory::new();
        history.push(interaction("How do I earn gold?", "Through daily events."));

        let formatted = history.format_recent(HISTORY_WINDOW);
        assert!(formatted.contains("User: How do I earn gold?"));
        assert!(formatted.contains("Assistant: Through daily events."));
    }
}
