//! 질문 전처리 모듈
//!
//! 오타 교정, 동의어 정규화, 모호한 질문 감지,
//! 복합 질문 분리, 인사/작별 판별을 담당합니다.
//! 임베딩 검색 전에 질문을 FAQ 어휘로 정규화하는 것이 목적입니다.

use regex::Regex;

/// 복합 질문 최대 분할 수 (초과 시 하나씩 질문하도록 안내)
pub const MAX_QUESTION_PARTS: usize = 3;

/// 인사 표현
const GREETINGS: [&str; 7] = [
    "hello",
    "hi",
    "hey",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
];

/// 작별 표현
const GOODBYES: [&str; 6] = [
    "bye",
    "goodbye",
    "see you",
    "farewell",
    "thanks",
    "thank you",
];

/// 질문 전처리기
///
/// 패턴 테이블은 생성 시 한 번 컴파일됩니다.
/// 치환은 등록 순서대로 적용됩니다 (결과 고정).
pub struct QueryProcessor {
    typo_patterns: Vec<(Regex, &'static str)>,
    synonym_patterns: Vec<(Regex, &'static str)>,
    vague_patterns: Vec<(Regex, &'static str)>,
    conjunction_re: Regex,
}

impl QueryProcessor {
    pub fn new() -> Self {
        // 자주 발생하는 오타 패턴 (단어 경계 기준)
        let typo_table: [(&str, &str); 5] = [
            (r"\b(?:avatr|avtar)\b", "avatar"),
            (r"\bcust[ou]?mi[sz]e?\b", "customize"),
            (r"\bg[ou]{0,2}ld\b", "gold"),
            (r"\breport+(?:ing?|s)?\b", "report"),
            (r"\bblock(?:ing)?\b", "block"),
        ];

        // 동의어 → FAQ 표준 어휘
        let synonym_table: [(&str, &str); 8] = [
            ("coins", "gold"),
            ("credits", "gold"),
            ("money", "gold"),
            ("currency", "gold"),
            ("character", "avatar"),
            ("profile", "avatar"),
            ("person", "avatar"),
            ("customise", "customize"),
        ];

        // 문맥이 없어 답할 수 없는 질문 패턴
        let vague_table: [(&str, &str); 5] = [
            (
                r"how (much|many)",
                "Could you specify what you're asking about?",
            ),
            (
                r"when (is|will)",
                "Which feature or event are you asking about?",
            ),
            (
                r"(how|where) (do|can) (i|we) get",
                "What specifically are you looking to get?",
            ),
            (
                r"what is it",
                "Could you specify what you're referring to?",
            ),
            (
                r"how does it work",
                "Which feature are you asking about?",
            ),
        ];

        let typo_patterns = typo_table
            .iter()
            .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), *replacement))
            .collect();

        let synonym_patterns = synonym_table
            .iter()
            .map(|(word, canonical)| {
                (
                    Regex::new(&format!(r"\b{}\b", word)).unwrap(),
                    *canonical,
                )
            })
            .collect();

        let vague_patterns = vague_table
            .iter()
            .map(|(pattern, clarification)| (Regex::new(pattern).unwrap(), *clarification))
            .collect();

        let conjunction_re = Regex::new(r"\b(?:and|or|also|plus)\b").unwrap();

        Self {
            typo_patterns,
            synonym_patterns,
            vague_patterns,
            conjunction_re,
        }
    }

    /// 질문 정규화 (소문자화 → 오타 교정 → 동의어 치환)
    pub fn normalize(&self, question: &str) -> String {
        let mut processed = question.to_lowercase();

        for (pattern, replacement) in &self.typo_patterns {
            processed = pattern.replace_all(&processed, *replacement).into_owned();
        }

        for (pattern, canonical) in &self.synonym_patterns {
            processed = pattern.replace_all(&processed, *canonical).into_owned();
        }

        processed
    }

    /// 복합 질문 여부
    ///
    /// 물음표가 2개 이상이거나 독립된 접속사 단어가 있으면 복합 질문입니다.
    pub fn is_multi_part(&self, question: &str) -> bool {
        if question.matches('?').count() > 1 {
            return true;
        }
        self.conjunction_re.is_match(&question.to_lowercase())
    }

    /// 복합 질문 분리
    ///
    /// 물음표 기준으로 먼저 분리하고, 한 조각뿐이면 접속사로 분리합니다.
    pub fn split_parts(&self, question: &str) -> Vec<String> {
        let parts: Vec<String> = question
            .split('?')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}?", p))
            .collect();

        if parts.len() > 1 {
            return parts;
        }

        let lowered = question.to_lowercase();
        if self.conjunction_re.is_match(&lowered) {
            return self
                .conjunction_re
                .split(&lowered)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }

        if parts.is_empty() {
            vec![question.trim().to_string()]
        } else {
            parts
        }
    }

    /// 모호한 질문이면 되물을 문장 반환
    pub fn clarification_for(&self, question: &str) -> Option<&'static str> {
        let lowered = question.to_lowercase();

        self.vague_patterns
            .iter()
            .find(|(pattern, _)| pattern.is_match(&lowered))
            .map(|(_, clarification)| *clarification)
    }

    /// 인사 여부
    pub fn is_greeting(&self, text: &str) -> bool {
        matches_phrase(text, &GREETINGS)
    }

    /// 작별 여부
    pub fn is_goodbye(&self, text: &str) -> bool {
        matches_phrase(text, &GOODBYES)
    }

    /// 질문으로 처리하기에 너무 짧거나 내용이 없는지
    ///
    /// 3자 미만이거나 영숫자가 전혀 없으면 (기호만 입력 등) true.
    pub fn is_too_short(&self, question: &str) -> bool {
        let trimmed = question.trim();
        trimmed.chars().count() < 3 || !trimmed.chars().any(|c| c.is_alphanumeric())
    }
}

impl Default for QueryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// 짧은 문구(3단어 이하)가 주어진 표현으로 시작하는지
fn matches_phrase(text: &str, phrases: &[&str]) -> bool {
    let cleaned = text
        .trim()
        .trim_end_matches(['?', '!', '.', ','])
        .trim()
        .to_lowercase();

    if cleaned.is_empty() || cleaned.split_whitespace().count() > 3 {
        return false;
    }

    phrases
        .iter()
        .any(|p| cleaned == *p || cleaned.starts_with(&format!("{} ", p)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> QueryProcessor {
        QueryProcessor::new()
    }

    #[test]
    fn test_normalize_typos() {
        let p = processor();
        assert_eq!(
            p.normalize("How do I custmize my avtar?"),
            "how do i customize my avatar?"
        );
        assert_eq!(p.normalize("Where can I buy gld?"), "where can i buy gold?");
        assert_eq!(p.normalize("How to reportt someone?"), "how to report someone?");
        assert_eq!(p.normalize("What about blocking?"), "what about block?");
    }

    #[test]
    fn test_normalize_synonyms() {
        let p = processor();
        assert_eq!(p.normalize("How do I get coins?"), "how do i get gold?");
        assert_eq!(
            p.normalize("What are credits used for?"),
            "what are gold used for?"
        );
        assert_eq!(
            p.normalize("How to change my character?"),
            "how to change my avatar?"
        );
    }

    #[test]
    fn test_normalize_word_boundaries() {
        let p = processor();
        // "personal"의 "person"은 치환되지 않음
        assert_eq!(
            p.normalize("Is my personal data safe?"),
            "is my personal data safe?"
        );
    }

    #[test]
    fn test_is_multi_part() {
        let p = processor();
        assert!(p.is_multi_part("How do I create an account and customize my avatar?"));
        assert!(p.is_multi_part("What is gold? How do I get it?"));
        assert!(!p.is_multi_part("How do I create an account?"));
        // "android"의 "and"는 접속사가 아님
        assert!(!p.is_multi_part("Does the app run on android?"));
    }

    #[test]
    fn test_split_parts_by_question_marks() {
        let p = processor();
        let parts = p.split_parts("What is gold? How do I get it?");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "What is gold?");
        assert_eq!(parts[1], "How do I get it?");
    }

    #[test]
    fn test_split_parts_by_conjunction() {
        let p = processor();
        let parts = p.split_parts("How do I create an account and customize my avatar?");
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("create an account"));
        assert!(parts[1].contains("customize my avatar"));
    }

    #[test]
    fn test_clarification_for_vague_questions() {
        let p = processor();
        assert!(p.clarification_for("How much does it cost?").is_some());
        assert!(p.clarification_for("When will it be available?").is_some());
        assert!(p.clarification_for("How does it work?").is_some());
        assert!(p.clarification_for("How do I verify my account on Discord?").is_none());
    }

    #[test]
    fn test_greetings() {
        let p = processor();
        assert!(p.is_greeting("hello"));
        assert!(p.is_greeting("hi there!"));
        assert!(p.is_greeting("good morning"));
        assert!(!p.is_greeting("hello, how do I report a player in a room?"));
        assert!(!p.is_greeting("goodbye"));
    }

    #[test]
    fn test_goodbyes() {
        let p = processor();
        assert!(p.is_goodbye("goodbye"));
        assert!(p.is_goodbye("thanks"));
        assert!(p.is_goodbye("thank you!"));
        assert!(!p.is_goodbye("hello"));
    }

    #[test]
    fn test_is_too_short() {
        let p = processor();
        assert!(p.is_too_short(""));
        assert!(p.is_too_short("ok"));
        assert!(p.is_too_short("!@#$%^&*()"));
        assert!(!p.is_too_short("How do I report someone?"));
    }
}
