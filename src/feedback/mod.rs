//! Feedback Store - rusqlite 기반 피드백/미응답 저장소
//!
//! 사용자 피드백과 답변하지 못한 질문을 저장합니다.
//! 저장 위치: ~/.faqbot/feedback.db

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use crate::corpus::get_data_dir;

// ============================================================================
// Types
// ============================================================================

/// 저장된 피드백 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub message_id: String,
    pub session_id: String,
    pub is_helpful: bool,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 새 피드백 입력용 구조체
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub message_id: String,
    pub session_id: String,
    pub is_helpful: bool,
    pub comments: Option<String>,
}

/// 답변하지 못한 질문 레코드
#[derive(Debug, Clone, Serialize)]
pub struct UnansweredRecord {
    pub id: i64,
    pub question: String,
    pub created_at: DateTime<Utc>,
}

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStats {
    pub feedback_count: usize,
    pub helpful_count: usize,
    pub unanswered_count: usize,
    pub db_path: PathBuf,
}

// ============================================================================
// FeedbackStore
// ============================================================================

/// Feedback Store - 동기 피드백 저장소
///
/// SQLite 기반으로 피드백과 미응답 질문 로그를 보관합니다.
pub struct FeedbackStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl FeedbackStore {
    /// 저장소 열기 (없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        // 부모 디렉토리 생성
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open SQLite database")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        };

        store.initialize()?;
        Ok(store)
    }

    /// 기본 위치에서 열기 (~/.faqbot/feedback.db)
    pub fn open_default() -> Result<Self> {
        let data_dir = get_data_dir();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        }

        let db_path = data_dir.join("feedback.db");
        Self::open(&db_path)
    }

    /// DB 경로 반환
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// 스키마 초기화
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                is_helpful INTEGER NOT NULL,
                comments TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .context("Failed to create feedback table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_feedback_session ON feedback(session_id)",
            [],
        )
        .context("Failed to create session index")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS unanswered (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .context("Failed to create unanswered table")?;

        tracing::debug!("Feedback store initialized at {:?}", self.db_path);
        Ok(())
    }

    /// 피드백 저장
    pub fn add_feedback(&self, feedback: NewFeedback) -> Result<i64> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO feedback (message_id, session_id, is_helpful, comments, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feedback.message_id,
                feedback.session_id,
                feedback.is_helpful as i64,
                feedback.comments,
                now
            ],
        )
        .context("Failed to insert feedback")?;

        let id = conn.last_insert_rowid();
        tracing::info!(
            "Stored feedback: message={} helpful={} (id={})",
            feedback.message_id,
            feedback.is_helpful,
            id
        );

        Ok(id)
    }

    /// 최근 피드백 목록
    pub fn list_feedback(&self, limit: usize) -> Result<Vec<FeedbackRecord>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT id, message_id, session_id, is_helpful, comments, created_at FROM feedback
             ORDER BY created_at DESC
             LIMIT ?1",
        )?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                Ok(FeedbackRecord {
                    id: row.get(0)?,
                    message_id: row.get(1)?,
                    session_id: row.get(2)?,
                    is_helpful: row.get::<_, i64>(3)? != 0,
                    comments: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    /// 세션별 피드백 목록
    pub fn list_by_session(&self, session_id: &str) -> Result<Vec<FeedbackRecord>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT id, message_id, session_id, is_helpful, comments, created_at FROM feedback
             WHERE session_id = ?1
             ORDER BY created_at DESC",
        )?;

        let records = stmt
            .query_map(params![session_id], |row| {
                Ok(FeedbackRecord {
                    id: row.get(0)?,
                    message_id: row.get(1)?,
                    session_id: row.get(2)?,
                    is_helpful: row.get::<_, i64>(3)? != 0,
                    comments: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    /// 답변하지 못한 질문 기록
    pub fn add_unanswered(&self, question: &str) -> Result<i64> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO unanswered (question, created_at) VALUES (?1, ?2)",
            params![question, now],
        )
        .context("Failed to insert unanswered question")?;

        Ok(conn.last_insert_rowid())
    }

    /// 미응답 질문 목록
    pub fn list_unanswered(&self, limit: usize) -> Result<Vec<UnansweredRecord>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT id, question, created_at FROM unanswered
             ORDER BY created_at DESC
             LIMIT ?1",
        )?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                Ok(UnansweredRecord {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    created_at: parse_datetime(row.get::<_, String>(2)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    /// 저장소 통계
    pub fn stats(&self) -> Result<FeedbackStats> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let feedback_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM feedback", [], |row| row.get(0))
            .unwrap_or(0);

        let helpful_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM feedback WHERE is_helpful != 0",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        let unanswered_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM unanswered", [], |row| row.get(0))
            .unwrap_or(0);

        Ok(FeedbackStats {
            feedback_count: feedback_count as usize,
            helpful_count: helpful_count as usize,
            unanswered_count: unanswered_count as usize,
            db_path: self.db_path.clone(),
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// RFC3339 문자열을 DateTime<Utc>로 파싱
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, FeedbackStore) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let store = FeedbackStore::open(&db_path).unwrap();
        (dir, store)
    }

    fn sample_feedback(helpful: bool) -> NewFeedback {
        NewFeedback {
            message_id: "msg-1".to_string(),
            session_id: "sess-1".to_string(),
            is_helpful: helpful,
            comments: Some("clear answer".to_string()),
        }
    }

    #[test]
    fn test_add_and_list_feedback() {
        let (_dir, store) = create_test_store();

        let id = store.add_feedback(sample_feedback(true)).unwrap();
        assert!(id > 0);

        let records = store.list_feedback(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message_id, "msg-1");
        assert!(records[0].is_helpful);
        assert_eq!(records[0].comments.as_deref(), Some("clear answer"));
    }

    #[test]
    fn test_list_by_session() {
        let (_dir, store) = create_test_store();

        store.add_feedback(sample_feedback(true)).unwrap();

        let mut other = sample_feedback(false);
        other.session_id = "sess-2".to_string();
        store.add_feedback(other).unwrap();

        let records = store.list_by_session("sess-1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id, "sess-1");
    }

    #[test]
    fn test_feedback_without_comments() {
        let (_dir, store) = create_test_store();

        let mut feedback = sample_feedback(false);
        feedback.comments = None;
        store.add_feedback(feedback).unwrap();

        let records = store.list_feedback(10).unwrap();
        assert_eq!(records[0].comments, None);
        assert!(!records[0].is_helpful);
    }

    #[test]
    fn test_unanswered_log() {
        let (_dir, store) = create_test_store();

        store.add_unanswered("how do i fly?").unwrap();
        store.add_unanswered("what is the moon event?").unwrap();

        let records = store.list_unanswered(10).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_stats() {
        let (_dir, store) = create_test_store();

        store.add_feedback(sample_feedback(true)).unwrap();
        store.add_feedback(sample_feedback(false)).unwrap();
        store.add_unanswered("unknown question").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.feedback_count, 2);
        assert_eq!(stats.helpful_count, 1);
        assert_eq!(stats.unanswered_count, 1);
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("persist.db");

        {
            let store = FeedbackStore::open(&db_path).unwrap();
            store.add_feedback(sample_feedback(true)).unwrap();
        }

        let store = FeedbackStore::open(&db_path).unwrap();
        assert_eq!(store.stats().unwrap().feedback_count, 1);
    }
}
