//! CLI 모듈
//!
//! faqbot CLI 명령어 정의 및 구현

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chatbot::{ChatbotConfig, FaqChatbot};
use crate::corpus::{
    build_chunks, default_chunks_path, default_corpus_path, faq_entries, get_data_dir,
    load_articles, save_articles, save_chunks, ChunkConfig, CorpusStats, RecursiveChunker,
};
use crate::embedding::{create_embedder, has_api_key};
use crate::feedback::FeedbackStore;
use crate::generation::create_chat_model;
use crate::scraper::{ScraperConfig, SupportScraper};
use crate::server::{serve, ServerConfig};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "faqbot")]
#[command(version, about = "Highrise 게임 고객지원 FAQ 챗봇", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 지원 사이트를 크롤링하여 FAQ 코퍼스 생성
    Crawl {
        /// 지원 사이트 인덱스 URL
        #[arg(short, long)]
        base_url: Option<String>,

        /// 출력 파일 경로 (기본: 데이터 디렉토리)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 요청 간 딜레이 (ms)
        #[arg(long, default_value = "500")]
        delay_ms: u64,

        /// 최대 수집 아티클 수 (0이면 제한 없음)
        #[arg(long, default_value = "0")]
        max_articles: usize,
    },

    /// 코퍼스를 정제/청킹하여 임베딩용 청크 생성
    Preprocess {
        /// 코퍼스 파일 경로
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// 출력 파일 경로
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 최대 청크 크기 (문자 수)
        #[arg(long, default_value = "1000")]
        chunk_size: usize,

        /// 청크 간 오버랩 (문자 수)
        #[arg(long, default_value = "200")]
        overlap: usize,
    },

    /// 대화형 챗봇 실행
    Chat {
        /// 코퍼스 파일 경로
        #[arg(short, long)]
        faq: Option<PathBuf>,
    },

    /// 단일 질문 실행
    Ask {
        /// 질문
        question: String,

        /// 코퍼스 파일 경로
        #[arg(short, long)]
        faq: Option<PathBuf>,

        /// 검색 결과 상위 k개
        #[arg(short, long, default_value = "3")]
        top_k: usize,
    },

    /// HTTP API 서버 실행
    Serve {
        /// 코퍼스 파일 경로
        #[arg(short, long)]
        faq: Option<PathBuf>,

        /// 바인드 호스트
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// 바인드 포트
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// CORS 허용 오리진 (복수 지정 가능)
        #[arg(long)]
        allow_origin: Vec<String>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Crawl {
            base_url,
            output,
            delay_ms,
            max_articles,
        } => cmd_crawl(base_url, output, delay_ms, max_articles).await,
        Commands::Preprocess {
            input,
            output,
            chunk_size,
            overlap,
        } => cmd_preprocess(input, output, chunk_size, overlap).await,
        Commands::Chat { faq } => cmd_chat(faq).await,
        Commands::Ask {
            question,
            faq,
            top_k,
        } => cmd_ask(&question, faq, top_k).await,
        Commands::Serve {
            faq,
            host,
            port,
            allow_origin,
        } => cmd_serve(faq, host, port, allow_origin).await,
        Commands::Status => cmd_status().await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 크롤링 명령어 (crawl)
///
/// 지원 사이트를 순회하여 아티클 코퍼스 JSON을 생성합니다.
async fn cmd_crawl(
    base_url: Option<String>,
    output: Option<PathBuf>,
    delay_ms: u64,
    max_articles: usize,
) -> Result<()> {
    let mut config = ScraperConfig {
        request_delay_ms: delay_ms,
        max_articles,
        ..ScraperConfig::default()
    };
    if let Some(url) = base_url {
        config.base_url = url;
    }

    println!("[*] 크롤링 시작: {}", config.base_url);

    let scraper = SupportScraper::new(config).context("SupportScraper 생성 실패")?;
    let articles = scraper.crawl().await.context("크롤링 실패")?;

    if articles.is_empty() {
        println!("[!] 수집된 아티클이 없습니다.");
        return Ok(());
    }

    let output_path = output.unwrap_or_else(default_corpus_path);
    save_articles(&output_path, &articles).context("코퍼스 저장 실패")?;

    let stats = CorpusStats::from_articles(&articles);
    println!(
        "[OK] 수집 완료: {} 아티클, {} 컬렉션",
        stats.article_count, stats.collection_count
    );
    println!("     본문 크기: {}", format_bytes(stats.total_content_bytes));
    println!("     저장 위치: {}", output_path.display());
    println!();

    for article in articles.iter().take(5) {
        println!("  - {}", truncate_text(&article.article_title, 60));
    }
    if articles.len() > 5 {
        println!("  ... 외 {} 건", articles.len() - 5);
    }

    Ok(())
}

/// 전처리 명령어 (preprocess)
///
/// 코퍼스를 정제하고 임베딩 입력용 청크로 분할합니다.
async fn cmd_preprocess(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    chunk_size: usize,
    overlap: usize,
) -> Result<()> {
    let input_path = input.unwrap_or_else(default_corpus_path);

    println!("[*] 코퍼스 로드 중: {}", input_path.display());
    let articles = load_articles(&input_path).context("코퍼스 로드 실패")?;

    if articles.is_empty() {
        println!("[!] 코퍼스가 비어 있습니다.");
        return Ok(());
    }

    let chunker = RecursiveChunker::new(ChunkConfig::with_sizes(chunk_size, overlap));
    let chunks = build_chunks(&articles, &chunker);

    let output_path = output.unwrap_or_else(default_chunks_path);
    save_chunks(&output_path, &chunks).context("청크 저장 실패")?;

    println!(
        "[OK] 전처리 완료: {} 아티클 → {} 청크",
        articles.len(),
        chunks.len()
    );
    println!("     저장 위치: {}", output_path.display());

    Ok(())
}

/// 대화형 챗봇 명령어 (chat)
async fn cmd_chat(faq: Option<PathBuf>) -> Result<()> {
    use std::io::Write;

    let chatbot = init_chatbot(faq, None).await?;

    println!();
    println!("Highrise FAQ 챗봇 준비 완료! 'quit' 입력 시 종료됩니다.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        println!();
        print!("질문: ");
        std::io::stdout().flush().ok();

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }

        match chatbot.ask(question).await {
            Ok(answer) => {
                println!();
                println!("답변: {}", answer);
            }
            Err(e) => {
                println!();
                println!("[!] 오류: {}", e);
                println!("    다른 방식으로 질문해 보세요.");
            }
        }
    }

    println!("챗봇을 종료합니다.");
    Ok(())
}

/// 단일 질문 명령어 (ask)
async fn cmd_ask(question: &str, faq: Option<PathBuf>, top_k: usize) -> Result<()> {
    let chatbot = init_chatbot(faq, Some(top_k)).await?;

    let answer = chatbot.ask(question).await.context("질문 처리 실패")?;

    println!();
    println!("{}", answer);

    Ok(())
}

/// 서버 명령어 (serve)
async fn cmd_serve(
    faq: Option<PathBuf>,
    host: String,
    port: u16,
    allow_origin: Vec<String>,
) -> Result<()> {
    let chatbot = init_chatbot(faq, None).await?;

    let mut config = ServerConfig {
        bind_addr: format!("{}:{}", host, port),
        ..ServerConfig::default()
    };
    if !allow_origin.is_empty() {
        config.allowed_origins = allow_origin;
    }

    println!("[*] 서버 시작: http://{}", config.bind_addr);
    println!("    POST /api/chat, POST /api/feedback, GET /health");

    serve(chatbot, config).await
}

/// 상태 명령어 (status)
async fn cmd_status() -> Result<()> {
    println!("faqbot v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // 데이터 디렉토리
    let data_dir = get_data_dir();
    println!("[*] 데이터 디렉토리: {}", data_dir.display());

    // API 키 상태
    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export OPENAI_API_KEY=your-key");
    }

    // 코퍼스 상태
    let corpus_path = default_corpus_path();
    if corpus_path.exists() {
        match load_articles(&corpus_path) {
            Ok(articles) => {
                let stats = CorpusStats::from_articles(&articles);
                println!(
                    "[OK] 코퍼스: {} 아티클, {} 컬렉션 ({})",
                    stats.article_count,
                    stats.collection_count,
                    format_bytes(stats.total_content_bytes)
                );
            }
            Err(e) => {
                println!("[!] 코퍼스 로드 실패: {}", e);
            }
        }
    } else {
        println!("[!] 코퍼스 없음 (faqbot crawl 실행 필요)");
    }

    // 피드백 저장소 상태
    match FeedbackStore::open_default() {
        Ok(store) => match store.stats() {
            Ok(stats) => {
                println!(
                    "[OK] 피드백: {} 건 (도움됨 {}), 미응답 질문: {} 건",
                    stats.feedback_count, stats.helpful_count, stats.unanswered_count
                );
            }
            Err(e) => {
                println!("[!] 피드백 통계 조회 실패: {}", e);
            }
        },
        Err(e) => {
            println!("[!] 피드백 저장소 열기 실패: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Chatbot Initialization
// ============================================================================

/// 챗봇 초기화 (코퍼스 로드 + 임베딩 캐시 구성)
async fn init_chatbot(faq: Option<PathBuf>, top_k: Option<usize>) -> Result<Arc<FaqChatbot>> {
    // API 키 확인
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export OPENAI_API_KEY=your-api-key\n\n\
             API 키 발급: https://platform.openai.com/api-keys"
        );
    }

    let corpus_path = faq.unwrap_or_else(default_corpus_path);

    let articles = load_articles(&corpus_path)
        .with_context(|| format!("FAQ 코퍼스 로드 실패: {}", corpus_path.display()))?;

    let entries = faq_entries(&articles);
    if entries.is_empty() {
        bail!(
            "코퍼스에 사용할 아티클이 없습니다: {}",
            corpus_path.display()
        );
    }

    println!("[*] FAQ 임베딩 캐시 생성 중... ({} 건)", entries.len());

    let embedder = create_embedder().context("임베딩 프로바이더 생성 실패")?;
    let chat = create_chat_model().context("채팅 프로바이더 생성 실패")?;
    let store = FeedbackStore::open_default().context("피드백 저장소 열기 실패")?;

    let mut config = ChatbotConfig::default();
    if let Some(k) = top_k {
        config.top_k = k;
    }

    let chatbot = FaqChatbot::new(entries, Box::new(embedder), Box::new(chat), store, config)
        .await
        .context("챗봇 초기화 실패")?;

    println!("[OK] 준비 완료 ({} FAQ 항목)", chatbot.faq_count());

    Ok(Arc::new(chatbot))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
