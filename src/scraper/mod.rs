//! 지원 사이트 스크래퍼 - 컬렉션/아티클 계층 수집
//!
//! Intercom 기반 고객지원 사이트를 인덱스 → 컬렉션 → 아티클 순서로 순회하며
//! 구조화된 콘텐츠 블록을 추출합니다. 페이지 단위 실패는 건너뛰고
//! 수집을 계속합니다.

use std::time::Duration;

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::corpus::{Article, ContentBlock, ImageContent, RelatedArticle};

// ============================================================================
// Configuration
// ============================================================================

/// 스크래퍼 설정
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// 지원 사이트 인덱스 URL
    pub base_url: String,
    /// 요청 간 딜레이 (ms)
    pub request_delay_ms: u64,
    /// 최대 수집 아티클 수 (0이면 제한 없음)
    pub max_articles: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://support.highrise.game/en/".to_string(),
            request_delay_ms: 500,
            max_articles: 0,
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// 컬렉션 링크
#[derive(Debug, Clone)]
struct CollectionLink {
    url: Url,
    title: String,
    article_count: Option<String>,
}

/// 아티클 링크
#[derive(Debug, Clone)]
struct ArticleLink {
    url: Url,
    title: String,
}

// ============================================================================
// SupportScraper
// ============================================================================

/// 지원 사이트 스크래퍼
pub struct SupportScraper {
    client: reqwest::Client,
    config: ScraperConfig,
}

impl SupportScraper {
    /// 새 스크래퍼 생성
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("faqbot/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .context("HTTP 클라이언트 생성 실패")?;

        Ok(Self { client, config })
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Result<Self> {
        Self::new(ScraperConfig::default())
    }

    /// 전체 크롤링 수행
    ///
    /// 인덱스 페이지의 컬렉션을 차례로 방문하고,
    /// 각 컬렉션의 아티클 페이지에서 콘텐츠 블록을 추출합니다.
    pub async fn crawl(&self) -> Result<Vec<Article>> {
        let base = Url::parse(&self.config.base_url).context("잘못된 base URL")?;
        tracing::info!("Crawling support site: {}", base);

        let index_html = self.fetch(&base).await?;
        let collections = parse_collections(&Html::parse_document(&index_html), &base);

        if collections.is_empty() {
            tracing::warn!("No collections found at {}", base);
        }

        let mut articles = Vec::new();

        for collection in &collections {
            self.pause().await;

            let collection_html = match self.fetch(&collection.url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("Failed to fetch collection {}: {}", collection.url, e);
                    continue;
                }
            };

            let links =
                parse_article_links(&Html::parse_document(&collection_html), &collection.url);
            tracing::info!(
                "Collection '{}' ({}): {} article pages",
                collection.title,
                collection.article_count.as_deref().unwrap_or("?"),
                links.len()
            );

            for link in links {
                if self.config.max_articles > 0 && articles.len() >= self.config.max_articles {
                    tracing::info!("Reached article limit ({})", self.config.max_articles);
                    return Ok(articles);
                }

                self.pause().await;

                let article_html = match self.fetch(&link.url).await {
                    Ok(html) => html,
                    Err(e) => {
                        tracing::warn!("Failed to fetch article {}: {}", link.url, e);
                        continue;
                    }
                };

                let article =
                    parse_article(&Html::parse_document(&article_html), &link, collection);
                articles.push(article);
            }
        }

        tracing::info!("Crawl finished: {} articles", articles.len());
        Ok(articles)
    }

    /// 페이지 요청
    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context("HTTP 요청 실패")?
            .error_for_status()
            .context("HTTP 에러 상태")?;

        response.text().await.context("응답 본문 읽기 실패")
    }

    /// 요청 간 딜레이
    async fn pause(&self) {
        if self.config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }
    }
}

// ============================================================================
// Page Parsing
// ============================================================================

/// 인덱스 페이지에서 컬렉션 링크 추출
fn parse_collections(document: &Html, base: &Url) -> Vec<CollectionLink> {
    let mut collections = Vec::new();

    if let Ok(selector) = Selector::parse("a.collection-link") {
        for element in document.select(&selector) {
            let href = match element.value().attr("href") {
                Some(h) => h,
                None => continue,
            };

            let url = match base.join(href) {
                Ok(u) => u,
                Err(_) => continue,
            };

            let title = select_text(&element, "div.text-md")
                .unwrap_or_else(|| element_text(&element));

            if title.is_empty() {
                continue;
            }

            let article_count = select_text(&element, "span.text-base");

            collections.push(CollectionLink {
                url,
                title,
                article_count,
            });
        }
    }

    collections
}

/// 컬렉션/아티클 페이지에서 아티클 링크 추출
fn parse_article_links(document: &Html, base: &Url) -> Vec<ArticleLink> {
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse(r#"section.flex a[data-testid="article-link"]"#) {
        for element in document.select(&selector) {
            let href = match element.value().attr("href") {
                Some(h) => h,
                None => continue,
            };

            let url = match base.join(href) {
                Ok(u) => u,
                Err(_) => continue,
            };

            let title = select_text(&element, "span.text-md")
                .unwrap_or_else(|| element_text(&element));

            if title.is_empty() {
                continue;
            }

            links.push(ArticleLink { url, title });
        }
    }

    links
}

/// 아티클 페이지 파싱
fn parse_article(document: &Html, link: &ArticleLink, collection: &CollectionLink) -> Article {
    let mut blocks = Vec::new();

    // 본문 콘텐츠 블록
    if let Ok(selector) = Selector::parse(r#"main article div[class^="intercom-interblocks-"]"#) {
        for div in document.select(&selector) {
            let class_attr = div.value().attr("class").unwrap_or("");
            if let Some(block) = classify_block(&div, class_attr) {
                blocks.push(block);
            }
        }
    }

    // 관련 아티클 (자기 자신 제외)
    let related_articles = parse_article_links(document, &link.url)
        .into_iter()
        .filter(|l| l.url != link.url)
        .map(|l| RelatedArticle {
            title: l.title,
            url: l.url.to_string(),
        })
        .collect();

    // 페이지 타임스탬프
    let timestamp = Selector::parse("time")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .find_map(|el| el.value().attr("datetime").map(str::to_string))
        });

    Article {
        article_url: link.url.to_string(),
        article_title: link.title.clone(),
        collection_title: collection.title.clone(),
        collection_url: collection.url.to_string(),
        structured_content: blocks,
        related_articles,
        timestamp,
    }
}

/// 클래스 이름으로 콘텐츠 블록 분류
///
/// "subheading"이 "heading"을 포함하므로 subheading 검사가 먼저여야 합니다.
fn classify_block(div: &ElementRef, class_attr: &str) -> Option<ContentBlock> {
    if class_attr.contains("subheading") {
        select_text_nonempty(div, "h2").map(ContentBlock::Subheading)
    } else if class_attr.contains("heading") {
        select_text_nonempty(div, "h1").map(ContentBlock::Heading)
    } else if class_attr.contains("paragraph") {
        // 빈 문단은 건너뜀
        select_text_nonempty(div, "p").map(ContentBlock::Paragraph)
    } else if class_attr.contains("image") {
        let src = Selector::parse("img")
            .ok()
            .and_then(|sel| div.select(&sel).next())
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string)?;

        let alignment = if class_attr.contains("align-center") {
            "center"
        } else {
            "left"
        };

        Some(ContentBlock::Image(ImageContent {
            src,
            alignment: alignment.to_string(),
        }))
    } else if class_attr.contains("horizontal-rule") {
        Some(ContentBlock::Divider("---".to_string()))
    } else {
        None
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 하위 셀렉터의 첫 요소 텍스트
fn select_text(element: &ElementRef, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let found = element.select(&sel).next()?;
    let text = element_text(&found);

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 하위 셀렉터의 첫 요소 텍스트 (공백뿐이면 None)
fn select_text_nonempty(element: &ElementRef, selector: &str) -> Option<String> {
    select_text(element, selector).filter(|t| !t.trim().is_empty())
}

/// 요소의 텍스트 노드를 공백으로 이어붙여 정리
fn element_text(element: &ElementRef) -> String {
    let mut text = String::new();

    for node in element.text() {
        let trimmed = node.trim();
        if !trimmed.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
    }

    text
}

// ============================================================================
// Tests
// ============================================================================
