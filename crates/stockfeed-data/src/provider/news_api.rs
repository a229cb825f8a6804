//! 뉴스 검색 API 클라이언트 (네이버 뉴스 / 카카오 웹 검색).
//!
//! 클라이언트는 한 페이지만 가져옵니다. 키워드 하나를 끝까지 넘기는 것은
//! [`fetch_keyword`]가 담당합니다.
//!
//! # 페이지 규칙
//!
//! | 소스 | 페이지 크기 | 한계 |
//! |------|-------------|------|
//! | naver | `display=100`, `start=page*100+1` | `start <= 1000` (10페이지) |
//! | daum | `size=50`, `page=1..` | 50페이지 |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use scraper::Html;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use stockfeed_core::{FetchOutcome, NewsItem, NewsSource, RateLimitRule};
use tracing::{debug, warn};

use super::NewsFetcher;
use crate::error::Result;

const BODY_SNIPPET_CHARS: usize = 300;

/// 네이버 검색 API 기본 URL
pub const NAVER_BASE_URL: &str = "https://openapi.naver.com";
/// 카카오 검색 API 기본 URL
pub const KAKAO_BASE_URL: &str = "https://dapi.kakao.com";

const NAVER_DISPLAY: u32 = 100;
const NAVER_MAX_START: u32 = 1000;
const KAKAO_SIZE: u32 = 50;
const KAKAO_MAX_PAGE: u32 = 50;

/// 기본 최소 게시일
pub const DEFAULT_MIN_PUB_DATE: &str = "2010-01-01";

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

/// HTML 태그 제거 + 엔티티 디코딩 (`<b>코스피</b> &quot;상승&quot;` → `코스피 "상승"`).
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(text);
    fragment.root_element().text().collect::<String>().trim().to_string()
}

/// RFC 2822 게시일 → YYYY-MM-DD. 파싱 실패 시 빈 문자열.
fn naver_pub_date(raw: &str) -> String {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// ISO 8601 일시 → YYYY-MM-DD. 파싱 실패 시 빈 문자열.
fn kakao_pub_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// HTTP GET 한 번을 수행하고 실패를 소스 규칙으로 분류합니다.
async fn get_json<T: for<'de> Deserialize<'de>>(
    request: reqwest::RequestBuilder,
    rule: RateLimitRule,
    source: NewsSource,
) -> std::result::Result<T, FetchOutcome<NewsItem>> {
    let response = request.send().await.map_err(|e| {
        rule.classify(
            e.status().map(|s| s.as_u16()),
            format!("{} 검색 호출 실패: {}", source, e),
            Vec::new(),
        )
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        rule.classify(
            Some(status.as_u16()),
            format!("{} 응답 읽기 실패: {}", source, e),
            Vec::new(),
        )
    })?;

    if !status.is_success() {
        return Err(rule.classify_response(
            status.as_u16(),
            &format!("{} 검색 오류: HTTP {}", source, status.as_u16()),
            &snippet(&body),
            Vec::new(),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        FetchOutcome::HardError(format!("{} 응답 파싱 실패: {} - {}", source, e, snippet(&body)))
    })
}

// ================================================================================================
// 네이버 뉴스 검색
// ================================================================================================

#[derive(Debug, Deserialize)]
struct NaverResponse {
    #[serde(default)]
    items: Vec<NaverItem>,
}

#[derive(Debug, Deserialize)]
struct NaverItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    originallink: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "pubDate", default)]
    pub_date: String,
}

impl From<NaverItem> for NewsItem {
    fn from(it: NaverItem) -> Self {
        let link = if it.link.trim().is_empty() {
            it.originallink
        } else {
            it.link
        };
        NewsItem {
            title: clean_text(&it.title),
            link: link.trim().to_string(),
            description: clean_text(&it.description),
            pub_date: naver_pub_date(&it.pub_date),
            keyword: String::new(),
        }
    }
}

/// 네이버 뉴스 검색 API 클라이언트.
#[derive(Clone)]
pub struct NaverNewsClient {
    client: reqwest::Client,
    client_id: SecretString,
    client_secret: SecretString,
    base_url: String,
}

impl NaverNewsClient {
    pub fn new(client_id: SecretString, client_secret: SecretString, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            base_url: NAVER_BASE_URL.to_string(),
        })
    }

    /// 기본 URL 교체 (mock 서버용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl NewsFetcher for NaverNewsClient {
    fn source(&self) -> NewsSource {
        NewsSource::Naver
    }

    fn max_pages(&self) -> u32 {
        NAVER_MAX_START / NAVER_DISPLAY
    }

    fn page_size(&self) -> usize {
        NAVER_DISPLAY as usize
    }

    async fn fetch_page(&self, query: &str, page: u32) -> FetchOutcome<NewsItem> {
        let start = page * NAVER_DISPLAY + 1;
        if start > NAVER_MAX_START {
            return FetchOutcome::Empty;
        }
        let display = NAVER_DISPLAY.min(NAVER_MAX_START - start + 1);

        let request = self
            .client
            .get(format!("{}/v1/search/news.json", self.base_url))
            .query(&[
                ("query", query.to_string()),
                ("display", display.to_string()),
                ("start", start.to_string()),
                ("sort", "date".to_string()),
            ])
            .header("X-Naver-Client-Id", self.client_id.expose_secret())
            .header("X-Naver-Client-Secret", self.client_secret.expose_secret());

        match get_json::<NaverResponse>(request, RateLimitRule::NAVER, NewsSource::Naver).await {
            Ok(body) => FetchOutcome::from_rows(body.items.into_iter().map(NewsItem::from).collect()),
            Err(outcome) => outcome,
        }
    }
}

// ================================================================================================
// 카카오(다음) 웹 검색
// ================================================================================================

#[derive(Debug, Deserialize)]
struct KakaoResponse {
    #[serde(default)]
    documents: Vec<KakaoDocument>,
}

#[derive(Debug, Deserialize)]
struct KakaoDocument {
    #[serde(default)]
    title: String,
    #[serde(default)]
    contents: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    datetime: String,
}

impl From<KakaoDocument> for NewsItem {
    fn from(doc: KakaoDocument) -> Self {
        NewsItem {
            title: clean_text(&doc.title),
            link: doc.url.trim().to_string(),
            description: clean_text(&doc.contents),
            pub_date: kakao_pub_date(&doc.datetime),
            keyword: String::new(),
        }
    }
}

/// 카카오 웹 검색 API 클라이언트 (소스 이름은 `daum`).
#[derive(Clone)]
pub struct KakaoWebClient {
    client: reqwest::Client,
    rest_api_key: SecretString,
    base_url: String,
}

impl KakaoWebClient {
    pub fn new(rest_api_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            rest_api_key,
            base_url: KAKAO_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl NewsFetcher for KakaoWebClient {
    fn source(&self) -> NewsSource {
        NewsSource::Daum
    }

    fn max_pages(&self) -> u32 {
        KAKAO_MAX_PAGE
    }

    fn page_size(&self) -> usize {
        KAKAO_SIZE as usize
    }

    async fn fetch_page(&self, query: &str, page: u32) -> FetchOutcome<NewsItem> {
        if page >= KAKAO_MAX_PAGE {
            return FetchOutcome::Empty;
        }

        let request = self
            .client
            .get(format!("{}/v2/search/web", self.base_url))
            .query(&[
                ("query", query.to_string()),
                ("size", KAKAO_SIZE.to_string()),
                ("page", (page + 1).to_string()),
                ("sort", "recency".to_string()),
            ])
            .header(
                "Authorization",
                format!("KakaoAK {}", self.rest_api_key.expose_secret()),
            );

        match get_json::<KakaoResponse>(request, RateLimitRule::KAKAO, NewsSource::Daum).await {
            Ok(body) => FetchOutcome::from_rows(body.documents.into_iter().map(NewsItem::from).collect()),
            Err(outcome) => outcome,
        }
    }
}

// ================================================================================================
// 키워드 단위 페이지 순회
// ================================================================================================

/// 키워드 하나의 페이지 순회 옵션.
#[derive(Debug, Clone)]
pub struct PaginationOptions {
    /// 0이면 소스 한계까지
    pub max_pages: u32,
    /// 최대 수집 건수 (None이면 제한 없음)
    pub max_results: Option<usize>,
    /// 이 날짜(YYYY-MM-DD) 이전 기사는 제외
    pub min_pub_date: String,
    /// 페이지 사이 대기
    pub page_delay: Duration,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            max_pages: 0,
            max_results: None,
            min_pub_date: DEFAULT_MIN_PUB_DATE.to_string(),
            page_delay: Duration::from_millis(100),
        }
    }
}

/// 키워드 하나를 페이지가 끝날 때까지 수집합니다.
///
/// - 빈 페이지 또는 페이지 크기보다 작은 페이지에서 종료
/// - 호출 한도 초과: 그때까지 모은 기사를 `RateLimited`로 반환
/// - 첫 페이지 실패: `HardError`. 이후 페이지 실패: 모은 기사까지 성공 처리
pub async fn fetch_keyword(
    fetcher: &dyn NewsFetcher,
    keyword: &str,
    opts: &PaginationOptions,
) -> FetchOutcome<NewsItem> {
    let page_limit = if opts.max_pages > 0 {
        opts.max_pages.min(fetcher.max_pages())
    } else {
        fetcher.max_pages()
    };
    let max_results = opts.max_results.unwrap_or(usize::MAX);

    let accept = |items: Vec<NewsItem>, into: &mut Vec<NewsItem>| {
        into.extend(
            items
                .into_iter()
                .filter(|it| it.is_on_or_after(&opts.min_pub_date))
                .map(|it| it.with_keyword(keyword)),
        );
    };

    let mut collected: Vec<NewsItem> = Vec::new();
    for page in 0..page_limit {
        if page > 0 && !opts.page_delay.is_zero() {
            tokio::time::sleep(opts.page_delay).await;
        }

        match fetcher.fetch_page(keyword, page).await {
            FetchOutcome::Ok(items) => {
                let raw_len = items.len();
                accept(items, &mut collected);
                if collected.len() >= max_results || raw_len < fetcher.page_size() {
                    break;
                }
            }
            FetchOutcome::Empty => break,
            FetchOutcome::RateLimited { partial, reason } => {
                accept(partial, &mut collected);
                collected.truncate(max_results);
                warn!(
                    source = %fetcher.source(),
                    keyword,
                    page,
                    collected = collected.len(),
                    reason = %reason,
                    "호출 한도 도달"
                );
                return FetchOutcome::RateLimited {
                    partial: collected,
                    reason,
                };
            }
            FetchOutcome::HardError(e) if page == 0 => return FetchOutcome::HardError(e),
            FetchOutcome::HardError(e) => {
                warn!(source = %fetcher.source(), keyword, page, error = %e, "페이지 수집 실패, 수집분까지 저장");
                break;
            }
        }
    }

    collected.truncate(max_results);
    debug!(source = %fetcher.source(), keyword, count = collected.len(), "키워드 수집 완료");
    FetchOutcome::from_rows(collected)
}
