//! 통합 테스트용 메모리 수집기와 상태 헬퍼.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use stockfeed_collector::{CollectorConfig, CollectorState};
use stockfeed_core::{FetchOutcome, KrxApiId, KrxRow, NewsItem, NewsSource};
use stockfeed_data::{KrxFetcher, NewsFetcher};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// 딜레이 없는 테스트 설정
pub fn test_config(dir: &Path) -> CollectorConfig {
    let mut config = CollectorConfig::new(dir);
    config.krx.request_delay_ms = 0;
    config.krx.market_cap_threshold = dec!(1000000000000);
    config.news.page_delay_ms = 0;
    config
}

// ==================== KRX ====================

/// (API, 기준일)별로 미리 정한 응답을 돌려주는 KRX 수집기.
/// 정하지 않은 조합은 `Empty`.
#[derive(Default)]
pub struct FakeKrx {
    responses: Mutex<HashMap<(KrxApiId, NaiveDate), VecDeque<FetchOutcome<KrxRow>>>>,
    calls: Mutex<Vec<(KrxApiId, NaiveDate)>>,
}

impl FakeKrx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, api_id: KrxApiId, date: NaiveDate, outcome: FetchOutcome<KrxRow>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((api_id, date))
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<(KrxApiId, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl KrxFetcher for FakeKrx {
    async fn fetch(&self, api_id: KrxApiId, date: NaiveDate) -> FetchOutcome<KrxRow> {
        self.calls.lock().unwrap().push((api_id, date));
        self.responses
            .lock()
            .unwrap()
            .get_mut(&(api_id, date))
            .and_then(|queue| queue.pop_front())
            .unwrap_or(FetchOutcome::Empty)
    }
}

/// 일별 매매정보 행: 앞쪽 `big`개만 시가총액 2조, 나머지는 1000원.
pub fn daily_rows(bas_dd: &str, count: usize, big: usize) -> Vec<KrxRow> {
    (0..count)
        .map(|i| {
            let mut row = KrxRow::new();
            row.insert("BAS_DD", bas_dd);
            row.insert("ISU_CD", format!("{:06}", i + 1));
            row.insert("ISU_NM", format!("종목{:02}", i + 1));
            row.insert("TDD_CLSPRC", "10,000");
            let cap = if i < big { "2,000,000,000,000" } else { "1,000" };
            row.insert("MKTCAP", cap);
            row
        })
        .collect()
}

/// 종목 기본정보 행 (`ISU_SRT_CD` 1..=count)
pub fn basic_rows(count: usize) -> Vec<KrxRow> {
    (0..count)
        .map(|i| {
            let mut row = KrxRow::new();
            row.insert("ISU_SRT_CD", format!("{:06}", i + 1));
            row.insert("ISU_ABBRV", format!("종목{:02}", i + 1));
            row.insert("LIST_DD", "20000101");
            row
        })
        .collect()
}

pub fn krx_state(dir: &Path, fake: Arc<FakeKrx>) -> CollectorState {
    let mut config = test_config(dir);
    config.krx.start_date = d(2024, 2, 13);
    CollectorState::new(config).with_krx_fetcher(fake)
}

// ==================== 뉴스 ====================

/// 키워드별 페이지 응답을 순서대로 돌려주는 뉴스 수집기.
/// 준비된 페이지가 떨어지면 `Empty`.
pub struct FakeNews {
    source: NewsSource,
    page_size: usize,
    pages: Mutex<HashMap<String, VecDeque<FetchOutcome<NewsItem>>>>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl FakeNews {
    pub fn new(source: NewsSource, page_size: usize) -> Self {
        Self {
            source,
            page_size,
            pages: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn page(self, keyword: &str, outcome: FetchOutcome<NewsItem>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(keyword.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn keywords_called(&self) -> Vec<String> {
        let mut keywords: Vec<String> = self.calls().into_iter().map(|(k, _)| k).collect();
        keywords.sort();
        keywords.dedup();
        keywords
    }
}

#[async_trait]
impl NewsFetcher for FakeNews {
    fn source(&self) -> NewsSource {
        self.source
    }

    fn max_pages(&self) -> u32 {
        10
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(&self, query: &str, page: u32) -> FetchOutcome<NewsItem> {
        self.calls.lock().unwrap().push((query.to_string(), page));
        self.pages
            .lock()
            .unwrap()
            .get_mut(query)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(FetchOutcome::Empty)
    }
}

/// `prefix`로 구분되는 서로 다른 링크의 기사 `count`건
pub fn articles(prefix: &str, count: usize) -> Vec<NewsItem> {
    (0..count)
        .map(|i| NewsItem {
            title: format!("{} 기사 {}", prefix, i),
            link: format!("https://news.example.com/{}/{}", prefix, i),
            description: "시장 동향".to_string(),
            pub_date: "2024-02-15".to_string(),
            keyword: String::new(),
        })
        .collect()
}

pub async fn write_keywords(dir: &Path, keywords: &[&str]) {
    let news_dir = dir.join("news");
    tokio::fs::create_dir_all(&news_dir).await.unwrap();
    let body = serde_json::json!({ "keywords": keywords });
    tokio::fs::write(news_dir.join("crawl_keywords.json"), body.to_string())
        .await
        .unwrap();
}

pub fn news_state(dir: &Path, fakes: Vec<Arc<FakeNews>>) -> CollectorState {
    let mut state = CollectorState::new(test_config(dir));
    for fake in fakes {
        state = state.with_news_fetcher(fake);
    }
    state
}
