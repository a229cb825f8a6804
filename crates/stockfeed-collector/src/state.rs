//! 실행 단위 상태 객체.
//!
//! 진입점(CLI, 데몬, 테스트)이 하나 만들어 스케줄러와 서비스에 넘깁니다.
//! 설정, 수집기, 저장소 위치를 한 곳에 모아 둡니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use stockfeed_core::{Market, NewsSource};
use stockfeed_data::{
    KakaoWebClient, KrxApiClient, KrxFetcher, NaverNewsClient, NewsFetcher, NewsSink,
    ProgressStore, SecuritySink, SnapshotSink,
};

use crate::error::CollectorError;
use crate::{CollectorConfig, Result};

/// 통합 뉴스 파일명
pub const NEWS_MERGED_FILENAME: &str = "news_merged.csv";
/// 수집 키워드 파일명
pub const KEYWORDS_FILENAME: &str = "crawl_keywords.json";

/// 수집 엔진 상태.
pub struct CollectorState {
    pub config: CollectorConfig,
    progress: ProgressStore,
    news_sink: NewsSink,
    krx_fetcher: Option<Arc<dyn KrxFetcher>>,
    news_fetchers: HashMap<NewsSource, Arc<dyn NewsFetcher>>,
}

impl CollectorState {
    /// 수집기 없이 상태를 만듭니다. 수집기는 `with_*`로 주입합니다.
    pub fn new(config: CollectorConfig) -> Self {
        let progress = ProgressStore::new(config.data_dir.join("progress"));
        let news_sink = NewsSink::new(config.news_dir().join(NEWS_MERGED_FILENAME));
        Self {
            config,
            progress,
            news_sink,
            krx_fetcher: None,
            news_fetchers: HashMap::new(),
        }
    }

    /// 설정된 자격증명으로 실제 API 클라이언트를 만듭니다.
    ///
    /// 자격증명이 없는 소스는 비워 두며, 사용할 때 설정 오류가 됩니다.
    pub fn from_config(config: CollectorConfig) -> Result<Self> {
        let mut state = Self::new(config);

        if let Some(key) = state.config.krx.api_key.clone() {
            let client = KrxApiClient::new(
                key,
                state.config.krx.base_url.clone(),
                state.config.krx.timeout(),
            )?;
            state = state.with_krx_fetcher(Arc::new(client));
        }

        let news = state.config.news.clone();
        let timeout = news.timeout();
        if let (Some(id), Some(secret)) = (news.naver_client_id, news.naver_client_secret) {
            let client = NaverNewsClient::new(id, secret, timeout)?;
            state = state.with_news_fetcher(Arc::new(client));
        }
        if let Some(key) = news.kakao_rest_api_key {
            let client = KakaoWebClient::new(key, timeout)?;
            state = state.with_news_fetcher(Arc::new(client));
        }

        Ok(state)
    }

    pub fn with_krx_fetcher(mut self, fetcher: Arc<dyn KrxFetcher>) -> Self {
        self.krx_fetcher = Some(fetcher);
        self
    }

    /// 수집기의 `source()`로 등록합니다. 같은 소스는 교체됩니다.
    pub fn with_news_fetcher(mut self, fetcher: Arc<dyn NewsFetcher>) -> Self {
        self.news_fetchers.insert(fetcher.source(), fetcher);
        self
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn news_sink(&self) -> &NewsSink {
        &self.news_sink
    }

    /// 수집 키워드 파일 경로
    pub fn keywords_path(&self) -> PathBuf {
        self.config.news_dir().join(KEYWORDS_FILENAME)
    }

    /// 시장별 종목 시계열 저장소 (`<data_dir>/kospi_daily`)
    pub fn daily_sink(&self, market: Market) -> SecuritySink {
        SecuritySink::new(self.config.data_dir.join(format!("{}_daily", market.as_str())))
    }

    /// 시장별 기본정보 스냅샷 저장소 (`<data_dir>/kospi_basic`)
    pub fn snapshot_sink(&self, market: Market) -> SnapshotSink {
        SnapshotSink::new(self.config.data_dir.join(format!("{}_basic", market.as_str())))
    }

    pub fn krx_fetcher(&self) -> Result<Arc<dyn KrxFetcher>> {
        self.krx_fetcher.clone().ok_or_else(|| {
            CollectorError::Config(
                "API 키가 설정되지 않았습니다. .env 파일에 KRX_API_KEY를 설정해주세요.".to_string(),
            )
        })
    }

    pub fn news_fetcher(&self, source: NewsSource) -> Result<Arc<dyn NewsFetcher>> {
        self.news_fetchers.get(&source).cloned().ok_or_else(|| {
            let required = match source {
                NewsSource::Naver => "NAVER_CLIENT_ID, NAVER_CLIENT_SECRET",
                NewsSource::Daum => "KAKAO_REST_API_KEY",
            };
            CollectorError::Config(format!("{} 필요", required))
        })
    }

    /// 자격증명이 갖춰진 뉴스 소스 (선언 순서)
    pub fn configured_news_sources(&self) -> Vec<NewsSource> {
        NewsSource::ALL
            .into_iter()
            .filter(|s| self.news_fetchers.contains_key(s))
            .collect()
    }

    pub fn has_krx(&self) -> bool {
        self.krx_fetcher.is_some()
    }
}
