//! 데이터 Provider 모듈.
//!
//! ## KRX OPEN API
//! - `KrxApiClient`: 기준일 단위 KOSPI/KOSDAQ 일별 매매정보, 종목 기본정보
//!
//! ## 뉴스 검색 API
//! - `NaverNewsClient`: 네이버 뉴스 검색 (페이지당 100건, 최대 1000건)
//! - `KakaoWebClient`: 카카오(다음) 웹 검색 (페이지당 50건, 최대 50페이지)
//!
//! 모든 Provider는 업스트림 실패를 [`FetchOutcome`]으로 돌려줍니다.
//! 스케줄러는 아래 trait만 알고 있으므로 테스트에서는 메모리 구현으로 교체합니다.

pub mod krx_api;
pub mod news_api;

use async_trait::async_trait;
use chrono::NaiveDate;
use stockfeed_core::{FetchOutcome, KrxApiId, KrxRow, NewsItem, NewsSource};

pub use krx_api::KrxApiClient;
pub use news_api::{fetch_keyword, KakaoWebClient, NaverNewsClient, PaginationOptions};

/// KRX 기준일 데이터 수집기.
#[async_trait]
pub trait KrxFetcher: Send + Sync {
    /// 한 API의 한 기준일 전체 행을 가져옵니다.
    async fn fetch(&self, api_id: KrxApiId, date: NaiveDate) -> FetchOutcome<KrxRow>;
}

/// 뉴스 검색 수집기 (페이지 단위).
#[async_trait]
pub trait NewsFetcher: Send + Sync {
    fn source(&self) -> NewsSource;

    /// 소스가 허용하는 최대 페이지 수
    fn max_pages(&self) -> u32;

    /// 한 페이지의 최대 기사 수. 이보다 적게 오면 마지막 페이지입니다.
    fn page_size(&self) -> usize;

    /// 0부터 시작하는 `page`의 검색 결과. 키워드/날짜 필터는 호출자가 적용합니다.
    async fn fetch_page(&self, query: &str, page: u32) -> FetchOutcome<NewsItem>;
}
