//! 수집 데이터 입출력.
//!
//! 이 crate는 다음을 제공합니다:
//! - KRX OPEN API / 뉴스 검색 API 클라이언트 (`provider`)
//! - 소스별 진행 상태 저장소 (`storage::progress`)
//! - 자연 키 기준 중복 제거 CSV 저장소 (`storage::*_sink`, `storage::snapshot`)

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use provider::{
    fetch_keyword, KakaoWebClient, KrxApiClient, KrxFetcher, NaverNewsClient, NewsFetcher,
    PaginationOptions,
};

pub use storage::news_sink::{NewsPage, NewsSink, NEWS_COLUMNS};
pub use storage::progress::{
    news_progress_key, KrxProgress, NewsProgress, ProgressStore, KRX_PROGRESS_KEY,
};
pub use storage::security_sink::{SecuritySink, SinkWriteReport};
pub use storage::snapshot::SnapshotSink;
