//! 서비스 계층.
//!
//! 호출자 입력(날짜 형식, 소스명, API ID)을 검증하고 스케줄러를 호출합니다.
//! 재시도나 자체 상태는 없습니다.

pub mod krx;
pub mod news;
pub mod progress;

pub use krx::{EndpointInfo, KrxFetchResult, KrxService};
pub use news::{CrawlResumeResult, NewsSearchResult, NewsService, SkippedSource, SourceResult};
pub use progress::{ProgressService, ProgressSnapshot, ProgressTarget};

use stockfeed_core::NewsSource;

use crate::error::CollectorError;
use crate::Result;

/// 소스명 목록을 검증합니다. 중복은 처음 것만 남깁니다.
pub fn parse_sources(names: &[String]) -> Result<Vec<NewsSource>> {
    if names.iter().all(|n| n.trim().is_empty()) {
        return Err(CollectorError::Input("소스 목록이 비어 있습니다.".to_string()));
    }
    let mut sources = Vec::new();
    for name in names.iter().filter(|n| !n.trim().is_empty()) {
        let source: NewsSource = name.parse()?;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    Ok(sources)
}
