//! 데이터 수집 모듈.

pub mod keywords;
pub mod krx_batch;
pub mod news_resume;

use serde::Serialize;

pub use keywords::{load_keywords, DEFAULT_KEYWORDS};
pub use krx_batch::{
    collect_date, run_krx_batch, DateCollection, KrxBatchOptions, KrxBatchSummary, UnitReport,
};
pub use news_resume::{run_news_resume, NewsResumeOptions, NewsRunSummary};

/// 실행 종료 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// 남은 작업 없이 끝남 (실패 단위는 다음 실행으로)
    Completed,
    /// 호출 한도로 중단
    HaltedByRateLimit,
}
