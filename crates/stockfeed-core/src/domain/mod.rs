//! 수집 엔진 도메인 모델.

pub mod krx_row;
pub mod news;
pub mod outcome;
pub mod work_unit;

pub use krx_row::{extract_ticker, parse_decimal, KrxRow};
pub use news::NewsItem;
pub use outcome::{FetchOutcome, FetchStatus, RateLimitRule};
pub use work_unit::{KrxApiId, KrxDataKind, Market, NewsSource, WorkUnit};
