//! 이어받기 가능한 KRX / 뉴스 배치 수집기.
//!
//! 이 crate는 호출 한도가 있는 외부 API에서 데이터를 모으는 바이너리와 라이브러리를 제공합니다:
//! - KRX 일별 매매정보 / 종목 기본정보 (기준일 단위, 워터마크 진행)
//! - 네이버 / 카카오(다음) 뉴스 키워드 수집 (병렬, 체크포인트)
//! - 진행 상태 조회 / 초기화
//!
//! 호출 한도에 걸리면 그때까지의 결과와 진행 상태를 저장하고 멈춥니다.
//! 다음 실행은 남은 작업부터 이어갑니다.

pub mod config;
pub mod error;
pub mod modules;
pub mod service;
pub mod state;
pub mod stats;

pub use config::{CollectorConfig, DaemonConfig, KrxConfig, NewsConfig};
pub use error::{CollectorError, ErrorCategory, Result};
pub use state::CollectorState;
pub use stats::CollectionStats;
