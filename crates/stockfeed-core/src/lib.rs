//! # Stockfeed Core
//!
//! KRX / 뉴스 수집 엔진이 공유하는 도메인 타입을 제공합니다:
//! - 수집 단위 (KRX API ID, 뉴스 소스, 키워드)
//! - 외부 호출 결과 분류 (`FetchOutcome`)
//! - 뉴스 기사 / KRX 응답 행
//! - KRX 기준일 계산
//! - 로깅 인프라

pub mod calendar;
pub mod domain;
pub mod error;
pub mod logging;

pub use domain::*;
pub use error::{CoreError, Result};
