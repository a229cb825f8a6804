//! 에러 타입 정의.
//!
//! 호출자가 구분해야 하는 것은 두 가지입니다:
//! - 입력 오류: I/O 이전에 거절되며 재시도해도 소용없음
//! - 운영 오류: 자격증명 누락, 업스트림 실패, 로컬 저장소 실패

use std::fmt;

use serde::Serialize;
use stockfeed_core::CoreError;
use stockfeed_data::DataError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 잘못된 호출자 입력 (날짜 형식, 소스명, API ID 등)
    Input(String),
    /// 설정 에러 (자격증명 누락 등)
    Config(String),
    /// 데이터 소스 에러 (KRX, 네이버, 카카오)
    DataSource(String),
    /// 로컬 저장소 에러
    Storage(DataError),
    /// 일반 에러
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// 에러 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Input,
    Operational,
}

impl CollectorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input(_) => ErrorCategory::Input,
            _ => ErrorCategory::Operational,
        }
    }

    pub fn is_input(&self) -> bool {
        self.category() == ErrorCategory::Input
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(msg) => write!(f, "Invalid input: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::DataSource(msg) => write!(f, "Data source error: {}", msg),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoreError> for CollectorError {
    fn from(err: CoreError) -> Self {
        Self::Input(err.to_string())
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::ConfigError(msg) => Self::Config(msg),
            other => Self::Storage(other),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CollectorError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
