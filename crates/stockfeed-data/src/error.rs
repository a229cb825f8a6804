//! 데이터 모듈 오류 타입.
//!
//! 업스트림 API 실패는 여기 포함되지 않습니다. 그것은
//! [`FetchOutcome`](stockfeed_core::FetchOutcome)으로 값처럼 전달됩니다.
//! `DataError`는 로컬 저장소(진행 파일, CSV)와 클라이언트 구성 실패만 다룹니다.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 파일 입출력 오류
    #[error("IO error ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV 읽기/쓰기 오류
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 설정 오류 (자격증명 누락 등)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP 클라이언트 생성 실패
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl DataError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        DataError::HttpClient(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
