//! 도메인 값 파싱 에러.

use thiserror::Error;

/// 호출자 입력을 도메인 타입으로 바꿀 때 발생하는 에러.
///
/// 모두 I/O 이전에 검출되며 재시도 대상이 아닙니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// 알 수 없는 KRX API ID
    #[error("알 수 없는 API: {0}")]
    UnknownApiId(String),

    /// 지원하지 않는 뉴스 소스
    #[error("지원하지 않는 소스: {0}. 지원: naver, daum")]
    UnknownSource(String),

    /// 날짜 형식 오류
    #[error("날짜 형식이 올바르지 않습니다. (YYYYMMDD 형식, 입력: {0})")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
