//! 외부 호출 결과 분류.
//!
//! 수집 클라이언트는 업스트림 실패를 `Err`로 던지지 않고 [`FetchOutcome`]으로
//! 돌려줍니다. 스케줄러는 이 값을 그대로 매칭해 상태를 전이합니다.

use serde::Serialize;

/// 한 번의 수집 호출 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// 한 건 이상 수집
    Ok(Vec<T>),
    /// 호출은 성공했지만 데이터 없음 (휴장일 등). 완료로 취급합니다.
    Empty,
    /// 호출 한도 도달. 그 전까지 모은 결과를 함께 돌려줍니다.
    RateLimited { partial: Vec<T>, reason: String },
    /// 그 외 실패. 해당 단위만 미완료로 남습니다.
    HardError(String),
}

/// [`FetchOutcome`]의 상태만 떼어낸 값 (요약/로그용).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    Empty,
    RateLimited,
    HardError,
}

impl<T> FetchOutcome<T> {
    /// 결과 행으로부터 `Ok` 또는 `Empty`를 만듭니다.
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Self::Empty
        } else {
            Self::Ok(rows)
        }
    }

    pub fn status(&self) -> FetchStatus {
        match self {
            Self::Ok(_) => FetchStatus::Ok,
            Self::Empty => FetchStatus::Empty,
            Self::RateLimited { .. } => FetchStatus::RateLimited,
            Self::HardError(_) => FetchStatus::HardError,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// 저장 가능한 행을 꺼냅니다. 한도 초과 시에는 부분 결과를 돌려줍니다.
    pub fn into_rows(self) -> Vec<T> {
        match self {
            Self::Ok(rows) => rows,
            Self::RateLimited { partial, .. } => partial,
            Self::Empty | Self::HardError(_) => Vec::new(),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> FetchOutcome<U> {
        match self {
            Self::Ok(rows) => FetchOutcome::Ok(rows.into_iter().map(f).collect()),
            Self::Empty => FetchOutcome::Empty,
            Self::RateLimited { partial, reason } => FetchOutcome::RateLimited {
                partial: partial.into_iter().map(f).collect(),
                reason,
            },
            Self::HardError(e) => FetchOutcome::HardError(e),
        }
    }
}

/// 소스별 호출 한도 판정 규칙.
///
/// 상태 코드가 `statuses`에 있거나 에러 메시지에 `markers` 중 하나가 포함되면
/// 호출 한도 초과로 봅니다. 비교는 소문자 기준입니다.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    pub statuses: &'static [u16],
    pub markers: &'static [&'static str],
}

impl RateLimitRule {
    /// KRX OPEN API: 일일 호출 한도 초과 시 403/429와 "초과" 메시지
    pub const KRX: Self = Self {
        statuses: &[429, 403],
        markers: &["limit", "quota", "한도", "초과", "exceeded"],
    };

    /// 네이버 검색 API: 429, 403(API 권한 없음 = 일일 한도 소진)
    pub const NAVER: Self = Self {
        statuses: &[429, 403],
        markers: &["limit", "quota", "한도"],
    };

    /// 카카오 검색 API: 429, 403 및 "RequestThrottled"
    pub const KAKAO: Self = Self {
        statuses: &[429, 403],
        markers: &["limit", "quota", "한도", "throttled"],
    };

    pub fn is_rate_limited(&self, status: Option<u16>, message: &str) -> bool {
        status.is_some_and(|s| self.statuses.contains(&s)) || self.has_marker(message)
    }

    fn has_marker(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.markers.iter().any(|m| lower.contains(m))
    }

    /// 실패한 호출을 `RateLimited` 또는 `HardError`로 분류합니다.
    pub fn classify<T>(
        &self,
        status: Option<u16>,
        message: impl Into<String>,
        partial: Vec<T>,
    ) -> FetchOutcome<T> {
        let message = message.into();
        let rate_limited = self.is_rate_limited(status, &message);
        Self::outcome(rate_limited, message, partial)
    }

    /// 본문이 붙은 비정상 HTTP 응답을 분류합니다.
    ///
    /// `context`에는 본문을 넣지 않습니다. 본문의 한도 문구는 4xx 응답에서만 보고,
    /// 5xx 본문은 내용과 관계없이 `HardError`입니다.
    pub fn classify_response<T>(
        &self,
        status: u16,
        context: &str,
        body: &str,
        partial: Vec<T>,
    ) -> FetchOutcome<T> {
        let quota_body = (400..500).contains(&status) && self.has_marker(body);
        let rate_limited = quota_body || self.is_rate_limited(Some(status), context);
        let reason = if body.is_empty() {
            context.to_string()
        } else {
            format!("{} - {}", context, body)
        };
        Self::outcome(rate_limited, reason, partial)
    }

    fn outcome<T>(rate_limited: bool, reason: String, partial: Vec<T>) -> FetchOutcome<T> {
        if rate_limited {
            FetchOutcome::RateLimited { partial, reason }
        } else {
            FetchOutcome::HardError(reason)
        }
    }
}
