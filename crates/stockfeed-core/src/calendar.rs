//! KRX 기준일 계산.
//!
//! KRX는 한국 시간 기준으로 일자를 끊으므로 "어제"도 Asia/Seoul 기준입니다.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Asia::Seoul;

use crate::error::{CoreError, Result};

/// KRX 기준일 형식
pub const KRX_DATE_FORMAT: &str = "%Y%m%d";

/// YYYYMMDD 문자열을 파싱합니다. 8자리 숫자가 아니면 에러입니다.
pub fn parse_yyyymmdd(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, KRX_DATE_FORMAT).map_err(|_| CoreError::InvalidDate(s.to_string()))
}

pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format(KRX_DATE_FORMAT).to_string()
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `start..=end` 구간의 평일 목록 (오름차순).
pub fn weekdays_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        if is_weekday(current) {
            dates.push(current);
        }
        current += Duration::days(1);
    }
    dates
}

/// 오늘 (Asia/Seoul)
pub fn today_kst() -> NaiveDate {
    Utc::now().with_timezone(&Seoul).date_naive()
}

/// 어제 (Asia/Seoul)
pub fn yesterday_kst() -> NaiveDate {
    today_kst() - Duration::days(1)
}
