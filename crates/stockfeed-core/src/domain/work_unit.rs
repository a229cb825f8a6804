//! 수집 작업 단위 정의.
//!
//! - KRX: (기준일, API ID) 쌍
//! - 뉴스: (소스, 키워드) 쌍

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::format_yyyymmdd;
use crate::error::CoreError;

/// 시장 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// 유가증권시장
    Kospi,
    /// 코스닥
    Kosdaq,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kospi => "kospi",
            Self::Kosdaq => "kosdaq",
        }
    }
}

/// KRX 수집 데이터 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KrxDataKind {
    /// 전종목 일별 매매정보 (종목별 시계열로 누적)
    DailyTrade,
    /// 종목 기본정보 (기준일 단위 스냅샷)
    BasicInfo,
}

/// 배치 수집 대상 KRX API.
///
/// 선언 순서가 곧 같은 날짜 안에서의 실행 순서입니다.
/// `*_basic`은 같은 날짜의 `*_daily`가 만든 종목코드 집합에 의존합니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum KrxApiId {
    KospiDaily,
    KosdaqDaily,
    KospiBasic,
    KosdaqBasic,
}

impl KrxApiId {
    /// 의존 순서대로 정렬된 전체 API 목록.
    pub const ALL: [KrxApiId; 4] = [
        Self::KospiDaily,
        Self::KosdaqDaily,
        Self::KospiBasic,
        Self::KosdaqBasic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KospiDaily => "kospi_daily",
            Self::KosdaqDaily => "kosdaq_daily",
            Self::KospiBasic => "kospi_basic",
            Self::KosdaqBasic => "kosdaq_basic",
        }
    }

    /// KRX OPEN API 서비스 ID.
    pub fn service_id(&self) -> &'static str {
        match self {
            Self::KospiDaily => "stk_bydd_trd",
            Self::KosdaqDaily => "ksq_bydd_trd",
            Self::KospiBasic => "stk_isu_base_info",
            Self::KosdaqBasic => "ksq_isu_base_info",
        }
    }

    pub fn market(&self) -> Market {
        match self {
            Self::KospiDaily | Self::KospiBasic => Market::Kospi,
            Self::KosdaqDaily | Self::KosdaqBasic => Market::Kosdaq,
        }
    }

    pub fn kind(&self) -> KrxDataKind {
        match self {
            Self::KospiDaily | Self::KosdaqDaily => KrxDataKind::DailyTrade,
            Self::KospiBasic | Self::KosdaqBasic => KrxDataKind::BasicInfo,
        }
    }

    /// 기본정보 API가 종목 필터로 사용하는 일별 매매정보 API.
    pub fn daily_dependency(&self) -> Option<KrxApiId> {
        match self {
            Self::KospiBasic => Some(Self::KospiDaily),
            Self::KosdaqBasic => Some(Self::KosdaqDaily),
            _ => None,
        }
    }
}

impl fmt::Display for KrxApiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KrxApiId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| CoreError::UnknownApiId(s.to_string()))
    }
}

/// 뉴스 검색 API 소스.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsSource {
    /// 네이버 뉴스 검색 API
    Naver,
    /// 카카오(다음) 웹 검색 API
    Daum,
}

impl NewsSource {
    pub const ALL: [NewsSource; 2] = [Self::Naver, Self::Daum];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naver => "naver",
            Self::Daum => "daum",
        }
    }
}

impl fmt::Display for NewsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "naver" => Ok(Self::Naver),
            "daum" | "kakao" => Ok(Self::Daum),
            _ => Err(CoreError::UnknownSource(s.to_string())),
        }
    }
}

/// 한 번의 실행 동안만 존재하는 원자적 수집 단위.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkUnit {
    Krx { date: NaiveDate, api_id: KrxApiId },
    News { source: NewsSource, keyword: String },
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Krx { date, api_id } => write!(f, "{}:{}", format_yyyymmdd(*date), api_id),
            Self::News { source, keyword } => write!(f, "{}:{}", source, keyword),
        }
    }
}
