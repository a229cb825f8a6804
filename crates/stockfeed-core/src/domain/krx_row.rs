//! KRX OPEN API 응답 행.
//!
//! API마다 컬럼 구성이 달라 고정 구조체 대신 컬럼명 → 문자열 맵으로 보관합니다.
//! 종목별 파일은 관측된 모든 컬럼의 합집합을 헤더로 사용합니다.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 기준일 컬럼 후보 (우선순위 순)
pub const DATE_COLUMNS: &[&str] = &["BAS_DD", "basDd", "TRD_DD"];
/// 종목명 컬럼 후보
pub const NAME_COLUMNS: &[&str] = &["ISU_NM", "ISU_ABBRV", "isuNm", "ISU_KOR_NM"];
/// 종목코드 컬럼 후보 (단축코드 우선)
pub const CODE_COLUMNS: &[&str] = &["ISU_SRT_CD", "ISU_CD", "srtnCd"];
/// 시가총액 컬럼
pub const MARKET_CAP_COLUMN: &str = "MKTCAP";

/// KRX 응답의 한 행.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KrxRow(BTreeMap<String, String>);

impl KrxRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// `OutBlock_1` 원소(JSON 객체)를 문자열 맵으로 변환합니다.
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let fields = object
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();
        Self(fields)
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn first_non_empty(&self, candidates: &[&str]) -> Option<&str> {
        candidates
            .iter()
            .filter_map(|c| self.get(c))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// 기준일 (YYYYMMDD 또는 YYYY/MM/DD)
    pub fn trade_date(&self) -> Option<&str> {
        self.first_non_empty(DATE_COLUMNS)
    }

    /// 기준일을 YYYYMMDD로 정규화
    pub fn trade_date_compact(&self) -> Option<String> {
        self.trade_date().map(|d| d.replace(['/', '-'], ""))
    }

    pub fn security_name(&self) -> Option<&str> {
        self.first_non_empty(NAME_COLUMNS)
    }

    /// 6자리 단축코드
    pub fn short_code(&self) -> Option<String> {
        self.first_non_empty(CODE_COLUMNS).map(extract_ticker)
    }

    /// 시가총액 (원)
    pub fn market_cap(&self) -> Option<Decimal> {
        self.get(MARKET_CAP_COLUMN).and_then(parse_decimal)
    }
}

impl FromIterator<(String, String)> for KrxRow {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for KrxRow {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self(fields)
    }
}

/// 문자열을 Decimal로 파싱 (쉼표, % 제거).
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let cleaned = s.trim().replace([',', '%'], "");
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse().ok()
}

/// KRX 종목코드에서 티커 추출.
///
/// KR7005930003 → 005930
/// 005930 → 005930
pub fn extract_ticker(code: &str) -> String {
    let code = code.trim();
    if code.len() == 12 && code.starts_with("KR") && code.is_ascii() {
        code[3..9].to_string()
    } else {
        code.to_string()
    }
}
