//! 소스별 진행 상태 저장소.
//!
//! 소스 하나당 JSON 문서 하나(`<dir>/<key>.json`)를 둡니다. 파일이 없거나
//! 깨져 있으면 빈 상태로 시작하며 호출자에게 에러를 올리지 않습니다.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stockfeed_core::calendar::{format_yyyymmdd, parse_yyyymmdd};
use stockfeed_core::{KrxApiId, NewsSource};
use tracing::{debug, warn};

use super::{atomic_write, read_optional, remove_if_exists};
use crate::error::Result;

/// KRX 배치 진행 파일 키
pub const KRX_PROGRESS_KEY: &str = "krx";

/// 뉴스 소스별 진행 파일 키 (`news_naver`, `news_daum`)
pub fn news_progress_key(source: NewsSource) -> String {
    format!("news_{}", source.as_str())
}

/// 진행 상태 JSON 저장소.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// 진행 상태를 읽습니다. 없거나 파싱할 수 없으면 기본값.
    pub async fn load<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path_for(key);
        let bytes = match read_optional(&path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key, error = %e, "진행 파일 읽기 실패, 새로 시작합니다");
                return T::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "진행 파일 손상, 새로 시작합니다");
                T::default()
            }
        }
    }

    /// 진행 상태 전체를 원자적으로 덮어씁니다.
    pub async fn save<T: Serialize>(&self, key: &str, record: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        atomic_write(&self.path_for(key), &bytes).await?;
        debug!(key, "진행 상태 저장");
        Ok(())
    }

    /// 진행 상태를 삭제합니다. 삭제했으면 true.
    pub async fn reset(&self, key: &str) -> Result<bool> {
        remove_if_exists(&self.path_for(key)).await
    }
}

/// KRX 배치 진행 상태.
///
/// - `last_date`: 이 날짜까지(포함) 모든 평일이 4개 API 모두 완료
/// - `by_date`: 워터마크 이후 날짜별로 완료된 API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KrxProgress {
    /// 완료 워터마크 (YYYYMMDD)
    #[serde(rename = "last_date", default)]
    pub last_completed_date: Option<String>,
    #[serde(default)]
    pub total_dates_done: u64,
    #[serde(rename = "by_date", default)]
    pub partial_by_date: BTreeMap<String, BTreeSet<KrxApiId>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl KrxProgress {
    /// 워터마크 날짜. 형식이 잘못된 값은 없는 것으로 봅니다.
    pub fn last_completed(&self) -> Option<NaiveDate> {
        self.last_completed_date
            .as_deref()
            .and_then(|d| parse_yyyymmdd(d).ok())
    }

    pub fn is_done(&self, date: NaiveDate, api_id: KrxApiId) -> bool {
        if self.last_completed().is_some_and(|w| date <= w) {
            return true;
        }
        self.partial_by_date
            .get(&format_yyyymmdd(date))
            .is_some_and(|done| done.contains(&api_id))
    }

    pub fn mark_done(&mut self, date: NaiveDate, api_id: KrxApiId) {
        if self.last_completed().is_some_and(|w| date <= w) {
            return;
        }
        self.partial_by_date
            .entry(format_yyyymmdd(date))
            .or_default()
            .insert(api_id);
    }

    pub fn is_date_complete(&self, date: NaiveDate) -> bool {
        KrxApiId::ALL.iter().all(|id| self.is_done(date, *id))
    }

    /// 해당 날짜에 완료된 API 목록
    pub fn done_for(&self, date: NaiveDate) -> Vec<KrxApiId> {
        KrxApiId::ALL
            .into_iter()
            .filter(|id| self.is_done(date, *id))
            .collect()
    }

    /// 워터마크를 연속으로 완료된 날짜까지 전진시킵니다.
    ///
    /// `dates`는 오름차순 평일 목록이어야 합니다. 워터마크 이후 첫 미완료
    /// 날짜에서 멈추며, 전진한 날짜 수를 돌려줍니다.
    pub fn roll_watermark(&mut self, dates: &[NaiveDate]) -> usize {
        let mut rolled = 0;
        for &date in dates {
            if self.last_completed().is_some_and(|w| date <= w) {
                continue;
            }
            if !self.is_date_complete(date) {
                break;
            }
            let key = format_yyyymmdd(date);
            self.partial_by_date.remove(&key);
            self.last_completed_date = Some(key);
            self.total_dates_done += 1;
            rolled += 1;
        }
        rolled
    }

    pub fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }
}

/// 뉴스 키워드 재개 진행 상태.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsProgress {
    #[serde(default)]
    pub completed_keywords: BTreeSet<String>,
    /// 통합 뉴스 파일에 누적 저장된 기사 수
    #[serde(default)]
    pub total_saved: u64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl NewsProgress {
    pub fn is_completed(&self, keyword: &str) -> bool {
        self.completed_keywords.contains(keyword)
    }

    /// 아직 완료되지 않은 키워드 (입력 순서 유지)
    pub fn remaining<'a>(&self, keywords: &'a [String]) -> Vec<&'a String> {
        keywords.iter().filter(|k| !self.is_completed(k)).collect()
    }

    pub fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }
}
