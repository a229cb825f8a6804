//! 기준일별 종목 기본정보 스냅샷 (`kospi_basic/<YYYYMMDD>.csv`).

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use stockfeed_core::calendar::format_yyyymmdd;
use stockfeed_core::KrxRow;

use super::csv_table::{merge_dedup, parse_rows, serialize_rows};
use super::{atomic_write, read_optional};
use crate::error::Result;

/// 날짜 단위로 통째로 덮어쓰는 스냅샷 저장소.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    dir: PathBuf,
}

impl SnapshotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.csv", format_yyyymmdd(date)))
    }

    /// 해당 날짜 스냅샷을 덮어씁니다. 같은 종목코드는 첫 행만 남깁니다.
    ///
    /// 반환값: (파일 경로, 저장된 행 수)
    pub async fn write(&self, date: NaiveDate, rows: Vec<KrxRow>) -> Result<(PathBuf, usize)> {
        let (rows, _) = merge_dedup(Vec::new(), rows, KrxRow::short_code);
        let path = self.path_for(date);
        atomic_write(&path, &serialize_rows(&rows)?).await?;
        Ok((path, rows.len()))
    }

    pub async fn read(&self, date: NaiveDate) -> Result<Vec<KrxRow>> {
        match read_optional(&self.path_for(date)).await? {
            Some(bytes) => parse_rows(&bytes),
            None => Ok(Vec::new()),
        }
    }
}
