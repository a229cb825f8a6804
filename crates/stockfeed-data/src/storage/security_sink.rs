//! 종목별 일별 매매정보 CSV (`kospi_daily/<종목명>.csv`).
//!
//! 자연 키는 (종목명, 기준일)입니다. 배치마다 파일 단위로 병합 후
//! 기준일 순으로 정렬해 다시 씁니다.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use stockfeed_core::KrxRow;
use tracing::{debug, warn};

use super::csv_table::{merge_dedup, parse_rows, serialize_rows};
use super::{atomic_write, list_csv_files, read_optional, safe_filename};
use crate::error::Result;

/// 종목별 파일 쓰기 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SinkWriteReport {
    /// 새로 추가된 행 수
    pub added: usize,
    /// 다시 쓴 파일 수
    pub files_written: usize,
}

/// 시장별 종목 시계열 저장소.
#[derive(Debug, Clone)]
pub struct SecuritySink {
    dir: PathBuf,
}

fn row_key(row: &KrxRow) -> Option<(String, String)> {
    let name = row.security_name().or_else(|| row.get("ISU_CD"))?;
    Some((name.to_string(), row.trade_date_compact()?))
}

fn file_stem(row: &KrxRow) -> Option<String> {
    row.security_name()
        .map(str::to_string)
        .or_else(|| row.short_code())
        .map(|name| safe_filename(&name))
}

impl SecuritySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, security: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", safe_filename(security)))
    }

    /// 행을 종목별 파일에 병합합니다.
    ///
    /// 종목명/코드나 기준일이 없는 행은 건너뜁니다.
    pub async fn append_rows(&self, rows: Vec<KrxRow>) -> Result<SinkWriteReport> {
        let mut by_file: BTreeMap<String, Vec<KrxRow>> = BTreeMap::new();
        let mut skipped = 0usize;
        for row in rows {
            match (file_stem(&row), row_key(&row)) {
                (Some(stem), Some(_)) => by_file.entry(stem).or_default().push(row),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(dir = %self.dir.display(), skipped, "종목명 또는 기준일 없는 행 제외");
        }

        let mut report = SinkWriteReport::default();
        for (stem, incoming) in by_file {
            let path = self.dir.join(format!("{}.csv", stem));
            let existing = match read_optional(&path).await? {
                Some(bytes) => parse_rows(&bytes)?,
                None => Vec::new(),
            };
            let before = existing.len();

            let (mut merged, added) = merge_dedup(existing, incoming, row_key);
            if added == 0 && merged.len() == before {
                continue;
            }
            merged.sort_by_key(|r| r.trade_date_compact().unwrap_or_default());

            atomic_write(&path, &serialize_rows(&merged)?).await?;
            report.added += added;
            report.files_written += 1;
        }

        debug!(
            dir = %self.dir.display(),
            added = report.added,
            files = report.files_written,
            "종목별 일별 매매정보 저장"
        );
        Ok(report)
    }

    /// 한 종목 파일 전체.
    pub async fn read_security(&self, security: &str) -> Result<Vec<KrxRow>> {
        match read_optional(&self.path_for(security)).await? {
            Some(bytes) => parse_rows(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// 모든 종목 파일의 전체 행 (파일명 순).
    pub async fn read_all(&self) -> Result<Vec<KrxRow>> {
        let mut rows = Vec::new();
        for path in list_csv_files(&self.dir).await? {
            if let Some(bytes) = read_optional(&path).await? {
                rows.extend(parse_rows(&bytes)?);
            }
        }
        Ok(rows)
    }

    /// 해당 기준일(YYYYMMDD)에 저장된 종목 단축코드 집합.
    ///
    /// 일별 매매정보가 이미 완료된 날짜의 기본정보를 이어서 수집할 때
    /// 시가총액 필터를 통과한 종목을 복원하는 데 씁니다.
    pub async fn codes_for_date(&self, yyyymmdd: &str) -> Result<HashSet<String>> {
        let codes = self
            .read_all()
            .await?
            .iter()
            .filter(|row| row.trade_date_compact().as_deref() == Some(yyyymmdd))
            .filter_map(KrxRow::short_code)
            .collect();
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, code: &str, date: &str, close: &str) -> KrxRow {
        let mut r = KrxRow::new();
        r.insert("BAS_DD", date);
        r.insert("ISU_CD", code);
        r.insert("ISU_NM", name);
        r.insert("TDD_CLSPRC", close);
        r
    }

    #[tokio::test]
    async fn test_rows_are_grouped_merged_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SecuritySink::new(dir.path().join("kospi_daily"));

        let report = sink
            .append_rows(vec![
                row("삼성전자", "005930", "20240215", "73000"),
                row("SK하이닉스", "000660", "20240215", "150000"),
            ])
            .await
            .unwrap();
        assert_eq!(report, SinkWriteReport { added: 2, files_written: 2 });

        let report = sink
            .append_rows(vec![
                row("삼성전자", "005930", "20240214", "72000"),
                row("삼성전자", "005930", "20240215", "99999"),
            ])
            .await
            .unwrap();
        assert_eq!(report, SinkWriteReport { added: 1, files_written: 1 });

        let saved = sink.read_security("삼성전자").await.unwrap();
        let dates: Vec<_> = saved.iter().map(|r| r.get("BAS_DD").unwrap()).collect();
        assert_eq!(dates, vec!["20240214", "20240215"]);
        // 기존 행이 우선
        assert_eq!(saved[1].get("TDD_CLSPRC"), Some("73000"));
    }

    #[tokio::test]
    async fn test_codes_for_date_scans_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SecuritySink::new(dir.path());
        sink.append_rows(vec![
            row("삼성전자", "KR7005930003", "20240215", "1"),
            row("카카오", "035720", "20240214", "1"),
            row("NAVER", "035420", "20240215", "1"),
        ])
        .await
        .unwrap();

        let codes = sink.codes_for_date("20240215").await.unwrap();
        assert_eq!(codes, HashSet::from(["005930".to_string(), "035420".to_string()]));
        assert!(sink.codes_for_date("20240216").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_without_date_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SecuritySink::new(dir.path());
        let mut bad = row("삼성전자", "005930", "", "1");
        bad.insert("BAS_DD", "");

        let report = sink.append_rows(vec![bad]).await.unwrap();
        assert_eq!(report, SinkWriteReport::default());
        assert!(sink.read_all().await.unwrap().is_empty());
    }
}
