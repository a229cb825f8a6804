//! 파일 기반 저장소.
//!
//! - [`progress`]: 소스별 진행 상태 JSON
//! - [`news_sink`]: 링크 기준 중복 제거되는 통합 뉴스 CSV
//! - [`security_sink`]: 종목별 일별 매매정보 CSV
//! - [`snapshot`]: 기준일별 종목 기본정보 CSV
//!
//! 모든 쓰기는 임시 파일에 쓴 뒤 rename 하는 전체 교체 방식입니다.
//! 쓰기 도중 프로세스가 죽어도 이전에 성공한 내용이 남습니다.

pub mod csv_table;
pub mod news_sink;
pub mod progress;
pub mod security_sink;
pub mod snapshot;

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{DataError, Result};

/// 파일을 원자적으로 교체합니다.
pub async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DataError::io(parent, e))?;
        }
    }

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| DataError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| DataError::io(path, e))?;
    Ok(())
}

/// 파일을 읽습니다. 없으면 `None`.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DataError::io(path, e)),
    }
}

/// 파일을 삭제합니다. 없으면 아무 것도 하지 않습니다.
pub async fn remove_if_exists(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DataError::io(path, e)),
    }
}

/// 디렉토리 안의 `.csv` 파일 목록 (이름순). 디렉토리가 없으면 빈 목록.
pub async fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DataError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| DataError::io(dir, e))? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// 파일명으로 쓸 수 없는 문자를 `_`로 바꿉니다.
pub fn safe_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("data"));
    name.push(".tmp");
    path.with_file_name(name)
}
