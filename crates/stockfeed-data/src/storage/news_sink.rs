//! 통합 뉴스 CSV (`news/news_merged.csv`).

use std::path::{Path, PathBuf};

use serde::Serialize;
use stockfeed_core::NewsItem;
use tracing::debug;

use super::csv_table::{merge_dedup, parse_records, serialize_records};
use super::{atomic_write, read_optional};
use crate::error::Result;

/// 통합 뉴스 파일 컬럼 (순서 고정)
pub const NEWS_COLUMNS: [&str; 5] = ["title", "link", "description", "pubDate", "keyword"];

/// 저장된 뉴스 한 페이지.
#[derive(Debug, Clone, Serialize)]
pub struct NewsPage {
    pub items: Vec<NewsItem>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
}

/// 링크 기준으로 중복 제거되는 뉴스 저장소.
#[derive(Debug, Clone)]
pub struct NewsSink {
    path: PathBuf,
}

impl NewsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 파일이 없으면 헤더만 있는 파일을 만듭니다.
    pub async fn ensure_exists(&self) -> Result<()> {
        if read_optional(&self.path).await?.is_none() {
            let bytes = serialize_records::<NewsItem>(&NEWS_COLUMNS, &[])?;
            atomic_write(&self.path, &bytes).await?;
        }
        Ok(())
    }

    /// 저장된 전체 기사 (파일 순서).
    pub async fn read_all(&self) -> Result<Vec<NewsItem>> {
        match read_optional(&self.path).await? {
            Some(bytes) => parse_records(&bytes),
            None => Ok(Vec::new()),
        }
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.read_all().await?.len())
    }

    /// 기존 파일과 병합해 다시 씁니다. 새로 추가된 기사 수를 돌려줍니다.
    ///
    /// 추가할 것이 없으면 파일을 건드리지 않습니다.
    pub async fn append_dedup(&self, items: Vec<NewsItem>) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let existing = self.read_all().await?;
        let before = existing.len();
        let (merged, added) = merge_dedup(existing, items, |item: &NewsItem| {
            item.natural_key().map(str::to_string)
        });

        if added == 0 && merged.len() == before {
            return Ok(0);
        }

        let bytes = serialize_records(&NEWS_COLUMNS, &merged)?;
        atomic_write(&self.path, &bytes).await?;
        debug!(path = %self.path.display(), added, total = merged.len(), "뉴스 병합 저장");
        Ok(added)
    }

    /// 저장된 기사를 페이지 단위로 읽습니다 (page는 1부터).
    ///
    /// `query`가 있으면 제목/요약에 포함된 기사만 (대소문자 무시).
    pub async fn read_page(&self, page: usize, limit: usize, query: Option<&str>) -> Result<NewsPage> {
        let page = page.max(1);
        let limit = limit.max(1);
        let query = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();

        let filtered: Vec<NewsItem> = self
            .read_all()
            .await?
            .into_iter()
            .filter(|item| item.matches_query(&query))
            .collect();

        let total = filtered.len();
        let start = (page - 1).saturating_mul(limit);
        let items: Vec<NewsItem> = filtered.into_iter().skip(start).take(limit).collect();
        let has_more = start + items.len() < total;

        Ok(NewsPage {
            items,
            total,
            page,
            limit,
            has_more,
        })
    }
}
