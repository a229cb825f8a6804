//! 뉴스 서비스.

use serde::Serialize;
use stockfeed_core::{FetchOutcome, NewsItem, NewsSource};
use stockfeed_data::{fetch_keyword, NewsPage, PaginationOptions};

use super::parse_sources;
use crate::error::CollectorError;
use crate::modules::{run_news_resume, NewsResumeOptions, NewsRunSummary};
use crate::state::CollectorState;
use crate::Result;

/// 소스별 실행 요약
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SourceResult {
    Ran {
        source: NewsSource,
        added: u64,
        total: u64,
        rate_limited: bool,
    },
    Skipped {
        source: NewsSource,
        skipped: bool,
        reason: String,
    },
}

/// 건너뛴 소스
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSource {
    pub source: NewsSource,
    pub reason: String,
}

/// 여러 소스 이어서 수집 결과
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResumeResult {
    pub success: bool,
    /// 통합 뉴스 파일의 전체 기사 수
    pub total: usize,
    /// 이번 실행에서 새로 저장된 기사 수 (모든 소스 합)
    pub added: u64,
    pub rate_limited: bool,
    pub message: String,
    /// 실행된 소스
    pub sources: Vec<NewsSource>,
    pub source_results: Vec<SourceResult>,
    pub skipped: Vec<SkippedSource>,
    #[serde(skip)]
    pub runs: Vec<NewsRunSummary>,
}

/// 검색 결과 (저장하지 않음)
#[derive(Debug, Clone, Serialize)]
pub struct NewsSearchResult {
    pub query: String,
    pub source: NewsSource,
    pub total: usize,
    pub items: Vec<NewsItem>,
    pub rate_limited: bool,
}

/// 뉴스 수집/조회 서비스
pub struct NewsService<'a> {
    state: &'a CollectorState,
}

impl<'a> NewsService<'a> {
    pub fn new(state: &'a CollectorState) -> Self {
        Self { state }
    }

    /// 소스 순서대로 키워드 이어서 수집.
    ///
    /// 자격증명이 없는 소스는 건너뛰고, 모든 소스를 건너뛰면 설정 오류입니다.
    /// `sources`가 비어 있으면 `daum, naver` 순서로 실행합니다.
    pub async fn crawl_api_resume(
        &self,
        sources: &[String],
        opts: NewsResumeOptions,
    ) -> Result<CrawlResumeResult> {
        let sources = if sources.is_empty() {
            vec![NewsSource::Daum, NewsSource::Naver]
        } else {
            parse_sources(sources)?
        };

        let mut runs: Vec<NewsRunSummary> = Vec::new();
        let mut skipped: Vec<SkippedSource> = Vec::new();

        for source in sources {
            match run_news_resume(self.state, source, opts.clone()).await {
                Ok(summary) => runs.push(summary),
                Err(CollectorError::Config(reason)) => {
                    tracing::warn!(source = %source, reason = %reason, "자격증명 없음, 소스 건너뜀");
                    skipped.push(SkippedSource { source, reason });
                }
                Err(e) => return Err(e),
            }
        }

        if runs.is_empty() {
            let reasons: Vec<String> = skipped
                .iter()
                .map(|s| format!("{}: {}", s.source, s.reason))
                .collect();
            return Err(CollectorError::Config(reasons.join("; ")));
        }

        let rate_limited_sources: Vec<String> = runs
            .iter()
            .filter(|r| r.rate_limited)
            .map(|r| r.source.to_string())
            .collect();
        let continued_sources: Vec<String> = runs
            .iter()
            .filter(|r| !r.rate_limited)
            .map(|r| r.source.to_string())
            .collect();

        let mut message = runs.last().map(|r| r.message.clone()).unwrap_or_default();
        if !rate_limited_sources.is_empty() && !continued_sources.is_empty() {
            message.push_str(&format!(
                " [호출 제한: {} → {} 계속 실행]",
                rate_limited_sources.join(", "),
                continued_sources.join(", ")
            ));
        }

        let mut source_results: Vec<SourceResult> = runs
            .iter()
            .map(|r| SourceResult::Ran {
                source: r.source,
                added: r.added_this_run,
                total: r.total_saved,
                rate_limited: r.rate_limited,
            })
            .collect();
        source_results.extend(skipped.iter().map(|s| SourceResult::Skipped {
            source: s.source,
            skipped: true,
            reason: s.reason.clone(),
        }));

        Ok(CrawlResumeResult {
            success: true,
            total: self.state.news_sink().count().await?,
            added: runs.iter().map(|r| r.added_this_run).sum(),
            rate_limited: !rate_limited_sources.is_empty(),
            message,
            sources: runs.iter().map(|r| r.source).collect(),
            source_results,
            skipped,
            runs,
        })
    }

    /// 검색어 하나를 즉석 조회합니다. 저장하거나 진행 상태를 바꾸지 않습니다.
    pub async fn search_news(&self, query: &str, source: &str, max_results: usize) -> Result<NewsSearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CollectorError::Input("검색어(query)가 필요합니다.".to_string()));
        }
        let source: NewsSource = source.parse()?;
        let fetcher = self.state.news_fetcher(source)?;

        let opts = PaginationOptions {
            max_results: Some(max_results.max(1)),
            min_pub_date: self.state.config.news.min_pub_date.clone(),
            page_delay: self.state.config.news.page_delay(),
            ..PaginationOptions::default()
        };

        let (items, rate_limited) = match fetch_keyword(fetcher.as_ref(), query, &opts).await {
            FetchOutcome::Ok(items) => (items, false),
            FetchOutcome::Empty => (Vec::new(), false),
            FetchOutcome::RateLimited { partial, .. } => (partial, true),
            FetchOutcome::HardError(e) => return Err(CollectorError::DataSource(e)),
        };

        Ok(NewsSearchResult {
            query: query.to_string(),
            source,
            total: items.len(),
            items,
            rate_limited,
        })
    }

    /// 저장된 통합 뉴스 페이지 조회 (page는 1부터).
    pub async fn read_saved_news_paginated(
        &self,
        page: usize,
        limit: usize,
        q: Option<&str>,
    ) -> Result<NewsPage> {
        Ok(self.state.news_sink().read_page(page, limit, q).await?)
    }
}
