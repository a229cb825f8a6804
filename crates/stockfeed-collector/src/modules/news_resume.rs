//! 뉴스 키워드 이어서 수집 모듈.
//!
//! 남은 키워드를 최대 `workers`개씩 동시에 수집합니다. 키워드 하나는 작업 하나가
//! 페이지 끝까지 순서대로 넘기고, 결과는 끝나는 순서대로 이 루프가 받아
//! 저장소와 진행 상태에 반영합니다. 저장소/진행 파일에 쓰는 것은 이 루프뿐입니다.
//!
//! # 체크포인트
//!
//! 완료된 키워드의 기사는 배치에 쌓았다가 `checkpoint_every`건을 넘으면
//! 저장 후 진행 상태에 키워드를 완료로 기록합니다. 키워드는 기사와 같은
//! 체크포인트에서만 완료로 기록됩니다.
//!
//! # 호출 한도
//!
//! 한 키워드라도 한도에 걸리면 새 키워드를 더 내보내지 않고 이미 실행 중인
//! 작업만 마저 받습니다. 한도에 걸린 키워드의 부분 결과는 바로 저장하되
//! 완료로 기록하지 않습니다.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use stockfeed_core::{FetchOutcome, NewsItem, NewsSource, WorkUnit};
use stockfeed_data::{
    fetch_keyword, news_progress_key, NewsFetcher, NewsProgress, PaginationOptions,
};
use tokio::task::JoinSet;

use super::keywords::load_keywords;
use super::RunStatus;
use crate::config::NewsConfig;
use crate::state::CollectorState;
use crate::{CollectionStats, Result};

/// 키워드 수집 옵션
#[derive(Debug, Clone)]
pub struct NewsResumeOptions {
    /// 동시에 수집할 키워드 수
    pub workers: usize,
    /// 진행 상태를 지우고 처음부터
    pub reset: bool,
    /// 키워드당 최대 페이지 (0이면 소스 한계까지)
    pub max_pages: u32,
    /// 키워드 목록 앞에서부터 이만큼만 (0이면 전체)
    pub keywords_limit: usize,
    /// 이만큼 기사가 모이면 저장 + 진행 상태 기록
    pub checkpoint_every: usize,
}

impl NewsResumeOptions {
    pub fn from_config(config: &NewsConfig) -> Self {
        Self {
            workers: config.workers,
            reset: false,
            max_pages: 0,
            keywords_limit: 0,
            checkpoint_every: config.checkpoint_every,
        }
    }
}

/// 소스 하나의 수집 결과
#[derive(Debug, Clone, Serialize)]
pub struct NewsRunSummary {
    pub source: NewsSource,
    pub status: RunStatus,
    pub total_saved: u64,
    pub added_this_run: u64,
    pub rate_limited: bool,
    /// 이번 실행 대상 키워드 수
    pub keywords_remaining: usize,
    /// 이번 실행에서 완료로 기록된 키워드
    pub completed_this_run: Vec<String>,
    /// 첫 페이지부터 실패해 다음 실행으로 넘어간 키워드
    pub failed_keywords: Vec<String>,
    pub message: String,
    pub stats: CollectionStats,
}

type KeywordResult = (String, FetchOutcome<NewsItem>);

fn spawn_keyword(
    tasks: &mut JoinSet<KeywordResult>,
    fetcher: Arc<dyn NewsFetcher>,
    keyword: String,
    opts: PaginationOptions,
) {
    tasks.spawn(async move {
        let outcome = fetch_keyword(fetcher.as_ref(), &keyword, &opts).await;
        (keyword, outcome)
    });
}

/// 체크포인트 배치.
#[derive(Default)]
struct Checkpoint {
    items: Vec<NewsItem>,
    keywords: Vec<String>,
}

impl Checkpoint {
    fn is_empty(&self) -> bool {
        self.items.is_empty() && self.keywords.is_empty()
    }
}

/// 배치를 저장하고 같은 시점에 키워드를 완료로 기록합니다. 새로 저장된 건수를 돌려줍니다.
async fn flush(
    state: &CollectorState,
    key: &str,
    progress: &mut NewsProgress,
    batch: &mut Checkpoint,
) -> Result<u64> {
    let items = std::mem::take(&mut batch.items);
    let added = state.news_sink().append_dedup(items).await? as u64;

    progress.total_saved += added;
    progress.completed_keywords.extend(batch.keywords.drain(..));
    progress.touch();
    state.progress().save(key, progress).await?;

    tracing::debug!(key, added, total_saved = progress.total_saved, "체크포인트 저장");
    Ok(added)
}

/// 뉴스 API 기반 키워드 수집 (끊겼던 키워드부터 이어서).
pub async fn run_news_resume(
    state: &CollectorState,
    source: NewsSource,
    opts: NewsResumeOptions,
) -> Result<NewsRunSummary> {
    let started = Instant::now();
    let fetcher = state.news_fetcher(source)?;
    let store = state.progress();
    let key = news_progress_key(source);

    state.news_sink().ensure_exists().await?;
    let mut keywords = load_keywords(&state.keywords_path()).await;
    if opts.keywords_limit > 0 {
        keywords.truncate(opts.keywords_limit);
    }

    if opts.reset {
        store.reset(&key).await?;
        tracing::info!(source = %source, "뉴스 진행 상태 초기화");
    }
    let mut progress: NewsProgress = store.load(&key).await;
    let saved_before = progress.total_saved;

    let remaining: Vec<String> = progress.remaining(&keywords).into_iter().cloned().collect();
    let mut stats = CollectionStats::new();
    let mut summary = NewsRunSummary {
        source,
        status: RunStatus::Completed,
        total_saved: progress.total_saved,
        added_this_run: 0,
        rate_limited: false,
        keywords_remaining: remaining.len(),
        completed_this_run: Vec::new(),
        failed_keywords: Vec::new(),
        message: String::new(),
        stats: CollectionStats::new(),
    };

    if remaining.is_empty() {
        summary.message = "남은 키워드 없음. 완료.".to_string();
        tracing::info!(source = %source, total_saved = progress.total_saved, "남은 키워드 없음");
        return Ok(summary);
    }

    let workers = opts.workers.max(1).min(remaining.len());
    let checkpoint_every = opts.checkpoint_every.max(1);
    let pagination = PaginationOptions {
        max_pages: opts.max_pages,
        max_results: None,
        min_pub_date: state.config.news.min_pub_date.clone(),
        page_delay: state.config.news.page_delay(),
    };

    tracing::info!(
        source = %source,
        keywords = keywords.len(),
        remaining = remaining.len(),
        workers,
        "뉴스 키워드 수집 시작"
    );

    let mut queue = remaining.into_iter();
    let mut tasks: JoinSet<KeywordResult> = JoinSet::new();
    for keyword in queue.by_ref().take(workers) {
        spawn_keyword(&mut tasks, fetcher.clone(), keyword, pagination.clone());
    }

    let mut batch = Checkpoint::default();
    let mut rate_limited = false;

    while let Some(joined) = tasks.join_next().await {
        let (keyword, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(source = %source, error = %e, "키워드 작업 비정상 종료");
                stats.errors += 1;
                continue;
            }
        };
        stats.total += 1;
        let unit = WorkUnit::News {
            source,
            keyword: keyword.clone(),
        };

        match outcome {
            FetchOutcome::RateLimited { partial, reason } => {
                rate_limited = true;
                stats.rate_limited += 1;
                let count = partial.len();
                let added = state.news_sink().append_dedup(partial).await? as u64;
                progress.total_saved += added;
                tracing::warn!(
                    unit = %unit,
                    partial = count,
                    added,
                    reason = %reason,
                    "호출 한도 도달, 부분 결과 저장 후 새 키워드 중단"
                );
            }
            FetchOutcome::HardError(e) => {
                stats.errors += 1;
                summary.failed_keywords.push(keyword);
                tracing::error!(unit = %unit, error = %e, "키워드 수집 실패, 다음 실행에서 재시도");
            }
            complete => {
                let rows = complete.into_rows();
                if rows.is_empty() {
                    stats.empty += 1;
                } else {
                    stats.success += 1;
                }
                tracing::info!(unit = %unit, count = rows.len(), "키워드 수집 완료");
                batch.items.extend(rows);
                batch.keywords.push(keyword.clone());
                summary.completed_this_run.push(keyword);

                if batch.items.len() >= checkpoint_every {
                    flush(state, &key, &mut progress, &mut batch).await?;
                }
            }
        }

        if !rate_limited {
            if let Some(next) = queue.next() {
                spawn_keyword(&mut tasks, fetcher.clone(), next, pagination.clone());
            }
        }
    }

    if !batch.is_empty() {
        flush(state, &key, &mut progress, &mut batch).await?;
    } else {
        progress.touch();
        store.save(&key, &progress).await?;
    }

    stats.saved = (progress.total_saved - saved_before) as usize;
    stats.elapsed = started.elapsed();

    summary.total_saved = progress.total_saved;
    summary.added_this_run = progress.total_saved - saved_before;
    summary.rate_limited = rate_limited;
    if rate_limited {
        summary.status = RunStatus::HaltedByRateLimit;
    }
    summary.message = format!(
        "이번 실행 {}건, 누적 {}건",
        summary.added_this_run, summary.total_saved
    );
    if rate_limited {
        summary.message.push_str(" (호출 제한 도달, 저장됨. 다음 실행 시 이어서 진행)");
    }
    summary.stats = stats;
    summary.stats.log_summary(&format!("뉴스 수집 ({})", source));

    Ok(summary)
}
