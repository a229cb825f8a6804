//! KRX 기준일 배치 수집 모듈.
//!
//! 워터마크 다음 평일부터 어제(KST)까지 날짜 오름차순으로, 날짜마다
//! `kospi_daily → kosdaq_daily → kospi_basic → kosdaq_basic` 순서로 수집합니다.
//!
//! # 진행 상태
//!
//! - API 하나가 끝날 때마다 `by_date`에 기록하고 저장
//! - 4개 API가 모두 끝난 날짜가 워터마크와 이어지면 워터마크로 흡수
//! - 호출 한도에 걸리면 그때까지의 상태를 저장하고 즉시 종료
//!
//! 기본정보는 같은 날짜 일별 매매정보에서 시가총액 필터를 통과한 종목만 남깁니다.
//! 일별 매매정보가 이전 실행에서 끝났다면 종목별 파일을 읽어 종목코드를 복원합니다.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use stockfeed_core::calendar::{format_yyyymmdd, weekdays_between, yesterday_kst};
use stockfeed_core::{FetchOutcome, KrxApiId, KrxDataKind, KrxRow, Market, WorkUnit};
use stockfeed_data::{KrxFetcher, KrxProgress, KRX_PROGRESS_KEY};

use super::RunStatus;
use crate::state::CollectorState;
use crate::{CollectionStats, Result};

/// 배치 실행 옵션
#[derive(Debug, Clone, Default)]
pub struct KrxBatchOptions {
    /// 이번 실행에서 처리할 최대 날짜 수 (None이면 끝까지)
    pub max_dates: Option<usize>,
    /// 마지막 기준일 (None이면 어제, KST)
    pub end_date: Option<NaiveDate>,
    /// 진행 상태를 지우고 처음부터
    pub reset: bool,
}

/// 배치 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct KrxBatchSummary {
    pub status: RunStatus,
    pub rate_limited: bool,
    /// 이번 실행에서 수집을 시도한 날짜 수
    pub dates_processed: usize,
    /// 이번 실행에서 워터마크로 흡수된 날짜 수
    pub dates_completed: usize,
    /// 종목별 파일에 새로 추가된 행 수
    pub rows_saved: usize,
    /// 기본정보 스냅샷에 저장된 행 수
    pub basic_rows_saved: usize,
    /// 실패해 다음 실행으로 넘어간 단위 (`YYYYMMDD:api_id`)
    pub failed_units: Vec<String>,
    pub last_completed_date: Option<String>,
    pub total_dates_done: u64,
    pub message: String,
    pub stats: CollectionStats,
}

/// 단위 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UnitReport {
    Saved {
        path: String,
        count: usize,
        #[serde(skip)]
        added: usize,
    },
    Error {
        error: String,
    },
}

/// 날짜 하나 수집 결과
#[derive(Debug, Clone, Serialize)]
pub struct DateCollection {
    pub date: String,
    pub results: BTreeMap<KrxApiId, UnitReport>,
    pub rate_limited: bool,
}

enum UnitResult {
    Saved(UnitReport),
    RateLimited(String),
    Failed(String),
}

/// 한 날짜 안에서 공유하는 시장별 종목코드 집합
type CodeSets = HashMap<Market, HashSet<String>>;

/// 시가총액 필터 + 기준일 보정
fn filter_daily_rows(rows: Vec<KrxRow>, state: &CollectorState, bas_dd: &str) -> Vec<KrxRow> {
    let threshold = state.config.krx.market_cap_threshold;
    rows.into_iter()
        .filter(|row| row.market_cap().is_some_and(|cap| cap >= threshold))
        .map(|mut row| {
            if row.trade_date().is_none() {
                row.insert("BAS_DD", bas_dd);
            }
            row
        })
        .collect()
}

/// 같은 날짜 일별 매매정보의 종목코드 집합. 메모리에 없으면 저장된 파일에서 복원합니다.
async fn codes_for(
    state: &CollectorState,
    codes: &mut CodeSets,
    market: Market,
    bas_dd: &str,
) -> Result<HashSet<String>> {
    if let Some(set) = codes.get(&market) {
        return Ok(set.clone());
    }
    let set = state.daily_sink(market).codes_for_date(bas_dd).await?;
    tracing::debug!(market = market.as_str(), bas_dd, count = set.len(), "종목코드 복원");
    codes.insert(market, set.clone());
    Ok(set)
}

/// 단위 하나: 수집 → 필터 → 저장.
async fn run_unit(
    state: &CollectorState,
    fetcher: &dyn KrxFetcher,
    date: NaiveDate,
    api_id: KrxApiId,
    codes: &mut CodeSets,
) -> Result<UnitResult> {
    let unit = WorkUnit::Krx { date, api_id };
    let bas_dd = format_yyyymmdd(date);
    let market = api_id.market();

    let rows = match fetcher.fetch(api_id, date).await {
        FetchOutcome::Ok(rows) => rows,
        FetchOutcome::Empty => Vec::new(),
        FetchOutcome::RateLimited { reason, .. } => return Ok(UnitResult::RateLimited(reason)),
        FetchOutcome::HardError(e) => return Ok(UnitResult::Failed(e)),
    };
    let fetched = rows.len();

    let report = match api_id.kind() {
        KrxDataKind::DailyTrade => {
            let filtered = filter_daily_rows(rows, state, &bas_dd);
            let set: HashSet<String> = filtered.iter().filter_map(KrxRow::short_code).collect();
            codes.insert(market, set);

            let sink = state.daily_sink(market);
            let count = filtered.len();
            let write = sink.append_rows(filtered).await?;
            UnitReport::Saved {
                path: sink.dir().display().to_string(),
                count,
                added: write.added,
            }
        }
        KrxDataKind::BasicInfo => {
            let set = codes_for(state, codes, market, &bas_dd).await?;
            let filtered: Vec<KrxRow> = rows
                .into_iter()
                .filter(|row| row.short_code().is_some_and(|c| set.contains(&c)))
                .collect();

            let (path, count) = state.snapshot_sink(market).write(date, filtered).await?;
            UnitReport::Saved {
                path: path.display().to_string(),
                count,
                added: count,
            }
        }
    };

    if let UnitReport::Saved { count, .. } = &report {
        tracing::info!(unit = %unit, fetched, saved = count, "수집 및 저장 완료");
    }
    Ok(UnitResult::Saved(report))
}

async fn save_progress(state: &CollectorState, progress: &mut KrxProgress) -> Result<()> {
    progress.touch();
    state.progress().save(KRX_PROGRESS_KEY, progress).await?;
    Ok(())
}

/// KRX 배치 수집 (끊겼던 날짜/API부터 이어서).
pub async fn run_krx_batch(state: &CollectorState, opts: KrxBatchOptions) -> Result<KrxBatchSummary> {
    let started = Instant::now();
    let fetcher = state.krx_fetcher()?;
    let store = state.progress();

    if opts.reset {
        store.reset(KRX_PROGRESS_KEY).await?;
        tracing::info!("KRX 진행 상태 초기화");
    }
    let mut progress: KrxProgress = store.load(KRX_PROGRESS_KEY).await;

    let end = opts.end_date.unwrap_or_else(yesterday_kst);
    let start = match progress.last_completed() {
        Some(w) => (w + Duration::days(1)).max(state.config.krx.start_date),
        None => state.config.krx.start_date,
    };
    let dates = weekdays_between(start, end);

    tracing::info!(
        start = %format_yyyymmdd(start),
        end = %format_yyyymmdd(end),
        dates = dates.len(),
        watermark = ?progress.last_completed_date,
        "KRX 배치 수집 시작"
    );

    let delay = state.config.krx.request_delay();
    let mut stats = CollectionStats::new();
    let mut summary = KrxBatchSummary {
        status: RunStatus::Completed,
        rate_limited: false,
        dates_processed: 0,
        dates_completed: 0,
        rows_saved: 0,
        basic_rows_saved: 0,
        failed_units: Vec::new(),
        last_completed_date: None,
        total_dates_done: 0,
        message: String::new(),
        stats: CollectionStats::new(),
    };
    let mut fetched_any = false;

    'dates: for &date in &dates {
        if progress.is_date_complete(date) {
            stats.skipped += KrxApiId::ALL.len();
            stats.total += KrxApiId::ALL.len();
            summary.dates_completed += progress.roll_watermark(&dates);
            continue;
        }
        if opts.max_dates.is_some_and(|max| summary.dates_processed >= max) {
            break;
        }
        summary.dates_processed += 1;
        if progress.partial_by_date.contains_key(&format_yyyymmdd(date)) {
            tracing::info!(date = %format_yyyymmdd(date), done = ?progress.done_for(date), "부분 완료 날짜 이어서 수집");
        }

        let mut codes = CodeSets::new();
        for api_id in KrxApiId::ALL {
            stats.total += 1;
            let unit = WorkUnit::Krx { date, api_id };

            if progress.is_done(date, api_id) {
                stats.skipped += 1;
                continue;
            }
            if let Some(dep) = api_id.daily_dependency() {
                if !progress.is_done(date, dep) {
                    tracing::warn!(unit = %unit, dependency = %dep, "선행 일별 매매정보 미완료, 건너뜀");
                    stats.errors += 1;
                    summary.failed_units.push(unit.to_string());
                    continue;
                }
            }

            if fetched_any && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            fetched_any = true;

            match run_unit(state, fetcher.as_ref(), date, api_id, &mut codes).await? {
                UnitResult::Saved(UnitReport::Saved { count, added, .. }) => {
                    if count == 0 {
                        stats.empty += 1;
                    } else {
                        stats.success += 1;
                    }
                    match api_id.kind() {
                        KrxDataKind::DailyTrade => summary.rows_saved += added,
                        KrxDataKind::BasicInfo => summary.basic_rows_saved += count,
                    }
                    stats.saved += added;
                    progress.mark_done(date, api_id);
                    save_progress(state, &mut progress).await?;
                }
                UnitResult::Saved(UnitReport::Error { error }) | UnitResult::Failed(error) => {
                    tracing::error!(unit = %unit, error = %error, "수집 실패, 다음 실행에서 재시도");
                    stats.errors += 1;
                    summary.failed_units.push(unit.to_string());
                }
                UnitResult::RateLimited(reason) => {
                    tracing::warn!(unit = %unit, reason = %reason, "호출 한도 도달, 진행 상태 저장 후 중단");
                    stats.rate_limited += 1;
                    summary.rate_limited = true;
                    summary.status = RunStatus::HaltedByRateLimit;
                    break 'dates;
                }
            }
        }

        let rolled = progress.roll_watermark(&dates);
        if rolled > 0 {
            summary.dates_completed += rolled;
            save_progress(state, &mut progress).await?;
        }
    }

    summary.dates_completed += progress.roll_watermark(&dates);
    save_progress(state, &mut progress).await?;

    stats.elapsed = started.elapsed();
    summary.last_completed_date = progress.last_completed_date.clone();
    summary.total_dates_done = progress.total_dates_done;
    summary.message = batch_message(&summary, &dates, &opts);
    summary.stats = stats;
    summary.stats.log_summary("KRX 배치 수집");

    Ok(summary)
}

fn batch_message(summary: &KrxBatchSummary, dates: &[NaiveDate], opts: &KrxBatchOptions) -> String {
    let watermark = summary
        .last_completed_date
        .clone()
        .unwrap_or_else(|| "-".to_string());
    let mut msg = format!(
        "이번 실행 {}일 처리, {}일 완료 (워터마크 {}, 누적 {}일)",
        summary.dates_processed, summary.dates_completed, watermark, summary.total_dates_done
    );
    if dates.is_empty() {
        msg = format!("수집할 날짜 없음. 완료. (워터마크 {})", watermark);
    }
    if summary.rate_limited {
        msg.push_str(" (호출 제한 도달, 저장됨. 다음 실행 시 이어서 진행)");
    } else if opts.max_dates.is_some_and(|max| summary.dates_processed >= max) {
        msg.push_str(" (max_dates 도달)");
    }
    if !summary.failed_units.is_empty() {
        msg.push_str(&format!(" / 실패 {}건은 다음 실행에서 재시도", summary.failed_units.len()));
    }
    msg
}

/// 날짜 하나를 지정한 API(기본: 전체)로 수집합니다.
///
/// 결과는 진행 상태에도 기록되어 배치 수집이 같은 단위를 다시 부르지 않습니다.
/// 기본정보만 요청해도 아직 완료되지 않은 같은 시장의 일별 매매정보를 먼저 수집하고,
/// 일별 매매정보가 끝내 완료되지 않으면 기본정보는 저장하지 않습니다.
pub async fn collect_date(
    state: &CollectorState,
    date: NaiveDate,
    api_ids: &[KrxApiId],
) -> Result<DateCollection> {
    let fetcher = state.krx_fetcher()?;
    let store = state.progress();
    let mut progress: KrxProgress = store.load(KRX_PROGRESS_KEY).await;

    let mut ids: Vec<KrxApiId> = if api_ids.is_empty() {
        KrxApiId::ALL.to_vec()
    } else {
        api_ids.to_vec()
    };
    let missing_daily: Vec<KrxApiId> = ids
        .iter()
        .filter_map(|api_id| api_id.daily_dependency())
        .filter(|dep| !progress.is_done(date, *dep))
        .collect();
    ids.extend(missing_daily);
    ids.sort();
    ids.dedup();

    let delay = state.config.krx.request_delay();
    let mut codes = CodeSets::new();
    let mut results = BTreeMap::new();
    let mut rate_limit_reason: Option<String> = None;

    for (idx, api_id) in ids.into_iter().enumerate() {
        if let Some(reason) = &rate_limit_reason {
            results.insert(
                api_id,
                UnitReport::Error {
                    error: format!("호출 한도 도달로 건너뜀: {}", reason),
                },
            );
            continue;
        }
        if let Some(dep) = api_id.daily_dependency() {
            if !progress.is_done(date, dep) {
                tracing::warn!(unit = %WorkUnit::Krx { date, api_id }, dependency = %dep, "선행 일별 매매정보 미완료, 건너뜀");
                results.insert(
                    api_id,
                    UnitReport::Error {
                        error: format!("선행 {} 미완료로 건너뜀", dep),
                    },
                );
                continue;
            }
        }
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let report = match run_unit(state, fetcher.as_ref(), date, api_id, &mut codes).await? {
            UnitResult::Saved(report) => {
                progress.mark_done(date, api_id);
                save_progress(state, &mut progress).await?;
                report
            }
            UnitResult::Failed(error) => UnitReport::Error { error },
            UnitResult::RateLimited(reason) => {
                rate_limit_reason = Some(reason.clone());
                UnitReport::Error { error: reason }
            }
        };
        results.insert(api_id, report);
    }

    let from = progress
        .last_completed()
        .map(|w| w + Duration::days(1))
        .unwrap_or(state.config.krx.start_date);
    if date >= from && progress.roll_watermark(&weekdays_between(from, date)) > 0 {
        save_progress(state, &mut progress).await?;
    }

    Ok(DateCollection {
        date: format_yyyymmdd(date),
        results,
        rate_limited: rate_limit_reason.is_some(),
    })
}
