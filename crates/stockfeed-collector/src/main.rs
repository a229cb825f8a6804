//! Stockfeed collector CLI.

use clap::{Parser, Subcommand};
use serde::Serialize;
use stockfeed_core::calendar::parse_yyyymmdd;
use stockfeed_core::logging::{init_logging, LogConfig, LogFormat};
use stockfeed_collector::modules::{KrxBatchOptions, NewsResumeOptions};
use stockfeed_collector::service::{KrxService, NewsService, ProgressService, ProgressTarget};
use stockfeed_collector::{CollectorConfig, CollectorState};

#[derive(Parser)]
#[command(name = "stockfeed-collector")]
#[command(about = "Resumable KRX / news batch collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact). 없으면 LOG_FORMAT
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// KRX 배치 수집 (워터마크 다음 날짜부터)
    KrxBatch {
        /// 이번 실행에서 처리할 최대 날짜 수
        #[arg(long)]
        max_dates: Option<usize>,
        /// 마지막 기준일 (YYYYMMDD, 기본값: 어제)
        #[arg(long)]
        end_date: Option<String>,
        /// 진행 상태를 지우고 처음부터
        #[arg(long)]
        reset: bool,
    },

    /// KRX 날짜 하나 수집
    KrxDate {
        /// 기준일 (YYYYMMDD)
        date: String,
        /// API ID (쉼표로 구분, 예: "kospi_daily,kospi_basic")
        #[arg(long)]
        api_ids: Option<String>,
    },

    /// KRX 원본 데이터 조회 (저장하지 않음)
    KrxFetch {
        api_id: String,
        #[arg(long)]
        date: Option<String>,
    },

    /// KRX API 목록
    KrxEndpoints,

    /// 뉴스 키워드 이어서 수집
    NewsResume {
        /// 소스 (쉼표로 구분, 기본값: "daum,naver")
        #[arg(long)]
        sources: Option<String>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        reset: bool,
        /// 키워드당 최대 페이지 (0이면 소스 한계까지)
        #[arg(long, default_value_t = 0)]
        max_pages: u32,
        /// 키워드 목록 앞에서부터 이만큼만 (0이면 전체)
        #[arg(long, default_value_t = 0)]
        keywords_limit: usize,
        #[arg(long)]
        checkpoint_every: Option<usize>,
    },

    /// 뉴스 즉석 검색 (저장하지 않음)
    NewsSearch {
        query: String,
        #[arg(long, default_value = "naver")]
        source: String,
        #[arg(long, default_value_t = 100)]
        max_results: usize,
    },

    /// 저장된 뉴스 조회
    NewsList {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// 제목/본문 검색어
        #[arg(long)]
        q: Option<String>,
    },

    /// 진행 상태 조회 (krx, naver, daum, all)
    Progress {
        #[arg(default_value = "all")]
        target: String,
    },

    /// 진행 상태 초기화 (krx, naver, daum, all)
    Reset { target: String },

    /// 데몬 모드: 주기적으로 뉴스 + KRX 수집
    Daemon,
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn parse_targets(raw: &str) -> anyhow::Result<Vec<ProgressTarget>> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(ProgressTarget::ALL.to_vec());
    }
    Ok(vec![raw.parse()?])
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_daemon(state: &CollectorState) {
    let config = &state.config;
    tracing::info!(
        "=== 데몬 모드 시작 (주기: {}분) ===",
        config.daemon.interval_minutes
    );

    let mut interval = tokio::time::interval(config.daemon.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                tracing::info!("=== 워크플로우 실행 시작 ===");

                // 1. 뉴스 키워드 수집
                let sources: Vec<String> = state
                    .configured_news_sources()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                if sources.is_empty() {
                    tracing::warn!("뉴스 자격증명 없음, 뉴스 수집 건너뜀");
                } else {
                    let opts = NewsResumeOptions::from_config(&config.news);
                    match NewsService::new(state).crawl_api_resume(&sources, opts).await {
                        Ok(result) => tracing::info!(added = result.added, "뉴스 수집: {}", result.message),
                        Err(e) => tracing::error!("뉴스 수집 실패: {}", e),
                    }
                }

                // 2. KRX 배치
                if state.has_krx() {
                    match KrxService::new(state).run_batch(KrxBatchOptions::default()).await {
                        Ok(summary) => tracing::info!("KRX 배치: {}", summary.message),
                        Err(e) => tracing::error!("KRX 배치 실패: {}", e),
                    }
                } else {
                    tracing::warn!("KRX 인증키 없음, KRX 배치 건너뜀");
                }

                tracing::info!(
                    "=== 워크플로우 완료, 다음 실행: {}분 후 ===",
                    config.daemon.interval_minutes
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config = log_config.with_level(level.as_str());
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format);
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    let config = CollectorConfig::from_env()?;
    tracing::debug!(data_dir = %config.data_dir.display(), "설정 로드 완료");

    let state = CollectorState::from_config(config)?;

    match cli.command {
        Commands::KrxBatch {
            max_dates,
            end_date,
            reset,
        } => {
            let end_date = end_date.as_deref().map(parse_yyyymmdd).transpose()?;
            let summary = KrxService::new(&state)
                .run_batch(KrxBatchOptions {
                    max_dates,
                    end_date,
                    reset,
                })
                .await?;
            print_json(&summary)?;
        }
        Commands::KrxDate { date, api_ids } => {
            let result = KrxService::new(&state)
                .collect_date(&date, &split_list(api_ids))
                .await?;
            print_json(&result)?;
        }
        Commands::KrxFetch { api_id, date } => {
            let result = KrxService::new(&state)
                .fetch_data(&api_id, date.as_deref())
                .await?;
            print_json(&result)?;
        }
        Commands::KrxEndpoints => {
            print_json(&KrxService::new(&state).endpoints())?;
        }
        Commands::NewsResume {
            sources,
            workers,
            reset,
            max_pages,
            keywords_limit,
            checkpoint_every,
        } => {
            let mut opts = NewsResumeOptions::from_config(&state.config.news);
            opts.reset = reset;
            opts.max_pages = max_pages;
            opts.keywords_limit = keywords_limit;
            if let Some(workers) = workers {
                opts.workers = workers.max(1);
            }
            if let Some(every) = checkpoint_every {
                opts.checkpoint_every = every.max(1);
            }

            let result = NewsService::new(&state)
                .crawl_api_resume(&split_list(sources), opts)
                .await?;
            print_json(&result)?;
        }
        Commands::NewsSearch {
            query,
            source,
            max_results,
        } => {
            let result = NewsService::new(&state)
                .search_news(&query, &source, max_results)
                .await?;
            print_json(&result)?;
        }
        Commands::NewsList { page, limit, q } => {
            let page = NewsService::new(&state)
                .read_saved_news_paginated(page, limit, q.as_deref())
                .await?;
            print_json(&page)?;
        }
        Commands::Progress { target } => {
            let service = ProgressService::new(&state);
            let mut snapshots = Vec::new();
            for target in parse_targets(&target)? {
                snapshots.push(service.inspect(target).await);
            }
            print_json(&snapshots)?;
        }
        Commands::Reset { target } => {
            let service = ProgressService::new(&state);
            let mut removed = Vec::new();
            for target in parse_targets(&target)? {
                if service.reset(target).await? {
                    removed.push(target.to_string());
                }
            }
            print_json(&serde_json::json!({ "reset": removed }))?;
        }
        Commands::Daemon => run_daemon(&state).await,
    }

    tracing::info!("Stockfeed collector 종료");
    Ok(())
}
