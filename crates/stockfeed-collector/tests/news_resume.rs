//! 뉴스 키워드 이어서 수집 통합 테스트.

mod common;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{articles, news_state, test_config, write_keywords, FakeNews};
use stockfeed_collector::modules::{run_news_resume, NewsResumeOptions, RunStatus};
use stockfeed_collector::service::{NewsService, SourceResult};
use stockfeed_collector::{CollectorError, CollectorState};
use stockfeed_core::{FetchOutcome, NewsItem, NewsSource};
use stockfeed_data::{news_progress_key, NewsFetcher, NewsProgress};

fn opts(workers: usize) -> NewsResumeOptions {
    NewsResumeOptions {
        workers,
        reset: false,
        max_pages: 0,
        keywords_limit: 0,
        checkpoint_every: 100,
    }
}

async fn load_progress(state: &CollectorState, source: NewsSource) -> NewsProgress {
    state.progress().load(&news_progress_key(source)).await
}

/// 지정한 키워드의 첫 페이지를 부르는 순간 디스크에 있는 진행 상태와 기사 수를 기록합니다.
struct DiskWatcher {
    inner: FakeNews,
    dir: PathBuf,
    keyword: String,
    seen: Mutex<Option<(NewsProgress, usize)>>,
}

impl DiskWatcher {
    fn new(inner: FakeNews, dir: &Path, keyword: &str) -> Self {
        Self {
            inner,
            dir: dir.to_path_buf(),
            keyword: keyword.to_string(),
            seen: Mutex::new(None),
        }
    }

    fn seen(&self) -> Option<(NewsProgress, usize)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsFetcher for DiskWatcher {
    fn source(&self) -> NewsSource {
        self.inner.source()
    }

    fn max_pages(&self) -> u32 {
        self.inner.max_pages()
    }

    fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    async fn fetch_page(&self, query: &str, page: u32) -> FetchOutcome<NewsItem> {
        if query == self.keyword && page == 0 {
            let disk = CollectorState::new(test_config(&self.dir));
            let progress = load_progress(&disk, self.source()).await;
            let count = disk.news_sink().count().await.unwrap();
            *self.seen.lock().unwrap() = Some((progress, count));
        }
        self.inner.fetch_page(query, page).await
    }
}

#[tokio::test]
async fn test_rate_limited_keyword_keeps_partial_items_but_is_not_completed() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["코스피", "코스닥"]).await;

    let naver = Arc::new(
        FakeNews::new(NewsSource::Naver, 100)
            .page("코스피", FetchOutcome::Ok(articles("kospi", 100)))
            .page(
                "코스피",
                FetchOutcome::RateLimited {
                    partial: articles("kospi-p2", 20),
                    reason: "HTTP 429".to_string(),
                },
            )
            .page("코스닥", FetchOutcome::Ok(articles("kosdaq", 40))),
    );
    let state = news_state(dir.path(), vec![naver.clone()]);

    let summary = run_news_resume(&state, NewsSource::Naver, opts(2)).await.unwrap();

    assert!(summary.rate_limited);
    assert_eq!(summary.status, RunStatus::HaltedByRateLimit);
    assert_eq!(summary.added_this_run, 160);
    assert_eq!(summary.completed_this_run, vec!["코스닥".to_string()]);
    assert_eq!(state.news_sink().count().await.unwrap(), 160);

    let progress = load_progress(&state, NewsSource::Naver).await;
    assert_eq!(progress.completed_keywords, BTreeSet::from(["코스닥".to_string()]));
    assert_eq!(progress.total_saved, 160);

    // 다음 실행은 코스피만 다시 수집하고, 이미 저장한 기사는 중복으로 걸러짐
    let retry = Arc::new(
        FakeNews::new(NewsSource::Naver, 100)
            .page("코스피", FetchOutcome::Ok(articles("kospi", 100)))
            .page("코스피", FetchOutcome::Ok(articles("kospi-p2", 30))),
    );
    let state = news_state(dir.path(), vec![retry.clone()]);
    let summary = run_news_resume(&state, NewsSource::Naver, opts(2)).await.unwrap();

    assert_eq!(retry.keywords_called(), vec!["코스피".to_string()]);
    assert!(!summary.rate_limited);
    assert_eq!(summary.added_this_run, 10);
    assert_eq!(state.news_sink().count().await.unwrap(), 170);

    let progress = load_progress(&state, NewsSource::Naver).await;
    assert_eq!(progress.completed_keywords.len(), 2);
    assert_eq!(progress.total_saved, 170);
}

#[tokio::test]
async fn test_rate_limit_stops_dispatching_queued_keywords() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["주식", "코스피", "코스닥"]).await;

    let naver = Arc::new(
        FakeNews::new(NewsSource::Naver, 100)
            .page(
                "주식",
                FetchOutcome::RateLimited {
                    partial: articles("stock", 5),
                    reason: "HTTP 429".to_string(),
                },
            )
            .page("코스피", FetchOutcome::Ok(articles("kospi", 10)))
            .page("코스닥", FetchOutcome::Ok(articles("kosdaq", 10))),
    );
    let state = news_state(dir.path(), vec![naver.clone()]);

    let summary = run_news_resume(&state, NewsSource::Naver, opts(1)).await.unwrap();

    assert!(summary.rate_limited);
    assert_eq!(summary.status, RunStatus::HaltedByRateLimit);
    assert_eq!(naver.keywords_called(), vec!["주식".to_string()]);
    assert!(summary.completed_this_run.is_empty());
    assert_eq!(state.news_sink().count().await.unwrap(), 5);

    let progress = load_progress(&state, NewsSource::Naver).await;
    assert!(!progress.is_completed("코스피"));
    assert!(!progress.is_completed("코스닥"));
    assert!(progress.completed_keywords.is_empty());
    assert_eq!(progress.total_saved, 5);
}

#[tokio::test]
async fn test_checkpoint_is_on_disk_before_later_keywords_run() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["주식", "코스피", "코스닥"]).await;

    let fake = FakeNews::new(NewsSource::Naver, 100)
        .page("주식", FetchOutcome::Ok(articles("stock", 3)))
        .page("코스피", FetchOutcome::Ok(articles("kospi", 3)))
        .page("코스닥", FetchOutcome::HardError("HTTP 500".to_string()));
    let watcher = Arc::new(DiskWatcher::new(fake, dir.path(), "코스닥"));
    let state = CollectorState::new(test_config(dir.path())).with_news_fetcher(watcher.clone());

    let mut options = opts(1);
    options.checkpoint_every = 2;
    let summary = run_news_resume(&state, NewsSource::Naver, options).await.unwrap();

    let (progress, count) = watcher.seen().expect("코스닥 수집 전 디스크 상태");
    assert_eq!(
        progress.completed_keywords,
        BTreeSet::from(["주식".to_string(), "코스피".to_string()])
    );
    assert_eq!(progress.total_saved, 6);
    assert_eq!(count, 6);

    assert_eq!(summary.failed_keywords, vec!["코스닥".to_string()]);
    let progress = load_progress(&state, NewsSource::Naver).await;
    assert!(!progress.is_completed("코스닥"));
    assert_eq!(state.news_sink().count().await.unwrap(), 6);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["증시", "투자", "금융"]).await;

    let daum = Arc::new(
        FakeNews::new(NewsSource::Daum, 50)
            .page("증시", FetchOutcome::Ok(articles("market", 12)))
            .page("투자", FetchOutcome::Ok(articles("invest", 7)))
            // 다른 키워드에서 같은 기사가 나오면 한 번만 저장
            .page("금융", FetchOutcome::Ok(articles("market", 12))),
    );
    let state = news_state(dir.path(), vec![daum.clone()]);

    let first = run_news_resume(&state, NewsSource::Daum, opts(3)).await.unwrap();
    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(first.added_this_run, 19);
    assert_eq!(first.completed_this_run.len(), 3);

    let calls_before = daum.calls().len();
    let second = run_news_resume(&state, NewsSource::Daum, opts(3)).await.unwrap();
    assert_eq!(second.added_this_run, 0);
    assert_eq!(second.keywords_remaining, 0);
    assert_eq!(second.message, "남은 키워드 없음. 완료.");
    assert_eq!(daum.calls().len(), calls_before);
    assert_eq!(state.news_sink().count().await.unwrap(), 19);

    // 초기화 후 다시 돌려도 파일에는 중복이 생기지 않음
    let replay = Arc::new(
        FakeNews::new(NewsSource::Daum, 50)
            .page("증시", FetchOutcome::Ok(articles("market", 12)))
            .page("투자", FetchOutcome::Ok(articles("invest", 7))),
    );
    let state = news_state(dir.path(), vec![replay]);
    let mut reset = opts(2);
    reset.reset = true;
    let third = run_news_resume(&state, NewsSource::Daum, reset).await.unwrap();
    assert_eq!(third.added_this_run, 0);
    assert_eq!(third.completed_this_run.len(), 3);
    assert_eq!(state.news_sink().count().await.unwrap(), 19);
}

#[tokio::test]
async fn test_completed_keywords_always_have_their_items_saved() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["주식", "코스피", "코스닥", "증시", "투자"]).await;

    let naver = Arc::new(
        FakeNews::new(NewsSource::Naver, 100)
            .page("주식", FetchOutcome::Ok(articles("stock", 3)))
            .page("코스피", FetchOutcome::Ok(articles("kospi", 4)))
            .page("코스닥", FetchOutcome::HardError("HTTP 500".to_string()))
            .page("증시", FetchOutcome::Ok(articles("market", 5)))
            .page("투자", FetchOutcome::Empty),
    );
    let state = news_state(dir.path(), vec![naver]);
    let mut small_checkpoints = opts(2);
    small_checkpoints.checkpoint_every = 2;

    let summary = run_news_resume(&state, NewsSource::Naver, small_checkpoints).await.unwrap();
    assert_eq!(summary.failed_keywords, vec!["코스닥".to_string()]);
    assert_eq!(summary.added_this_run, 12);

    let progress = load_progress(&state, NewsSource::Naver).await;
    assert!(!progress.is_completed("코스닥"));
    assert!(progress.is_completed("투자"));

    let saved = state.news_sink().read_all().await.unwrap();
    let keywords_with_items: HashSet<&str> = saved.iter().map(|it| it.keyword.as_str()).collect();
    for keyword in ["주식", "코스피", "증시"] {
        assert!(progress.is_completed(keyword));
        assert!(keywords_with_items.contains(keyword));
    }
    assert!(saved.iter().all(|it| it.pub_date == "2024-02-15"));
}

#[tokio::test]
async fn test_keywords_limit_and_max_pages() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["주식", "코스피", "코스닥"]).await;

    let naver = Arc::new(
        FakeNews::new(NewsSource::Naver, 10)
            .page("주식", FetchOutcome::Ok(articles("p1", 10)))
            .page("주식", FetchOutcome::Ok(articles("p2", 10)))
            .page("주식", FetchOutcome::Ok(articles("p3", 10)))
            .page("코스피", FetchOutcome::Ok(articles("k1", 5))),
    );
    let state = news_state(dir.path(), vec![naver.clone()]);
    let mut limited = opts(1);
    limited.keywords_limit = 2;
    limited.max_pages = 2;

    let summary = run_news_resume(&state, NewsSource::Naver, limited).await.unwrap();
    assert_eq!(summary.keywords_remaining, 2);
    assert_eq!(summary.added_this_run, 25);
    assert_eq!(
        naver.keywords_called(),
        vec!["주식".to_string(), "코스피".to_string()]
    );
    assert_eq!(naver.calls().iter().filter(|(k, _)| k == "주식").count(), 2);
}

#[tokio::test]
async fn test_crawl_resume_skips_sources_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["증시"]).await;

    let naver = Arc::new(
        FakeNews::new(NewsSource::Naver, 100).page("증시", FetchOutcome::Ok(articles("market", 8))),
    );
    let state = news_state(dir.path(), vec![naver]);
    let service = NewsService::new(&state);

    let result = service.crawl_api_resume(&[], opts(2)).await.unwrap();
    assert!(result.success);
    assert_eq!(result.sources, vec![NewsSource::Naver]);
    assert_eq!(result.added, 8);
    assert_eq!(result.total, 8);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].source, NewsSource::Daum);
    assert!(result
        .source_results
        .iter()
        .any(|r| matches!(r, SourceResult::Skipped { source: NewsSource::Daum, .. })));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["source_results"][0]["source"], "naver");
    assert_eq!(json["source_results"][1]["skipped"], true);
}

#[tokio::test]
async fn test_crawl_resume_reports_rate_limited_and_continued_sources() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["증시"]).await;

    let daum = Arc::new(FakeNews::new(NewsSource::Daum, 50).page(
        "증시",
        FetchOutcome::RateLimited {
            partial: articles("daum", 3),
            reason: "HTTP 429".to_string(),
        },
    ));
    let naver = Arc::new(
        FakeNews::new(NewsSource::Naver, 100).page("증시", FetchOutcome::Ok(articles("naver", 5))),
    );
    let state = news_state(dir.path(), vec![daum, naver]);

    let result = NewsService::new(&state)
        .crawl_api_resume(&["daum".to_string(), "naver".to_string()], opts(2))
        .await
        .unwrap();

    assert!(result.rate_limited);
    assert_eq!(result.added, 8);
    assert!(result.message.contains("daum"));
    assert!(result.message.contains("naver"));
}

#[tokio::test]
async fn test_crawl_resume_fails_when_every_source_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let state = CollectorState::new(test_config(dir.path()));

    let err = NewsService::new(&state)
        .crawl_api_resume(&[], opts(2))
        .await
        .unwrap_err();
    match err {
        CollectorError::Config(reason) => {
            assert!(reason.contains("daum"));
            assert!(reason.contains("naver"));
        }
        other => panic!("unexpected error: {}", other),
    }

    let err = NewsService::new(&state)
        .crawl_api_resume(&["yahoo".to_string()], opts(2))
        .await
        .unwrap_err();
    assert!(err.is_input());
}

#[tokio::test]
async fn test_search_and_saved_news_paging() {
    let dir = tempfile::tempdir().unwrap();
    write_keywords(dir.path(), &["증시"]).await;

    let naver = Arc::new(
        FakeNews::new(NewsSource::Naver, 100)
            .page("반도체", FetchOutcome::Ok(articles("chip", 30)))
            .page("증시", FetchOutcome::Ok(articles("market", 25))),
    );
    let state = news_state(dir.path(), vec![naver]);
    let service = NewsService::new(&state);

    let found = service.search_news("반도체", "naver", 10).await.unwrap();
    assert_eq!(found.total, 10);
    assert!(found.items.iter().all(|it| it.keyword == "반도체"));
    assert!(!found.rate_limited);
    // 검색은 저장하지 않음
    assert_eq!(state.news_sink().count().await.unwrap(), 0);

    assert!(service.search_news("  ", "naver", 10).await.unwrap_err().is_input());
    assert!(service.search_news("증시", "bing", 10).await.unwrap_err().is_input());
    assert!(matches!(
        service.search_news("증시", "daum", 10).await.unwrap_err(),
        CollectorError::Config(_)
    ));

    service.crawl_api_resume(&["naver".to_string()], opts(1)).await.unwrap();
    let page = service.read_saved_news_paginated(2, 10, None).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.items.len(), 10);
    assert!(page.has_more);

    let filtered = service
        .read_saved_news_paginated(1, 10, Some("MARKET 기사 2"))
        .await
        .unwrap();
    // "market 기사 2", "market 기사 20" ~ "market 기사 24"
    assert_eq!(filtered.total, 6);
}
