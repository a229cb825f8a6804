//! KRX 서비스.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use stockfeed_core::calendar::{format_yyyymmdd, parse_yyyymmdd, yesterday_kst};
use stockfeed_core::{FetchOutcome, KrxApiId, KrxRow};
use stockfeed_data::provider::krx_api::endpoint_url;

use crate::error::CollectorError;
use crate::modules::{collect_date, run_krx_batch, DateCollection, KrxBatchOptions, KrxBatchSummary};
use crate::state::CollectorState;
use crate::Result;

/// API ID별 엔드포인트 정보
#[derive(Debug, Clone, Serialize)]
pub struct EndpointInfo {
    pub api_id: KrxApiId,
    pub service_id: &'static str,
    pub url: String,
}

/// 원본 조회 결과
#[derive(Debug, Clone, Serialize)]
pub struct KrxFetchResult {
    pub bas_dd: String,
    pub fetched_at: chrono::DateTime<Utc>,
    pub count: usize,
    pub data: Vec<KrxRow>,
}

/// KRX 조회/수집 서비스
pub struct KrxService<'a> {
    state: &'a CollectorState,
}

fn parse_date_opt(date: Option<&str>) -> Result<NaiveDate> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => Ok(parse_yyyymmdd(d)?),
        None => Ok(yesterday_kst()),
    }
}

impl<'a> KrxService<'a> {
    pub fn new(state: &'a CollectorState) -> Self {
        Self { state }
    }

    /// 사용 가능한 API 목록
    pub fn endpoints(&self) -> Vec<EndpointInfo> {
        KrxApiId::ALL
            .into_iter()
            .map(|api_id| EndpointInfo {
                api_id,
                service_id: api_id.service_id(),
                url: endpoint_url(&self.state.config.krx.base_url, api_id),
            })
            .collect()
    }

    /// 한 API의 한 기준일 원본 데이터를 조회합니다 (저장하지 않음).
    ///
    /// `date`가 없으면 어제(KST). 호출 한도/업스트림 실패는 데이터 소스 오류입니다.
    pub async fn fetch_data(&self, api_id: &str, date: Option<&str>) -> Result<KrxFetchResult> {
        let api_id: KrxApiId = api_id.parse()?;
        let date = parse_date_opt(date)?;
        let fetcher = self.state.krx_fetcher()?;

        let data = match fetcher.fetch(api_id, date).await {
            FetchOutcome::Ok(rows) => rows,
            FetchOutcome::Empty => Vec::new(),
            FetchOutcome::RateLimited { reason, .. } => {
                return Err(CollectorError::DataSource(format!("호출 한도 도달: {}", reason)))
            }
            FetchOutcome::HardError(e) => return Err(CollectorError::DataSource(e)),
        };

        Ok(KrxFetchResult {
            bas_dd: format_yyyymmdd(date),
            fetched_at: Utc::now(),
            count: data.len(),
            data,
        })
    }

    /// 날짜 하나 수집 (일별 매매정보 → 기본정보 순서).
    pub async fn collect_date(&self, date: &str, api_ids: &[String]) -> Result<DateCollection> {
        let date = parse_yyyymmdd(date)?;
        let ids = api_ids
            .iter()
            .map(|id| id.parse::<KrxApiId>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collect_date(self.state, date, &ids).await
    }

    /// 배치 수집
    pub async fn run_batch(&self, opts: KrxBatchOptions) -> Result<KrxBatchSummary> {
        run_krx_batch(self.state, opts).await
    }
}
