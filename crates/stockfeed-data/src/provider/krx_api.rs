//! KRX OPEN API 클라이언트.
//!
//! 한국거래소 OPEN API에서 기준일(`basDd`) 단위 전종목 데이터를 가져옵니다.
//!
//! # 지원 API
//!
//! | API ID | 서비스 | 내용 |
//! |--------|--------|------|
//! | `kospi_daily` | `stk_bydd_trd` | 유가증권 일별 매매정보 |
//! | `kosdaq_daily` | `ksq_bydd_trd` | 코스닥 일별 매매정보 |
//! | `kospi_basic` | `stk_isu_base_info` | 유가증권 종목 기본정보 |
//! | `kosdaq_basic` | `ksq_isu_base_info` | 코스닥 종목 기본정보 |
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use secrecy::SecretString;
//! use stockfeed_data::provider::{KrxApiClient, KrxFetcher};
//!
//! let client = KrxApiClient::new(
//!     SecretString::from("YOUR_AUTH_KEY"),
//!     "https://data-dbg.krx.co.kr",
//!     Duration::from_secs(30),
//! )?;
//! let outcome = client.fetch(KrxApiId::KospiDaily, date).await;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use stockfeed_core::calendar::format_yyyymmdd;
use stockfeed_core::{FetchOutcome, KrxApiId, KrxRow, RateLimitRule};

use super::KrxFetcher;
use crate::error::Result;

/// 에러 메시지에 포함할 응답 본문 길이
const BODY_SNIPPET_CHARS: usize = 300;

/// KRX OPEN API 기본 URL
pub const DEFAULT_KRX_BASE_URL: &str = "https://data-dbg.krx.co.kr";

/// KRX OPEN API 클라이언트.
#[derive(Clone)]
pub struct KrxApiClient {
    client: reqwest::Client,
    auth_key: SecretString,
    base_url: String,
}

/// API 응답 래퍼.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "OutBlock_1")]
    out_block: Option<Vec<serde_json::Map<String, serde_json::Value>>>,
    #[serde(rename = "respMsg", default)]
    resp_msg: Option<String>,
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

impl KrxApiClient {
    /// 새로운 KRX API 클라이언트 생성.
    ///
    /// # Arguments
    /// * `auth_key` - KRX OPEN API 인증키
    /// * `base_url` - API 기본 URL (테스트에서는 mock 서버)
    /// * `timeout` - 요청 타임아웃
    pub fn new(auth_key: SecretString, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            auth_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// API ID의 요청 URL.
    pub fn endpoint_url(&self, api_id: KrxApiId) -> String {
        endpoint_url(&self.base_url, api_id)
    }
}

/// `base_url` 기준 API ID의 요청 URL.
pub fn endpoint_url(base_url: &str, api_id: KrxApiId) -> String {
    format!(
        "{}/svc/apis/sto/{}",
        base_url.trim_end_matches('/'),
        api_id.service_id()
    )
}

#[async_trait]
impl KrxFetcher for KrxApiClient {
    async fn fetch(&self, api_id: KrxApiId, date: NaiveDate) -> FetchOutcome<KrxRow> {
        let rule = RateLimitRule::KRX;
        let url = self.endpoint_url(api_id);
        let bas_dd = format_yyyymmdd(date);

        tracing::debug!(api_id = %api_id, bas_dd = %bas_dd, url = %url, "KRX API 요청");

        let response = match self
            .client
            .get(&url)
            .query(&[("basDd", bas_dd.as_str())])
            // AUTH_KEY는 HTTP 헤더로 전달
            .header("AUTH_KEY", self.auth_key.expose_secret())
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return rule.classify(
                    e.status().map(|s| s.as_u16()),
                    format!("KRX API 호출 실패 [{}]: {}", api_id, e),
                    Vec::new(),
                )
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return rule.classify(
                    Some(status.as_u16()),
                    format!("KRX API 응답 읽기 실패 [{}]: {}", api_id, e),
                    Vec::new(),
                )
            }
        };

        if !status.is_success() {
            return rule.classify_response(
                status.as_u16(),
                &format!("KRX API 오류 [{}]: HTTP {}", api_id, status.as_u16()),
                &snippet(&body),
                Vec::new(),
            );
        }

        let parsed: ApiResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return FetchOutcome::HardError(format!(
                    "KRX API 응답 파싱 실패 [{}]: {} - {}",
                    api_id,
                    e,
                    snippet(&body)
                ))
            }
        };

        match parsed.out_block {
            Some(block) => {
                let rows: Vec<KrxRow> = block.iter().map(KrxRow::from_json).collect();
                tracing::debug!(api_id = %api_id, bas_dd = %bas_dd, count = rows.len(), "KRX API 응답");
                FetchOutcome::from_rows(rows)
            }
            None => {
                // OutBlock_1이 없으면 오류 메시지 응답 (한도 초과 포함)
                match parsed.resp_msg {
                    Some(message) => rule.classify(
                        Some(status.as_u16()),
                        format!("KRX API 응답에 OutBlock_1 없음 [{}]: {}", api_id, message),
                        Vec::new(),
                    ),
                    None => FetchOutcome::HardError(format!(
                        "KRX API 응답에 OutBlock_1 없음 [{}]: {}",
                        api_id,
                        snippet(&body)
                    )),
                }
            }
        }
    }
}
