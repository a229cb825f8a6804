//! 환경변수 기반 설정 모듈.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::SecretString;
use stockfeed_core::calendar::parse_yyyymmdd;
use stockfeed_data::provider::krx_api::DEFAULT_KRX_BASE_URL;
use stockfeed_data::provider::news_api::DEFAULT_MIN_PUB_DATE;

use crate::error::CollectorError;
use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터 루트 디렉토리
    pub data_dir: PathBuf,
    /// KRX 배치 수집 설정
    pub krx: KrxConfig,
    /// 뉴스 키워드 수집 설정
    pub news: NewsConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// KRX 배치 수집 설정
#[derive(Debug, Clone)]
pub struct KrxConfig {
    /// KRX OPEN API 인증키
    pub api_key: Option<SecretString>,
    /// API 기본 URL
    pub base_url: String,
    /// API 요청 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 배치 수집 시작일
    pub start_date: NaiveDate,
    /// 일별 매매정보 시가총액 하한 (원)
    pub market_cap_threshold: Decimal,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

/// 뉴스 키워드 수집 설정
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub naver_client_id: Option<SecretString>,
    pub naver_client_secret: Option<SecretString>,
    pub kakao_rest_api_key: Option<SecretString>,
    /// 동시에 수집할 키워드 수
    pub workers: usize,
    /// 이만큼 기사가 모이면 저장 + 진행 상태 기록
    pub checkpoint_every: usize,
    /// 페이지 간 딜레이 (밀리초)
    pub page_delay_ms: u64,
    /// 최소 게시일 (YYYY-MM-DD)
    pub min_pub_date: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl Default for KrxConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_KRX_BASE_URL.to_string(),
            request_delay_ms: 500,
            start_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
            market_cap_threshold: Decimal::from(1_000_000_000_000i64),
            timeout_secs: 30,
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            naver_client_id: None,
            naver_client_secret: None,
            kakao_rest_api_key: None,
            workers: 6,
            checkpoint_every: 100,
            page_delay_ms: 100,
            min_pub_date: DEFAULT_MIN_PUB_DATE.to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { interval_minutes: 60 }
    }
}

impl CollectorConfig {
    /// 기본 설정 (자격증명 없음). 테스트와 오프라인 명령에서 사용합니다.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            krx: KrxConfig::default(),
            news: NewsConfig::default(),
            daemon: DaemonConfig::default(),
        }
    }

    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let krx_defaults = KrxConfig::default();
        let news_defaults = NewsConfig::default();

        let start_date = match env_var_any(&["KRX_START_DATE"]) {
            Some(raw) => parse_yyyymmdd(&raw).map_err(|e| {
                CollectorError::Config(format!("KRX_START_DATE 형식 오류: {}", e))
            })?,
            None => krx_defaults.start_date,
        };

        Ok(Self {
            data_dir: env_var_any(&["DATA_DIR"])
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            krx: KrxConfig {
                api_key: env_secret(&["KRX_API_KEY", "KRX_OPENAPI_KEY"]),
                base_url: env_var_any(&["KRX_API_BASE_URL", "KRX_OPENAPI_BASE_URL"])
                    .unwrap_or(krx_defaults.base_url),
                request_delay_ms: env_var_parse("KRX_REQUEST_DELAY_MS", krx_defaults.request_delay_ms),
                start_date,
                market_cap_threshold: env_var_parse(
                    "KRX_MARKET_CAP_THRESHOLD",
                    krx_defaults.market_cap_threshold,
                ),
                timeout_secs: env_var_parse("KRX_TIMEOUT_SECS", krx_defaults.timeout_secs),
            },
            news: NewsConfig {
                naver_client_id: env_secret(&["NAVER_CLIENT_ID"]),
                naver_client_secret: env_secret(&["NAVER_CLIENT_SECRET"]),
                kakao_rest_api_key: env_secret(&["KAKAO_REST_API_KEY"]),
                workers: env_var_parse("NEWS_WORKERS", news_defaults.workers).max(1),
                checkpoint_every: env_var_parse("NEWS_CHECKPOINT_EVERY", news_defaults.checkpoint_every)
                    .max(1),
                page_delay_ms: env_var_parse("NEWS_PAGE_DELAY_MS", news_defaults.page_delay_ms),
                min_pub_date: env_var_any(&["NEWS_MIN_PUB_DATE"]).unwrap_or(news_defaults.min_pub_date),
                timeout_secs: env_var_parse("NEWS_TIMEOUT_SECS", news_defaults.timeout_secs),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 60),
            },
        })
    }

    /// 뉴스 디렉토리 (`<data_dir>/news`)
    pub fn news_dir(&self) -> PathBuf {
        self.data_dir.join("news")
    }
}

impl KrxConfig {
    /// API 요청 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NewsConfig {
    /// 페이지 간 딜레이를 Duration으로 반환
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DaemonConfig {
    /// 워크플로우 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 후보 키 중 처음으로 비어 있지 않은 값
fn env_var_any(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn env_secret(keys: &[&str]) -> Option<SecretString> {
    env_var_any(keys).map(SecretString::from)
}
