//! tracing 기반 로깅 초기화.
//!
//! 수집기는 대부분 터미널이나 cron 로그에서 읽히므로 기본값은 `compact`이고,
//! 로그 수집기에 넘길 때는 `json`을 사용합니다.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// HTTP 스택의 연결 단위 로그는 수집 로그를 덮어버리므로 기본으로 낮춥니다.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 여러 줄로 펼친 개발용 형식
    Pretty,
    /// 로그 집계용 JSON (한 줄에 이벤트 하나)
    Json,
    #[default]
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("Unknown log format: {} (pretty, json, compact)", other)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// EnvFilter 지시문 (예: "info", "stockfeed_collector=debug")
    pub level: String,
    pub format: LogFormat,
    /// 파일명/줄 번호 출력 여부
    pub with_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_file: false,
        }
    }
}

impl LogConfig {
    /// `RUST_LOG`, `LOG_FORMAT` 환경변수에서 읽습니다. 잘못된 형식은 기본값.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: std::env::var("RUST_LOG").unwrap_or(defaults.level),
            format: std::env::var("LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.format),
            with_file: false,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// 최종 필터 지시문. 사용자가 직접 지정한 대상은 기본 억제보다 우선합니다.
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.level.trim().to_string()];
        for quiet in QUIET_DEPENDENCIES {
            let target = quiet.split('=').next().unwrap_or_default();
            let overridden = self
                .level
                .split(',')
                .any(|d| d.trim().starts_with(&format!("{}=", target)));
            if !overridden {
                directives.push(quiet.to_string());
            }
        }
        directives.join(",")
    }
}

/// 전역 subscriber를 설치합니다. 이미 설치되어 있으면 에러입니다.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_new(config.filter_directives())?;

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;

    tracing::debug!(format = ?config.format, filter = %config.filter_directives(), "로깅 초기화 완료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Compact ".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_filter_directives_quiet_http_stack_unless_overridden() {
        let config = LogConfig::default().with_level("debug");
        let directives = config.filter_directives();
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("reqwest=warn"));

        let config = LogConfig::default().with_level("info,reqwest=trace");
        let directives = config.filter_directives();
        assert!(directives.contains("reqwest=trace"));
        assert!(!directives.contains("reqwest=warn"));
        assert!(directives.contains("hyper=warn"));
    }
}
