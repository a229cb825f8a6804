//! 진행 상태 조회/초기화 서비스.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use stockfeed_core::{CoreError, NewsSource};
use stockfeed_data::{news_progress_key, KrxProgress, NewsProgress, KRX_PROGRESS_KEY};

use crate::state::CollectorState;
use crate::Result;

/// 진행 상태 대상
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressTarget {
    Krx,
    News(NewsSource),
}

impl ProgressTarget {
    pub const ALL: [ProgressTarget; 3] = [
        Self::Krx,
        Self::News(NewsSource::Naver),
        Self::News(NewsSource::Daum),
    ];

    fn key(&self) -> String {
        match self {
            Self::Krx => KRX_PROGRESS_KEY.to_string(),
            Self::News(source) => news_progress_key(*source),
        }
    }
}

impl fmt::Display for ProgressTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Krx => f.write_str("krx"),
            Self::News(source) => write!(f, "{}", source),
        }
    }
}

impl FromStr for ProgressTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("krx") {
            return Ok(Self::Krx);
        }
        s.parse().map(Self::News)
    }
}

/// 진행 상태 스냅샷
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ProgressSnapshot {
    Krx(KrxProgress),
    News {
        source: NewsSource,
        #[serde(flatten)]
        progress: NewsProgress,
    },
}

pub struct ProgressService<'a> {
    state: &'a CollectorState,
}

impl<'a> ProgressService<'a> {
    pub fn new(state: &'a CollectorState) -> Self {
        Self { state }
    }

    pub async fn inspect(&self, target: ProgressTarget) -> ProgressSnapshot {
        let store = self.state.progress();
        match target {
            ProgressTarget::Krx => ProgressSnapshot::Krx(store.load(&target.key()).await),
            ProgressTarget::News(source) => ProgressSnapshot::News {
                source,
                progress: store.load(&target.key()).await,
            },
        }
    }

    pub async fn inspect_all(&self) -> Vec<ProgressSnapshot> {
        let mut snapshots = Vec::with_capacity(ProgressTarget::ALL.len());
        for target in ProgressTarget::ALL {
            snapshots.push(self.inspect(target).await);
        }
        snapshots
    }

    /// 진행 상태를 삭제합니다. 저장된 데이터 파일은 건드리지 않습니다.
    pub async fn reset(&self, target: ProgressTarget) -> Result<bool> {
        let removed = self.state.progress().reset(&target.key()).await?;
        tracing::info!(target = %target, removed, "진행 상태 초기화");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectorConfig;

    #[test]
    fn test_parse_target() {
        assert_eq!("KRX".parse::<ProgressTarget>(), Ok(ProgressTarget::Krx));
        assert_eq!("kakao".parse::<ProgressTarget>(), Ok(ProgressTarget::News(NewsSource::Daum)));
        assert!("yahoo".parse::<ProgressTarget>().is_err());
    }

    #[tokio::test]
    async fn test_inspect_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let state = CollectorState::new(CollectorConfig::new(dir.path()));
        let service = ProgressService::new(&state);

        let mut record = NewsProgress::default();
        record.completed_keywords.insert("증시".to_string());
        state.progress().save("news_naver", &record).await.unwrap();

        let snapshot = service.inspect(ProgressTarget::News(NewsSource::Naver)).await;
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["target"], "news");
        assert_eq!(json["source"], "naver");
        assert_eq!(json["completed_keywords"][0], "증시");

        assert_eq!(service.inspect_all().await.len(), 3);
        assert!(service.reset(ProgressTarget::News(NewsSource::Naver)).await.unwrap());
        assert!(!service.reset(ProgressTarget::Krx).await.unwrap());
    }
}
