//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 시도 횟수 (작업 단위)
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수 (다음 실행에서 재시도)
    pub errors: usize,
    /// 건너뛴 횟수 (이미 완료된 단위)
    pub skipped: usize,
    /// 빈 데이터 (조회 성공, 데이터 없음)
    pub empty: usize,
    /// 호출 한도로 중단된 횟수
    pub rate_limited: usize,
    /// 새로 저장된 행/기사 수
    pub saved: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%). 건너뛴 단위는 제외합니다.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.total.saturating_sub(self.skipped);
        if attempted == 0 {
            0.0
        } else {
            ((self.success + self.empty) as f64 / attempted as f64) * 100.0
        }
    }

    /// 재시도가 필요한 단위가 남았는지
    pub fn has_leftovers(&self) -> bool {
        self.errors > 0 || self.rate_limited > 0
    }

    /// 통계 요약 로그. 남은 단위가 있으면 warn 레벨로 남깁니다.
    pub fn log_summary(&self, operation: &str) {
        let rate = format!("{:.1}%", self.success_rate());
        let elapsed = format!("{:.1}s", self.elapsed.as_secs_f64());
        if self.has_leftovers() {
            tracing::warn!(
                operation,
                total = self.total,
                success = self.success,
                errors = self.errors,
                rate_limited = self.rate_limited,
                saved = self.saved,
                success_rate = %rate,
                elapsed = %elapsed,
                "수집 종료 (남은 작업 있음)"
            );
        } else {
            tracing::info!(
                operation,
                total = self.total,
                success = self.success,
                skipped = self.skipped,
                empty = self.empty,
                saved = self.saved,
                success_rate = %rate,
                elapsed = %elapsed,
                "수집 완료"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate_ignores_skipped() {
        let stats = CollectionStats {
            total: 10,
            skipped: 6,
            success: 2,
            empty: 1,
            errors: 1,
            ..Default::default()
        };
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(CollectionStats::new().success_rate(), 0.0);
        assert!(stats.has_leftovers());
        assert!(!CollectionStats::new().has_leftovers());
    }
}
