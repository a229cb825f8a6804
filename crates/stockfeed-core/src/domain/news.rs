//! 뉴스 기사 레코드.

use serde::{Deserialize, Serialize};

/// 통합 뉴스 파일(`news_merged.csv`)의 한 행.
///
/// 필드 순서가 곧 CSV 컬럼 순서입니다: `title, link, description, pubDate, keyword`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    /// 게시일 (YYYY-MM-DD)
    #[serde(rename = "pubDate", default)]
    pub pub_date: String,
    /// 이 기사를 수집한 검색 키워드
    #[serde(default)]
    pub keyword: String,
}

impl NewsItem {
    /// 중복 제거 기준 키 (앞뒤 공백 제거한 링크). 링크가 없으면 저장하지 않습니다.
    pub fn natural_key(&self) -> Option<&str> {
        let link = self.link.trim();
        (!link.is_empty()).then_some(link)
    }

    /// 키워드가 비어 있을 때만 채웁니다.
    pub fn with_keyword(mut self, keyword: &str) -> Self {
        if self.keyword.trim().is_empty() {
            self.keyword = keyword.to_string();
        }
        self
    }

    /// 제목/본문 요약에 검색어가 포함되는지 (대소문자 무시).
    pub fn matches_query(&self, query_lower: &str) -> bool {
        query_lower.is_empty()
            || self.title.to_lowercase().contains(query_lower)
            || self.description.to_lowercase().contains(query_lower)
    }

    /// 게시일이 `min_date`(YYYY-MM-DD) 이상인지. 날짜가 없거나 형식이 다르면 false.
    pub fn is_on_or_after(&self, min_date: &str) -> bool {
        self.pub_date.len() >= 10 && self.pub_date.as_str() >= min_date
    }
}
