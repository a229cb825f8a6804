//! 수집 키워드 목록.
//!
//! `news/crawl_keywords.json` (`{"keywords": [...]}`)에서 읽습니다.
//! 파일이 없거나 읽을 수 없거나 비어 있으면 기본 목록을 씁니다.

use std::path::Path;

use serde::Deserialize;

/// 기본 수집 키워드
pub const DEFAULT_KEYWORDS: [&str; 7] = ["주식", "코스피", "코스닥", "증시", "투자", "금융", "경제"];

#[derive(Debug, Deserialize)]
struct KeywordFile {
    #[serde(default)]
    keywords: Vec<String>,
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// 키워드 목록을 읽습니다. 공백 키워드와 중복은 제거합니다 (처음 순서 유지).
pub async fn load_keywords(path: &Path) -> Vec<String> {
    let parsed = match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<KeywordFile>(&bytes) {
            Ok(file) => file.keywords,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "키워드 파일 파싱 실패, 기본 목록 사용");
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    };

    let mut keywords: Vec<String> = Vec::with_capacity(parsed.len());
    for keyword in parsed {
        let keyword = keyword.trim().to_string();
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }

    if keywords.is_empty() {
        default_keywords()
    } else {
        keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_or_empty_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl_keywords.json");
        assert_eq!(load_keywords(&path).await, default_keywords());

        tokio::fs::write(&path, r#"{"keywords": []}"#).await.unwrap();
        assert_eq!(load_keywords(&path).await, default_keywords());

        tokio::fs::write(&path, "not json").await.unwrap();
        assert_eq!(load_keywords(&path).await, default_keywords());
    }

    #[tokio::test]
    async fn test_file_keywords_are_trimmed_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl_keywords.json");
        tokio::fs::write(&path, r#"{"keywords": ["삼성전자", " 코스피 ", "", "삼성전자"]}"#)
            .await
            .unwrap();

        assert_eq!(load_keywords(&path).await, vec!["삼성전자", "코스피"]);
    }
}
