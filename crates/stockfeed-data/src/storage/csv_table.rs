//! CSV 직렬화와 읽기-병합-쓰기 중복 제거.

use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;
use stockfeed_core::KrxRow;

use crate::error::Result;

/// 헤더가 있는 CSV를 타입 레코드로 읽습니다.
pub fn parse_records<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

/// 고정 헤더로 타입 레코드를 씁니다. 행이 없어도 헤더는 씁니다.
pub fn serialize_records<T: Serialize>(headers: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    into_bytes(writer)
}

/// 헤더가 있는 CSV를 컬럼 맵 행으로 읽습니다. 빈 셀도 빈 문자열로 유지합니다.
pub fn parse_rows(bytes: &[u8]) -> Result<Vec<KrxRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: KrxRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// 관측된 모든 컬럼의 합집합(정렬)을 헤더로 써서 행을 직렬화합니다.
pub fn serialize_rows(rows: &[KrxRow]) -> Result<Vec<u8>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let headers: BTreeSet<&str> = rows.iter().flat_map(|r| r.columns()).collect();

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|h| row.get(h).unwrap_or("")))?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| crate::error::DataError::SerializationError(e.to_string()))
}

/// 기존 행과 새 행을 자연 키 기준으로 병합합니다.
///
/// - 기존 행 중 키가 겹치는 것은 먼저 나온 것만 남깁니다.
/// - 새 행은 아직 없는 키만 뒤에 추가합니다.
/// - 키가 없는 행은 저장 대상이 아니므로 버립니다.
///
/// 반환값: (병합 결과, 새로 추가된 행 수)
pub fn merge_dedup<R, K, F>(
    existing: Vec<R>,
    incoming: impl IntoIterator<Item = R>,
    key_fn: F,
) -> (Vec<R>, usize)
where
    K: Eq + Hash,
    F: Fn(&R) -> Option<K>,
{
    let mut seen: HashSet<K> = HashSet::with_capacity(existing.len());
    let mut merged = Vec::with_capacity(existing.len());

    for row in existing {
        if let Some(key) = key_fn(&row) {
            if seen.insert(key) {
                merged.push(row);
            }
        }
    }

    let mut added = 0;
    for row in incoming {
        if let Some(key) = key_fn(&row) {
            if seen.insert(key) {
                merged.push(row);
                added += 1;
            }
        }
    }

    (merged, added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockfeed_core::NewsItem;

    fn news(link: &str) -> NewsItem {
        NewsItem {
            title: format!("title {}", link),
            link: link.to_string(),
            ..Default::default()
        }
    }

    fn link_key(item: &NewsItem) -> Option<String> {
        item.natural_key().map(str::to_string)
    }

    #[test]
    fn test_merge_dedup_counts_only_new_keys() {
        let existing = vec![news("a"), news("b")];
        let incoming = vec![news("b"), news("c"), news("c"), news("")];

        let (merged, added) = merge_dedup(existing, incoming, link_key);

        assert_eq!(added, 1);
        let links: Vec<_> = merged.iter().map(|n| n.link.as_str()).collect();
        assert_eq!(links, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_dedup_repairs_duplicate_existing_rows() {
        let existing = vec![news("a"), news("a"), news("b")];
        let (merged, added) = merge_dedup(existing, Vec::new(), link_key);
        assert_eq!(added, 0);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_news_csv_roundtrip_keeps_columns() {
        let items = vec![NewsItem {
            title: "삼성전자, \"신고가\"".to_string(),
            link: "https://n.news/1".to_string(),
            description: "줄바꿈\n포함".to_string(),
            pub_date: "2024-02-15".to_string(),
            keyword: "코스피".to_string(),
        }];
        let bytes = serialize_records(
            &["title", "link", "description", "pubDate", "keyword"],
            &items,
        )
        .unwrap();

        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("title,link,description,pubDate,keyword\n"));
        assert_eq!(parse_records::<NewsItem>(&bytes).unwrap(), items);
    }

    #[test]
    fn test_serialize_rows_uses_column_union() {
        let mut a = KrxRow::new();
        a.insert("BAS_DD", "20240214");
        a.insert("TDD_CLSPRC", "100");
        let mut b = KrxRow::new();
        b.insert("BAS_DD", "20240215");
        b.insert("MKTCAP", "5000");

        let bytes = serialize_rows(&[a, b]).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(text.lines().next(), Some("BAS_DD,MKTCAP,TDD_CLSPRC"));

        let rows = parse_rows(&bytes).unwrap();
        assert_eq!(rows[0].get("MKTCAP"), Some(""));
        assert_eq!(rows[1].get("MKTCAP"), Some("5000"));
    }

    proptest! {
        #[test]
        fn prop_merge_never_duplicates_keys(
            existing in prop::collection::vec("[a-e]{0,2}", 0..20),
            incoming in prop::collection::vec("[a-e]{0,2}", 0..20),
        ) {
            let existing: Vec<NewsItem> = existing.iter().map(|l| news(l)).collect();
            let incoming: Vec<NewsItem> = incoming.iter().map(|l| news(l)).collect();
            let incoming_keys: HashSet<String> = incoming.iter().filter_map(link_key).collect();
            let existing_keys: HashSet<String> = existing.iter().filter_map(link_key).collect();

            let (merged, added) = merge_dedup(existing, incoming, link_key);

            let keys: Vec<String> = merged.iter().filter_map(link_key).collect();
            let unique: HashSet<&String> = keys.iter().collect();
            prop_assert_eq!(keys.len(), merged.len());
            prop_assert_eq!(unique.len(), keys.len());
            prop_assert_eq!(added, incoming_keys.difference(&existing_keys).count());
        }
    }
}
