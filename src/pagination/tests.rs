//! Tests for pagination module

use super::*;
use crate::error::{Error, Result};
use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Serves canned pages keyed by the token that requests them and records
/// every token it was asked for.
#[derive(Clone)]
struct FakeEndpoint {
    pages: Arc<Vec<(Option<&'static str>, Page<u32>)>>,
    calls: Arc<Mutex<Vec<Option<String>>>>,
}

impl FakeEndpoint {
    fn new(pages: Vec<(Option<&'static str>, Page<u32>)>) -> Self {
        Self {
            pages: Arc::new(pages),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn fetch(&self, token: Option<String>) -> Result<Page<u32>> {
        self.calls.lock().unwrap().push(token.clone());
        self.pages
            .iter()
            .find(|(key, _)| key.map(str::to_string) == token)
            .map(|(_, page)| page.clone())
            .ok_or_else(|| Error::http_status(404, format!("no page for {token:?}")))
    }

    fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }
}

fn page(items: &[u32], token: Option<&str>) -> Page<u32> {
    Page::new(items.to_vec(), token.map(str::to_string))
}

// ============================================================================
// paginate
// ============================================================================

#[tokio::test]
async fn test_yields_all_pages_in_order() {
    let endpoint = FakeEndpoint::new(vec![
        (None, page(&[1, 2], Some("a"))),
        (Some("a"), page(&[3], Some("b"))),
        (Some("b"), page(&[4, 5, 6], None)),
    ]);

    let items: Vec<u32> = paginate(|token| endpoint.fetch(token))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(
        endpoint.calls(),
        vec![None, Some("a".to_string()), Some("b".to_string())]
    );
}

#[tokio::test]
async fn test_single_page() {
    let endpoint = FakeEndpoint::new(vec![(None, page(&[7], None))]);

    let items: Vec<u32> = paginate(|token| endpoint.fetch(token))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(items, vec![7]);
    assert_eq!(endpoint.calls().len(), 1);
}

#[tokio::test]
async fn test_empty_page_with_token_continues() {
    let endpoint = FakeEndpoint::new(vec![
        (None, page(&[], Some("a"))),
        (Some("a"), page(&[], Some("b"))),
        (Some("b"), page(&[9], None)),
    ]);

    let items: Vec<u32> = paginate(|token| endpoint.fetch(token))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(items, vec![9]);
    assert_eq!(endpoint.calls().len(), 3);
}

#[tokio::test]
async fn test_empty_token_ends_traversal() {
    let endpoint = FakeEndpoint::new(vec![(None, page(&[1], Some("")))]);

    let items: Vec<u32> = paginate(|token| endpoint.fetch(token))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(items, vec![1]);
    assert_eq!(endpoint.calls(), vec![None]);
}

#[tokio::test]
async fn test_nothing_fetched_until_polled() {
    let endpoint = FakeEndpoint::new(vec![(None, page(&[1], None))]);

    let stream = paginate(|token| endpoint.fetch(token));
    assert!(endpoint.calls().is_empty());
    drop(stream);
    assert!(endpoint.calls().is_empty());
}

#[tokio::test]
async fn test_pages_fetched_on_demand() {
    let endpoint = FakeEndpoint::new(vec![
        (None, page(&[1, 2], Some("a"))),
        (Some("a"), page(&[3], None)),
    ]);

    let stream = paginate(|token| endpoint.fetch(token));
    futures::pin_mut!(stream);

    assert_eq!(stream.next().await.unwrap().unwrap(), 1);
    assert_eq!(stream.next().await.unwrap().unwrap(), 2);
    assert_eq!(endpoint.calls().len(), 1);

    assert_eq!(stream.next().await.unwrap().unwrap(), 3);
    assert_eq!(endpoint.calls().len(), 2);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_error_surfaces_at_failing_page() {
    // The token "missing" has no page, so the second fetch fails.
    let endpoint = FakeEndpoint::new(vec![(None, page(&[1, 2], Some("missing")))]);

    let stream = paginate(|token| endpoint.fetch(token));
    futures::pin_mut!(stream);

    assert_eq!(stream.next().await.unwrap().unwrap(), 1);
    assert_eq!(stream.next().await.unwrap().unwrap(), 2);

    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_each_call_restarts_from_first_page() {
    let endpoint = FakeEndpoint::new(vec![
        (None, page(&[1], Some("a"))),
        (Some("a"), page(&[2], None)),
    ]);

    let first = paginate(|token| endpoint.fetch(token));
    futures::pin_mut!(first);
    assert_eq!(first.next().await.unwrap().unwrap(), 1);

    let second: Vec<u32> = paginate(|token| endpoint.fetch(token))
        .try_collect()
        .await
        .unwrap();
    assert_eq!(second, vec![1, 2]);

    assert_eq!(
        endpoint.calls(),
        vec![None, None, Some("a".to_string())]
    );
}

// ============================================================================
// paginate_json / PageFields
// ============================================================================

#[test]
fn test_page_fields_default() {
    let fields = PageFields::default();
    assert_eq!(fields.items, "items");
    assert_eq!(fields.token, "continuationToken");
}

#[test]
fn test_split_custom_fields() {
    let fields = PageFields::new("tables", "continuationToken");
    let page: Page<String> = fields
        .split(json!({"tables": ["a", "b"], "continuationToken": "next", "totalCount": 5}))
        .unwrap();
    assert_eq!(page.items, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(page.continuation_token.as_deref(), Some("next"));
}

#[test]
fn test_split_null_token_is_last_page() {
    let page: Page<u32> = PageFields::default()
        .split(json!({"items": [1], "continuationToken": null}))
        .unwrap();
    assert!(page.continuation_token.is_none());
}

#[test]
fn test_split_missing_items_is_error() {
    let err = PageFields::default()
        .split::<u32>(json!({"continuationToken": "x"}))
        .unwrap_err();
    assert!(err.to_string().contains("missing items field 'items'"));
}

#[test]
fn test_split_wrong_shapes() {
    assert!(PageFields::default()
        .split::<u32>(json!({"items": {}}))
        .is_err());
    assert!(PageFields::default()
        .split::<u32>(json!({"items": [], "continuationToken": 3}))
        .is_err());
    assert!(PageFields::default().split::<u32>(json!([1, 2])).is_err());
}

#[tokio::test]
async fn test_paginate_json() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);

    let fetch = move |token: Option<String>| {
        recorded.lock().unwrap().push(token.clone());
        async move {
            Ok(match token.as_deref() {
                None => json!({"rows": [{"v": 1}], "token": "t1"}),
                Some("t1") => json!({"rows": [], "token": "t2"}),
                _ => json!({"rows": [{"v": 2}]}),
            })
        }
    };

    let rows: Vec<serde_json::Value> = paginate_json(fetch, PageFields::new("rows", "token"))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(rows, vec![json!({"v": 1}), json!({"v": 2})]);
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_paginate_json_missing_items_field() {
    let fetch = |_token: Option<String>| async { Ok(json!({"continuationToken": null})) };

    let result: Result<Vec<u32>> = paginate_json::<u32, _, _>(fetch, PageFields::default())
        .try_collect()
        .await;

    assert!(matches!(result, Err(Error::Decode { .. })));
}
