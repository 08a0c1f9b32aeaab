//! Rate-limited paginated fetcher.
//!
//! Drains every page of a list/describe operation into an [`EntityIndex`]
//! keyed by the entity's natural identifier.

use super::error::Result;
use super::scope::CallScope;
use std::collections::BTreeMap;
use std::future::Future;

/// Read-only map from natural ID to entity, built once per fetch.
pub type EntityIndex<T> = BTreeMap<String, T>;

/// One page of a paginated response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Entities that carry a natural identifier.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

/// Fetch all pages into an index. `next_page` receives the continuation token
/// (`None` for the first page). Items repeating an ID across pages keep the
/// latest copy. On error nothing is returned.
pub async fn fetch_index<T, F, Fut>(scope: &CallScope, what: &str, mut next_page: F) -> Result<EntityIndex<T>>
where
    T: Keyed,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut index = EntityIndex::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let page = scope.call(next_page(token.take())).await?;
        pages += 1;
        trace_trace!(
            "{} page {} in {}: {} item(s)",
            what,
            pages,
            scope.region(),
            page.items.len()
        );
        for item in page.items {
            index.insert(item.key().to_string(), item);
        }
        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }
    log_debug!(
        "fetched {} {} in {} over {} page(s)",
        index.len(),
        what,
        scope.region(),
        pages
    );
    Ok(index)
}

/// Drain all pages of a non-keyed listing, preserving order.
pub async fn fetch_all<T, F, Fut>(scope: &CallScope, what: &str, mut next_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = scope.call(next_page(token.take())).await?;
        items.extend(page.items);
        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }
    trace_debug!("fetched {} {} in {}", items.len(), what, scope.region());
    Ok(items)
}
