//! Lazy continuation-token traversal

use super::types::{ContinuationPage, PageFields};
use crate::error::{Error, Result};
use crate::types::OptionStringExt;
use futures::stream::{self, Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// Where the traversal stands between polls
enum Cursor {
    First,
    Next(String),
    Done,
}

/// Stream every item of a paginated result set.
///
/// `fetch` is called with `None` for the first page and with the previous
/// page's token afterwards. Pages with no items but a token are followed.
/// A fetch error is yielded at the point the page would have been read and
/// ends the stream.
pub fn paginate<P, F, Fut>(fetch: F) -> impl Stream<Item = Result<P::Item>>
where
    P: ContinuationPage,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<P>>,
{
    stream::try_unfold(
        (fetch, Cursor::First, 0usize),
        |(mut fetch, cursor, pages)| async move {
            let token = match cursor {
                Cursor::First => None,
                Cursor::Next(token) => Some(token),
                Cursor::Done => return Ok(None),
            };

            let (items, next) = fetch(token).await?.into_parts();
            let pages = pages + 1;
            debug!("Fetched page {} with {} items", pages, items.len());

            let cursor = match next.none_if_empty() {
                Some(token) => Cursor::Next(token),
                None => Cursor::Done,
            };

            let items = stream::iter(items.into_iter().map(Ok::<_, Error>));
            Ok::<_, Error>(Some((items, (fetch, cursor, pages))))
        },
    )
    .try_flatten()
}

/// Stream every item of a paginated result set returned as raw JSON.
///
/// `fields` names the attributes holding the items and the token.
pub fn paginate_json<T, F, Fut>(
    mut fetch: F,
    fields: PageFields,
) -> impl Stream<Item = Result<T>>
where
    T: DeserializeOwned,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    paginate(move |token| {
        let page = fetch(token);
        let fields = fields.clone();
        async move { fields.split::<T>(page.await?) }
    })
}
