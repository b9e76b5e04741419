//! Pagination module
//!
//! Turns a continuation-token endpoint into one lazy stream of items.
//!
//! # Overview
//!
//! SystemLink list and query endpoints return a page of items together with
//! an optional `continuationToken`. [`paginate`] keeps requesting pages,
//! passing the previous token back, until a page comes back without one.
//! Nothing is fetched until the stream is first polled, and each call to
//! [`paginate`] starts a fresh traversal from the first page.

mod stream;
mod types;

pub use stream::{paginate, paginate_json};
pub use types::{ContinuationPage, Page, PageFields};

#[cfg(test)]
mod tests;
