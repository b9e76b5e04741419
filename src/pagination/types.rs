//! Pagination types and traits

use crate::error::{Error, Result};
use crate::types::OptionStringExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A response page that carries items and a continuation token
pub trait ContinuationPage {
    /// Item type yielded by the paginator
    type Item;

    /// Split the page into its items and the token for the next page
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

/// A plain page of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Token for the next page, absent on the last page
    #[serde(default)]
    pub continuation_token: Option<String>,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(items: Vec<T>, continuation_token: Option<String>) -> Self {
        Self {
            items,
            continuation_token,
        }
    }

    /// Create the last page of a result set
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

impl<T> ContinuationPage for Page<T> {
    type Item = T;

    fn into_parts(self) -> (Vec<T>, Option<String>) {
        (self.items, self.continuation_token)
    }
}

/// Names of the JSON fields holding a page's items and its token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFields {
    /// Field with the item array
    pub items: String,
    /// Field with the continuation token
    pub token: String,
}

impl Default for PageFields {
    fn default() -> Self {
        Self::new("items", "continuationToken")
    }
}

impl PageFields {
    /// Create a field-name pair
    pub fn new(items: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            items: items.into(),
            token: token.into(),
        }
    }

    /// Pull the typed items and the token out of a raw JSON page.
    ///
    /// A missing or non-array items field is an error; a missing, null or
    /// empty token ends the traversal.
    pub fn split<T: DeserializeOwned>(&self, mut page: Value) -> Result<Page<T>> {
        let object = page
            .as_object_mut()
            .ok_or_else(|| Error::decode("page is not a JSON object"))?;

        let items = match object.remove(&self.items) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::decode(format!(
                    "page field '{}' is not an array: {other}",
                    self.items
                )))
            }
            None => {
                return Err(Error::decode(format!(
                    "page is missing items field '{}'",
                    self.items
                )))
            }
        };

        let token = match object.remove(&self.token) {
            Some(Value::String(token)) => token.none_if_empty(),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(Error::decode(format!(
                    "page field '{}' is not a string: {other}",
                    self.token
                )))
            }
        };

        let items = items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()?;

        Ok(Page::new(items, token))
    }
}
