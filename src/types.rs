//! Types shared by the HTTP layer and the service clients

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form string properties attached to tables and columns
pub type Properties = HashMap<String, String>;

/// How the delay grows between retries of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// The initial delay every time
    Constant,
    /// The initial delay times the attempt number
    Linear,
    /// The initial delay doubled on each attempt
    #[default]
    Exponential,
}

/// Treats an empty string as absent, the way the service treats an empty
/// continuation token or an unset environment variable
pub trait OptionStringExt {
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
