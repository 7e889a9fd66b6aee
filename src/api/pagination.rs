//! Page-numbered collection fetching
//!
//! Accounts and per-account transactions use the same scheme: `GET <endpoint>?page=N`
//! returns `{ "<items_field>": [...], "link": { "next": ... } }`, and the collection
//! ends at the first page without a next link.
//!
//! A failed request or malformed page ends the loop as [`PageOutcome::Failed`],
//! never as "no more data".

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{AccessToken, BankClient};
use crate::core::{ApiError, PaginationError};

/// A paginated collection on the bank API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResource {
    /// Path segments under the base URL
    segments: Vec<String>,
    /// Response field holding the page's item array
    items_field: &'static str,
    /// Label used in logs and errors
    label: String,
}

impl PagedResource {
    pub fn new(segments: Vec<String>, items_field: &'static str, label: impl Into<String>) -> Self {
        Self {
            segments,
            items_field,
            label: label.into(),
        }
    }

    /// `GET /accounts`, items under `account`
    pub fn accounts() -> Self {
        Self::new(vec!["accounts".to_string()], "account", "accounts")
    }

    /// `GET /accounts/{acc_number}/transactions`, items under `transactions`
    pub fn transactions(acc_number: &str) -> Self {
        Self::new(
            vec![
                "accounts".to_string(),
                acc_number.to_string(),
                "transactions".to_string(),
            ],
            "transactions",
            format!("transactions for account {}", acc_number),
        )
    }

    pub fn items_field(&self) -> &'static str {
        self.items_field
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// How a pagination loop ended
#[derive(Debug)]
pub enum PageOutcome {
    /// The last page had no next link
    Done,
    /// A page request failed or returned something unreadable
    Failed(PaginationError),
}

/// Items gathered by a pagination loop, plus how it ended
#[derive(Debug)]
pub struct Paginated<T> {
    /// Items from every successful page, in server order
    pub items: Vec<T>,
    /// Number of pages successfully fetched
    pub pages: u32,
    pub outcome: PageOutcome,
}

impl<T> Paginated<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, PageOutcome::Done)
    }

    /// Drop the partial items on failure
    pub fn into_result(self) -> Result<Vec<T>, PaginationError> {
        match self.outcome {
            PageOutcome::Done => Ok(self.items),
            PageOutcome::Failed(e) => Err(e),
        }
    }
}

/// Fetch every page of `resource`, stopping at the first failure
pub async fn fetch_all_pages<T: DeserializeOwned>(
    client: &BankClient,
    resource: &PagedResource,
    token: &AccessToken,
) -> Result<Vec<T>, PaginationError> {
    collect_pages(client, resource, token).await.into_result()
}

/// Fetch pages 1, 2, ... of `resource` one after another until a page has no next link.
///
/// Always issues at least one request. On failure the items from earlier pages are kept.
pub async fn collect_pages<T: DeserializeOwned>(
    client: &BankClient,
    resource: &PagedResource,
    token: &AccessToken,
) -> Paginated<T> {
    let url = client.endpoint(&resource.segments);
    let mut items: Vec<T> = Vec::new();
    let mut page: u32 = 1;

    loop {
        match fetch_page::<T>(client, &url, resource.items_field, page, token).await {
            Ok((mut batch, has_next)) => {
                tracing::debug!(
                    resource = %resource.label,
                    page,
                    items = batch.len(),
                    has_next,
                    "Fetched page"
                );
                items.append(&mut batch);

                if !has_next {
                    return Paginated {
                        items,
                        pages: page,
                        outcome: PageOutcome::Done,
                    };
                }
                page += 1;
            }
            Err(source) => {
                tracing::debug!("Fetching {} failed on page {}: {}", resource.label, page, source);
                let error = PaginationError {
                    resource: resource.label.clone(),
                    page,
                    fetched: items.len(),
                    source,
                };
                return Paginated {
                    items,
                    pages: page - 1,
                    outcome: PageOutcome::Failed(error),
                };
            }
        }
    }
}

async fn fetch_page<T: DeserializeOwned>(
    client: &BankClient,
    url: &url::Url,
    items_field: &str,
    page: u32,
    token: &AccessToken,
) -> Result<(Vec<T>, bool), ApiError> {
    let request = client
        .get(url.clone())
        .query(&[("page", page)])
        .header("Authorization", token.bearer())
        .header("Accept", "application/json");

    let response = client.send(request).await?;
    let body: Value = response.json().await?;

    parse_page(body, items_field)
}

/// Split a page body into its decoded items and whether a next page exists
pub fn parse_page<T: DeserializeOwned>(mut body: Value, items_field: &str) -> Result<(Vec<T>, bool), ApiError> {
    let raw_items = match body.get_mut(items_field).map(Value::take) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ApiError::Malformed(format!(
                "field `{}` is not an array (got {})",
                items_field,
                json_kind(&other)
            )))
        }
        None => {
            return Err(ApiError::Malformed(format!(
                "missing field `{}`",
                items_field
            )))
        }
    };

    let items = raw_items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| {
                ApiError::Malformed(format!("invalid item {} in `{}`: {}", i, items_field, e))
            })
        })
        .collect::<Result<Vec<T>, ApiError>>()?;

    Ok((items, has_next_page(&body)))
}

/// True unless `link` or `link.next` is absent, null, false, zero or empty
pub fn has_next_page(body: &Value) -> bool {
    match body.get("link").and_then(|link| link.get("next")) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
