//! Bank API data models and the report built from them

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// An account as returned by `GET /accounts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account number; servers send it either as a string or a number
    #[serde(deserialize_with = "string_or_number")]
    pub acc_number: String,

    /// Current balance, exactly as the server sent it
    pub amount: Number,

    /// Any other fields the server sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A transaction as returned by `GET /accounts/{acc_number}/transactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub label: String,
    pub amount: Number,
    pub currency: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Transaction projected down to the fields the report shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionLine {
    pub label: String,
    pub amount: Number,
    pub currency: String,
}

impl From<&Transaction> for TransactionLine {
    fn from(tx: &Transaction) -> Self {
        Self {
            label: tx.label.clone(),
            amount: tx.amount.clone(),
            currency: tx.currency.clone(),
        }
    }
}

/// One report entry per account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountReport {
    pub acc_number: String,
    pub amount: Number,
    pub transactions: Vec<TransactionLine>,

    /// Set when the transaction fetch failed and the entry only holds
    /// the transactions collected before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AccountReport {
    pub fn new(account: &Account, transactions: Vec<TransactionLine>) -> Self {
        Self {
            acc_number: account.acc_number.clone(),
            amount: account.amount.clone(),
            transactions,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// The consolidated report, in the order the server returned the accounts.
///
/// Built once by the assembler and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<AccountReport>,
}

impl Report {
    pub fn new(entries: Vec<AccountReport>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AccountReport] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no entry carries a transaction fetch error
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.error.is_none())
    }

    /// Account numbers whose transactions could not be fully fetched
    pub fn failed_accounts(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.error.is_some())
            .map(|e| e.acc_number.clone())
            .collect()
    }
}

/// Two-decimal display of an amount. Integers are printed from their exact
/// value rather than through `f64`.
pub fn amount_text(amount: &Number) -> String {
    if let Some(i) = amount.as_i64() {
        format!("{}.00", i)
    } else if let Some(u) = amount.as_u64() {
        format!("{}.00", u)
    } else {
        format!("{:.2}", amount.as_f64().unwrap_or_default())
    }
}

pub fn is_negative(amount: &Number) -> bool {
    amount.as_f64().is_some_and(|v| v < 0.0)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
