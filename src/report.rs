//! Report generation
//!
//! Authenticates once, fetches the account list, then fetches each account's
//! transactions and projects everything into a [`Report`]. Transaction fetches
//! may run a few accounts at a time; the report keeps the server's account order.

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::api::{
    collect_pages, exchange_credentials_for_refresh_token, exchange_refresh_token_for_access_token,
    fetch_all_pages, AccessToken, BankClient, PageOutcome, PagedResource,
};
use crate::config::{Config, TransactionErrorPolicy};
use crate::core::{Account, AccountReport, Report, ReportError, Transaction, TransactionLine};

/// Knobs for the assembly step
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// Maximum number of accounts whose transactions are fetched at once
    pub concurrency: usize,
    pub on_transaction_error: TransactionErrorPolicy,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            on_transaction_error: TransactionErrorPolicy::Abort,
        }
    }
}

impl From<&Config> for ReportOptions {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency,
            on_transaction_error: config.on_transaction_error,
        }
    }
}

/// An authenticated connection to the bank API
pub struct Session {
    pub client: BankClient,
    pub token: AccessToken,
}

impl Session {
    /// Run the login and token exchange
    pub async fn open(config: &Config) -> Result<Self, ReportError> {
        let client = BankClient::new(config.credentials.host.clone(), config.request_timeout)
            .map_err(ReportError::Client)?;

        tracing::info!("Logging in to {}", client.base_url());
        let refresh_token =
            exchange_credentials_for_refresh_token(&client, &config.credentials).await?;

        tracing::info!("Exchanging refresh token for an access token");
        let token = exchange_refresh_token_for_access_token(&client, &refresh_token).await?;

        Ok(Self { client, token })
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, ReportError> {
        tracing::info!("Fetching accounts");
        let accounts = fetch_all_pages(&self.client, &PagedResource::accounts(), &self.token)
            .await
            .map_err(ReportError::Accounts)?;
        tracing::info!("Fetched {} account(s)", accounts.len());
        Ok(accounts)
    }
}

/// Full pipeline: login, token exchange, accounts, transactions
pub async fn generate(config: &Config) -> Result<Report, ReportError> {
    let session = Session::open(config).await?;
    let accounts = session.accounts().await?;
    assemble(&session.client, &session.token, &accounts, &ReportOptions::from(config)).await
}

/// Fetch transactions for every account and build the report in account order
pub async fn assemble(
    client: &BankClient,
    token: &AccessToken,
    accounts: &[Account],
    options: &ReportOptions,
) -> Result<Report, ReportError> {
    let concurrency = options.concurrency.max(1);
    let policy = options.on_transaction_error;

    tracing::info!(
        "Fetching transactions for {} account(s), {} at a time",
        accounts.len(),
        concurrency
    );

    let entries = stream::iter(accounts)
        .map(|account| account_entry(client, token, account, policy))
        .buffered(concurrency)
        .try_collect::<Vec<_>>()
        .await?;

    Ok(Report::new(entries))
}

async fn account_entry(
    client: &BankClient,
    token: &AccessToken,
    account: &Account,
    policy: TransactionErrorPolicy,
) -> Result<AccountReport, ReportError> {
    let resource = PagedResource::transactions(&account.acc_number);
    let fetched = collect_pages::<Transaction>(client, &resource, token).await;
    let lines: Vec<TransactionLine> = fetched.items.iter().map(TransactionLine::from).collect();

    match fetched.outcome {
        PageOutcome::Done => Ok(AccountReport::new(account, lines)),
        PageOutcome::Failed(source) => match policy {
            TransactionErrorPolicy::Abort => Err(ReportError::Transactions {
                acc_number: account.acc_number.clone(),
                source,
            }),
            TransactionErrorPolicy::Partial => {
                tracing::warn!(
                    "Keeping {} transaction(s) for account {} after error: {}",
                    lines.len(),
                    account.acc_number,
                    source
                );
                Ok(AccountReport::new(account, lines).with_error(source.to_string()))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CredentialInputs, Credentials, Settings};
    use crate::core::{ApiError, AuthStage};
    use crate::test_support::{MockBank, MockBankBuilder};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn config(bank: &MockBank, settings: Settings) -> Config {
        let credentials = Credentials::from_inputs(CredentialInputs {
            host: Some(bank.url().to_string()),
            login: Some("alice".to_string()),
            password: Some("pw".to_string()),
            client_id: Some("id1".to_string()),
            secret: Some("sec1".to_string()),
        })
        .unwrap();
        Config::new(credentials, &settings).unwrap()
    }

    fn tx(label: &str, amount: f64) -> Value {
        json!({"label": label, "amount": amount, "currency": "EUR", "id": label, "booked": true})
    }

    fn two_accounts() -> MockBankBuilder {
        MockBank::builder()
            .with_auth()
            .page(
                "/accounts",
                1,
                json!({"account": [{"acc_number": "B", "amount": 20.0}], "link": {"next": "/accounts?page=2"}}),
            )
            .page(
                "/accounts",
                2,
                json!({"account": [{"acc_number": "A", "amount": 10.0}], "link": {"next": null}}),
            )
    }

    #[tokio::test]
    async fn test_generate_full_report() {
        let bank = two_accounts()
            .page(
                "/accounts/B/transactions",
                1,
                json!({"transactions": [tx("rent", -800.0)], "link": {"next": true}}),
            )
            .page(
                "/accounts/B/transactions",
                2,
                json!({"transactions": [tx("salary", 2500.0)]}),
            )
            .page("/accounts/A/transactions", 1, json!({"transactions": []}))
            .start()
            .await;

        let report = generate(&config(&bank, Settings::default())).await.unwrap();

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!([
                {
                    "acc_number": "B",
                    "amount": 20.0,
                    "transactions": [
                        {"label": "rent", "amount": -800.0, "currency": "EUR"},
                        {"label": "salary", "amount": 2500.0, "currency": "EUR"}
                    ]
                },
                {"acc_number": "A", "amount": 10.0, "transactions": []}
            ])
        );
        assert!(report.is_complete());

        assert_eq!(
            bank.request_log(),
            vec![
                "POST /login",
                "POST /token",
                "GET /accounts?page=1",
                "GET /accounts?page=2",
                "GET /accounts/B/transactions?page=1",
                "GET /accounts/B/transactions?page=2",
                "GET /accounts/A/transactions?page=1",
            ]
        );
        for r in bank.requests().iter().filter(|r| r.method == Method::GET) {
            assert_eq!(r.authorization.as_deref(), Some("Bearer at-1"));
        }
    }

    #[tokio::test]
    async fn test_account_order_preserved_with_concurrency() {
        let mut builder = MockBank::builder().with_auth();
        let numbers = ["Z", "M", "A", "Q", "B"];
        let accounts: Vec<Value> = numbers
            .iter()
            .map(|n| json!({"acc_number": n, "amount": 1.0}))
            .collect();
        builder = builder.page("/accounts", 1, json!({"account": accounts}));
        for n in numbers {
            builder = builder.page(
                &format!("/accounts/{}/transactions", n),
                1,
                json!({"transactions": [tx(n, 1.0)]}),
            );
        }
        let bank = builder.start().await;

        let settings = Settings {
            concurrency: 3,
            ..Settings::default()
        };
        let report = generate(&config(&bank, settings)).await.unwrap();

        let order: Vec<&str> = report.entries().iter().map(|e| e.acc_number.as_str()).collect();
        assert_eq!(order, numbers.to_vec());
        for entry in report.entries() {
            assert_eq!(entry.transactions[0].label, entry.acc_number);
        }
    }

    #[tokio::test]
    async fn test_transaction_failure_aborts_by_default() {
        let bank = two_accounts()
            .page_status(
                "/accounts/B/transactions",
                1,
                StatusCode::BAD_GATEWAY,
                json!({"error": "upstream"}),
            )
            .page("/accounts/A/transactions", 1, json!({"transactions": []}))
            .start()
            .await;

        let err = generate(&config(&bank, Settings::default())).await.unwrap_err();
        match err {
            ReportError::Transactions { acc_number, source } => {
                assert_eq!(acc_number, "B");
                assert_eq!(source.page, 1);
                assert!(matches!(source.source, ApiError::Status { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!bank
            .request_log()
            .contains(&"GET /accounts/A/transactions?page=1".to_string()));
    }

    #[tokio::test]
    async fn test_transaction_failure_partial_policy() {
        let bank = two_accounts()
            .page(
                "/accounts/B/transactions",
                1,
                json!({"transactions": [tx("rent", -800.0)], "link": {"next": true}}),
            )
            .page_status(
                "/accounts/B/transactions",
                2,
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "boom"}),
            )
            .page("/accounts/A/transactions", 1, json!({"transactions": [tx("fee", -1.0)]}))
            .start()
            .await;

        let settings = Settings {
            on_transaction_error: TransactionErrorPolicy::Partial,
            ..Settings::default()
        };
        let report = generate(&config(&bank, settings)).await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed_accounts(), vec!["B".to_string()]);

        let b = &report.entries()[0];
        assert_eq!(b.transactions.len(), 1);
        assert!(b.error.as_deref().unwrap_or_default().contains("page 2"));

        let a = &report.entries()[1];
        assert_eq!(a.acc_number, "A");
        assert!(a.error.is_none());
        assert_eq!(a.transactions[0].label, "fee");
    }

    #[tokio::test]
    async fn test_login_failure_stops_before_any_fetch() {
        let bank = MockBank::builder()
            .respond(Method::POST, "/login", StatusCode::FORBIDDEN, json!({"error": "nope"}))
            .start()
            .await;

        let err = generate(&config(&bank, Settings::default())).await.unwrap_err();
        match &err {
            ReportError::Auth(e) => assert_eq!(e.stage(), AuthStage::Login),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(bank.request_log(), vec!["POST /login"]);
    }

    #[tokio::test]
    async fn test_token_failure_is_tagged() {
        let bank = MockBank::builder()
            .respond(Method::POST, "/login", StatusCode::OK, json!({"refresh_token": "rt-1"}))
            .respond(Method::POST, "/token", StatusCode::BAD_REQUEST, json!({"error": "invalid_grant"}))
            .start()
            .await;

        let err = generate(&config(&bank, Settings::default())).await.unwrap_err();
        assert_eq!(err.stage(), "token exchange");
        assert_eq!(bank.request_log(), vec!["POST /login", "POST /token"]);
    }

    #[tokio::test]
    async fn test_account_failure_is_tagged() {
        let bank = MockBank::builder()
            .with_auth()
            .page_status("/accounts", 1, StatusCode::UNAUTHORIZED, json!({"error": "expired"}))
            .start()
            .await;

        let err = generate(&config(&bank, Settings::default())).await.unwrap_err();
        assert!(matches!(err, ReportError::Accounts(_)));
        assert_eq!(err.stage(), "account fetch");
    }

    #[tokio::test]
    async fn test_assemble_with_no_accounts() {
        let bank = MockBank::builder().start().await;
        let client = bank.client(Duration::from_secs(5));

        let report = assemble(
            &client,
            &AccessToken::for_tests("at-1"),
            &[],
            &ReportOptions::default(),
        )
        .await
        .unwrap();
        assert!(report.is_empty());
        assert!(bank.requests().is_empty());
    }

    #[tokio::test]
    async fn test_report_repeats_server_amounts_exactly() {
        let bank = MockBank::builder()
            .with_auth()
            .page(
                "/accounts",
                1,
                json!({"account": [{"acc_number": "C", "amount": 9007199254740993u64}]}),
            )
            .page(
                "/accounts/C/transactions",
                1,
                json!({"transactions": [{"label": "x", "amount": 5, "currency": "USD", "extra": "z"}]}),
            )
            .start()
            .await;

        let report = generate(&config(&bank, Settings::default())).await.unwrap();

        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"[{"acc_number":"C","amount":9007199254740993,"transactions":[{"label":"x","amount":5,"currency":"USD"}]}]"#
        );
    }
}
