//! HTTP client for the token balance indexer.

use std::str::FromStr;

use async_trait::async_trait;
use perkshop::{
    gating::{BalanceKind, TokenDescriptor},
    ids::WalletAddress,
};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::gating::sources::{BalanceSource, SourceError};

const API_KEY_HEADER: &str = "x-api-key";

/// Configuration for connecting to the balance indexer.
#[derive(Debug, Clone)]
pub struct BalanceApiConfig {
    /// Base URL, e.g. `"https://balances.internal"`.
    pub url: String,

    /// Optional API key sent as `x-api-key`.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpBalanceSource {
    config: BalanceApiConfig,
    http: Client,
}

impl HttpBalanceSource {
    #[must_use]
    pub fn new(config: BalanceApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/balances", self.config.url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct BalanceRequest<'a> {
    chain_id: u64,
    contract: &'a str,
    kind: &'static str,
    wallets: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: String,
}

fn parse_balance(raw: &str) -> Result<Decimal, SourceError> {
    let balance = Decimal::from_str(raw.trim())
        .map_err(|error| SourceError::UnexpectedResponse(format!("invalid balance {raw:?}: {error}")))?;

    if balance.is_sign_negative() {
        return Err(SourceError::UnexpectedResponse(format!(
            "negative balance {raw:?}"
        )));
    }

    Ok(balance)
}

#[async_trait]
impl BalanceSource for HttpBalanceSource {
    async fn balance(
        &self,
        wallets: &[WalletAddress],
        token: &TokenDescriptor,
        kind: BalanceKind,
    ) -> Result<Decimal, SourceError> {
        let body = BalanceRequest {
            chain_id: token.chain_id,
            contract: token.contract.as_str(),
            kind: kind.as_str(),
            wallets: wallets.iter().map(WalletAddress::as_str).collect(),
        };

        let mut request = self.http.post(self.endpoint()).json(&body);

        if let Some(api_key) = &self.config.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(SourceError::UnexpectedResponse(format!(
                "balance request failed with status {status}: {text}"
            )));
        }

        let parsed: BalanceResponse = response.json().await?;

        parse_balance(&parsed.balance)
    }
}
