//! External lookups that gates depend on.

use async_trait::async_trait;
use mockall::automock;
use perkshop::{
    gating::{BalanceKind, TokenDescriptor},
    ids::{Fid, WalletAddress},
};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by gate lookups. The gating evaluator turns every one of these into an
/// unsatisfied gate.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No balance source is configured.
    #[error("balance source is not configured")]
    Unconfigured,

    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-2xx status or a body we could not use.
    #[error("unexpected response from balance source: {0}")]
    UnexpectedResponse(String),

    /// Reading profile data failed.
    #[error("storage error")]
    Storage(#[from] sqlx::Error),
}

/// Token balances across a set of wallets.
#[automock]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Combined `kind` balance of `token` over `wallets`, in whole tokens.
    async fn balance(
        &self,
        wallets: &[WalletAddress],
        token: &TokenDescriptor,
        kind: BalanceKind,
    ) -> Result<Decimal, SourceError>;
}

/// Club membership flag.
#[automock]
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn is_club_member(&self, user: Fid) -> Result<bool, SourceError>;
}

/// Wallets linked to a user.
#[automock]
#[async_trait]
pub trait WalletResolver: Send + Sync {
    async fn wallets(&self, user: Fid) -> Result<Vec<WalletAddress>, SourceError>;
}

/// Balance source used when no balance API is configured; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredBalanceSource;

#[async_trait]
impl BalanceSource for UnconfiguredBalanceSource {
    async fn balance(
        &self,
        _wallets: &[WalletAddress],
        _token: &TokenDescriptor,
        _kind: BalanceKind,
    ) -> Result<Decimal, SourceError> {
        Err(SourceError::Unconfigured)
    }
}
