//! Identifiers
//!
//! Newtypes for the identifiers that flow through eligibility checks: Farcaster user ids,
//! wallet addresses, Shopify product ids, order ids and discount code names.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a discount code name.
pub const MAX_CODE_NAME_LEN: usize = 64;

/// Errors raised while parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The code name was empty after trimming.
    #[error("discount code cannot be empty")]
    EmptyCode,

    /// The code name exceeded [`MAX_CODE_NAME_LEN`].
    #[error("discount code cannot be longer than {MAX_CODE_NAME_LEN} characters")]
    CodeTooLong,

    /// The code name contained something other than alphanumerics, `-` or `_`.
    #[error("discount code contains invalid character {0:?}")]
    InvalidCodeCharacter(char),

    /// The wallet address was not a `0x`-prefixed, 20 byte hex string.
    #[error("invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    /// An empty product or order id.
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// A FID that was not an unsigned integer.
    #[error("invalid fid: {0}")]
    InvalidFid(String),
}

/// Farcaster user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fid(u64);

impl Fid {
    /// Wrap a raw FID.
    #[must_use]
    pub const fn new(fid: u64) -> Self {
        Self(fid)
    }

    /// Raw FID value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Fid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for Fid {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for Fid {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_parse| IdError::InvalidFid(s.to_string()))
    }
}

/// EVM wallet or contract address, stored lower-cased so comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalise an address.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidWalletAddress`] unless the input is `0x` followed by 40 hex digits.
    pub fn parse(address: &str) -> Result<Self, IdError> {
        let trimmed = address.trim();

        let valid = trimmed.len() == 42
            && trimmed.starts_with("0x")
            && trimmed.chars().skip(2).all(|c| c.is_ascii_hexdigit());

        if !valid {
            return Err(IdError::InvalidWalletAddress(address.to_string()));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Normalised address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl FromStr for WalletAddress {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for WalletAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Storefront product id (e.g. a Shopify product GID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Wrap a product id.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] for a blank id.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(IdError::Empty("product id"));
        }

        Ok(Self(id.trim().to_string()))
    }

    /// Product id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductId> for String {
    fn from(value: ProductId) -> Self {
        value.0
    }
}

impl FromStr for ProductId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Order id assigned by the order-creation workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    /// Wrap an order id.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] for a blank id.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(IdError::Empty("order id"));
        }

        Ok(Self(id.trim().to_string()))
    }

    /// Order id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderId> for String {
    fn from(value: OrderId) -> Self {
        value.0
    }
}

impl FromStr for OrderId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Case-normalised discount code, e.g. `WELCOME-3F9A2C1B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeName(String);

impl CodeName {
    /// Trim, upper-case and validate a code as typed by a shopper or administrator.
    ///
    /// # Errors
    ///
    /// Returns an [`IdError`] when the code is empty, too long or contains characters
    /// other than ASCII alphanumerics, `-` and `_`.
    pub fn parse(code: &str) -> Result<Self, IdError> {
        let normalised = code.trim().to_ascii_uppercase();

        if normalised.is_empty() {
            return Err(IdError::EmptyCode);
        }

        if normalised.chars().count() > MAX_CODE_NAME_LEN {
            return Err(IdError::CodeTooLong);
        }

        if let Some(invalid) = normalised
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(IdError::InvalidCodeCharacter(invalid));
        }

        Ok(Self(normalised))
    }

    /// Normalised code string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CodeName {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CodeName> for String {
    fn from(value: CodeName) -> Self {
        value.0
    }
}

impl FromStr for CodeName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for CodeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
