//! Profiles Repository

use perkshop::ids::{Fid, WalletAddress};
use sqlx::{Postgres, Transaction, query_scalar};

const COLUMN_FID: &str = "fid";

const GET_CLUB_MEMBERSHIP_SQL: &str = include_str!("sql/get_club_membership.sql");
const LIST_USER_WALLETS_SQL: &str = include_str!("sql/list_user_wallets.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProfilesRepository;

impl PgProfilesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Membership flag, or `None` when no profile exists.
    pub(crate) async fn club_membership(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Fid,
    ) -> Result<Option<bool>, sqlx::Error> {
        query_scalar(GET_CLUB_MEMBERSHIP_SQL)
            .bind(try_fid_to_i64(user)?)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn wallets(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Fid,
    ) -> Result<Vec<WalletAddress>, sqlx::Error> {
        let addresses: Vec<String> = query_scalar(LIST_USER_WALLETS_SQL)
            .bind(try_fid_to_i64(user)?)
            .fetch_all(&mut **tx)
            .await?;

        addresses
            .iter()
            .map(|address| {
                WalletAddress::parse(address).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "address".to_string(),
                    source: Box::new(e),
                })
            })
            .collect()
    }
}

fn try_fid_to_i64(fid: Fid) -> Result<i64, sqlx::Error> {
    i64::try_from(fid.get()).map_err(|e| sqlx::Error::ColumnDecode {
        index: COLUMN_FID.to_string(),
        source: Box::new(e),
    })
}
