//! Profile-backed gate sources.

use async_trait::async_trait;
use perkshop::ids::{Fid, WalletAddress};

use crate::{
    database::Db,
    domain::{
        gating::{MembershipSource, SourceError, WalletResolver},
        profiles::repository::PgProfilesRepository,
    },
};

/// Reads the club membership flag from `user_profiles`. Users without a profile are not
/// members.
#[derive(Debug, Clone)]
pub struct PgMembershipSource {
    db: Db,
    repository: PgProfilesRepository,
}

impl PgMembershipSource {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProfilesRepository::new(),
        }
    }
}

#[async_trait]
impl MembershipSource for PgMembershipSource {
    async fn is_club_member(&self, user: Fid) -> Result<bool, SourceError> {
        let mut tx = self.db.begin().await?;

        let member = self.repository.club_membership(&mut tx, user).await?;

        tx.commit().await?;

        Ok(member.unwrap_or(false))
    }
}

/// Reads linked wallets from `user_wallets`, custody wallet first.
#[derive(Debug, Clone)]
pub struct PgWalletResolver {
    db: Db,
    repository: PgProfilesRepository,
}

impl PgWalletResolver {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProfilesRepository::new(),
        }
    }
}

#[async_trait]
impl WalletResolver for PgWalletResolver {
    async fn wallets(&self, user: Fid) -> Result<Vec<WalletAddress>, SourceError> {
        let mut tx = self.db.begin().await?;

        let wallets = self.repository.wallets(&mut tx, user).await?;

        tx.commit().await?;

        Ok(wallets)
    }
}
