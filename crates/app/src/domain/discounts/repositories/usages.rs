//! Discount Usages Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use perkshop::ids::{Fid, OrderId};
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar};

use crate::domain::discounts::{
    data::NewUsage,
    records::{DiscountCodeUuid, UsageRecord, UsageUuid},
    repositories::{decode_error, try_fid_from_i64, try_fid_to_i64, try_i32_from_u32, try_u32_from_i32},
};

const COLUMN_USER_FID: &str = "user_fid";
const COLUMN_USER_SLOT: &str = "user_slot";

const COUNT_USER_USES_SQL: &str = include_str!("../sql/count_user_uses.sql");
const GET_USAGE_BY_ORDER_SQL: &str = include_str!("../sql/get_usage_by_order.sql");
const LIST_CODE_USAGES_SQL: &str = include_str!("../sql/list_code_usages.sql");
const CREATE_USAGE_SQL: &str = include_str!("../sql/create_usage.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgUsagesRepository;

impl PgUsagesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn count_user_uses(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: DiscountCodeUuid,
        user: Fid,
    ) -> Result<u32, sqlx::Error> {
        let count: i64 = query_scalar(COUNT_USER_USES_SQL)
            .bind(code.into_uuid())
            .bind(try_fid_to_i64(user, COLUMN_USER_FID)?)
            .fetch_one(&mut **tx)
            .await?;

        u32::try_from(count).map_err(|e| decode_error("count", e))
    }

    pub(crate) async fn find_by_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: DiscountCodeUuid,
        order: &OrderId,
    ) -> Result<Option<UsageRecord>, sqlx::Error> {
        query_as::<Postgres, UsageRecord>(GET_USAGE_BY_ORDER_SQL)
            .bind(code.into_uuid())
            .bind(order.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_for_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: DiscountCodeUuid,
    ) -> Result<Vec<UsageRecord>, sqlx::Error> {
        query_as::<Postgres, UsageRecord>(LIST_CODE_USAGES_SQL)
            .bind(code.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn create_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        usage: &NewUsage,
        user_slot: u32,
    ) -> Result<UsageRecord, sqlx::Error> {
        query_as::<Postgres, UsageRecord>(CREATE_USAGE_SQL)
            .bind(usage.uuid.into_uuid())
            .bind(usage.discount_code_uuid.into_uuid())
            .bind(try_fid_to_i64(usage.user, COLUMN_USER_FID)?)
            .bind(try_i32_from_u32(user_slot, COLUMN_USER_SLOT)?)
            .bind(usage.order_id.as_str())
            .bind(usage.discount_amount)
            .bind(usage.original_subtotal)
            .bind(usage.free_shipping)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for UsageRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let order_id: String = row.try_get("order_id")?;

        Ok(Self {
            uuid: UsageUuid::from_uuid(row.try_get("uuid")?),
            discount_code_uuid: DiscountCodeUuid::from_uuid(row.try_get("discount_code_uuid")?),
            user: try_fid_from_i64(row.try_get(COLUMN_USER_FID)?, COLUMN_USER_FID)?,
            user_slot: try_u32_from_i32(row.try_get(COLUMN_USER_SLOT)?, COLUMN_USER_SLOT)?,
            order_id: OrderId::new(order_id).map_err(|e| decode_error("order_id", e))?,
            discount_amount: row.try_get("discount_amount")?,
            original_subtotal: row.try_get("original_subtotal")?,
            free_shipping: row.try_get("free_shipping")?,
            used_at: row.try_get::<SqlxTimestamp, _>("used_at")?.to_jiff(),
        })
    }
}
