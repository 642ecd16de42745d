//! Discount Codes Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use perkshop::{
    codes::{DiscountCode, Ownership, Scope, UsagePolicy},
    gating::Gate,
    ids::{CodeName, Fid, ProductId},
};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, types::Json};

use crate::domain::discounts::{
    data::NewDiscountCode,
    records::{DiscountCodeRecord, DiscountCodeUuid},
    repositories::{
        decode_error, try_fid_from_i64, try_fid_to_i64, try_i32_from_u32, try_u32_from_i32,
    },
};

const COLUMN_OWNER_FID: &str = "owner_fid";
const COLUMN_MAX_USES_TOTAL: &str = "max_uses_total";
const COLUMN_MAX_USES_PER_USER: &str = "max_uses_per_user";
const COLUMN_CURRENT_TOTAL_USES: &str = "current_total_uses";

const GET_CODE_BY_NAME_SQL: &str = include_str!("../sql/get_code_by_name.sql");
const GET_WELCOME_CODE_SQL: &str = include_str!("../sql/get_welcome_code.sql");
const LIST_OWNED_CODES_SQL: &str = include_str!("../sql/list_owned_codes.sql");
const LIST_AUTO_APPLY_CODES_SQL: &str = include_str!("../sql/list_auto_apply_codes.sql");
const LOCK_CODE_SQL: &str = include_str!("../sql/lock_code.sql");
const CREATE_CODE_SQL: &str = include_str!("../sql/create_code.sql");
const SET_CODE_ACTIVE_SQL: &str = include_str!("../sql/set_code_active.sql");
const INCREMENT_CODE_USES_SQL: &str = include_str!("../sql/increment_code_uses.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCodesRepository;

impl PgCodesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn find_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &CodeName,
    ) -> Result<Option<DiscountCodeRecord>, sqlx::Error> {
        query_as::<Postgres, DiscountCodeRecord>(GET_CODE_BY_NAME_SQL)
            .bind(code.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_welcome_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Fid,
    ) -> Result<Option<DiscountCodeRecord>, sqlx::Error> {
        query_as::<Postgres, DiscountCodeRecord>(GET_WELCOME_CODE_SQL)
            .bind(try_fid_to_i64(user, COLUMN_OWNER_FID)?)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_owned_codes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Fid,
    ) -> Result<Vec<DiscountCodeRecord>, sqlx::Error> {
        query_as::<Postgres, DiscountCodeRecord>(LIST_OWNED_CODES_SQL)
            .bind(try_fid_to_i64(user, COLUMN_OWNER_FID)?)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_auto_apply_codes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        point_in_time: Timestamp,
    ) -> Result<Vec<DiscountCodeRecord>, sqlx::Error> {
        query_as::<Postgres, DiscountCodeRecord>(LIST_AUTO_APPLY_CODES_SQL)
            .bind(SqlxTimestamp::from(point_in_time))
            .fetch_all(&mut **tx)
            .await
    }

    /// Read the code row and hold its lock until `tx` ends.
    pub(crate) async fn lock_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: DiscountCodeUuid,
    ) -> Result<Option<DiscountCodeRecord>, sqlx::Error> {
        query_as::<Postgres, DiscountCodeRecord>(LOCK_CODE_SQL)
            .bind(code.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn create_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new: NewDiscountCode,
    ) -> Result<DiscountCodeRecord, sqlx::Error> {
        let NewDiscountCode { uuid, code } = new;

        let product_ids: Vec<String> = match &code.scope {
            Scope::SiteWide => Vec::new(),
            Scope::Product { products } => {
                let mut ids: Vec<String> =
                    products.iter().map(|p| p.as_str().to_string()).collect();
                ids.sort_unstable();
                ids
            }
        };

        let owner_fid = code
            .ownership
            .owner()
            .map(|owner| try_fid_to_i64(owner, COLUMN_OWNER_FID))
            .transpose()?;

        let max_uses_total = code
            .policy
            .max_uses_total
            .map(|max| try_i32_from_u32(max, COLUMN_MAX_USES_TOTAL))
            .transpose()?;

        query_as::<Postgres, DiscountCodeRecord>(CREATE_CODE_SQL)
            .bind(uuid.into_uuid())
            .bind(code.name.as_str())
            .bind(code.code_type.as_str())
            .bind(code.kind.as_str())
            .bind(code.value)
            .bind(code.scope.as_str())
            .bind(product_ids)
            .bind(code.ownership.is_shared())
            .bind(owner_fid)
            .bind(code.gate.gating_type().as_str())
            .bind(Json(&code.gate))
            .bind(max_uses_total)
            .bind(try_i32_from_u32(
                code.policy.max_uses_per_user,
                COLUMN_MAX_USES_PER_USER,
            )?)
            .bind(code.policy.expires_at.map(SqlxTimestamp::from))
            .bind(code.policy.minimum_order_amount)
            .bind(code.free_shipping)
            .bind(code.auto_apply)
            .bind(code.priority_level)
            .bind(code.active)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn set_active(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &CodeName,
        active: bool,
    ) -> Result<DiscountCodeRecord, sqlx::Error> {
        query_as::<Postgres, DiscountCodeRecord>(SET_CODE_ACTIVE_SQL)
            .bind(code.as_str())
            .bind(active)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn increment_uses(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: DiscountCodeUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(INCREMENT_CODE_USES_SQL)
            .bind(code.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for DiscountCodeRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let name: String = row.try_get("code")?;
        let name = CodeName::parse(&name).map_err(|e| decode_error("code", e))?;

        let code_type: String = row.try_get("code_type")?;
        let kind: String = row.try_get("discount_kind")?;

        let Json(gate) = row.try_get::<Json<Gate>, _>("gating")?;

        let max_uses_total = row
            .try_get::<Option<i32>, _>(COLUMN_MAX_USES_TOTAL)?
            .map(|max| try_u32_from_i32(max, COLUMN_MAX_USES_TOTAL))
            .transpose()?;

        let code = DiscountCode {
            name,
            kind: kind.parse().map_err(|e| decode_error("discount_kind", e))?,
            value: row.try_get::<Decimal, _>("discount_value")?,
            code_type: code_type
                .parse()
                .map_err(|e| decode_error("code_type", e))?,
            scope: scope_from_row(row)?,
            ownership: ownership_from_row(row)?,
            gate,
            policy: UsagePolicy {
                max_uses_total,
                max_uses_per_user: try_u32_from_i32(
                    row.try_get(COLUMN_MAX_USES_PER_USER)?,
                    COLUMN_MAX_USES_PER_USER,
                )?,
                expires_at: row
                    .try_get::<Option<SqlxTimestamp>, _>("expires_at")?
                    .map(SqlxTimestamp::to_jiff),
                minimum_order_amount: row.try_get("minimum_order_amount")?,
            },
            total_uses: try_u32_from_i32(
                row.try_get(COLUMN_CURRENT_TOTAL_USES)?,
                COLUMN_CURRENT_TOTAL_USES,
            )?,
            free_shipping: row.try_get("free_shipping")?,
            auto_apply: row.try_get("auto_apply")?,
            priority_level: row.try_get("priority_level")?,
            active: row.try_get("is_active")?,
        };

        Ok(Self {
            uuid: DiscountCodeUuid::from_uuid(row.try_get("uuid")?),
            code,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

fn scope_from_row(row: &PgRow) -> sqlx::Result<Scope> {
    let scope: String = row.try_get("scope")?;

    match scope.as_str() {
        "site_wide" => Ok(Scope::SiteWide),
        "product" => {
            let ids: Vec<String> = row.try_get("product_ids")?;

            let products = ids
                .into_iter()
                .map(ProductId::new)
                .collect::<Result<_, _>>()
                .map_err(|e| decode_error("product_ids", e))?;

            Ok(Scope::Product { products })
        }
        other => Err(decode_error(
            "scope",
            perkshop::codes::CodeError::Unknown {
                kind: "scope",
                value: other.to_string(),
            },
        )),
    }
}

fn ownership_from_row(row: &PgRow) -> sqlx::Result<Ownership> {
    let owner: Option<i64> = row.try_get(COLUMN_OWNER_FID)?;

    match owner {
        None => Ok(Ownership::Shared),
        Some(owner) => Ok(Ownership::User {
            owner: try_fid_from_i64(owner, COLUMN_OWNER_FID)?,
        }),
    }
}
