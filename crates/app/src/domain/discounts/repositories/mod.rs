//! Discount Repositories

pub(crate) mod codes;
pub(crate) mod usages;

pub(crate) use codes::PgCodesRepository;
pub(crate) use usages::PgUsagesRepository;

use perkshop::ids::Fid;

pub(crate) fn decode_error<E>(column: &str, error: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(error),
    }
}

pub(crate) fn try_fid_to_i64(fid: Fid, column: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(fid.get()).map_err(|e| decode_error(column, e))
}

pub(crate) fn try_fid_from_i64(value: i64, column: &str) -> Result<Fid, sqlx::Error> {
    u64::try_from(value)
        .map(Fid::new)
        .map_err(|e| decode_error(column, e))
}

pub(crate) fn try_u32_from_i32(value: i32, column: &str) -> Result<u32, sqlx::Error> {
    u32::try_from(value).map_err(|e| decode_error(column, e))
}

pub(crate) fn try_i32_from_u32(value: u32, column: &str) -> Result<i32, sqlx::Error> {
    i32::try_from(value).map_err(|e| decode_error(column, e))
}
