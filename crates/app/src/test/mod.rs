//! Test support: fixtures, an in-memory store and a per-test `PostgreSQL` database.

pub(crate) mod memory;

pub(crate) use context::TestContext;
