//! StreamSure persistence layer
//!
//! The [`AssetRepository`] trait is the only way services read or mutate asset
//! records. Two backends implement it: an in-memory map for development and
//! tests, and PostgreSQL via sqlx.

pub mod db;

pub use db::asset::{
    AssetRepository, CommitOutcome, InMemoryAssetRepository, PgAssetRepository, ReviewOutcome,
};
pub use db::run_migrations;
