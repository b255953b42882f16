//! # slate-data-sqlx: SQLx backend for the Slate data layer
//!
//! Implements [`slate_data::Repository`] and [`slate_data::ActionRunner`] on
//! top of the [SQLx](https://github.com/launchbadge/sqlx) `Any` driver, so
//! one build can talk to whichever store the connection URL names.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlxRepository`] | CRUD repository for one [`TableMapping`](slate_data::TableMapping) |
//! | [`BindColumns`] | Binds an entity's value columns onto a statement |
//! | [`SqlxRunner`] | Runs actions on a pool, commit / rollback for transactional ones |
//! | [`DatabaseConfig`] | YAML + `.env` + `DATABASE_*` connection settings |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//!
//! # Feature flags
//!
//! Enable the drivers the application connects to:
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```ignore
//! use slate_data_sqlx::prelude::*;
//!
//! let config = DatabaseConfig::load("application.yaml")?;
//! let runner = SqlxRunner::connect(&config).await?;
//! let users = runner.repository::<Users>()?;
//!
//! let alice = runner.run(users.save(User::new("alice"))).await?;
//! let locked = runner
//!     .run(users.execute_transactionally(users.lock(alice)))
//!     .await?;
//! ```

pub mod bind;
pub mod config;
pub mod error;
pub mod repository;
pub mod runner;

pub use bind::{AnyId, AnyQuery, BindColumns};
pub use config::{ConfigError, DatabaseConfig};
pub use error::{is_unique_violation, SqlxErrorExt};
pub use repository::SqlxRepository;
pub use runner::SqlxRunner;

/// Re-exports of the most commonly used types from both `slate-data` and this crate.
pub mod prelude {
    pub use crate::{
        AnyQuery, BindColumns, DatabaseConfig, SqlxErrorExt, SqlxRepository, SqlxRunner,
    };
    pub use slate_data::prelude::*;
}
