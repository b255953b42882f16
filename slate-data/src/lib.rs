//! # slate-data: backend-agnostic CRUD core
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Entity`] | Identity accessor + copy-with-identity |
//! | [`TableMapping`] | Table name, identity column and value columns of an entity |
//! | [`DbAction`] | Deferred unit of work, composable with `map` / `and_then` |
//! | [`ActionRunner`] | Executes actions, optionally inside a transaction |
//! | [`Repository`] | find / save / update / delete / count / lock contract |
//! | [`CompiledQueries`] / [`QueryCache`] | Statements rendered once and reused |
//! | [`LockDialect`] | Dialect-aware `select ... for update` rewriting |
//! | [`SqlProfile`] | Statement dialect + lock dialect, fixed per repository |
//!
//! Backends (e.g. `slate-data-sqlx`) implement [`Repository`] and [`ActionRunner`].

pub mod action;
pub mod compiled;
pub mod entity;
pub mod error;
pub mod lock;
pub mod mapping;
pub mod page;
pub mod profile;
pub mod query;
pub mod repository;

pub use action::{ActionFuture, ActionRunner, DbAction};
pub use compiled::{CompiledQueries, GeneratedKey, QueryCache, QueryShape};
pub use entity::Entity;
pub use error::DataError;
pub use lock::{exclusive_lock_statement, LockDialect};
pub use mapping::TableMapping;
pub use page::{Page, Pageable};
pub use profile::SqlProfile;
pub use query::{Dialect, QueryError, StatementBuilder};
pub use repository::Repository;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        ActionRunner, DataError, DbAction, Entity, Page, Pageable, Repository, SqlProfile,
        TableMapping,
    };
}
