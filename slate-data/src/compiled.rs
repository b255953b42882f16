//! Pre-rendered statements.
//!
//! The fixed shapes every repository needs are rendered once, when the
//! repository is built. Shapes that depend on call arguments (batch size,
//! sort column) go through [`QueryCache`], which renders each distinct shape
//! on first use and serves it from memory afterwards.

use crate::mapping::TableMapping;
use crate::profile::SqlProfile;
use crate::query::{QueryError, StatementBuilder};
use dashmap::DashMap;
use std::sync::Arc;

/// Upper bound on bind parameters per statement; SQLite's historical limit
/// and well under every other supported store's.
pub const MAX_BIND_PARAMS: usize = 999;

/// Rows per multi-row insert for a row of `columns_per_row` values.
pub fn rows_per_batch(columns_per_row: usize) -> usize {
    (MAX_BIND_PARAMS / columns_per_row.max(1)).max(1)
}

/// How a store-generated identity is read back after an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKey {
    /// The insert statement itself carries `returning <id>`.
    Returning,
    /// Run this query on the same connection right after the insert.
    LastInsertId(&'static str),
}

/// The statements a repository runs on every call, rendered once.
#[derive(Debug, Clone)]
pub struct CompiledQueries {
    pub profile: SqlProfile,
    pub find_all: String,
    pub find_by_id: String,
    pub count: String,
    /// Insert of the non-identity columns; the store assigns the key.
    pub insert_generated: String,
    pub generated_key: GeneratedKey,
    /// Insert with the identity column bound first.
    pub insert_with_id: String,
    /// Non-identity columns bound first, identity last.
    pub update: String,
    pub delete: String,
    /// `find_by_id` run through the lock rewriter.
    pub lock_by_id: String,
}

impl CompiledQueries {
    pub fn compile<M: TableMapping>(profile: SqlProfile) -> Result<Self, QueryError> {
        let statement = || StatementBuilder::new(M::table_name()).dialect(profile.dialect);
        let all_columns = M::all_columns();

        let generated_key = match profile.dialect.last_insert_id_query() {
            Some(query) => GeneratedKey::LastInsertId(query),
            None => GeneratedKey::Returning,
        };
        let returning = match generated_key {
            GeneratedKey::Returning => Some(M::id_column()),
            GeneratedKey::LastInsertId(_) => None,
        };

        let find_by_id = statement()
            .where_eq(M::id_column())
            .build_select(&all_columns)?;
        let lock_by_id = profile.lock.exclusive_lock_statement(&find_by_id);

        Ok(Self {
            profile,
            find_all: statement().build_select(&all_columns)?,
            count: statement().build_count(M::id_column())?,
            insert_generated: statement().build_insert(M::columns(), 1, returning)?,
            generated_key,
            insert_with_id: statement().build_insert(&all_columns, 1, None)?,
            update: statement()
                .where_eq(M::id_column())
                .build_update(M::columns())?,
            delete: statement().where_eq(M::id_column()).build_delete()?,
            find_by_id,
            lock_by_id,
        })
    }
}

/// A statement shape whose text depends on call arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryShape {
    /// Multi-row insert; `with_id` includes the identity column.
    BatchInsert { with_id: bool, rows: usize },
    /// Paged select ordered by `(column, ascending)`, identity column when `None`.
    Page { sort: Option<(String, bool)> },
}

impl QueryShape {
    pub fn compile<M: TableMapping>(&self, profile: SqlProfile) -> Result<String, QueryError> {
        let statement = StatementBuilder::new(M::table_name()).dialect(profile.dialect);
        match self {
            QueryShape::BatchInsert { with_id, rows } => {
                if *with_id {
                    statement.build_insert(&M::all_columns(), *rows, None)
                } else {
                    statement.build_insert(M::columns(), *rows, None)
                }
            }
            QueryShape::Page { sort } => {
                let (column, ascending) = match sort {
                    Some((column, ascending)) => (column.as_str(), *ascending),
                    None => (M::id_column(), true),
                };
                if !M::has_column(column) {
                    return Err(QueryError::UnknownColumn {
                        table: M::table_name().to_string(),
                        column: column.to_string(),
                    });
                }
                statement
                    .order_by(column, ascending)
                    .paged()
                    .build_select(&M::all_columns())
            }
        }
    }
}

/// Append-only memo of rendered [`QueryShape`]s for one table.
///
/// Safe to share between concurrent callers: an entry is written once, the
/// first time its shape is requested, and only read afterwards. Clones share
/// the same entries.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<DashMap<QueryShape, Arc<str>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile<M: TableMapping>(
        &self,
        shape: QueryShape,
        profile: SqlProfile,
    ) -> Result<Arc<str>, QueryError> {
        if let Some(hit) = self.inner.get(&shape) {
            return Ok(Arc::clone(hit.value()));
        }
        let sql: Arc<str> = shape.compile::<M>(profile)?.into();
        tracing::trace!(table = M::table_name(), ?shape, sql = %sql, "compiled query shape");
        let entry = self.inner.entry(shape).or_insert(sql);
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("shapes", &self.inner.len())
            .finish()
    }
}
