use crate::bind::{AnyId, BindColumns};
use crate::error::SqlxErrorExt;
use slate_data::compiled::rows_per_batch;
use slate_data::{
    CompiledQueries, DataError, DbAction, Entity, GeneratedKey, Page, Pageable, QueryCache,
    QueryShape, Repository, SqlProfile, TableMapping,
};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, Connection, FromRow, Row};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

type Id<M> = <<M as TableMapping>::Entity as Entity>::Id;

/// One rendered multi-row insert and the rows it binds.
type BatchStatement<M> = (Arc<str>, Vec<(Option<Id<M>>, <M as TableMapping>::Entity)>);

/// SQL repository for the table described by `M`, run over the sqlx `Any` driver.
///
/// Every fixed statement is rendered in [`SqlxRepository::new`]; a mapping
/// with an invalid identifier fails there rather than on first use. Clones
/// share the rendered statements and the shape cache.
///
/// # Example
///
/// ```ignore
/// let repo = SqlxRepository::<Users>::new(SqlProfile::from_url(&url))?;
/// let saved = runner.run(repo.save(User::new("alice"))).await?;
/// ```
pub struct SqlxRepository<M: TableMapping> {
    queries: Arc<CompiledQueries>,
    cache: QueryCache,
    _marker: PhantomData<fn() -> M>,
}

impl<M: TableMapping> SqlxRepository<M> {
    pub fn new(profile: SqlProfile) -> Result<Self, DataError> {
        let queries = CompiledQueries::compile::<M>(profile)?;
        debug!(table = M::table_name(), ?profile, "compiled repository statements");
        Ok(Self {
            queries: Arc::new(queries),
            cache: QueryCache::new(),
            _marker: PhantomData,
        })
    }

    pub fn profile(&self) -> SqlProfile {
        self.queries.profile
    }

    /// The fixed statements rendered at construction.
    pub fn queries(&self) -> &CompiledQueries {
        &self.queries
    }

    /// Number of argument-dependent shapes rendered so far.
    pub fn cached_shapes(&self) -> usize {
        self.cache.len()
    }

    /// Split `entities` by identity presence and render one statement per chunk.
    fn batch_statements(
        &self,
        entities: Vec<M::Entity>,
    ) -> Result<Vec<BatchStatement<M>>, DataError> {
        let (keyed, generated): (Vec<_>, Vec<_>) = entities
            .into_iter()
            .map(|entity| (entity.id().cloned(), entity))
            .partition(|(id, _)| id.is_some());

        let value_columns = M::columns().len();
        let mut statements = Vec::new();
        for (with_id, rows) in [(true, keyed), (false, generated)] {
            let width = if with_id { value_columns + 1 } else { value_columns };
            for chunk in chunked(rows, rows_per_batch(width)) {
                let shape = QueryShape::BatchInsert {
                    with_id,
                    rows: chunk.len(),
                };
                let sql = self.cache.get_or_compile::<M>(shape, self.profile())?;
                statements.push((sql, chunk));
            }
        }
        Ok(statements)
    }
}

impl<M: TableMapping> Clone for SqlxRepository<M> {
    fn clone(&self) -> Self {
        Self {
            queries: Arc::clone(&self.queries),
            cache: self.cache.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M: TableMapping> std::fmt::Debug for SqlxRepository<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxRepository")
            .field("table", &M::table_name())
            .field("profile", &self.queries.profile)
            .field("cache", &self.cache)
            .finish()
    }
}

fn chunked<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::new();
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        chunks.push(items.by_ref().take(size).collect());
    }
    chunks
}

/// Run rendered multi-row inserts in order; yields the summed row count.
async fn insert_batches<M>(
    conn: &mut AnyConnection,
    statements: Vec<BatchStatement<M>>,
) -> Result<u64, DataError>
where
    M: BindColumns,
    Id<M>: AnyId,
{
    let mut inserted = 0;
    for (sql, rows) in statements {
        trace!(sql = %sql, rows = rows.len(), "batch_insert");
        let mut query = sqlx::query(&sql);
        for (id, entity) in &rows {
            if let Some(id) = id {
                query = query.bind(id.clone());
            }
            query = M::bind_columns(entity, query);
        }
        inserted += query
            .execute(&mut *conn)
            .await
            .map_err(SqlxErrorExt::into_data_error)?
            .rows_affected();
    }
    Ok(inserted)
}

fn to_bind(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl<M> Repository<M::Entity> for SqlxRepository<M>
where
    M: BindColumns,
    M::Entity: for<'r> FromRow<'r, AnyRow>,
    Id<M>: AnyId,
{
    type Conn = AnyConnection;

    fn find_all(&self) -> DbAction<AnyConnection, Vec<M::Entity>> {
        let queries = Arc::clone(&self.queries);
        DbAction::<AnyConnection, Vec<M::Entity>>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %queries.find_all, "find_all");
                sqlx::query_as::<Any, M::Entity>(&queries.find_all)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)
            })
        })
        .named("find_all")
    }

    fn find_one(&self, id: Id<M>) -> DbAction<AnyConnection, Option<M::Entity>> {
        let queries = Arc::clone(&self.queries);
        DbAction::<AnyConnection, Option<M::Entity>>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %queries.find_by_id, ?id, "find_one");
                let mut rows = sqlx::query_as::<Any, M::Entity>(&queries.find_by_id)
                    .bind(id.clone())
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                if rows.len() > 1 {
                    return Err(DataError::Ambiguous(format!(
                        "{} rows in '{}' match {} = {:?}",
                        rows.len(),
                        M::table_name(),
                        M::id_column(),
                        id
                    )));
                }
                Ok(rows.pop())
            })
        })
        .named("find_one")
    }

    fn find_page(&self, pageable: &Pageable) -> DbAction<AnyConnection, Page<M::Entity>> {
        let shape = QueryShape::Page {
            sort: pageable.sort_order(),
        };
        let sql = match self.cache.get_or_compile::<M>(shape, self.profile()) {
            Ok(sql) => sql,
            Err(err) => return DbAction::failed(err.into()),
        };
        let queries = Arc::clone(&self.queries);
        let pageable = pageable.clone();
        DbAction::<AnyConnection, Page<M::Entity>>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %sql, page = pageable.page, size = pageable.size, "find_page");
                let content = sqlx::query_as::<Any, M::Entity>(&sql)
                    .bind(to_bind(pageable.size))
                    .bind(to_bind(pageable.offset()))
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                let total = sqlx::query_scalar::<Any, i64>(&queries.count)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                Ok(Page::new(content, &pageable, u64::try_from(total).unwrap_or(0)))
            })
        })
        .named("find_page")
    }

    fn count(&self) -> DbAction<AnyConnection, i64> {
        let queries = Arc::clone(&self.queries);
        DbAction::<AnyConnection, i64>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %queries.count, "count");
                sqlx::query_scalar::<Any, i64>(&queries.count)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)
            })
        })
        .named("count")
    }

    fn batch_insert(&self, entities: Vec<M::Entity>) -> DbAction<AnyConnection, Option<u64>> {
        let statements = match self.batch_statements(entities) {
            Ok(statements) => statements,
            Err(err) => return DbAction::failed(err),
        };
        DbAction::<AnyConnection, Option<u64>>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                if statements.len() <= 1 {
                    return insert_batches::<M>(conn, statements).await.map(Some);
                }
                // Chunked inserts are all-or-nothing, also when composed into a
                // larger action: nested, this begins a savepoint.
                let mut tx = conn.begin().await.map_err(SqlxErrorExt::into_data_error)?;
                let outcome = insert_batches::<M>(&mut tx, statements).await;
                match outcome {
                    Ok(inserted) => {
                        tx.commit().await.map_err(SqlxErrorExt::into_data_error)?;
                        Ok(Some(inserted))
                    }
                    Err(err) => {
                        if let Err(rollback) = tx.rollback().await {
                            warn!(
                                table = M::table_name(),
                                error = %rollback,
                                "batch rollback failed"
                            );
                        }
                        Err(err)
                    }
                }
            })
        })
        .named("batch_insert")
    }

    fn delete(&self, id: Id<M>) -> DbAction<AnyConnection, u64> {
        let queries = Arc::clone(&self.queries);
        DbAction::<AnyConnection, u64>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %queries.delete, ?id, "delete");
                let done = sqlx::query(&queries.delete)
                    .bind(id)
                    .execute(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                Ok(done.rows_affected())
            })
        })
        .named("delete")
    }

    fn insert_generated(&self, entity: M::Entity) -> DbAction<AnyConnection, Id<M>> {
        let queries = Arc::clone(&self.queries);
        DbAction::<AnyConnection, Id<M>>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %queries.insert_generated, "insert_generated");
                let query = M::bind_columns(&entity, sqlx::query(&queries.insert_generated));
                match queries.generated_key {
                    GeneratedKey::Returning => {
                        let row = query
                            .fetch_one(&mut *conn)
                            .await
                            .map_err(SqlxErrorExt::into_data_error)?;
                        row.try_get::<Id<M>, _>(0)
                            .map_err(SqlxErrorExt::into_data_error)
                    }
                    GeneratedKey::LastInsertId(select) => {
                        query
                            .execute(&mut *conn)
                            .await
                            .map_err(SqlxErrorExt::into_data_error)?;
                        sqlx::query_scalar::<Any, Id<M>>(select)
                            .fetch_one(&mut *conn)
                            .await
                            .map_err(SqlxErrorExt::into_data_error)
                    }
                }
            })
        })
        .named("insert_generated")
    }

    fn insert_with_id(&self, id: Id<M>, entity: M::Entity) -> DbAction<AnyConnection, u64> {
        let queries = Arc::clone(&self.queries);
        DbAction::<AnyConnection, u64>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %queries.insert_with_id, ?id, "insert_with_id");
                let query = sqlx::query(&queries.insert_with_id).bind(id);
                let done = M::bind_columns(&entity, query)
                    .execute(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                Ok(done.rows_affected())
            })
        })
        .named("insert_with_id")
    }

    fn update_by_id(&self, id: Id<M>, entity: M::Entity) -> DbAction<AnyConnection, u64> {
        let queries = Arc::clone(&self.queries);
        DbAction::<AnyConnection, u64>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %queries.update, ?id, "update_by_id");
                let query = M::bind_columns(&entity, sqlx::query(&queries.update));
                let done = query
                    .bind(id.clone())
                    .execute(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                if done.rows_affected() == 0 {
                    debug!(table = M::table_name(), ?id, "update matched no rows");
                }
                Ok(done.rows_affected())
            })
        })
        .named("update_by_id")
    }

    fn select_for_update(&self, id: Id<M>) -> DbAction<AnyConnection, ()> {
        let queries = Arc::clone(&self.queries);
        DbAction::<AnyConnection, ()>::new(move |conn: &mut AnyConnection| {
            Box::pin(async move {
                trace!(sql = %queries.lock_by_id, ?id, "select_for_update");
                sqlx::query(&queries.lock_by_id)
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(SqlxErrorExt::into_data_error)?;
                Ok(())
            })
        })
        .named("select_for_update")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_keeps_order_and_remainder() {
        let chunks = chunked((1..=7).collect::<Vec<_>>(), 3);
        assert_eq!(chunks, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
        assert!(chunked(Vec::<u8>::new(), 3).is_empty());
    }

    #[test]
    fn page_arguments_saturate() {
        assert_eq!(to_bind(20), 20);
        assert_eq!(to_bind(u64::MAX), i64::MAX);
    }
}
