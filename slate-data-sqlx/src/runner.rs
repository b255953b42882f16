use crate::config::DatabaseConfig;
use crate::error::SqlxErrorExt;
use crate::repository::SqlxRepository;
use slate_data::{ActionRunner, DataError, DbAction, SqlProfile, TableMapping};
use sqlx::{AnyConnection, AnyPool};
use tracing::{debug, info, warn};

/// Runs [`DbAction`]s on connections drawn from an `AnyPool`.
///
/// - **Plain action:** acquires a connection, runs, returns it to the pool.
/// - **Transactional action:** begins a transaction, commits on `Ok`,
///   rolls back on `Err` and returns the action's error.
#[derive(Clone)]
pub struct SqlxRunner {
    pool: AnyPool,
    profile: SqlProfile,
}

impl SqlxRunner {
    pub fn new(pool: AnyPool, profile: SqlProfile) -> Self {
        Self { pool, profile }
    }

    /// Install the compiled-in drivers and open a pool for `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataError> {
        sqlx::any::install_default_drivers();
        let profile = config.profile();
        let pool = config
            .pool_options()
            .connect(&config.url)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        info!(
            dialect = ?profile.dialect,
            lock = ?profile.lock,
            max_connections = config.max_connections,
            "Database pool ready"
        );
        Ok(Self::new(pool, profile))
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn profile(&self) -> SqlProfile {
        self.profile
    }

    /// A repository rendered for this runner's profile.
    pub fn repository<M: TableMapping>(&self) -> Result<SqlxRepository<M>, DataError> {
        SqlxRepository::new(self.profile)
    }
}

impl std::fmt::Debug for SqlxRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxRunner")
            .field("profile", &self.profile)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl ActionRunner for SqlxRunner {
    type Conn = AnyConnection;

    async fn run<T: Send + 'static>(
        &self,
        action: DbAction<AnyConnection, T>,
    ) -> Result<T, DataError> {
        let label = action.label();
        if !action.is_transactional() {
            debug!(action = label, "running action");
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(SqlxErrorExt::into_data_error)?;
            return action.run(&mut conn).await;
        }

        debug!(action = label, "running action in transaction");
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        let outcome = action.run(&mut tx).await;
        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(SqlxErrorExt::into_data_error)?;
                Ok(value)
            }
            Err(err) => {
                warn!(action = label, error = %err, "rolling back transaction");
                if let Err(rollback) = tx.rollback().await {
                    warn!(action = label, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
