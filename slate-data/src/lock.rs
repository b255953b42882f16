//! Pessimistic row-lock statements.
//!
//! A plain string transform, not a SQL parser: the input is assumed to be a
//! single select with at most one top-level `where`.

const SQL_SERVER_WHERE: &str = " where ";
const SQL_SERVER_LOCK_HINT: &str = " WITH (UPDLOCK, ROWLOCK) WHERE ";

/// How a database product spells "select and hold an exclusive row lock".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockDialect {
    /// Append `FOR UPDATE`.
    #[default]
    Default,
    /// DB2 and Derby: append `FOR UPDATE WITH RS`.
    Db2Like,
    /// SQL Server: table hint in front of the first lowercase ` where `.
    SqlServer,
    /// SQLite has no row locks and rejects `FOR UPDATE`; the statement is
    /// left unchanged and the enclosing write transaction serializes writers.
    /// Never returned by [`LockDialect::detect`]; chosen by
    /// [`SqlProfile`](crate::SqlProfile) for the SQLite dialect.
    NoRowLocks,
}

impl LockDialect {
    /// Case-insensitive substring match on a driver name, conventionally the
    /// fully-qualified name of the active driver adapter.
    pub fn detect(driver_name: &str) -> Self {
        let name = driver_name.to_ascii_lowercase();
        if name.contains("db2") || name.contains("derby") {
            LockDialect::Db2Like
        } else if name.contains("sqlserver") {
            LockDialect::SqlServer
        } else {
            LockDialect::Default
        }
    }

    /// Rewrite a row-fetch statement into its exclusive-lock variant.
    ///
    /// For [`LockDialect::SqlServer`] only the first lowercase ` where ` is
    /// replaced. A statement without one is returned unchanged (and a warning
    /// is logged), as are statements whose `WHERE` is upper case.
    pub fn exclusive_lock_statement(self, sql: &str) -> String {
        match self {
            LockDialect::Db2Like => format!("{sql} FOR UPDATE WITH RS"),
            LockDialect::SqlServer => {
                if !sql.contains(SQL_SERVER_WHERE) {
                    tracing::warn!(
                        sql,
                        "no lowercase ' where ' to attach the SQL Server lock hint to; statement left unchanged"
                    );
                }
                sql.replacen(SQL_SERVER_WHERE, SQL_SERVER_LOCK_HINT, 1)
            }
            LockDialect::NoRowLocks => sql.to_string(),
            LockDialect::Default => format!("{sql} FOR UPDATE"),
        }
    }
}

/// [`LockDialect::detect`] followed by [`LockDialect::exclusive_lock_statement`].
pub fn exclusive_lock_statement(sql: &str, driver_name: &str) -> String {
    LockDialect::detect(driver_name).exclusive_lock_statement(sql)
}
