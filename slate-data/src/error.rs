use crate::query::QueryError;

/// Errors that can occur in the data layer.
///
/// Store failures are never translated: constraint violations, lost
/// connections and the like arrive as [`DataError::Database`] with the
/// driver error available through [`std::error::Error::source`].
#[derive(Debug)]
pub enum DataError {
    NotFound(String),
    /// More than one row matched a lookup that expects at most one.
    Ambiguous(String),
    /// A statement shape could not be rendered.
    Query(QueryError),
    Database(Box<dyn std::error::Error + Send + Sync>),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `slate-data-sqlx`) to wrap
    /// driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    /// Downcast the wrapped driver error, if any.
    pub fn database_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            DataError::Database(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Ambiguous(msg) => write!(f, "Ambiguous result: {msg}"),
            DataError::Query(err) => write!(f, "Query error: {err}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            DataError::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DriverError;

    impl std::fmt::Display for DriverError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("UNIQUE constraint failed: users.id")
        }
    }

    impl std::error::Error for DriverError {}

    #[test]
    fn database_error_keeps_source() {
        let err = DataError::database(DriverError);
        assert_eq!(
            err.to_string(),
            "Database error: UNIQUE constraint failed: users.id"
        );
        assert!(err.database_error::<DriverError>().is_some());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn query_error_converts() {
        let err: DataError = QueryError::UnknownColumn {
            table: "users".into(),
            column: "nope".into(),
        }
        .into();
        assert!(matches!(err, DataError::Query(_)));
        assert!(err.database_error::<DriverError>().is_none());
    }
}
