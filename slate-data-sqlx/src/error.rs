//! Mapping driver failures onto [`DataError`].
//!
//! Only `RowNotFound` gets a variant of its own. Everything else, constraint
//! violations included, travels inside [`DataError::Database`] untouched;
//! callers that branch on a duplicate key ask [`is_unique_violation`].
//! [`DataError::Ambiguous`] never comes from here: the repository raises it
//! itself when an identity lookup returns several rows.

use slate_data::DataError;

/// `sqlx::Error` → [`DataError`], spelled as a method because `DataError`
/// lives in another crate.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        if let sqlx::Error::RowNotFound = self {
            return DataError::NotFound("no row returned".into());
        }
        DataError::database(self)
    }
}

/// Whether `err` wraps a unique or primary-key violation reported by the store.
///
/// Saving an entity whose preset identity is already taken ends up here.
pub fn is_unique_violation(err: &DataError) -> bool {
    err.database_error::<sqlx::Error>()
        .and_then(sqlx::Error::as_database_error)
        .is_some_and(|db| db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = sqlx::Error::RowNotFound.into_data_error();
        assert!(matches!(err, DataError::NotFound(_)));
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn other_errors_are_wrapped_unchanged() {
        let err = sqlx::Error::PoolTimedOut.into_data_error();
        assert!(matches!(
            err.database_error::<sqlx::Error>(),
            Some(sqlx::Error::PoolTimedOut)
        ));
    }
}
