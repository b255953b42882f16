use crate::lock::LockDialect;
use crate::query::Dialect;

/// The SQL flavour a repository renders for, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SqlProfile {
    pub dialect: Dialect,
    pub lock: LockDialect,
}

impl SqlProfile {
    pub fn new(dialect: Dialect, lock: LockDialect) -> Self {
        Self { dialect, lock }
    }

    /// Derive both dialects from a driver or backend name.
    ///
    /// SQLite rejects every row-lock clause, so the SQLite dialect gets
    /// [`LockDialect::NoRowLocks`] instead of the detected lock dialect.
    pub fn detect(driver_name: &str) -> Self {
        let dialect = Dialect::detect(driver_name);
        let lock = match dialect {
            Dialect::Sqlite => LockDialect::NoRowLocks,
            _ => LockDialect::detect(driver_name),
        };
        Self { dialect, lock }
    }

    /// Derive the profile from a connection URL's scheme
    /// (`postgres://`, `mysql://`, `sqlite::memory:`...).
    pub fn from_url(url: &str) -> Self {
        let scheme = url.split(':').next().unwrap_or_default();
        Self::detect(scheme)
    }
}
