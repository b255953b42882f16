//! Slate: deferred, dialect-aware CRUD repositories.
//!
//! This facade crate re-exports the Slate sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use slate::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature    | Default | Crate                        |
//! |------------|---------|------------------------------|
//! | `sqlx`     | **yes** | `slate-data-sqlx`            |
//! | `sqlite`   | no      | `slate-data-sqlx/sqlite`     |
//! | `postgres` | no      | `slate-data-sqlx/postgres`   |
//! | `mysql`    | no      | `slate-data-sqlx/mysql`      |
//!
//! `slate-data` (entities, actions, the repository contract) is always present.

use tracing_subscriber::EnvFilter;

pub use slate_data;

#[cfg(feature = "sqlx")]
pub use slate_data_sqlx;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

/// Initialize the global tracing subscriber with an env-filter.
///
/// Respects the `RUST_LOG` environment variable. Falls back to
/// [`DEFAULT_LOG_FILTER`] when `RUST_LOG` is not set. Statement text is
/// logged at `trace` under the `slate_data_sqlx` target.
///
/// Call this once, at the very start of `main`, before any tracing macro.
/// A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Unified prelude. Import everything with `use slate::prelude::*`.
pub mod prelude {
    pub use crate::init_tracing;
    pub use slate_data::prelude::*;

    #[cfg(feature = "sqlx")]
    pub use slate_data_sqlx::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(DEFAULT_LOG_FILTER.parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
