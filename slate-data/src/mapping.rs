use crate::entity::Entity;

/// Association between an entity type and its backing table.
///
/// Implemented on a marker type per table so the same entity can be mapped
/// to more than one table if needed.
///
/// ```ignore
/// struct Users;
///
/// impl TableMapping for Users {
///     type Entity = User;
///     fn table_name() -> &'static str { "users" }
///     fn id_column() -> &'static str { "id" }
///     fn columns() -> &'static [&'static str] { &["name", "email"] }
/// }
/// ```
pub trait TableMapping: Send + Sync + 'static {
    type Entity: Entity;

    fn table_name() -> &'static str;

    fn id_column() -> &'static str;

    /// Non-identity columns, in the order their values are bound.
    fn columns() -> &'static [&'static str];

    /// Identity column followed by `columns()`.
    fn all_columns() -> Vec<&'static str> {
        let mut all = Vec::with_capacity(Self::columns().len() + 1);
        all.push(Self::id_column());
        all.extend_from_slice(Self::columns());
        all
    }

    fn has_column(name: &str) -> bool {
        Self::id_column() == name || Self::columns().contains(&name)
    }
}
