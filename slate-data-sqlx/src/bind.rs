use slate_data::TableMapping;
use sqlx::any::AnyArguments;
use sqlx::{Any, Decode, Encode, Type};

/// Query type the repository hands to [`BindColumns`].
pub type AnyQuery<'q> = sqlx::query::Query<'q, Any, AnyArguments<'q>>;

/// Binds an entity's non-identity values onto a statement.
///
/// Values must be bound in [`TableMapping::columns`] order; the identity
/// column is bound by the repository.
///
/// ```ignore
/// impl BindColumns for Users {
///     fn bind_columns<'q>(user: &User, query: AnyQuery<'q>) -> AnyQuery<'q> {
///         query.bind(user.name.clone()).bind(user.email.clone())
///     }
/// }
/// ```
pub trait BindColumns: TableMapping {
    fn bind_columns<'q>(entity: &Self::Entity, query: AnyQuery<'q>) -> AnyQuery<'q>;
}

/// Identity types the `Any` driver can bind and decode.
pub trait AnyId:
    for<'q> Encode<'q, Any> + for<'r> Decode<'r, Any> + Type<Any> + Send + Sync + Unpin + 'static
{
}

impl<T> AnyId for T where
    T: for<'q> Encode<'q, Any> + for<'r> Decode<'r, Any> + Type<Any> + Send + Sync + Unpin + 'static
{
}
