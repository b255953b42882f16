/// A value type representing one persistable row.
///
/// The identity is optional: it is absent until the first save and stable
/// afterwards. `with_id` borrows the receiver immutably and returns a new
/// value, so assigning a generated key never touches the caller's copy.
///
/// # Example
///
/// ```
/// use slate_data::Entity;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct User {
///     id: Option<i64>,
///     name: String,
/// }
///
/// impl Entity for User {
///     type Id = i64;
///     fn id(&self) -> Option<&i64> { self.id.as_ref() }
///     fn with_id(&self, id: i64) -> Self { User { id: Some(id), ..self.clone() } }
/// }
///
/// let transient = User { id: None, name: "ada".into() };
/// let persisted = transient.with_id(7);
/// assert_eq!(transient.id(), None);
/// assert_eq!(persisted.id(), Some(&7));
/// ```
pub trait Entity: Clone + Send + Sync + Unpin + 'static {
    type Id: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> Option<&Self::Id>;

    fn with_id(&self, id: Self::Id) -> Self;

    /// `true` once the entity carries an identity.
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
}
