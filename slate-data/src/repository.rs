use crate::action::DbAction;
use crate::entity::Entity;
use crate::page::{Page, Pageable};

/// Generic CRUD contract over one entity type.
///
/// Every method returns a [`DbAction`] description; nothing runs until the
/// action is handed to an [`ActionRunner`](crate::ActionRunner).
///
/// Backends implement the required methods. The provided ones hold the
/// strategy decisions and are normally not overridden:
///
/// - [`save`](Repository::save) picks the insert path from the entity's
///   identity state.
/// - [`update`](Repository::update) and [`lock`](Repository::lock) reject
///   transient entities before any action is built.
pub trait Repository<T: Entity>: Send + Sync {
    type Conn: Send + 'static;

    fn find_all(&self) -> DbAction<Self::Conn, Vec<T>>;

    /// The row with identity `id`. Fails with
    /// [`DataError::Ambiguous`](crate::DataError::Ambiguous) if several match.
    fn find_one(&self, id: T::Id) -> DbAction<Self::Conn, Option<T>>;

    fn find_page(&self, pageable: &Pageable) -> DbAction<Self::Conn, Page<T>>;

    fn count(&self) -> DbAction<Self::Conn, i64>;

    /// Insert every entity in one action. `None` when the store cannot
    /// report an affected-row count for batches.
    fn batch_insert(&self, entities: Vec<T>) -> DbAction<Self::Conn, Option<u64>>;

    /// Rows removed: 0 or 1.
    fn delete(&self, id: T::Id) -> DbAction<Self::Conn, u64>;

    /// Insert without an identity and yield the key the store generated.
    fn insert_generated(&self, entity: T) -> DbAction<Self::Conn, T::Id>;

    /// Insert carrying the entity's own identity. Duplicate keys surface as
    /// the store's constraint error.
    fn insert_with_id(&self, id: T::Id, entity: T) -> DbAction<Self::Conn, u64>;

    /// Overwrite the row with identity `id`; yields rows affected.
    fn update_by_id(&self, id: T::Id, entity: T) -> DbAction<Self::Conn, u64>;

    /// Select the row with identity `id` while taking an exclusive row lock.
    fn select_for_update(&self, id: T::Id) -> DbAction<Self::Conn, ()>;

    /// Persist `entity`.
    ///
    /// Without an identity the store generates one and the result is
    /// `entity.with_id(generated)`. With an identity the entity is inserted as
    /// is and returned unchanged.
    fn save(&self, entity: T) -> DbAction<Self::Conn, T> {
        match entity.id().cloned() {
            None => {
                let template = entity.clone();
                self.insert_generated(entity)
                    .map(move |id| template.with_id(id))
                    .named("save_generated_id")
            }
            Some(id) => self
                .insert_with_id(id, entity.clone())
                .map(move |_| entity)
                .named("save_predefined_id"),
        }
    }

    /// Overwrite the stored row with `entity`'s fields and yield `entity`
    /// itself; the row is not read back.
    ///
    /// # Panics
    ///
    /// If `entity` has no identity. Updating a never-persisted entity is a
    /// programming error, detected before any action exists.
    fn update(&self, entity: T) -> DbAction<Self::Conn, T> {
        let Some(id) = entity.id().cloned() else {
            panic!(
                "cannot update a transient {}: entity has no identity",
                std::any::type_name::<T>()
            );
        };
        let result = entity.clone();
        self.update_by_id(id, entity)
            .map(move |_| result)
            .named("update")
    }

    /// Hold an exclusive lock on `entity`'s row and yield `entity` unchanged.
    ///
    /// Only meaningful inside a transaction: the lock is released when the
    /// enclosing transaction ends.
    ///
    /// # Panics
    ///
    /// If `entity` has no identity.
    fn lock(&self, entity: T) -> DbAction<Self::Conn, T> {
        let Some(id) = entity.id().cloned() else {
            panic!(
                "cannot lock a transient {}: entity has no identity",
                std::any::type_name::<T>()
            );
        };
        self.select_for_update(id)
            .map(move |_| entity)
            .named("lock")
    }

    fn exists(&self, id: T::Id) -> DbAction<Self::Conn, bool> {
        self.find_one(id).map(|found| found.is_some()).named("exists")
    }

    /// Flag `work` for atomic execution. Transaction semantics belong to the runner.
    fn execute_transactionally<R: Send + 'static>(
        &self,
        work: DbAction<Self::Conn, R>,
    ) -> DbAction<Self::Conn, R> {
        work.transactionally()
    }
}
