//! Deferred database actions.
//!
//! Repository methods never touch a connection. They return a [`DbAction`]
//! describing the work; an [`ActionRunner`] owns the pool and decides when,
//! where and inside which transaction the description runs.

use crate::error::DataError;
use futures_util::future::BoxFuture;
use std::future::Future;

/// Future produced by running an action against a borrowed connection.
pub type ActionFuture<'c, T> = BoxFuture<'c, Result<T, DataError>>;

type Work<C, T> = Box<dyn for<'c> FnOnce(&'c mut C) -> ActionFuture<'c, T> + Send>;

/// A description of a unit of database work over connection type `C`.
///
/// Building an action performs no I/O. Actions compose with [`map`] and
/// [`and_then`]; the composed action runs every step on the same connection.
///
/// [`map`]: DbAction::map
/// [`and_then`]: DbAction::and_then
#[must_use = "actions do nothing until handed to an ActionRunner"]
pub struct DbAction<C, T> {
    work: Work<C, T>,
    transactional: bool,
    label: &'static str,
}

impl<C, T> DbAction<C, T>
where
    C: Send + 'static,
    T: Send + 'static,
{
    pub fn new<F>(f: F) -> Self
    where
        F: for<'c> FnOnce(&'c mut C) -> ActionFuture<'c, T> + Send + 'static,
    {
        Self {
            work: Box::new(f),
            transactional: false,
            label: "action",
        }
    }

    /// An action that yields `value` without using the connection.
    pub fn successful(value: T) -> Self {
        Self::new(move |_conn| Box::pin(async move { Ok(value) })).named("successful")
    }

    /// An action that fails with `err` without using the connection.
    pub fn failed(err: DataError) -> Self {
        Self::new(move |_conn| Box::pin(async move { Err(err) })).named("failed")
    }

    /// Name used in log events emitted by runners.
    pub fn named(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Flag the action for execution inside a single transaction.
    ///
    /// Only the outermost flag is consulted by a runner: an action composed
    /// from a transactional one is transactional as a whole.
    pub fn transactionally(mut self) -> Self {
        self.transactional = true;
        self
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    pub fn map<U, F>(self, f: F) -> DbAction<C, U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let transactional = self.transactional;
        let label = self.label;
        let work = self.work;
        let mut mapped = DbAction::<C, U>::new(move |conn: &mut C| {
            let fut = work(conn);
            Box::pin(async move { fut.await.map(f) })
        });
        mapped.transactional = transactional;
        mapped.label = label;
        mapped
    }

    /// Run `self`, then the action built from its result, on the same connection.
    pub fn and_then<U, F>(self, f: F) -> DbAction<C, U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> DbAction<C, U> + Send + 'static,
    {
        let transactional = self.transactional;
        let label = self.label;
        let work = self.work;
        let mut chained = DbAction::<C, U>::new(move |conn: &mut C| {
            Box::pin(async move {
                let value = work(&mut *conn).await?;
                f(value).run(conn).await
            })
        });
        chained.transactional = transactional;
        chained.label = label;
        chained
    }

    /// Execute the description against `conn`.
    pub fn run(self, conn: &mut C) -> ActionFuture<'_, T> {
        (self.work)(conn)
    }
}

impl<C, T> std::fmt::Debug for DbAction<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbAction")
            .field("label", &self.label)
            .field("transactional", &self.transactional)
            .finish_non_exhaustive()
    }
}

/// Executes actions against connections it owns.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
pub trait ActionRunner: Send + Sync {
    type Conn: Send + 'static;

    /// Run `action`, inside a transaction when [`DbAction::is_transactional`].
    /// A transactional action that fails is rolled back.
    fn run<T: Send + 'static>(
        &self,
        action: DbAction<Self::Conn, T>,
    ) -> impl Future<Output = Result<T, DataError>> + Send;

    fn run_transactionally<T: Send + 'static>(
        &self,
        action: DbAction<Self::Conn, T>,
    ) -> impl Future<Output = Result<T, DataError>> + Send {
        self.run(action.transactionally())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn push(entry: &'static str) -> DbAction<Log, usize> {
        DbAction::<Log, usize>::new(move |log: &mut Log| {
            Box::pin(async move {
                log.push(entry);
                Ok(log.len())
            })
        })
    }

    #[tokio::test]
    async fn building_an_action_does_nothing() {
        let mut log = Log::new();
        let action = push("a");
        assert!(log.is_empty());
        assert_eq!(action.run(&mut log).await.unwrap(), 1);
        assert_eq!(log, vec!["a"]);
    }

    #[tokio::test]
    async fn and_then_runs_on_the_same_connection() {
        let mut log = Log::new();
        let action = push("a")
            .and_then(|_| push("b"))
            .map(|len| len * 10);
        assert_eq!(action.run(&mut log).await.unwrap(), 20);
        assert_eq!(log, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failure_short_circuits() {
        let mut log = Log::new();
        let action = DbAction::<Log, usize>::failed(DataError::NotFound("row".into()))
            .and_then(|_| push("never"));
        let err = action.run(&mut log).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn successful_ignores_connection() {
        let mut log = Log::new();
        let value = DbAction::<Log, _>::successful(5).run(&mut log).await.unwrap();
        assert_eq!(value, 5);
        assert!(log.is_empty());
    }

    #[test]
    fn flags_survive_composition() {
        let action = push("a").named("insert").transactionally().map(|n| n + 1);
        assert!(action.is_transactional());
        assert_eq!(action.label(), "insert");
        assert!(!push("b").is_transactional());
    }
}
