//! Transaction helper for multi-statement writes.

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction
///
/// The transaction commits when `f` returns `Ok` and rolls back otherwise.
/// Errors raised by `f` are returned unchanged; failures to begin or commit
/// are converted through `E: From<DbErr>`.
///
/// ```rust,ignore
/// let inserted = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         product::Entity::insert(model).exec(txn).await?;
///         Ok::<_, ServiceError>(1)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T, E>(db: &DatabaseConnection, f: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
    T: Send,
    E: std::error::Error + From<DbErr> + Send,
{
    db.transaction(f).await.map_err(|e| match e {
        TransactionError::Connection(db_err) => E::from(db_err),
        TransactionError::Transaction(err) => err,
    })
}
