//! Transaction contract used by generated repositories.
//!
//! Every repository operation runs inside one transaction. The non-`_tx`
//! methods of a generated repository all follow the same protocol, provided
//! here by [`within`]: begin, run the `_tx` sibling, roll back on failure,
//! commit on success.

use crate::dialect::Statement;
use crate::error::{Error, Result};
use crate::value::Row;
use std::any::{type_name, Any};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often a running statement is checked for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// Cancellation and deadline carried into every statement.
///
/// Clones share the cancel flag, so cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context sharing this one's cancel flag. The earlier of the
    /// two deadlines wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Context {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` without one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// `Err` once the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run `f` on the current thread and call `interrupt` from a watcher
    /// thread if the context is cancelled before `f` returns.
    ///
    /// Drivers whose statements block without polling use this to abort
    /// them server side.
    pub fn interrupt_on_cancel<T>(
        &self,
        interrupt: impl FnOnce() + Send,
        f: impl FnOnce() -> T,
    ) -> T {
        let (done, finished) = mpsc::channel::<()>();
        thread::scope(|scope| {
            scope.spawn(move || loop {
                match finished.recv_timeout(CANCEL_POLL) {
                    Err(RecvTimeoutError::Timeout) if self.is_cancelled() => {
                        interrupt();
                        return;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => return,
                }
            });
            let result = f();
            drop(done);
            result
        })
    }
}

/// An open transaction.
///
/// Implementations execute compiled statements and must honour the
/// [`Context`] passed with each one.
pub trait Tx: Any + Send {
    /// Run a statement that returns no rows, yielding the affected row count.
    fn execute(&mut self, ctx: &Context, stmt: &Statement) -> Result<u64>;

    fn query(&mut self, ctx: &Context, stmt: &Statement) -> Result<Vec<Row>>;

    /// Identity assigned by the last INSERT, for stores without `RETURNING`.
    fn last_insert_id(&mut self) -> Result<i64>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A store that can begin transactions.
pub trait Database: Send + Sync {
    type Tx: Tx;

    fn begin(&self, ctx: &Context) -> Result<Self::Tx>;
}

/// Recover the concrete transaction type a repository was generated for.
pub fn downcast<T: Tx>(tx: &mut dyn Tx) -> Result<&mut T> {
    tx.as_any_mut()
        .downcast_mut::<T>()
        .ok_or(Error::TxTypeMismatch {
            expected: type_name::<T>(),
        })
}

/// Roll back after `err`. Returns `err` unchanged when the rollback
/// succeeds, otherwise an error carrying both failures.
pub fn rollback(tx: Box<dyn Tx>, err: Error) -> Error {
    match tx.rollback() {
        Ok(()) => err,
        Err(rollback) => {
            log::warn!("rollback failed after {err}: {rollback}");
            Error::Rollback {
                source: Box::new(err),
                rollback: Box::new(rollback),
            }
        }
    }
}

/// Run `f` inside `tx`: commit when it succeeds, roll back when it fails.
/// A failed operation is never committed.
pub fn within<T>(mut tx: Box<dyn Tx>, f: impl FnOnce(&mut dyn Tx) -> Result<T>) -> Result<T> {
    match f(&mut *tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => Err(rollback(tx, err)),
    }
}
