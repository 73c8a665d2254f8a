//! Statement reporting side channel.
//!
//! A hook observes every compiled statement before it runs. It never
//! changes control flow.

use crate::dialect::Statement;
use crate::error::Error;
use crate::value::Value;

/// One compiled statement as seen by a [`StatementHook`].
#[derive(Debug)]
pub struct StatementEvent<'a> {
    /// Repository operation, e.g. `"query"`.
    pub op: &'static str,
    pub sql: &'a str,
    pub args: &'a [Value],
    /// Compilation failure, when the statement could not be built.
    pub error: Option<&'a Error>,
}

pub trait StatementHook: Send + Sync {
    fn on_statement(&self, event: &StatementEvent<'_>);
}

/// Forwards events to `log::debug!` under the `repogen` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHook;

impl StatementHook for LogHook {
    fn on_statement(&self, event: &StatementEvent<'_>) {
        match event.error {
            Some(err) => log::debug!(target: "repogen", "op={} error={}", event.op, err),
            None => log::debug!(
                target: "repogen",
                "op={} stmt={:?} args={:?}",
                event.op,
                event.sql,
                event.args
            ),
        }
    }
}

/// Report a compiled statement, or the error that prevented compiling it.
pub fn report(
    hook: Option<&dyn StatementHook>,
    op: &'static str,
    compiled: std::result::Result<&Statement, &Error>,
) {
    let Some(hook) = hook else {
        return;
    };
    let event = match compiled {
        Ok(stmt) => StatementEvent {
            op,
            sql: &stmt.sql,
            args: &stmt.args,
            error: None,
        },
        Err(err) => StatementEvent {
            op,
            sql: "",
            args: &[],
            error: Some(err),
        },
    };
    hook.on_statement(&event);
}
