//! The generated `users` repository run against a real SQLite database, and
//! against a scripted database for the transaction protocol.

use std::any::Any;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use repogen::debug::{StatementEvent, StatementHook};
use repogen::driver::sqlite::SqliteDb;
use repogen::{Context, Database, Error, Result, Row, Statement, Tx};
use tempfile::TempDir;
use users_demo::user::aggregates::{avg, count, none};
use users_demo::user::postgres::PostgresRepository;
use users_demo::user::predicates::{
    age_gt, age_lt_col, avatar_is_not_null, email_is_null, name_eq, name_in, tags_eq,
};
use users_demo::user::sorts::{asc, desc};
use users_demo::user::sqlite::SqliteRepository;
use users_demo::user::sqlite_quoted::SqliteQuotedRepository;
use users_demo::user::{
    Aggregator, Column, Creator, Deleter, Queryer, Repository, Updater, User,
};

const SCHEMA: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    email TEXT,
    tags TEXT NOT NULL,
    avatar BLOB,
    visits INTEGER
)";

fn open() -> (TempDir, SqliteDb) {
    let tmp = TempDir::new().unwrap();
    let db = SqliteDb::open(tmp.path().join("users.db"));
    db.execute_batch(SCHEMA).unwrap();
    (tmp, db)
}

fn setup() -> (TempDir, SqliteRepository<SqliteDb>) {
    let (tmp, db) = open();
    (tmp, SqliteRepository::new(db))
}

fn person(name: &str, age: i32) -> Creator {
    Creator::new().name(name).age(age).tags(Vec::new())
}

fn seed(repo: &impl Repository) {
    let ctx = Context::background();
    repo.create_many(
        &ctx,
        vec![
            person("ada", 36).email("ada@example.com"),
            person("bob", 25).tags(vec!["admin".to_string()]),
            person("cy", 41),
            person("dee", 25).email("dee@example.com"),
        ],
    )
    .unwrap();
}

fn names(users: Vec<User>) -> Vec<String> {
    users.into_iter().map(|u| u.name).collect()
}

#[test]
fn test_create_returns_identity() {
    let (_tmp, repo) = setup();
    let ctx = Context::background();
    let first = repo.create(&ctx, person("ada", 36)).unwrap();
    let second = repo.create(&ctx, person("bob", 25)).unwrap();
    assert_eq!(first, 1);
    assert_eq!(second, 2);

    let ada = repo
        .query_one(&ctx, Queryer::new().filter([name_eq("ada".into())]))
        .unwrap();
    assert_eq!(
        ada,
        User {
            id: 1,
            name: "ada".into(),
            age: 36,
            email: None,
            tags: Vec::new(),
            avatar: None,
            visits: None,
        }
    );
}

#[test]
fn test_create_validates_every_required_field() {
    let (_tmp, repo) = setup();
    let ctx = Context::background();
    let err = repo
        .create(&ctx, Creator::new().email("x@example.com"))
        .unwrap_err();
    match err {
        Error::Validation(v) => assert_eq!(v.missing(), ["name", "age", "tags"]),
        other => panic!("expected validation error, got {other}"),
    }
    assert!(repo.query(&ctx, Queryer::new()).unwrap().is_empty());
}

#[test]
fn test_create_many_is_all_or_nothing() {
    let (_tmp, repo) = setup();
    let ctx = Context::background();
    repo.create_many(&ctx, Vec::new()).unwrap();

    let err = repo
        .create_many(&ctx, vec![person("ada", 36), Creator::new().name("bob")])
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(repo.query(&ctx, Queryer::new()).unwrap().is_empty());
}

#[test]
fn test_query_filters_sorts_and_pages() {
    let (_tmp, repo) = setup();
    seed(&repo);
    let ctx = Context::background();

    let older = repo
        .query(&ctx, Queryer::new().filter([age_gt(30)]).sort([asc(Column::Name)]))
        .unwrap();
    assert_eq!(names(older), ["ada", "cy"]);

    let page = repo
        .query(
            &ctx,
            Queryer::new()
                .sort([asc(Column::Age), desc(Column::Name)])
                .limit(2)
                .offset(1),
        )
        .unwrap();
    assert_eq!(names(page), ["bob", "ada"]);

    let skipped = repo
        .query(&ctx, Queryer::new().sort([asc(Column::Id)]).offset(3))
        .unwrap();
    assert_eq!(names(skipped), ["dee"]);

    let no_email = repo
        .query(&ctx, Queryer::new().filter([email_is_null()]).sort([asc(Column::Id)]))
        .unwrap();
    assert_eq!(names(no_email), ["bob", "cy"]);

    let listed = repo
        .query(
            &ctx,
            Queryer::new()
                .filter([name_in(["cy".to_string(), "dee".to_string()])])
                .sort([asc(Column::Name)]),
        )
        .unwrap();
    assert_eq!(names(listed), ["cy", "dee"]);

    // an empty list adds no condition
    let all = repo
        .query(&ctx, Queryer::new().filter([name_in(Vec::new())]))
        .unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn test_column_and_array_predicates() {
    let (_tmp, repo) = setup();
    seed(&repo);
    let ctx = Context::background();

    // every age is larger than every id
    let none_younger = repo
        .query(&ctx, Queryer::new().filter([age_lt_col(Column::Id)]))
        .unwrap();
    assert!(none_younger.is_empty());

    let admins = repo
        .query(&ctx, Queryer::new().filter([tags_eq(vec!["admin".to_string()])]))
        .unwrap();
    assert_eq!(names(admins.clone()), ["bob"]);
    assert_eq!(admins[0].tags, ["admin"]);
}

#[test]
fn test_bytes_and_unsigned_fields_round_trip() {
    let (_tmp, repo) = setup();
    let ctx = Context::background();
    let avatar: Vec<u8> = vec![0, 1, 127, 255];
    let id = repo
        .create(&ctx, person("ada", 36).avatar(avatar.clone()).visits(7u64))
        .unwrap();

    let ada = repo
        .query_one(&ctx, Queryer::new().filter([avatar_is_not_null()]))
        .unwrap();
    assert_eq!(ada.id, id);
    assert_eq!(ada.avatar, Some(avatar));
    assert_eq!(ada.visits, Some(7));

    // SQLite integers are signed, so this is refused rather than wrapped
    let err = repo
        .update(&ctx, Updater::new().visits(u64::MAX))
        .unwrap_err();
    assert!(matches!(err, Error::Sqlite(_)), "{err}");
    let ada = repo.query_one(&ctx, Queryer::new()).unwrap();
    assert_eq!(ada.visits, Some(7));
}

#[test]
fn test_query_one_without_rows() {
    let (_tmp, repo) = setup();
    let ctx = Context::background();
    let err = repo
        .query_one(&ctx, Queryer::new().filter([name_eq("nobody".into())]))
        .unwrap_err();
    assert!(matches!(err, Error::NoRows));
}

#[test]
fn test_update_only_writes_set_fields() {
    let (_tmp, repo) = setup();
    seed(&repo);
    let ctx = Context::background();

    assert_eq!(repo.update(&ctx, Updater::new()).unwrap(), 0);

    let affected = repo
        .update(
            &ctx,
            Updater::new().age(26).filter([age_gt(24), email_is_null()]),
        )
        .unwrap();
    assert_eq!(affected, 2);

    let bob = repo
        .query_one(&ctx, Queryer::new().filter([name_eq("bob".into())]))
        .unwrap();
    assert_eq!(bob.age, 26);
    assert_eq!(bob.email, None);
    assert_eq!(bob.tags, ["admin"]);

    repo.update(
        &ctx,
        Updater::new()
            .email("bob@example.com")
            .filter([name_eq("bob".into())]),
    )
    .unwrap();
    repo.update(
        &ctx,
        Updater::new().clear_email().filter([name_eq("ada".into())]),
    )
    .unwrap();

    let bob = repo
        .query_one(&ctx, Queryer::new().filter([name_eq("bob".into())]))
        .unwrap();
    assert_eq!(bob.email.as_deref(), Some("bob@example.com"));
    let ada = repo
        .query_one(&ctx, Queryer::new().filter([name_eq("ada".into())]))
        .unwrap();
    assert_eq!(ada.email, None);
    assert_eq!(ada.age, 36);
}

#[test]
fn test_delete() {
    let (_tmp, repo) = setup();
    seed(&repo);
    let ctx = Context::background();
    assert_eq!(repo.delete(&ctx, Deleter::new().filter([age_gt(30)])).unwrap(), 2);
    assert_eq!(repo.query(&ctx, Queryer::new()).unwrap().len(), 2);
    assert_eq!(repo.delete(&ctx, Deleter::new()).unwrap(), 2);
}

#[test]
fn test_aggregate_grouped() {
    let (_tmp, repo) = setup();
    seed(&repo);
    let ctx = Context::background();

    let mut out: Vec<(i64, i64)> = Vec::new();
    repo.aggregate(
        &ctx,
        Aggregator::new(&mut out)
            .aggregate([none(Column::Age), count(Column::Id)])
            .group([Column::Age])
            .sort([asc(Column::Age)]),
    )
    .unwrap();
    assert_eq!(out, [(25, 2), (36, 1), (41, 1)]);

    let mut avg_out: Vec<(f64,)> = Vec::new();
    repo.aggregate(&ctx, Aggregator::new(&mut avg_out).aggregate([avg(Column::Age)]))
        .unwrap();
    assert_eq!(avg_out, [(31.75,)]);
}

#[test]
fn test_aggregate_shape_mismatch_runs_nothing() {
    let (_tmp, repo) = setup();
    let events = Arc::new(Recorder::default());
    let repo = repo.with_hook(events.clone());
    let ctx = Context::background();

    let mut out: Vec<(i64,)> = Vec::new();
    let err = repo
        .aggregate(
            &ctx,
            Aggregator::new(&mut out).aggregate([none(Column::Age), count(Column::Id)]),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "aggregate columns and destination field count should match: \
         2 aggregate columns, 1 destination fields"
    );
    assert!(events.sql().is_empty());
}

#[test]
fn test_caller_owned_transaction() {
    let (_tmp, repo) = setup();
    let ctx = Context::background();

    let mut tx = repo.tx(&ctx).unwrap();
    repo.create_tx(&ctx, &mut *tx, person("ada", 36)).unwrap();
    let inside = repo.query_tx(&ctx, &mut *tx, Queryer::new()).unwrap();
    assert_eq!(inside.len(), 1);
    tx.rollback().unwrap();

    assert!(repo.query(&ctx, Queryer::new()).unwrap().is_empty());
}

#[test]
fn test_cancelled_context_rolls_back() {
    let (_tmp, repo) = setup();
    let ctx = Context::background();
    let cancelled = Context::background();
    cancelled.cancel();

    let err = repo.create(&cancelled, person("ada", 36)).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(repo.query(&ctx, Queryer::new()).unwrap().is_empty());
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    fn sql(&self) -> Vec<(String, String)> {
        self.events.lock().unwrap().clone()
    }
}

impl StatementHook for Recorder {
    fn on_statement(&self, event: &StatementEvent<'_>) {
        self.events
            .lock()
            .unwrap()
            .push((event.op.to_string(), event.sql.to_string()));
    }
}

#[test]
fn test_hook_sees_compiled_statements() {
    let (_tmp, repo) = setup();
    let events = Arc::new(Recorder::default());
    let repo = repo.with_hook(events.clone());
    let ctx = Context::background();

    repo.create(&ctx, person("ada", 36)).unwrap();
    repo.query(
        &ctx,
        Queryer::new()
            .filter([name_eq("ada".into())])
            .sort([desc(Column::Id)])
            .limit(10),
    )
    .unwrap();

    assert_eq!(
        events.sql(),
        [
            (
                "create".to_string(),
                "INSERT INTO users (name,age,email,tags,avatar,visits) VALUES (?,?,?,?,?,?)"
                    .to_string()
            ),
            (
                "query".to_string(),
                "SELECT id,name,age,email,tags,avatar,visits FROM users WHERE name = ? \
                 ORDER BY id DESC LIMIT 10"
                    .to_string()
            ),
        ]
    );
}

#[test]
fn test_quoted_backend_runs_on_sqlite() {
    let (_tmp, db) = open();
    let events = Arc::new(Recorder::default());
    let repo = SqliteQuotedRepository::new(db).with_hook(events.clone());
    seed(&repo);
    let ctx = Context::background();

    let older = repo
        .query(&ctx, Queryer::new().filter([age_gt(30)]).sort([asc(Column::Name)]))
        .unwrap();
    assert_eq!(names(older), ["ada", "cy"]);

    let sql = events.sql();
    assert!(sql[0].1.starts_with("INSERT INTO `users` (`name`,`age`,"), "{}", sql[0].1);
    assert_eq!(
        sql[1].1,
        "SELECT `id`,`name`,`age`,`email`,`tags`,`avatar`,`visits` FROM `users` \
         WHERE `age` > ? ORDER BY `name` ASC"
    );
}

type Log = Arc<Mutex<Vec<&'static str>>>;

/// A database whose statements all fail, optionally followed by a failing
/// rollback.
struct ScriptedDb {
    log: Log,
    fail_rollback: bool,
}

struct ScriptedTx {
    log: Log,
    fail_rollback: bool,
}

impl Database for ScriptedDb {
    type Tx = ScriptedTx;

    fn begin(&self, _ctx: &Context) -> Result<ScriptedTx> {
        self.log.lock().unwrap().push("begin");
        Ok(ScriptedTx {
            log: Arc::clone(&self.log),
            fail_rollback: self.fail_rollback,
        })
    }
}

impl Tx for ScriptedTx {
    fn execute(&mut self, _ctx: &Context, _stmt: &Statement) -> Result<u64> {
        self.log.lock().unwrap().push("execute");
        Err(Error::Conversion("disk on fire".into()))
    }

    fn query(&mut self, _ctx: &Context, _stmt: &Statement) -> Result<Vec<Row>> {
        self.log.lock().unwrap().push("query");
        Err(Error::Conversion("disk on fire".into()))
    }

    fn last_insert_id(&mut self) -> Result<i64> {
        Ok(0)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().push("commit");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().push("rollback");
        if self.fail_rollback {
            return Err(Error::Conversion("connection lost".into()));
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn scripted(fail_rollback: bool) -> (Log, PostgresRepository<ScriptedDb>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let db = ScriptedDb {
        log: Arc::clone(&log),
        fail_rollback,
    };
    (log, PostgresRepository::new(db))
}

#[test]
fn test_failed_query_rolls_back_and_never_commits() {
    let (log, repo) = scripted(false);
    let err = repo.query(&Context::background(), Queryer::new()).unwrap_err();
    assert_eq!(err.to_string(), "Conversion error: disk on fire");
    assert_eq!(*log.lock().unwrap(), ["begin", "query", "rollback"]);
}

#[test]
fn test_postgres_create_reads_returning_row() {
    let (log, repo) = scripted(false);
    let err = repo
        .create(&Context::background(), person("ada", 36))
        .unwrap_err();
    assert!(matches!(err, Error::Conversion(_)));
    // the identity comes back from the INSERT itself
    assert_eq!(*log.lock().unwrap(), ["begin", "query", "rollback"]);
}

#[test]
fn test_failed_rollback_keeps_both_errors() {
    let (log, repo) = scripted(true);
    let err = repo.query(&Context::background(), Queryer::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Conversion error: disk on fire: rollback error: Conversion error: connection lost"
    );
    assert_eq!(*log.lock().unwrap(), ["begin", "query", "rollback"]);
}

#[test]
fn test_empty_writes_run_no_statement_and_commit() {
    let (log, repo) = scripted(false);
    let ctx = Context::background();
    repo.create_many(&ctx, Vec::new()).unwrap();
    assert_eq!(repo.update(&ctx, Updater::new()).unwrap(), 0);
    assert_eq!(
        *log.lock().unwrap(),
        ["begin", "commit", "begin", "commit"]
    );
}

#[test]
fn test_aggregate_shape_is_checked_before_executing() {
    let (log, repo) = scripted(false);
    let mut out: Vec<(i64,)> = Vec::new();
    let err = repo
        .aggregate(
            &Context::background(),
            Aggregator::new(&mut out).aggregate([none(Column::Age), count(Column::Id)]),
        )
        .unwrap_err();
    assert!(matches!(err, Error::AggregateShapeMismatch { columns: 2, fields: 1 }));
    assert_eq!(*log.lock().unwrap(), ["begin", "rollback"]);
}

#[test]
fn test_foreign_transaction_is_rejected() {
    let (_tmp, repo) = setup();
    let (_log, other) = scripted(false);
    let ctx = Context::background();

    let mut tx = other.tx(&ctx).unwrap();
    let err = repo.query_tx(&ctx, &mut *tx, Queryer::new()).unwrap_err();
    assert!(matches!(err, Error::TxTypeMismatch { .. }));
    assert!(err.to_string().starts_with("expecting tx to be "));

    // nothing to write, so the transaction is never inspected
    repo.create_many_tx(&ctx, &mut *tx, Vec::new()).unwrap();
    tx.rollback().unwrap();
}
