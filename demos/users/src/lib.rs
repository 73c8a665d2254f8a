//! The `users` repository, generated by `build.rs` from `schema/user.yaml`.

macro_rules! generated {
    ($($module:ident),* $(,)?) => {
        $(
            pub mod $module {
                include!(concat!(env!("OUT_DIR"), "/user/", stringify!($module), ".rs"));
            }
        )*
    };
}

pub mod user {
    generated!(
        meta,
        predicates,
        sorts,
        aggregates,
        repository,
        postgres,
        sqlite,
        sqlite_quoted,
    );

    pub use meta::{Column, User, COLLECTION, COLUMNS};
    pub use repository::{Aggregator, Creator, Deleter, Queryer, Repository, Updater};
}
