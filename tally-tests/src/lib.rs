mod accounts;
mod cache;
mod increments;
mod memberships;
mod notes;
mod raw;
mod transactions;

use log::LevelFilter;
use std::env;
use tally::{Driver, Entity, Store};

pub use accounts::Account;
pub use memberships::{Membership, Role, Settings};
pub use notes::{Note, Session};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Create the table of `E` when missing, delete its rows and forget what the cache holds.
pub(crate) async fn reset<D: Driver, E: Entity>(store: &Store<D>) {
    store
        .create_table::<E>()
        .await
        .unwrap_or_else(|e| panic!("Failed to create the table `{}`: {:#}", E::table(), e));
    store
        .execute_raw(&format!("DELETE FROM {}", E::table()), &[], None)
        .await
        .unwrap_or_else(|e| panic!("Failed to empty the table `{}`: {:#}", E::table(), e));
    store.clear_cache();
}

/// Run the whole suite against `store`. The tables are created when missing and emptied first.
pub async fn execute_tests<D: Driver>(store: Store<D>) {
    accounts::accounts(&store).await;
    accounts::where_safety(&store).await;
    cache::cache_coherence(&store).await;
    cache::high_frequency(&store).await;
    cache::separator_in_keys(&store).await;
    increments::increments(&store).await;
    increments::concurrent_increments(&store).await;
    increments::concurrent_counters(&store).await;
    memberships::memberships(&store).await;
    notes::generated_keys(&store).await;
    notes::uncached(&store).await;
    raw::raw_templates(&store).await;
    transactions::idempotent_commit(&store).await;
    transactions::rollback(&store).await;
    transactions::rollback_on_drop(&store).await;
    transactions::run_in_transaction(&store).await;
    transactions::select_for_update(&store).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
