//! Building blocks shared by resources and data sources

pub mod filter;
pub mod flatten;
pub mod retry;
pub mod state_refresh;

pub use filter::{apply_filter, DataSourceFilter, Filter, Row};
pub use flatten::{flatten, flatten_all, rows_to_dynamic};
pub use retry::{retry, RetryError, RetryFailure};
pub use state_refresh::{build_state_conf, wait_for_all, BoxError, StateChangeConf, WaitError};
