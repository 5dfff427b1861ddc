pub mod cache;
pub mod context;
pub mod date_format;
pub mod debounce;
pub mod errors;
pub mod filter;
pub mod generator;
pub mod models;
pub mod period;
pub mod settings;
pub mod vault;
pub mod view;
pub mod virtual_list;

pub use crate::cache::{CacheStats, PeriodCache};
pub use crate::context::{ContextSnapshot, ExistsFlags, SelectionContext};
pub use crate::debounce::RefreshDebouncer;
pub use crate::errors::{NavError, NavResult};
pub use crate::generator::Visibility;
pub use crate::models::{
    BlockReason, ColumnState, CreateRequest, Document, DocumentRef, DocumentSet, Granularity, PeriodItem,
};
pub use crate::settings::{FormatSet, NavigatorSettings, PeriodSettings};
pub use crate::vault::{DocumentCreator, DocumentSource, VaultSource};
pub use crate::view::PeriodView;
pub use crate::virtual_list::{RowHost, ViewportConfig, VirtualPeriodSelector};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Installs the JSON file logger. `RUST_LOG` overrides the `info` default.
pub fn init_tracing(log_dir: &Path) -> NavResult<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "periodic-nav.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| NavError::Internal(error.to_string()))
}
