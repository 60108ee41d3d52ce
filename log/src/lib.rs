use std::sync::Mutex;

use slog::Drain;
use slog::Fuse;
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Logger};

/// Builds the root logger: JSON records on stderr, written from a
/// background thread. With `env_logging`, records are filtered by
/// `RUST_LOG`.
pub fn initialize_logger() -> slog::Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);

    #[cfg(feature = "env_logging")]
    let drain = slog_envlogger::new(drain).ignore_res();

    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!("version" => info::VERSION, "revision" => info::REVISION, "build_timestamp" => info::BUILD_TIMESTAMP),
    )
}

/// Builds a logger that drops every record, for tests and tools that
/// don't need output.
pub fn discard_logger() -> slog::Logger {
    Logger::root(slog::Discard, o!())
}
