//! Build metadata shared by the server, its helpers and the logger.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const REVISION: Option<&str> = option_env!("DONORS_REVISION");

pub const BUILD_TIMESTAMP: Option<&str> = option_env!("DONORS_BUILD_TIMESTAMP");
