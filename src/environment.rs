use std::sync::Arc;

use log::Logger;

use crate::db::Db;
use crate::repository::DonorRepository;

/// What every request handler gets a copy of.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub repository: DonorRepository,
    pub config: Config,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db + Send + Sync>, config: Config) -> Self {
        let repository = DonorRepository::new(logger.clone(), db);

        Self {
            logger,
            repository,
            config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) api_path: String,
    pub(crate) recent_activity_limit: i64,
}

impl Config {
    pub fn new(api_path: String) -> Self {
        Self {
            api_path,
            recent_activity_limit: 5,
        }
    }

    pub fn api_path(&self) -> &str {
        &self.api_path
    }
}
