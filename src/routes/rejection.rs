use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    /// The message shown to the client. Storage failures get a
    /// per-request summary instead of the underlying error.
    pub fn message(&self) -> String {
        if self.error.is_storage_error() {
            self.context.failure_message().to_owned()
        } else {
            format!("{}", self.error)
        }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection::new(self.message())
    }
}

impl reject::Reject for Rejection {}

/// The JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    pub(crate) success: bool,
    pub(crate) message: String,
}

impl FlattenedRejection {
    pub fn new(message: impl Into<String>) -> Self {
        FlattenedRejection {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Context {
    Create,
    Delete { id: String },
    List,
    Retrieve { id: String },
    Stats,
}

impl Context {
    pub fn create() -> Context {
        Context::Create
    }

    pub fn delete(id: String) -> Context {
        Context::Delete { id }
    }

    pub fn list() -> Context {
        Context::List
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }

    pub fn stats() -> Context {
        Context::Stats
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Context::Create => "Failed to register donor",
            Context::Delete { .. } => "Failed to delete donor",
            Context::List => "Failed to fetch donors",
            Context::Retrieve { .. } => "Failed to fetch donor",
            Context::Stats => "Failed to fetch statistics",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;

    #[test]
    fn storage_errors_use_the_context_message() {
        let rejection = Rejection::new(
            Context::stats(),
            BackendError::Sqlx {
                source: sqlx::Error::PoolTimedOut,
            },
        );

        assert_eq!(rejection.message(), "Failed to fetch statistics");
    }

    #[test]
    fn other_errors_use_their_own_message() {
        let rejection = Rejection::new(
            Context::create(),
            BackendError::Validation(ValidationError::InvalidBloodGroup),
        );

        assert_eq!(rejection.message(), "Invalid blood group");
        assert_eq!(
            serde_json::to_value(rejection.flatten()).unwrap(),
            serde_json::json!({"success": false, "message": "Invalid blood group"})
        );
    }
}
