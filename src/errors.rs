use thiserror::Error;
use warp::reject;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error, including failure to acquire a
    /// connection from the pool.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents a donor submission that failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Represents an attempt to register a phone number twice.
    #[error("A donor with this phone number already exists")]
    DuplicatePhone,

    /// Represents a numeric ID that doesn't refer to any donor,
    /// including one too large to be a donor ID at all.
    #[error("Donor not found")]
    NonExistentId(i64),

    /// Represents an ID that couldn't be parsed.
    #[error("Invalid donor ID")]
    InvalidId(String),

    /// Represents a request body that couldn't be parsed.
    #[error("Malformed request body")]
    MalformedBody,

    /// Represents an unusable configuration value.
    #[error("invalid value {value:?} for {name}")]
    InvalidSetting { name: String, value: String },
}

impl BackendError {
    /// Whether the error originated in the storage layer.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, BackendError::Sqlx { .. })
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(source: sqlx::Error) -> Self {
        BackendError::Sqlx { source }
    }
}

impl reject::Reject for BackendError {}

/// Enumerates the ways a donor submission can be invalid. The
/// messages are shown to the person filling in the form.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All required fields must be provided")]
    MissingFields,

    #[error("Age must be a whole number")]
    InvalidAge,

    #[error("Age must be between 18 and 65")]
    AgeOutOfRange,

    #[error("Invalid blood group")]
    InvalidBloodGroup,

    #[error("Name must be at least 2 characters long")]
    NameTooShort,

    #[error("Please enter a valid phone number")]
    InvalidPhone,

    #[error("City is required")]
    CityTooShort,

    #[error("State is required")]
    StateTooShort,

    #[error("Last donation must be a date (YYYY-MM-DD)")]
    InvalidLastDonation,
}
