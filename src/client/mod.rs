//! Controllers for the three pages. Each one drives a view trait and
//! talks to the server through [`DonorApi`](api::DonorApi); rendering
//! is left to whatever implements the view.

pub mod api;
pub mod dashboard;
pub mod format;
pub mod registration;
pub mod schedule;
pub mod search;

pub use api::{ClientError, DonorApi, HttpApi, SearchFilter};
pub use dashboard::{Dashboard, DashboardView};
pub use registration::{RegistrationForm, RegistrationView};
pub use search::{SearchPage, SearchView};

/// How a message is styled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKind {
    Success,
    Error,
}
