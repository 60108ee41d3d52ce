//! The search page: a filterable donor table with per-row deletion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use time::{Date, OffsetDateTime};

use super::api::{ClientError, DonorApi, SearchFilter};
use super::format::{format_last_donation, format_phone, results_count};
use super::schedule::{Debouncer, Tasks};
use super::MessageKind;
use crate::donor::{Donor, Id};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const ROW_REMOVAL_DELAY: Duration = Duration::from_millis(300);
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

pub const SEARCHING_TEXT: &str = "Searching...";
pub const LOAD_FAILURE_MESSAGE: &str = "Failed to load donors";
pub const DELETE_FAILURE_MESSAGE: &str = "Failed to delete donor";
pub const DELETED_MESSAGE: &str = "Donor deleted successfully";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// One table row, ready to display.
#[derive(Clone, Debug, PartialEq)]
pub struct DonorRow {
    pub id: Id,
    pub name: String,
    pub blood_group: String,
    pub age: i32,
    pub gender: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub last_donation: String,
    pub status: &'static str,
}

impl DonorRow {
    pub fn new(donor: Donor, today: Date) -> Self {
        DonorRow {
            id: donor.id,
            blood_group: donor.blood_group.to_string(),
            age: donor.age,
            phone: format_phone(&donor.phone),
            last_donation: format_last_donation(donor.last_donation, today),
            status: if donor.verified {
                "Verified"
            } else {
                "Unverified"
            },
            name: donor.name,
            gender: donor.gender,
            city: donor.city,
            state: donor.state,
        }
    }
}

pub trait SearchView: Send + Sync {
    /// Replaces the table with a spinner and the count with
    /// `Searching...`.
    fn show_loading(&self);

    fn show_results(&self, rows: Vec<DonorRow>, count: String);

    /// Hides the table in favour of the no-results panel.
    fn show_no_results(&self, count: String);

    fn show_error(&self, message: &str);

    /// Asks the user to confirm deleting a donor.
    fn confirm_delete(&self, id: Id) -> bool;

    /// Starts the row's exit transition.
    fn fade_out_row(&self, id: Id);

    fn remove_row(&self, id: Id);

    fn set_results_count(&self, count: String);

    fn show_toast(&self, toast: u64, kind: MessageKind, message: &str);

    fn remove_toast(&self, toast: u64);
}

#[derive(Default)]
struct State {
    filter: SearchFilter,
    rows: usize,
}

struct Shared {
    api: Arc<dyn DonorApi + Send + Sync>,
    view: Arc<dyn SearchView>,
    state: Mutex<State>,
}

pub struct SearchPage {
    shared: Arc<Shared>,
    debouncer: Debouncer,
    tasks: Tasks,
    next_toast: AtomicU64,
}

impl SearchPage {
    pub fn new(api: Arc<dyn DonorApi + Send + Sync>, view: Arc<dyn SearchView>) -> Self {
        SearchPage {
            shared: Arc::new(Shared {
                api,
                view,
                state: Mutex::new(State::default()),
            }),
            debouncer: Debouncer::new(SEARCH_DEBOUNCE),
            tasks: Tasks::new(),
            next_toast: AtomicU64::new(1),
        }
    }

    /// Shows every donor.
    pub async fn load(&self) {
        self.search().await;
    }

    pub async fn search(&self) {
        self.debouncer.cancel();
        self.shared.search().await;
    }

    pub async fn on_blood_group_change(&self, blood_group: &str) {
        self.shared.state().filter.blood_group = blood_group.to_owned();
        self.search().await;
    }

    pub fn on_city_input(&self, city: &str) {
        self.shared.state().filter.city = city.to_owned();

        let shared = self.shared.clone();
        self.debouncer.call(async move { shared.search().await });
    }

    pub async fn on_enter(&self) {
        self.search().await;
    }

    /// Deletes a donor after confirmation, then takes its row out of
    /// the table without searching again.
    pub async fn delete(&self, id: Id) {
        let view = &self.shared.view;

        if !view.confirm_delete(id) {
            return;
        }

        match self.shared.api.delete(id).await {
            Ok(()) => {
                view.fade_out_row(id);

                let shared = self.shared.clone();
                self.tasks
                    .after(ROW_REMOVAL_DELAY, async move { shared.remove_row(id) });

                self.toast(MessageKind::Success, DELETED_MESSAGE);
            }
            Err(e @ ClientError::Api { .. }) => {
                let message = e.server_message().unwrap_or(DELETE_FAILURE_MESSAGE);
                self.toast(MessageKind::Error, message);
            }
            Err(_) => self.toast(MessageKind::Error, NETWORK_ERROR_MESSAGE),
        }
    }

    fn toast(&self, kind: MessageKind, message: &str) {
        let toast = self.next_toast.fetch_add(1, Ordering::SeqCst);
        self.shared.view.show_toast(toast, kind, message);

        let view = self.shared.view.clone();
        self.tasks
            .after(TOAST_DURATION, async move { view.remove_toast(toast) });
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn search(&self) {
        let filter = self.state().filter.clone();

        self.view.show_loading();

        match self.api.list(&filter).await {
            Ok(donors) => {
                self.state().rows = donors.len();

                if donors.is_empty() {
                    self.view.show_no_results(results_count(0));
                } else {
                    let count = results_count(donors.len());
                    let today = OffsetDateTime::now_utc().date();
                    let rows = donors
                        .into_iter()
                        .map(|donor| DonorRow::new(donor, today))
                        .collect();

                    self.view.show_results(rows, count);
                }
            }
            Err(ClientError::Api { .. }) => self.view.show_error(LOAD_FAILURE_MESSAGE),
            Err(_) => self.view.show_error(NETWORK_ERROR_MESSAGE),
        }
    }

    fn remove_row(&self, id: Id) {
        self.view.remove_row(id);

        let rows = {
            let mut state = self.state();
            state.rows = state.rows.saturating_sub(1);
            state.rows
        };

        if rows == 0 {
            self.view.show_no_results(results_count(0));
        } else {
            self.view.set_results_count(results_count(rows));
        }
    }
}
