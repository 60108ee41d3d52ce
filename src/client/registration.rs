//! The registration form.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::api::{ClientError, DonorApi};
use super::schedule::Tasks;
use super::MessageKind;
use crate::donor::{DonorSubmission, Id};
use crate::errors::ValidationError;
use crate::validation::{check_age, check_name, check_phone, check_text};

pub const NAVIGATION_DELAY: Duration = Duration::from_secs(2);
pub const MESSAGE_DURATION: Duration = Duration::from_secs(5);
pub const DASHBOARD_PAGE: &str = "index.html";

pub const SUCCESS_MESSAGE: &str =
    "Registration successful! Thank you for becoming a blood donor.";
pub const INVALID_FORM_MESSAGE: &str = "Please correct the errors above";
pub const FAILURE_MESSAGE: &str = "Registration failed. Please try again.";
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your connection and try again.";

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Field {
    Name,
    BloodGroup,
    Age,
    Gender,
    Phone,
    City,
    State,
    LastDonation,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::BloodGroup,
        Field::Age,
        Field::Gender,
        Field::Phone,
        Field::City,
        Field::State,
        Field::LastDonation,
    ];
}

/// The raw contents of the form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormValues {
    pub name: String,
    pub blood_group: String,
    pub age: String,
    pub gender: String,
    pub phone: String,
    pub city: String,
    pub state: String,
    pub last_donation: String,
}

impl FormValues {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::BloodGroup => &self.blood_group,
            Field::Age => &self.age,
            Field::Gender => &self.gender,
            Field::Phone => &self.phone,
            Field::City => &self.city,
            Field::State => &self.state,
            Field::LastDonation => &self.last_donation,
        }
    }

    /// The request body for these values. Ages go out as numbers when
    /// they start with one.
    pub fn to_submission(&self) -> DonorSubmission {
        let age = match leading_integer(&self.age) {
            Some(age) => Value::from(age),
            None => Value::from(self.age.clone()),
        };
        let last_donation = Some(self.last_donation.clone()).filter(|d| !d.trim().is_empty());

        DonorSubmission {
            name: Some(self.name.clone()),
            blood_group: Some(self.blood_group.clone()),
            age: Some(age),
            gender: Some(self.gender.clone()),
            phone: Some(self.phone.clone()),
            city: Some(self.city.clone()),
            state: Some(self.state.clone()),
            last_donation,
        }
    }
}

/// Checks one field the way the form does when it loses focus,
/// returning the message to show under it.
pub fn validate_field(field: Field, value: &str) -> Result<(), String> {
    let value = value.trim();

    let result = match field {
        Field::Name => check_name(value),
        Field::Age => leading_integer(value)
            .ok_or(ValidationError::AgeOutOfRange)
            .and_then(check_age),
        Field::Phone => check_phone(value),
        Field::City => check_text(value, ValidationError::CityTooShort),
        Field::State => check_text(value, ValidationError::StateTooShort),
        Field::BloodGroup if value.is_empty() => {
            return Err("BloodGroup selection is required".to_owned())
        }
        Field::Gender if value.is_empty() => {
            return Err("Gender selection is required".to_owned())
        }
        Field::BloodGroup | Field::Gender | Field::LastDonation => Ok(()),
    };

    result.map_err(|e| e.to_string())
}

/// Reads the integer at the start of a form value, ignoring whatever
/// follows it, so `"25 years"` is 25 the way the page reads it.
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let unsigned = value.trim_start_matches(|c| c == '+' || c == '-');
    if value.len() - unsigned.len() > 1 {
        return None;
    }

    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    value[..value.len() - unsigned.len() + digits].parse().ok()
}

pub trait RegistrationView: Send + Sync {
    fn show_field_error(&self, field: Field, message: &str);

    fn clear_field_error(&self, field: Field);

    /// Toggles the submit button between its normal and
    /// `Registering...` states.
    fn set_submitting(&self, submitting: bool);

    fn show_message(&self, kind: MessageKind, message: &str);

    fn hide_message(&self);

    fn reset_form(&self);

    fn navigate(&self, page: &str);
}

pub struct RegistrationForm {
    api: Arc<dyn DonorApi + Send + Sync>,
    view: Arc<dyn RegistrationView>,
    tasks: Tasks,
}

impl RegistrationForm {
    pub fn new(api: Arc<dyn DonorApi + Send + Sync>, view: Arc<dyn RegistrationView>) -> Self {
        RegistrationForm {
            api,
            view,
            tasks: Tasks::new(),
        }
    }

    pub fn on_blur(&self, field: Field, value: &str) -> bool {
        match validate_field(field, value) {
            Ok(()) => {
                self.view.clear_field_error(field);
                true
            }
            Err(message) => {
                self.view.show_field_error(field, &message);
                false
            }
        }
    }

    pub fn on_input(&self, field: Field) {
        self.view.clear_field_error(field);
    }

    /// Validates every field and, if they all pass, registers the
    /// donor. Returns the new donor's ID on success.
    pub async fn submit(&self, values: &FormValues) -> Option<Id> {
        let mut valid = true;
        for field in Field::ALL.iter() {
            valid &= self.on_blur(*field, values.get(*field));
        }

        if !valid {
            self.view.show_message(MessageKind::Error, INVALID_FORM_MESSAGE);
            return None;
        }

        self.view.set_submitting(true);
        let result = self.api.register(&values.to_submission()).await;
        self.view.set_submitting(false);

        match result {
            Ok(id) => {
                self.view.show_message(MessageKind::Success, SUCCESS_MESSAGE);
                self.view.reset_form();

                let view = self.view.clone();
                self.tasks.after(MESSAGE_DURATION, async move { view.hide_message() });

                let view = self.view.clone();
                self.tasks
                    .after(NAVIGATION_DELAY, async move { view.navigate(DASHBOARD_PAGE) });

                Some(id)
            }
            Err(e @ ClientError::Api { .. }) => {
                let message = e.server_message().unwrap_or(FAILURE_MESSAGE);
                self.view.show_message(MessageKind::Error, message);
                None
            }
            Err(_) => {
                self.view.show_message(MessageKind::Error, NETWORK_ERROR_MESSAGE);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use tokio::time::sleep;

    use super::*;
    use crate::client::api::SearchFilter;
    use crate::donor::{Activity, Donor, Stats};

    #[derive(Default)]
    struct FakeApi {
        submissions: Mutex<Vec<DonorSubmission>>,
        response: Mutex<Option<Result<Id, ClientError>>>,
    }

    impl DonorApi for FakeApi {
        fn stats(&self) -> BoxFuture<Result<Stats, ClientError>> {
            unimplemented!()
        }

        fn recent_activity(&self) -> BoxFuture<Result<Vec<Activity>, ClientError>> {
            unimplemented!()
        }

        fn list(&self, _: &SearchFilter) -> BoxFuture<Result<Vec<Donor>, ClientError>> {
            unimplemented!()
        }

        fn register(&self, submission: &DonorSubmission) -> BoxFuture<Result<Id, ClientError>> {
            self.submissions.lock().unwrap().push(submission.clone());
            let response = self.response.lock().unwrap().take().unwrap_or(Ok(1));

            async move { response }.boxed()
        }

        fn delete(&self, _: Id) -> BoxFuture<Result<(), ClientError>> {
            unimplemented!()
        }
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        FieldError(Field, String),
        Cleared(Field),
        Submitting(bool),
        Message(MessageKind, String),
        Hidden,
        Reset,
        Navigated(String),
    }

    #[derive(Default)]
    struct FakeView {
        events: Mutex<Vec<Event>>,
    }

    impl FakeView {
        fn record(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }

        fn has(&self, event: &Event) -> bool {
            self.events.lock().unwrap().contains(event)
        }

        fn messages(&self) -> Vec<(MessageKind, String)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    Event::Message(kind, message) => Some((*kind, message.clone())),
                    _ => None,
                })
                .collect()
        }
    }

    impl RegistrationView for FakeView {
        fn show_field_error(&self, field: Field, message: &str) {
            self.record(Event::FieldError(field, message.to_owned()));
        }

        fn clear_field_error(&self, field: Field) {
            self.record(Event::Cleared(field));
        }

        fn set_submitting(&self, submitting: bool) {
            self.record(Event::Submitting(submitting));
        }

        fn show_message(&self, kind: MessageKind, message: &str) {
            self.record(Event::Message(kind, message.to_owned()));
        }

        fn hide_message(&self) {
            self.record(Event::Hidden);
        }

        fn reset_form(&self) {
            self.record(Event::Reset);
        }

        fn navigate(&self, page: &str) {
            self.record(Event::Navigated(page.to_owned()));
        }
    }

    fn values() -> FormValues {
        FormValues {
            name: "Asha Rao".to_owned(),
            blood_group: "B+".to_owned(),
            age: "29".to_owned(),
            gender: "F".to_owned(),
            phone: "9876543210".to_owned(),
            city: "Pune".to_owned(),
            state: "MH".to_owned(),
            last_donation: String::new(),
        }
    }

    fn form() -> (Arc<FakeApi>, Arc<FakeView>, RegistrationForm) {
        let api = Arc::new(FakeApi::default());
        let view = Arc::new(FakeView::default());
        let form = RegistrationForm::new(api.clone(), view.clone());

        (api, view, form)
    }

    #[test]
    fn fields_are_checked_individually() {
        assert_eq!(
            validate_field(Field::Name, " A "),
            Err("Name must be at least 2 characters long".to_owned())
        );
        assert_eq!(
            validate_field(Field::Age, "17"),
            Err("Age must be between 18 and 65".to_owned())
        );
        assert_eq!(
            validate_field(Field::Age, "old"),
            Err("Age must be between 18 and 65".to_owned())
        );
        assert_eq!(
            validate_field(Field::Phone, "12345"),
            Err("Please enter a valid phone number".to_owned())
        );
        assert_eq!(
            validate_field(Field::City, "P"),
            Err("City is required".to_owned())
        );
        assert_eq!(
            validate_field(Field::State, ""),
            Err("State is required".to_owned())
        );
        assert_eq!(
            validate_field(Field::BloodGroup, ""),
            Err("BloodGroup selection is required".to_owned())
        );
        assert_eq!(
            validate_field(Field::Gender, ""),
            Err("Gender selection is required".to_owned())
        );
        assert_eq!(validate_field(Field::LastDonation, ""), Ok(()));
        assert_eq!(validate_field(Field::Age, " 65 "), Ok(()));
        assert_eq!(validate_field(Field::Age, "25 years"), Ok(()));
        assert_eq!(
            validate_field(Field::Age, "years 25"),
            Err("Age must be between 18 and 65".to_owned())
        );
    }

    #[test]
    fn ages_are_read_from_their_leading_digits() {
        assert_eq!(leading_integer("42"), Some(42));
        assert_eq!(leading_integer("  25 years"), Some(25));
        assert_eq!(leading_integer("30.5"), Some(30));
        assert_eq!(leading_integer("-7"), Some(-7));
        assert_eq!(leading_integer("+-7"), None);
        assert_eq!(leading_integer("abc"), None);
        assert_eq!(leading_integer(""), None);

        let submission = FormValues {
            age: "25 years".to_owned(),
            ..values()
        }
        .to_submission();
        assert_eq!(submission.age, Some(Value::from(25)));
    }

    #[test]
    fn submissions_carry_numeric_ages() {
        let submission = values().to_submission();

        assert_eq!(submission.age, Some(Value::from(29)));
        assert_eq!(submission.last_donation, None);
        assert_eq!(submission.blood_group.as_deref(), Some("B+"));
    }

    #[tokio::test]
    async fn input_clears_the_field_error() {
        let (_, view, form) = form();

        assert!(!form.on_blur(Field::Name, "A"));
        form.on_input(Field::Name);

        assert!(view.has(&Event::FieldError(
            Field::Name,
            "Name must be at least 2 characters long".to_owned()
        )));
        assert!(view.has(&Event::Cleared(Field::Name)));
    }

    #[tokio::test]
    async fn invalid_forms_are_not_sent() {
        let (api, view, form) = form();
        let mut values = values();
        values.age = "70".to_owned();

        assert_eq!(form.submit(&values).await, None);

        assert!(api.submissions.lock().unwrap().is_empty());
        assert_eq!(
            view.messages(),
            vec![(MessageKind::Error, INVALID_FORM_MESSAGE.to_owned())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn successful_registrations_go_back_to_the_dashboard() {
        let (api, view, form) = form();
        *api.response.lock().unwrap() = Some(Ok(7));

        assert_eq!(form.submit(&values()).await, Some(7));

        assert!(view.has(&Event::Submitting(true)));
        assert!(view.has(&Event::Submitting(false)));
        assert!(view.has(&Event::Reset));
        assert_eq!(
            view.messages(),
            vec![(MessageKind::Success, SUCCESS_MESSAGE.to_owned())]
        );
        assert!(!view.has(&Event::Navigated(DASHBOARD_PAGE.to_owned())));

        sleep(NAVIGATION_DELAY + Duration::from_millis(10)).await;
        assert!(view.has(&Event::Navigated(DASHBOARD_PAGE.to_owned())));
        assert!(!view.has(&Event::Hidden));

        sleep(MESSAGE_DURATION).await;
        assert!(view.has(&Event::Hidden));
    }

    #[tokio::test]
    async fn server_messages_are_shown() {
        let (api, view, form) = form();
        *api.response.lock().unwrap() = Some(Err(ClientError::Api {
            status: 400,
            message: Some("A donor with this phone number already exists".to_owned()),
        }));

        assert_eq!(form.submit(&values()).await, None);

        assert_eq!(
            view.messages(),
            vec![(
                MessageKind::Error,
                "A donor with this phone number already exists".to_owned()
            )]
        );
        assert!(!view.has(&Event::Reset));
    }

    #[tokio::test]
    async fn errors_without_a_message_use_the_generic_one() {
        let (api, view, form) = form();
        *api.response.lock().unwrap() = Some(Err(ClientError::Api {
            status: 500,
            message: None,
        }));

        form.submit(&values()).await;

        assert_eq!(
            view.messages(),
            vec![(MessageKind::Error, FAILURE_MESSAGE.to_owned())]
        );
    }

    #[tokio::test]
    async fn unreachable_servers_are_network_errors() {
        let (api, view, form) = form();
        *api.response.lock().unwrap() = Some(Err(ClientError::Url {
            source: url::ParseError::EmptyHost,
        }));

        form.submit(&values()).await;

        assert_eq!(
            view.messages(),
            vec![(MessageKind::Error, NETWORK_ERROR_MESSAGE.to_owned())]
        );
    }
}
