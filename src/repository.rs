use std::sync::Arc;

use log::{debug, warn, Logger};
use rand::Rng;

use crate::db::Db;
use crate::donor::{Activity, Donor, DonorFilter, DonorSubmission, Id, Stats};
use crate::errors::BackendError;
use crate::validation::validate;

/// The probability that a new donor is marked as verified.
const VERIFIED_PROBABILITY: f64 = 0.7;

/// The donor operations, on top of whatever `Db` it is given.
#[derive(Clone)]
pub struct DonorRepository {
    logger: Arc<Logger>,
    db: Arc<dyn Db + Send + Sync>,
}

impl DonorRepository {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db + Send + Sync>) -> Self {
        DonorRepository { logger, db }
    }

    /// Donors matching `filter`, ordered by name.
    pub async fn list(&self, filter: &DonorFilter) -> Result<Vec<Donor>, BackendError> {
        debug!(self.logger, "Listing donors..."; "blood_group" => ?filter.blood_group, "city" => ?filter.city_contains);

        self.db.retrieve_all(filter).await
    }

    pub async fn get(&self, id: Id) -> Result<Donor, BackendError> {
        self.db
            .retrieve(id)
            .await?
            .ok_or(BackendError::NonExistentId(id.into()))
    }

    /// Validates and stores a new donor, returning its ID.
    ///
    /// The phone check and the insertion are separate statements, so two
    /// concurrent registrations with the same phone can both succeed.
    pub async fn create(&self, submission: DonorSubmission) -> Result<Id, BackendError> {
        let donor = validate(submission)?;

        debug!(self.logger, "Checking for duplicate phone...");
        if self.db.phone_exists(donor.phone()).await? {
            return Err(BackendError::DuplicatePhone);
        }

        let verified = rand::thread_rng().gen_bool(VERIFIED_PROBABILITY);

        debug!(self.logger, "Inserting donor..."; "verified" => verified);
        let id = self.db.insert(donor, verified).await?;
        debug!(self.logger, "Inserted donor"; "id" => id);

        Ok(id)
    }

    pub async fn delete(&self, id: Id) -> Result<(), BackendError> {
        debug!(self.logger, "Deleting donor..."; "id" => id);

        self.db.delete(id).await
    }

    pub async fn stats(&self) -> Result<Stats, BackendError> {
        let counts = self.db.count().await?;
        let emergency_status = rand::thread_rng().gen_range(1..=5);

        Ok(Stats::from_counts(counts, emergency_status))
    }

    /// The most recent registrations, newest first. Storage errors are
    /// logged and produce an empty feed.
    pub async fn recent_activity(&self, limit: i64) -> Vec<Activity> {
        match self.db.retrieve_recent(limit).await {
            Ok(donors) => donors.into_iter().map(Activity::from).collect(),
            Err(e) => {
                warn!(self.logger, "Failed to fetch recent activity"; "error" => ?e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::memory::MemoryDb;
    use crate::donor::BloodGroup;
    use crate::errors::ValidationError;

    fn repository() -> (Arc<MemoryDb>, DonorRepository) {
        let db = Arc::new(MemoryDb::new());
        let repository = DonorRepository::new(Arc::new(log::discard_logger()), db.clone());

        (db, repository)
    }

    fn submission(name: &str, blood_group: &str, phone: &str, city: &str) -> DonorSubmission {
        serde_json::from_value(json!({
            "name": name,
            "bloodGroup": blood_group,
            "age": 29,
            "gender": "F",
            "phone": phone,
            "city": city,
            "state": "MH",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn created_donors_can_be_retrieved() {
        let (_, repository) = repository();

        let id = repository
            .create(submission("Asha Rao", "B+", "9876543210", "Pune"))
            .await
            .unwrap();
        assert!(id > 0);

        let donor = repository.get(id).await.unwrap();
        assert_eq!(donor.id, id);
        assert_eq!(donor.name, "Asha Rao");
        assert_eq!(donor.blood_group, BloodGroup::BPositive);
        assert_eq!(donor.age, 29);
        assert_eq!(donor.phone, "9876543210");
        assert_eq!(donor.city, "Pune");
        assert_eq!(donor.state, "MH");
    }

    #[tokio::test]
    async fn invalid_submissions_are_not_stored() {
        let (db, repository) = repository();

        let mut too_young = submission("Asha Rao", "B+", "9876543210", "Pune");
        too_young.age = Some(json!(17));

        match repository.create(too_young).await {
            Err(BackendError::Validation(ValidationError::AgeOutOfRange)) => {}
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn duplicate_phones_are_rejected() {
        let (db, repository) = repository();

        repository
            .create(submission("Asha Rao", "B+", "9876543210", "Pune"))
            .await
            .unwrap();

        match repository
            .create(submission("Ravi Kumar", "O+", "9876543210", "Delhi"))
            .await
        {
            Err(BackendError::DuplicatePhone) => {}
            other => panic!("unexpected result: {:?}", other),
        }

        assert_eq!(db.len(), 1);
    }

    #[tokio::test]
    async fn deleted_donors_are_gone() {
        let (_, repository) = repository();

        let id = repository
            .create(submission("Asha Rao", "B+", "9876543210", "Pune"))
            .await
            .unwrap();

        repository.delete(id).await.unwrap();

        assert!(matches!(
            repository.get(id).await,
            Err(BackendError::NonExistentId(i)) if i == i64::from(id)
        ));
        assert!(matches!(
            repository.delete(id).await,
            Err(BackendError::NonExistentId(_))
        ));
    }

    #[tokio::test]
    async fn lists_are_filtered_and_sorted_by_name() {
        let (_, repository) = repository();

        for (name, group, phone, city) in &[
            ("Zoya", "O+", "1111111111", "Delhi"),
            ("Arjun", "O+", "2222222222", "Kendelton"),
            ("Meera", "A-", "3333333333", "New Delhi"),
            ("Bilal", "O+", "4444444444", "Pune"),
        ] {
            repository
                .create(submission(name, group, phone, city))
                .await
                .unwrap();
        }

        let names = |donors: Vec<Donor>| donors.into_iter().map(|d| d.name).collect::<Vec<_>>();

        let o_positive = repository
            .list(&DonorFilter::new(Some("O+".to_owned()), None))
            .await
            .unwrap();
        assert_eq!(names(o_positive), vec!["Arjun", "Bilal", "Zoya"]);

        let del = repository
            .list(&DonorFilter::new(None, Some("DEL".to_owned())))
            .await
            .unwrap();
        assert_eq!(names(del), vec!["Arjun", "Meera", "Zoya"]);

        let both = repository
            .list(&DonorFilter::new(Some("O+".to_owned()), Some("del".to_owned())))
            .await
            .unwrap();
        assert_eq!(names(both), vec!["Arjun", "Zoya"]);
    }

    #[tokio::test]
    async fn stats_count_donors() {
        let (_, repository) = repository();

        let empty = repository.stats().await.unwrap();
        assert_eq!(empty.active_donors, 0);
        assert_eq!(empty.lives_saved, 0);
        assert_eq!(empty.success_rate, 0.0);
        assert!((1..=5).contains(&empty.emergency_status));

        for (i, phone) in ["1111111111", "2222222222", "3333333333", "4444444444", "5555555555"]
            .iter()
            .enumerate()
        {
            repository
                .create(submission(&format!("Donor {}", i), "AB+", phone, "Pune"))
                .await
                .unwrap();
        }

        let stats = repository.stats().await.unwrap();
        assert_eq!(stats.active_donors, 5);
        assert_eq!(stats.lives_saved, 7);
        assert!((0.0..=100.0).contains(&stats.success_rate));
    }

    #[tokio::test]
    async fn recent_activity_is_newest_first() {
        let (_, repository) = repository();

        repository
            .create(submission("Asha Rao", "B+", "9876543210", "Pune"))
            .await
            .unwrap();
        repository
            .create(submission("Ravi Kumar", "O+", "9876543211", "Delhi"))
            .await
            .unwrap();

        let activity = repository.recent_activity(5).await;
        let descriptions: Vec<_> = activity.iter().map(|a| a.description.as_str()).collect();

        assert_eq!(
            descriptions,
            vec![
                "New donor Ravi Kumar registered in Delhi",
                "New donor Asha Rao registered in Pune"
            ]
        );
        assert_eq!(repository.recent_activity(1).await.len(), 1);
    }

    #[tokio::test]
    async fn recent_activity_swallows_storage_errors() {
        let (db, repository) = repository();

        repository
            .create(submission("Asha Rao", "B+", "9876543210", "Pune"))
            .await
            .unwrap();
        db.set_unavailable(true);

        assert!(repository.recent_activity(5).await.is_empty());
        assert!(repository.stats().await.unwrap_err().is_storage_error());
    }
}
