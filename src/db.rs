use futures::future::BoxFuture;

use crate::donor::{Donor, DonorCounts, DonorFilter, Id, NewDonor, RecentDonor};
use crate::errors::BackendError;

pub mod memory;

/// The SQL statements run against the `donors` table. Each method is a
/// single statement on a connection borrowed from the pool for the
/// duration of the call.
pub trait Db {
    fn count(&self) -> BoxFuture<Result<DonorCounts, BackendError>>;

    fn delete(&self, id: Id) -> BoxFuture<Result<(), BackendError>>;

    fn insert(&self, donor: NewDonor, verified: bool) -> BoxFuture<Result<Id, BackendError>>;

    fn phone_exists(&self, phone: &str) -> BoxFuture<Result<bool, BackendError>>;

    fn retrieve(&self, id: Id) -> BoxFuture<Result<Option<Donor>, BackendError>>;

    fn retrieve_all(&self, filter: &DonorFilter) -> BoxFuture<Result<Vec<Donor>, BackendError>>;

    fn retrieve_recent(&self, limit: i64) -> BoxFuture<Result<Vec<RecentDonor>, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use std::time::Duration;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow},
    };
    use time::{Date, OffsetDateTime};

    use crate::config::DatabaseSettings;
    use crate::donor::{BloodGroup, Donor, DonorCounts, DonorFilter, Id, NewDonor, RecentDonor};
    use crate::errors::BackendError;

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }

        /// Creates a pool from the given settings without opening any
        /// connections yet.
        pub fn connect_lazy(settings: &DatabaseSettings) -> Result<Self, BackendError> {
            let options = match &settings.connection_string {
                Some(connection_string) => {
                    connection_string
                        .parse::<PgConnectOptions>()
                        .map_err(|_| BackendError::InvalidSetting {
                            name: "BACKEND_DB_CONNECTION_STRING".to_owned(),
                            value: connection_string.clone(),
                        })?
                }
                None => PgConnectOptions::new()
                    .host(&settings.host)
                    .port(settings.port)
                    .username(&settings.user)
                    .password(&settings.password)
                    .database(&settings.name),
            };

            let pool = PgPoolOptions::new()
                .max_connections(settings.pool_size)
                .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
                .connect_lazy_with(options);

            Ok(PgDb::new(pool))
        }

        /// Borrows a connection and runs a trivial statement on it.
        pub async fn check_connection(&self) -> Result<(), BackendError> {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }

        pub fn pool(&self) -> &PgPool {
            &self.pool
        }
    }

    // these can be simplified once async functions in traits are usable
    // behind `dyn`
    impl super::Db for PgDb {
        fn count(&self) -> BoxFuture<Result<DonorCounts, BackendError>> {
            async move {
                let query = sqlx::query_as::<_, (i64, i64)>(include_str!("queries/count.sql"));

                let (total, verified) = query.fetch_one(&self.pool).await.map_err(map_sqlx_error)?;

                Ok(DonorCounts { total, verified })
            }
            .boxed()
        }

        fn delete(&self, id: Id) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/delete.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentId(id.into()))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn insert(&self, donor: NewDonor, verified: bool) -> BoxFuture<Result<Id, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create.sql"));

                let (id,): (Id,) = query
                    .bind(&donor.name)
                    .bind(donor.blood_group.as_str())
                    .bind(donor.age)
                    .bind(&donor.gender)
                    .bind(&donor.phone)
                    .bind(&donor.city)
                    .bind(&donor.state)
                    .bind(donor.last_donation)
                    .bind(verified)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(id)
            }
            .boxed()
        }

        fn phone_exists(&self, phone: &str) -> BoxFuture<Result<bool, BackendError>> {
            let phone = phone.to_owned();

            async move {
                let query = sqlx::query_as(include_str!("queries/phone_exists.sql"));

                let (exists,): (bool,) = query
                    .bind(phone)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(exists)
            }
            .boxed()
        }

        fn retrieve(&self, id: Id) -> BoxFuture<Result<Option<Donor>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve.sql"));

                let donor = query
                    .bind(id)
                    .try_map(|row: PgRow| donor_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(donor)
            }
            .boxed()
        }

        fn retrieve_all(&self, filter: &DonorFilter) -> BoxFuture<Result<Vec<Donor>, BackendError>> {
            let filter = filter.clone();

            async move {
                // one statement per combination of filters, so every
                // value is bound as a parameter
                let query = match (&filter.blood_group, &filter.city_contains) {
                    (None, None) => sqlx::query(include_str!("queries/retrieve_all.sql")),
                    (Some(blood_group), None) => {
                        sqlx::query(include_str!("queries/retrieve_by_blood_group.sql"))
                            .bind(blood_group)
                    }
                    (None, Some(city)) => sqlx::query(include_str!("queries/retrieve_by_city.sql"))
                        .bind(substring_pattern(city)),
                    (Some(blood_group), Some(city)) => sqlx::query(include_str!(
                        "queries/retrieve_by_blood_group_and_city.sql"
                    ))
                    .bind(blood_group)
                    .bind(substring_pattern(city)),
                };

                let donors = query
                    .try_map(|row: PgRow| donor_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(donors)
            }
            .boxed()
        }

        fn retrieve_recent(&self, limit: i64) -> BoxFuture<Result<Vec<RecentDonor>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_recent.sql"));

                let donors = query
                    .bind(limit)
                    .try_map(|row: PgRow| {
                        Ok(RecentDonor {
                            name: try_get(&row, "name")?,
                            city: try_get(&row, "city")?,
                            created_at: try_get(&row, "created_at")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(donors)
            }
            .boxed()
        }
    }

    fn donor_from_row(row: &PgRow) -> Result<Donor, sqlx::Error> {
        let blood_group: String = try_get(row, "blood_group")?;
        let blood_group: BloodGroup = blood_group.parse().map_err(|e| {
            // the table constraint should make this impossible
            sqlx::Error::Decode(Box::new(e))
        })?;

        let last_donation: Option<Date> = try_get(row, "last_donation")?;
        let created_at: OffsetDateTime = try_get(row, "created_at")?;

        Ok(Donor {
            id: try_get(row, "id")?,
            name: try_get(row, "name")?,
            blood_group,
            age: try_get(row, "age")?,
            gender: try_get(row, "gender")?,
            phone: try_get(row, "phone")?,
            city: try_get(row, "city")?,
            state: try_get(row, "state")?,
            last_donation,
            verified: try_get(row, "verified")?,
            created_at,
        })
    }

    /// Wraps user text in `%` after escaping the `LIKE` metacharacters,
    /// so the text only ever matches literally.
    fn substring_pattern(text: &str) -> String {
        let mut pattern = String::with_capacity(text.len() + 2);
        pattern.push('%');

        for c in text.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }

        pattern.push('%');
        pattern
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::Row;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        BackendError::Sqlx { source: error }
    }

    #[cfg(test)]
    mod tests {
        use super::substring_pattern;

        #[test]
        fn plain_text_is_wrapped() {
            assert_eq!(substring_pattern("del"), "%del%");
        }

        #[test]
        fn metacharacters_are_escaped() {
            assert_eq!(substring_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
        }
    }
}
