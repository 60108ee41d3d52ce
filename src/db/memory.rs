use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::BoxFuture;
use futures::FutureExt;
use time::OffsetDateTime;

use crate::db::Db;
use crate::donor::{Donor, DonorCounts, DonorFilter, Id, NewDonor, RecentDonor};
use crate::errors::BackendError;

/// A `Db` that keeps donors in memory. It can be switched into an
/// unavailable mode where every statement fails like an exhausted pool.
#[derive(Default)]
pub struct MemoryDb {
    state: RwLock<State>,
    unavailable: AtomicBool,
}

#[derive(Default)]
struct State {
    last_id: Id,
    donors: Vec<Donor>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Adds a donor as-is, bypassing validation. The ID is replaced
    /// with the next free one, which is returned.
    pub fn seed(&self, mut donor: Donor) -> Id {
        let mut state = self.write();
        state.last_id += 1;
        donor.id = state.last_id;
        state.donors.push(donor);
        state.last_id
    }

    pub fn len(&self) -> usize {
        self.read().donors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(BackendError::Sqlx {
                source: sqlx::Error::PoolTimedOut,
            })
        } else {
            Ok(())
        }
    }
}

impl Db for MemoryDb {
    fn count(&self) -> BoxFuture<Result<DonorCounts, BackendError>> {
        async move {
            self.check_available()?;

            let state = self.read();
            let verified = state.donors.iter().filter(|d| d.verified).count();

            Ok(DonorCounts {
                total: state.donors.len() as i64,
                verified: verified as i64,
            })
        }
        .boxed()
    }

    fn delete(&self, id: Id) -> BoxFuture<Result<(), BackendError>> {
        async move {
            self.check_available()?;

            let mut state = self.write();
            let before = state.donors.len();
            state.donors.retain(|d| d.id != id);

            if state.donors.len() == before {
                Err(BackendError::NonExistentId(id.into()))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn insert(&self, donor: NewDonor, verified: bool) -> BoxFuture<Result<Id, BackendError>> {
        async move {
            self.check_available()?;

            let mut state = self.write();
            state.last_id += 1;
            let id = state.last_id;
            state
                .donors
                .push(donor.into_donor(id, verified, OffsetDateTime::now_utc()));

            Ok(id)
        }
        .boxed()
    }

    fn phone_exists(&self, phone: &str) -> BoxFuture<Result<bool, BackendError>> {
        let phone = phone.to_owned();

        async move {
            self.check_available()?;

            let state = self.read();

            Ok(state.donors.iter().any(|d| d.phone == phone))
        }
        .boxed()
    }

    fn retrieve(&self, id: Id) -> BoxFuture<Result<Option<Donor>, BackendError>> {
        async move {
            self.check_available()?;

            let state = self.read();

            Ok(state.donors.iter().find(|d| d.id == id).cloned())
        }
        .boxed()
    }

    fn retrieve_all(&self, filter: &DonorFilter) -> BoxFuture<Result<Vec<Donor>, BackendError>> {
        let filter = filter.clone();

        async move {
            self.check_available()?;

            let state = self.read();
            let mut donors: Vec<Donor> = state
                .donors
                .iter()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect();
            donors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

            Ok(donors)
        }
        .boxed()
    }

    fn retrieve_recent(&self, limit: i64) -> BoxFuture<Result<Vec<RecentDonor>, BackendError>> {
        async move {
            self.check_available()?;

            let state = self.read();
            let mut donors: Vec<&Donor> = state.donors.iter().collect();
            donors.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

            Ok(donors
                .into_iter()
                .take(limit.max(0) as usize)
                .map(|d| RecentDonor {
                    name: d.name.clone(),
                    city: d.city.clone(),
                    created_at: d.created_at,
                })
                .collect())
        }
        .boxed()
    }
}
