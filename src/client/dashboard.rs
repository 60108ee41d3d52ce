//! The dashboard: four headline figures and a feed of recent
//! registrations, both refreshed on a timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use super::api::DonorApi;
use super::format::{animated_value, format_rate, group_thousands, time_ago};
use super::schedule::Tasks;
use crate::donor::{Activity, Stats};

pub const STATS_INTERVAL: Duration = Duration::from_secs(30);
pub const ACTIVITY_INTERVAL: Duration = Duration::from_secs(60);
pub const ANIMATION_DURATION: Duration = Duration::from_millis(2000);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Shown instead of real figures when the stats can't be loaded.
pub const FALLBACK_STATS: Stats = Stats {
    lives_saved: 1247,
    active_donors: 892,
    success_rate: 94.7,
    emergency_status: 3,
};

const FALLBACK_ACTIVITY: [(&str, i64); 4] = [
    ("New donor registered in Mumbai", 30),
    ("Emergency request fulfilled in Delhi", 2 * 60),
    ("Blood drive completed in Bangalore", 4 * 60),
    ("Donor verification completed", 6 * 60),
];

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stat {
    LivesSaved,
    ActiveDonors,
    SuccessRate,
    EmergencyStatus,
}

/// A rendered entry in the activity feed.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivityItem {
    pub description: String,
    pub time_ago: String,
}

pub trait DashboardView: Send + Sync {
    fn set_stat(&self, stat: Stat, text: String);

    fn show_activity(&self, items: Vec<ActivityItem>);
}

/// The canned feed, with times relative to `now`.
pub fn fallback_activity(now: OffsetDateTime) -> Vec<Activity> {
    FALLBACK_ACTIVITY
        .iter()
        .map(|(description, minutes_ago)| Activity {
            description: (*description).to_owned(),
            timestamp: now - time::Duration::minutes(*minutes_ago),
        })
        .collect()
}

struct Inner {
    api: Arc<dyn DonorApi + Send + Sync>,
    view: Arc<dyn DashboardView>,
    animations: Mutex<HashMap<Stat, JoinHandle<()>>>,
}

pub struct Dashboard {
    inner: Arc<Inner>,
    tasks: Tasks,
}

impl Dashboard {
    /// Loads the stats and the feed, then keeps refreshing them until
    /// the dashboard is dropped.
    pub async fn start(
        api: Arc<dyn DonorApi + Send + Sync>,
        view: Arc<dyn DashboardView>,
    ) -> Self {
        let inner = Arc::new(Inner {
            api,
            view,
            animations: Mutex::new(HashMap::new()),
        });

        inner.load_stats().await;
        inner.load_activity().await;

        let tasks = Tasks::new();

        {
            let inner = inner.clone();
            tasks.every(STATS_INTERVAL, move || {
                let inner = inner.clone();
                async move { inner.load_stats().await }
            });
        }

        {
            let inner = inner.clone();
            tasks.every(ACTIVITY_INTERVAL, move || {
                let inner = inner.clone();
                async move { inner.load_activity().await }
            });
        }

        Dashboard { inner, tasks }
    }

    pub async fn refresh(&self) {
        self.inner.load_stats().await;
        self.inner.load_activity().await;
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.tasks.cancel_all();

        for (_, handle) in self.inner.animations().drain() {
            handle.abort();
        }
    }
}

impl Inner {
    async fn load_stats(&self) {
        let stats = self.api.stats().await.unwrap_or(FALLBACK_STATS);

        self.animate(Stat::LivesSaved, stats.lives_saved);
        self.animate(Stat::ActiveDonors, stats.active_donors);
        self.view
            .set_stat(Stat::SuccessRate, format_rate(stats.success_rate));
        self.animate(Stat::EmergencyStatus, i64::from(stats.emergency_status));
    }

    async fn load_activity(&self) {
        let now = OffsetDateTime::now_utc();
        let activity = match self.api.recent_activity().await {
            Ok(activity) => activity,
            Err(_) => fallback_activity(now),
        };

        let items = activity
            .into_iter()
            .map(|a| ActivityItem {
                time_ago: time_ago(a.timestamp, now),
                description: a.description,
            })
            .collect();

        self.view.show_activity(items);
    }

    /// Counts `stat` up from zero to `target`, replacing any animation
    /// of the same stat still running.
    fn animate(&self, stat: Stat, target: i64) {
        let view = self.view.clone();

        let handle = tokio::spawn(async move {
            let start = Instant::now();

            loop {
                let progress =
                    (start.elapsed().as_secs_f64() / ANIMATION_DURATION.as_secs_f64()).min(1.0);
                view.set_stat(stat, group_thousands(animated_value(target, progress)));

                if progress >= 1.0 {
                    break;
                }

                sleep(FRAME_INTERVAL).await;
            }
        });

        if let Some(previous) = self.animations().insert(stat, handle) {
            previous.abort();
        }
    }

    fn animations(&self) -> MutexGuard<HashMap<Stat, JoinHandle<()>>> {
        self.animations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
