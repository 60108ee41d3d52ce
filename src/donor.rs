use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::errors::ValidationError;

/// An ID in the database.
pub type Id = i32;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// One of the eight ABO/Rh blood groups.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    /// The label stored in the database and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }
}

impl FromStr for BloodGroup {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BloodGroup::ALL
            .iter()
            .copied()
            .find(|group| group.as_str() == s)
            .ok_or(ValidationError::InvalidBloodGroup)
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single donor in the database.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Donor {
    /// The ID assigned on insertion.
    pub id: Id,

    pub name: String,

    pub blood_group: BloodGroup,

    pub age: i32,

    pub gender: String,

    /// Unique across donors (checked at registration).
    pub phone: String,

    pub city: String,

    pub state: String,

    /// The last time they donated, if ever.
    #[serde(default, with = "iso_date::option")]
    pub last_donation: Option<Date>,

    /// Assigned at random on creation.
    pub verified: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The validated fields of a donor about to be inserted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewDonor {
    pub(crate) name: String,
    pub(crate) blood_group: BloodGroup,
    pub(crate) age: i32,
    pub(crate) gender: String,
    pub(crate) phone: String,
    pub(crate) city: String,
    pub(crate) state: String,
    pub(crate) last_donation: Option<Date>,
}

impl NewDonor {
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Attaches the fields assigned by storage.
    pub fn into_donor(self, id: Id, verified: bool, created_at: OffsetDateTime) -> Donor {
        Donor {
            id,
            name: self.name,
            blood_group: self.blood_group,
            age: self.age,
            gender: self.gender,
            phone: self.phone,
            city: self.city,
            state: self.state,
            last_donation: self.last_donation,
            verified,
            created_at,
        }
    }
}

/// A donor registration as received from the network, before
/// validation. Every field may be missing, and `age` may arrive as a
/// number or as a string.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorSubmission {
    pub name: Option<String>,
    pub blood_group: Option<String>,
    pub age: Option<serde_json::Value>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub last_donation: Option<String>,
}

/// Optional criteria for listing donors. Both apply when present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DonorFilter {
    /// Exact match on the blood group label.
    pub blood_group: Option<String>,

    /// Case-insensitive substring of the city.
    pub city_contains: Option<String>,
}

impl DonorFilter {
    /// Builds a filter, treating blank values as absent.
    pub fn new(blood_group: Option<String>, city_contains: Option<String>) -> Self {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        }

        DonorFilter {
            blood_group: non_blank(blood_group),
            city_contains: non_blank(city_contains),
        }
    }

    /// Whether `donor` satisfies every criterion.
    pub fn matches(&self, donor: &Donor) -> bool {
        let blood_group_matches = self
            .blood_group
            .as_deref()
            .map_or(true, |group| donor.blood_group.as_str() == group);
        let city_matches = self.city_contains.as_deref().map_or(true, |needle| {
            donor.city.to_lowercase().contains(&needle.to_lowercase())
        });

        blood_group_matches && city_matches
    }
}

/// Donor totals as counted by storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DonorCounts {
    pub total: i64,
    pub verified: i64,
}

/// The figures shown on the dashboard.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub lives_saved: i64,
    pub active_donors: i64,
    pub success_rate: f64,
    pub emergency_status: u8,
}

impl Stats {
    pub fn from_counts(counts: DonorCounts, emergency_status: u8) -> Self {
        // floor(total * 1.4) without going through floating point
        let lives_saved = counts.total * 7 / 5;

        let success_rate = if counts.total > 0 {
            let percentage = counts.verified as f64 / counts.total as f64 * 100.0;
            (percentage * 10.0).round() / 10.0
        } else {
            0.0
        };

        Stats {
            lives_saved,
            active_donors: counts.total,
            success_rate,
            emergency_status,
        }
    }
}

/// The columns of a recently created donor needed for the activity feed.
#[derive(Clone, Debug, PartialEq)]
pub struct RecentDonor {
    pub name: String,
    pub city: String,
    pub created_at: OffsetDateTime,
}

/// One entry in the activity feed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Activity {
    pub description: String,

    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<RecentDonor> for Activity {
    fn from(donor: RecentDonor) -> Self {
        Activity {
            description: format!("New donor {} registered in {}", donor.name, donor.city),
            timestamp: donor.created_at,
        }
    }
}
