use serde::Deserialize;

use crate::donor::DonorFilter;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorQuery {
    pub blood_group: Option<String>,
    pub city: Option<String>,
}

impl From<DonorQuery> for DonorFilter {
    fn from(query: DonorQuery) -> Self {
        DonorFilter::new(query.blood_group, query.city)
    }
}
