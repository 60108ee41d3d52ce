use serde::Serialize;

use crate::donor::Id;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Created {
        success: bool,
        message: &'a str,
        #[serde(rename = "donorId")]
        donor_id: Id,
    },
    Deleted {
        success: bool,
        message: &'a str,
    },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
}

impl<'a> SuccessResponse<'a> {
    pub fn created(donor_id: Id) -> Self {
        SuccessResponse::Created {
            success: true,
            message: "Donor registered successfully",
            donor_id,
        }
    }

    pub fn deleted() -> Self {
        SuccessResponse::Deleted {
            success: true,
            message: "Donor deleted successfully",
        }
    }
}
