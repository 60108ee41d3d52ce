use std::convert::TryFrom;
use std::time::{Duration, Instant};

use log::debug;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::donor::{DonorFilter, DonorSubmission, Id};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::routes::{
    query::DonorQuery,
    rejection::{Context, Rejection},
    response::SuccessResponse,
};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($body:tt)+) => {{
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($body)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    }};
}

pub async fn list(environment: Environment, query: DonorQuery) -> RouteResult {
    timed! {
        let filter = DonorFilter::from(query);

        let donors = environment
            .repository
            .list(&filter)
            .await
            .map_err(|e: BackendError| Rejection::new(Context::list(), e))?;

        json(&donors)
    }
}

pub async fn stats(environment: Environment) -> RouteResult {
    timed! {
        let stats = environment
            .repository
            .stats()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::stats(), e))?;

        json(&stats)
    }
}

pub async fn recent_activity(environment: Environment) -> RouteResult {
    timed! {
        let activity = environment
            .repository
            .recent_activity(environment.config.recent_activity_limit)
            .await;

        json(&activity)
    }
}

pub async fn create(environment: Environment, submission: DonorSubmission) -> RouteResult {
    timed! {
        debug!(environment.logger, "Registering donor...");

        let id = environment
            .repository
            .create(submission)
            .await
            .map_err(|e: BackendError| Rejection::new(Context::create(), e))?;

        with_status(json(&SuccessResponse::created(id)), StatusCode::CREATED)
    }
}

pub async fn retrieve(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Retrieving donor..."; "id" => id);

        let donor = environment.repository.get(id).await.map_err(error_handler)?;

        json(&donor)
    }
}

pub async fn delete(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;

        environment.repository.delete(id).await.map_err(error_handler)?;

        json(&SuccessResponse::deleted())
    }
}

/// Anything numeric is looked up, so a number no donor could have is
/// simply not found.
fn parse_id(id: &str) -> Result<Id, BackendError> {
    let digits = id.strip_prefix(|c| c == '+' || c == '-').unwrap_or(id);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BackendError::InvalidId(id.to_owned()));
    }

    let wide = id.parse::<i64>().unwrap_or(if id.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    });

    Id::try_from(wide).map_err(|_| BackendError::NonExistentId(wide))
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
