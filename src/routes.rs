use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, Logger};
use warp::filters::body::BodyDeserializeError;
use warp::filters::cors::CorsForbidden;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::BackendError;

pub mod admin;
mod handlers;
pub mod pages;
mod query;
mod rejection;
mod response;

pub use internal::*;
pub use rejection::FlattenedRejection;

/// The largest request body to accept.
const MAX_CONTENT_LENGTH: u64 = 64 * 1024;

pub type Route = BoxedFilter<(Box<dyn Reply>,)>;

/// Builds the whole site: the donor API, the API's 404 fallback, the
/// health check and the pages, with CORS and a final catch-all.
pub fn make_routes(environment: Environment, frontend_dir: PathBuf) -> Route {
    let logger = environment.logger.clone();
    let api_path = environment.config.api_path().to_owned();

    let api = {
        let logger = logger.clone();

        make_list_route(environment.clone())
            .or(make_stats_route(environment.clone()))
            .unify()
            .or(make_recent_activity_route(environment.clone()))
            .unify()
            .or(make_create_route(environment.clone()))
            .unify()
            .or(make_retrieve_route(environment.clone()))
            .unify()
            .or(make_delete_route(environment.clone()))
            .unify()
            .recover(move |r| format_rejection(logger.clone(), r))
            .map(boxed)
    };

    let api_not_found = warp::path(api_path).map(|| {
        boxed(with_status(
            json(&FlattenedRejection::new("API endpoint not found")),
            StatusCode::NOT_FOUND,
        ))
    });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "DELETE"])
        .allow_headers(vec!["content-type"]);

    api.or(api_not_found)
        .unify()
        .or(admin::make_healthz_route().map(boxed))
        .unify()
        .or(pages::make_pages_route(frontend_dir))
        .unify()
        .with(cors)
        .recover(move |r| handle_unexpected(logger.clone(), r))
        .map(boxed)
        .boxed()
}

/// Turns the rejections the API produces on purpose into JSON error
/// responses, passing everything else through.
pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        let status = status_code_for(e);
        let flattened = r.flatten();
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status, "message" => %flattened.message);

        return Ok(with_status(json(&flattened), status));
    }

    if is_malformed_body(&rej) {
        let error = BackendError::MalformedBody;
        error!(logger, "Malformed request"; "rejection" => ?rej, "status" => %StatusCode::BAD_REQUEST);

        return Ok(with_status(
            json(&FlattenedRejection::new(error.to_string())),
            StatusCode::BAD_REQUEST,
        ));
    }

    Err(rej)
}

/// The last line of defence: whatever got this far becomes a JSON
/// response without any details.
pub async fn handle_unexpected(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, Infallible> {
    let (status, message) = if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if rej.find::<CorsForbidden>().is_some() {
        (StatusCode::FORBIDDEN, "Forbidden")
    } else if rej.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        error!(logger, "Unhandled rejection"; "rejection" => ?rej);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(with_status(json(&FlattenedRejection::new(message)), status))
}

fn is_malformed_body(rej: &reject::Rejection) -> bool {
    rej.find::<BodyDeserializeError>().is_some()
        || rej.find::<reject::UnsupportedMediaType>().is_some()
        || rej.find::<reject::PayloadTooLarge>().is_some()
        || rej.find::<reject::LengthRequired>().is_some()
        || rej.find::<reject::InvalidQuery>().is_some()
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        Validation(..) | DuplicatePhone | InvalidId(..) | MalformedBody => StatusCode::BAD_REQUEST,
        NonExistentId(..) => StatusCode::NOT_FOUND,
        Sqlx { .. } | InvalidSetting { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn boxed(reply: impl Reply + 'static) -> Box<dyn Reply> {
    Box::new(reply)
}

mod internal {
    use warp::body::{content_length_limit, json};
    use warp::path::end;
    use warp::Filter;
    use warp::{delete, get as g, path as p, path::param as par, post, query};

    use super::{handlers, query as q, Route, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let a = environment.config.api_path().to_owned();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(a))
                .and(p("donors"));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_list_route => list, rt; end(), g(), query::<q::DonorQuery>());
    route!(make_stats_route => stats, rt; p("stats"), end(), g());
    route!(make_recent_activity_route => recent_activity, rt; p("recent-activity"), end(), g());
    route!(make_create_route => create, rt; end(), post(), content_length_limit(MAX_CONTENT_LENGTH), json());
    route!(make_retrieve_route => retrieve, rt; par::<String>(), end(), g());
    route!(make_delete_route => delete, rt; par::<String>(), end(), delete());
}
