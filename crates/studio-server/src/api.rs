//! HTTP routes
//!
//! | Method | Path                 | Handler                      |
//! |--------|----------------------|------------------------------|
//! | GET    | `/api/health`        | configuration flags          |
//! | POST   | `/api/idea-to-poc`   | [`Studio::submit`]           |
//! | POST   | `/api/appeal`        | [`Studio::appeal`]           |
//! | POST   | `/api/paid-override` | [`Studio::request_override`] |
//!
//! [`Studio::submit`]: studio_core::Studio::submit
//! [`Studio::appeal`]: studio_core::Studio::appeal
//! [`Studio::request_override`]: studio_core::Studio::request_override
//!
//! Every reply is JSON, errors included.

use crate::state::AppState;
use futures::{Stream, TryStreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use studio_core::{StudioError, Submission};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Buf, Filter, Rejection, Reply};

/// Maximum accepted request body
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Fields read from an intake body
///
/// Missing and non-string fields read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeForm {
    pub idea: String,
    pub founder_name: String,
    pub target_user: String,
    pub appeal: String,
    pub email: String,
    pub notes: String,
}

impl IntakeForm {
    /// Read the form out of a JSON body
    #[must_use]
    pub fn from_json(body: &Value) -> Self {
        let text = |name: &str| {
            body.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            idea: text("idea"),
            founder_name: text("founderName"),
            target_user: text("targetUser"),
            appeal: text("appeal"),
            email: text("email"),
            notes: text("notes"),
        }
    }

    /// Submission carried by the form
    #[must_use]
    pub fn submission(&self) -> Submission {
        Submission::new(self.idea.as_str())
            .with_founder(self.founder_name.as_str())
            .with_target_user(self.target_user.as_str())
    }
}

/// All routes, with JSON error replies
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("api" / "health")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: AppState| warp::reply::json(&state.health()));

    let submit = warp::path!("api" / "idea-to-poc")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(submit_idea);

    let appeal = warp::path!("api" / "appeal")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(submit_appeal);

    let paid_override = warp::path!("api" / "paid-override")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state))
        .and_then(submit_override);

    health
        .or(submit)
        .or(appeal)
        .or(paid_override)
        .recover(handle_rejection)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

#[derive(Debug)]
struct BodyTooLarge;

impl warp::reject::Reject for BodyTooLarge {}

#[derive(Debug)]
struct BodyUnreadable;

impl warp::reject::Reject for BodyUnreadable {}

/// Raw body, parsed in the handler so malformed JSON gets a JSON reply
///
/// A declared length over the cap is refused before reading. Chunked bodies
/// carry no length and are refused once they cross it.
fn json_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(|length: Option<u64>| async move {
            match length {
                Some(length) if length > MAX_BODY_BYTES => Err(warp::reject::custom(BodyTooLarge)),
                _ => Ok(()),
            }
        })
        .untuple_one()
        .and(warp::body::stream())
        .and_then(read_capped)
}

async fn read_capped<S, B>(body: S) -> Result<Bytes, Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let limit = usize::try_from(MAX_BODY_BYTES).unwrap_or(usize::MAX);
    let collected = body
        .map_err(|err| {
            tracing::debug!("Failed to read request body: {}", err);
            warp::reject::custom(BodyUnreadable)
        })
        .try_fold(Vec::new(), |mut collected, mut chunk| async move {
            if collected.len() + chunk.remaining() > limit {
                return Err(warp::reject::custom(BodyTooLarge));
            }
            while chunk.has_remaining() {
                let part = chunk.chunk();
                let read = part.len();
                collected.extend_from_slice(part);
                chunk.advance(read);
            }
            Ok(collected)
        })
        .await?;
    Ok(Bytes::from(collected))
}

fn parse_form(body: &Bytes) -> Result<IntakeForm, Response> {
    serde_json::from_slice::<Value>(body)
        .map(|value| IntakeForm::from_json(&value))
        .map_err(|err| {
            tracing::debug!("Rejected malformed body: {}", err);
            error_reply(StatusCode::BAD_REQUEST, json!({ "error": "Invalid JSON body" }))
        })
}

async fn submit_idea(body: Bytes, state: AppState) -> Result<Response, Infallible> {
    let form = match parse_form(&body) {
        Ok(form) => form,
        Err(reply) => return Ok(reply),
    };
    Ok(respond(state.studio().submit(form.submission()).await))
}

async fn submit_appeal(body: Bytes, state: AppState) -> Result<Response, Infallible> {
    let form = match parse_form(&body) {
        Ok(form) => form,
        Err(reply) => return Ok(reply),
    };
    let result = state.studio().appeal(form.submission(), &form.appeal).await;
    Ok(respond(result))
}

async fn submit_override(body: Bytes, state: AppState) -> Result<Response, Infallible> {
    let form = match parse_form(&body) {
        Ok(form) => form,
        Err(reply) => return Ok(reply),
    };
    let result = state
        .studio()
        .request_override(form.submission(), &form.email, &form.notes)
        .await;
    Ok(respond(result))
}

fn respond<T: Serialize>(result: Result<T, StudioError>) -> Response {
    match result {
        Ok(body) => warp::reply::json(&body).into_response(),
        Err(err) => studio_error_reply(&err),
    }
}

fn studio_error_reply(err: &StudioError) -> Response {
    tracing::debug!("Request rejected: {}", err);
    let mut body = json!({ "error": err.to_string() });
    if let Some((used, limit)) = err.appeal_budget() {
        body["appealTokensUsed"] = json!(used);
        body["appealTokenLimit"] = json!(limit);
    }
    error_reply(StatusCode::BAD_REQUEST, body)
}

fn error_reply(status: StatusCode, body: Value) -> Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if rejection.find::<BodyTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if rejection.find::<BodyUnreadable>().is_some() {
        (StatusCode::BAD_REQUEST, "Request body could not be read")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        tracing::warn!("Unhandled rejection: {:?}", rejection);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(error_reply(status, json!({ "error": message })))
}
