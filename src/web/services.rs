// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Platform service proxies
//!
//! Roster lookup and score submission. Both endpoints authenticate the
//! caller with a tool token, recover the stored launch claims for the
//! session, obtain a scoped platform access token on demand and proxy
//! the IMS service call with its specific media type. Failures from the
//! platform side are terminal for the request; nothing here retries.

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::error::ApiError;
use super::guards::AuthenticatedLaunch;
use super::state::LtiState;
use crate::auth::{AuthError, IdTokenClaims, Platform, ToolSession};

/// Scope required for roster lookup.
pub const SCOPE_MEMBERSHIP_READONLY: &str =
    "https://purl.imsglobal.org/spec/lti-nrps/scope/contextmembership.readonly";

/// Scopes required for score submission.
pub const SCORE_SCOPES: [&str; 4] = [
    "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem",
    "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem.readonly",
    "https://purl.imsglobal.org/spec/lti-ags/scope/result.readonly",
    "https://purl.imsglobal.org/spec/lti-ags/scope/score",
];

const MEDIA_TYPE_MEMBERSHIP_CONTAINER: &str =
    "application/vnd.ims.lti-nrps.v2.membershipcontainer+json";
const MEDIA_TYPE_SCORE: &str = "application/vnd.ims.lis.v1.score+json";

/// Body of a score submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub score: f64,
    pub resource_id: i64,
}

/// AGS score object posted to the platform gradebook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgsScore<'a> {
    timestamp: DateTime<Utc>,
    score_given: f64,
    score_maximum: f64,
    activity_progress: &'a str,
    grading_progress: &'a str,
    user_id: &'a str,
}

#[get("/membership")]
pub async fn membership(
    launch: AuthenticatedLaunch,
    state: &State<LtiState>,
) -> Result<Json<Value>, ApiError> {
    let session = &launch.session;
    let (platform, stored) = session_context(state, session)?;

    let service = stored
        .names_role_service
        .as_ref()
        .ok_or(AuthError::NotFound("Names and roles service"))?;

    let token = state
        .service_tokens
        .get_access_token(&platform, &[SCOPE_MEMBERSHIP_READONLY])
        .await?;

    debug!(
        "Fetching membership from {}",
        service.context_memberships_url
    );
    let members: Value = state
        .http
        .get(&service.context_memberships_url)
        .header(
            AUTHORIZATION,
            format!("{} {}", token.token_type, token.access_token),
        )
        .header(ACCEPT, MEDIA_TYPE_MEMBERSHIP_CONTAINER)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(Json(members))
}

#[post("/scores", data = "<body>")]
pub async fn scores(
    launch: AuthenticatedLaunch,
    body: Result<Json<ScoreRequest>, rocket::serde::json::Error<'_>>,
    state: &State<LtiState>,
) -> Result<Status, ApiError> {
    let body = body.map_err(|e| AuthError::Validation(e.to_string()))?;
    let session = &launch.session;
    let (platform, stored) = session_context(state, session)?;

    let lineitem = stored
        .ags_endpoint
        .as_ref()
        .and_then(|endpoint| endpoint.lineitem.clone())
        .ok_or(AuthError::NotFound("Line item endpoint"))?;

    let token = state
        .service_tokens
        .get_access_token(&platform, &SCORE_SCOPES)
        .await?;

    // Keep any query the platform put on the line item URL (Moodle
    // carries a type_id there) while appending the scores segment.
    let mut score_url = Url::parse(&lineitem)
        .map_err(|e| AuthError::Internal(format!("Bad line item URL: {}", e)))?;
    let scores_path = format!("{}/scores", score_url.path());
    score_url.set_path(&scores_path);

    let payload = AgsScore {
        timestamp: Utc::now(),
        score_given: body.score,
        score_maximum: 100.0,
        activity_progress: "Completed",
        grading_progress: "FullyGraded",
        user_id: &session.user_id,
    };

    debug!("Posting score for user {} to {}", session.user_id, score_url);
    state
        .http
        .post(score_url.as_str())
        .json(&payload)
        .header(
            AUTHORIZATION,
            format!("{} {}", token.token_type, token.access_token),
        )
        .header(CONTENT_TYPE, MEDIA_TYPE_SCORE)
        .send()
        .await?
        .error_for_status()?;

    Ok(Status::NoContent)
}

/// Load the platform record and the stored launch claims backing a
/// session; both must exist for any service call.
fn session_context(
    state: &LtiState,
    session: &ToolSession,
) -> Result<(Platform, IdTokenClaims), ApiError> {
    let platform = state
        .registry
        .find(&session.platform_url, &session.client_id)?
        .ok_or(AuthError::PlatformNotFound)?;

    let stored = state
        .id_tokens
        .load(
            &session.platform_url,
            &session.client_id,
            &session.deployment_id,
            &session.user_id,
        )?
        .ok_or(AuthError::NotFound("ID token"))?;

    Ok((platform, stored))
}
