//! Route handlers, grouped by resource.
//!
//! Every mutating handler follows the same order: deserialize the payload, resolve the
//! caller, fetch the target row, apply the `policy` rules, then persist in a single
//! registry call and answer with the public fields of the result.

pub mod admin_actions;
pub mod attachments;
pub mod interventions;
pub mod notifications;
pub mod red_flags;
pub mod statuses;
pub mod users;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{Intervention, RedFlag, Status},
    policy,
    repository::Repository,
};

/// ValidQuery
///
/// `Query` whose rejection is an `AppError::Validation`, so malformed parameters such
/// as `?skip=abc` answer 422 with the usual `{"detail"}` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ValidQuery(value))
    }
}

/// Status every new red flag and intervention starts in.
pub const INITIAL_STATUS: &str = "pending";

pub(crate) async fn initial_status(repo: &dyn Repository) -> AppResult<Status> {
    policy::resolve_status(repo, INITIAL_STATUS).await
}

pub(crate) async fn fetch_red_flag(repo: &dyn Repository, id: i64) -> AppResult<RedFlag> {
    repo.get_red_flag(id)
        .await?
        .ok_or_else(|| AppError::not_found("Red flag not found"))
}

pub(crate) async fn fetch_intervention(repo: &dyn Repository, id: i64) -> AppResult<Intervention> {
    repo.get_intervention(id)
        .await?
        .ok_or_else(|| AppError::not_found("Intervention not found"))
}
