//! Handler for `POST /query`.
//!
//! The body is a filter mapping exactly as accepted by
//! [`FilterSpec::from_value`]; the response carries the ordered identities
//! and the executed steps.

use axum::{Json, extract::State};
use oifind_core::{backend::Backend, filter::FilterSpec, model::Identity, tracker::Step};
use serde::Serialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct QueryResponse {
  pub data:  Vec<Identity>,
  pub steps: Vec<Step>,
}

/// `POST /query`
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<serde_json::Value>,
) -> Result<Json<QueryResponse>, ApiError>
where
  S: Backend,
{
  let spec = FilterSpec::from_value(&body)?;
  let report = state.finder.find(state.store.as_ref(), &spec).await?;
  Ok(Json(QueryResponse { data: report.identities, steps: report.steps }))
}
