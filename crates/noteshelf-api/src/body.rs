//! Request extraction helpers shared by the handlers.
//!
//! Body fields are all optional at the serde level so that a missing field
//! becomes a specific `400` message instead of a generic deserialisation
//! failure. Ids in bodies may be sent as numbers or numeric strings.

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts, Path, Request},
  http::{StatusCode, request::Parts},
  response::{IntoResponse, Response},
};
use noteshelf_core::order::ChildOrder;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::ApiError;

const INVALID_ID: &str = "Invalid ID.";

// ─── JSON body ───────────────────────────────────────────────────────────────

/// [`Json`] with its rejection mapped onto [`ApiError::BadRequest`].
pub struct JsonBody<T>(pub T);

impl<T, St> FromRequest<St> for JsonBody<T>
where
  T: DeserializeOwned,
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<T>::from_request(req, state)
      .await
      .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    Ok(Self(value))
  }
}

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// Parse a positive integer id.
pub fn parse_id(raw: &str) -> Option<i64> {
  raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// The single `{id}` segment of a route, as a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub i64);

impl<St> FromRequestParts<St> for PathId
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
    let Path(raw) = Path::<String>::from_request_parts(parts, state)
      .await
      .map_err(|_| ApiError::bad_request(INVALID_ID))?;
    parse_id(&raw)
      .map(Self)
      .ok_or_else(|| ApiError::bad_request(INVALID_ID))
  }
}

/// An id as it appears in a request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
  Number(i64),
  Text(String),
}

impl IdInput {
  pub fn parse(&self) -> Option<i64> {
    match self {
      IdInput::Number(n) if *n > 0 => Some(*n),
      IdInput::Number(_) => None,
      IdInput::Text(s) => parse_id(s),
    }
  }
}

/// `missing` is the message when the field is absent.
pub fn required_id(input: Option<IdInput>, missing: &str) -> Result<i64, ApiError> {
  let input = input.ok_or_else(|| ApiError::bad_request(missing))?;
  input.parse().ok_or_else(|| ApiError::bad_request(INVALID_ID))
}

pub fn required_text(input: Option<String>, missing: &str) -> Result<String, ApiError> {
  input
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| ApiError::bad_request(missing))
}

// ─── Orders ──────────────────────────────────────────────────────────────────

/// A submitted child order: either a JSON array, or a string holding one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderInput<I> {
  Ids(ChildOrder<I>),
  Encoded(String),
}

impl<I: DeserializeOwned> OrderInput<I> {
  pub fn into_order(self) -> Result<ChildOrder<I>, ApiError> {
    match self {
      OrderInput::Ids(order) => Ok(order),
      OrderInput::Encoded(s) => ChildOrder::from_json(&s)
        .map_err(|_| ApiError::bad_request("Order must be a JSON array of IDs.")),
    }
  }
}

pub fn required_order<I: DeserializeOwned>(
  input: Option<OrderInput<I>>,
) -> Result<ChildOrder<I>, ApiError> {
  input
    .ok_or_else(|| ApiError::bad_request("New order required."))?
    .into_order()
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// `{"id": ...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ident<I> {
  pub id: I,
}

/// `201 [{"id": ...}]`
pub struct Created<I>(pub I);

impl<I: Serialize> IntoResponse for Created<I> {
  fn into_response(self) -> Response {
    (StatusCode::CREATED, Json([Ident { id: self.0 }])).into_response()
  }
}
