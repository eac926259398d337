//! # Common API Types
//!
//! Extractors and request-validation helpers shared by the handlers.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, not_found, validation_error};

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor whose rejections render as [`ApiError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Collects every missing required field so a single 400 can name them all.
#[derive(Debug, Default)]
pub struct RequiredFields {
    missing: Vec<&'static str>,
}

impl RequiredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trimmed value, recording `name` as missing when absent or blank.
    pub fn text(&mut self, name: &'static str, value: Option<String>) -> String {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    /// Returns the value, recording `name` as missing when absent.
    pub fn value<T: Default>(&mut self, name: &'static str, value: Option<T>) -> T {
        match value {
            Some(v) => v,
            None => {
                self.missing.push(name);
                T::default()
            }
        }
    }

    pub fn check(self) -> Result<(), ApiError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(validation_error(
                "Missing required fields",
                json!({ "missing": self.missing }),
            ))
        }
    }
}

/// Parses a path identifier, answering 400 for malformed input.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, ApiError> {
    raw.parse::<Uuid>().map_err(|_| {
        validation_error("Invalid identifier", field_error(field, "Must be a valid UUID"))
    })
}

/// Parses a path identifier, answering 404 for malformed input so that
/// unauthenticated lookups cannot distinguish bad ids from unknown ones.
pub fn parse_id_or_not_found(raw: &str, message: &str) -> Result<Uuid, ApiError> {
    raw.parse::<Uuid>().map_err(|_| not_found(message))
}

/// Accepts 9 to 15 digits with an optional leading `+`; spaces are ignored.
pub fn validate_phone_number(field: &str, value: &str) -> Result<(), ApiError> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);

    if (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(validation_error(
            "Invalid phone number",
            field_error(
                field,
                "Must contain 9 to 15 digits, optionally prefixed with +",
            ),
        ))
    }
}

/// `{ "<field>": "<message>" }`
pub fn field_error(field: &str, message: &str) -> Value {
    let mut details = Map::new();
    details.insert(field.to_string(), Value::String(message.to_string()));
    Value::Object(details)
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Password updated")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
