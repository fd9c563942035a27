//! Build request payloads.
//!
//! Validates the JSON body of `POST /build` into a `BuildRequest`. Only the
//! payload's shape is checked here; path safety is enforced when the files
//! are materialized.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::workspace::FileContent;

/// Reasons a payload is rejected before any build work starts.
#[derive(Debug, Error)]
pub enum RequestError {
  #[error("payload is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("payload must be a JSON object, got {0}")]
  NotAnObject(&'static str),

  #[error("payload has no \"files\" field")]
  MissingFiles,

  #[error("\"files\" must be an object, got {0}")]
  FilesNotAnObject(&'static str),

  #[error("\"files\" has no entries")]
  NoFiles,
}

/// A validated mapping from relative path to file content.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
  pub files: BTreeMap<String, FileContent>,
}

impl BuildRequest {
  /// Parse a raw request body.
  pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
    let payload: Value = serde_json::from_slice(body)?;
    Self::from_payload(payload)
  }

  /// Extract the `files` object from a decoded payload.
  ///
  /// String values become [`FileContent::Text`]; every other value is kept
  /// as [`FileContent::Structured`] and pretty-printed when written.
  pub fn from_payload(payload: Value) -> Result<Self, RequestError> {
    let mut payload = match payload {
      Value::Object(map) => map,
      other => return Err(RequestError::NotAnObject(kind(&other))),
    };

    let files = match payload.remove("files") {
      None | Some(Value::Null) => return Err(RequestError::MissingFiles),
      Some(Value::Object(files)) => files,
      Some(other) => return Err(RequestError::FilesNotAnObject(kind(&other))),
    };

    if files.is_empty() {
      return Err(RequestError::NoFiles);
    }

    Ok(Self {
      files: files.into_iter().map(|(path, value)| (path, FileContent::from(value))).collect(),
    })
  }
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
