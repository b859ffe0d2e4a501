//! Response Envelope - Tri-State Result of Every Engine Call
//!
//! JSON calls answer with an explicit envelope:
//!
//! ```json
//! {"status_code": "Ok", "value": {...}, "error_message": null}
//! ```
//!
//! Binary calls carry the same information implicitly (an error string, or
//! a value, or neither) and are lifted into the same shape by the codec so
//! that one set of unwrapping rules applies everywhere.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, YggError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    Error,
    NotFound,
}

/// `value` is present only for `Ok`; `error_message` only for `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub status_code: StatusCode,
    pub value: Option<T>,
    pub error_message: Option<String>,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(value: T) -> Self {
        Self {
            status_code: StatusCode::Ok,
            value: Some(value),
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Error,
            value: None,
            error_message: Some(message.into()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status_code: StatusCode::NotFound,
            value: None,
            error_message: None,
        }
    }

    /// Lift a binary response: an error string wins, then a value, and
    /// neither means not found.
    pub fn from_parts(error: Option<String>, value: Option<T>) -> Self {
        match (error, value) {
            (Some(message), _) => Self::error(message),
            (None, Some(value)) => Self::ok(value),
            (None, None) => Self::not_found(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == StatusCode::Ok
    }

    fn check(&self) -> Result<()> {
        match self.status_code {
            StatusCode::Error if self.error_message.is_none() => Err(YggError::protocol(
                "Error envelope without an error message",
            )),
            StatusCode::Error | StatusCode::NotFound if self.value.is_some() => Err(
                YggError::protocol(format!("{:?} envelope carries a value", self.status_code)),
            ),
            _ => Ok(()),
        }
    }

    fn engine_error(self) -> YggError {
        YggError::Engine(
            self.error_message
                .unwrap_or_else(|| format!("{:?}", self.status_code)),
        )
    }

    /// Unwrap for evaluation calls: `NotFound` becomes `None`.
    pub fn into_result(self) -> Result<Option<T>> {
        self.check()?;
        match self.status_code {
            StatusCode::Ok => Ok(self.value),
            StatusCode::NotFound => Ok(None),
            StatusCode::Error => Err(self.engine_error()),
        }
    }

    /// Unwrap a call that must produce a value.
    pub fn into_value(self) -> Result<T> {
        self.check()?;
        match self.status_code {
            StatusCode::Ok => self
                .value
                .ok_or_else(|| YggError::protocol("Ok envelope without a value")),
            _ => Err(self.engine_error()),
        }
    }

    /// Unwrap a void call: anything but `Ok` is an error.
    pub fn into_unit(self) -> Result<()> {
        self.check()?;
        match self.status_code {
            StatusCode::Ok => Ok(()),
            _ => Err(self.engine_error()),
        }
    }
}

impl<T: DeserializeOwned> ResponseEnvelope<T> {
    /// Parse a JSON envelope returned by the engine.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| YggError::protocol(format!("malformed response envelope: {e}")))
    }
}
