//! Evaluation inputs and results.
//!
//! [`Context`] describes who is asking, [`Variant`] and [`Evaluated`] carry
//! what the engine answered.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Request context for a single evaluation.
///
/// Every field is optional. The engine treats a missing field as "unknown",
/// so strategies that depend on it evaluate to disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Context {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub environment: Option<String>,
    pub app_name: Option<String>,
    pub remote_address: Option<String>,
    /// Evaluation time. The engine uses its own clock when unset.
    #[serde(skip)]
    pub current_time: Option<SystemTime>,
    pub properties: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_remote_address(mut self, remote_address: impl Into<String>) -> Self {
        self.remote_address = Some(remote_address.into());
        self
    }

    pub fn with_current_time(mut self, time: SystemTime) -> Self {
        self.current_time = Some(time);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property, falling back to the well-known fields for the
    /// standard context keys.
    pub fn field(&self, key: &str) -> Option<&str> {
        let known = match key {
            "userId" => self.user_id.as_deref(),
            "sessionId" => self.session_id.as_deref(),
            "environment" => self.environment.as_deref(),
            "appName" => self.app_name.as_deref(),
            "remoteAddress" => self.remote_address.as_deref(),
            _ => None,
        };
        known.or_else(|| self.properties.get(key).map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub payload_type: String,
    pub value: String,
}

/// The variant selected for a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    pub enabled: bool,
    pub feature_enabled: bool,
}

impl Variant {
    /// The variant reported for a feature that is off or has no variants.
    pub fn disabled() -> Self {
        Self {
            name: "disabled".to_string(),
            payload: None,
            enabled: false,
            feature_enabled: false,
        }
    }
}

/// An evaluation result together with the feature's impression-data flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluated<T> {
    pub value: T,
    pub impression_data: bool,
}

impl<T> Evaluated<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Evaluated<U> {
        Evaluated {
            value: f(self.value),
            impression_data: self.impression_data,
        }
    }
}
