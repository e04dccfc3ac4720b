// Error Classifier - Decide once what shape a response payload has
//
// Servers report failure two ways: SMP v2 servers nest `{group, rc}` under
// an `err` key, older servers put `rc` (and sometimes `rsn`) at the top level.
// A zero return code in either envelope is a success. An envelope with no
// body beside it decodes to the response's default.

use crate::smp::{map_get, mgmt_err_name, GroupId, RawResponse, RC_OK};
use ciborium::value::Value;
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;

// ============================================================================
// ERROR SHAPES
// ============================================================================

/// A top-level `rc` answer from a legacy server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyError {
    /// Group the request was addressed to
    pub group: GroupId,
    pub rc: i64,
    /// Optional human-readable reason
    pub rsn: Option<String>,
}

impl LegacyError {
    pub fn rc_name(&self) -> Option<&'static str> {
        mgmt_err_name(self.rc)
    }
}

impl fmt::Display for LegacyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rc_name() {
            Some(name) => write!(f, "{} (rc={})", name, self.rc)?,
            None => write!(f, "rc={}", self.rc)?,
        }
        if let Some(rsn) = &self.rsn {
            write!(f, ": {}", rsn)?;
        }
        Ok(())
    }
}

/// An `err: {group, rc}` answer from an SMP v2 server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedError {
    pub group: GroupId,
    pub rc: i64,
}

impl GroupedError {
    /// Name of the return code in the group's own enumeration
    pub fn rc_name(&self) -> Option<&'static str> {
        self.group.rc_name(self.rc)
    }
}

impl fmt::Display for GroupedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = self
            .group
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("group {}", self.group.0));
        match self.rc_name() {
            Some(name) => write!(f, "{}: {} (rc={})", group, name, self.rc),
            None => write!(f, "{}: rc={}", group, self.rc),
        }
    }
}

/// Error answers treated as fatal by a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Device returned error {0}")]
    Legacy(LegacyError),

    #[error("Device returned error {0}")]
    Grouped(GroupedError),
}

// ============================================================================
// REQUEST OUTCOME
// ============================================================================

/// The classified answer to a request; exactly one shape
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    Success(T),
    LegacyError(LegacyError),
    GroupedError(GroupedError),
}

impl<T> RequestOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Convert error answers into a [`ProtocolError`]
    pub fn into_result(self) -> Result<T, ProtocolError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::LegacyError(e) => Err(ProtocolError::Legacy(e)),
            Self::GroupedError(e) => Err(ProtocolError::Grouped(e)),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> RequestOutcome<U> {
        match self {
            Self::Success(value) => RequestOutcome::Success(f(value)),
            Self::LegacyError(e) => RequestOutcome::LegacyError(e),
            Self::GroupedError(e) => RequestOutcome::GroupedError(e),
        }
    }
}

/// The payload matched none of the known response shapes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("Unclassifiable response: {0}")]
    Unclassifiable(String),
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

fn integer(value: &Value) -> Option<i64> {
    value.as_integer().and_then(|i| i64::try_from(i).ok())
}

const ENVELOPE_KEYS: [&str; 3] = ["err", "rc", "rsn"];

/// True when the payload holds nothing but error envelope keys
fn is_bare_envelope(payload: &Value) -> bool {
    payload.as_map().is_some_and(|entries| {
        entries
            .iter()
            .all(|(key, _)| key.as_text().is_some_and(|k| ENVELOPE_KEYS.contains(&k)))
    })
}

fn decode_envelope_success<T: DeserializeOwned + Default>(
    payload: &Value,
) -> Result<RequestOutcome<T>, ClassifyError> {
    if is_bare_envelope(payload) {
        return Ok(RequestOutcome::Success(T::default()));
    }
    decode_success(payload)
}

fn decode_success<T: DeserializeOwned>(payload: &Value) -> Result<RequestOutcome<T>, ClassifyError> {
    payload
        .deserialized::<T>()
        .map(RequestOutcome::Success)
        .map_err(|e| ClassifyError::Unclassifiable(e.to_string()))
}

/// Classify a response payload as success, legacy error or grouped error
pub fn classify<T: DeserializeOwned + Default>(response: &RawResponse) -> Result<RequestOutcome<T>, ClassifyError> {
    let payload = &response.payload;
    if payload.as_map().is_none() {
        return Err(ClassifyError::Unclassifiable("payload is not a map".to_string()));
    }

    if let Some(err) = map_get(payload, "err") {
        let group = map_get(err, "group").and_then(integer);
        let rc = map_get(err, "rc").and_then(integer);
        return match (group, rc) {
            (_, Some(RC_OK)) => decode_envelope_success(payload),
            (Some(group), Some(rc)) => {
                let group = u16::try_from(group)
                    .map_err(|_| ClassifyError::Unclassifiable(format!("group {} out of range", group)))?;
                Ok(RequestOutcome::GroupedError(GroupedError {
                    group: GroupId(group),
                    rc,
                }))
            }
            _ => Err(ClassifyError::Unclassifiable(
                "`err` is not a {group, rc} map".to_string(),
            )),
        };
    }

    if let Some(rc) = map_get(payload, "rc") {
        let rc = integer(rc)
            .ok_or_else(|| ClassifyError::Unclassifiable("`rc` is not an integer".to_string()))?;
        if rc == RC_OK {
            return decode_envelope_success(payload);
        }
        let rsn = map_get(payload, "rsn").and_then(Value::as_text).map(str::to_string);
        return Ok(RequestOutcome::LegacyError(LegacyError {
            group: response.header.group,
            rc,
            rsn,
        }));
    }

    decode_success(payload)
}
