use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

pub const SUCCESS_CODE: i64 = 200;

/// `{code, message, data}` wrapper returned by most endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    pub fn into_data(self, default_message: &str) -> Result<T, ClientError> {
        if self.code != SUCCESS_CODE {
            return Err(api_error(self.code, self.message, default_message));
        }
        match self.data {
            Some(data) => Ok(data),
            None => Err(api_error(self.code, self.message, default_message)),
        }
    }

    pub fn into_unit(self, default_message: &str) -> Result<(), ClientError> {
        if self.code != SUCCESS_CODE {
            return Err(api_error(self.code, self.message, default_message));
        }
        Ok(())
    }
}

fn api_error(code: i64, message: Option<String>, default_message: &str) -> ClientError {
    let message = message
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default_message.to_string());
    ClientError::Api { code, message }
}

/// True when `body` looks like an envelope rather than a bare payload.
#[must_use]
pub fn is_envelope(body: &Value) -> bool {
    body.as_object()
        .and_then(|object| object.get("code"))
        .is_some_and(Value::is_i64)
}

/// Decodes a response body into `T`, unwrapping an envelope when present.
pub fn decode_data<T>(body: Value, default_message: &str) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    if is_envelope(&body) {
        let envelope = decode_value::<Envelope<Value>>(body)?;
        let data = envelope.into_data(default_message)?;
        return decode_value(data);
    }
    if body.is_null() {
        return Err(ClientError::Api {
            code: SUCCESS_CODE,
            message: default_message.to_string(),
        });
    }
    decode_value(body)
}

/// Checks an envelope-only acknowledgement; bare bodies count as success.
pub fn decode_unit(body: Value, default_message: &str) -> Result<(), ClientError> {
    if is_envelope(&body) {
        let envelope = decode_value::<Envelope<Value>>(body)?;
        return envelope.into_unit(default_message);
    }
    Ok(())
}

/// Checks the envelope `code` and hands back `data` untouched, `Null`
/// included. Bare bodies are returned as they are.
pub fn raw_payload(body: Value, default_message: &str) -> Result<Value, ClientError> {
    if !is_envelope(&body) {
        return Ok(body);
    }
    let envelope = decode_value::<Envelope<Value>>(body)?;
    if !envelope.is_success() {
        return Err(api_error(envelope.code, envelope.message, default_message));
    }
    Ok(envelope.data.unwrap_or(Value::Null))
}

pub fn decode_value<T>(value: Value) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value).map_err(|error| ClientError::Decode {
        message: error.to_string(),
    })
}
