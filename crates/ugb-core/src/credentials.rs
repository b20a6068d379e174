//! Parsing of the credential blob users paste into `/add`.

use serde_json::Value;

use crate::domain::Credentials;

/// User-facing reasons a pasted blob was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialsError {
    InvalidJson,
    MissingFields,
}

impl std::fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialsError::InvalidJson => f.write_str("Invalid JSON format."),
            CredentialsError::MissingFields => f.write_str(
                "JSON must contain 'access_token' and 'login_id' (UGPHONE-MQTT).",
            ),
        }
    }
}

impl std::error::Error for CredentialsError {}

/// Accepts the UGPHONE-MQTT blob (`access_token` + `login_id`) and the older
/// `UGPHONE-Token` + `UGPHONE-ID` pair.
pub fn parse_credentials(input: &str) -> Result<Credentials, CredentialsError> {
    let data: Value =
        serde_json::from_str(input.trim()).map_err(|_| CredentialsError::InvalidJson)?;

    for (token_key, id_key) in [
        ("access_token", "login_id"),
        ("UGPHONE-Token", "UGPHONE-ID"),
    ] {
        let token = data.get(token_key).and_then(scalar_string);
        let login = data.get(id_key).and_then(scalar_string);
        if let (Some(access_token), Some(login_id)) = (token, login) {
            return Ok(Credentials {
                access_token,
                login_id,
            });
        }
    }

    Err(CredentialsError::MissingFields)
}

fn scalar_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
