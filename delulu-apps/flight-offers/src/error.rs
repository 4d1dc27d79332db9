//!  Delulu Travel Agent
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

use thiserror::Error;

/// Everything that can abort a flight offer search.
///
/// Individual malformed offers are not errors: they are dropped and counted
/// by the results parser.
#[derive(Debug, Error)]
pub enum FlightSearchError {
    #[error("missing {0}")]
    Configuration(String),

    #[error("invalid flight search arguments: {0}")]
    InvalidArguments(String),

    #[error("amadeus token request failed: {}", fmt_status(.status, .message))]
    Auth {
        status: Option<u16>,
        message: String,
    },

    #[error("amadeus flight offers request failed: {}", fmt_status(.status, .message))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("could not parse amadeus flight offers response: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("flight search cancelled")]
    Cancelled,
}

impl FlightSearchError {
    pub(crate) fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            status: None,
            message: message.into(),
        }
    }

    pub(crate) fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status reported by the provider, when the failure came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

pub(crate) fn describe_transport_error(err: &wreq::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

/// First 500 characters of a response body, for error messages
pub(crate) fn body_preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body).chars().take(500).collect()
}

fn fmt_status(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FlightSearchError::Configuration(
            "AMADEUS_CLIENT_ID or AMADEUS_CLIENT_SECRET".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "missing AMADEUS_CLIENT_ID or AMADEUS_CLIENT_SECRET"
        );

        let err = FlightSearchError::Upstream {
            status: Some(500),
            message: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "amadeus flight offers request failed: HTTP 500: Internal Server Error"
        );
        assert_eq!(err.status(), Some(500));

        let err = FlightSearchError::auth("response missing access_token");
        assert_eq!(
            err.to_string(),
            "amadeus token request failed: response missing access_token"
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_body_preview_truncates() {
        let body = "x".repeat(2000);
        assert_eq!(body_preview(body.as_bytes()).len(), 500);
        assert_eq!(body_preview(b"short"), "short");
    }
}
