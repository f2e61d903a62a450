use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::common::Error;

/// Qualifier prefix of error responses, followed by the error code.
pub const ERROR_QUALIFIER_PREFIX: &str = "/io.scalecube.services.error/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

/// One saved version of a key, versions start at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub version: usize,
    pub value: Value,
}

/// Successful result of a canonical operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Acknowledgment,
    // Version written by createEntry and updateEntry.
    Version(usize),
    Entry(Entry),
    Entries(Vec<Entry>),
    History(Vec<Revision>),
}

impl Response {
    pub fn into_payload(self) -> Value {
        match self {
            Response::Acknowledgment => json!({}),
            Response::Version(version) => json!({ "version": version }),
            Response::Entry(entry) => json!({"key": entry.key, "value": entry.value}),
            Response::Entries(entries) => json!({ "entries": entries }),
            Response::History(history) => json!({ "history": history }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: u16,
    pub error_message: String,
}

impl ErrorResponse {
    pub fn new(error_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
        }
    }

    pub fn qualifier(&self) -> String {
        format!("{}{}", ERROR_QUALIFIER_PREFIX, self.error_code)
    }

    pub fn to_payload(&self) -> Value {
        json!({"errorCode": self.error_code, "errorMessage": self.error_message})
    }
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        ErrorResponse::new(err.error_code(), err.to_string())
    }
}

impl From<Error> for ErrorResponse {
    fn from(err: Error) -> Self {
        ErrorResponse::from(&err)
    }
}

/// Either a payload or a canonical error, what every transport encodes.
pub type Outcome = Result<Response, ErrorResponse>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::protocol::RepositoryName;

    #[test]
    fn payloads() {
        assert_eq!(Response::Acknowledgment.into_payload(), json!({}));
        assert_eq!(
            Response::Entries(vec![Entry {
                key: "k".into(),
                value: json!([1, 2])
            }])
            .into_payload(),
            json!({"entries": [{"key": "k", "value": [1, 2]}]})
        );
        assert_eq!(Response::Version(3).into_payload(), json!({"version": 3}));
        assert_eq!(
            Response::History(vec![
                Revision {
                    version: 1,
                    value: json!("XAU")
                },
                Revision {
                    version: 2,
                    value: json!(null)
                },
            ])
            .into_payload(),
            json!({"history": [{"version": 1, "value": "XAU"}, {"version": 2, "value": null}]})
        );
    }

    #[test]
    fn error_response_from_error() {
        let err: Error = ErrorKind::RepositoryNotFound {
            repository: RepositoryName::new("FX").unwrap(),
        }
        .into();
        let response = ErrorResponse::from(err);

        assert_eq!(response, ErrorResponse::new(500, "Repository 'FX' not found"));
        assert_eq!(response.qualifier(), "/io.scalecube.services.error/500");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"errorCode": 500, "errorMessage": "Repository 'FX' not found"})
        );
    }
}
