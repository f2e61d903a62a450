use serde_json::{json, Value};

use crate::protocol::codec::{bad_request, decode_object, decode_request, Codec};
use crate::protocol::response::ERROR_QUALIFIER_PREFIX;
use crate::protocol::{ErrorResponse, Operation, Outcome, Request};

/// `{metadata: {q}, data}` envelopes exchanged over the framed tcp transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestResponseCodec;

impl RequestResponseCodec {
    /// Envelope a client sends.
    pub fn request_envelope(request: Request) -> Value {
        json!({
            "metadata": {"q": request.operation().qualifier()},
            "data": request.into_data(),
        })
    }

    /// Splits a server envelope into the payload or the canonical error.
    pub fn decode_reply(frame: &[u8]) -> Result<Result<Value, ErrorResponse>, serde_json::Error> {
        let mut envelope: Value = serde_json::from_slice(frame)?;
        let data = envelope
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null);
        let is_error = envelope["metadata"]["q"]
            .as_str()
            .map(|q| q.starts_with(ERROR_QUALIFIER_PREFIX))
            .unwrap_or(false);

        if is_error {
            serde_json::from_value(data).map(Err)
        } else {
            Ok(Ok(data))
        }
    }
}

impl Codec for RequestResponseCodec {
    type Context = Option<String>;
    type Output = Value;

    fn decode(&self, frame: &[u8]) -> (Option<String>, Result<Request, ErrorResponse>) {
        let mut envelope = match decode_object(frame) {
            Ok(envelope) => envelope,
            Err(err) => return (None, Err(err)),
        };

        let qualifier = envelope
            .get("metadata")
            .and_then(|metadata| metadata.get("q"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let operation = match qualifier.as_deref().map(Operation::from_qualifier) {
            Some(Some(operation)) => operation,
            Some(None) => {
                let err = bad_request(format!(
                    "Unknown qualifier '{}'",
                    qualifier.as_deref().unwrap_or_default()
                ));
                return (qualifier, Err(err));
            }
            None => return (None, Err(bad_request("Please specify 'q'"))),
        };

        let data = envelope.remove("data").unwrap_or(Value::Null);
        (qualifier, decode_request(operation, data))
    }

    fn encode(&self, qualifier: Option<String>, outcome: Outcome) -> Value {
        match outcome {
            Ok(response) => json!({
                "data": response.into_payload(),
                "metadata": {"q": qualifier},
            }),
            Err(err) => json!({
                "data": err.to_payload(),
                "metadata": {"q": err.qualifier()},
            }),
        }
    }
}
