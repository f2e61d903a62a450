use serde_json::Value;

use crate::protocol::codec::{bad_request, decode_object, decode_request, Codec};
use crate::protocol::{ErrorResponse, Operation, Outcome, Request};

/// Plain json bodies, the operation comes from the request path.
#[derive(Debug, Clone)]
pub struct HttpCodec {
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

impl HttpCodec {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            name: operation_name.into(),
        }
    }
}

impl Codec for HttpCodec {
    type Context = ();
    type Output = HttpReply;

    fn decode(&self, body: &[u8]) -> ((), Result<Request, ErrorResponse>) {
        let operation = match Operation::from_name(&self.name) {
            Some(operation) => operation,
            None => return ((), Err(bad_request(format!("Unknown operation '{}'", self.name)))),
        };

        let data = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            match decode_object(body) {
                Ok(fields) => Value::Object(fields),
                Err(err) => return ((), Err(err)),
            }
        };

        ((), decode_request(operation, data))
    }

    fn encode(&self, _: (), outcome: Outcome) -> HttpReply {
        match outcome {
            Ok(response) => HttpReply {
                status: 200,
                body: response.into_payload(),
            },
            Err(err) => HttpReply {
                status: err.error_code,
                body: err.to_payload(),
            },
        }
    }
}
