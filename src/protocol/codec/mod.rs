//! Transport envelopes.
//!
//! Every transport unwraps its envelope into a [`Request`] and wraps an
//! [`Outcome`] back, the core only sees the normalized types.
mod http;
pub use self::http::{HttpCodec, HttpReply};

mod request_response;
pub use self::request_response::RequestResponseCodec;

mod streaming;
pub use self::streaming::{StreamingCodec, StreamingContext};

use serde_json::{Map, Value};

use crate::protocol::{ErrorResponse, Operation, Outcome, Request};

pub trait Codec {
    /// What has to be echoed back to correlate the response.
    type Context;
    type Output;

    fn decode(&self, frame: &[u8]) -> (Self::Context, Result<Request, ErrorResponse>);

    fn encode(&self, context: Self::Context, outcome: Outcome) -> Self::Output;
}

pub(crate) fn bad_request(message: impl Into<String>) -> ErrorResponse {
    ErrorResponse::new(400, message)
}

pub(crate) fn decode_object(frame: &[u8]) -> Result<Map<String, Value>, ErrorResponse> {
    match serde_json::from_slice(frame) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(bad_request("Failed to decode message: json object expected")),
        Err(err) => Err(bad_request(format!("Failed to decode message: {}", err))),
    }
}

pub(crate) fn decode_request(operation: Operation, data: Value) -> Result<Request, ErrorResponse> {
    Request::decode(operation, data).map_err(ErrorResponse::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Entry, Response};
    use serde_json::json;

    fn fields() -> Value {
        json!({"token": "t", "repository": "FX", "key": "Gold"})
    }

    fn via_streaming(outcome: Outcome) -> (Request, Value) {
        let codec = StreamingCodec;
        let frame = json!({"q": "/configuration/fetch", "sid": 7, "d": fields()}).to_string();
        let (context, request) = codec.decode(frame.as_bytes());
        let mut message = codec.encode(context, outcome).remove(0);
        (request.unwrap(), message["d"].take())
    }

    fn via_request_response(outcome: Outcome) -> (Request, Value) {
        let codec = RequestResponseCodec;
        let frame = json!({"metadata": {"q": "/configuration/fetch"}, "data": fields()}).to_string();
        let (context, request) = codec.decode(frame.as_bytes());
        let mut envelope = codec.encode(context, outcome);
        (request.unwrap(), envelope["data"].take())
    }

    fn via_http(outcome: Outcome) -> (Request, Value) {
        let codec = HttpCodec::new("fetch");
        let frame = fields().to_string();
        let (context, request) = codec.decode(frame.as_bytes());
        (request.unwrap(), codec.encode(context, outcome).body)
    }

    #[test]
    fn transports_are_equivalent() {
        let outcomes = vec![
            Ok(Response::Entry(Entry {
                key: "Gold".into(),
                value: json!({"name": "Gold", "instrument": "XAU"}),
            })),
            Err(ErrorResponse::new(500, "Key 'Gold' not found")),
        ];

        for outcome in outcomes {
            let (r1, p1) = via_streaming(outcome.clone());
            let (r2, p2) = via_request_response(outcome.clone());
            let (r3, p3) = via_http(outcome);

            assert_eq!(r1, r2);
            assert_eq!(r2, r3);
            assert_eq!(p1, p2);
            assert_eq!(p2, p3);
        }
    }
}
