use serde_json::{Map, Value};

use crate::protocol::codec::{bad_request, decode_object, decode_request, Codec};
use crate::protocol::{ErrorResponse, Operation, Outcome, Request};

// Signal sent after the last data message of a stream.
const SIGNAL_COMPLETE: u8 = 1;
const SIGNAL_ERROR: u8 = 2;

/// `{q, sid, d}` messages, one request per text message.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingCodec;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingContext {
    qualifier: Option<String>,
    sid: Option<Value>,
}

impl StreamingContext {
    fn message(&self) -> Map<String, Value> {
        let mut message = Map::new();
        if let Some(sid) = &self.sid {
            message.insert("sid".into(), sid.clone());
        }
        message
    }
}

impl Codec for StreamingCodec {
    type Context = StreamingContext;
    type Output = Vec<Value>;

    fn decode(&self, frame: &[u8]) -> (StreamingContext, Result<Request, ErrorResponse>) {
        let mut envelope = match decode_object(frame) {
            Ok(envelope) => envelope,
            Err(err) => return (StreamingContext::default(), Err(err)),
        };

        let context = StreamingContext {
            qualifier: envelope
                .get("q")
                .and_then(Value::as_str)
                .map(str::to_owned),
            sid: envelope.remove("sid").filter(Value::is_number),
        };

        let operation = match context.qualifier.as_deref() {
            Some(q) => match Operation::from_qualifier(q) {
                Some(operation) => operation,
                None => {
                    let err = bad_request(format!("Unknown qualifier '{}'", q));
                    return (context, Err(err));
                }
            },
            None => return (context, Err(bad_request("Please specify 'q'"))),
        };

        let data = envelope.remove("d").unwrap_or(Value::Null);
        let request = decode_request(operation, data);
        (context, request)
    }

    fn encode(&self, context: StreamingContext, outcome: Outcome) -> Vec<Value> {
        match outcome {
            Ok(response) => {
                let mut data = context.message();
                if let Some(q) = &context.qualifier {
                    data.insert("q".into(), Value::String(q.clone()));
                }
                data.insert("d".into(), response.into_payload());

                let mut complete = context.message();
                complete.insert("sig".into(), SIGNAL_COMPLETE.into());

                vec![Value::Object(data), Value::Object(complete)]
            }
            Err(err) => {
                let mut message = context.message();
                message.insert("sig".into(), SIGNAL_ERROR.into());
                message.insert("q".into(), Value::String(err.qualifier()));
                message.insert("d".into(), err.to_payload());

                vec![Value::Object(message)]
            }
        }
    }
}
