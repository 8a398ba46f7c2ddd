//! Request and response envelopes.
//!
//! Envelopes travel as plain values through the active codec:
//! - request: `[function_name, [arg, ...]]`
//! - response: `[status_code, payload]`
//!
//! Shape checking happens here, after the codec has produced a value, so a
//! blob that decodes fine but has the wrong shape is a protocol error rather
//! than a codec error.

use std::fmt;

use serde_json::Value;

/// Numeric status carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Payload is the function's return value.
    Ok,
    /// Payload describes a protocol-level problem.
    Error,
    /// Payload describes an application failure raised by the function.
    Exception,
    /// A code this implementation does not know.
    Unknown(i64),
}

impl Status {
    pub const OK_CODE: i64 = 0;
    pub const ERROR_CODE: i64 = 1;
    pub const EXCEPTION_CODE: i64 = 2;

    pub fn from_code(code: i64) -> Self {
        match code {
            Self::OK_CODE => Self::Ok,
            Self::ERROR_CODE => Self::Error,
            Self::EXCEPTION_CODE => Self::Exception,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Ok => Self::OK_CODE,
            Self::Error => Self::ERROR_CODE,
            Self::Exception => Self::EXCEPTION_CODE,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Error => f.write_str("ERROR"),
            Self::Exception => f.write_str("EXCEPTION"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// A value that does not have the shape of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope must be a 2-element array, got {0}")]
    Shape(&'static str),

    #[error("function name must be a string, got {0}")]
    FunctionName(&'static str),

    #[error("arguments must be a list or a tuple, got {0}")]
    Arguments(&'static str),

    #[error("status must be an integer, got {0}")]
    Status(&'static str),
}

/// A call to a named function with positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub function: String,
    pub args: Vec<Value>,
}

impl Request {
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            Value::String(self.function.clone()),
            Value::Array(self.args.clone()),
        ])
    }

    pub fn into_value(self) -> Value {
        Value::Array(vec![Value::String(self.function), Value::Array(self.args)])
    }

    /// Interpret a decoded value as a request.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let [function, args] = into_pair(value)?;
        let function = match function {
            Value::String(name) => name,
            other => return Err(EnvelopeError::FunctionName(kind_of(&other))),
        };
        let args = match args {
            Value::Array(args) => args,
            other => return Err(EnvelopeError::Arguments(kind_of(&other))),
        };
        Ok(Self { function, args })
    }
}

/// The outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub payload: Value,
}

impl Response {
    pub fn ok(payload: Value) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            payload: Value::String(message.into()),
        }
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self {
            status: Status::Exception,
            payload: Value::String(message.into()),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(vec![Value::from(self.status.code()), self.payload.clone()])
    }

    pub fn into_value(self) -> Value {
        Value::Array(vec![Value::from(self.status.code()), self.payload])
    }

    /// Interpret a decoded value as a response.
    ///
    /// Unknown status codes are kept as [`Status::Unknown`]; only a
    /// non-integer status is a shape error.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let [status, payload] = into_pair(value)?;
        let code = status
            .as_i64()
            .ok_or_else(|| EnvelopeError::Status(kind_of(&status)))?;
        Ok(Self {
            status: Status::from_code(code),
            payload,
        })
    }

    /// Payload rendered as text, for ERROR and EXCEPTION messages.
    pub fn payload_text(&self) -> String {
        match &self.payload {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

fn into_pair(value: Value) -> Result<[Value; 2], EnvelopeError> {
    match value {
        Value::Array(items) => {
            let found = if items.len() == 2 { "array" } else { "array of wrong length" };
            <[Value; 2]>::try_from(items).map_err(|_| EnvelopeError::Shape(found))
        }
        other => Err(EnvelopeError::Shape(kind_of(&other))),
    }
}

/// Short type name of a JSON value, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_wire_shape() {
        let request = Request::new("add", vec![json!(8), json!(4)]);
        assert_eq!(request.to_value(), json!(["add", [8, 4]]));
        assert_eq!(Request::from_value(request.into_value()).unwrap().args.len(), 2);
    }

    #[test]
    fn request_with_no_arguments() {
        let request = Request::from_value(json!(["ping", []])).unwrap();
        assert_eq!(request.function, "ping");
        assert!(request.args.is_empty());
    }

    #[test]
    fn request_arguments_must_be_a_sequence() {
        let err = Request::from_value(json!(["add", 8])).unwrap_err();
        assert_eq!(err, EnvelopeError::Arguments("number"));

        let err = Request::from_value(json!(["add", {"x": 1}])).unwrap_err();
        assert_eq!(err, EnvelopeError::Arguments("object"));
    }

    #[test]
    fn request_function_name_must_be_a_string() {
        let err = Request::from_value(json!([42, []])).unwrap_err();
        assert_eq!(err, EnvelopeError::FunctionName("number"));
    }

    #[test]
    fn request_must_be_a_pair() {
        assert_eq!(
            Request::from_value(json!("add")).unwrap_err(),
            EnvelopeError::Shape("string")
        );
        assert_eq!(
            Request::from_value(json!(["add", [], "extra"])).unwrap_err(),
            EnvelopeError::Shape("array of wrong length")
        );
    }

    #[test]
    fn status_codes() {
        for status in [Status::Ok, Status::Error, Status::Exception, Status::Unknown(7)] {
            assert_eq!(Status::from_code(status.code()), status);
        }
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::Error.code(), 1);
        assert_eq!(Status::Exception.code(), 2);
    }

    #[test]
    fn response_wire_shape() {
        assert_eq!(Response::ok(json!(12)).to_value(), json!([0, 12]));
        assert_eq!(Response::error("nope").to_value(), json!([1, "nope"]));
        assert_eq!(Response::exception("bad").into_value(), json!([2, "bad"]));
    }

    #[test]
    fn response_keeps_unknown_status() {
        let response = Response::from_value(json!([9, null])).unwrap();
        assert_eq!(response.status, Status::Unknown(9));
    }

    #[test]
    fn response_status_must_be_integer() {
        let err = Response::from_value(json!(["0", 1])).unwrap_err();
        assert_eq!(err, EnvelopeError::Status("string"));
    }

    #[test]
    fn payload_text_for_non_strings() {
        let response = Response {
            status: Status::Exception,
            payload: json!({"code": 3}),
        };
        assert_eq!(response.payload_text(), r#"{"code":3}"#);
    }
}
