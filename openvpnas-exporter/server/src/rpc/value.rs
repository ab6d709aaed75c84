use std::collections::BTreeMap;

use crate::rpc::Error;

/// A dynamically typed XML-RPC value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    DateTime(String),
    Base64(Vec<u8>),
    Struct(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Nil,
}

impl Value {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Bool(_) => "boolean",
            Self::String(_) => "string",
            Self::Double(_) => "double",
            Self::DateTime(_) => "dateTime.iso8601",
            Self::Base64(_) => "base64",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
            Self::Nil => "nil",
        }
    }

    /// Views a struct value as named members.
    ///
    /// # Errors
    /// Returns an error if the value is not a struct.
    pub fn as_members(&self) -> Result<Members<'_>, Error> {
        match self {
            Self::Struct(members) => Ok(Members(members)),
            other => Err(Error::UnexpectedType {
                field: "result",
                expected: "struct",
                found: other.type_name(),
            }),
        }
    }
}

/// Typed decoding of a method result.
pub trait FromValue: Sized {
    /// # Errors
    /// Returns an error if a required field is absent or has the wrong type.
    fn from_value(value: &Value) -> Result<Self, Error>;
}

/// Members of an XML-RPC struct, looked up by name.
///
/// Members that are absent or `nil` are treated the same way.
#[derive(Clone, Copy, Debug)]
pub struct Members<'a>(&'a BTreeMap<String, Value>);

impl<'a> Members<'a> {
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.0.get(field).filter(|value| !matches!(value, Value::Nil))
    }

    /// # Errors
    /// Returns an error if the member is absent or not an integer.
    pub fn required_i64(&self, field: &'static str) -> Result<i64, Error> {
        match self.get(field) {
            Some(Value::Int(value)) => Ok(*value),
            Some(other) => Err(unexpected(field, "int", other)),
            None => Err(Error::MissingField { field }),
        }
    }

    /// # Errors
    /// Returns an error if the member is present but not an integer.
    pub fn optional_i64(&self, field: &'static str) -> Result<Option<i64>, Error> {
        match self.get(field) {
            Some(Value::Int(value)) => Ok(Some(*value)),
            Some(other) => Err(unexpected(field, "int", other)),
            None => Ok(None),
        }
    }

    /// # Errors
    /// Returns an error if the member is present but not a boolean.
    pub fn optional_bool(&self, field: &'static str) -> Result<Option<bool>, Error> {
        match self.get(field) {
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(other) => Err(unexpected(field, "boolean", other)),
            None => Ok(None),
        }
    }

    /// # Errors
    /// Returns an error if the member is present but not a string.
    pub fn optional_string(&self, field: &'static str) -> Result<Option<String>, Error> {
        match self.get(field) {
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(unexpected(field, "string", other)),
            None => Ok(None),
        }
    }

    /// # Errors
    /// Returns an error if the member is present but not an array of strings.
    pub fn optional_strings(&self, field: &'static str) -> Result<Vec<String>, Error> {
        match self.get(field) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| match value {
                    Value::String(value) => Ok(value.clone()),
                    other => Err(unexpected(field, "string", other)),
                })
                .collect(),
            Some(other) => Err(unexpected(field, "array", other)),
            None => Ok(Vec::new()),
        }
    }
}

fn unexpected(field: &'static str, expected: &'static str, found: &Value) -> Error {
    Error::UnexpectedType { field, expected, found: found.type_name() }
}
