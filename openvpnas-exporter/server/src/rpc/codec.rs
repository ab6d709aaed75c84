//! XML-RPC `methodCall` encoding and `methodResponse` decoding.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use quick_xml::{escape::escape, events::Event, Reader};
use snafu::ResultExt;

use crate::rpc::{error, Error, Value};

/// Renders a `methodCall` document.
#[must_use]
pub fn encode_method_call(method: &str, params: &[Value]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    xml.push_str(&escape(method));
    xml.push_str("</methodName><params>");
    for param in params {
        xml.push_str("<param>");
        write_value(&mut xml, param);
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>");
    xml
}

fn write_value(xml: &mut String, value: &Value) {
    xml.push_str("<value>");
    match value {
        Value::Int(value) => xml.push_str(&format!("<int>{value}</int>")),
        Value::Bool(value) => {
            xml.push_str(if *value { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
        }
        Value::String(value) => {
            xml.push_str("<string>");
            xml.push_str(&escape(value.as_str()));
            xml.push_str("</string>");
        }
        Value::Double(value) => xml.push_str(&format!("<double>{value}</double>")),
        Value::DateTime(value) => {
            xml.push_str("<dateTime.iso8601>");
            xml.push_str(&escape(value.as_str()));
            xml.push_str("</dateTime.iso8601>");
        }
        Value::Base64(bytes) => {
            xml.push_str("<base64>");
            xml.push_str(&BASE64.encode(bytes));
            xml.push_str("</base64>");
        }
        Value::Struct(members) => {
            xml.push_str("<struct>");
            for (name, member) in members {
                xml.push_str("<member><name>");
                xml.push_str(&escape(name.as_str()));
                xml.push_str("</name>");
                write_value(xml, member);
                xml.push_str("</member>");
            }
            xml.push_str("</struct>");
        }
        Value::Array(values) => {
            xml.push_str("<array><data>");
            for value in values {
                write_value(xml, value);
            }
            xml.push_str("</data></array>");
        }
        Value::Nil => xml.push_str("<nil/>"),
    }
    xml.push_str("</value>");
}

/// Decodes a `methodResponse` document into its single result value.
///
/// # Errors
/// Returns [`Error::Fault`] when the endpoint reports a fault, and a decode
/// error when the document is not a well-formed response.
pub fn decode_method_response(body: &[u8]) -> Result<Value, Error> {
    let mut tokens = Tokenizer::new(body);

    tokens.expect_open("methodResponse")?;
    let outcome = match tokens.next_significant()? {
        Token::Open(tag) if tag == "params" => {
            tokens.expect_open("param")?;
            let value = tokens.parse_value_element()?;
            tokens.expect_close("param")?;
            tokens.expect_close("params")?;
            Ok(value)
        }
        Token::Empty(tag) if tag == "params" => Ok(Value::Nil),
        Token::Open(tag) if tag == "fault" => {
            let value = tokens.parse_value_element()?;
            tokens.expect_close("fault")?;
            Err(fault_from(&value))
        }
        token => return Err(token.unexpected("`params` or `fault`")),
    };
    tokens.expect_close("methodResponse")?;

    outcome
}

fn fault_from(value: &Value) -> Error {
    let Value::Struct(members) = value else {
        return Error::MalformedResponse {
            message: format!("fault carries a {} instead of a struct", value.type_name()),
        };
    };
    let code = match members.get("faultCode") {
        Some(Value::Int(code)) => *code,
        _ => 0,
    };
    let message = match members.get("faultString") {
        Some(Value::String(message)) => message.clone(),
        _ => String::new(),
    };
    Error::Fault { code, message }
}

#[derive(Debug, Eq, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
}

impl Token {
    fn unexpected(&self, expected: &str) -> Error {
        let found = match self {
            Self::Open(tag) => format!("<{tag}>"),
            Self::Close(tag) => format!("</{tag}>"),
            Self::Empty(tag) => format!("<{tag}/>"),
            Self::Text(text) => format!("text {text:?}"),
        };
        Error::MalformedResponse { message: format!("expected {expected}, found {found}") }
    }

    fn is_blank(&self) -> bool { matches!(self, Self::Text(text) if text.trim().is_empty()) }
}

struct Tokenizer<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Tokenizer<'a> {
    fn new(body: &'a [u8]) -> Self { Self { reader: Reader::from_reader(body) } }

    fn next(&mut self) -> Result<Token, Error> {
        loop {
            let token = match self.reader.read_event().context(error::ParseXmlSnafu)? {
                Event::Start(tag) => Token::Open(tag_name(tag.name().as_ref())),
                Event::End(tag) => Token::Close(tag_name(tag.name().as_ref())),
                Event::Empty(tag) => Token::Empty(tag_name(tag.name().as_ref())),
                Event::Text(text) => {
                    Token::Text(text.unescape().context(error::ParseXmlSnafu)?.into_owned())
                }
                Event::CData(data) => {
                    Token::Text(String::from_utf8_lossy(&data.into_inner()).into_owned())
                }
                Event::Eof => {
                    return Err(Error::MalformedResponse {
                        message: "unexpected end of document".to_string(),
                    })
                }
                // Declarations, comments and processing instructions carry no data
                _ => continue,
            };
            return Ok(token);
        }
    }

    fn next_significant(&mut self) -> Result<Token, Error> {
        loop {
            let token = self.next()?;
            if !token.is_blank() {
                return Ok(token);
            }
        }
    }

    fn expect_open(&mut self, expected: &str) -> Result<(), Error> {
        match self.next_significant()? {
            Token::Open(tag) if tag == expected => Ok(()),
            token => Err(token.unexpected(&format!("<{expected}>"))),
        }
    }

    fn expect_close(&mut self, expected: &str) -> Result<(), Error> {
        match self.next_significant()? {
            Token::Close(tag) if tag == expected => Ok(()),
            token => Err(token.unexpected(&format!("</{expected}>"))),
        }
    }

    /// Parses a complete `<value>` element, accepting `<value/>` as an empty string.
    fn parse_value_element(&mut self) -> Result<Value, Error> {
        match self.next_significant()? {
            Token::Open(tag) if tag == "value" => self.parse_value(),
            Token::Empty(tag) if tag == "value" => Ok(Value::String(String::new())),
            token => Err(token.unexpected("<value>")),
        }
    }

    /// Parses the content of a `<value>` whose start tag was consumed.
    fn parse_value(&mut self) -> Result<Value, Error> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Token::Text(chunk) => text.push_str(&chunk),
                // Untyped content is a string
                Token::Close(tag) if tag == "value" => return Ok(Value::String(text)),
                token @ (Token::Open(_) | Token::Empty(_)) if !text.trim().is_empty() => {
                    return Err(token.unexpected("</value>"))
                }
                Token::Open(tag) => {
                    let value = self.parse_typed(&tag)?;
                    self.expect_close("value")?;
                    return Ok(value);
                }
                Token::Empty(tag) => {
                    let value = empty_typed(&tag)?;
                    self.expect_close("value")?;
                    return Ok(value);
                }
                token @ Token::Close(_) => return Err(token.unexpected("</value>")),
            }
        }
    }

    fn parse_typed(&mut self, tag: &str) -> Result<Value, Error> {
        let value = match tag {
            "int" | "i4" | "i8" => {
                let text = self.read_text(tag)?;
                let value = text.trim().parse::<i64>().map_err(|err| Error::MalformedResponse {
                    message: format!("invalid integer {text:?}: {err}"),
                })?;
                Value::Int(value)
            }
            "boolean" => match self.read_text(tag)?.trim() {
                "1" => Value::Bool(true),
                "0" => Value::Bool(false),
                other => {
                    return Err(Error::MalformedResponse {
                        message: format!("invalid boolean {other:?}"),
                    })
                }
            },
            "string" => Value::String(self.read_text(tag)?),
            "double" => {
                let text = self.read_text(tag)?;
                let value = text.trim().parse::<f64>().map_err(|err| Error::MalformedResponse {
                    message: format!("invalid double {text:?}: {err}"),
                })?;
                Value::Double(value)
            }
            "dateTime.iso8601" => Value::DateTime(self.read_text(tag)?.trim().to_string()),
            "base64" => {
                let text: String =
                    self.read_text(tag)?.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = BASE64.decode(text).map_err(|err| Error::MalformedResponse {
                    message: format!("invalid base64 payload: {err}"),
                })?;
                Value::Base64(bytes)
            }
            "struct" => self.parse_struct()?,
            "array" => self.parse_array()?,
            "nil" => {
                self.expect_close("nil")?;
                Value::Nil
            }
            other => {
                return Err(Error::MalformedResponse {
                    message: format!("unknown value type <{other}>"),
                })
            }
        };
        Ok(value)
    }

    fn read_text(&mut self, tag: &str) -> Result<String, Error> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Token::Text(chunk) => text.push_str(&chunk),
                Token::Close(closing) if closing == tag => return Ok(text),
                token => return Err(token.unexpected(&format!("text or </{tag}>"))),
            }
        }
    }

    fn parse_struct(&mut self) -> Result<Value, Error> {
        let mut members = BTreeMap::new();
        loop {
            match self.next_significant()? {
                Token::Open(tag) if tag == "member" => {
                    self.expect_open("name")?;
                    let name = self.read_text("name")?;
                    let value = self.parse_value_element()?;
                    self.expect_close("member")?;
                    // Later duplicates win
                    let _previous = members.insert(name, value);
                }
                Token::Close(tag) if tag == "struct" => return Ok(Value::Struct(members)),
                token => return Err(token.unexpected("<member> or </struct>")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, Error> {
        let mut values = Vec::new();
        match self.next_significant()? {
            Token::Open(tag) if tag == "data" => loop {
                match self.next_significant()? {
                    Token::Open(tag) if tag == "value" => values.push(self.parse_value()?),
                    Token::Empty(tag) if tag == "value" => values.push(Value::String(String::new())),
                    Token::Close(tag) if tag == "data" => break,
                    token => return Err(token.unexpected("<value> or </data>")),
                }
            },
            Token::Empty(tag) if tag == "data" => {}
            token => return Err(token.unexpected("<data>")),
        }
        self.expect_close("array")?;
        Ok(Value::Array(values))
    }
}

fn empty_typed(tag: &str) -> Result<Value, Error> {
    match tag {
        "string" => Ok(Value::String(String::new())),
        "struct" => Ok(Value::Struct(BTreeMap::new())),
        "array" => Ok(Value::Array(Vec::new())),
        "base64" => Ok(Value::Base64(Vec::new())),
        "nil" => Ok(Value::Nil),
        other => Err(Error::MalformedResponse { message: format!("empty <{other}/> element") }),
    }
}

fn tag_name(name: &[u8]) -> String { String::from_utf8_lossy(name).into_owned() }
