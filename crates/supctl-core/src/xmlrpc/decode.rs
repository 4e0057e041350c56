//! XML-RPC document readers.
//!
//! Documents are first read into a small element tree with `quick-xml`,
//! then interpreted. Text inside container elements (indentation between
//! tags) is ignored; text inside scalar elements is kept byte for byte.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Fault, MethodResponse, Value};

/// Deepest element nesting accepted in a document. Each nested array or
/// struct costs three levels.
pub const MAX_DEPTH: usize = 128;

/// Failure to read an XML-RPC document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("document is empty")]
    Empty,

    #[error("expected <{expected}>, found <{found}>")]
    UnexpectedElement {
        expected: &'static str,
        found: String,
    },

    #[error("missing <{0}> element")]
    MissingElement(&'static str),

    #[error("invalid {kind} literal {text:?}")]
    InvalidScalar { kind: &'static str, text: String },

    #[error("expected exactly one response value, found {0}")]
    ParamCount(usize),

    #[error("fault struct is malformed: {0}")]
    MalformedFault(String),
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn child(&self, name: &'static str) -> Result<&Node, CodecError> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .ok_or(CodecError::MissingElement(name))
    }

    fn expect(&self, name: &'static str) -> Result<&Node, CodecError> {
        if self.name == name {
            Ok(self)
        } else {
            Err(CodecError::UnexpectedElement {
                expected: name,
                found: self.name.clone(),
            })
        }
    }
}

fn element_name(start: &BytesStart<'_>) -> Result<String, CodecError> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_string)
        .map_err(|e| CodecError::Xml(e.to_string()))
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), CodecError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(CodecError::Xml("multiple root elements".to_string())),
    }
    Ok(())
}

fn parse_tree(xml: &str) -> Result<Node, CodecError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| CodecError::Xml(e.to_string()))?;
        match event {
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(CodecError::Xml(format!(
                        "nesting deeper than {MAX_DEPTH} elements"
                    )));
                }
                stack.push(Node::new(element_name(&start)?));
            }
            Event::Empty(start) => {
                let node = Node::new(element_name(&start)?);
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| CodecError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| CodecError::Xml(e.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                let text =
                    std::str::from_utf8(&data).map_err(|e| CodecError::Xml(e.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(CodecError::Xml(format!("unclosed <{}>", open.name)));
    }
    root.ok_or(CodecError::Empty)
}

fn scalar<T: std::str::FromStr>(node: &Node, kind: &'static str) -> Result<T, CodecError> {
    node.text
        .trim()
        .parse()
        .map_err(|_| CodecError::InvalidScalar {
            kind,
            text: node.text.clone(),
        })
}

fn read_value(node: &Node) -> Result<Value, CodecError> {
    node.expect("value")?;
    let Some(typed) = node.children.first() else {
        // An untyped <value> is a string.
        return Ok(Value::String(node.text.clone()));
    };

    match typed.name.as_str() {
        "int" | "i4" | "i8" => Ok(Value::Int(scalar(typed, "int")?)),
        "boolean" => match typed.text.trim() {
            "1" => Ok(Value::Boolean(true)),
            "0" => Ok(Value::Boolean(false)),
            _ => Err(CodecError::InvalidScalar {
                kind: "boolean",
                text: typed.text.clone(),
            }),
        },
        "string" => Ok(Value::String(typed.text.clone())),
        "double" => Ok(Value::Double(scalar(typed, "double")?)),
        "dateTime.iso8601" => Ok(Value::DateTime(typed.text.trim().to_string())),
        "base64" => Ok(Value::Base64(typed.text.trim().to_string())),
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = typed.child("data")?;
            data.children
                .iter()
                .map(read_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in &typed.children {
                member.expect("member")?;
                let name = member.child("name")?.text.clone();
                let value = read_value(member.child("value")?)?;
                members.insert(name, value);
            }
            Ok(Value::Struct(members))
        }
        other => Err(CodecError::UnexpectedElement {
            expected: "value type",
            found: other.to_string(),
        }),
    }
}

fn read_fault(fault: &Node) -> Result<Fault, CodecError> {
    let value = read_value(fault.child("value")?)?;
    let Value::Struct(mut members) = value else {
        return Err(CodecError::MalformedFault(format!(
            "expected struct, found {}",
            value.kind()
        )));
    };
    let code = match members.remove("faultCode") {
        Some(Value::Int(n)) => i32::try_from(n)
            .map_err(|_| CodecError::MalformedFault(format!("faultCode {n} out of range")))?,
        Some(other) => {
            return Err(CodecError::MalformedFault(format!(
                "faultCode is {}",
                other.kind()
            )));
        }
        None => return Err(CodecError::MalformedFault("missing faultCode".to_string())),
    };
    let message = match members.remove("faultString") {
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(CodecError::MalformedFault(format!(
                "faultString is {}",
                other.kind()
            )));
        }
        None => {
            return Err(CodecError::MalformedFault(
                "missing faultString".to_string(),
            ));
        }
    };
    Ok(Fault { code, message })
}

fn read_params(params: &Node) -> Result<Vec<Value>, CodecError> {
    params
        .children
        .iter()
        .map(|param| read_value(param.expect("param")?.child("value")?))
        .collect()
}

/// Read a `<methodResponse>` into either its single value or its fault.
pub fn decode_response(xml: &str) -> Result<MethodResponse, CodecError> {
    let root = parse_tree(xml)?;
    root.expect("methodResponse")?;

    if let Ok(fault) = root.child("fault") {
        return read_fault(fault).map(MethodResponse::Fault);
    }

    let mut values = read_params(root.child("params")?)?;
    if values.len() != 1 {
        return Err(CodecError::ParamCount(values.len()));
    }
    Ok(MethodResponse::Success(values.remove(0)))
}

/// Read a `<methodCall>` into its method name and positional arguments.
pub fn decode_call(xml: &str) -> Result<(String, Vec<Value>), CodecError> {
    let root = parse_tree(xml)?;
    root.expect("methodCall")?;
    let method = root.child("methodName")?.text.trim().to_string();
    let params = match root.child("params") {
        Ok(params) => read_params(params)?,
        Err(_) => Vec::new(),
    };
    Ok((method, params))
}
