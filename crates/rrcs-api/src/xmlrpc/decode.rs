// XML-RPC document readers.
//
// A small recursive-descent parser over quick-xml pull events. Whitespace
// between structural elements is skipped; whitespace inside an untyped
// `<value>` is preserved, since that form is an implicit string.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesText, Event};

use super::Value;
use crate::error::Error;

/// Deepest `<value>` nesting accepted. RRCS replies nest two levels.
pub const MAX_DEPTH: usize = 64;

/// Decode a `<methodResponse>`. A `<fault>` becomes [`Error::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, Error> {
    let mut parser = Parser::new(xml);
    parser.expect_start(b"methodResponse")?;

    match parser.next_significant()? {
        Event::Start(e) if e.name().as_ref() == b"params" => {
            parser.expect_start(b"param")?;
            let value = parser.parse_value_element()?;
            parser.expect_end(b"param")?;
            parser.expect_end(b"params")?;
            parser.expect_end(b"methodResponse")?;
            Ok(value)
        }
        Event::Empty(e) if e.name().as_ref() == b"params" => {
            parser.expect_end(b"methodResponse")?;
            Ok(Value::Nil)
        }
        Event::Start(e) if e.name().as_ref() == b"fault" => {
            let value = parser.parse_value_element()?;
            parser.expect_end(b"fault")?;
            Err(fault_from(&value))
        }
        other => Err(Error::malformed(format!(
            "expected <params> or <fault>, found {}",
            describe(&other)
        ))),
    }
}

/// Decode a `<methodCall>` into its method name and parameter list.
pub fn decode_call(xml: &str) -> Result<(String, Vec<Value>), Error> {
    let mut parser = Parser::new(xml);
    parser.expect_start(b"methodCall")?;
    parser.expect_start(b"methodName")?;
    let method = parser.read_text(b"methodName")?.trim().to_owned();
    if method.is_empty() {
        return Err(Error::malformed("empty methodName"));
    }

    let mut params = Vec::new();
    match parser.next_significant()? {
        Event::Start(e) if e.name().as_ref() == b"params" => {
            loop {
                match parser.next_significant()? {
                    Event::Start(e) if e.name().as_ref() == b"param" => {
                        params.push(parser.parse_value_element()?);
                        parser.expect_end(b"param")?;
                    }
                    Event::End(e) if e.name().as_ref() == b"params" => break,
                    other => {
                        return Err(Error::malformed(format!(
                            "expected <param>, found {}",
                            describe(&other)
                        )));
                    }
                }
            }
            parser.expect_end(b"methodCall")?;
        }
        Event::Empty(e) if e.name().as_ref() == b"params" => {
            parser.expect_end(b"methodCall")?;
        }
        Event::End(e) if e.name().as_ref() == b"methodCall" => {}
        other => {
            return Err(Error::malformed(format!(
                "expected <params>, found {}",
                describe(&other)
            )));
        }
    }

    Ok((method, params))
}

fn fault_from(value: &Value) -> Error {
    let code = value.field("faultCode").and_then(Value::as_i64).unwrap_or(0);
    let message = value
        .field("faultString")
        .and_then(Value::as_str)
        .unwrap_or("unknown fault")
        .to_owned();
    Error::Fault { code, message }
}

// ── Parser ──────────────────────────────────────────────────────────

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
            depth: 0,
        }
    }

    fn raw_next(&mut self) -> Result<Event<'a>, Error> {
        self.reader
            .read_event()
            .map_err(|e| Error::malformed(e.to_string()))
    }

    /// Next event that carries structure: skips the prolog, comments,
    /// processing instructions and whitespace-only text.
    fn next_significant(&mut self) -> Result<Event<'a>, Error> {
        loop {
            match self.raw_next()? {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Text(t) => {
                    let text = unescape(&t)?;
                    if !text.trim().is_empty() {
                        return Err(Error::malformed(format!(
                            "unexpected text '{}'",
                            text.trim()
                        )));
                    }
                }
                other => return Ok(other),
            }
        }
    }

    fn expect_start(&mut self, name: &[u8]) -> Result<(), Error> {
        match self.next_significant()? {
            Event::Start(e) if e.name().as_ref() == name => Ok(()),
            other => Err(Error::malformed(format!(
                "expected <{}>, found {}",
                String::from_utf8_lossy(name),
                describe(&other)
            ))),
        }
    }

    fn expect_end(&mut self, name: &[u8]) -> Result<(), Error> {
        match self.next_significant()? {
            Event::End(e) if e.name().as_ref() == name => Ok(()),
            other => Err(Error::malformed(format!(
                "expected </{}>, found {}",
                String::from_utf8_lossy(name),
                describe(&other)
            ))),
        }
    }

    /// Collect character data up to the closing tag `end`.
    fn read_text(&mut self, end: &[u8]) -> Result<String, Error> {
        let mut text = String::new();
        loop {
            match self.raw_next()? {
                Event::Text(t) => text.push_str(&unescape(&t)?),
                Event::CData(c) => text.push_str(&cdata(c)?),
                Event::Comment(_) => {}
                Event::End(e) if e.name().as_ref() == end => return Ok(text),
                other => {
                    return Err(Error::malformed(format!(
                        "expected text in <{}>, found {}",
                        String::from_utf8_lossy(end),
                        describe(&other)
                    )));
                }
            }
        }
    }

    /// Parse `<value>...</value>` (or `<value/>`) at the cursor.
    fn parse_value_element(&mut self) -> Result<Value, Error> {
        match self.next_significant()? {
            Event::Start(e) if e.name().as_ref() == b"value" => self.parse_value_body(),
            Event::Empty(e) if e.name().as_ref() == b"value" => Ok(Value::String(String::new())),
            other => Err(Error::malformed(format!(
                "expected <value>, found {}",
                describe(&other)
            ))),
        }
    }

    /// Parse the contents of a `<value>` whose start tag was consumed.
    fn parse_value_body(&mut self) -> Result<Value, Error> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::malformed(format!(
                "values nested deeper than {MAX_DEPTH}"
            )));
        }
        self.depth += 1;
        let value = self.parse_value_contents();
        self.depth -= 1;
        value
    }

    fn parse_value_contents(&mut self) -> Result<Value, Error> {
        let mut text = String::new();
        loop {
            match self.raw_next()? {
                Event::Text(t) => text.push_str(&unescape(&t)?),
                Event::CData(c) => text.push_str(&cdata(c)?),
                Event::Comment(_) | Event::PI(_) => {}
                Event::Start(e) => {
                    let name = e.name();
                    let value = self.parse_typed(name.as_ref())?;
                    self.expect_end(b"value")?;
                    return Ok(value);
                }
                Event::Empty(e) => {
                    let name = e.name();
                    let value = empty_typed(name.as_ref())?;
                    self.expect_end(b"value")?;
                    return Ok(value);
                }
                Event::End(e) if e.name().as_ref() == b"value" => return Ok(Value::String(text)),
                other => {
                    return Err(Error::malformed(format!(
                        "unexpected {} inside <value>",
                        describe(&other)
                    )));
                }
            }
        }
    }

    fn parse_typed(&mut self, tag: &[u8]) -> Result<Value, Error> {
        match tag {
            b"int" | b"i4" | b"i8" => {
                let text = self.read_text(tag)?;
                text.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| Error::malformed(format!("invalid integer '{}'", text.trim())))
            }
            b"boolean" => {
                let text = self.read_text(tag)?;
                match text.trim() {
                    "1" | "true" => Ok(Value::Bool(true)),
                    "0" | "false" => Ok(Value::Bool(false)),
                    other => Err(Error::malformed(format!("invalid boolean '{other}'"))),
                }
            }
            b"double" => {
                let text = self.read_text(tag)?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| Error::malformed(format!("invalid double '{}'", text.trim())))
            }
            b"string" => Ok(Value::String(self.read_text(tag)?)),
            b"dateTime.iso8601" => Ok(Value::DateTime(self.read_text(tag)?.trim().to_owned())),
            b"base64" => Ok(Value::Base64(self.read_text(tag)?.trim().to_owned())),
            b"nil" => {
                self.expect_end(b"nil")?;
                Ok(Value::Nil)
            }
            b"array" => self.parse_array(),
            b"struct" => self.parse_struct(),
            other => Err(Error::malformed(format!(
                "unknown value type <{}>",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn parse_array(&mut self) -> Result<Value, Error> {
        let mut items = Vec::new();
        match self.next_significant()? {
            Event::Start(e) if e.name().as_ref() == b"data" => loop {
                match self.next_significant()? {
                    Event::Start(e) if e.name().as_ref() == b"value" => {
                        items.push(self.parse_value_body()?);
                    }
                    Event::Empty(e) if e.name().as_ref() == b"value" => {
                        items.push(Value::String(String::new()));
                    }
                    Event::End(e) if e.name().as_ref() == b"data" => break,
                    other => {
                        return Err(Error::malformed(format!(
                            "expected <value> in <data>, found {}",
                            describe(&other)
                        )));
                    }
                }
            },
            Event::Empty(e) if e.name().as_ref() == b"data" => {}
            other => {
                return Err(Error::malformed(format!(
                    "expected <data>, found {}",
                    describe(&other)
                )));
            }
        }
        self.expect_end(b"array")?;
        Ok(Value::Array(items))
    }

    fn parse_struct(&mut self) -> Result<Value, Error> {
        let mut members = BTreeMap::new();
        loop {
            match self.next_significant()? {
                Event::Start(e) if e.name().as_ref() == b"member" => {
                    self.expect_start(b"name")?;
                    let name = self.read_text(b"name")?;
                    let value = self.parse_value_element()?;
                    self.expect_end(b"member")?;
                    members.insert(name, value);
                }
                Event::End(e) if e.name().as_ref() == b"struct" => break,
                other => {
                    return Err(Error::malformed(format!(
                        "expected <member>, found {}",
                        describe(&other)
                    )));
                }
            }
        }
        Ok(Value::Struct(members))
    }
}

fn empty_typed(tag: &[u8]) -> Result<Value, Error> {
    match tag {
        b"string" => Ok(Value::String(String::new())),
        b"nil" => Ok(Value::Nil),
        b"array" => Ok(Value::Array(Vec::new())),
        b"struct" => Ok(Value::Struct(BTreeMap::new())),
        other => Err(Error::malformed(format!(
            "empty <{}/> carries no value",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn unescape(text: &BytesText<'_>) -> Result<String, Error> {
    text.unescape()
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| Error::malformed(e.to_string()))
}

fn cdata(data: BytesCData<'_>) -> Result<String, Error> {
    let bytes = data.into_inner();
    std::str::from_utf8(&bytes)
        .map(str::to_owned)
        .map_err(|e| Error::malformed(e.to_string()))
}

fn describe(event: &Event<'_>) -> String {
    match event {
        Event::Start(e) => format!("<{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Empty(e) => format!("<{}/>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Eof => "end of document".into(),
        _ => "unexpected content".into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::xmlrpc::{encode_call, encode_fault, encode_response};

    #[test]
    fn decodes_positional_response() {
        let xml = r#"<?xml version="1.0"?>
            <methodResponse>
              <params>
                <param>
                  <value><array><data>
                    <value><string>C0000000007</string></value>
                    <value><int>0</int></value>
                    <value><boolean>1</boolean></value>
                  </data></array></value>
                </param>
              </params>
            </methodResponse>"#;

        let v = decode_response(xml).unwrap();
        assert_eq!(
            v,
            Value::Array(vec![
                Value::from("C0000000007"),
                Value::Int(0),
                Value::Bool(true),
            ])
        );
    }

    #[test]
    fn decodes_named_field_response() {
        let xml = "<methodResponse><params><param><value><struct>\
            <member><name>ErrorCode</name><value><i4>0</i4></value></member>\
            <member><name>XP Count</name><value><i4>1</i4></value></member>\
            <member><name>XP#1</name><value><array><data>\
              <value><i4>2</i4></value><value><i4>4</i4></value><value><i4>8</i4></value>\
              <value><i4>1</i4></value><value><i4>1</i4></value><value><i4>0</i4></value>\
            </data></array></value></member>\
            </struct></value></param></params></methodResponse>";

        let v = decode_response(xml).unwrap();
        assert_eq!(v.field("ErrorCode"), Some(&Value::Int(0)));
        assert_eq!(v.field("XP Count"), Some(&Value::Int(1)));
        assert_eq!(v.field("XP#1").and_then(Value::as_array).map(<[_]>::len), Some(6));
    }

    #[test]
    fn untyped_value_is_a_string_with_entities_resolved() {
        let xml = "<methodResponse><params><param>\
            <value> Studio &amp; Booth </value>\
            </param></params></methodResponse>";
        assert_eq!(decode_response(xml).unwrap(), Value::from(" Studio & Booth "));
    }

    #[test]
    fn empty_forms_decode() {
        let xml = "<methodResponse><params><param><value><array><data>\
            <value/><value><string/></value><value><nil/></value><value><struct></struct></value>\
            </data></array></value></param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Value::Array(vec![
                Value::from(""),
                Value::from(""),
                Value::Nil,
                Value::Struct(BTreeMap::new()),
            ])
        );
    }

    #[test]
    fn fault_becomes_error() {
        let xml = encode_fault(4, "Invalid crosspoint");
        match decode_response(&xml) {
            Err(Error::Fault { code, message }) => {
                assert_eq!(code, 4);
                assert_eq!(message, "Invalid crosspoint");
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn malformed_documents_are_errors() {
        for xml in [
            "",
            "<methodResponse>",
            "<methodResponse><params><param><value><int>x</int></value></param></params></methodResponse>",
            "<methodResponse><params><param><value><bogus>1</bogus></value></param></params></methodResponse>",
            "<html><body>502 Bad Gateway</body></html>",
        ] {
            assert!(
                matches!(decode_response(xml), Err(Error::MalformedXml { .. })),
                "accepted: {xml}"
            );
        }
    }

    fn nested_arrays(levels: usize) -> String {
        format!(
            "<methodCall><methodName>CrosspointChange</methodName><params><param>{}<value><int>1</int></value>{}</param></params></methodCall>",
            "<value><array><data>".repeat(levels),
            "</data></array></value>".repeat(levels),
        )
    }

    #[test]
    fn deep_nesting_is_rejected_not_recursed() {
        let err = decode_call(&nested_arrays(10_000)).unwrap_err();
        assert!(matches!(err, Error::MalformedXml { .. }), "got {err:?}");
    }

    #[test]
    fn nesting_up_to_the_limit_decodes() {
        let (_, params) = decode_call(&nested_arrays(MAX_DEPTH - 1)).unwrap();
        let mut value = &params[0];
        let mut levels = 0;
        while let Value::Array(items) = value {
            value = &items[0];
            levels += 1;
        }
        assert_eq!(levels, MAX_DEPTH - 1);
        assert_eq!(value, &Value::Int(1));
        assert!(decode_call(&nested_arrays(MAX_DEPTH)).is_err());
    }

    #[test]
    fn decodes_call_written_by_encoder() {
        let params = vec![
            Value::from("C0000000001"),
            Value::Bool(false),
            Value::Array(vec![Value::Array(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3),
                Value::Int(1),
                Value::Int(1),
                Value::Int(0),
            ])]),
        ];
        let xml = encode_call("CrosspointChange", &params);
        let (method, decoded) = decode_call(&xml).unwrap();
        assert_eq!(method, "CrosspointChange");
        assert_eq!(decoded, params);
    }

    #[test]
    fn decodes_call_without_params() {
        let (method, params) =
            decode_call("<methodCall><methodName>GetAlive</methodName></methodCall>").unwrap();
        assert_eq!(method, "GetAlive");
        assert!(params.is_empty());

        let (_, params) = decode_call(
            "<methodCall><methodName>GetAlive</methodName><params/></methodCall>",
        )
        .unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn response_encoder_output_decodes() {
        let v = Value::Array(vec![Value::from("C1"), Value::Int(0), Value::Double(1.5)]);
        assert_eq!(decode_response(&encode_response(&v)).unwrap(), v);
    }
}
