//! Thin pull adapter over `quick-xml`.
//!
//! Flattens the event stream to the four shapes the dispatcher cares
//! about, resolves entities, and normalizes self-closing elements into a
//! start/end pair. Markup the schema model has no use for (declarations,
//! comments, processing instructions, doctypes) is skipped here.

use std::io::BufRead;
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::err::{ErrorKind, ParseError, Result};
use crate::source::{LineCountingReader, OverlongChunk};

#[derive(Debug)]
pub(crate) enum XmlToken {
    ElementStart {
        name: String,
        attrs: Vec<(String, String)>,
    },
    ElementEnd,
    Text(String),
    Eof,
}

pub(crate) struct Tokenizer<B> {
    reader: Reader<LineCountingReader<B>>,
    buf: Vec<u8>,
    // A self-closing element yields its end on the next pull.
    pending_end: bool,
}

impl<B: BufRead> Tokenizer<B> {
    pub(crate) fn new(input: B) -> Self {
        let mut reader = Reader::from_reader(LineCountingReader::new(input));
        let config = reader.config_mut();
        config.check_end_names = true;
        Tokenizer {
            reader,
            buf: Vec::new(),
            pending_end: false,
        }
    }

    /// 1-based line of the most recently consumed input.
    pub(crate) fn line(&self) -> u64 {
        self.reader.get_ref().line()
    }

    pub(crate) fn next(&mut self) -> Result<XmlToken> {
        if self.pending_end {
            self.pending_end = false;
            return Ok(XmlToken::ElementEnd);
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => return Err(convert_error(e, self.reader.get_ref().line())),
            };
            let line = self.reader.get_ref().line();
            match event {
                Event::Start(e) => {
                    let (name, attrs) = open_tag(&e, line)?;
                    return Ok(XmlToken::ElementStart { name, attrs });
                }
                Event::Empty(e) => {
                    let (name, attrs) = open_tag(&e, line)?;
                    self.pending_end = true;
                    return Ok(XmlToken::ElementStart { name, attrs });
                }
                Event::End(_) => return Ok(XmlToken::ElementEnd),
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| convert_error(e.into(), line))?;
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(XmlToken::Text(text.into_owned()));
                }
                Event::CData(t) => {
                    let text = str::from_utf8(&t)
                        .map_err(|e| syntax_error(format!("invalid UTF-8: {e}"), line))?;
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(XmlToken::Text(text.to_string()));
                }
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
                Event::Eof => return Ok(XmlToken::Eof),
            }
        }
    }
}

fn open_tag(e: &BytesStart<'_>, line: u64) -> Result<(String, Vec<(String, String)>)> {
    let name = str::from_utf8(e.name().as_ref())
        .map_err(|err| syntax_error(format!("invalid UTF-8: {err}"), line))?
        .to_string();

    // Duplicate detection is the dispatcher's job (it warns rather than
    // failing), so attribute checks stay off here.
    let mut attrs = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|err| syntax_error(err.to_string(), line))?;
        let key = str::from_utf8(attr.key.as_ref())
            .map_err(|err| syntax_error(format!("invalid UTF-8: {err}"), line))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| convert_error(err.into(), line))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok((name, attrs))
}

fn syntax_error(msg: String, line: u64) -> ParseError {
    ParseError::at(ErrorKind::Syntax(msg), line)
}

fn convert_error(e: quick_xml::Error, line: u64) -> ParseError {
    match e {
        quick_xml::Error::Io(io) => {
            // An overlong source chunk travels through the tokenizer as an
            // I/O error; surface it under its own kind.
            if let Some(overlong) = io.get_ref().and_then(|r| r.downcast_ref::<OverlongChunk>()) {
                return ParseError::new(
                    ErrorKind::OverlongRead {
                        requested: overlong.requested,
                        returned: overlong.returned,
                    },
                    None,
                );
            }
            ParseError::from(std::io::Error::new(io.kind(), io.to_string()))
        }
        other => syntax_error(other.to_string(), line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TextSource;

    fn tokens(doc: &str) -> Vec<XmlToken> {
        let mut tok = Tokenizer::new(TextSource::new(doc.as_bytes()));
        let mut out = Vec::new();
        loop {
            let t = tok.next().unwrap();
            if matches!(t, XmlToken::Eof) {
                return out;
            }
            out.push(t);
        }
    }

    #[test]
    fn self_closing_elements_produce_an_end() {
        let ts = tokens("<a><b/></a>");
        assert_eq!(ts.len(), 4);
        assert!(matches!(&ts[1], XmlToken::ElementStart { name, .. } if name == "b"));
        assert!(matches!(ts[2], XmlToken::ElementEnd));
    }

    #[test]
    fn attributes_are_unescaped() {
        let ts = tokens(r#"<a id="x &amp; y"/>"#);
        match &ts[0] {
            XmlToken::ElementStart { attrs, .. } => {
                assert_eq!(attrs[0], ("id".to_string(), "x & y".to_string()));
            }
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn line_numbers_advance_with_consumed_input() {
        let doc = "<a>\n  <b>\n  </b>\n</a>";
        let mut tok = Tokenizer::new(TextSource::new(doc.as_bytes()));
        tok.next().unwrap(); // <a>
        assert_eq!(tok.line(), 1);
        loop {
            if matches!(tok.next().unwrap(), XmlToken::Eof) {
                break;
            }
        }
        assert_eq!(tok.line(), 4);
    }

    #[test]
    fn malformed_markup_is_a_syntax_error() {
        let mut tok = Tokenizer::new(TextSource::new(b"<a><b></a>"));
        tok.next().unwrap();
        tok.next().unwrap();
        let err = loop {
            match tok.next() {
                Ok(XmlToken::Eof) => panic!("expected an error"),
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        assert!(matches!(err.kind(), ErrorKind::Syntax(_)));
    }
}
