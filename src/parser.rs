//! Parser entry points: drive the tokenizer against a compiled schema.

use std::io::BufRead;

use log::debug;

use crate::dispatcher::Dispatcher;
use crate::err::Result;
use crate::model::TaggedValue;
use crate::policy::{LogWarnings, WarningPolicy};
use crate::schema::Schema;
use crate::source::{ReadSource, StreamReader, TextSource};
use crate::tokenizer::{Tokenizer, XmlToken};

/// Per-parser configuration.
pub struct ParseSettings {
    policy: Box<dyn WarningPolicy>,
}

impl ParseSettings {
    pub fn new() -> Self {
        ParseSettings {
            policy: Box::new(LogWarnings),
        }
    }

    /// Replace the warning policy (the default logs and continues).
    pub fn warning_policy(mut self, policy: impl WarningPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses documents against one compiled [`Schema`].
///
/// The parser is cheap to construct and reusable; each parse returns the
/// document root as a [`TaggedValue`] whose tag is the matched root
/// element name.
pub struct TreeParser<'s> {
    schema: &'s Schema,
    settings: ParseSettings,
}

impl<'s> TreeParser<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        TreeParser {
            schema,
            settings: ParseSettings::new(),
        }
    }

    pub fn with_settings(schema: &'s Schema, settings: ParseSettings) -> Self {
        TreeParser { schema, settings }
    }

    /// Parse an in-memory document.
    pub fn parse_from_text(&mut self, text: impl AsRef<[u8]>) -> Result<TaggedValue> {
        self.drive(Tokenizer::new(TextSource::new(text.as_ref())))
    }

    /// Parse a document pulled from `source` in bounded chunks.
    pub fn parse_from_stream(&mut self, source: impl ReadSource) -> Result<TaggedValue> {
        self.drive(Tokenizer::new(StreamReader::new(source)))
    }

    fn drive<B: BufRead>(&mut self, mut tokenizer: Tokenizer<B>) -> Result<TaggedValue> {
        let mut dispatcher = Dispatcher::new(self.schema, &mut *self.settings.policy);
        loop {
            match tokenizer.next()? {
                XmlToken::ElementStart { name, attrs } => {
                    dispatcher.on_start(&name, &attrs, tokenizer.line())?
                }
                XmlToken::ElementEnd => dispatcher.on_end(tokenizer.line())?,
                XmlToken::Text(text) => dispatcher.on_text(&text, tokenizer.line())?,
                XmlToken::Eof => break,
            }
        }
        debug!("document ended after {} lines", tokenizer.line());
        dispatcher.finish(tokenizer.line())
    }
}
