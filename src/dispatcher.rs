//! The event dispatcher: turns the flat token stream into a tree.
//!
//! Element nesting is tracked on an explicit frame stack rather than the
//! call stack, so document depth is bounded by memory, not by recursion
//! limits. Each frame records where its finished value must be delivered
//! in the parent (its slot) and the in-progress state of the element
//! itself. Unrecognized subtrees are skipped with a depth counter and
//! produce no frames at all.

use std::sync::Arc;

use log::trace;

use crate::arena::FrameStack;
use crate::err::{ErrorKind, ParseError, ParseWarning, Result, WarningKind};
use crate::model::{FrozenList, Node, TaggedValue, TupleItem, Value};
use crate::policy::WarningPolicy;
use crate::schema::{
    AttrCoerce, Cardinality, ChildAction, CompiledType, ContentModel, Schema, Target,
    UnknownAttrPolicy,
};

/// Where a frame's finished value goes when the element ends.
enum Slot {
    /// Document root; the value becomes the parse result, tagged with the
    /// root element name.
    Root(Arc<str>),
    /// A single-valued field of the parent node.
    Field(usize),
    /// Appended to the list field of the parent node.
    ListField(usize),
    /// Appended to the parent's content list, untagged.
    Content,
    /// Slot `i` of the newest tuple item in the parent's content list.
    TuplePos(usize),
    /// Appended to the parent's content list as a tagged value.
    UnionTag(Arc<str>),
    /// Text-producing union alternative: merged into a trailing text run,
    /// or appended as a fresh tagged value.
    UnionText(Arc<str>),
}

enum Body {
    Node(NodeFrame),
    /// `#text` builtin: accumulates character data.
    Text(String),
    /// `#char` builtin: the substituted character, resolved at start.
    Char(char),
    /// `#empty` builtin.
    Empty,
}

struct NodeFrame {
    ty: usize,
    fields: Box<[Option<Value>]>,
    content: Option<FrozenList<Value>>,
}

struct Frame {
    slot: Slot,
    body: Body,
}

pub(crate) struct Dispatcher<'s, 'p> {
    schema: &'s Schema,
    policy: &'p mut dyn WarningPolicy,
    stack: FrameStack<Frame>,
    /// Depth inside an unrecognized subtree; nonzero means events are
    /// being discarded.
    ignore_depth: usize,
    result: Option<TaggedValue>,
}

impl<'s, 'p> Dispatcher<'s, 'p> {
    pub(crate) fn new(schema: &'s Schema, policy: &'p mut dyn WarningPolicy) -> Self {
        Dispatcher {
            schema,
            policy,
            stack: FrameStack::new(),
            ignore_depth: 0,
            result: None,
        }
    }

    fn warn(&mut self, kind: WarningKind, line: u64) -> Result<()> {
        emit_warning(self.policy, kind, line)
    }

    fn skip_subtree(&mut self, name: &str, line: u64) -> Result<()> {
        self.warn(WarningKind::UnexpectedElement(name.to_string()), line)?;
        self.ignore_depth = 1;
        Ok(())
    }

    pub(crate) fn on_start(
        &mut self,
        name: &str,
        attrs: &[(String, String)],
        line: u64,
    ) -> Result<()> {
        if self.ignore_depth > 0 {
            self.ignore_depth += 1;
            return Ok(());
        }

        trace!("<{name}> at line {line}, depth {}", self.stack.len());
        let elem = self.schema.resolve_element(name);

        if self.stack.is_empty() {
            let root = elem.and_then(|ix| self.schema.roots().iter().find(|r| r.elem == ix));
            return match root {
                Some(root) => {
                    if self.result.is_some() {
                        return Err(ParseError::at(ErrorKind::MultipleRoots, line));
                    }
                    let slot = Slot::Root(Arc::clone(&root.tag));
                    self.push_child(root.target.clone(), slot, attrs, line)
                }
                None => self.skip_subtree(name, line),
            };
        }

        let dispatch = {
            let top = self.stack.top_mut().expect("stack checked non-empty");
            match &mut top.body {
                Body::Node(frame) => {
                    let ty = self.schema.ty(frame.ty);
                    match elem.and_then(|ix| ty.children[ix].as_ref()) {
                        Some(action) => prepare_child(frame, ty, action, line)?,
                        None => None,
                    }
                }
                // The builtin types have no child elements.
                Body::Text(_) | Body::Char(_) | Body::Empty => None,
            }
        };

        match dispatch {
            Some((target, slot)) => self.push_child(target, slot, attrs, line),
            None => self.skip_subtree(name, line),
        }
    }

    pub(crate) fn on_text(&mut self, text: &str, line: u64) -> Result<()> {
        if self.ignore_depth > 0 {
            return Ok(());
        }

        match self.stack.top_mut().map(|f| &mut f.body) {
            Some(Body::Text(buf)) => {
                buf.push_str(text);
                Ok(())
            }
            Some(Body::Node(frame)) if self.schema.ty(frame.ty).allow_text => {
                let content = frame
                    .content
                    .as_mut()
                    .expect("text-bearing types carry a content list");
                append_text(content, text);
                Ok(())
            }
            _ if is_xml_whitespace(text) => Ok(()),
            _ => self.warn(WarningKind::UnexpectedCharacterData, line),
        }
    }

    pub(crate) fn on_end(&mut self, line: u64) -> Result<()> {
        if self.ignore_depth > 0 {
            self.ignore_depth -= 1;
            return Ok(());
        }

        let frame = match self.stack.pop() {
            Some(frame) => frame,
            // The tokenizer guarantees balanced tags; an end with no frame
            // would have failed there first.
            None => return Ok(()),
        };
        let value = self.finish_body(frame.body, line)?;
        self.deliver(frame.slot, value);
        Ok(())
    }

    /// Document end. Fails on elements left open by a truncated input,
    /// then yields the tagged root value. A document with no recognized
    /// root is an error with no meaningful line.
    pub(crate) fn finish(self, line: u64) -> Result<TaggedValue> {
        if !self.stack.is_empty() || self.ignore_depth > 0 {
            return Err(ParseError::at(
                ErrorKind::Syntax("unexpected end of document".to_string()),
                line,
            ));
        }
        self.result
            .ok_or_else(|| ParseError::new(ErrorKind::NoRecognizedRoot, None))
    }

    fn push_child(
        &mut self,
        target: Target,
        slot: Slot,
        attrs: &[(String, String)],
        line: u64,
    ) -> Result<()> {
        let body = match target {
            Target::Node(ty_ix) => Body::Node(self.start_node(ty_ix, attrs, line)?),
            Target::Text => {
                for (key, _) in attrs {
                    self.warn(WarningKind::UnexpectedAttribute(key.clone()), line)?;
                }
                Body::Text(String::new())
            }
            Target::Empty => {
                for (key, _) in attrs {
                    self.warn(WarningKind::UnexpectedAttribute(key.clone()), line)?;
                }
                Body::Empty
            }
            Target::CharSub => Body::Char(self.char_substitute(attrs, line)?),
        };
        self.stack.push(Frame { slot, body });
        Ok(())
    }

    fn start_node(
        &mut self,
        ty_ix: usize,
        attrs: &[(String, String)],
        line: u64,
    ) -> Result<NodeFrame> {
        let ty = self.schema.ty(ty_ix);
        let mut fields: Box<[Option<Value>]> = vec![None; ty.shape.field_count()].into();
        for child in &ty.child_fields {
            if matches!(child.cardinality, Cardinality::List { .. }) {
                fields[child.field] = Some(Value::List(FrozenList::new()));
            }
        }

        for (key, raw) in attrs {
            let action = self
                .schema
                .resolve_attribute(key)
                .and_then(|ix| ty.attrs[ix].as_ref());
            match action {
                None => match ty.unknown_attrs {
                    UnknownAttrPolicy::Warn => emit_warning(
                        self.policy,
                        WarningKind::UnexpectedAttribute(key.clone()),
                        line,
                    )?,
                    UnknownAttrPolicy::Error => {
                        let w =
                            ParseWarning::new(WarningKind::UnexpectedAttribute(key.clone()), line);
                        return Err(w.escalate());
                    }
                },
                Some(action) => {
                    if fields[action.field].is_some() {
                        emit_warning(
                            self.policy,
                            WarningKind::DuplicateAttribute(key.clone()),
                            line,
                        )?;
                        continue;
                    }
                    fields[action.field] =
                        Some(self.coerce_attribute(&action.coerce, key, raw, line)?);
                }
            }
        }

        for attr in &ty.attr_fields {
            if fields[attr.field].is_none() {
                if attr.optional {
                    fields[attr.field] = Some(Value::Null);
                } else {
                    return Err(ParseError::at(
                        ErrorKind::MissingAttribute(attr.name.to_string()),
                        line,
                    ));
                }
            }
        }

        Ok(NodeFrame {
            ty: ty_ix,
            fields,
            content: ty.has_content_list().then(FrozenList::new),
        })
    }

    fn coerce_attribute(
        &self,
        coerce: &AttrCoerce,
        key: &str,
        raw: &str,
        line: u64,
    ) -> Result<Value> {
        match coerce {
            AttrCoerce::Str => Ok(Value::Str(raw.to_string())),
            AttrCoerce::Int => Ok(Value::Int(parse_integer(raw, line)?)),
            AttrCoerce::Bool => match raw {
                "yes" => Ok(Value::Bool(true)),
                "no" => Ok(Value::Bool(false)),
                _ => Err(ParseError::at(
                    ErrorKind::InvalidBool(key.to_string()),
                    line,
                )),
            },
            AttrCoerce::Enum(ix) => {
                let def = self.schema.enum_def(*ix);
                match def.table.resolve(raw) {
                    Some(i) => Ok(Value::Enum(Arc::clone(&def.symbols[i]))),
                    None => Err(ParseError::at(
                        ErrorKind::InvalidEnum(raw.to_string()),
                        line,
                    )),
                }
            }
            AttrCoerce::CharEnum(ix) => {
                let mut chars = raw.chars();
                let c = match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return Err(ParseError::at(ErrorKind::NotSingleChar, line)),
                };
                let allowed = &self.schema.char_enum(*ix).allowed;
                if !allowed.contains(c) {
                    return Err(ParseError::at(
                        ErrorKind::InvalidCharEnum {
                            value: c,
                            allowed: allowed.clone(),
                        },
                        line,
                    ));
                }
                Ok(Value::Char(c))
            }
        }
    }

    /// Resolve a `#char` element's character from its `value` attribute.
    fn char_substitute(&mut self, attrs: &[(String, String)], line: u64) -> Result<char> {
        let mut c = ' ';
        for (key, raw) in attrs {
            if key != "value" {
                self.warn(WarningKind::UnexpectedAttribute(key.clone()), line)?;
                continue;
            }
            let value = parse_integer(raw, line)?;
            if !(0..=127).contains(&value) {
                return Err(ParseError::at(ErrorKind::CharValueOutOfRange, line));
            }
            c = value as u8 as char;
        }
        Ok(c)
    }

    fn finish_body(&mut self, body: Body, line: u64) -> Result<Value> {
        match body {
            Body::Text(buf) => Ok(Value::Str(buf)),
            Body::Char(c) => Ok(Value::Str(c.to_string())),
            Body::Empty => Ok(Value::Null),
            Body::Node(frame) => self.finish_node(frame, line),
        }
    }

    fn finish_node(&mut self, frame: NodeFrame, line: u64) -> Result<Value> {
        let ty = self.schema.ty(frame.ty);

        for child in &ty.child_fields {
            match (&child.cardinality, &frame.fields[child.field]) {
                (Cardinality::Required, None) => {
                    return Err(ParseError::at(
                        ErrorKind::MissingChild(child.elem.to_string()),
                        line,
                    ));
                }
                (Cardinality::List { min }, Some(Value::List(list))) if list.len() < *min => {
                    return Err(ParseError::at(
                        ErrorKind::EmptyListChild(child.elem.to_string()),
                        line,
                    ));
                }
                _ => {}
            }
        }

        if let (ContentModel::Tuple(shape), Some(content)) = (&ty.content, &frame.content) {
            if let Some(Value::Tuple(last)) = content.last() {
                if let Some(unfilled) = last.first_unfilled() {
                    return Err(ParseError::at(
                        ErrorKind::TupleIncomplete {
                            name: shape.field_name(unfilled).to_string(),
                            expected: shape.field_name(unfilled - 1).to_string(),
                        },
                        line,
                    ));
                }
            }
        }

        let fields = frame
            .fields
            .into_vec()
            .into_iter()
            .map(|f| f.unwrap_or(Value::Null))
            .collect();
        Ok(Value::Node(Node::new(
            Arc::clone(&ty.shape),
            fields,
            frame.content,
        )))
    }

    fn deliver(&mut self, slot: Slot, value: Value) {
        let slot = match slot {
            Slot::Root(tag) => {
                self.result = Some(TaggedValue::new(tag, value));
                return;
            }
            slot => slot,
        };

        let parent = self
            .stack
            .top_mut()
            .expect("non-root frames always have a parent");
        let frame = match &mut parent.body {
            Body::Node(frame) => frame,
            _ => unreachable!("only node frames spawn children"),
        };
        match slot {
            Slot::Root(_) => unreachable!(),
            Slot::Field(ix) => frame.fields[ix] = Some(value),
            Slot::ListField(ix) => match &mut frame.fields[ix] {
                Some(Value::List(list)) => list.push(value),
                _ => unreachable!("list fields are initialized at element start"),
            },
            Slot::Content => frame
                .content
                .as_mut()
                .expect("content slots imply a content list")
                .push(value),
            Slot::TuplePos(ix) => {
                let content = frame.content.as_mut().expect("tuple content list");
                match content.last_mut() {
                    Some(Value::Tuple(item)) => item.set(ix, value),
                    _ => unreachable!("tuple item is created when its first slot starts"),
                }
            }
            Slot::UnionTag(tag) => frame
                .content
                .as_mut()
                .expect("union content list")
                .push(Value::Tagged(Box::new(TaggedValue::new(tag, value)))),
            Slot::UnionText(tag) => {
                let content = frame.content.as_mut().expect("union content list");
                let text = match value {
                    Value::Str(s) => s,
                    _ => unreachable!("text alternatives produce strings"),
                };
                match content.last_mut() {
                    Some(Value::Str(run)) => run.push_str(&text),
                    _ => content.push(Value::Tagged(Box::new(TaggedValue::new(
                        tag,
                        Value::Str(text),
                    )))),
                }
            }
        }
    }
}

/// Decide the slot for a recognized child and apply the checks that
/// happen before the child's own frame exists.
fn prepare_child(
    frame: &mut NodeFrame,
    ty: &CompiledType,
    action: &ChildAction,
    line: u64,
) -> Result<Option<(Target, Slot)>> {
    match action {
        ChildAction::Single { field, elem, target } => {
            if frame.fields[*field].is_some() {
                return Err(ParseError::at(
                    ErrorKind::DuplicateChild(elem.to_string()),
                    line,
                ));
            }
            Ok(Some((target.clone(), Slot::Field(*field))))
        }
        ChildAction::ListAppend { field, target } => {
            Ok(Some((target.clone(), Slot::ListField(*field))))
        }
        ChildAction::Content { target } => Ok(Some((target.clone(), Slot::Content))),
        ChildAction::TupleSlot { index, target } => {
            let shape = match &ty.content {
                ContentModel::Tuple(shape) => shape,
                _ => unreachable!("tuple slots only compile for tuple content"),
            };
            let content = frame.content.as_mut().expect("tuple content list");
            let arity = shape.field_count();
            if *index == 0 {
                if let Some(Value::Tuple(last)) = content.last() {
                    if !last.is_filled(arity - 1) {
                        return Err(ParseError::at(
                            ErrorKind::TupleRestartedEarly {
                                name: shape.field_name(0).to_string(),
                                last: shape.field_name(arity - 1).to_string(),
                            },
                            line,
                        ));
                    }
                }
                content.push(Value::Tuple(TupleItem::unfilled(Arc::clone(shape))));
            } else {
                let ready = matches!(
                    content.last(),
                    Some(Value::Tuple(last)) if last.is_filled(*index - 1)
                );
                if !ready {
                    return Err(ParseError::at(
                        ErrorKind::TupleOutOfOrder {
                            name: shape.field_name(*index).to_string(),
                            expected: shape.field_name(*index - 1).to_string(),
                        },
                        line,
                    ));
                }
            }
            Ok(Some((target.clone(), Slot::TuplePos(*index))))
        }
        ChildAction::UnionAlt {
            tag,
            target,
            accumulates_text,
        } => {
            let slot = if *accumulates_text {
                Slot::UnionText(Arc::clone(tag))
            } else {
                Slot::UnionTag(Arc::clone(tag))
            };
            Ok(Some((target.clone(), slot)))
        }
    }
}

fn emit_warning(policy: &mut dyn WarningPolicy, kind: WarningKind, line: u64) -> Result<()> {
    let warning = ParseWarning::new(kind, line);
    if policy.escalate(&warning) {
        Err(warning.escalate())
    } else {
        Ok(())
    }
}

fn append_text(content: &mut FrozenList<Value>, text: &str) {
    match content.last_mut() {
        Some(Value::Str(run)) => run.push_str(text),
        _ => content.push(Value::Str(text.to_string())),
    }
}

fn is_xml_whitespace(text: &str) -> bool {
    text.bytes()
        .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b'))
}

/// Base-10 integer with surrounding ASCII whitespace tolerated.
fn parse_integer(raw: &str, line: u64) -> Result<i64> {
    raw.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b'))
        .parse::<i64>()
        .map_err(|_| ParseError::at(ErrorKind::InvalidInteger, line))
}
