// Lua pattern -> regex translation and matching
// Captures keep their Lua numbering; frontier items become empty groups that
// are verified against the surrounding characters after each regex match

use std::fmt::Write;
use std::ops::Range;

use regex::{Captures, Regex};

use super::parser::{Pattern, RepeatMode, SetItem, parse_pattern, set_matches};
use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult};

/// What a regex group stands for
#[derive(Debug, Clone)]
enum GroupRole {
    Text,
    Position,
    Frontier { items: Vec<SetItem>, negated: bool },
}

/// A capture of a successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// Byte range of the captured text
    Text(Range<usize>),
    /// 1-based character position from `()`
    Position(usize),
}

/// A successful match; offsets are byte offsets into the subject
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub start: usize,
    pub end: usize,
    pub captures: Vec<Capture>,
}

impl PatternMatch {
    /// Capture values, or the whole match when the pattern has no captures
    pub fn values(&self, text: &str) -> Vec<LuaValue> {
        if self.captures.is_empty() {
            return vec![LuaValue::from(&text[self.start..self.end])];
        }
        self.captures
            .iter()
            .map(|capture| match capture {
                Capture::Text(range) => LuaValue::from(&text[range.clone()]),
                Capture::Position(pos) => LuaValue::from(*pos),
            })
            .collect()
    }
}

/// A Lua pattern translated to a regex
#[derive(Debug)]
pub struct CompiledPattern {
    regex: Regex,
    anchored: bool,
    groups: Vec<GroupRole>,
}

impl CompiledPattern {
    pub fn new(pattern: &str) -> LuaResult<Self> {
        let parsed = parse_pattern(pattern)?;
        let mut groups = Vec::new();
        // Lua's '.' also matches newlines
        let mut source = String::from("(?s)");
        if parsed.anchored {
            source.push_str(r"\A");
        }
        for item in &parsed.items {
            translate_item(item, &mut source, &mut groups);
        }
        let regex = Regex::new(&source)
            .map_err(|e| LuaError::Pattern(format!("malformed pattern: {e}")))?;
        Ok(CompiledPattern {
            regex,
            anchored: parsed.anchored,
            groups,
        })
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// First match starting at or after byte offset `start`; an anchored
    /// pattern only matches at `start` itself
    pub fn find_at(&self, text: &str, start: usize) -> Option<PatternMatch> {
        if self.anchored {
            let caps = self.regex.captures(text.get(start..)?)?;
            return self.accept(text, start, &caps);
        }
        let mut from = start;
        loop {
            let caps = self.regex.captures_at(text, from)?;
            if let Some(found) = self.accept(text, 0, &caps) {
                return Some(found);
            }
            // A frontier did not hold; retry one character further on
            let at = caps.get(0)?.start();
            from = at + text[at..].chars().next()?.len_utf8();
        }
    }

    fn accept(&self, text: &str, offset: usize, caps: &Captures<'_>) -> Option<PatternMatch> {
        let whole = caps.get(0)?;
        let start = offset + whole.start();
        let mut captures = Vec::new();
        for (i, role) in self.groups.iter().enumerate() {
            let at = caps.get(i + 1).map(|m| (offset + m.start(), offset + m.end()));
            match role {
                GroupRole::Text => {
                    let (s, e) = at.unwrap_or((start, start));
                    captures.push(Capture::Text(s..e));
                }
                GroupRole::Position => {
                    let (s, _) = at.unwrap_or((start, start));
                    captures.push(Capture::Position(text[..s].chars().count() + 1));
                }
                GroupRole::Frontier { items, negated } => {
                    let (s, _) = at.unwrap_or((start, start));
                    let prev = text[..s].chars().next_back().unwrap_or('\0');
                    let next = text[s..].chars().next().unwrap_or('\0');
                    if set_matches(items, *negated, prev) || !set_matches(items, *negated, next) {
                        return None;
                    }
                }
            }
        }
        Some(PatternMatch {
            start,
            end: offset + whole.end(),
            captures,
        })
    }
}

fn translate_item(item: &Pattern, out: &mut String, groups: &mut Vec<GroupRole>) {
    match item {
        Pattern::Char(c) => out.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        Pattern::Dot => out.push('.'),
        Pattern::Class(class) => out.push_str(&class.to_regex(false)),
        Pattern::InvertedClass(class) => out.push_str(&class.to_regex(true)),
        Pattern::Set { items, negated } => out.push_str(&set_regex(items, *negated)),
        Pattern::Repeat { pattern, mode } => {
            translate_item(pattern, out, groups);
            out.push_str(match mode {
                RepeatMode::ZeroOrMore => "*",
                RepeatMode::OneOrMore => "+",
                RepeatMode::ZeroOrOne => "?",
                RepeatMode::Lazy => "*?",
            });
        }
        Pattern::PositionCapture => {
            groups.push(GroupRole::Position);
            out.push_str("()");
        }
        Pattern::CaptureStart => {
            groups.push(GroupRole::Text);
            out.push('(');
        }
        Pattern::CaptureEnd => out.push(')'),
        Pattern::EndAnchor => out.push_str(r"\z"),
        Pattern::Frontier { items, negated } => {
            groups.push(GroupRole::Frontier {
                items: items.clone(),
                negated: *negated,
            });
            out.push_str("()");
        }
    }
}

/// Set characters are emitted as `\x{..}` unless alphanumeric, so no set
/// operator or bracket can leak through
fn push_set_char(out: &mut String, c: char) {
    if c.is_ascii_alphanumeric() {
        out.push(c);
    } else {
        let _ = write!(out, "\\x{{{:X}}}", c as u32);
    }
}

fn set_regex(items: &[SetItem], negated: bool) -> String {
    let mut body = String::new();
    for item in items {
        match item {
            SetItem::Char(c) => push_set_char(&mut body, *c),
            SetItem::Range(lo, hi) if lo <= hi => {
                push_set_char(&mut body, *lo);
                body.push('-');
                push_set_char(&mut body, *hi);
            }
            // A reversed range matches nothing
            SetItem::Range(..) => {}
            SetItem::Class(class) => body.push_str(class.regex_body()),
            SetItem::InvertedClass(class) => {
                let _ = write!(body, "[^{}]", class.regex_body());
            }
        }
    }
    match (body.is_empty(), negated) {
        (true, false) => r"(?:\b\B)".to_string(),
        (true, true) => ".".to_string(),
        (false, false) => format!("[{body}]"),
        (false, true) => format!("[^{body}]"),
    }
}
