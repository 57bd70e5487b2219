// Lua pattern parser
// Parses Lua pattern strings into a flat item list, rejecting constructs the
// regex translation cannot express

use super::class::CharClass;
use crate::lua_vm::{LuaError, LuaResult};

/// Lua allows at most this many captures per pattern
pub const MAX_CAPTURES: usize = 32;

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal character
    Char(char),
    /// Any character (.)
    Dot,
    /// Character class (%a, %d, etc.)
    Class(CharClass),
    /// Inverted character class (%A, %D, etc.)
    InvertedClass(CharClass),
    /// Character set ([abc], [^abc])
    Set { items: Vec<SetItem>, negated: bool },
    /// Repetition (*, +, -, ?)
    Repeat {
        pattern: Box<Pattern>,
        mode: RepeatMode,
    },
    /// Position capture () - captures current position as a number
    PositionCapture,
    /// Capture start marker
    CaptureStart,
    /// Capture end marker
    CaptureEnd,
    /// End anchor ($ as the last pattern character)
    EndAnchor,
    /// Frontier pattern (%f[set]) - empty match at a not-in-set to in-set
    /// transition
    Frontier { items: Vec<SetItem>, negated: bool },
}

/// An item inside a character set [...]
#[derive(Debug, Clone)]
pub enum SetItem {
    Char(char),
    Range(char, char),
    Class(CharClass),
    InvertedClass(CharClass),
}

impl SetItem {
    pub fn matches(&self, c: char) -> bool {
        match self {
            SetItem::Char(ch) => c == *ch,
            SetItem::Range(start, end) => c >= *start && c <= *end,
            SetItem::Class(class) => class.matches(c),
            SetItem::InvertedClass(class) => !class.matches(c),
        }
    }
}

/// Membership test for a whole set
pub fn set_matches(items: &[SetItem], negated: bool, c: char) -> bool {
    items.iter().any(|item| item.matches(c)) != negated
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    ZeroOrMore, // *
    OneOrMore,  // +
    ZeroOrOne,  // ?
    Lazy,       // - (non-greedy)
}

/// Parsed pattern: `^` anchoring plus the item list
#[derive(Debug, Clone)]
pub struct ParsedPattern {
    pub anchored: bool,
    pub items: Vec<Pattern>,
}

fn malformed(message: &str) -> LuaError {
    LuaError::Pattern(format!("malformed pattern ({message})"))
}

fn unsupported(construct: &str) -> LuaError {
    LuaError::Pattern(format!("unsupported pattern construct: {construct}"))
}

/// Parse a Lua pattern string
pub fn parse_pattern(pattern: &str) -> LuaResult<ParsedPattern> {
    let chars: Vec<char> = pattern.chars().collect();
    let anchored = chars.first() == Some(&'^');
    let start = usize::from(anchored);

    let mut items = Vec::new();
    let mut total_captures = 0usize;
    let mut open_captures = 0usize;
    let mut pos = start;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            '(' => {
                total_captures += 1;
                if total_captures > MAX_CAPTURES {
                    return Err(LuaError::Pattern("too many captures".to_string()));
                }
                if chars.get(pos + 1) == Some(&')') {
                    items.push(Pattern::PositionCapture);
                    pos += 2;
                } else {
                    open_captures += 1;
                    items.push(Pattern::CaptureStart);
                    pos += 1;
                }
            }
            ')' => {
                if open_captures == 0 {
                    return Err(LuaError::Pattern("invalid pattern capture".to_string()));
                }
                open_captures -= 1;
                items.push(Pattern::CaptureEnd);
                pos += 1;
                if chars.get(pos) == Some(&'-') {
                    return Err(unsupported("'-' after a capture group"));
                }
            }
            '$' if pos == chars.len() - 1 => {
                items.push(Pattern::EndAnchor);
                pos += 1;
            }
            '.' => {
                items.push(Pattern::Dot);
                pos += 1;
            }
            '[' => {
                let (set_items, negated, next) = parse_set(&chars, pos, false)?;
                items.push(Pattern::Set {
                    items: set_items,
                    negated,
                });
                pos = next;
                if chars.get(pos) == Some(&'-') {
                    return Err(unsupported("'-' after a character set"));
                }
            }
            '%' => {
                let Some(&next) = chars.get(pos + 1) else {
                    return Err(malformed("ends with '%'"));
                };
                pos += 2;
                match next {
                    'b' => return Err(unsupported("balanced match '%b'")),
                    'f' => {
                        if chars.get(pos) != Some(&'[') {
                            return Err(LuaError::Pattern(
                                "missing '[' after '%f' in pattern".to_string(),
                            ));
                        }
                        // The frontier is checked after the regex commits to a
                        // match, so its offset from the match start must be fixed
                        if items.iter().any(|item| matches!(item, Pattern::Repeat { .. })) {
                            return Err(unsupported("'%f' after a repeated item"));
                        }
                        // Frontier sets are tested natively, so classes are allowed
                        let (set_items, negated, after) = parse_set(&chars, pos, true)?;
                        items.push(Pattern::Frontier {
                            items: set_items,
                            negated,
                        });
                        pos = after;
                    }
                    '0'..='9' => return Err(unsupported("back-reference '%N'")),
                    _ => {
                        if let Some(class) = CharClass::from_letter(next) {
                            items.push(if next.is_ascii_uppercase() {
                                Pattern::InvertedClass(class)
                            } else {
                                Pattern::Class(class)
                            });
                            if chars.get(pos) == Some(&'-') {
                                return Err(unsupported("'-' after a character class"));
                            }
                        } else {
                            items.push(Pattern::Char(next));
                        }
                    }
                }
            }
            '*' | '+' | '?' | '-' => {
                // Quantifiers only follow a single-character item; anywhere
                // else they are literal
                let quantifiable = matches!(
                    items.last(),
                    Some(
                        Pattern::Char(_)
                            | Pattern::Dot
                            | Pattern::Class(_)
                            | Pattern::InvertedClass(_)
                            | Pattern::Set { .. }
                    )
                );
                match items.pop() {
                    Some(last) if quantifiable => {
                        let mode = match c {
                            '*' => RepeatMode::ZeroOrMore,
                            '+' => RepeatMode::OneOrMore,
                            '?' => RepeatMode::ZeroOrOne,
                            _ => RepeatMode::Lazy,
                        };
                        items.push(Pattern::Repeat {
                            pattern: Box::new(last),
                            mode,
                        });
                    }
                    other => {
                        items.extend(other);
                        items.push(Pattern::Char(c));
                    }
                }
                pos += 1;
            }
            _ => {
                items.push(Pattern::Char(c));
                pos += 1;
            }
        }
    }

    if open_captures > 0 {
        return Err(malformed("unfinished capture"));
    }
    Ok(ParsedPattern { anchored, items })
}

/// Parse `[...]` starting at the `[`; returns items, negation and the index
/// past the closing `]`. Classes inside the set are only accepted when
/// `allow_classes` is set.
fn parse_set(
    chars: &[char],
    start: usize,
    allow_classes: bool,
) -> LuaResult<(Vec<SetItem>, bool, usize)> {
    let mut pos = start + 1;
    let negated = chars.get(pos) == Some(&'^');
    if negated {
        pos += 1;
    }

    let mut items = Vec::new();
    // ']' right after the opening bracket is literal
    if chars.get(pos) == Some(&']') {
        items.push(SetItem::Char(']'));
        pos += 1;
    }

    while pos < chars.len() && chars[pos] != ']' {
        let c = chars[pos];
        if c == '%' {
            let Some(&next) = chars.get(pos + 1) else {
                return Err(malformed("missing ']'"));
            };
            match CharClass::from_letter(next) {
                Some(class) if allow_classes => items.push(if next.is_ascii_uppercase() {
                    SetItem::InvertedClass(class)
                } else {
                    SetItem::Class(class)
                }),
                Some(_) => return Err(unsupported("character class inside a set")),
                None => items.push(SetItem::Char(next)),
            }
            pos += 2;
        } else if chars.get(pos + 1) == Some(&'-') && chars.get(pos + 2).is_some_and(|&e| e != ']') {
            items.push(SetItem::Range(c, chars[pos + 2]));
            pos += 3;
        } else {
            items.push(SetItem::Char(c));
            pos += 1;
        }
    }

    if pos >= chars.len() {
        return Err(malformed("missing ']'"));
    }
    Ok((items, negated, pos + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantifier_binds_to_previous_item() {
        let parsed = parse_pattern("a+b").unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert!(matches!(
            parsed.items[0],
            Pattern::Repeat {
                mode: RepeatMode::OneOrMore,
                ..
            }
        ));
    }

    #[test]
    fn leading_quantifier_is_literal() {
        let parsed = parse_pattern("*x").unwrap();
        assert!(matches!(parsed.items[0], Pattern::Char('*')));
    }

    #[test]
    fn anchors_are_recognised() {
        let parsed = parse_pattern("^ab$").unwrap();
        assert!(parsed.anchored);
        assert!(matches!(parsed.items.last(), Some(Pattern::EndAnchor)));
    }

    #[test]
    fn rejects_untranslatable_constructs() {
        for pattern in ["%b()", "(a)%1", "%a-", "[abc]-", "(a)-", "[%a_]"] {
            assert!(
                matches!(parse_pattern(pattern), Err(LuaError::Pattern(_))),
                "{pattern} should be rejected"
            );
        }
    }

    #[test]
    fn frontier_set_may_hold_classes() {
        let parsed = parse_pattern("%f[%w]%w+").unwrap();
        assert!(matches!(parsed.items[0], Pattern::Frontier { .. }));
    }

    #[test]
    fn frontier_needs_a_fixed_offset() {
        assert!(parse_pattern("ab%f[%d]").is_ok());
        assert!(parse_pattern("%f[%a]%a+%f[%A]").is_err());
        assert!(matches!(
            parse_pattern("a.*%f[%d]"),
            Err(LuaError::Pattern(_))
        ));
    }

    #[test]
    fn reports_malformed_patterns() {
        assert!(parse_pattern("[abc").is_err());
        assert!(parse_pattern("(abc").is_err());
        assert!(parse_pattern("abc)").is_err());
        assert!(parse_pattern("abc%").is_err());
    }
}
