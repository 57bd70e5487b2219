// String library
// Implements: byte, char, dump, find, format, gmatch, gsub, len, lower,
// match, rep, reverse, sub, upper
//
// Strings are character sequences: every position seen by Lua code is a
// 1-based character index, while matching works on byte offsets.
pub mod pattern;
pub mod string_format;

use std::cell::Cell;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::lib_registry::{LibraryModule, check_integer, check_string, opt_integer, opt_string};
use crate::lua_value::{CallOutcome, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};
use pattern::{Capture, CompiledPattern, PatternMatch, is_plain_pattern};

pub fn create_string_lib() -> LibraryModule {
    crate::lib_module!("string", {
        "byte" => string_byte,
        "char" => string_char,
        "dump" => string_dump,
        "find" => string_find,
        "format" => string_format::string_format,
        "gmatch" => string_gmatch,
        "gsub" => string_gsub,
        "len" => string_len,
        "lower" => string_lower,
        "match" => string_match,
        "rep" => string_rep,
        "reverse" => string_reverse,
        "sub" => string_sub,
        "upper" => string_upper,
    })
}

/// Resolve a possibly negative position against a length of `len`
fn relative_pos(pos: i64, len: i64) -> i64 {
    if pos < 0 { len + pos + 1 } else { pos }
}

/// Byte offset of the character at 0-based index `index`, or the string
/// length when past the end
fn byte_offset(s: &str, index: usize) -> usize {
    s.char_indices().nth(index).map_or(s.len(), |(offset, _)| offset)
}

/// 1-based character position of byte offset `offset`
fn char_pos(s: &str, offset: usize) -> usize {
    s[..offset].chars().count() + 1
}

/// Clamp `i..=j` to the character range of a string of `len` characters;
/// `None` when the range is empty
fn clamp_range(i: i64, j: i64, len: i64) -> Option<(usize, usize)> {
    let i = relative_pos(i, len).max(1);
    let j = relative_pos(j, len).min(len);
    (i <= j).then_some((i as usize, j as usize))
}

/// string.byte(s [, i [, j]]) - Character codes of s[i..j]
fn string_byte(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "byte")?;
    let i = opt_integer(&args, 2, "byte")?.unwrap_or(1);
    let j = opt_integer(&args, 3, "byte")?.unwrap_or(i);
    let len = s.chars().count() as i64;

    let Some((first, last)) = clamp_range(i, j, len) else {
        return Ok(CallOutcome::none());
    };
    let codes: Vec<LuaValue> = s
        .chars()
        .skip(first - 1)
        .take(last - first + 1)
        .map(|c| LuaValue::from(c as u32 as f64))
        .collect();
    Ok(CallOutcome::values(codes))
}

/// string.char(...) - String from character codes
fn string_char(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let mut out = String::with_capacity(args.len());
    for index in 1..=args.len() {
        let code = check_integer(&args, index, "char")?;
        let c = u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| {
                LuaError::Type(format!(
                    "bad argument #{index} to 'char' (value out of range)"
                ))
            })?;
        out.push(c);
    }
    Ok(CallOutcome::one(out))
}

/// string.dump(function) - There is no bytecode to dump
fn string_dump(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("string.dump"))
}

/// string.len(s) - Number of characters
fn string_len(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "len")?;
    Ok(CallOutcome::one(s.chars().count()))
}

fn string_lower(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "lower")?;
    Ok(CallOutcome::one(s.to_lowercase()))
}

fn string_upper(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "upper")?;
    Ok(CallOutcome::one(s.to_uppercase()))
}

/// string.rep(s, n [, sep]) - n copies of s joined by sep
fn string_rep(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "rep")?;
    let n = check_integer(&args, 2, "rep")?;
    let sep = opt_string(&args, 3, "rep")?.unwrap_or_default();
    if n <= 0 {
        return Ok(CallOutcome::one(""));
    }

    let n = n as usize;
    let total = s
        .len()
        .checked_mul(n)
        .and_then(|body| sep.len().checked_mul(n - 1).and_then(|gaps| body.checked_add(gaps)));
    match total {
        Some(total) if total <= vm.safe_option.max_string_size => {
            let mut out = String::with_capacity(total);
            for i in 0..n {
                if i > 0 {
                    out.push_str(&sep);
                }
                out.push_str(&s);
            }
            Ok(CallOutcome::one(out))
        }
        _ => Err(LuaError::Type("resulting string too large".to_string())),
    }
}

fn string_reverse(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "reverse")?;
    Ok(CallOutcome::one(s.chars().rev().collect::<String>()))
}

/// string.sub(s, i [, j]) - Characters i through j, negatives count from the end
fn string_sub(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "sub")?;
    let i = opt_integer(&args, 2, "sub")?.unwrap_or(1);
    let j = opt_integer(&args, 3, "sub")?.unwrap_or(-1);
    let len = s.chars().count() as i64;

    let Some((first, last)) = clamp_range(i, j, len) else {
        return Ok(CallOutcome::one(""));
    };
    let start = byte_offset(&s, first - 1);
    let end = byte_offset(&s, last);
    Ok(CallOutcome::one(&s[start..end]))
}

/// Capture values without the whole-match fallback
fn capture_values(m: &PatternMatch, text: &str) -> Vec<LuaValue> {
    if m.captures.is_empty() {
        Vec::new()
    } else {
        m.values(text)
    }
}

/// Shared body of find and match
fn find_aux(vm: &mut LuaVM, args: MultiValue, find: bool) -> LuaResult<CallOutcome> {
    let name = if find { "find" } else { "match" };
    let s = check_string(&args, 1, name)?;
    let pat = check_string(&args, 2, name)?;
    let len = s.chars().count() as i64;
    let init = relative_pos(opt_integer(&args, 3, name)?.unwrap_or(1), len).max(1);
    if init > len + 1 {
        return Ok(CallOutcome::one(LuaValue::Nil));
    }
    let start = byte_offset(&s, (init - 1) as usize);

    if find && (args.arg(4).is_truthy() || is_plain_pattern(&pat)) {
        return Ok(match s[start..].find(pat.as_str()) {
            Some(offset) => {
                let first = char_pos(&s, start + offset);
                let last = first + pat.chars().count() - 1;
                CallOutcome::values(MultiValue::two(first.into(), last.into()))
            }
            None => CallOutcome::one(LuaValue::Nil),
        });
    }

    let compiled = pattern::compile(vm, &pat)?;
    let Some(m) = compiled.find_at(&s, start) else {
        return Ok(CallOutcome::one(LuaValue::Nil));
    };
    if find {
        let mut values = vec![
            LuaValue::from(char_pos(&s, m.start)),
            LuaValue::from(char_pos(&s, m.end) - 1),
        ];
        values.extend(capture_values(&m, &s));
        Ok(CallOutcome::values(values))
    } else {
        Ok(CallOutcome::values(m.values(&s)))
    }
}

/// string.find(s, pattern [, init [, plain]]) - Start and end of the first match
fn string_find(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    find_aux(vm, args, true)
}

/// string.match(s, pattern [, init]) - Captures (or the match) of the first match
fn string_match(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    find_aux(vm, args, false)
}

/// Next match at or after `src`, skipping an empty match that ends where the
/// previous match ended
fn next_match(
    compiled: &CompiledPattern,
    text: &str,
    mut src: usize,
    last: Option<usize>,
) -> Option<PatternMatch> {
    loop {
        let m = compiled.find_at(text, src)?;
        if Some(m.end) != last {
            return Some(m);
        }
        if compiled.is_anchored() || m.start >= text.len() {
            return None;
        }
        src = m.start + text[m.start..].chars().next()?.len_utf8();
    }
}

/// string.gmatch(s, pattern) - Iterator over successive matches.
///
/// The iterator only moves forward; once exhausted it keeps returning nil.
fn string_gmatch(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "gmatch")?;
    let pat = check_string(&args, 2, "gmatch")?;
    let compiled = pattern::compile(vm, &pat)?;

    let text: Rc<str> = Rc::from(s.as_str());
    let position = Cell::new(Some(0usize));
    let last_end = Cell::new(None::<usize>);

    let iterator = LuaValue::closure("gmatch_iterator", move |_vm, _args| {
        let Some(src) = position.get() else {
            return Ok(CallOutcome::one(LuaValue::Nil));
        };
        match next_match(&compiled, &text, src, last_end.get()) {
            Some(m) => {
                let exhausted = compiled.is_anchored();
                position.set((!exhausted).then_some(m.end));
                last_end.set(Some(m.end));
                Ok(CallOutcome::values(m.values(&text)))
            }
            None => {
                position.set(None);
                Ok(CallOutcome::one(LuaValue::Nil))
            }
        }
    });
    Ok(CallOutcome::one(iterator))
}

/// What gsub puts in place of each match
enum Replacement {
    Template(SmolStr),
    Table(LuaValue),
    Function(LuaValue),
}

impl Replacement {
    fn from_arg(value: LuaValue) -> LuaResult<Self> {
        match value {
            LuaValue::String(s) => Ok(Replacement::Template(s)),
            LuaValue::Number(_) => Ok(Replacement::Template(SmolStr::new(value.to_string_raw()))),
            LuaValue::Table(_) => Ok(Replacement::Table(value)),
            LuaValue::Function(_) => Ok(Replacement::Function(value)),
            other => Err(LuaError::Type(format!(
                "bad argument #3 to 'gsub' (string/function/table expected, got {})",
                other.type_name()
            ))),
        }
    }

    /// Append the replacement for `m` to `out`
    fn apply(&self, vm: &mut LuaVM, text: &str, m: &PatternMatch, out: &mut String) -> LuaResult<()> {
        let whole = &text[m.start..m.end];
        let value = match self {
            Replacement::Template(template) => return expand_template(template, text, m, out),
            Replacement::Table(table) => {
                let key = m.values(text).into_iter().next().unwrap_or_default();
                vm.table_get(table, &key)?
            }
            Replacement::Function(func) => vm.call1(func, MultiValue::from(m.values(text)))?,
        };
        match value {
            LuaValue::Nil | LuaValue::Boolean(false) => out.push_str(whole),
            LuaValue::String(_) | LuaValue::Number(_) => out.push_str(&value.to_string_raw()),
            other => {
                return Err(LuaError::Type(format!(
                    "invalid replacement value (a {})",
                    other.type_name()
                )));
            }
        }
        Ok(())
    }
}

/// Expand `%0`-`%9` and `%%` in a gsub template
fn expand_template(template: &str, text: &str, m: &PatternMatch, out: &mut String) -> LuaResult<()> {
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('0') => out.push_str(&text[m.start..m.end]),
            Some(d @ '1'..='9') => {
                let index = d as usize - '0' as usize;
                if m.captures.is_empty() && index == 1 {
                    out.push_str(&text[m.start..m.end]);
                    continue;
                }
                match m.captures.get(index - 1) {
                    Some(Capture::Text(range)) => out.push_str(&text[range.clone()]),
                    Some(Capture::Position(pos)) => out.push_str(&pos.to_string()),
                    None => {
                        return Err(LuaError::Pattern(format!(
                            "invalid capture index %{index} in replacement string"
                        )));
                    }
                }
            }
            _ => {
                return Err(LuaError::Pattern(
                    "invalid use of '%' in replacement string".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// string.gsub(s, pattern, repl [, n]) - Replace matches left to right.
///
/// Output already produced is never searched again; returns the new string
/// and the number of replacements.
fn string_gsub(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let s = check_string(&args, 1, "gsub")?;
    let pat = check_string(&args, 2, "gsub")?;
    let replacement = Replacement::from_arg(args.arg(3))?;
    let max_n = opt_integer(&args, 4, "gsub")?;
    let compiled = pattern::compile(vm, &pat)?;

    let text = s.as_str();
    let mut out = String::with_capacity(text.len());
    let mut src = 0usize;
    let mut last = None;
    let mut count = 0i64;

    while max_n.is_none_or(|max| count < max) {
        let Some(m) = next_match(&compiled, text, src, last) else {
            break;
        };
        out.push_str(&text[src..m.start]);
        replacement.apply(vm, text, &m, &mut out)?;
        src = m.end;
        last = Some(m.end);
        count += 1;
        if compiled.is_anchored() {
            break;
        }
    }
    out.push_str(&text[src..]);
    Ok(CallOutcome::values(MultiValue::two(out.into(), count.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_lua_rules() {
        assert_eq!(clamp_range(2, -2, 5), Some((2, 4)));
        assert_eq!(clamp_range(-100, 100, 5), Some((1, 5)));
        assert_eq!(clamp_range(4, 2, 5), None);
        assert_eq!(clamp_range(1, -1, 0), None);
        assert_eq!(byte_offset("héllo", 2), 3);
        assert_eq!(char_pos("héllo", 3), 3);
    }
}
