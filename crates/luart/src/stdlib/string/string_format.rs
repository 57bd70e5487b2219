// string.format implementation
// Format strings are parsed once into literal runs and directives and cached
// per runtime; rendering walks the cached tree
use std::fmt::Write as FmtWrite;
use std::rc::Rc;

use smol_str::SmolStr;
use tracing::trace;

use crate::lib_registry::check_string;
use crate::lua_value::{
    CallOutcome, LuaValue, MultiValue, format_float_e, format_float_f, format_float_g,
};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

/// Parsed format strings kept per runtime before the cache is reset
const FORMAT_CACHE_LIMIT: usize = 256;

/// Longest width or precision accepted, in digits
const MAX_FORMAT_DIGITS: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
}

/// Which argument a directive consumes
#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgRef {
    Next,
    /// `%N$`, 1-based among the values after the format string
    Position(usize),
    /// `%(a.b)`, a field path into the first argument
    Named(Vec<SmolStr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Char,
    Int,
    Octal,
    Unsigned,
    Hex { upper: bool },
    Exp { upper: bool },
    Fixed,
    General { upper: bool },
    Str,
    Quoted,
}

impl Conversion {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'c' => Conversion::Char,
            'd' | 'i' => Conversion::Int,
            'o' => Conversion::Octal,
            'u' => Conversion::Unsigned,
            'x' => Conversion::Hex { upper: false },
            'X' => Conversion::Hex { upper: true },
            'e' => Conversion::Exp { upper: false },
            'E' => Conversion::Exp { upper: true },
            'f' => Conversion::Fixed,
            'g' => Conversion::General { upper: false },
            'G' => Conversion::General { upper: true },
            's' => Conversion::Str,
            'q' => Conversion::Quoted,
            _ => return None,
        })
    }

    fn is_numeric(self) -> bool {
        !matches!(self, Conversion::Str | Conversion::Quoted)
    }

    /// Conversions that honour the `+` and space flags
    fn is_signed(self) -> bool {
        matches!(
            self,
            Conversion::Int
                | Conversion::Exp { .. }
                | Conversion::Fixed
                | Conversion::General { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    arg: ArgRef,
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Directive(Directive),
}

/// A parsed format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    segments: Vec<Segment>,
}

fn format_error(message: impl Into<String>) -> LuaError {
    LuaError::Type(format!("invalid format ({})", message.into()))
}

/// Read up to `MAX_FORMAT_DIGITS` digits
fn read_digits(chars: &[char], pos: &mut usize) -> LuaResult<Option<usize>> {
    let start = *pos;
    while *pos < chars.len() && chars[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start {
        return Ok(None);
    }
    if *pos - start > MAX_FORMAT_DIGITS {
        return Err(format_error("width or precision too long"));
    }
    let text: String = chars[start..*pos].iter().collect();
    Ok(text.parse().ok())
}

impl FormatSpec {
    pub fn parse(format: &str) -> LuaResult<Self> {
        let chars: Vec<char> = format.chars().collect();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut has_positional = false;
        let mut has_named = false;
        let mut pos = 0;

        while pos < chars.len() {
            let c = chars[pos];
            pos += 1;
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.get(pos) {
                None => return Err(format_error("ends with '%'")),
                Some('%') => {
                    literal.push('%');
                    pos += 1;
                    continue;
                }
                Some(_) => {}
            }

            let arg = if chars[pos] == '(' {
                let close = chars[pos..]
                    .iter()
                    .position(|&ch| ch == ')')
                    .ok_or_else(|| format_error("unfinished '%(' reference"))?;
                let name: String = chars[pos + 1..pos + close].iter().collect();
                pos += close + 1;
                if name.is_empty() || name.split('.').any(str::is_empty) {
                    return Err(format_error(format!("bad field reference '{name}'")));
                }
                has_named = true;
                ArgRef::Named(name.split('.').map(SmolStr::new).collect())
            } else {
                let digits_end = chars[pos..]
                    .iter()
                    .position(|ch| !ch.is_ascii_digit())
                    .map_or(chars.len(), |offset| pos + offset);
                if digits_end > pos && chars.get(digits_end) == Some(&'$') {
                    let text: String = chars[pos..digits_end].iter().collect();
                    let index: usize = text
                        .parse()
                        .map_err(|_| format_error(format!("argument position {text} out of range")))?;
                    if index == 0 {
                        return Err(format_error("argument position must start at 1"));
                    }
                    pos = digits_end + 1;
                    has_positional = true;
                    ArgRef::Position(index)
                } else {
                    ArgRef::Next
                }
            };

            let mut flags = Flags::default();
            while let Some(&flag) = chars.get(pos) {
                match flag {
                    '-' => flags.left = true,
                    '+' => flags.plus = true,
                    ' ' => flags.space = true,
                    '0' => flags.zero = true,
                    '#' => flags.alt = true,
                    _ => break,
                }
                pos += 1;
            }

            let width = read_digits(&chars, &mut pos)?;
            let precision = if chars.get(pos) == Some(&'.') {
                pos += 1;
                Some(read_digits(&chars, &mut pos)?.unwrap_or(0))
            } else {
                None
            };

            let Some(&conv) = chars.get(pos) else {
                return Err(format_error("missing conversion"));
            };
            pos += 1;
            let conversion = Conversion::from_char(conv).ok_or_else(|| {
                LuaError::Type(format!("invalid option '%{conv}' to 'format'"))
            })?;

            if has_positional && has_named {
                return Err(format_error(
                    "positional and named references cannot be mixed",
                ));
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Directive(Directive {
                arg,
                flags,
                width,
                precision,
                conversion,
            }));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(FormatSpec { segments })
    }

    /// Render with `args` (the values after the format string)
    pub fn render(&self, vm: &mut LuaVM, args: &[LuaValue]) -> LuaResult<String> {
        let mut out = String::new();
        let mut next_arg = 0usize;
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Directive(directive) => {
                    let (value, arg_no) = resolve_arg(vm, directive, args, &mut next_arg)?;
                    render_directive(vm, &mut out, directive, &value, arg_no)?;
                }
            }
        }
        Ok(out)
    }
}

/// The value for a directive plus its `bad argument #N` number
fn resolve_arg(
    vm: &mut LuaVM,
    directive: &Directive,
    args: &[LuaValue],
    next_arg: &mut usize,
) -> LuaResult<(LuaValue, usize)> {
    let index = match &directive.arg {
        ArgRef::Next => {
            *next_arg += 1;
            *next_arg - 1
        }
        ArgRef::Position(n) => n - 1,
        ArgRef::Named(path) => {
            let mut current = args.first().cloned().ok_or_else(|| no_value(2))?;
            for field in path {
                if !current.is_table() {
                    return Err(LuaError::Type(format!(
                        "bad argument #2 to 'format' (field '{}' of a {} value)",
                        field,
                        current.type_name()
                    )));
                }
                current = vm.table_get(&current, &LuaValue::String(field.clone()))?;
            }
            return Ok((current, 2));
        }
    };
    match args.get(index) {
        Some(value) => Ok((value.clone(), index + 2)),
        None => Err(no_value(index + 2)),
    }
}

fn no_value(arg_no: usize) -> LuaError {
    LuaError::Type(format!("bad argument #{arg_no} to 'format' (no value)"))
}

fn render_directive(
    vm: &mut LuaVM,
    out: &mut String,
    directive: &Directive,
    value: &LuaValue,
    arg_no: usize,
) -> LuaResult<()> {
    let conversion = directive.conversion;
    if !conversion.is_numeric() {
        let text = vm.tostring_text(value)?;
        let text = if conversion == Conversion::Quoted {
            quote_string(&text)
        } else {
            match directive.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            }
        };
        pad_text(out, &text, directive.width, directive.flags.left);
        return Ok(());
    }

    let n = value.to_number().ok_or_else(|| {
        LuaError::Type(format!(
            "bad argument #{arg_no} to 'format' (number expected, got {})",
            value.type_name()
        ))
    })?;

    let flags = directive.flags;
    let precision = directive.precision;
    match conversion {
        Conversion::Char => {
            let code = n.trunc();
            let c = (code >= 0.0)
                .then(|| char::from_u32(code as u32))
                .flatten()
                .ok_or_else(|| {
                    LuaError::Type(format!(
                        "bad argument #{arg_no} to 'format' (value out of range)"
                    ))
                })?;
            pad_text(out, c.encode_utf8(&mut [0u8; 4]), directive.width, flags.left);
        }
        Conversion::Int => {
            let i = n.trunc() as i64;
            let mut buffer = itoa::Buffer::new();
            let digits = int_digits(buffer.format(i.unsigned_abs()), precision);
            pad_number(out, directive, i < 0, "", &digits, precision.is_none());
        }
        Conversion::Octal | Conversion::Unsigned | Conversion::Hex { .. } => {
            let u = (n.trunc() as i64) as u64;
            let raw = match conversion {
                Conversion::Octal => format!("{u:o}"),
                Conversion::Hex { upper: true } => format!("{u:X}"),
                Conversion::Hex { upper: false } => format!("{u:x}"),
                _ => format!("{u}"),
            };
            let mut digits = int_digits(&raw, precision);
            let prefix = match conversion {
                Conversion::Octal if flags.alt && !digits.starts_with('0') => {
                    digits.insert(0, '0');
                    ""
                }
                Conversion::Hex { upper: true } if flags.alt && u != 0 => "0X",
                Conversion::Hex { upper: false } if flags.alt && u != 0 => "0x",
                _ => "",
            };
            pad_number(out, directive, false, prefix, &digits, precision.is_none());
        }
        Conversion::Exp { upper } => {
            let digits = format_float_e(n.abs(), precision.unwrap_or(6), upper);
            pad_number(out, directive, n.is_sign_negative(), "", &digits, n.is_finite());
        }
        Conversion::Fixed => {
            let prec = precision.unwrap_or(6);
            let mut digits = format_float_f(n.abs(), prec);
            if flags.alt && prec == 0 && n.is_finite() {
                digits.push('.');
            }
            pad_number(out, directive, n.is_sign_negative(), "", &digits, n.is_finite());
        }
        Conversion::General { upper } => {
            let digits = format_float_g(n.abs(), precision.unwrap_or(6), upper, flags.alt);
            pad_number(out, directive, n.is_sign_negative(), "", &digits, n.is_finite());
        }
        Conversion::Str | Conversion::Quoted => {}
    }
    Ok(())
}

/// Integer digits with the C precision rule (minimum digit count; a zero
/// value with precision 0 prints nothing)
fn int_digits(raw: &str, precision: Option<usize>) -> String {
    match precision {
        Some(0) if raw == "0" => String::new(),
        Some(p) if raw.len() < p => format!("{}{raw}", "0".repeat(p - raw.len())),
        _ => raw.to_string(),
    }
}

fn pad_text(out: &mut String, text: &str, width: Option<usize>, left: bool) {
    let len = text.chars().count();
    let fill = width.unwrap_or(0).saturating_sub(len);
    if left {
        out.push_str(text);
        out.extend(std::iter::repeat_n(' ', fill));
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(text);
    }
}

/// Sign, prefix and digits laid out in the field; zero padding goes between
/// the prefix and the digits
fn pad_number(
    out: &mut String,
    directive: &Directive,
    negative: bool,
    prefix: &str,
    digits: &str,
    zero_pad_ok: bool,
) {
    let flags = directive.flags;
    let signed = directive.conversion.is_signed();
    let sign = if negative {
        "-"
    } else if flags.plus && signed {
        "+"
    } else if flags.space && signed {
        " "
    } else {
        ""
    };
    let len = sign.len() + prefix.len() + digits.chars().count();
    let fill = directive.width.unwrap_or(0).saturating_sub(len);

    if flags.left {
        let _ = write!(out, "{sign}{prefix}{digits}");
        out.extend(std::iter::repeat_n(' ', fill));
    } else if flags.zero && zero_pad_ok {
        let _ = write!(out, "{sign}{prefix}");
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        let _ = write!(out, "{sign}{prefix}{digits}");
    }
}

/// `%q`: double quotes with `"`, `\`, newline, carriage return and NUL
/// escaped so the result reads back as the same string
fn quote_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\\n"),
            '\r' => quoted.push_str("\\r"),
            '\0' => quoted.push_str("\\000"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Parse `format` through the runtime's cache
fn cached_spec(vm: &mut LuaVM, format: &str) -> LuaResult<Rc<FormatSpec>> {
    if let Some(spec) = vm.format_cache.get(format) {
        return Ok(spec.clone());
    }
    let spec = Rc::new(FormatSpec::parse(format)?);
    trace!(format, "parsed format string");
    if vm.format_cache.len() >= FORMAT_CACHE_LIMIT {
        vm.format_cache.clear();
    }
    vm.format_cache.insert(SmolStr::new(format), spec.clone());
    Ok(spec)
}

/// string.format(formatstring, ...) - printf-style formatting
pub fn string_format(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let format = check_string(&args, 1, "format")?;
    let spec = cached_spec(vm, &format)?;
    let text = spec.render(vm, &args.as_slice()[1..])?;
    Ok(CallOutcome::one(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals_and_directives() {
        let spec = FormatSpec::parse("x=%-5.2f%%").unwrap();
        assert_eq!(spec.segments.len(), 3);
        let Segment::Directive(d) = &spec.segments[1] else {
            panic!("expected a directive");
        };
        assert!(d.flags.left);
        assert_eq!(d.width, Some(5));
        assert_eq!(d.precision, Some(2));
        assert_eq!(d.conversion, Conversion::Fixed);
        assert_eq!(spec.segments[2], Segment::Literal("%".to_string()));
    }

    #[test]
    fn parses_argument_references() {
        let spec = FormatSpec::parse("%2$s %1$s").unwrap();
        let Segment::Directive(d) = &spec.segments[0] else {
            panic!("expected a directive");
        };
        assert_eq!(d.arg, ArgRef::Position(2));

        let spec = FormatSpec::parse("%(user.name)s").unwrap();
        let Segment::Directive(d) = &spec.segments[0] else {
            panic!("expected a directive");
        };
        assert_eq!(
            d.arg,
            ArgRef::Named(vec![SmolStr::new("user"), SmolStr::new("name")])
        );
    }

    #[test]
    fn rejects_bad_formats() {
        assert!(FormatSpec::parse("%1$d %(a)d").is_err());
        assert!(FormatSpec::parse("%y").is_err());
        assert!(FormatSpec::parse("%123d").is_err());
        assert!(FormatSpec::parse("abc%").is_err());
    }

    #[test]
    fn reports_argument_positions() {
        let err = FormatSpec::parse("%0$d").unwrap_err();
        assert!(err.to_string().contains("must start at 1"));
        let err = FormatSpec::parse("%99999999999999999999$d").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid format (argument position 99999999999999999999 out of range)"
        );
    }

    #[test]
    fn quotes_like_lua() {
        assert_eq!(quote_string("a\"b\\\n"), "\"a\\\"b\\\\\\\n\"");
        assert_eq!(quote_string("\0"), "\"\\000\"");
    }
}
