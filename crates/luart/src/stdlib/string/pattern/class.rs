// Character classes for Lua patterns
// %a %c %d %g %l %p %s %u %w %x %z and their uppercase inverses, with the
// C-locale (ASCII) meaning

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Letter,   // %a
    Control,  // %c
    Digit,    // %d
    Graph,    // %g
    Lower,    // %l
    Punct,    // %p
    Space,    // %s
    Upper,    // %u
    AlphaNum, // %w
    Hex,      // %x
    Zero,     // %z
}

impl CharClass {
    /// Class for a pattern letter of either case
    pub fn from_letter(letter: char) -> Option<Self> {
        Some(match letter.to_ascii_lowercase() {
            'a' => CharClass::Letter,
            'c' => CharClass::Control,
            'd' => CharClass::Digit,
            'g' => CharClass::Graph,
            'l' => CharClass::Lower,
            'p' => CharClass::Punct,
            's' => CharClass::Space,
            'u' => CharClass::Upper,
            'w' => CharClass::AlphaNum,
            'x' => CharClass::Hex,
            'z' => CharClass::Zero,
            _ => return None,
        })
    }

    pub fn matches(&self, c: char) -> bool {
        match self {
            CharClass::Letter => c.is_ascii_alphabetic(),
            CharClass::Control => c.is_ascii_control(),
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::Graph => c.is_ascii_graphic(),
            CharClass::Lower => c.is_ascii_lowercase(),
            CharClass::Punct => c.is_ascii_punctuation(),
            CharClass::Space => matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'),
            CharClass::Upper => c.is_ascii_uppercase(),
            CharClass::AlphaNum => c.is_ascii_alphanumeric(),
            CharClass::Hex => c.is_ascii_hexdigit(),
            CharClass::Zero => c == '\0',
        }
    }

    /// Regex class body (usable inside `[...]`)
    pub fn regex_body(&self) -> &'static str {
        match self {
            CharClass::Letter => "[:alpha:]",
            CharClass::Control => "[:cntrl:]",
            CharClass::Digit => "[:digit:]",
            CharClass::Graph => "[:graph:]",
            CharClass::Lower => "[:lower:]",
            CharClass::Punct => "[:punct:]",
            CharClass::Space => "[:space:]",
            CharClass::Upper => "[:upper:]",
            CharClass::AlphaNum => "[:alnum:]",
            CharClass::Hex => "[:xdigit:]",
            CharClass::Zero => r"\x00",
        }
    }

    /// Standalone regex for the class, or its complement
    pub fn to_regex(&self, inverted: bool) -> String {
        if inverted {
            format!("[^{}]", self.regex_body())
        } else {
            format!("[{}]", self.regex_body())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_use_ascii_meaning() {
        assert!(CharClass::Letter.matches('q'));
        assert!(!CharClass::Letter.matches('é'));
        assert!(CharClass::Punct.matches('!'));
        assert!(CharClass::Space.matches('\t'));
        assert!(CharClass::Hex.matches('F'));
        assert_eq!(CharClass::from_letter('W'), Some(CharClass::AlphaNum));
        assert_eq!(CharClass::from_letter('q'), None);
    }
}
