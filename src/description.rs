//! Strict decoder for pattern descriptions.
//!
//! Descriptions are literal mappings such as
//!
//! ```text
//! {'ID': 3, 'constraints': {'death_rate': {'lb': 0.4, 'ub': inf}}}
//! ```
//!
//! The accepted grammar is closed: mappings, quoted strings, bare identifier
//! keys, numbers, `None`/`null`, and the infinity spellings in
//! [`INFINITY_WORDS`] (optionally signed, or wrapped as `float('inf')`).
//! Anything else is a [`ParseError`]; nothing is ever evaluated.

use crate::error::ParseError;

pub const ID_KEY: &str = "ID";
pub const CONSTRAINTS_KEY: &str = "constraints";
pub const LOWER_KEY: &str = "lb";
pub const UPPER_KEY: &str = "ub";

const INFINITY_WORDS: &[&str] = &[
    "inf",
    "Inf",
    "INF",
    "infinity",
    "Infinity",
    "np.inf",
    "numpy.inf",
    "math.inf",
];
const NULL_WORDS: &[&str] = &["None", "null"];

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Mapping(Vec<(String, Literal)>),
    Str(String),
    /// Numbers keep their source text so identifiers round-trip verbatim.
    Number { value: f64, text: String },
    Null,
}

impl Literal {
    fn describe(&self) -> &'static str {
        match self {
            Literal::Mapping(_) => "a mapping",
            Literal::Str(_) => "a string",
            Literal::Number { .. } => "a number",
            Literal::Null => "null",
        }
    }
}

/// Bounds exactly as written; `None` means the key was absent or null.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawBounds {
    pub lb: Option<f64>,
    pub ub: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternDescription {
    pub id: String,
    pub constraints: Vec<(String, RawBounds)>,
}

pub fn parse_description(text: &str) -> Result<PatternDescription, ParseError> {
    let entries = match parse_literal(text)? {
        Literal::Mapping(entries) => entries,
        other => {
            return Err(ParseError::UnexpectedValue {
                key: "description".into(),
                expected: format!("a mapping, found {}", other.describe()),
            });
        }
    };

    let id = match lookup(&entries, ID_KEY) {
        Some(Literal::Number { value, text }) if value.is_finite() => text.clone(),
        Some(Literal::Str(value)) if !value.trim().is_empty() => value.trim().to_string(),
        Some(_) => {
            return Err(ParseError::UnexpectedValue {
                key: ID_KEY.into(),
                expected: "a finite number or non-empty string".into(),
            });
        }
        None => {
            return Err(ParseError::MissingKey { key: ID_KEY.into() });
        }
    };

    let constraints = match lookup(&entries, CONSTRAINTS_KEY) {
        Some(Literal::Mapping(features)) => features
            .iter()
            .map(|(feature, bounds)| Ok((feature.clone(), decode_bounds(feature, bounds)?)))
            .collect::<Result<Vec<_>, ParseError>>()?,
        Some(_) => {
            return Err(ParseError::UnexpectedValue {
                key: CONSTRAINTS_KEY.into(),
                expected: "a mapping of feature name to bounds".into(),
            });
        }
        None => {
            return Err(ParseError::MissingKey {
                key: CONSTRAINTS_KEY.into(),
            });
        }
    };

    Ok(PatternDescription { id, constraints })
}

fn lookup<'a>(entries: &'a [(String, Literal)], key: &str) -> Option<&'a Literal> {
    entries
        .iter()
        .find(|(candidate, _)| candidate == key)
        .map(|(_, value)| value)
}

fn decode_bounds(feature: &str, literal: &Literal) -> Result<RawBounds, ParseError> {
    let Literal::Mapping(entries) = literal else {
        return Err(ParseError::UnexpectedValue {
            key: feature.to_string(),
            expected: format!("a mapping with 'lb'/'ub', found {}", literal.describe()),
        });
    };
    let mut bounds = RawBounds::default();
    for (key, value) in entries {
        let slot = match key.as_str() {
            LOWER_KEY => &mut bounds.lb,
            UPPER_KEY => &mut bounds.ub,
            other => {
                return Err(ParseError::InvalidBound {
                    feature: feature.to_string(),
                    bound: other.to_string(),
                    reason: "only 'lb' and 'ub' are allowed".into(),
                });
            }
        };
        *slot = decode_bound_value(feature, key, value)?;
    }
    Ok(bounds)
}

fn decode_bound_value(feature: &str, key: &str, value: &Literal) -> Result<Option<f64>, ParseError> {
    let invalid = |reason: String| ParseError::InvalidBound {
        feature: feature.to_string(),
        bound: key.to_string(),
        reason,
    };
    match value {
        Literal::Number { value, .. } => Ok(Some(*value)),
        Literal::Null => Ok(None),
        Literal::Str(text) => infinity_from_word(text.trim())
            .map(Some)
            .ok_or_else(|| invalid(format!("string '{text}' is not an infinity token"))),
        Literal::Mapping(_) => Err(invalid("found a mapping".into())),
    }
}

fn infinity_from_word(word: &str) -> Option<f64> {
    let (negative, bare) = match word.as_bytes().first() {
        Some(b'-') => (true, &word[1..]),
        Some(b'+') => (false, &word[1..]),
        _ => (false, word),
    };
    INFINITY_WORDS.contains(&bare).then_some(if negative {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    })
}

pub fn parse_literal(text: &str) -> Result<Literal, ParseError> {
    let mut parser = Parser { text, pos: 0 };
    let literal = parser.value()?;
    parser.skip_whitespace();
    if parser.pos < text.len() {
        return Err(parser.syntax("unexpected trailing input"));
    }
    Ok(literal)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn syntax(&self, message: &str) -> ParseError {
        ParseError::Syntax {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.bump() {
            Some(ch) if ch == wanted => Ok(()),
            Some(ch) => {
                self.pos -= ch.len_utf8();
                Err(self.syntax(&format!("expected '{wanted}', found '{ch}'")))
            }
            None => Err(self.syntax(&format!("expected '{wanted}', found end of input"))),
        }
    }

    fn value(&mut self) -> Result<Literal, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.mapping(),
            Some('\'' | '"') => self.string().map(Literal::Str),
            Some(ch) if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.') => self.signed(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.word(false),
            Some(ch) => Err(self.syntax(&format!("unexpected character '{ch}'"))),
            None => Err(self.syntax("unexpected end of input")),
        }
    }

    fn mapping(&mut self) -> Result<Literal, ParseError> {
        self.expect('{')?;
        let mut entries: Vec<(String, Literal)> = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Literal::Mapping(entries));
            }
            let key = self.key()?;
            if entries.iter().any(|(existing, _)| *existing == key) {
                return Err(ParseError::DuplicateKey { key });
            }
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Literal::Mapping(entries)),
                Some(ch) => {
                    self.pos -= ch.len_utf8();
                    return Err(self.syntax(&format!("expected ',' or '}}', found '{ch}'")));
                }
                None => return Err(self.syntax("unterminated mapping")),
            }
        }
    }

    fn key(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('\'' | '"') => self.string(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => Ok(self.identifier().to_string()),
            _ => Err(self.syntax("expected a quoted or bare key")),
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let quote = self.bump().ok_or_else(|| self.syntax("expected a string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(ch @ ('\\' | '\'' | '"')) => out.push(ch),
                    Some(other) => {
                        return Err(self.syntax(&format!("unsupported escape '\\{other}'")));
                    }
                    None => return Err(self.syntax("unterminated string")),
                },
                Some(ch) => out.push(ch),
                None => return Err(self.syntax("unterminated string")),
            }
        }
    }

    fn identifier(&mut self) -> &str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.')
        {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    fn signed(&mut self) -> Result<Literal, ParseError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };
        self.skip_whitespace();
        if self.peek().is_some_and(|ch| ch.is_alphabetic()) {
            return self.word(negative);
        }
        self.pos = start;
        self.number()
    }

    fn number(&mut self) -> Result<Literal, ParseError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '_'))
        {
            let ch = self.bump();
            if matches!(ch, Some('e' | 'E')) && matches!(self.peek(), Some('-' | '+')) {
                self.bump();
            }
        }
        let text = &self.text[start..self.pos];
        let cleaned = text.replace('_', "");
        match cleaned.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Literal::Number {
                value,
                text: text.trim_start_matches('+').to_string(),
            }),
            _ => Err(ParseError::UnknownToken {
                offset: start,
                token: text.to_string(),
            }),
        }
    }

    /// Bare words: null spellings, infinity spellings, or `float('inf')`.
    fn word(&mut self, negative: bool) -> Result<Literal, ParseError> {
        let start = self.pos;
        let word = self.identifier().to_string();
        if !negative && NULL_WORDS.contains(&word.as_str()) {
            return Ok(Literal::Null);
        }
        if word == "float" {
            return self.float_call(negative, start);
        }
        match infinity_from_word(&word) {
            Some(value) => Ok(infinity_literal(negative, value)),
            None => Err(ParseError::UnknownToken {
                offset: start,
                token: word,
            }),
        }
    }

    fn float_call(&mut self, negative: bool, start: usize) -> Result<Literal, ParseError> {
        self.expect('(')?;
        self.skip_whitespace();
        let argument = match self.peek() {
            Some('\'' | '"') => self.string()?,
            _ => return Err(self.syntax("float() takes a quoted infinity token")),
        };
        self.expect(')')?;
        match infinity_from_word(argument.trim()) {
            Some(value) => Ok(infinity_literal(negative, value)),
            None => Err(ParseError::UnknownToken {
                offset: start,
                token: format!("float('{argument}')"),
            }),
        }
    }
}

fn infinity_literal(negative: bool, value: f64) -> Literal {
    let value = if negative { -value } else { value };
    Literal::Number {
        value,
        text: value.to_string(),
    }
}
