//! Balanced-delimiter scanner for semi-structured completion text.
//!
//! This is deliberately not a JSON decoder. Completion bodies wrap their
//! payload in commentary, markdown fences, trailing commas or outright
//! garbage, so the scanner only answers three questions: where does the
//! object opened at byte `i` close, what members does a balanced object
//! have, and what does a quoted string decode to.
//!
//! String tracking is a three-state machine (`Outside`, `InString`,
//! `Escape`) that runs independently of the delimiter stack. An escape
//! consumes exactly one following byte, so `\uXXXX` leaves its hex digits as
//! ordinary string content.

use thiserror::Error;

/// Lexical state of the scanner cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Outside,
    InString,
    Escape,
}

impl ScanState {
    /// Advance the state by one byte.
    pub fn step(self, byte: u8) -> ScanState {
        match (self, byte) {
            (ScanState::Outside, b'"') => ScanState::InString,
            (ScanState::Outside, _) => ScanState::Outside,
            (ScanState::InString, b'\\') => ScanState::Escape,
            (ScanState::InString, b'"') => ScanState::Outside,
            (ScanState::InString, _) => ScanState::InString,
            (ScanState::Escape, _) => ScanState::InString,
        }
    }
}

/// Scanner failures, all reported with the byte offset where they occurred.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("byte {0} is not an opening delimiter")]
    NotADelimiter(usize),

    #[error("delimiter opened at byte {0} is never closed")]
    Unbalanced(usize),

    #[error("mismatched closing delimiter at byte {0}")]
    Mismatched(usize),

    #[error("string starting at byte {0} is never terminated")]
    UnterminatedString(usize),
}

/// Half-open byte range `[start, end)` of a balanced region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// A member value as seen by the lenient reader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue<'a> {
    /// Balanced `{...}` region, delimiters included.
    Object(&'a str),
    /// Balanced `[...]` region, delimiters included.
    Array(&'a str),
    /// Decoded string literal.
    String(String),
    /// Bare token (number, `true`, `null`, or unquoted junk), trimmed.
    Scalar(&'a str),
}

impl RawValue<'_> {
    /// Numeric view of a scalar or numeric string.
    pub fn as_f64(&self) -> Option<f64> {
        let text = match self {
            RawValue::Scalar(s) => *s,
            RawValue::String(s) => s.as_str(),
            _ => return None,
        };
        text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Text view of a string literal. `null` and structured values yield `None`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s.as_str()),
            RawValue::Scalar(s) if *s != "null" && !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'{' => Some(b'}'),
        b'[' => Some(b']'),
        _ => None,
    }
}

/// Find the delimiter closing the `{` or `[` at byte `open`.
///
/// Nested braces and brackets of either kind are tracked on a stack, and
/// delimiters inside string literals are ignored.
pub fn match_delimiter(text: &str, open: usize) -> Result<Span, ScanError> {
    scan(text, open, None)
}

/// Outcome of scanning from every opening delimiter one pass visited.
pub type Resolved = Vec<(usize, Result<Span, ScanError>)>;

/// Like [`match_delimiter`], but also reports the outcome for every nested
/// opening delimiter the scan treated as structural.
///
/// A scan started at any of those nested offsets would return exactly the
/// reported result, so callers probing many start offsets can skip them.
pub fn match_delimiter_resolving(text: &str, open: usize) -> (Result<Span, ScanError>, Resolved) {
    let mut resolved = Vec::new();
    let outcome = scan(text, open, Some(&mut resolved));
    (outcome, resolved)
}

fn scan(text: &str, open: usize, mut resolved: Option<&mut Resolved>) -> Result<Span, ScanError> {
    let bytes = text.as_bytes();
    let first = *bytes.get(open).ok_or(ScanError::NotADelimiter(open))?;
    let first_closer = closer_for(first).ok_or(ScanError::NotADelimiter(open))?;

    // (closer, offset of its opener)
    let mut stack = vec![(first_closer, open)];
    let mut state = ScanState::Outside;

    for (i, &b) in bytes.iter().enumerate().skip(open + 1) {
        if state != ScanState::Outside || b == b'"' {
            state = state.step(b);
            continue;
        }
        match b {
            b'{' | b'[' => {
                if let Some(closer) = closer_for(b) {
                    stack.push((closer, i));
                }
            }
            b'}' | b']' => {
                if stack.last().map(|(closer, _)| *closer) != Some(b) {
                    if let Some(resolved) = resolved.as_deref_mut() {
                        resolved.extend(
                            stack[1..]
                                .iter()
                                .map(|(_, at)| (*at, Err(ScanError::Mismatched(i)))),
                        );
                    }
                    return Err(ScanError::Mismatched(i));
                }
                if let Some((_, at)) = stack.pop() {
                    let span = Span { start: at, end: i + 1 };
                    if stack.is_empty() {
                        return Ok(span);
                    }
                    if let Some(resolved) = resolved.as_deref_mut() {
                        resolved.push((at, Ok(span)));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(resolved) = resolved {
        resolved.extend(
            stack[1..]
                .iter()
                .map(|(_, at)| (*at, Err(ScanError::Unbalanced(*at)))),
        );
    }
    Err(ScanError::Unbalanced(open))
}

/// Decode the string literal whose opening quote is at byte `quote`.
///
/// Returns the decoded text and the byte offset just past the closing quote.
/// Unknown escapes decode to the escaped character itself; malformed
/// `\u` sequences decode to U+FFFD.
pub fn read_string(text: &str, quote: usize) -> Result<(String, usize), ScanError> {
    if text.as_bytes().get(quote) != Some(&b'"') {
        return Err(ScanError::UnterminatedString(quote));
    }

    let mut out = String::new();
    let mut chars = text[quote + 1..].char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => return Ok((out, quote + 1 + offset + 1)),
            '\\' => {
                let Some((_, esc)) = chars.next() else {
                    break;
                };
                match esc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'u' => {
                        let high = take_hex4(&mut chars);
                        let decoded = match high {
                            Some(h) if (0xD800..0xDC00).contains(&h) => {
                                decode_surrogate_pair(h, &mut chars)
                            }
                            Some(h) => char::from_u32(h),
                            None => None,
                        };
                        out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
                    }
                    other => out.push(other),
                }
            }
            other => out.push(other),
        }
    }

    Err(ScanError::UnterminatedString(quote))
}

fn take_hex4<I>(chars: &mut std::iter::Peekable<I>) -> Option<u32>
where
    I: Iterator<Item = (usize, char)>,
{
    let mut value = 0u32;
    for _ in 0..4 {
        let digit = chars.peek()?.1.to_digit(16)?;
        chars.next();
        value = value * 16 + digit;
    }
    Some(value)
}

fn decode_surrogate_pair<I>(high: u32, chars: &mut std::iter::Peekable<I>) -> Option<char>
where
    I: Iterator<Item = (usize, char)> + Clone,
{
    let mut lookahead = chars.clone();
    if lookahead.next()?.1 != '\\' || lookahead.next()?.1 != 'u' {
        return None;
    }
    let low = take_hex4(&mut lookahead)?;
    if !(0xDC00..0xE000).contains(&low) {
        return None;
    }
    *chars = lookahead;
    char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Read one value starting at byte `i`, returning it and the offset after it.
pub fn read_value(text: &str, i: usize) -> Result<(RawValue<'_>, usize), ScanError> {
    let bytes = text.as_bytes();
    match bytes.get(i) {
        None => Err(ScanError::Unbalanced(i)),
        Some(b'{') => {
            let span = match_delimiter(text, i)?;
            Ok((RawValue::Object(span.slice(text)), span.end))
        }
        Some(b'[') => {
            let span = match_delimiter(text, i)?;
            Ok((RawValue::Array(span.slice(text)), span.end))
        }
        Some(b'"') => {
            let (s, end) = read_string(text, i)?;
            Ok((RawValue::String(s), end))
        }
        Some(_) => {
            let mut end = i;
            while end < bytes.len() && !matches!(bytes[end], b',' | b'}' | b']' | b'\n') {
                end += 1;
            }
            Ok((RawValue::Scalar(text[i..end].trim()), end))
        }
    }
}

/// List the members of a balanced object region (as returned by
/// [`match_delimiter`]).
///
/// Tolerates trailing commas, unquoted junk between members and members
/// without a `:`; anything that is not a `"key": value` pair is skipped.
pub fn object_members(object: &str) -> Result<Vec<(String, RawValue<'_>)>, ScanError> {
    let bytes = object.as_bytes();
    if bytes.first() != Some(&b'{') {
        return Err(ScanError::NotADelimiter(0));
    }
    let end = bytes.len().saturating_sub(1);

    let mut members = Vec::new();
    let mut i = 1;
    while i < end {
        i = skip_whitespace(bytes, i);
        if i >= end {
            break;
        }
        match bytes[i] {
            b',' => {
                i += 1;
            }
            b'"' => {
                let (key, after_key) = read_string(object, i)?;
                let colon = skip_whitespace(bytes, after_key);
                if bytes.get(colon) != Some(&b':') {
                    i = colon.max(i + 1);
                    continue;
                }
                let value_start = skip_whitespace(bytes, colon + 1);
                if value_start >= end {
                    break;
                }
                let (value, after_value) = read_value(object, value_start)?;
                members.push((key, value));
                i = after_value.max(value_start + 1);
            }
            _ => {
                let (_, after) = read_value(object, i)?;
                i = after.max(i + 1);
            }
        }
    }

    Ok(members)
}

/// List the elements of a balanced array region.
pub fn array_elements(array: &str) -> Result<Vec<RawValue<'_>>, ScanError> {
    let bytes = array.as_bytes();
    if bytes.first() != Some(&b'[') {
        return Err(ScanError::NotADelimiter(0));
    }
    let end = bytes.len().saturating_sub(1);

    let mut elements = Vec::new();
    let mut i = 1;
    while i < end {
        i = skip_whitespace(bytes, i);
        if i >= end {
            break;
        }
        if bytes[i] == b',' {
            i += 1;
            continue;
        }
        let (value, after) = read_value(array, i)?;
        if !matches!(value, RawValue::Scalar("")) {
            elements.push(value);
        }
        i = after.max(i + 1);
    }

    Ok(elements)
}
