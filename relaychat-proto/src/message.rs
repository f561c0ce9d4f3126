//! Parsing and serialization of a single IRC protocol line.
use std::collections::BTreeMap;
use std::fmt;

use crate::error::MessageParseError;
use crate::prefix::Prefix;

/// A single, fully parsed protocol line.
///
/// Construction always goes through [`ParsedMessage::parse`]; CR/LF is assumed to already be
/// stripped (or is stripped defensively if present), matching the grammar in the spec this
/// engine implements:
///
/// ```text
/// ['@' tag-list SP] [':' prefix SP] verb (SP middle)* [SP ':' trailing]
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedMessage {
    /// Message tags, decoded. Empty if no `@...` prefix was present.
    pub tags: BTreeMap<String, String>,
    /// The message's source, if a `:prefix` was present.
    pub source: Option<Prefix>,
    /// The verb or three-digit numeric reply code.
    pub verb: String,
    /// All positional arguments, `middle`s followed by the flattened `trailing`.
    pub args: Vec<String>,
    /// The original line, with any trailing CR/LF removed.
    pub raw: String,
}

impl ParsedMessage {
    /// Parses one line. Any CR/LF terminator (and anything after it) is discarded first, so a
    /// caller may pass a buffer that is merely CR/LF-terminated rather than pre-split.
    pub fn parse(line: &str) -> Result<ParsedMessage, MessageParseError> {
        let line = first_line(line);
        if line.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let mut rest = line;
        let mut tags = BTreeMap::new();
        if let Some(stripped) = rest.strip_prefix('@') {
            let (tag_str, remainder) = split_once_space(stripped);
            decode_tags(tag_str, &mut tags);
            rest = remainder.trim_start_matches(' ');
        }

        let mut source = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix_str, remainder) = split_once_space(stripped);
            source = Some(Prefix::new_from_str(prefix_str));
            rest = remainder.trim_start_matches(' ');
        }

        let (verb, remainder) = split_once_space(rest);
        if verb.is_empty() {
            return Err(MessageParseError::InvalidCommand);
        }

        let args = parse_args(remainder);

        Ok(ParsedMessage {
            tags,
            source,
            verb: verb.to_owned(),
            args,
            raw: line.to_owned(),
        })
    }

    /// Returns the first positional argument, if any.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }

    /// Returns the value of a `time` tag parsed as an ISO-8601/RFC3339 instant, if present and
    /// well-formed. Leap-second payloads (`23:59:60`) are not representable and yield `None`,
    /// per the server-time caveat in the spec this engine implements.
    pub fn server_time(&self) -> Option<chrono_compat::Timestamp> {
        self.tags.get("time").and_then(|v| chrono_compat::parse_rfc3339(v))
    }

    /// Returns the source's nickname, if the source is a `Prefix::Nickname`.
    pub fn source_nickname(&self) -> Option<&str> {
        self.source.as_ref().and_then(|p| p.nickname())
    }
}

impl fmt::Display for ParsedMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Returns everything up to (but not including) the first CR or LF in `s`, or all of `s` if
/// neither is present.
fn first_line(s: &str) -> &str {
    let end = s.find(['\r', '\n']).unwrap_or(s.len());
    &s[..end]
}

/// Splits `s` at its first space, returning `(before, after)`. `after` does not include the
/// separating space.
fn split_once_space(s: &str) -> (&str, &str) {
    match s.find(' ') {
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, ""),
    }
}

/// Parses the `(SP middle)* [SP ':' trailing]` portion of the grammar into a flat argument list.
fn parse_args(mut s: &str) -> Vec<String> {
    let mut args = Vec::new();
    loop {
        if let Some(trailing) = s.strip_prefix(':') {
            args.push(trailing.to_owned());
            break;
        }
        if s.is_empty() {
            break;
        }
        let (word, rest) = split_once_space(s);
        if !word.is_empty() {
            args.push(word.to_owned());
        }
        s = rest.trim_start_matches(' ');
        if s.is_empty() {
            break;
        }
    }
    args
}

/// Decodes a raw (still-escaped) `tag-list` into `out`, per the IRCv3 message-tags escape table.
fn decode_tags(tag_list: &str, out: &mut BTreeMap<String, String>) {
    for tag in tag_list.split(';') {
        if tag.is_empty() {
            continue;
        }
        match tag.find('=') {
            Some(idx) => {
                let key = &tag[..idx];
                let raw_value = &tag[idx + 1..];
                out.insert(key.to_owned(), decode_tag_value(raw_value));
            }
            None => {
                out.insert(tag.to_owned(), String::new());
            }
        }
    }
}

/// Decodes one tag value per the escape table:
///
/// | wire  | decoded    |
/// |-------|------------|
/// | `\:`  | `;`        |
/// | `\s`  | space      |
/// | `\r`  | CR         |
/// | `\n`  | LF         |
/// | `\\`  | `\`        |
/// | trailing lone `\` | dropped |
/// | `\x` (other)       | `x` |
pub fn decode_tag_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Encodes one tag value per the escape table (the reverse of [`decode_tag_value`]).
pub fn encode_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => out.push_str("\\:"),
            ' ' => out.push_str("\\s"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

/// Serializes a tag map into the wire `tag-list` form (without the leading `@`).
pub fn encode_tags(tags: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    let mut first = true;
    for (key, value) in tags {
        if !first {
            out.push(';');
        }
        first = false;
        out.push_str(key);
        if !value.is_empty() {
            out.push('=');
            out.push_str(&encode_tag_value(value));
        }
    }
    out
}

/// A tiny, dependency-light stand-in for the one piece of `chrono` this crate needs at the
/// parsing layer: recognizing an RFC3339 `time` tag well enough to hand a real timestamp type
/// back to callers that do link `chrono` (the engine crate does).
pub mod chrono_compat {
    /// An RFC3339 instant decomposed into the fields the engine needs; the engine crate converts
    /// this into a `chrono::DateTime<Utc>`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Timestamp {
        /// Whole seconds since the Unix epoch, ignoring leap seconds.
        pub unix_seconds: i64,
        /// Sub-second nanoseconds.
        pub nanos: u32,
    }

    /// Parses a (simplified) RFC3339 UTC timestamp of the form
    /// `YYYY-MM-DDTHH:MM:SS[.fraction]Z`. Returns `None` for leap-second payloads
    /// (`:60` seconds) or anything else outside this shape; the caller will fall back to local
    /// clock time in that case, per the spec's documented best-effort behavior.
    pub fn parse_rfc3339(s: &str) -> Option<Timestamp> {
        let s = s.strip_suffix('Z')?;
        let (date, time) = s.split_once('T')?;
        let mut date_parts = date.split('-');
        let year: i64 = date_parts.next()?.parse().ok()?;
        let month: u32 = date_parts.next()?.parse().ok()?;
        let day: u32 = date_parts.next()?.parse().ok()?;
        if date_parts.next().is_some() {
            return None;
        }

        let (time, frac) = match time.split_once('.') {
            Some((t, f)) => (t, Some(f)),
            None => (time, None),
        };
        let mut time_parts = time.split(':');
        let hour: u32 = time_parts.next()?.parse().ok()?;
        let minute: u32 = time_parts.next()?.parse().ok()?;
        let second: u32 = time_parts.next()?.parse().ok()?;
        if time_parts.next().is_some() || second >= 60 {
            return None;
        }

        let days = days_from_civil(year, month, day)?;
        let unix_seconds =
            days * 86_400 + hour as i64 * 3600 + minute as i64 * 60 + second as i64;
        let nanos = frac
            .map(|f| {
                let mut digits: String = f.chars().take(9).collect();
                while digits.len() < 9 {
                    digits.push('0');
                }
                digits.parse().unwrap_or(0)
            })
            .unwrap_or(0);

        Some(Timestamp { unix_seconds, nanos })
    }

    /// Howard Hinnant's days-from-civil algorithm, used so this module has no date library
    /// dependency of its own.
    fn days_from_civil(y: i64, m: u32, d: u32) -> Option<i64> {
        if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
            return None;
        }
        let y = if m <= 2 { y - 1 } else { y };
        let era = if y >= 0 { y } else { y - 399 } / 400;
        let yoe = (y - era * 400) as i64;
        let mp = ((m as i64 + 9) % 12) as i64;
        let doy = (153 * mp + 2) / 5 + d as i64 - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
        Some(era * 146_097 + doe - 719_468)
    }
}
