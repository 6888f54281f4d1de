//! Text transforms over the extracted `mission` descriptor.
//!
//! The descriptor is a Lua table literal. Only three spots are touched: the
//! authoritative `["start_time"]` line, the `["date"]` block and the
//! `["weather"]` block. Everything else is carried through byte-for-byte.

use regex::Regex;
use std::sync::LazyLock;

use crate::core::error::{PersistenceError, PersistenceResult};
use crate::core::season::SeasonDate;

pub const SECONDS_PER_DAY: u64 = 86_400;

const START_TIME_MARKER: &str = "\"start_time\"";

static DATE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\["date"\]\s*=\s*\{"#).expect("valid date label pattern"));
static DATE_END_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*--\s*end of \["date"\]"#).expect("valid date end marker pattern")
});
static WEATHER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\["weather"\]\s*=\s*\{"#).expect("valid weather label pattern")
});
static WEATHER_END_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^,\s*--\s*end of \["weather"\]"#).expect("valid weather end marker pattern")
});

/// Result of moving the mission clock forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTimeUpdate {
    pub previous: i64,
    pub updated: u64,
    /// Zero-based index of the rewritten line.
    pub line_index: usize,
    pub text: String,
}

/// `(current + delta) mod 86400`, always within a single day.
pub fn advance_start_time(current: i64, delta: u64) -> u64 {
    let current = current.rem_euclid(SECONDS_PER_DAY as i64) as u64;
    (current + delta % SECONDS_PER_DAY) % SECONDS_PER_DAY
}

fn parse_start_time_value(line: &str) -> Option<i64> {
    let (_, rest) = line.split_once('=')?;
    rest.split(',').next()?.trim().parse().ok()
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Add `delta` seconds to the last parsable `["start_time"]` line.
///
/// Earlier occurrences belong to nested structures and are left untouched, as are
/// marker lines whose value cannot be parsed.
pub fn update_start_time(text: &str, delta: u64) -> PersistenceResult<StartTimeUpdate> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();

    let (line_index, previous) = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(START_TIME_MARKER))
        .filter_map(|(idx, line)| parse_start_time_value(line).map(|value| (idx, value)))
        .last()
        .ok_or(PersistenceError::FieldNotFound("[\"start_time\"]"))?;

    let updated = advance_start_time(previous, delta);

    let mut out = String::with_capacity(text.len() + 8);
    for (idx, line) in lines.iter().enumerate() {
        if idx == line_index {
            let (_, ending) = split_line_ending(line);
            out.push_str(&format!("\t[\"start_time\"] = {},", updated));
            out.push_str(ending);
        } else {
            out.push_str(line);
        }
    }

    Ok(StartTimeUpdate {
        previous,
        updated,
        line_index,
        text: out,
    })
}

/// Given the byte offset of an opening `{`, return the offset just past its
/// matching `}`. Braces inside string literals and `--` line comments are ignored.
fn matching_brace_end(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Span of the first `label = { ... }` block whose braces balance, as
/// `(label_start, close_end)`.
fn find_block<'a>(text: &'a str, label: &'a Regex) -> impl Iterator<Item = (usize, usize)> + 'a {
    label.find_iter(text).filter_map(move |m| {
        let open = m.end() - 1;
        matching_brace_end(text, open).map(|close| (m.start(), close))
    })
}

fn canonical_date_block(date: SeasonDate) -> String {
    format!(
        "[\"date\"] = \n\t{{\n\t\t[\"Day\"] = {},\n\t\t[\"Year\"] = {},\n\t\t[\"Month\"] = {},\n\t}}, -- end of [\"date\"]",
        date.day, date.year, date.month
    )
}

/// Replace the `["date"]` block with a canonical Day/Year/Month block.
///
/// Field order and spacing inside the old block do not matter, and the trailing
/// `-- end of ["date"]` comment is consumed when present.
pub fn replace_date_block(text: &str, date: SeasonDate) -> PersistenceResult<String> {
    let (start, close) = find_block(text, &DATE_LABEL)
        .next()
        .ok_or(PersistenceError::BlockNotFound("[\"date\"]"))?;

    let mut end = close;
    if text[end..].starts_with(',') {
        end += 1;
    }
    if let Some(marker) = DATE_END_MARKER.find(&text[end..]) {
        end += marker.end();
    }

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..start]);
    out.push_str(&canonical_date_block(date));
    out.push_str(&text[end..]);
    Ok(out)
}

/// Replace the `["weather"]` block, through its `-- end of ["weather"]` comment,
/// with `template` verbatim.
pub fn replace_weather_block(text: &str, template: &str) -> PersistenceResult<String> {
    let (start, end) = find_block(text, &WEATHER_LABEL)
        .find_map(|(start, close)| {
            WEATHER_END_MARKER
                .find(&text[close..])
                .map(|marker| (start, close + marker.end()))
        })
        .ok_or(PersistenceError::BlockNotFound("[\"weather\"]"))?;

    let mut out = String::with_capacity(text.len() - (end - start) + template.len());
    out.push_str(&text[..start]);
    out.push_str(template);
    out.push_str(&text[end..]);
    Ok(out)
}
