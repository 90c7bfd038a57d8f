//! nom building blocks for the `errpt -a` record grammar.
//!
//! The report format is line-oriented:
//!
//! * a record separator of exactly 75 dashes on its own line;
//! * header lines `<key>: <value>`, where the key is a run of letters,
//!   digits, spaces and `/` (never a colon) and the value is the rest of
//!   the line;
//! * component-identity (VPD) sub-block lines `<key><2-or-more dots><value>`
//!   following a header whose value carries the `VPD:` marker;
//! * a bare `Description` line (no colon) introducing the free-form tail of
//!   a record, terminated by the next separator or end of input.
//!
//! The 2-or-more-dot run is what distinguishes a sub-block pair from header
//! text: header values may contain single dots and colons, while a VPD key
//! may carry at most one dot-qualified suffix such as `(Z0)`. A single dot
//! never starts sub-block parsing.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, line_ending, not_line_ending, space0},
    combinator::{eof, opt, verify},
    error::{context, VerboseError},
    sequence::{preceded, terminated},
    IResult,
};

use crate::model::{FieldValue, Record, DESCRIPTION_FIELD};

pub type GrammarResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// The record separator sentinel: exactly 75 dashes. Matched byte-exactly,
/// not as "a run of dashes".
pub const SEPARATOR: &str =
    "---------------------------------------------------------------------------";

/// Marker inside a header value that announces a component-identity
/// sub-block on the following lines.
pub const SUB_BLOCK_TRIGGER: &str = "VPD:";

fn is_header_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || c == '/'
}

fn is_sub_block_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' '
}

fn is_sub_block_suffix_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '(' || c == ')'
}

fn is_sub_block_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.'
}

fn line_ending_or_eof(input: &str) -> GrammarResult<&str> {
    alt((line_ending, eof))(input)
}

/// Zero or more blank lines (whitespace-only lines with a line ending).
pub fn blank_lines(input: &str) -> GrammarResult<()> {
    let mut rest = input;
    while let Ok((after, _)) = terminated(space0::<&str, VerboseError<&str>>, line_ending)(rest) {
        rest = after;
    }
    Ok((rest, ()))
}

/// The 75-dash separator on its own line.
pub fn separator_line(input: &str) -> GrammarResult<&str> {
    context("record separator", terminated(tag(SEPARATOR), line_ending_or_eof))(input)
}

/// One header line: `<key>: <value>`.
///
/// The value may be empty and is trimmed of surrounding whitespace. The
/// reserved `Description` name is not a legal header key; it only ever
/// appears as the bare description marker line.
pub fn header_line(input: &str) -> GrammarResult<(String, String)> {
    let (input, _) = space0(input)?;
    let (input, key) = context(
        "header key",
        verify(take_while1(is_header_key_char), |k: &str| {
            k.trim_end() != DESCRIPTION_FIELD
        }),
    )(input)?;
    let (input, _) = context("header colon", char(':'))(input)?;
    let (input, value) = not_line_ending(input)?;
    let (input, _) = line_ending_or_eof(input)?;
    Ok((input, (key.trim_end().to_string(), value.trim().to_string())))
}

/// One component-identity line: `<key><run of 2+ dots><value>`.
///
/// The key is alphanumeric-plus-space with an optional single `.`-qualified
/// suffix (`Device Specific.(Z0)`); the value is an alphanumeric-plus-`.`
/// token. Anything else, including a lone dot before the value, rejects the
/// line and ends the sub-block.
pub fn sub_block_line(input: &str) -> GrammarResult<(String, String)> {
    let (input, _) = space0(input)?;
    let (input, base) = context("sub-block key", take_while1(is_sub_block_key_char))(input)?;
    let (input, suffix) = if input.starts_with('.') && !input[1..].starts_with('.') {
        let (rest, suffix) =
            preceded(char('.'), take_while1(is_sub_block_suffix_char))(input)?;
        (rest, Some(suffix))
    } else {
        (input, None)
    };
    let (input, _) = context(
        "sub-block dot run",
        verify(take_while1(|c| c == '.'), |dots: &str| dots.len() >= 2),
    )(input)?;
    let (input, value) = context("sub-block value", take_while1(is_sub_block_value_char))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = line_ending_or_eof(input)?;
    let key = match suffix {
        Some(suffix) => format!("{}.{}", base.trim_end(), suffix),
        None => base.trim_end().to_string(),
    };
    Ok((input, (key, value.to_string())))
}

/// One or more sub-block lines, stopping at the first line that does not
/// match the sub-block shape.
pub fn sub_block(input: &str) -> GrammarResult<Vec<(String, String)>> {
    let (mut rest, first) = preceded(blank_lines, sub_block_line)(input)?;
    let mut pairs = vec![first];
    while let Ok((after, pair)) = preceded(blank_lines, sub_block_line)(rest) {
        pairs.push(pair);
        rest = after;
    }
    Ok((rest, pairs))
}

/// The bare `Description` marker line. No colon: that absence is the
/// grammar signal separating it from header lines.
fn description_marker(input: &str) -> GrammarResult<&str> {
    let (input, _) = space0(input)?;
    let (input, marker) = context("description marker", tag(DESCRIPTION_FIELD))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = line_ending_or_eof(input)?;
    Ok((input, marker))
}

/// Splits the input at the next 75-dash separator found at a line start,
/// returning `(body, rest)`. The separator is left in `rest`; if none is
/// found, the body runs to end of input.
fn split_at_separator(input: &str) -> (&str, &str) {
    let mut search = 0;
    while let Some(found) = input[search..].find(SEPARATOR) {
        let at = search + found;
        let line_start = at == 0 || input.as_bytes()[at - 1] == b'\n';
        let after = &input[at + SEPARATOR.len()..];
        let line_end = after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n");
        if line_start && line_end {
            return (&input[..at], &input[at..]);
        }
        search = at + 1;
    }
    (input, "")
}

/// The description tail: marker line, then everything verbatim up to the
/// next separator (not consumed) or end of input. Surrounding blank lines
/// are trimmed; interior lines are untouched.
pub fn description_block(input: &str) -> GrammarResult<String> {
    let (input, _) = description_marker(input)?;
    let (body, rest) = split_at_separator(input);
    let body = body.trim_matches(|c| c == '\n' || c == '\r');
    Ok((rest, body.to_string()))
}

/// One full record: optional separator, one or more header fields (with
/// their sub-blocks), and an optional description tail.
pub fn record(input: &str) -> GrammarResult<Record> {
    let (input, _) = blank_lines(input)?;
    let (input, _) = opt(separator_line)(input)?;
    let (input, _) = blank_lines(input)?;

    let mut record = Record::new();
    let (mut rest, _) = header_field(input, &mut record)?;
    loop {
        let (after_blanks, _) = blank_lines(rest)?;
        if let Ok((after, _)) = header_field(after_blanks, &mut record) {
            rest = after;
            continue;
        }
        if let Ok((after, body)) = description_block(after_blanks) {
            record.insert(DESCRIPTION_FIELD, FieldValue::Description(body));
            rest = after;
        } else {
            rest = after_blanks;
        }
        break;
    }
    Ok((rest, record))
}

/// True when a header signals a component-identity sub-block: the value
/// carries the literal `VPD:` marker, or the whole line is the bare `VPD:`
/// marker (key `VPD`, empty value).
fn signals_sub_block(key: &str, value: &str) -> bool {
    value.contains(SUB_BLOCK_TRIGGER)
        || (value.is_empty() && key == SUB_BLOCK_TRIGGER.trim_end_matches(':'))
}

/// Parses one header line and, when it signals a sub-block, the
/// sub-block lines that follow; inserts the result into `record`.
fn header_field<'a>(input: &'a str, record: &mut Record) -> GrammarResult<'a, ()> {
    let (input, (key, value)) = header_line(input)?;
    if signals_sub_block(&key, &value) {
        let (input, pairs) = context("component-identity sub-block", sub_block)(input)?;
        record.insert(key, FieldValue::SubBlock(pairs));
        Ok((input, ()))
    } else {
        record.insert(key, FieldValue::Text(value));
        Ok((input, ()))
    }
}

/// Matches a document trailer: blank lines, an optional terminating
/// separator, more blank lines, end of input.
pub fn trailer(input: &str) -> GrammarResult<&str> {
    let (input, _) = blank_lines(input)?;
    let (input, _) = opt(separator_line)(input)?;
    let (input, _) = blank_lines(input)?;
    let (input, _) = space0(input)?;
    eof(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_separator_is_exactly_75_dashes() {
        assert_eq!(SEPARATOR.len(), 75);
        assert!(SEPARATOR.bytes().all(|b| b == b'-'));
    }

    #[test]
    fn test_separator_line_byte_exact() {
        assert!(separator_line(SEPARATOR).is_ok());
        assert!(separator_line(&format!("{}\nnext", SEPARATOR)).is_ok());
        // 74 and 76 dashes are not separators
        assert!(separator_line(&SEPARATOR[1..]).is_err());
        assert!(separator_line(&format!("{}-", SEPARATOR)).is_err());
    }

    #[test]
    fn test_header_line_trims_value() {
        let (rest, (key, value)) = header_line("LABEL:          DISK_ERR4\nnext").unwrap();
        assert_eq!(key, "LABEL");
        assert_eq!(value, "DISK_ERR4");
        assert_eq!(rest, "next");
    }

    #[test]
    fn test_header_key_allows_spaces_and_slash() {
        let (_, (key, _)) = header_line("Date/Time:       Wed Oct  6 13:27:04 GMT+02:00 2021").unwrap();
        assert_eq!(key, "Date/Time");
        let (_, (key, value)) = header_line("Sequence Number: 64").unwrap();
        assert_eq!(key, "Sequence Number");
        assert_eq!(value, "64");
    }

    #[test]
    fn test_header_line_rejects_description_key() {
        assert!(header_line("Description: not a header").is_err());
    }

    #[test]
    fn test_header_line_rejects_separator_and_sub_block_shapes() {
        assert!(header_line(SEPARATOR).is_err());
        assert!(header_line("Serial Number...............10AB123").is_err());
    }

    #[test]
    fn test_sub_block_line_plain_key() {
        let (_, (key, value)) =
            sub_block_line("        Machine Type and Model......9117MMB\n").unwrap();
        assert_eq!(key, "Machine Type and Model");
        assert_eq!(value, "9117MMB");
    }

    #[test]
    fn test_sub_block_line_dot_qualified_suffix() {
        let (_, (key, value)) = sub_block_line("Device Specific.(Z0)........000005\n").unwrap();
        assert_eq!(key, "Device Specific.(Z0)");
        assert_eq!(value, "000005");
    }

    #[test]
    fn test_sub_block_line_requires_two_dots() {
        // a single dot is header-value punctuation, never a sub-block pair
        assert!(sub_block_line("Firmware Level.1a\n").is_err());
    }

    #[test]
    fn test_sub_block_stops_at_non_matching_line() {
        let input = "Serial Number......10AB123\nPart Number........74Y7523\nResource Name: hdisk0\n";
        let (rest, pairs) = sub_block(input).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("Serial Number".to_string(), "10AB123".to_string()));
        assert_eq!(rest, "Resource Name: hdisk0\n");
    }

    #[test]
    fn test_description_block_until_separator() {
        let input = format!("Description\nDISK OPERATION ERROR\nsecond line\n{}\nrest", SEPARATOR);
        let (rest, body) = description_block(&input).unwrap();
        assert_eq!(body, "DISK OPERATION ERROR\nsecond line");
        assert!(rest.starts_with(SEPARATOR));
    }

    #[test]
    fn test_description_block_until_eof() {
        let (rest, body) = description_block("Description\nall the way\nto the end").unwrap();
        assert_eq!(body, "all the way\nto the end");
        assert_eq!(rest, "");
    }

    #[test]
    fn test_description_ignores_inexact_dash_runs() {
        // a 76-dash line is description text, not a separator
        let input = format!("Description\ntext\n{}-\nmore", SEPARATOR);
        let (rest, body) = description_block(&input).unwrap();
        assert_eq!(body, format!("text\n{}-\nmore", SEPARATOR));
        assert_eq!(rest, "");
    }

    #[test]
    fn test_record_requires_a_header() {
        assert!(record("Description\njust text").is_err());
        assert!(record("").is_err());
    }

    #[test]
    fn test_record_with_sub_block_and_description() {
        let input = "\
LABEL:          DISK_ERR4
IDENTIFIER:     AB1234CD

Date/Time:       Wed Oct  6 13:27:04 GMT+02:00 2021
Platform Specific Data: VPD:
        Machine Type and Model......9117MMB
        Device Specific.(Z0)........000005
Resource Name:   hdisk0
Description
DISK OPERATION ERROR
";
        let (rest, record) = record(input).unwrap();
        assert_eq!(rest, "");
        let names: Vec<_> = record.field_names().collect();
        assert_eq!(
            names,
            vec![
                "LABEL",
                "IDENTIFIER",
                "Date/Time",
                "Platform Specific Data",
                "Resource Name",
                "Description"
            ]
        );
        match record.get("Platform Specific Data").unwrap() {
            FieldValue::SubBlock(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[1].0, "Device Specific.(Z0)");
            }
            other => panic!("expected sub-block, got {:?}", other),
        }
        assert_eq!(record.text("Description"), Some("DISK OPERATION ERROR"));
    }

    #[test]
    fn test_bare_vpd_marker_line_starts_sub_block() {
        let input = "\
LABEL: DISK_ERR4
VPD:
        Manufacturer................IBM
        Serial Number...............10AB123
Description
text
";
        let (_, record) = record(input).unwrap();
        match record.get("VPD").unwrap() {
            FieldValue::SubBlock(pairs) => {
                assert_eq!(pairs[0], ("Manufacturer".to_string(), "IBM".to_string()));
                assert_eq!(pairs.len(), 2);
            }
            other => panic!("expected sub-block, got {:?}", other),
        }
    }

    #[test]
    fn test_record_without_description_ends_at_separator() {
        let input = format!("LABEL: A\nIDENTIFIER: B\n{}\nLABEL: C\n", SEPARATOR);
        let (rest, record) = record(&input).unwrap();
        assert_eq!(record.len(), 2);
        assert!(record.get("Description").is_none());
        assert!(rest.starts_with(SEPARATOR));
    }

    #[test]
    fn test_trailer_accepts_final_separator_and_blanks() {
        assert!(trailer("").is_ok());
        assert!(trailer(&format!("{}\n\n", SEPARATOR)).is_ok());
        assert!(trailer("\n  \n").is_ok());
        assert!(trailer("garbage").is_err());
    }
}
