//! Low-level GFF3 line parsing.
//!
//! Columns are located with memchr and numbers parsed straight from bytes.
//! Nothing here knows about line numbers; callers turn a `None` or an
//! `Err(message)` into a located parse error.

use crate::node::{Phase, Strand};
use memchr::memchr;

/// Number of tab-separated columns in a feature line.
pub const NUM_COLUMNS: usize = 9;

/// Fast u64 parsing without allocation.
///
/// Returns None if the input is empty, contains non-digit characters or
/// does not fit into a u64.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Split a feature line into its nine columns.
///
/// Returns None if the line has fewer than nine columns. Tabs inside the
/// last column are kept.
#[inline]
pub fn split_columns(line: &[u8]) -> Option<[&[u8]; NUM_COLUMNS]> {
    let mut columns: [&[u8]; NUM_COLUMNS] = [&[]; NUM_COLUMNS];
    let mut rest = line;
    for column in columns.iter_mut().take(NUM_COLUMNS - 1) {
        let tab = memchr(b'\t', rest)?;
        *column = &rest[..tab];
        rest = &rest[tab + 1..];
    }
    columns[NUM_COLUMNS - 1] = rest;
    Some(columns)
}

/// Count the columns of a line, for error messages.
pub fn count_columns(line: &[u8]) -> usize {
    memchr::memchr_iter(b'\t', line).count() + 1
}

pub fn parse_strand(column: &[u8]) -> Result<Strand, String> {
    match column {
        [c] => Strand::from_char(*c as char).ok_or_else(|| format!("invalid strand '{}'", *c as char)),
        _ => Err(format!("invalid strand '{}'", String::from_utf8_lossy(column))),
    }
}

pub fn parse_phase(column: &[u8]) -> Result<Phase, String> {
    match column {
        [c] => Phase::from_char(*c as char).ok_or_else(|| format!("invalid phase '{}'", *c as char)),
        _ => Err(format!("invalid phase '{}'", String::from_utf8_lossy(column))),
    }
}

/// Parse the score column. `.` means undefined.
pub fn parse_score(column: &str) -> Result<Option<f64>, String> {
    if column == "." {
        return Ok(None);
    }
    column
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("invalid score '{}'", column))
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim.
pub fn unescape(value: &str) -> String {
    if memchr(b'%', value.as_bytes()).is_none() {
        return value.to_string();
    }
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = hex {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Escape the characters that are reserved in the attribute column.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => out.push_str("%3B"),
            '=' => out.push_str("%3D"),
            '&' => out.push_str("%26"),
            '%' => out.push_str("%25"),
            '\t' => out.push_str("%09"),
            '\n' => out.push_str("%0A"),
            _ => out.push(c),
        }
    }
    out
}

/// Parse the attribute column into `(name, value)` pairs in input order.
///
/// `.` and empty columns have no attributes. Empty `;`-separated parts are
/// ignored.
pub fn parse_attributes(column: &str) -> Result<Vec<(String, String)>, String> {
    let column = column.trim();
    if column.is_empty() || column == "." {
        return Ok(Vec::new());
    }
    let mut attributes = Vec::new();
    for part in column.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some(eq) = memchr(b'=', part.as_bytes()) else {
            return Err(format!("attribute '{}' has no value", part));
        };
        let name = part[..eq].trim();
        if name.is_empty() {
            return Err(format!("attribute '{}' has no name", part));
        }
        if attributes.iter().any(|(n, _): &(String, String)| n == name) {
            return Err(format!("attribute '{}' given more than once", name));
        }
        attributes.push((unescape(name), unescape(part[eq + 1..].trim())));
    }
    Ok(attributes)
}

/// Parse the arguments of a `##sequence-region` pragma.
pub fn parse_sequence_region(rest: &str) -> Option<(String, u64, u64)> {
    let mut words = rest.split_ascii_whitespace();
    let seqid = words.next()?;
    let start = parse_u64_fast(words.next()?.as_bytes())?;
    let end = parse_u64_fast(words.next()?.as_bytes())?;
    if words.next().is_some() {
        return None;
    }
    Some((seqid.to_string(), start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64_fast() {
        assert_eq!(parse_u64_fast(b"12345"), Some(12345));
        assert_eq!(parse_u64_fast(b"0"), Some(0));
        assert_eq!(parse_u64_fast(b""), None);
        assert_eq!(parse_u64_fast(b"-1"), None);
        assert_eq!(parse_u64_fast(b"123abc"), None);
        assert_eq!(parse_u64_fast(b"18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_u64_fast(b"18446744073709551616"), None);
    }

    #[test]
    fn test_split_columns() {
        let line = b"ctg123\t.\tgene\t1000\t9000\t.\t+\t.\tID=gene00001;Name=EDEN";
        let columns = split_columns(line).unwrap();
        assert_eq!(columns[0], b"ctg123");
        assert_eq!(columns[2], b"gene");
        assert_eq!(columns[8], b"ID=gene00001;Name=EDEN");
        assert!(split_columns(b"ctg123\t.\tgene\t1000").is_none());
        assert_eq!(count_columns(b"ctg123\t.\tgene\t1000"), 4);
    }

    #[test]
    fn test_strand_phase_score() {
        assert_eq!(parse_strand(b"+"), Ok(Strand::Forward));
        assert_eq!(parse_strand(b"?"), Ok(Strand::Unknown));
        assert!(parse_strand(b"x").is_err());
        assert!(parse_strand(b"++").is_err());
        assert_eq!(parse_phase(b"2"), Ok(Phase::Two));
        assert_eq!(parse_phase(b"."), Ok(Phase::Undefined));
        assert!(parse_phase(b"3").is_err());
        assert_eq!(parse_score("."), Ok(None));
        assert_eq!(parse_score("0.5"), Ok(Some(0.5)));
        assert!(parse_score("high").is_err());
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes("ID=mRNA1;Parent=gene1;Note=a%3Bb;").unwrap();
        assert_eq!(
            attrs,
            vec![
                ("ID".to_string(), "mRNA1".to_string()),
                ("Parent".to_string(), "gene1".to_string()),
                ("Note".to_string(), "a;b".to_string()),
            ]
        );
        assert!(parse_attributes(".").unwrap().is_empty());
        assert!(parse_attributes("ID").is_err());
        assert!(parse_attributes("=x").is_err());
        assert!(parse_attributes("ID=a;ID=b").is_err());
    }

    #[test]
    fn test_escape_unescape() {
        let raw = "50% of a=b; c&d";
        assert_eq!(escape(raw), "50%25 of a%3Db%3B c%26d");
        assert_eq!(unescape(&escape(raw)), raw);
        assert_eq!(unescape("100%"), "100%");
        assert_eq!(unescape("%zz"), "%zz");
    }

    #[test]
    fn test_parse_sequence_region() {
        assert_eq!(
            parse_sequence_region("  ctg123 1 1497228"),
            Some(("ctg123".to_string(), 1, 1497228))
        );
        assert_eq!(parse_sequence_region("ctg123 1"), None);
        assert_eq!(parse_sequence_region("ctg123 1 x"), None);
    }
}
