use std::borrow::Cow;

use crate::error::Result;
use crate::models::Field;

/// Rewrite raw pasted input into markup that contains a `<table>`.
///
/// Bare `<tr>` rows get a synthetic table wrapper (with a header built from
/// `synthetic_header` when positional mapping is active). Tab- or
/// pipe-delimited text becomes a table whose first line is the header.
/// Anything else, including empty input, passes through untouched.
pub fn normalize<'a>(raw: &'a str, synthetic_header: Option<&[Field]>) -> Result<Cow<'a, str>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Cow::Borrowed(raw));
    }

    if looks_like_table_rows(trimmed) {
        return Ok(Cow::Owned(wrap_table_rows(trimmed, synthetic_header)));
    }

    if !has_table_markup(trimmed) {
        if let Some(delimiter) = detect_delimiter(trimmed) {
            return delimited_to_table(trimmed, delimiter).map(Cow::Owned);
        }
    }

    Ok(Cow::Borrowed(raw))
}

/// Row markers present but no enclosing table.
pub fn looks_like_table_rows(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("<tr") && !lower.contains("<table")
}

fn has_table_markup(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("<table") || lower.contains("<tr")
}

fn detect_delimiter(text: &str) -> Option<u8> {
    let first = text.lines().next()?;
    if first.contains('\t') {
        Some(b'\t')
    } else if first.contains('|') {
        Some(b'|')
    } else {
        None
    }
}

fn wrap_table_rows(rows: &str, synthetic_header: Option<&[Field]>) -> String {
    let mut out = String::from("<table>");
    if let Some(fields) = synthetic_header.filter(|f| !f.is_empty()) {
        out.push_str("<thead><tr>");
        for field in fields {
            out.push_str("<th>");
            out.push_str(field.display_name());
            out.push_str("</th>");
        }
        out.push_str("</tr></thead>");
    }
    out.push_str("<tbody>");
    out.push_str(rows);
    out.push_str("</tbody></table>");
    out
}

fn delimited_to_table(text: &str, delimiter: u8) -> Result<String> {
    // Markdown-style `| a | b |` lines carry outer pipes that are not cells.
    let body: String = if delimiter == b'|' {
        text.lines()
            .map(|l| l.trim().trim_start_matches('|').trim_end_matches('|'))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text.to_string()
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut out = String::from("<table>");
    let mut header_done = false;
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|c| c.is_empty()) || is_rule_line(&record) {
            continue;
        }
        let (open, cell) = if header_done {
            ("<tr>", "td")
        } else {
            ("<thead><tr>", "th")
        };
        out.push_str(open);
        for value in record.iter() {
            out.push_str(&format!("<{cell}>{}</{cell}>", escape(value)));
        }
        if header_done {
            out.push_str("</tr>");
        } else {
            out.push_str("</tr></thead><tbody>");
            header_done = true;
        }
    }
    out.push_str("</tbody></table>");
    Ok(out)
}

// `---|:---:` separator lines from markdown tables.
fn is_rule_line(record: &csv::StringRecord) -> bool {
    record
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':')))
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
