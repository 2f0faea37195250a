use std::time::Duration;

use crate::models::ParseIssue;

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// One line per issue: `row 3 [sale_price] Invalid ... ("abc")`
pub fn issue(issue: &ParseIssue) -> String {
    let mut line = format!("row {}", issue.row);
    if let Some(field) = issue.field {
        line.push_str(&format!(" [{field}]"));
    }
    line.push(' ');
    line.push_str(&issue.message);
    if let Some(value) = &issue.value {
        line.push_str(&format!(" ({value:?})"));
    }
    line
}

pub fn elapsed(d: Duration) -> String {
    if d.as_millis() > 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{}µs", d.as_micros())
    }
}
