//! Text rendering for already-parsed cart and report data.
//!
//! Nothing here interprets the data: tables take pre-computed cells, and
//! the tree inspector walks any JSON value, collapsing nodes below a depth.

use std::fmt::Write;

use serde_json::Value;

/// Renders a left-aligned table with a header rule.
///
/// Columns are padded to their widest cell; rows shorter than the header
/// are padded with empty cells.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let columns = headers.len().max(rows.iter().map(Vec::len).max().unwrap_or(0));
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(headers).chain(rows.iter().map(Vec::as_slice)) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let mut out = String::new();
        for (i, width) in widths.iter().enumerate() {
            let cell = cells.get(i).map_or("", String::as_str);
            if i > 0 {
                out.push_str("  ");
            }
            let _ = write!(out, "{cell:<width$}");
        }
        out.trim_end().to_string()
    };

    let mut out = line(headers);
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * columns.saturating_sub(1)));
    for row in rows {
        out.push('\n');
        out.push_str(&line(row));
    }
    out
}

/// Renders `value` as an indented tree.
///
/// Containers nested deeper than `expand_depth` are collapsed to a one-line
/// summary (`{…} (3 keys)`, `[…] (2 items)`). Depth 0 is the root.
pub fn render_tree(value: &Value, expand_depth: usize) -> String {
    let mut out = String::new();
    write_node(&mut out, None, value, 0, expand_depth);
    out.truncate(out.trim_end().len());
    out
}

fn write_node(out: &mut String, label: Option<&str>, value: &Value, depth: usize, expand: usize) {
    let indent = "  ".repeat(depth);
    let prefix = label.map(|l| format!("{l}: ")).unwrap_or_default();
    match value {
        Value::Object(map) if depth >= expand && !map.is_empty() => {
            let _ = writeln!(out, "{indent}{prefix}{{…}} ({} keys)", map.len());
        }
        Value::Array(items) if depth >= expand && !items.is_empty() => {
            let _ = writeln!(out, "{indent}{prefix}[…] ({} items)", items.len());
        }
        Value::Object(map) if !map.is_empty() => {
            let _ = writeln!(out, "{indent}{prefix}{{");
            for (key, child) in map {
                write_node(out, Some(key), child, depth + 1, expand);
            }
            let _ = writeln!(out, "{indent}}}");
        }
        Value::Array(items) if !items.is_empty() => {
            let _ = writeln!(out, "{indent}{prefix}[");
            for (i, child) in items.iter().enumerate() {
                write_node(out, Some(&i.to_string()), child, depth + 1, expand);
            }
            let _ = writeln!(out, "{indent}]");
        }
        leaf => {
            let _ = writeln!(out, "{indent}{prefix}{leaf}");
        }
    }
}

/// Pretty-printed JSON; falls back to compact output.
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Formats a money amount with two decimals and an optional currency.
pub fn format_amount(amount: f64, currency: Option<&str>) -> String {
    match currency.filter(|c| !c.is_empty()) {
        Some(currency) => format!("{amount:.2} {currency}"),
        None => format!("{amount:.2}"),
    }
}
