//! Fixed-width markdown tables.

use crate::template::value::Value;

/// Two-column table from key/value pairs.
pub fn hash_table(rows: &[(String, Value)], key_name: &str, value_name: &str) -> String {
    let key_width = rows
        .iter()
        .map(|(k, _)| width(k))
        .max()
        .unwrap_or(0)
        .max(width(key_name) + 1);
    let value_width = rows
        .iter()
        .map(|(_, v)| width(&v.to_display()))
        .max()
        .unwrap_or(0)
        .max(width(value_name) + 1);

    let header = table_header(&[
        (key_name.to_string(), key_width + 2),
        (value_name.to_string(), value_width + 2),
    ]);
    let body: Vec<String> = rows
        .iter()
        .map(|(k, v)| {
            format!(
                "| {} | {}|",
                ljust(k, key_width),
                ljust(&v.to_display(), value_width)
            )
        })
        .collect();
    [header, body.join("\n")].join("\n")
}

/// Single-column table.
pub fn array_table(items: &[Value], key_name: &str) -> String {
    let key_width = items
        .iter()
        .map(|v| width(&v.to_display()))
        .max()
        .unwrap_or(0)
        .max(width(key_name) + 1);
    let header = table_header(&[(key_name.to_string(), key_width + 3)]);
    let body: Vec<String> = items
        .iter()
        .map(|v| format!("| {} |", ljust(&v.to_display(), key_width)))
        .collect();
    [header, body.join("\n")].join("\n")
}

/// Header row plus separator bar. Each column is `(title, padded width)`.
pub fn table_header(columns: &[(String, usize)]) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|(title, pad)| format!(" {}", ljust(title, pad.saturating_sub(1))))
        .collect();
    let bar: Vec<String> = parts.iter().map(|p| "-".repeat(width(p))).collect();
    let mut bar = bar.join("|");
    let mut header = parts.join("|");
    close_row(&mut bar);
    close_row(&mut header);
    format!("|{}\n|{}", header, bar)
}

fn close_row(row: &mut String) {
    if row.pop().is_some() {
        row.push('|');
    }
}

fn width(text: &str) -> usize {
    text.chars().count()
}

fn ljust(text: &str, to: usize) -> String {
    let pad = to.saturating_sub(width(text));
    format!("{}{}", text, " ".repeat(pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hash_table_layout() {
        let rows = vec![
            ("one".to_string(), Value::str("one")),
            ("two".to_string(), Value::str("two")),
        ];
        assert_eq!(
            hash_table(&rows, "something", "hey"),
            "| something  | hey |\n\
             |------------|-----|\n\
             | one        | one |\n\
             | two        | two |"
        );
    }

    #[test]
    fn nil_values_render_blank() {
        let rows = vec![
            ("one".to_string(), Value::str("one")),
            ("two".to_string(), Value::Nil),
        ];
        assert_eq!(
            hash_table(&rows, "something", "hey"),
            "| something  | hey |\n\
             |------------|-----|\n\
             | one        | one |\n\
             | two        |     |"
        );
    }

    #[test]
    fn array_table_layout() {
        let items = vec![Value::str("alpha"), Value::str("be")];
        assert_eq!(
            array_table(&items, "name"),
            "| name  |\n\
             |-------|\n\
             | alpha |\n\
             | be    |"
        );
    }

    #[test]
    fn header_closes_last_column() {
        assert_eq!(table_header(&[("key".to_string(), 5)]), "| key|\n|----|");
    }
}
