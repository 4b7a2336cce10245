use crate::error::Result;
use rusqlite::Connection;
use rusqlite::types::Value;
use std::path::Path;

/// Run `sql` against a snapshot and print the rows tab-separated
pub fn run(file: &Path, sql: &str) -> Result<()> {
    let (header, rows) = execute(file, sql)?;
    println!("{}", header.join("\t"));
    for row in rows {
        println!("{}", row.join("\t"));
    }
    Ok(())
}

/// Column names and formatted rows of `sql`
pub fn execute(file: &Path, sql: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let conn = Connection::open(file)?;
    let mut stmt = conn.prepare(sql)?;

    let column_count = stmt.column_count();
    let header: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let mut out = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let values = (0..column_count)
            .map(|i| {
                row.get::<_, Value>(i)
                    .map(|v| format_value(&v))
                    .unwrap_or_else(|_| "NULL".to_string())
            })
            .collect();
        out.push(values);
    }

    Ok((header, out))
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => format!("{:.6}", f),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}
