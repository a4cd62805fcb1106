use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of the first `max_rows` rows, or a placeholder line.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no data)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyMetricRow;

    #[test]
    fn renders_markdown_and_placeholder() {
        let rows = vec![
            KeyMetricRow { metric: "Avg Price".into(), value: "N/A".into(), change: String::new() },
            KeyMetricRow { metric: "Total".into(), value: "0".into(), change: String::new() },
        ];
        let table = render_table(&rows, 1);
        assert!(table.contains("| Metric"));
        assert!(table.contains("Avg Price"));
        assert!(!table.contains("Total"));
        assert_eq!(render_table::<KeyMetricRow>(&[], 5), "(no data)");
    }

    #[test]
    fn writes_csv_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let rows = vec![KeyMetricRow {
            metric: "Count".into(),
            value: "1,234".into(),
            change: "+12".into(),
        }];
        write_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "metric,value,change\nCount,\"1,234\",+12\n");
    }
}
