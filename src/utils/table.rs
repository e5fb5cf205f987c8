//! Aligned text tables for the console.

use console::{measure_text_width, pad_str, Alignment};

/// Render rows of cells as left-aligned columns separated by two spaces.
/// Rows may have different lengths; missing cells are left blank.
pub fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| measure_text_width(cell))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(widths.iter())
            .map(|(cell, &width)| pad_str(cell, width, Alignment::Left, None).into_owned())
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_aligned() {
        let rows = vec![
            vec!["stage".to_string(), "efi_var".into(), "overall".into()],
            vec!["firmware".to_string(), "1.2s".into(), "850µs".into()],
        ];
        assert_eq!(
            render_table(&rows),
            "stage     efi_var  overall\n\
             firmware  1.2s     850µs\n"
        );
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(render_table(&[]), "");
    }
}
