// Plain-text tables for console output

/// Column-aligned table rendered to a string
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    caption: Option<String>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Append a row; short rows are padded, long rows truncated.
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|col| {
                self.rows
                    .iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(self.headers[col].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let upper: Vec<String> = self.headers.iter().map(|h| h.to_uppercase()).collect();
        let rule = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");

        let mut out = Vec::with_capacity(self.rows.len() + 3);
        out.push(line(upper.as_slice()));
        out.push(rule);
        out.extend(self.rows.iter().map(|row| line(row.as_slice())));
        if let Some(caption) = &self.caption {
            out.push(caption.clone());
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_has_headers() {
        let table = Table::new(["Name", "Value"]);
        assert_eq!(table.render(), "NAME | VALUE\n-----+------");
    }

    #[test]
    fn test_columns_align_to_widest_cell() {
        let mut table = Table::new(["Name", "Port"]);
        table.push_row(["edge-listener", "443"]);
        table.push_row(["x", "80"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "NAME          | PORT");
        assert_eq!(lines[2], "edge-listener | 443");
        assert_eq!(lines[3], "x             | 80");
    }

    #[test]
    fn test_short_rows_padded() {
        let mut table = Table::new(["A", "B", "C"]).with_caption("Caption");
        table.push_row(["1"]);
        assert_eq!(table.render().lines().nth(2), Some("1 |   |"));
        assert!(table.render().ends_with("Caption"));
    }
}
