//! Plain-text table output

use std::io::{self, Write};

/// Left-aligned columns separated by two spaces, header first
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
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
        }
    }

    /// Append a row; missing cells render empty, extra cells are dropped
    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                self.rows
                    .iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_line(writer, &self.headers, &widths)?;
        for row in &self.rows {
            write_line(writer, row, &widths)?;
        }
        Ok(())
    }
}

fn write_line(writer: &mut dyn Write, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let mut line = String::new();
    for (col, cell) in cells.iter().enumerate() {
        if col + 1 == cells.len() {
            line.push_str(cell);
        } else {
            let pad = widths[col].saturating_sub(cell.chars().count());
            line.push_str(cell);
            line.push_str(&" ".repeat(pad + 2));
        }
    }
    writeln!(writer, "{}", line.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(table: &Table) -> String {
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_columns_align_to_widest_cell() {
        let mut table = Table::new(["Service", "Plan", "Description"]);
        table.row(["postgresql", "small", "1 GB"]);
        table.row(["redis", "tiny", ""]);

        assert_eq!(
            render(&table),
            "Service     Plan   Description\n\
             postgresql  small  1 GB\n\
             redis       tiny\n"
        );
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = Table::new(["A", "B"]);
        table.row(["x"]);
        assert_eq!(render(&table), "A  B\nx\n");
    }
}
