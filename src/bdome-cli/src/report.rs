//! Plain-text tables and number formatting for reports

use anyhow::{bail, Result};

/// An aligned, boxed text table
#[derive(Debug, Clone, Default)]
pub struct Table {
    name: Option<String>,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    last_row_distinct: bool,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn named<I, S>(name: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Some(name.into()),
            ..Self::new(headers)
        }
    }

    /// Set the last row apart with a rule, for totals
    pub fn with_distinct_last_row(mut self) -> Self {
        self.last_row_distinct = true;
        self
    }

    pub fn add_row<I, S>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        if row.len() != self.headers.len() {
            bail!(
                "Row has {} cells but the table has {} columns",
                row.len(),
                self.headers.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[i].chars().count())
                    .fold(header.chars().count(), usize::max)
            })
            .collect()
    }

    fn render_row(widths: &[usize], cells: &[String]) -> String {
        let mut line: String = cells
            .iter()
            .zip(widths)
            .map(|(cell, &width)| format!("| {:<width$} ", cell))
            .collect();
        line.push('|');
        line
    }

    fn rule(widths: &[usize]) -> String {
        let mut line: String = widths
            .iter()
            .map(|w| format!("|{}", "=".repeat(w + 2)))
            .collect();
        line.push('|');
        line
    }

    fn name_rule(widths: &[usize]) -> String {
        let inner = widths.iter().map(|w| w + 2).sum::<usize>() + widths.len().saturating_sub(1);
        format!("|{}|", "=".repeat(inner))
    }

    /// Rendered lines, without trailing newlines
    pub fn lines(&self) -> Vec<String> {
        let widths = self.widths();
        let rule = Self::rule(&widths);
        let mut lines = Vec::with_capacity(self.rows.len() + 6);

        if let Some(name) = &self.name {
            let name_rule = Self::name_rule(&widths);
            let inner = name_rule.chars().count() - 2;
            let padding = inner.saturating_sub(name.chars().count());
            let left = padding / 2;
            lines.push(name_rule);
            lines.push(format!(
                "|{}{}{}|",
                " ".repeat(left),
                name,
                " ".repeat(padding - left)
            ));
        }

        lines.push(rule.clone());
        lines.push(Self::render_row(&widths, &self.headers));
        lines.push(rule.clone());
        for (i, row) in self.rows.iter().enumerate() {
            if self.last_row_distinct && i + 1 == self.rows.len() {
                lines.push(rule.clone());
            }
            lines.push(Self::render_row(&widths, row));
        }
        lines.push(rule);
        lines
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Two tables next to each other, `gap` apart; the shorter one is padded
pub fn side_by_side(left: &Table, right: &Table, gap: &str) -> Vec<String> {
    let left_lines = left.lines();
    let right_lines = right.lines();
    let left_width = left_lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);

    let rows = left_lines.len().max(right_lines.len());
    (0..rows)
        .map(|i| {
            let l = left_lines.get(i).map_or("", String::as_str);
            let r = right_lines.get(i).map_or("", String::as_str);
            format!("{:<left_width$}{}{}", l, gap, r).trim_end().to_string()
        })
        .collect()
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

fn format_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (formatted.as_str(), None),
    };
    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, group_thousands(whole), fraction),
        None => format!("{}{}", sign, group_thousands(whole)),
    }
}

/// Whole number with thousands separators: `1234567.8` -> `1,234,568`
pub fn format_float(value: f64) -> String {
    format_fixed(value, 0)
}

/// Fraction as a percentage to two decimals, without the `%` sign
pub fn format_percentage(value: f64) -> String {
    format_fixed(value * 100.0, 2)
}

pub fn format_np(value: f64) -> String {
    format!("{} NP", format_float(value))
}

/// `[lo, hi]`, or the single value when both ends agree
pub fn format_float_range(lo: f64, hi: f64) -> String {
    if lo == hi {
        return format_float(lo);
    }
    format!("[{}, {}]", format_float(lo), format_float(hi))
}

pub fn format_percentage_range(lo: f64, hi: f64) -> String {
    if lo == hi {
        return format_percentage(lo);
    }
    format!("[{}, {}]", format_percentage(lo), format_percentage(hi))
}

/// `mean ∈ [lo, hi] NP`
pub fn format_np_interval(mean: f64, (lo, hi): (f64, f64)) -> String {
    format!("{} ∈ {} NP", format_float(mean), format_float_range(lo, hi))
}

/// `rate ∈ [lo, hi]%`
pub fn format_rate_interval(rate: f64, (lo, hi): (f64, f64)) -> String {
    format!(
        "{} ∈ {}%",
        format_percentage(rate),
        format_percentage_range(lo, hi)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(999.4), "999");
        assert_eq!(format_float(1_000.0), "1,000");
        assert_eq!(format_float(1_234_567.8), "1,234,568");
        assert_eq!(format_float(-12_345.0), "-12,345");
        assert_eq!(format_float(-0.2), "0");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.5), "50.00");
        assert_eq!(format_percentage(0.123_456), "12.35");
        assert_eq!(format_percentage(12.5), "1,250.00");
        assert_eq!(format_percentage(0.0), "0.00");
    }

    #[test]
    fn test_ranges_collapse() {
        assert_eq!(format_float_range(5.0, 5.0), "5");
        assert_eq!(format_float_range(1_000.0, 2_500.0), "[1,000, 2,500]");
        assert_eq!(format_percentage_range(0.0, 0.0), "0.00");
        assert_eq!(format_percentage_range(0.01, 0.2), "[1.00, 20.00]");
        assert_eq!(
            format_np_interval(15_000.0, (12_000.0, 18_000.0)),
            "15,000 ∈ [12,000, 18,000] NP"
        );
        assert_eq!(format_rate_interval(0.1, (0.1, 0.1)), "10.00 ∈ 10.00%");
    }

    #[test]
    fn test_table_layout() {
        let mut table = Table::named("Profit", ["Type", "Value"]).with_distinct_last_row();
        table.add_row(["Predicted", "10 NP"]).unwrap();
        table.add_row(["Difference", "-2 NP"]).unwrap();

        assert_eq!(
            table.lines(),
            vec![
                "|====================|",
                "|       Profit       |",
                "|============|=======|",
                "| Type       | Value |",
                "|============|=======|",
                "| Predicted  | 10 NP |",
                "|============|=======|",
                "| Difference | -2 NP |",
                "|============|=======|",
            ]
        );
    }

    #[test]
    fn test_row_length_mismatch() {
        let mut table = Table::new(["a", "b"]);
        assert!(table.add_row(["only one"]).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_unicode_width() {
        let mut table = Table::new(["Rate"]);
        table.add_row(["1 ∈ [0, 2]%"]).unwrap();
        let lines = table.lines();
        assert!(lines
            .iter()
            .all(|l| l.chars().count() == lines[0].chars().count()));
    }

    #[test]
    fn test_side_by_side_pads_shorter_table() {
        let mut left = Table::new(["L"]);
        left.add_row(["a"]).unwrap();
        left.add_row(["b"]).unwrap();
        let mut right = Table::new(["Right"]);
        right.add_row(["x"]).unwrap();

        let lines = side_by_side(&left, &right, "  ");
        assert_eq!(lines.len(), left.lines().len());
        assert_eq!(lines[0], "|===|  |=======|");
        assert_eq!(lines[1], "| L |  | Right |");
        assert_eq!(lines[3], "| a |  | x     |");
        assert_eq!(lines[4], "| b |  |=======|");
        assert_eq!(lines[5], "|===|");
    }
}
