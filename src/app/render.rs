//! Table and document rendering of sorted report rows.
//!
//! Text and markdown output go through the same cell grid, so column merging
//! and column removal behave identically in both. JSON and YAML serialize
//! whole row objects and only honor column removal.

use crate::app::describer::report::ReportRow;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Markdown,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "markdown" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => bail!("invalid output format: {}: valid values: text|markdown|json|yaml", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub header: bool,
    /// Columns whose repeated values are blanked, by header name.
    pub merge: Vec<String>,
    /// Columns dropped from the output, by header name.
    pub ignore: Vec<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            header: true,
            merge: Vec::new(),
            ignore: Vec::new(),
        }
    }
}

fn column_indexes(headers: &[&str], names: &[String], flag: &str) -> Result<Vec<usize>> {
    names
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(name))
                .with_context(|| format!("{} {}: no such column, valid columns: {}", flag, name, headers.join("|")))
        })
        .collect()
}

pub fn render<R: ReportRow>(rows: &[R], options: &RenderOptions) -> Result<String> {
    let headers = R::headers();
    let ignored = column_indexes(headers, &options.ignore, "--ignore")?;
    let merged = column_indexes(headers, &options.merge, "--merge")?;
    match options.format {
        OutputFormat::Json | OutputFormat::Yaml => render_document(rows, options.format, headers, &ignored),
        OutputFormat::Text | OutputFormat::Markdown => {
            let grid = Grid::new(rows, headers, &ignored, &merged);
            Ok(match options.format {
                OutputFormat::Markdown => grid.markdown(options.header),
                _ => grid.text(options.header),
            })
        }
    }
}

fn render_document<R: ReportRow>(rows: &[R], format: OutputFormat, headers: &[&str], ignored: &[usize]) -> Result<String> {
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let mut value = serde_json::to_value(row).context("cannot serialize row")?;
        if let Some(object) = value.as_object_mut() {
            for &index in ignored {
                object.remove(headers[index]);
            }
        }
        values.push(value);
    }
    let mut rendered = if format == OutputFormat::Json {
        serde_json::to_string_pretty(&values).context("cannot render json")?
    } else {
        serde_yaml::to_string(&values).context("cannot render yaml")?
    };
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Visible columns and their cells after merging.
struct Grid {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Grid {
    fn new<R: ReportRow>(rows: &[R], headers: &[&str], ignored: &[usize], merged: &[usize]) -> Self {
        let raw: Vec<Vec<String>> = rows.iter().map(ReportRow::cells).collect();
        let mut cells = raw.clone();
        let mut merge_order: Vec<usize> = merged.to_vec();
        merge_order.sort_unstable();
        merge_order.dedup();
        for row in 1..raw.len() {
            for &column in &merge_order {
                if raw[row][column] != raw[row - 1][column] {
                    break;
                }
                cells[row][column].clear();
            }
        }

        let visible: Vec<usize> = (0..headers.len()).filter(|i| !ignored.contains(i)).collect();
        let pick = |row: &[String]| visible.iter().map(|&i| row[i].clone()).collect::<Vec<_>>();
        Self {
            headers: visible.iter().map(|&i| headers[i].to_string()).collect(),
            rows: cells.iter().map(|row| pick(row.as_slice())).collect(),
        }
    }

    fn widths(&self, header: bool) -> Vec<usize> {
        let mut widths = vec![0; self.headers.len()];
        let lines = header.then_some(&self.headers).into_iter().chain(self.rows.iter());
        for row in lines {
            for (width, cell) in widths.iter_mut().zip(row) {
                let longest = cell.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                *width = (*width).max(longest);
            }
        }
        widths
    }

    fn text(&self, header: bool) -> String {
        let widths = self.widths(header);
        let mut out = String::new();
        if header {
            push_text_row(&mut out, &self.headers, &widths);
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            push_text_row(&mut out, &rule, &widths);
        }
        for row in &self.rows {
            push_text_row(&mut out, row, &widths);
        }
        out
    }

    fn markdown(&self, header: bool) -> String {
        let mut out = String::new();
        let line = |cells: Vec<String>| format!("| {} |\n", cells.join(" | "));
        if header {
            out.push_str(&line(self.headers.iter().map(|h| escape_markdown(h)).collect()));
            out.push_str(&line(self.headers.iter().map(|_| "---".to_string()).collect()));
        }
        for row in &self.rows {
            out.push_str(&line(row.iter().map(|c| escape_markdown(c)).collect()));
        }
        out
    }
}

fn escape_markdown(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', "<br>")
}

/// One logical row; multi-line cells (policy documents) span several lines.
fn push_text_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let split: Vec<Vec<&str>> = cells.iter().map(|c| c.lines().collect()).collect();
    let height = split.iter().map(Vec::len).max().unwrap_or(0).max(1);
    for line in 0..height {
        let parts: Vec<String> = split
            .iter()
            .zip(widths)
            .map(|(lines, width)| format!("{:<width$}", lines.get(line).copied().unwrap_or(""), width = *width))
            .collect();
        out.push_str(parts.join("  ").trim_end());
        out.push('\n');
    }
}
