//! Compact terminal renderings of a single delta.

use super::{DeltaReporter, ReportFormat};
use crate::diff::CatalogDelta;
use crate::error::Result;
use unicode_width::UnicodeWidthChar;

/// Apply ANSI color formatting if colored output is enabled.
fn ansi_color(text: &str, color: &str, colored: bool) -> String {
    if colored {
        match color {
            "red" => format!("\x1b[31m{text}\x1b[0m"),
            "green" => format!("\x1b[32m{text}\x1b[0m"),
            "yellow" => format!("\x1b[33m{text}\x1b[0m"),
            "cyan" => format!("\x1b[36m{text}\x1b[0m"),
            "bold" => format!("\x1b[1m{text}\x1b[0m"),
            "dim" => format!("\x1b[2m{text}\x1b[0m"),
            _ => text.to_string(),
        }
    } else {
        text.to_string()
    }
}

const fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}

/// Count summary of one host's delta.
#[derive(Debug, Clone, Copy)]
pub struct DeltaSummaryReporter {
    colored: bool,
}

impl DeltaSummaryReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self { colored: true }
    }

    /// Disable colored output
    #[must_use]
    pub const fn no_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        ansi_color(text, color, self.colored)
    }

    fn change_line(&self, sign: &str, count: usize, color: &str, noun: &str, verb: &str) -> String {
        format!("  {} {noun} {verb}", self.color(&format!("{sign}{count}"), color))
    }
}

impl Default for DeltaSummaryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaReporter for DeltaSummaryReporter {
    fn render(&self, delta: &CatalogDelta) -> Result<String> {
        let s = &delta.summary;
        let mut lines = Vec::new();

        lines.push(self.color(&format!("Catalog Delta: {}", delta.node_name), "bold"));
        lines.push(self.color("─".repeat(40).as_str(), "dim"));
        lines.push(format!(
            "{}  {} → {}",
            self.color("Environments:", "cyan"),
            delta.baseline_env,
            delta.preview_env
        ));
        lines.push(format!(
            "{}  {} → {} resources, {} → {} edges",
            self.color("Size:", "cyan"),
            s.baseline_resource_count,
            s.preview_resource_count,
            s.baseline_edge_count,
            s.preview_edge_count
        ));

        lines.push(String::new());
        lines.push(self.color("Resources:", "bold"));
        let resource_changes = [
            ("+", s.added_resource_count, "green", "added"),
            ("-", s.missing_resource_count, "red", "missing"),
            ("~", s.conflicting_resource_count, "yellow", "conflicting"),
        ];
        for (sign, count, color, verb) in resource_changes {
            if count > 0 {
                lines.push(self.change_line(sign, count, color, plural(count, "resource", "resources"), verb));
            }
        }
        if resource_changes.iter().all(|(_, count, ..)| *count == 0) {
            lines.push(format!("  {}", self.color("No changes", "dim")));
        }

        if s.conflicting_resource_count > 0 {
            lines.push(format!(
                "  {} attributes: {} added, {} missing, {} conflicting, {} equal",
                self.color("in conflicts", "dim"),
                s.added_attribute_count,
                s.missing_attribute_count,
                s.conflicting_attribute_count,
                s.equal_attribute_count
            ));
        }

        if s.added_edge_count > 0 || s.missing_edge_count > 0 {
            lines.push(String::new());
            lines.push(self.color("Edges:", "bold"));
            for (sign, count, color, verb) in [
                ("+", s.added_edge_count, "green", "added"),
                ("-", s.missing_edge_count, "red", "missing"),
            ] {
                if count > 0 {
                    lines.push(self.change_line(sign, count, color, plural(count, "edge", "edges"), verb));
                }
            }
        }

        lines.push(String::new());
        let (verdict, color) = if delta.preview_equal {
            ("equal", "green")
        } else if delta.preview_compliant {
            ("compliant", "yellow")
        } else {
            ("different", "red")
        };
        lines.push(format!("{}  {}", self.color("Preview:", "cyan"), self.color(verdict, color)));
        if !delta.version_equal {
            lines.push(self.color("Catalog versions differ", "dim"));
        }

        Ok(lines.join("\n"))
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Summary
    }
}

/// One finding per line with aligned columns.
#[derive(Debug, Clone, Copy)]
pub struct DeltaTableReporter {
    colored: bool,
}

impl DeltaTableReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self { colored: true }
    }

    /// Disable colored output
    #[must_use]
    pub const fn no_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        ansi_color(text, color, self.colored)
    }

    fn row(&self, status: &str, color: &str, subject: &str, detail: &str) -> String {
        // Pad before coloring so escape codes do not count towards the width
        format!(
            "{} {:<50} {}",
            self.color(&format!("{status:<12}"), color),
            truncate(subject, 50),
            detail
        )
    }
}

impl Default for DeltaTableReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaReporter for DeltaTableReporter {
    fn render(&self, delta: &CatalogDelta) -> Result<String> {
        let mut lines = Vec::new();
        lines.push(format!(
            "{} {:<50} {}",
            self.color(&format!("{:<12}", "STATUS"), "bold"),
            self.color("RESOURCE", "bold"),
            self.color("DETAIL", "bold")
        ));
        lines.push("─".repeat(85));

        for resource in &delta.added_resources {
            let detail = resource.location.as_ref().map(ToString::to_string).unwrap_or_default();
            lines.push(self.row("+ Added", "green", &resource.reference(), &detail));
        }
        for resource in &delta.missing_resources {
            let detail = resource.location.as_ref().map(ToString::to_string).unwrap_or_default();
            lines.push(self.row("- Missing", "red", &resource.reference(), &detail));
        }
        for conflict in &delta.conflicting_resources {
            let (status, color) = if conflict.compliant {
                ("~ Compliant", "yellow")
            } else {
                ("! Conflict", "red")
            };
            let reference = conflict.reference();
            for attribute in &conflict.added_attributes {
                lines.push(self.row(status, color, &reference, &format!("+{} = {}", attribute.name, attribute.value)));
            }
            for attribute in &conflict.missing_attributes {
                lines.push(self.row(status, color, &reference, &format!("-{} = {}", attribute.name, attribute.value)));
            }
            for attribute in &conflict.conflicting_attributes {
                lines.push(self.row(
                    status,
                    color,
                    &reference,
                    &format!(
                        "{}: {} → {}",
                        attribute.name, attribute.baseline_value, attribute.preview_value
                    ),
                ));
            }
        }
        for edge in &delta.added_edges {
            lines.push(self.row("+ Edge", "green", &edge.source, &format!("=> {}", edge.target)));
        }
        for edge in &delta.missing_edges {
            lines.push(self.row("- Edge", "red", &edge.source, &format!("=> {}", edge.target)));
        }

        let s = &delta.summary;
        lines.push(String::new());
        lines.push(format!(
            "Total: {} added, {} missing, {} conflicting resources | Edges: {} added, {} missing",
            s.added_resource_count,
            s.missing_resource_count,
            s.conflicting_resource_count,
            s.added_edge_count,
            s.missing_edge_count
        ));

        Ok(lines.join("\n"))
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Text
    }
}

/// Truncate a string to `max_width` display columns.
fn truncate(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end = 0;
    for (index, ch) in s.char_indices() {
        width += ch.width().unwrap_or(0);
        if width > max_width {
            break;
        }
        end = index + ch.len_utf8();
    }
    if end == s.len() {
        return s.to_string();
    }
    if max_width <= 3 {
        return s[..end].to_string();
    }
    let mut kept = 0;
    let mut cut = 0;
    for (index, ch) in s.char_indices() {
        kept += ch.width().unwrap_or(0);
        if kept > max_width - 3 {
            break;
        }
        cut = index + ch.len_utf8();
    }
    format!("{}...", &s[..cut])
}
