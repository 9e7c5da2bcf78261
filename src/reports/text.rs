//! Indented text rendering of [`ReportData`].

use super::aggregate::{AttributeRow, LogRow, ReportData, ResourceRow, Stats};
use crate::error::Result;
use crate::overview::Severity;
use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

const INDENT: &str = "  ";

/// Render `data` as indented, human-readable text.
pub fn render(data: &ReportData) -> Result<String> {
    let mut out = String::new();
    render_stats(&mut out, &data.stats)?;
    render_top(&mut out, data)?;

    if !data.changes.resource_type_changes.is_empty() {
        writeln!(out)?;
        writeln!(out, "Resource changes:")?;
        for (type_name, kinds) in &data.changes.resource_type_changes {
            writeln!(out, "{INDENT}{type_name}")?;
            for (kind, titles) in kinds {
                writeln!(out, "{INDENT}{INDENT}{kind}")?;
                for rows in titles.values() {
                    for row in rows {
                        render_resource(&mut out, row, 3)?;
                    }
                }
            }
        }
    }

    if !data.changes.edge_changes.is_empty() {
        writeln!(out)?;
        writeln!(out, "Edge changes:")?;
        for (kind, rows) in &data.changes.edge_changes {
            writeln!(out, "{INDENT}{kind}")?;
            for row in rows {
                writeln!(out, "{INDENT}{INDENT}{} => {}", row.source, row.target)?;
                writeln!(out, "{INDENT}{INDENT}{INDENT}nodes: {}", row.nodes.join(", "))?;
            }
        }
    }

    if let Some(errors) = &data.compilation_errors {
        for (side, rows) in [("baseline", &errors.baseline), ("preview", &errors.preview)] {
            if rows.is_empty() {
                continue;
            }
            writeln!(out)?;
            writeln!(out, "Compilation errors ({side}):")?;
            for row in rows {
                render_log(&mut out, row)?;
            }
        }
    }

    Ok(out)
}

/// Render only the node statistics and the nodes with the most issues.
pub fn render_summary(data: &ReportData) -> Result<String> {
    let mut out = String::new();
    render_stats(&mut out, &data.stats)?;
    render_top(&mut out, data)?;
    Ok(out)
}

fn render_top(out: &mut String, data: &ReportData) -> Result<()> {
    if data.top_ten.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "Nodes with the most issues:")?;
    let width = data
        .top_ten
        .iter()
        .map(|rank| rank.name.width())
        .max()
        .unwrap_or_default();
    for rank in &data.top_ten {
        writeln!(
            out,
            "{INDENT}{}  {:>4} issue(s)  {} ({})",
            pad(&rank.name, width),
            rank.issue_count,
            rank.severity,
            rank.timestamp
        )?;
    }
    Ok(())
}

fn render_stats(out: &mut String, stats: &Stats) -> Result<()> {
    writeln!(out, "Nodes: {}", stats.node_count)?;
    let width = Severity::ALL
        .iter()
        .map(|s| s.as_str().width())
        .max()
        .unwrap_or_default();
    for severity in Severity::ALL {
        let bucket = stats.bucket(severity);
        writeln!(
            out,
            "{INDENT}{}  {:>6}  {:>6.2}%",
            pad(severity.as_str(), width),
            bucket.count,
            bucket.percentage
        )?;
    }
    Ok(())
}

fn render_resource(out: &mut String, row: &ResourceRow, depth: usize) -> Result<()> {
    let indent = INDENT.repeat(depth);
    write!(out, "{indent}{}", row.title)?;
    match (&row.location, &row.preview_location) {
        (Some(baseline), Some(preview)) if baseline != preview => {
            write!(out, " ({baseline} -> {preview})")?;
        }
        (Some(location), _) | (None, Some(location)) => write!(out, " ({location})")?,
        (None, None) => {}
    }
    writeln!(out)?;
    writeln!(out, "{indent}{INDENT}nodes: {}", row.nodes.join(", "))?;
    for attribute in &row.attributes {
        let line = match attribute {
            AttributeRow::Added { name, value } => format!("+ {name} = {value}"),
            AttributeRow::Missing { name, value } => format!("- {name} = {value}"),
            AttributeRow::Conflicting {
                name,
                baseline_value,
                preview_value,
                compliant,
            } => {
                let marker = if *compliant { "~" } else { "!" };
                format!("{marker} {name}: {baseline_value} -> {preview_value}")
            }
        };
        writeln!(out, "{indent}{INDENT}{line}")?;
    }
    Ok(())
}

fn render_log(out: &mut String, row: &LogRow) -> Result<()> {
    let mut head = format!("{INDENT}[{}]", row.level);
    if let Some(issue) = &row.issue {
        write!(head, " {issue}")?;
    }
    match (&row.file, row.line) {
        (Some(file), Some(line)) => write!(head, " at {file}:{line}")?,
        (Some(file), None) => write!(head, " at {file}")?,
        _ => {}
    }
    writeln!(out, "{head}")?;
    writeln!(out, "{INDENT}{INDENT}{}", row.message)?;
    writeln!(out, "{INDENT}{INDENT}nodes: {}", row.nodes.join(", "))?;
    Ok(())
}

/// Left-align `text` to `width` display columns.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::aggregate::{
        Bucket, Changes, CompilationErrors, EdgeRow, NodeRank, ReportData,
    };
    use serde_json::json;

    fn data() -> ReportData {
        let mut changes = Changes::default();
        changes
            .resource_type_changes
            .entry("File".to_string())
            .or_default()
            .entry("conflicting_resources".to_string())
            .or_default()
            .insert(
                "/etc/motd".to_string(),
                vec![ResourceRow {
                    title: "/etc/motd".to_string(),
                    location: Some(crate::diff::Location::new("site.pp", 3)),
                    preview_location: Some(crate::diff::Location::new("site.pp", 3)),
                    nodes: vec!["web01".to_string(), "web02".to_string()],
                    attributes: vec![AttributeRow::Conflicting {
                        name: "content".to_string(),
                        baseline_value: json!("hi"),
                        preview_value: json!("hello"),
                        compliant: false,
                    }],
                }],
            );
        changes.edge_changes.insert(
            "missing_edges".to_string(),
            vec![EdgeRow {
                source: "Class[Motd]".to_string(),
                target: "File[/etc/motd]".to_string(),
                nodes: vec!["web01".to_string()],
            }],
        );
        ReportData {
            stats: Stats {
                node_count: 3,
                different: Bucket {
                    count: 2,
                    percentage: 66.67,
                },
                preview_failed: Bucket {
                    count: 1,
                    percentage: 33.33,
                },
                ..Stats::default()
            },
            top_ten: vec![NodeRank {
                name: "web01".to_string(),
                timestamp: "2024-05-01T00:00:00.000000000Z".to_string(),
                severity: Severity::Different,
                issue_count: 2,
            }],
            changes,
            compilation_errors: Some(CompilationErrors {
                baseline: Vec::new(),
                preview: vec![LogRow {
                    issue: Some("UNKNOWN_FUNCTION".to_string()),
                    file: Some("site.pp".to_string()),
                    line: Some(7),
                    level: "err".to_string(),
                    message: "Unknown function 'frob'".to_string(),
                    nodes: vec!["db01".to_string()],
                }],
            }),
        }
    }

    #[test]
    fn test_render_sections() {
        let text = render(&data()).unwrap();
        assert!(text.starts_with("Nodes: 3\n"));
        assert!(text
            .lines()
            .any(|line| line.trim_start().starts_with("different") && line.ends_with("66.67%")));
        assert!(text.contains("Resource changes:"));
        assert!(text.contains("/etc/motd (site.pp:3)"));
        assert!(text.contains("nodes: web01, web02"));
        assert!(text.contains("! content: \"hi\" -> \"hello\""));
        assert!(text.contains("Class[Motd] => File[/etc/motd]"));
        assert!(text.contains("Compilation errors (preview):"));
        assert!(text.contains("[err] UNKNOWN_FUNCTION at site.pp:7"));
        assert!(!text.contains("Compilation errors (baseline):"));
    }

    #[test]
    fn test_summary_stops_after_top_nodes() {
        let text = render_summary(&data()).unwrap();
        assert!(text.contains("Nodes with the most issues:"));
        assert!(text.contains("web01     2 issue(s)  different"));
        assert!(!text.contains("Resource changes:"));
    }

    #[test]
    fn test_pad_uses_display_width() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("日本", 5), "日本 ");
        assert_eq!(pad("toolong", 3), "toolong");
    }
}
