//! Navigation and per-node extraction over a merged fleet overview.

use catalog_delta::{
    pipeline, CompileLogEntry, DeltaContext, DeltaEngine, EntityKind, Factory, NodeExtractor,
    Overview, Query, Severity,
};
use chrono::{TimeZone, Utc};
use std::path::Path;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fleet() -> Overview {
    let baseline = pipeline::load_catalog(&Path::new(FIXTURES_DIR).join("baseline.json")).unwrap();
    let preview = pipeline::load_catalog(&Path::new(FIXTURES_DIR).join("preview.json")).unwrap();
    let engine = DeltaEngine::new();

    let mut factory = Factory::new();
    for (node, hour) in [("web01", 1), ("web02", 1), ("web01", 2)] {
        let context =
            DeltaContext::new(node).at(Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap());
        factory
            .merge(&engine.compare(&baseline, &preview, &context).unwrap())
            .unwrap();
    }
    factory
        .merge_failure(
            "db01",
            "production",
            Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap(),
            Severity::BaselineFailed.exit_code(),
            &[CompileLogEntry::new("err", "Syntax error at '}'")
                .with_issue("SYNTAX_ERROR")
                .at("site.pp", 40)],
        )
        .unwrap();
    factory.create_overview()
}

#[test]
fn test_latest_node_picks_newest_run() {
    let overview = fleet();
    let query = Query::new(&overview);
    assert_eq!(query.nodes_named("web01").len(), 2);

    let latest = query.latest_node("web01").unwrap();
    let timestamp = latest.field("timestamp").unwrap();
    assert!(timestamp.as_str().unwrap().starts_with("2024-05-01T02:00:00"));
    assert_eq!(latest.field("severity").unwrap(), "different");
}

#[test]
fn test_node_to_environments() {
    let overview = fleet();
    let query = Query::new(&overview);
    let node = query.latest_node("web02").unwrap();
    assert_eq!(
        node.one("baseline_environment").and_then(|e| e.label()),
        Some("production")
    );
    assert_eq!(
        node.one("preview_environment").and_then(|e| e.label()),
        Some("future")
    );

    let production = query
        .all(EntityKind::Environment)
        .filter(|e| e.label() == Some("production"))
        .first()
        .unwrap();
    // three compared runs plus the failed baseline of db01
    assert_eq!(production.many("compilations").len(), 4);
}

#[test]
fn test_issue_to_nodes_and_back() {
    let overview = fleet();
    let query = Query::new(&overview);
    let missing = query.all(EntityKind::ResourceMissing).first().unwrap();
    assert_eq!(missing.one("resource").and_then(|r| r.label()), Some("telnet"));
    assert_eq!(
        missing.one("resource_type").and_then(|t| t.label()),
        Some("Package")
    );

    let mut nodes = missing.many("nodes").labels();
    nodes.sort_unstable();
    assert_eq!(nodes, ["web01", "web01", "web02"]);

    let node = query.latest_node("web02").unwrap();
    assert!(node.many("issues").ids().contains(&missing.id()));
}

#[test]
fn test_conflict_attribute_issues() {
    let overview = fleet();
    let query = Query::new(&overview);
    let conflicts = query.all(EntityKind::ResourceConflict);
    assert_eq!(conflicts.len(), 2);

    let mut names = conflicts
        .navigate("attribute_issues")
        .navigate("attribute")
        .labels();
    names.sort_unstable();
    assert_eq!(names, ["content", "hasrestart"]);

    let attribute_issues = query.all_of(&[
        EntityKind::AttributeAdded,
        EntityKind::AttributeMissing,
        EntityKind::AttributeConflict,
    ]);
    assert_eq!(attribute_issues.len(), 2);
}

#[test]
fn test_edges_navigate_to_resources() {
    let overview = fleet();
    let query = Query::new(&overview);
    let added = query.all(EntityKind::EdgeAdded).first().unwrap();
    assert_eq!(added.one("source").and_then(|r| r.label()), Some("Main"));
    assert_eq!(added.one("target").and_then(|r| r.label()), Some("htop"));
}

#[test]
fn test_failed_node_log_entries() {
    let overview = fleet();
    let query = Query::new(&overview);
    let db = query.latest_node("db01").unwrap();
    assert!(db.many("issues").is_empty());
    assert!(db.one("preview_compilation").is_none());

    let entry = db.many("log_entries").first().unwrap();
    assert_eq!(entry.one("issue").and_then(|i| i.label()), Some("SYNTAX_ERROR"));
    let file = entry.one("location").and_then(|l| l.one("file"));
    assert_eq!(file.and_then(|f| f.label()), Some("site.pp"));
}

#[test]
fn test_extract_single_node() {
    let overview = fleet();
    let query = Query::new(&overview);
    let id = query.latest_node("web02").unwrap().id();

    let mut extractor = NodeExtractor::new(&overview);
    extractor.add_node(id).unwrap();
    let extracted = extractor.overview();

    assert_eq!(extracted.count_of(EntityKind::Node), 1);
    assert_eq!(extracted.count_of(EntityKind::IssueOnNode), 6);
    assert_eq!(extracted.count_of(EntityKind::LogEntry), 0);

    // the subset is closed under references and survives the wire format
    let restored = Overview::from_json(&extracted.to_json().unwrap()).unwrap();
    assert_eq!(restored.len(), extracted.len());
    let node = Query::new(&restored).latest_node("web02").unwrap();
    assert_eq!(node.many("issues").len(), 6);
}

#[test]
fn test_extract_unknown_node_fails() {
    let overview = fleet();
    let mut extractor = NodeExtractor::new(&overview);
    assert!(extractor.add_node(999_999).is_err());
}
