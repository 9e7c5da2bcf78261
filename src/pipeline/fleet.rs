//! Parallel comparison of many hosts merged into one factory.

use super::parse::{load_catalog, load_compile_log};
use crate::diff::{DeltaContext, DeltaEngine};
use crate::error::{ErrorContext, PreviewError, Result};
use crate::model::Catalog;
use crate::overview::{CompileLogEntry, Factory, Id};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// File names looked up inside a host directory.
pub const BASELINE_FILE: &str = "baseline.json";
pub const PREVIEW_FILE: &str = "preview.json";
pub const BASELINE_LOG_FILE: &str = "baseline_log.json";
pub const PREVIEW_LOG_FILE: &str = "preview_log.json";

/// What was produced for one host.
#[derive(Debug, Clone)]
pub enum HostInput {
    /// Both catalogs compiled
    Catalogs {
        baseline: Box<Catalog>,
        preview: Box<Catalog>,
        baseline_path: Option<String>,
        preview_path: Option<String>,
    },
    /// One compilation failed; `exit_code` is 2 for the baseline, 3 for the preview
    Failure {
        environment: String,
        exit_code: i32,
        log: Vec<CompileLogEntry>,
    },
}

/// One host to compare.
#[derive(Debug, Clone)]
pub struct HostJob {
    pub node: String,
    pub timestamp: DateTime<Utc>,
    pub input: HostInput,
}

impl HostJob {
    pub fn compared(node: impl Into<String>, baseline: Catalog, preview: Catalog) -> Self {
        Self {
            node: node.into(),
            timestamp: Utc::now(),
            input: HostInput::Catalogs {
                baseline: Box::new(baseline),
                preview: Box::new(preview),
                baseline_path: None,
                preview_path: None,
            },
        }
    }

    pub fn failed(
        node: impl Into<String>,
        environment: impl Into<String>,
        exit_code: i32,
        log: Vec<CompileLogEntry>,
    ) -> Self {
        Self {
            node: node.into(),
            timestamp: Utc::now(),
            input: HostInput::Failure {
                environment: environment.into(),
                exit_code,
                log,
            },
        }
    }

    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Load a host directory named after the node.
    ///
    /// The directory holds `baseline.json` and `preview.json`. When one of
    /// them is absent, the matching `*_log.json` must be present and the
    /// host is recorded as a compilation failure in `environment`.
    pub fn load_dir(dir: &Path, environment: &str) -> Result<Self> {
        let node = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| PreviewError::invalid_value("host directory", dir.display().to_string()))?;

        let baseline_path = dir.join(BASELINE_FILE);
        let preview_path = dir.join(PREVIEW_FILE);
        let job = match (baseline_path.is_file(), preview_path.is_file()) {
            (true, true) => Self {
                node,
                timestamp: Utc::now(),
                input: HostInput::Catalogs {
                    baseline: Box::new(load_catalog(&baseline_path)?),
                    preview: Box::new(load_catalog(&preview_path)?),
                    baseline_path: Some(baseline_path.display().to_string()),
                    preview_path: Some(preview_path.display().to_string()),
                },
            },
            (false, _) => {
                let log = load_compile_log(&dir.join(BASELINE_LOG_FILE))?;
                Self::failed(node, environment, 2, log)
            }
            (true, false) => {
                let log = load_compile_log(&dir.join(PREVIEW_LOG_FILE))?;
                Self::failed(node, environment, 3, log)
            }
        };
        Ok(job)
    }
}

/// Load every subdirectory of `root` as a host.
///
/// Directories that cannot be loaded are returned as errors alongside the
/// jobs that could.
pub fn load_fleet(root: &Path, environment: &str) -> Result<(Vec<HostJob>, Vec<HostError>)> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| PreviewError::io(root, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut jobs = Vec::with_capacity(dirs.len());
    let mut errors = Vec::new();
    for dir in dirs {
        match HostJob::load_dir(&dir, environment) {
            Ok(job) => jobs.push(job),
            Err(error) => errors.push(HostError {
                node: dir.display().to_string(),
                error,
            }),
        }
    }
    Ok((jobs, errors))
}

/// A host whose comparison or merge failed.
#[derive(Debug)]
pub struct HostError {
    pub node: String,
    pub error: PreviewError,
}

/// Result of a fleet run.
#[derive(Debug, Default)]
pub struct FleetOutcome {
    /// Node name and node entity id of every merged host, in job order
    pub merged: Vec<(String, Id)>,
    pub errors: Vec<HostError>,
}

impl FleetOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Compare every host in parallel and merge each result into `factory`.
///
/// Merges are serialized through the mutex. A failing host is recorded in
/// the outcome and does not stop the others.
pub fn compare_and_merge(
    engine: &DeltaEngine,
    jobs: Vec<HostJob>,
    factory: &Mutex<Factory>,
) -> FleetOutcome {
    tracing::info!(hosts = jobs.len(), "comparing fleet");

    let results: Vec<(String, Result<Id>)> = jobs
        .into_par_iter()
        .map(|job| {
            let node = job.node.clone();
            let result = run_job(engine, job, factory);
            (node, result)
        })
        .collect();

    let mut outcome = FleetOutcome::default();
    for (node, result) in results {
        match result {
            Ok(id) => outcome.merged.push((node, id)),
            Err(error) => {
                tracing::warn!(node = %node, error = %error, "host skipped");
                outcome.errors.push(HostError { node, error });
            }
        }
    }
    tracing::info!(
        merged = outcome.merged.len(),
        failed = outcome.errors.len(),
        "fleet comparison finished"
    );
    outcome
}

fn run_job(engine: &DeltaEngine, job: HostJob, factory: &Mutex<Factory>) -> Result<Id> {
    match job.input {
        HostInput::Catalogs {
            baseline,
            preview,
            baseline_path,
            preview_path,
        } => {
            let mut context = DeltaContext::new(&job.node).at(job.timestamp);
            context.baseline_catalog = baseline_path;
            context.preview_catalog = preview_path;
            let delta = engine.compare(&baseline, &preview, &context)?;
            lock(factory)
                .merge(&delta)
                .with_context(|| format!("merging {}", job.node))
        }
        HostInput::Failure {
            environment,
            exit_code,
            log,
        } => lock(factory).merge_failure(&job.node, &environment, job.timestamp, exit_code, &log),
    }
}

fn lock(factory: &Mutex<Factory>) -> std::sync::MutexGuard<'_, Factory> {
    factory.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogResource;
    use crate::overview::EntityKind;
    use serde_json::json;

    fn catalog(env: &str, packages: &[&str]) -> Catalog {
        Catalog {
            name: None,
            environment: env.to_string(),
            version: json!(1),
            resources: packages
                .iter()
                .map(|p| CatalogResource::new("Package", *p))
                .collect(),
            edges: Vec::new(),
        }
    }

    #[test]
    fn test_parallel_merge_matches_sequential() {
        let jobs: Vec<HostJob> = (0..16)
            .map(|i| {
                let preview = if i % 2 == 0 {
                    catalog("future", &["nginx", "htop"])
                } else {
                    catalog("future", &["nginx"])
                };
                HostJob::compared(format!("web{i:02}"), catalog("production", &["nginx"]), preview)
            })
            .collect();

        let factory = Mutex::new(Factory::new());
        let outcome = compare_and_merge(&DeltaEngine::new(), jobs, &factory);
        assert!(outcome.is_success());
        assert_eq!(outcome.merged.len(), 16);

        let overview = factory.into_inner().unwrap().create_overview();
        assert_eq!(overview.count_of(EntityKind::Node), 16);
        // One shared issue for the eight hosts that gained htop
        assert_eq!(overview.count_of(EntityKind::ResourceAdded), 1);
        assert_eq!(overview.count_of(EntityKind::IssueOnNode), 8);
    }

    #[test]
    fn test_bad_host_does_not_stop_others() {
        let mut broken = catalog("future", &["nginx"]);
        broken.edges.push(crate::model::CatalogEdge::new("nonsense", "Package[nginx]"));
        let jobs = vec![
            HostJob::compared("web01", catalog("production", &["nginx"]), broken),
            HostJob::compared("web02", catalog("production", &["nginx"]), catalog("future", &["nginx"])),
            HostJob::failed("db01", "future", 3, vec![CompileLogEntry::new("err", "boom")]),
            HostJob::failed("db02", "future", 0, Vec::new()),
        ];

        let factory = Mutex::new(Factory::new());
        let outcome = compare_and_merge(&DeltaEngine::new(), jobs, &factory);
        let failed: Vec<&str> = outcome.errors.iter().map(|e| e.node.as_str()).collect();
        assert_eq!(failed, ["web01", "db02"]);
        let merged: Vec<&str> = outcome.merged.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(merged, ["web02", "db01"]);
    }

    #[test]
    fn test_load_fleet_directory() {
        let root = tempfile::tempdir().unwrap();
        let write = |node: &str, file: &str, value: serde_json::Value| {
            let dir = root.path().join(node);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(file), value.to_string()).unwrap();
        };
        let catalog = json!({"environment": "production", "version": 1, "resources": [], "edges": []});
        write("web01", BASELINE_FILE, catalog.clone());
        write("web01", PREVIEW_FILE, catalog.clone());
        write("db01", BASELINE_FILE, catalog);
        write("db01", PREVIEW_LOG_FILE, json!([{"level": "err", "message": "boom"}]));
        write("broken", BASELINE_FILE, json!({"environment": "production"}));
        write("broken", PREVIEW_FILE, json!({}));

        let (jobs, errors) = load_fleet(root.path(), "future").unwrap();
        let nodes: Vec<&str> = jobs.iter().map(|j| j.node.as_str()).collect();
        assert_eq!(nodes, ["db01", "web01"]);
        assert!(matches!(
            jobs[0].input,
            HostInput::Failure { exit_code: 3, .. }
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].node.ends_with("broken"));
    }
}
