//! @ai:module:intent Run one enrichment pass over a repository file or a source tree
//! @ai:module:layer application
//! @ai:module:public_api enrich_file, enrich_directory, inspect_file, EnrichReport, FileReport, FileStatus, OperationCounts, FileFailure, Inspection
//! @ai:module:depends_on operations, parser, printer, walker, config, error
//! @ai:module:stateless true

use crate::config::EnrichConfig;
use crate::error::Result;
use crate::matcher::Signature;
use crate::operations::{
    finish_remove, Outcome, Phase, Preparation, RepositoryContext, Workspace, ALL,
};
use crate::parser::parse_file;
use crate::printer::write_unit;
use crate::resolver::Classification;
use crate::walker::{for_each_candidate_file, FileFilter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// @ai:intent What happened to one candidate file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Enriched,
    NotRepository,
    /// A type-level directive hides the whole repository.
    NotExported,
    NoDomain,
}

/// @ai:intent Outcome of one operation kind on one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub operation: String,
    pub outcome: Outcome,
}

/// @ai:intent Per-file result of a pass
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub operations: Vec<OperationResult>,
    /// Files rewritten for this repository, companion included.
    pub written: Vec<PathBuf>,
}

impl FileReport {
    fn skipped(path: &Path, status: FileStatus) -> Self {
        debug!(file = %path.display(), ?status, "skipping file");
        Self {
            path: path.to_path_buf(),
            status,
            operations: Vec::new(),
            written: Vec::new(),
        }
    }
}

/// @ai:intent Tally of outcomes for one operation kind across a pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    pub applied: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub not_exported: usize,
    pub not_applicable: usize,
}

impl OperationCounts {
    fn record(&mut self, outcome: Outcome) {
        let slot = match outcome {
            Outcome::Applied => &mut self.applied,
            Outcome::Removed => &mut self.removed,
            Outcome::Unchanged => &mut self.unchanged,
            Outcome::NotExported => &mut self.not_exported,
            Outcome::NotApplicable => &mut self.not_applicable,
        };
        *slot += 1;
    }
}

/// @ai:intent A file whose enrichment was aborted
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
    /// Malformed declaration rather than an I/O or parse problem.
    pub configuration: bool,
}

/// @ai:intent Summary of a whole pass
#[derive(Debug, Clone, Serialize)]
pub struct EnrichReport {
    pub phase: Phase,
    pub files_scanned: usize,
    pub files_enriched: usize,
    pub files_skipped: usize,
    pub files_written: usize,
    pub operations: BTreeMap<String, OperationCounts>,
    pub written: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl EnrichReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            files_scanned: 0,
            files_enriched: 0,
            files_skipped: 0,
            files_written: 0,
            operations: BTreeMap::new(),
            written: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// @ai:intent Check whether every candidate was processed
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// @ai:intent Fold one file's result into the totals
    pub fn record(&mut self, file: FileReport) {
        self.files_scanned += 1;
        match file.status {
            FileStatus::Enriched => self.files_enriched += 1,
            _ => self.files_skipped += 1,
        }
        for result in file.operations {
            self.operations
                .entry(result.operation)
                .or_default()
                .record(result.outcome);
        }
        self.files_written += file.written.len();
        self.written.extend(file.written);
    }

    fn fail(&mut self, path: &Path, error: &crate::error::Error) {
        self.files_scanned += 1;
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            message: error.to_string(),
            configuration: error.is_configuration(),
        });
    }
}

/// @ai:intent Run every operation kind in one phase against one file
/// @ai:pre path names a parseable source file
/// @ai:post the file is rewritten only when its exported repository changed; a touched companion is written too
/// @ai:effects fs:read, fs:write
pub fn enrich_file(path: &Path, config: &EnrichConfig, phase: Phase) -> Result<FileReport> {
    let unit = parse_file(path)?;
    let Some(root) = unit.root_type_index() else {
        return Ok(FileReport::skipped(path, FileStatus::NotRepository));
    };

    let ctx = match RepositoryContext::prepare(config, &unit, root)? {
        Preparation::Ready(ctx) => ctx,
        Preparation::NotRepository => return Ok(FileReport::skipped(path, FileStatus::NotRepository)),
        Preparation::NotExported => return Ok(FileReport::skipped(path, FileStatus::NotExported)),
        Preparation::NoDomain => return Ok(FileReport::skipped(path, FileStatus::NoDomain)),
    };

    let original = unit.clone();
    let mut ws = Workspace::new(unit, root);
    let mut operations = Vec::with_capacity(ALL.len());
    for op in ALL {
        let outcome = op.apply(&ctx, &mut ws, phase)?;
        operations.push(OperationResult {
            operation: op.to_string(),
            outcome,
        });
    }

    if phase == Phase::Remove {
        finish_remove(&ctx, &mut ws.unit, root);
        if let Some(companion) = ws.companion.as_mut() {
            let index = companion.index;
            companion.modified |= finish_remove(&ctx, &mut companion.unit, index);
        }
    }

    let mut written = Vec::new();
    if let Some(companion) = ws.companion.as_ref().filter(|c| c.modified) {
        write_unit(&companion.unit)?;
        if let Some(companion_path) = &companion.unit.path {
            info!(file = %companion_path.display(), created = companion.created, "wrote companion");
            written.push(companion_path.clone());
        }
    }
    if ws.unit != original {
        write_unit(&ws.unit)?;
        info!(file = %path.display(), ?phase, "wrote repository");
        written.push(path.to_path_buf());
    }

    Ok(FileReport {
        path: path.to_path_buf(),
        status: FileStatus::Enriched,
        operations,
        written,
    })
}

/// @ai:intent Enrich every candidate file under a root, in lexicographic order
/// @ai:post per-file failures are recorded and the walk continues; walk failures abort
/// @ai:effects fs:read, fs:write
pub fn enrich_directory(
    root: &Path,
    filter: &FileFilter,
    config: &EnrichConfig,
    phase: Phase,
) -> Result<EnrichReport> {
    let mut report = EnrichReport::new(phase);

    for path in for_each_candidate_file(root, filter)? {
        match enrich_file(&path, config, phase) {
            Ok(file) => report.record(file),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "enrichment aborted for file");
                report.fail(&path, &e);
            }
        }
    }

    info!(
        scanned = report.files_scanned,
        written = report.files_written,
        failed = report.failures.len(),
        "pass finished"
    );
    Ok(report)
}

/// @ai:intent A method of the repository hierarchy as seen by the operations
#[derive(Debug, Clone, Serialize)]
pub struct InspectedMethod {
    pub name: String,
    pub parameters: Vec<String>,
    pub owner: String,
    pub local: bool,
}

/// @ai:intent Read-only view of how a file would be treated
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub path: PathBuf,
    pub repository: Option<String>,
    pub status: FileStatus,
    pub classification: Option<Classification>,
    pub domain: Option<String>,
    pub id: Option<String>,
    pub collection_path: Option<String>,
    pub companion: Option<String>,
    pub methods: Vec<InspectedMethod>,
}

/// @ai:intent Classify a file and list the hierarchy methods operations would see
/// @ai:post never writes
/// @ai:effects fs:read
pub fn inspect_file(path: &Path, config: &EnrichConfig) -> Result<Inspection> {
    let unit = parse_file(path)?;
    let mut inspection = Inspection {
        path: path.to_path_buf(),
        repository: None,
        status: FileStatus::NotRepository,
        classification: None,
        domain: None,
        id: None,
        collection_path: None,
        companion: None,
        methods: Vec::new(),
    };
    let Some(root) = unit.root_type_index() else {
        return Ok(inspection);
    };
    let decl = &unit.types[root];
    inspection.repository = Some(unit.qualified_name_of(&decl.name));

    let ctx = match RepositoryContext::prepare(config, &unit, root)? {
        Preparation::Ready(ctx) => ctx,
        Preparation::NotRepository => return Ok(inspection),
        Preparation::NotExported => {
            inspection.status = FileStatus::NotExported;
            return Ok(inspection);
        }
        Preparation::NoDomain => {
            inspection.status = FileStatus::NoDomain;
            return Ok(inspection);
        }
    };

    inspection.status = FileStatus::Enriched;
    inspection.classification = Some(ctx.classification);
    inspection.domain = Some(ctx.domain.render());
    inspection.id = ctx.id.as_ref().map(|id| id.render());
    inspection.collection_path = Some(ctx.collection_path.clone());
    inspection.companion = ctx
        .resolver
        .find_custom_companion(decl, &unit)?
        .map(|loaded| loaded.qualified_name());
    inspection.methods = ctx
        .matcher
        .hierarchy_methods(decl, &unit)?
        .into_iter()
        .map(|found| InspectedMethod {
            parameters: Signature::of(&found.method).params,
            name: found.method.name,
            owner: found.owner,
            local: found.local,
        })
        .collect();
    Ok(inspection)
}
