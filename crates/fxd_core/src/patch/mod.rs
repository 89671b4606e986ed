//! Patch application: parsed edits back into the graph.
//!
//! # Responsibility
//! - Validate patches (checksum conflicts, structural problems).
//! - Apply patches per-item or all-or-nothing.
//! - Report per-patch outcomes without collapsing them into pass/fail.
//!
//! # Invariants
//! - A failed transactional batch leaves the store byte-identical to its
//!   pre-apply state and reports every patch as failed.
//! - Checksum conflicts are warnings unless the caller opts into strict
//!   mode.

use crate::graph::path::{GraphError, NodePath};
use crate::graph::store::{sanitize_segment, NodeStore};
use crate::model::snippet::{meta, Patch, SnippetSpec};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Behavior when a patch id matches no existing snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Create an orphan snippet under the configured orphan root.
    #[default]
    Create,
    /// Drop the patch (reported in `ApplyReport::skipped`).
    Skip,
}

/// Options controlling one apply call.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub on_missing: MissingPolicy,
    /// All patches succeed or none are committed.
    pub transaction: bool,
    /// Run every validation check before applying anything, surfacing all
    /// failures instead of stopping at the first.
    pub validate_first: bool,
    /// Escalate checksum conflicts from warnings to per-patch failures.
    pub strict_conflicts: bool,
    /// Parent path for orphan snippets created by `MissingPolicy::Create`.
    pub orphan_root: String,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            on_missing: MissingPolicy::Create,
            transaction: false,
            validate_first: false,
            strict_conflicts: false,
            orphan_root: "orphans".to_string(),
        }
    }
}

/// One checksum divergence between a patch and the live snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumConflict {
    pub id: String,
    /// Checksum currently stored on the snippet node.
    pub live: String,
    /// Checksum the edited text was based on.
    pub parsed: String,
}

/// One patch that did not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of one apply call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<PatchFailure>,
    /// Patches dropped by `MissingPolicy::Skip`.
    pub skipped: Vec<String>,
    /// Checksum warnings (also produced in strict mode, alongside the
    /// corresponding failures).
    pub conflicts: Vec<ChecksumConflict>,
    pub rollback_available: bool,
}

/// Errors that abort an apply call as a whole.
#[derive(Debug)]
pub enum ApplyError {
    /// Transactional batch failed; nothing was committed. The report lists
    /// every patch of the batch as failed.
    TransactionAborted { report: ApplyReport },
    /// Structural problem with the options (bad orphan root path).
    Graph(GraphError),
}

impl Display for ApplyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransactionAborted { report } => write!(
                f,
                "transaction aborted; {} patches rolled back",
                report.failed.len()
            ),
            Self::Graph(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ApplyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TransactionAborted { .. } => None,
            Self::Graph(err) => Some(err),
        }
    }
}

impl From<GraphError> for ApplyError {
    fn from(value: GraphError) -> Self {
        Self::Graph(value)
    }
}

/// Standalone conflict query: which patches were based on stale snippets.
///
/// Read-only; lets callers pick a conflict policy before applying.
pub fn detect_conflicts(store: &NodeStore, patches: &[Patch]) -> Vec<ChecksumConflict> {
    let mut conflicts = Vec::new();
    for patch in patches {
        if let Some(conflict) = conflict_for(store, patch) {
            conflicts.push(conflict);
        }
    }
    conflicts
}

/// Applies patches to the store under the given options.
///
/// Non-transactional mode isolates failures per patch: validation and apply
/// errors land in `report.failed`, the rest apply. Transactional mode
/// applies to a scratch fork and commits atomically; any failure returns
/// `ApplyError::TransactionAborted` with no mutation retained.
pub fn apply(
    store: &mut NodeStore,
    patches: &[Patch],
    options: &ApplyOptions,
) -> Result<ApplyReport, ApplyError> {
    // Bad orphan root is programmer error, not a per-patch condition.
    let orphan_root = NodePath::parse(options.orphan_root.as_str())?;

    let outcome = if options.transaction {
        apply_transactional(store, patches, options, &orphan_root)
    } else {
        Ok(apply_direct(store, patches, options, &orphan_root))
    };

    match &outcome {
        Ok(report) => info!(
            "event=patch_apply module=patch status=ok patches={} succeeded={} failed={} skipped={} conflicts={} transaction={}",
            patches.len(),
            report.succeeded.len(),
            report.failed.len(),
            report.skipped.len(),
            report.conflicts.len(),
            options.transaction
        ),
        Err(err) => error!(
            "event=patch_apply module=patch status=error patches={} transaction={} error={err}",
            patches.len(),
            options.transaction
        ),
    }
    outcome
}

fn apply_direct(
    store: &mut NodeStore,
    patches: &[Patch],
    options: &ApplyOptions,
    orphan_root: &NodePath,
) -> ApplyReport {
    let (validations, conflicts) = validate_all(store, patches, options.strict_conflicts);
    let mut report = ApplyReport {
        conflicts,
        rollback_available: false,
        ..ApplyReport::default()
    };

    for (patch, validation) in patches.iter().zip(validations) {
        if let Err(reason) = validation {
            report.failed.push(PatchFailure {
                id: patch.id.clone(),
                reason,
            });
            continue;
        }
        match apply_one(store, patch, options, orphan_root) {
            Ok(Applied::Updated) => report.succeeded.push(patch.id.clone()),
            Ok(Applied::Skipped) => report.skipped.push(patch.id.clone()),
            Err(err) => report.failed.push(PatchFailure {
                id: patch.id.clone(),
                reason: err.to_string(),
            }),
        }
    }
    report
}

fn apply_transactional(
    store: &mut NodeStore,
    patches: &[Patch],
    options: &ApplyOptions,
    orphan_root: &NodePath,
) -> Result<ApplyReport, ApplyError> {
    let (validations, conflicts) = validate_all(store, patches, options.strict_conflicts);

    let invalid: Vec<(usize, String)> = validations
        .iter()
        .enumerate()
        .filter_map(|(index, v)| v.as_ref().err().map(|reason| (index, reason.clone())))
        .collect();

    if !invalid.is_empty() {
        // validate_first reports every validation failure; otherwise only
        // the first one carries its own reason, matching stop-at-first
        // semantics.
        let reported = if options.validate_first {
            invalid
        } else {
            invalid.into_iter().take(1).collect()
        };
        return Err(abort(patches, reported, conflicts));
    }

    let mut fork = store.fork();
    let mut touched: Vec<String> = Vec::new();
    let mut succeeded: Vec<String> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    for (index, patch) in patches.iter().enumerate() {
        match apply_one(&mut fork, patch, options, orphan_root) {
            Ok(Applied::Updated) => {
                succeeded.push(patch.id.clone());
                if let Some(path) = fork.snippet_path(&patch.id) {
                    touched.push(path.as_str().to_string());
                }
            }
            Ok(Applied::Skipped) => skipped.push(patch.id.clone()),
            Err(err) => {
                return Err(abort(patches, vec![(index, err.to_string())], conflicts));
            }
        }
    }

    store.adopt(fork, &touched);
    Ok(ApplyReport {
        succeeded,
        failed: Vec::new(),
        skipped,
        conflicts,
        rollback_available: true,
    })
}

/// Builds the all-failed report for an aborted transaction. Patches that
/// would individually have succeeded are failed as part of the batch,
/// by policy.
fn abort(
    patches: &[Patch],
    reasons: Vec<(usize, String)>,
    conflicts: Vec<ChecksumConflict>,
) -> ApplyError {
    let mut failed: Vec<PatchFailure> = patches
        .iter()
        .map(|patch| PatchFailure {
            id: patch.id.clone(),
            reason: "transaction aborted".to_string(),
        })
        .collect();
    for (index, reason) in reasons {
        failed[index].reason = reason;
    }
    ApplyError::TransactionAborted {
        report: ApplyReport {
            succeeded: Vec::new(),
            failed,
            skipped: Vec::new(),
            conflicts,
            rollback_available: true,
        },
    }
}

enum Applied {
    Updated,
    Skipped,
}

fn apply_one(
    store: &mut NodeStore,
    patch: &Patch,
    options: &ApplyOptions,
    orphan_root: &NodePath,
) -> Result<Applied, GraphError> {
    let target = match store.snippet_path(&patch.id) {
        Some(path) => path.clone(),
        None => match options.on_missing {
            MissingPolicy::Skip => return Ok(Applied::Skipped),
            MissingPolicy::Create => orphan_root.child(&sanitize_segment(&patch.id))?,
        },
    };

    let spec = SnippetSpec {
        id: patch.id.clone(),
        lang: patch.lang.clone(),
        file: patch.file.clone(),
        order: patch.order,
    };
    store.upsert_snippet_at(&target, &spec, &patch.body)?;
    Ok(Applied::Updated)
}

/// Validates every patch up front. Returns per-patch results plus all
/// checksum conflicts found (recorded once, as warnings, regardless of
/// strictness).
fn validate_all(
    store: &NodeStore,
    patches: &[Patch],
    strict_conflicts: bool,
) -> (Vec<Result<(), String>>, Vec<ChecksumConflict>) {
    let mut validations = Vec::with_capacity(patches.len());
    let mut conflicts = Vec::new();

    for patch in patches {
        if patch.id.is_empty() {
            validations.push(Err("patch id must not be empty".to_string()));
            continue;
        }
        match conflict_for(store, patch) {
            Some(conflict) => {
                let result = if strict_conflicts {
                    Err(format!(
                        "checksum conflict: snippet changed since parse (live {}, parsed {})",
                        conflict.live, conflict.parsed
                    ))
                } else {
                    Ok(())
                };
                conflicts.push(conflict);
                validations.push(result);
            }
            None => validations.push(Ok(())),
        }
    }
    (validations, conflicts)
}

fn conflict_for(store: &NodeStore, patch: &Patch) -> Option<ChecksumConflict> {
    let parsed = patch.checksum_at_parse.as_deref()?;
    let path = store.snippet_path(&patch.id)?;
    let live = store.node(path)?.meta(meta::CHECKSUM)?;
    if live == parsed {
        return None;
    }
    Some(ChecksumConflict {
        id: patch.id.clone(),
        live: live.to_string(),
        parsed: parsed.to_string(),
    })
}
