//! Batch audit of procedure definitions
//!
//! Formats and scans every procedure source, collecting the procedures that
//! leave temp tables behind. A procedure whose text is empty or cannot be
//! formatted is skipped and the rest of the batch carries on.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::error::TempTableFinderError;
use crate::formatter::SqlFormatter;
use crate::tracker;

/// Minimum number of procedures to benefit from parallel scanning.
/// Below this threshold, sequential processing is faster due to rayon overhead.
const PARALLEL_THRESHOLD: usize = 8;

/// A stored procedure definition to audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSource {
    /// Display name (schema-qualified procedure name or relative file path)
    pub name: String,
    /// Raw definition text
    pub definition: String,
}

impl ProcedureSource {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// A procedure that creates temp tables it never drops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureFinding {
    pub procedure: String,
    /// Orphaned temp table names, never empty
    pub orphaned: BTreeSet<String>,
}

/// A procedure left out of the audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedProcedure {
    pub procedure: String,
    pub reason: String,
}

/// Result of auditing a batch of procedures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOutcome {
    /// Procedures with orphaned temp tables, in input order
    pub findings: Vec<ProcedureFinding>,
    /// Number of procedures that were formatted and scanned
    pub scanned: usize,
    /// Procedures that could not be scanned, in input order
    pub skipped: Vec<SkippedProcedure>,
}

impl AuditOutcome {
    /// Put procedures that never reached the scanner (fetch or read failures)
    /// ahead of the ones skipped during scanning.
    pub fn prepend_skipped(&mut self, mut skipped: Vec<SkippedProcedure>) {
        skipped.append(&mut self.skipped);
        self.skipped = skipped;
    }

    /// Total number of orphaned temp tables across all findings.
    pub fn orphaned_count(&self) -> usize {
        self.findings.iter().map(|f| f.orphaned.len()).sum()
    }
}

enum ProcedureAudit {
    Clean,
    Orphaned(ProcedureFinding),
    Skipped(SkippedProcedure),
}

/// Audit procedure sources, using a bounded worker pool when `jobs` is set.
pub fn audit_sources_with_jobs(
    sources: &[ProcedureSource],
    formatter: &dyn SqlFormatter,
    jobs: Option<usize>,
) -> Result<AuditOutcome, TempTableFinderError> {
    match jobs {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?;
            Ok(pool.install(|| audit_sources(sources, formatter)))
        }
        None => Ok(audit_sources(sources, formatter)),
    }
}

/// Audit procedure sources on the current rayon pool.
pub fn audit_sources(sources: &[ProcedureSource], formatter: &dyn SqlFormatter) -> AuditOutcome {
    let audits: Vec<ProcedureAudit> = if sources.len() >= PARALLEL_THRESHOLD {
        sources
            .par_iter()
            .map(|source| audit_procedure(source, formatter))
            .collect()
    } else {
        sources
            .iter()
            .map(|source| audit_procedure(source, formatter))
            .collect()
    };

    let mut outcome = AuditOutcome::default();
    for audit in audits {
        match audit {
            ProcedureAudit::Clean => outcome.scanned += 1,
            ProcedureAudit::Orphaned(finding) => {
                outcome.scanned += 1;
                outcome.findings.push(finding);
            }
            ProcedureAudit::Skipped(skipped) => outcome.skipped.push(skipped),
        }
    }

    outcome
}

fn audit_procedure(source: &ProcedureSource, formatter: &dyn SqlFormatter) -> ProcedureAudit {
    let skipped = |reason: String| {
        tracing::warn!(procedure = %source.name, %reason, "Skipping procedure");
        ProcedureAudit::Skipped(SkippedProcedure {
            procedure: source.name.clone(),
            reason,
        })
    };

    if source.definition.trim().is_empty() {
        return skipped("empty definition".to_string());
    }

    let formatted = match formatter.format(&source.definition) {
        Ok(formatted) => formatted,
        Err(e) => return skipped(e.to_string()),
    };

    if formatted.trim().is_empty() {
        return skipped("formatted SQL was empty".to_string());
    }

    let lifetimes = tracker::track_lifetimes(&formatted);
    tracing::debug!(
        procedure = %source.name,
        created = lifetimes.created.len(),
        dropped = lifetimes.dropped.len(),
        "Scanned procedure"
    );

    let orphaned = lifetimes.orphaned();
    if orphaned.is_empty() {
        ProcedureAudit::Clean
    } else {
        ProcedureAudit::Orphaned(ProcedureFinding {
            procedure: source.name.clone(),
            orphaned,
        })
    }
}
