//! Indexing orchestrator
//!
//! Drives every configured unit through
//! `NotStarted → Cloned → Greped → Parsed → Persisted → Done`.
//! A unit that fails keeps the last state it reached, and the run moves on
//! to the next unit.

use chrono::{DateTime, Months, Utc};
use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::path::Path;

use crdoc_core::{
    Config, CrdNormalizer, CrdOutcome, CrdRecord, IndexUnit, NIGHTLY_TAG, NormalizedCrd,
    split_yaml,
};
use crdoc_store::Catalog;

use crate::error::{IndexError, Result};
use crate::snapshot::{GitRef, Snapshot};

/// How far nightly is pushed back so that it sorts after every real tag
const NIGHTLY_BACKDATE_MONTHS: u32 = 50 * 12;

/// Progress of one unit through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnitState {
    NotStarted,
    Cloned,
    Greped,
    Parsed,
    Persisted,
    Done,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitState::NotStarted => "not started",
            UnitState::Cloned => "cloned",
            UnitState::Greped => "greped",
            UnitState::Parsed => "parsed",
            UnitState::Persisted => "persisted",
            UnitState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of one unit
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub unit: IndexUnit,
    /// Last state reached
    pub state: UnitState,
    pub tags_indexed: usize,
    /// Tags skipped because they failed (all-tags mode)
    pub tags_failed: usize,
    /// Distinct CRDs found across indexed tags
    pub crds_found: usize,
    /// Rows actually written; zero when everything was already indexed
    pub rows_inserted: usize,
    /// Set when the unit failed
    pub error: Option<String>,
}

impl UnitReport {
    fn new(unit: IndexUnit) -> Self {
        Self {
            unit,
            state: UnitState::NotStarted,
            tags_indexed: 0,
            tags_failed: 0,
            crds_found: 0,
            rows_inserted: 0,
            error: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    fn advance(&mut self, next: UnitState) {
        tracing::debug!(unit = %self.unit, from = %self.state, to = %next, "State transition");
        self.state = next;
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct IndexSummary {
    pub reports: Vec<UnitReport>,
}

impl IndexSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failed()).count()
    }

    pub fn crds_found(&self) -> usize {
        self.reports.iter().map(|r| r.crds_found).sum()
    }

    pub fn rows_inserted(&self) -> usize {
        self.reports.iter().map(|r| r.rows_inserted).sum()
    }
}

/// CRDs collected for one tag, deduplicated by GVK
///
/// A later CRD with the same GVK replaces the earlier one.
#[derive(Debug, Default)]
pub struct CrdCollector {
    crds: IndexMap<String, NormalizedCrd>,
}

impl CrdCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CRD, returning the one it replaced
    pub fn insert(&mut self, crd: NormalizedCrd) -> Option<NormalizedCrd> {
        self.crds.insert(crd.key(), crd)
    }

    pub fn len(&self) -> usize {
        self.crds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crds.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&NormalizedCrd> {
        self.crds.get(key)
    }

    /// Rows for `tag_id`
    pub fn into_records(self, tag_id: i64) -> crdoc_core::Result<Vec<CrdRecord>> {
        self.crds
            .into_values()
            .map(|crd| crd.into_record(tag_id))
            .collect()
    }
}

/// Ordering time of a tag: its commit time, back-dated for nightly
pub fn tag_time(tag: &str, commit_time: DateTime<Utc>) -> DateTime<Utc> {
    if tag != NIGHTLY_TAG {
        return commit_time;
    }
    commit_time
        .checked_sub_months(Months::new(NIGHTLY_BACKDATE_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A repository whose every tag failed counts as a failed unit
fn all_tags_outcome(repo_key: &str, report: &UnitReport) -> Result<()> {
    if report.tags_indexed == 0 && report.tags_failed > 0 {
        return Err(IndexError::AllTagsFailed {
            repo: repo_key.to_string(),
            failed: report.tags_failed,
        });
    }
    Ok(())
}

/// Indexes configured units into a catalog
pub struct Indexer<'a> {
    config: &'a Config,
    catalog: &'a mut Catalog,
    normalizer: CrdNormalizer,
    path_pattern: Regex,
    content_pattern: regex::bytes::Regex,
    tag_filter: Option<String>,
}

impl<'a> Indexer<'a> {
    pub fn new(config: &'a Config, catalog: &'a mut Catalog) -> Result<Self> {
        Ok(Self {
            config,
            catalog,
            normalizer: CrdNormalizer::new(config.strip.to_options()),
            path_pattern: config.path_regex()?,
            content_pattern: regex::bytes::Regex::new(&config.content_pattern)?,
            tag_filter: None,
        })
    }

    /// Only index this tag when a unit enumerates all tags
    pub fn with_tag_filter(mut self, tag: Option<String>) -> Self {
        self.tag_filter = tag;
        self
    }

    /// Index every unit in order
    pub fn run(&mut self, units: &[IndexUnit]) -> IndexSummary {
        let mut summary = IndexSummary::default();
        for unit in units {
            summary.reports.push(self.index_unit(unit));
        }
        tracing::info!(
            units = summary.reports.len(),
            failed = summary.failed(),
            inserted = summary.rows_inserted(),
            "Indexing finished"
        );
        summary
    }

    /// Index one unit; failures are captured in the report
    pub fn index_unit(&mut self, unit: &IndexUnit) -> UnitReport {
        let mut report = UnitReport::new(unit.clone());
        tracing::info!(unit = %unit, "Indexing");

        if let Err(e) = self.try_index_unit(unit, &mut report) {
            tracing::warn!(
                org = %unit.org,
                repo = %unit.repo,
                tag = unit.tag.as_deref().unwrap_or("*"),
                state = %report.state,
                "Skipping unit: {}",
                e
            );
            report.error = Some(e.to_string());
            return report;
        }

        report.advance(UnitState::Done);
        tracing::info!(
            unit = %unit,
            tags = report.tags_indexed,
            crds = report.crds_found,
            inserted = report.rows_inserted,
            "Indexed"
        );
        report
    }

    fn try_index_unit(&mut self, unit: &IndexUnit, report: &mut UnitReport) -> Result<()> {
        let url = self.config.clone_url_for(&unit.org, &unit.repo);
        let repo_key = self.config.catalog_key(&unit.org, &unit.repo);

        let reference = match &unit.tag {
            Some(_) if unit.is_nightly() => GitRef::Branch(self.config.nightly_branch.clone()),
            Some(tag) => GitRef::Tag(tag.clone()),
            None => GitRef::DefaultBranch,
        };

        let snapshot = Snapshot::checkout(&url, &reference)?;
        report.advance(UnitState::Cloned);

        match &unit.tag {
            Some(tag) => self.index_checkout(&snapshot, &repo_key, tag, report),
            None => self.index_all_tags(&snapshot, &repo_key, report),
        }
    }

    /// Reuse one checkout for every tag of the repository
    fn index_all_tags(
        &mut self,
        snapshot: &Snapshot,
        repo_key: &str,
        report: &mut UnitReport,
    ) -> Result<()> {
        let mut tags = snapshot.tags()?;
        if let Some(filter) = &self.tag_filter {
            tags.retain(|t| t == filter);
        }
        tracing::debug!(repo = repo_key, count = tags.len(), "Enumerated tags");

        for tag in &tags {
            let result = snapshot.switch_to(tag).and_then(|()| {
                report.advance(UnitState::Cloned);
                self.index_checkout(snapshot, repo_key, tag, report)
            });
            if let Err(e) = result {
                tracing::warn!(repo = repo_key, tag = %tag, "Skipping tag: {}", e);
                report.tags_failed += 1;
            }
        }

        all_tags_outcome(repo_key, report)
    }

    /// Grep, parse and persist the current working tree as `tag`
    fn index_checkout(
        &mut self,
        snapshot: &Snapshot,
        repo_key: &str,
        tag: &str,
        report: &mut UnitReport,
    ) -> Result<()> {
        let files = snapshot.grep(&self.content_pattern, &self.path_pattern)?;
        tracing::debug!(repo = repo_key, tag, files = files.len(), "Candidate manifests");
        report.advance(UnitState::Greped);

        let collected = self.collect(snapshot.path(), &files);
        report.advance(UnitState::Parsed);

        let time = tag_time(tag, snapshot.head_commit_time()?);
        let tag_id = self.catalog.ensure_tag(tag, repo_key, time)?;
        let found = collected.len();
        let records = collected.into_records(tag_id)?;
        let inserted = self.catalog.insert_crds(&records)?;
        report.advance(UnitState::Persisted);

        report.tags_indexed += 1;
        report.crds_found += found;
        report.rows_inserted += inserted;
        Ok(())
    }

    /// Split and normalize candidate files in order
    fn collect(&self, root: &Path, files: &[String]) -> CrdCollector {
        let mut collector = CrdCollector::new();

        for file in files {
            let path = root.join(file);
            let content = match std::fs::read(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(file = %file, "Skipping unreadable manifest: {}", e);
                    continue;
                }
            };

            for doc in split_yaml(&content, file) {
                match self.normalizer.normalize(&doc, &path) {
                    CrdOutcome::Crd(crd) => {
                        tracing::debug!(file = %file, gvk = %crd.gvk, "Found CRD");
                        if collector.insert(crd).is_some() {
                            tracing::debug!(file = %file, "Replaced earlier CRD with same GVK");
                        }
                    }
                    CrdOutcome::NotCrd => {}
                    CrdOutcome::Unusable { reason } => {
                        tracing::warn!(file = %file, "Dropping CRD: {}", reason);
                    }
                }
            }
        }

        collector
    }
}
