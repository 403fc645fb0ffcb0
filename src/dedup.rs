// Runs the whole dedup flow over one fetched listing.
//
// Every decision of a pass is reported before that pass touches the store,
// so a dry run prints exactly what an applied run would do.

use crate::core::fuzzy;
use crate::core::grouping::{self, GroupingStats, KeySource};
use crate::core::policy::{self, ResolutionOutcome};
use crate::core::record::FileRecord;
use crate::history::{History, HistoryRecord};
use crate::report::Reporter;
use crate::store::FileStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Primary,
    Fuzzy,
}

/// One evaluated group.
#[derive(Debug, Clone)]
pub struct Decision<'a> {
    pub pass: Pass,
    pub key: String,
    /// What the primary key was derived from; `None` for renamed matches.
    pub source: Option<KeySource>,
    pub outcome: ResolutionOutcome<'a>,
}

#[derive(Debug, Clone, Default)]
pub struct PassOutcome<'a> {
    pub decisions: Vec<Decision<'a>>,
    /// Whether any decision authorized a deletion.
    pub marked_any: bool,
}

impl<'a> PassOutcome<'a> {
    fn from_decisions(decisions: Vec<Decision<'a>>) -> Self {
        let marked_any = decisions.iter().any(|d| !d.outcome.targets().is_empty());
        Self {
            decisions,
            marked_any,
        }
    }

    pub fn vetoed(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.outcome.veto().is_some())
            .count()
    }

    pub fn targets(&self) -> usize {
        self.decisions.iter().map(|d| d.outcome.targets().len()).sum()
    }
}

/// Group by key, then run every duplicate group through the policy.
pub fn primary_pass(records: &[FileRecord]) -> (PassOutcome<'_>, GroupingStats) {
    let (groups, stats) = grouping::build_groups(records);
    let decisions = groups
        .iter()
        .filter_map(|group| {
            policy::evaluate(&group.members).map(|outcome| Decision {
                pass: Pass::Primary,
                key: group.key.value.clone(),
                source: Some(group.key.source),
                outcome,
            })
        })
        .collect();
    (PassOutcome::from_decisions(decisions), stats)
}

/// Match renamed uploads one second either side.
pub fn fuzzy_pass(records: &[FileRecord]) -> PassOutcome<'_> {
    let decisions = fuzzy::find_renamed(records)
        .into_iter()
        .map(|m| Decision {
            pass: Pass::Fuzzy,
            key: format!(
                "{} ~ {} ({:+}s)",
                m.outcome.preferred().name,
                m.matched_name,
                m.offset
            ),
            source: None,
            outcome: m.outcome,
        })
        .collect();
    PassOutcome::from_decisions(decisions)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Actually trash files; otherwise only report.
    pub apply: bool,
    /// Run the renamed-file pass when the primary pass marks nothing.
    pub fuzzy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: GroupingStats,
    pub decisions: usize,
    pub vetoed: usize,
    pub targets: usize,
    pub trashed: usize,
    pub fuzzy_ran: bool,
}

impl RunSummary {
    fn add(&mut self, outcome: &PassOutcome<'_>) {
        self.decisions += outcome.decisions.len();
        self.vetoed += outcome.vetoed();
        self.targets += outcome.targets();
    }
}

/// Evaluate, report and (in apply mode) act on one fetched listing.
///
/// A store failure stops the run immediately and is returned with context;
/// decisions not yet applied are left alone.
pub fn run<S, W>(
    store: &mut S,
    records: &[FileRecord],
    options: RunOptions,
    history: Option<&History>,
    reporter: &mut Reporter<W>,
) -> Result<RunSummary>
where
    S: FileStore + ?Sized,
    W: Write,
{
    let mut summary = RunSummary::default();

    let (primary, stats) = primary_pass(records);
    reporter.stats(&stats)?;
    summary.stats = stats;
    summary.add(&primary);
    reporter.pass(&primary)?;
    if options.apply {
        summary.trashed += apply(store, &primary, history, reporter)?;
    }

    if options.fuzzy {
        if primary.marked_any {
            log::info!("Primary pass marked duplicates; skipping renamed-file pass");
        } else {
            summary.fuzzy_ran = true;
            let secondary = fuzzy_pass(records);
            summary.add(&secondary);
            reporter.pass(&secondary)?;
            if options.apply {
                summary.trashed += apply(store, &secondary, history, reporter)?;
            }
        }
    }

    reporter.summary(&summary, options.apply)?;
    Ok(summary)
}

fn apply<S, W>(
    store: &mut S,
    outcome: &PassOutcome<'_>,
    history: Option<&History>,
    reporter: &mut Reporter<W>,
) -> Result<usize>
where
    S: FileStore + ?Sized,
    W: Write,
{
    let mut trashed = 0;
    for decision in &outcome.decisions {
        let targets = decision.outcome.targets();
        if targets.is_empty() {
            continue;
        }

        for target in targets {
            store
                .trash(&target.id)
                .with_context(|| format!("Failed to trash {} ({})", target.name, target.id))?;
            reporter.trashed(target)?;
            trashed += 1;
        }

        if let Some(history) = history {
            history
                .append(&HistoryRecord::from_decision(decision))
                .with_context(|| format!("Failed to record history in {:?}", history.path()))?;
        }
    }
    Ok(trashed)
}
