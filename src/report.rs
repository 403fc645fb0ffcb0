use crate::core::grouping::GroupingStats;
use crate::core::record::FileRecord;
use crate::dedup::{Decision, Pass, PassOutcome, RunSummary};
use std::io::{self, Write};

/// Human-readable audit trail of a run.
pub struct Reporter<W: Write> {
    out: W,
    verbose: bool,
    seen: usize,
}

impl Reporter<io::Stdout> {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            seen: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Raw JSON dump of every fetched record (verbose only).
    pub fn listing(&mut self, records: &[FileRecord]) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        for record in records {
            writeln!(self.out, "{}\n", serde_json::to_string(record)?)?;
        }
        Ok(())
    }

    pub fn stats(&mut self, stats: &GroupingStats) -> io::Result<()> {
        writeln!(self.out, "▶ Files with 'time' metadata: {}", stats.with_time)?;
        writeln!(
            self.out,
            "▶ Eligible files: {} of {}",
            stats.eligible, stats.total
        )?;
        writeln!(self.out, "▶ Found duplicate groups: {}", stats.groups)
    }

    pub fn pass(&mut self, outcome: &PassOutcome<'_>) -> io::Result<()> {
        for decision in &outcome.decisions {
            self.decision(decision)?;
        }
        Ok(())
    }

    pub fn decision(&mut self, decision: &Decision<'_>) -> io::Result<()> {
        self.seen += 1;
        let outcome = &decision.outcome;
        let label = match decision.pass {
            Pass::Primary => "Group",
            Pass::Fuzzy => "Renamed",
        };
        write!(self.out, "\n✨ {} {}: {}", label, self.seen, decision.key)?;
        if let Some(source) = decision.source {
            write!(self.out, " [by {}]", source)?;
        }
        writeln!(self.out, " - {} photo(s)", outcome.others().len() + 1)?;

        let preferred = outcome.preferred();
        writeln!(self.out, "   🏆 Prefer: {}", preferred.summary())?;
        self.json(preferred)?;

        match outcome.veto() {
            None => {
                for record in outcome.targets() {
                    writeln!(self.out, "   🗑️  Delete: {}", record.summary())?;
                    self.json(record)?;
                }
            }
            Some(veto) => {
                for record in outcome.others() {
                    writeln!(self.out, "   📎 Spare: {}", record.summary())?;
                    self.json(record)?;
                }
                writeln!(self.out, "   ⛔ Vetoed: {}", veto)?;
            }
        }
        Ok(())
    }

    pub fn trashed(&mut self, record: &FileRecord) -> io::Result<()> {
        writeln!(self.out, "   🗑️  Trashed {} ({})", record.name, record.id)
    }

    pub fn summary(&mut self, summary: &RunSummary, applied: bool) -> io::Result<()> {
        writeln!(
            self.out,
            "\n▶ {} decision(s), {} vetoed, {} file(s) marked for deletion",
            summary.decisions, summary.vetoed, summary.targets
        )?;
        if summary.fuzzy_ran {
            writeln!(self.out, "▶ Renamed-file pass ran")?;
        }
        if applied {
            writeln!(self.out, "✅ Trashed {} file(s)", summary.trashed)
        } else {
            writeln!(self.out, "⚠️  Dry-run only; nothing was trashed.")
        }
    }

    fn json(&mut self, record: &FileRecord) -> io::Result<()> {
        if self.verbose {
            writeln!(self.out, "      JSON: {}", serde_json::to_string(record)?)?;
        }
        Ok(())
    }
}
