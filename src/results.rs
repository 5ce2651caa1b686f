//! Presentation of finished simulation runs.

use std::fmt::{self, Display};

use crate::miner::MinerId;

/// Floating point precision of results data.
pub const FLOAT_PRECISION_DIGITS: usize = 6;

/// Summary statistics of one simulation run, produced by
/// [Simulation::summary](crate::simulation::Simulation::summary).
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Simulated seconds on the clock when the summary was taken.
    pub time: f64,
    /// Blocks mined across the whole tree, genesis excluded.
    pub blocks: usize,
    /// Height of the heaviest block.
    pub best_height: u64,
    /// Chainwork of the heaviest block.
    pub best_chainwork: f64,
    /// Difficulty required of the next block on the heaviest tip.
    pub next_difficulty: f64,
    /// Blocks credited to each live miner, in miner order.
    pub blocks_by_miner: Vec<(MinerId, usize)>,
}

impl RunSummary {
    /// Average seconds per mined block. NaN when nothing was mined in zero
    /// time.
    pub fn mean_interval(&self) -> f64 {
        self.time / self.blocks as f64
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "time:            {:.3} s", self.time)?;
        writeln!(f, "blocks mined:    {}", self.blocks)?;
        writeln!(f, "best height:     {}", self.best_height)?;
        writeln!(f, "best chainwork:  {:.6e}", self.best_chainwork)?;
        writeln!(f, "next difficulty: {:.6e}", self.next_difficulty)?;
        writeln!(f, "mean interval:   {:.3} s", self.mean_interval())?;
        write!(f, "blocks by miner:")?;
        for (miner, count) in &self.blocks_by_miner {
            write!(f, " {}={}", miner, count)?;
        }
        Ok(())
    }
}

/// Describes the appearance of [GroupResults] as given by its [Display]
/// implementation.
#[derive(Debug, Clone, Copy, Default)]
pub enum Format {
    /// Comma-separated, without extra whitespace.
    Csv,
    /// Human-readable.
    #[default]
    PrettyPrint,
}

/// The summaries of a batch of replicated runs, as returned by
/// [SimulationGroup::run_all](crate::simulation::SimulationGroup::run_all).
#[derive(Debug, Clone)]
pub struct GroupResults {
    runs: Vec<RunSummary>,
    format: Format,
}

impl GroupResults {
    pub(crate) fn new(runs: Vec<RunSummary>) -> Self {
        GroupResults { runs, format: Format::default() }
    }

    /// Sets the output format used by [Display].
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;

        self
    }

    /// The per-replica summaries, in seed order.
    pub fn runs(&self) -> &[RunSummary] {
        &self.runs
    }

    pub fn into_runs(self) -> Vec<RunSummary> {
        self.runs
    }
}

impl Display for GroupResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = FLOAT_PRECISION_DIGITS;
        match self.format {
            Format::Csv => {
                write!(f, "run,time,blocks,best_height,next_difficulty,mean_interval")?;
                let miner_columns: &[(MinerId, usize)] = match self.runs.first() {
                    Some(run) => &run.blocks_by_miner,
                    None => &[],
                };
                for (miner, _) in miner_columns {
                    write!(f, ",miner_{}", miner)?;
                }
                writeln!(f)?;
                for (i, run) in self.runs.iter().enumerate() {
                    write!(
                        f,
                        "{},{:.p$},{},{},{:.p$e},{:.p$}",
                        i,
                        run.time,
                        run.blocks,
                        run.best_height,
                        run.next_difficulty,
                        run.mean_interval(),
                    )?;
                    for (_, count) in &run.blocks_by_miner {
                        write!(f, ",{}", count)?;
                    }
                    writeln!(f)?;
                }
            }
            Format::PrettyPrint => {
                writeln!(
                    f,
                    "{:>4} {:>14} {:>8} {:>8} {:>16} {:>10}  blocks by miner",
                    "run", "time (s)", "blocks", "height", "next diff", "interval",
                )?;
                for (i, run) in self.runs.iter().enumerate() {
                    write!(
                        f,
                        "{:>4} {:>14.3} {:>8} {:>8} {:>16.6e} {:>10.3} ",
                        i,
                        run.time,
                        run.blocks,
                        run.best_height,
                        run.next_difficulty,
                        run.mean_interval(),
                    )?;
                    for (miner, count) in &run.blocks_by_miner {
                        write!(f, " {}={}", miner, count)?;
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::miner::MinerId;

    use super::{Format, GroupResults, RunSummary};

    fn sample() -> RunSummary {
        RunSummary {
            time: 86400.0,
            blocks: 144,
            best_height: 140,
            best_chainwork: 1.44e21,
            next_difficulty: 1.0e19,
            blocks_by_miner: vec![
                (MinerId::from(1), 100),
                (MinerId::from(2), 44),
            ],
        }
    }

    #[test]
    fn mean_interval_divides_time_by_blocks() {
        assert_eq!(sample().mean_interval(), 600.0);
    }

    #[test]
    fn csv_has_one_line_per_run_plus_header() {
        let out = GroupResults::new(vec![sample(), sample()])
            .format(Format::Csv)
            .to_string();
        assert_eq!(out.trim_end().lines().count(), 3);
        assert!(out.starts_with("run,time,blocks"));
    }
}
