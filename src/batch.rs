//! Running a list of test suites and combining their statuses.

use crate::error::Result;
use crate::filter::Filter;
use crate::runner::{run_target, Launcher, RunConfig, Target};
use crate::stanza::{description, first_line, Stanzas};
use std::cmp::Ordering;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Overall status contributed by a suite killed by a signal.
pub const SIGNAL_STATUS: i32 = 120;

/// Folds one suite's status into the overall status.
pub fn fold_status(overall: i32, status: i32) -> i32 {
    match status.cmp(&0) {
        Ordering::Greater => overall.max(status),
        Ordering::Less => overall.max(SIGNAL_STATUS),
        Ordering::Equal => overall,
    }
}

/// Resolves every executable's data file; fails on the first missing one.
pub fn resolve_targets<P: AsRef<Path>>(executables: &[P]) -> Result<Vec<Target>> {
    executables
        .iter()
        .map(|executable| Target::resolve(executable.as_ref()))
        .collect()
}

/// Runs each executable in order and returns the overall status.
///
/// Nothing is run unless every executable has a data file.
pub fn run_batch<P, L>(executables: &[P], filter: &Filter, config: &RunConfig, launcher: &mut L) -> Result<i32>
where
    P: AsRef<Path>,
    L: Launcher + ?Sized,
{
    let targets = resolve_targets(executables)?;

    let mut overall = 0;
    for target in &targets {
        let status = run_target(target, filter, config, launcher)?;
        match status.cmp(&0) {
            Ordering::Equal => info!("{}: passed", target.executable.display()),
            Ordering::Greater => warn!("{}: failed with status {}", target.executable.display(), status),
            Ordering::Less => warn!("{}: killed by signal {}", target.executable.display(), -status),
        }
        overall = fold_status(overall, status);
    }

    Ok(overall)
}

/// Writes the descriptions of the test cases each executable would run.
///
/// Returns the number of descriptions written.
pub fn list_batch<P, W>(executables: &[P], filter: &Filter, out: &mut W) -> Result<usize>
where
    P: AsRef<Path>,
    W: Write + ?Sized,
{
    let targets = resolve_targets(executables)?;

    let mut listed = 0;
    for target in &targets {
        let data = fs::read(&target.data_file)?;
        writeln!(out, "{}:", target.executable.display())?;
        let selected = Stanzas::new(&data).filter(|stanza| filter.matches(first_line(stanza)));
        for name in selected.filter_map(description) {
            out.write_all(b"    ")?;
            out.write_all(name)?;
            out.write_all(b"\n")?;
            listed += 1;
        }
    }
    out.flush()?;

    Ok(listed)
}
