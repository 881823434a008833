use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use common::{
    error::ParseError,
    series::{NamedSeries, Sample},
};
use itertools::Itertools;
use tracing::{debug, trace};

/// Lines starting with this are skipped; data starts after the first one
pub const WARMUP_MARKER: &str = "Warmup";

/// Splits a benchmark log into labelled series.
///
/// Everything before the first line starting with [`WARMUP_MARKER`] is
/// ignored. After it, a line of exactly two comma separated fields is an
/// `item_count,time_ms` sample for the current series and any other line
/// starts a new series named after the line. A label with no samples is
/// dropped unless it is the last one in the file.
///
/// Labels are the line text without its `\n` or `\r\n` terminator.
pub fn parse_log<R: BufRead>(reader: R) -> Result<Vec<NamedSeries>, ParseError> {
    let mut tests = Vec::new();
    let mut started = false;
    let mut current = NamedSeries::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with(WARMUP_MARKER) {
            started = true;
            continue;
        }
        if !started {
            continue;
        }

        match line.split(',').collect_tuple() {
            Some((item_count, time)) => current.push(parse_sample(idx + 1, item_count, time)?),
            None => {
                trace!("New series {line:?} at line {}", idx + 1);
                let finished = std::mem::replace(&mut current, NamedSeries::new(line));
                if !finished.is_empty() {
                    tests.push(finished);
                }
            }
        }
    }

    if started {
        tests.push(current);
    } else {
        debug!("No {WARMUP_MARKER:?} marker found");
    }
    Ok(tests)
}

pub fn parse_log_file(path: &Path) -> Result<Vec<NamedSeries>, ParseError> {
    let file = File::open(path)?;
    parse_log(BufReader::new(file))
}

fn parse_sample(line: usize, item_count: &str, time: &str) -> Result<Sample, ParseError> {
    let item_count = item_count
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidItemCount {
            line,
            value: item_count.to_owned(),
        })?;
    let time = time
        .trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidTime {
            line,
            value: time.to_owned(),
        })?;
    Ok(Sample::new(item_count, time))
}
