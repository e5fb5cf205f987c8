//! Boot times from the summary printed by `systemd-analyze time`.
//!
//! The first line of the output looks like:
//!
//! ```text
//! Startup finished in 4.096s (firmware) + 1.232s (loader) + 2.1s (kernel) + 1min 3.2s (userspace) = 1min 10.628s
//! ```
//!
//! Stages systemd could not measure are simply missing from the line.

use std::{process::Command, time::Duration};

use log::{debug, trace};

use super::BootTimeSource;
use crate::{
    error::{Error, Result},
    model::{BootTimeStage, RetrievalMethod, StageDurations},
    utils::parse_duration,
};

const STAGE_MARKERS: [(&str, BootTimeStage); 5] = [
    ("(firmware)", BootTimeStage::Firmware),
    ("(loader)", BootTimeStage::Loader),
    ("(kernel)", BootTimeStage::Kernel),
    ("(initrd)", BootTimeStage::Initrd),
    ("(userspace)", BootTimeStage::Userspace),
];
const TOTAL_MARKER: &str = "=";

// =============================================================================
// Public Interface
// =============================================================================

#[derive(Debug, Clone)]
pub struct SystemdAnalyze {
    program: String,
    args: Vec<String>,
}

impl SystemdAnalyze {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        SystemdAnalyze {
            program: program.into(),
            args,
        }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn run(&self) -> Result<String> {
        let command_err = |reason: String| Error::Command {
            command: self.command_line(),
            reason,
        };

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| command_err(e.to_string()))?;
        if !output.status.success() {
            return Err(command_err(format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl BootTimeSource for SystemdAnalyze {
    fn method(&self) -> RetrievalMethod {
        RetrievalMethod::TextSummary
    }

    fn retrieve(&self) -> Result<StageDurations> {
        let output = self.run()?;
        debug!("`{}`: {}", self.command_line(), output.trim_end());
        parse_analyze_output(&output)
    }
}

/// Parse the first line of the `systemd-analyze time` output.
///
/// Each stage value is the duration right before its `(stage)` marker and the
/// total is the duration right after the `=` sign. A value may span several
/// tokens (`1min 3.2s`); they are added up.
pub fn parse_analyze_output(output: &str) -> Result<StageDurations> {
    if output.trim().is_empty() {
        return Err(Error::EmptyInput);
    }
    let line = output.lines().next().unwrap_or_default();
    let words: Vec<&str> = line.split_whitespace().collect();

    let mut record = StageDurations::default();
    for (idx, word) in words.iter().enumerate() {
        if let Some(&(marker, stage)) = STAGE_MARKERS.iter().find(|(m, _)| word.contains(m)) {
            if idx == 0 {
                return Err(Error::malformed(
                    "systemd-analyze output",
                    format!("no value before `{}`", marker),
                ));
            }
            let value = sum_durations(words[..idx].iter().rev())?;
            trace!("{}: {:?}", stage, value);
            *stage_mut(&mut record, stage) = value;
        } else if word.contains(TOTAL_MARKER) {
            if idx + 1 >= words.len() {
                return Err(Error::malformed(
                    "systemd-analyze output",
                    format!("no value after `{}`", TOTAL_MARKER),
                ));
            }
            record.total = sum_durations(words[idx + 1..].iter())?;
            trace!("total: {:?}", record.total);
        }
    }
    Ok(record)
}

// =============================================================================
// Private Implementation
// =============================================================================

/// Add up the duration tokens at the front of `tokens`, stopping at the first
/// one that is not a duration. The first token must be a duration.
fn sum_durations<'a, 'b: 'a, I>(mut tokens: I) -> Result<Duration>
where
    I: Iterator<Item = &'a &'b str>,
{
    let first = tokens.next().copied().unwrap_or_default();
    let mut total =
        parse_duration(first).map_err(|reason| Error::malformed("systemd-analyze output", reason))?;
    for token in tokens {
        match parse_duration(token) {
            Ok(value) => total += value,
            Err(_) => break,
        }
    }
    Ok(total)
}

fn stage_mut(record: &mut StageDurations, stage: BootTimeStage) -> &mut Duration {
    match stage {
        BootTimeStage::Firmware => &mut record.firmware,
        BootTimeStage::Loader => &mut record.loader,
        BootTimeStage::Kernel => &mut record.kernel,
        BootTimeStage::Initrd => &mut record.initrd,
        BootTimeStage::Userspace => &mut record.userspace,
        BootTimeStage::Total => &mut record.total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_every_stage() {
        let record = parse_analyze_output(
            "1.5s (firmware) + 2.5s (loader) + 0.1s (kernel) + 0s (initrd) + 3s (userspace) = 7.1s",
        )
        .unwrap();
        assert_eq!(
            record,
            StageDurations {
                firmware: Duration::from_millis(1_500),
                loader: Duration::from_millis(2_500),
                kernel: Duration::from_millis(100),
                initrd: Duration::ZERO,
                userspace: Duration::from_secs(3),
                total: Duration::from_millis(7_100),
            }
        );
    }

    #[test]
    fn parses_real_output() {
        let output = "Startup finished in 4.096s (firmware) + 1.232s (loader) + 2.100s (kernel) + 1min 3.200s (userspace) = 1min 10.628s\n\
                      graphical.target reached after 1min 3.100s in userspace.\n";
        let record = parse_analyze_output(output).unwrap();
        assert_eq!(record.firmware, Duration::from_millis(4_096));
        assert_eq!(record.kernel, Duration::from_millis(2_100));
        assert_eq!(record.initrd, Duration::ZERO);
        assert_eq!(record.userspace, Duration::from_millis(63_200));
        assert_eq!(record.total, Duration::from_millis(70_628));
    }

    #[test]
    fn missing_stages_are_zero() {
        let record = parse_analyze_output("Startup finished in = 812ms").unwrap();
        assert_eq!(
            record,
            StageDurations {
                total: Duration::from_millis(812),
                ..Default::default()
            }
        );
    }

    #[test]
    fn empty_output_is_an_error() {
        assert_eq!(
            parse_analyze_output("").unwrap_err().kind(),
            ErrorKind::EmptyInput
        );
        assert_eq!(
            parse_analyze_output("\n\n").unwrap_err().kind(),
            ErrorKind::EmptyInput
        );
    }

    #[test]
    fn markers_at_the_line_edges_are_malformed() {
        assert_eq!(
            parse_analyze_output("(kernel) + 2s (userspace) = 2s")
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedData
        );
        assert_eq!(
            parse_analyze_output("1s (kernel) =").unwrap_err().kind(),
            ErrorKind::MalformedData
        );
    }

    #[test]
    fn unparsable_values_are_malformed() {
        assert_eq!(
            parse_analyze_output("fast (kernel) = 2s")
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedData
        );
        assert_eq!(
            parse_analyze_output("340282366920938463463374607431768211.999us (kernel) = 2s")
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedData
        );
    }

    #[test]
    fn runs_the_command() {
        let source = SystemdAnalyze::new(
            "echo",
            vec!["2s (kernel) + 3s (userspace) = 5s".to_string()],
        );
        let record = source.retrieve().unwrap();
        assert_eq!(record.kernel, Duration::from_secs(2));
        assert_eq!(record.total, Duration::from_secs(5));
    }

    #[test]
    fn failing_command_is_reported() {
        let source = SystemdAnalyze::new("false", vec![]);
        assert_eq!(source.retrieve().unwrap_err().kind(), ErrorKind::Io);
    }
}
