//! Printing check results.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use std::io::Write;

use crate::checks::{CheckResult, CheckStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn write_report(out: &mut dyn Write, results: &[CheckResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => write_text(out, results),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, results)?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn write_text(out: &mut dyn Write, results: &[CheckResult]) -> Result<()> {
    for result in results {
        let status = match result.status {
            CheckStatus::Passed => result.status.to_string().green().bold(),
            CheckStatus::Failed => result.status.to_string().red().bold(),
            CheckStatus::Errored => result.status.to_string().magenta().bold(),
            CheckStatus::Skipped => result.status.to_string().yellow(),
        };
        writeln!(
            out,
            "[{status}] {} - {} ({:.1}s)",
            result.check_id.bold(),
            result.description,
            result.duration.as_secs_f64()
        )?;
        for line in result.message.lines() {
            writeln!(out, "    {}", line.dimmed())?;
        }
    }

    let count = |status: CheckStatus| results.iter().filter(|r| r.status == status).count();
    writeln!(
        out,
        "\n{} passed, {} failed, {} errored, {} skipped",
        count(CheckStatus::Passed),
        count(CheckStatus::Failed),
        count(CheckStatus::Errored),
        count(CheckStatus::Skipped)
    )?;
    Ok(())
}

/// 0 when nothing failed or errored, 1 otherwise.
pub fn exit_code(results: &[CheckResult]) -> i32 {
    i32::from(results.iter().any(CheckResult::is_bad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(id: &str, status: CheckStatus, message: &str) -> CheckResult {
        CheckResult {
            check_id: id.to_string(),
            description: "Sniff boot".to_string(),
            status,
            message: message.to_string(),
            duration: Duration::from_secs(2),
        }
    }

    fn render(results: &[CheckResult], format: OutputFormat) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_report(&mut out, results, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_report_lists_results_and_summary() {
        let results = [
            result("host", CheckStatus::Passed, "boot settled"),
            result("firmware-shell", CheckStatus::Failed, "firmware assert\nhit value=Aborting!"),
        ];
        let text = render(&results, OutputFormat::Text);

        assert!(text.contains("[PASS] host - Sniff boot (2.0s)"));
        assert!(text.contains("[FAIL] firmware-shell"));
        assert!(text.contains("    hit value=Aborting!"));
        assert!(text.contains("1 passed, 1 failed, 0 errored, 0 skipped"));
    }

    #[test]
    fn test_json_report_is_array() {
        let results = [result("host", CheckStatus::Skipped, "simulated target")];
        let json: serde_json::Value =
            serde_json::from_str(&render(&results, OutputFormat::Json)).unwrap();
        assert_eq!(json[0]["status"], "skipped");
        assert_eq!(json[0]["message"], "simulated target");
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(&[result("host", CheckStatus::Passed, "")]), 0);
        assert_eq!(exit_code(&[result("host", CheckStatus::Skipped, "")]), 0);
        assert_eq!(exit_code(&[result("host", CheckStatus::Errored, "")]), 1);
        assert_eq!(
            exit_code(&[
                result("host", CheckStatus::Passed, ""),
                result("host", CheckStatus::Failed, "")
            ]),
            1
        );
    }
}
