//! Deployment summary for operators

use std::fmt::Write;
use std::path::Path;

use colored::Colorize;

use crate::errors::FleetError;
use crate::filesys::file::File;
use crate::models::outcome::FleetResult;

/// Per-device pass/fail table followed by a totals line
pub fn render_summary(result: &FleetResult) -> String {
    let host_width = result
        .outcomes
        .iter()
        .map(|o| o.target.host().len())
        .max()
        .unwrap_or(0)
        .max("DEVICE".len());

    let mut out = String::new();
    let _ = writeln!(out, "\nDeployment Summary:");
    let _ = writeln!(
        out,
        "{:<host_width$}  {:<7}  {:<15}  {:>8}  DETAIL",
        "DEVICE", "RESULT", "STAGE", "ATTEMPTS"
    );

    for outcome in &result.outcomes {
        let status = if outcome.success {
            format!("{:<7}", "SUCCESS").green()
        } else {
            format!("{:<7}", "FAILED").red()
        };
        let _ = writeln!(
            out,
            "{:<host_width$}  {}  {:<15}  {:>8}  {}",
            outcome.target.host(),
            status,
            outcome.stage.as_str(),
            outcome.attempts,
            outcome.error.as_deref().unwrap_or("")
        );
    }

    let total = result.outcomes.len();
    let line = format!("{}/{} device(s) updated", result.succeeded(), total);
    let _ = writeln!(
        out,
        "\n{}",
        if result.overall {
            line.green().bold()
        } else {
            line.red().bold()
        }
    );

    out
}

/// Write the fleet result as pretty JSON
pub async fn write_report(path: &Path, result: &FleetResult) -> Result<(), FleetError> {
    File::new(path).write_json(result).await
}
