//! Terminal output.
//!
//! The report is the only mandated surface: a start banner naming the
//! targets, one line per check in declaration order, then the tally and a
//! binary verdict.
//!
//! # Graceful Degradation
//!
//! - Non-TTY output: color disabled via `--no-color`, `NO_COLOR` or detection
//! - Empty reports: produce a valid banner and a PASS verdict
//! - Cancelled runs: the verdict says so and counts the checks never started

use crate::checks::{Suite, Target};
use crate::engine::result::{CheckResult, RunReport};
use crate::Status;

const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format a run report into a string
    fn format(&self, report: &RunReport) -> String;
}

/// Terminal (human-readable) formatter
pub struct TerminalFormatter {
    color: bool,
    verbose: bool,
}

impl TerminalFormatter {
    pub fn new(color: bool, verbose: bool) -> Self {
        TerminalFormatter { color, verbose }
    }

    fn colorize(&self, text: &str, color_code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.colorize(text, "32")
    }

    fn yellow(&self, text: &str) -> String {
        self.colorize(text, "33")
    }

    fn red(&self, text: &str) -> String {
        self.colorize(text, "31")
    }

    fn gray(&self, text: &str) -> String {
        self.colorize(text, "90")
    }

    fn bold(&self, text: &str) -> String {
        self.colorize(text, "1")
    }

    fn status_tag(&self, status: Status) -> String {
        match status {
            Status::Pass => self.green(status.tag()),
            Status::Warn => self.yellow(status.tag()),
            Status::Fail => self.red(status.tag()),
            Status::Skip => self.gray(status.tag()),
        }
    }

    /// One report line, without the trailing newline.
    pub fn format_result(&self, result: &CheckResult) -> String {
        let mut line = format!(
            "  {} {} {}: {}",
            self.status_tag(result.status()),
            result.check_id(),
            result.description(),
            result.message()
        );
        if self.verbose {
            let detail = match result.kind() {
                Some(kind) => format!(" [{}, {}ms]", kind, result.duration_ms()),
                None => format!(" [{}ms]", result.duration_ms()),
            };
            line.push_str(&self.gray(&detail));
        }
        line
    }
}

impl OutputFormatter for TerminalFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();
        let context = report.context();

        // Header
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!("verigate release gate: {}\n", report.suite()));
        output.push_str(&format!("Backend:  {}\n", context.base_url));
        output.push_str(&format!("Frontend: {}\n", context.frontend_url));
        output.push_str(&format!("Root:     {}\n", context.root.display()));
        output.push_str(&format!("Entity:   {}\n", context.entity));
        output.push_str(RULE);
        output.push_str("\n\n");

        for result in report.results() {
            output.push_str(&self.format_result(result));
            output.push('\n');
        }
        if !report.results().is_empty() {
            output.push('\n');
        }

        // Summary
        let summary = report.summary();
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!(
            "SUMMARY: {} passed, {} warnings, {} failed, {} skipped ({} of {} checks)\n",
            summary.passed,
            summary.warned,
            summary.failed,
            summary.skipped,
            summary.total,
            report.declared()
        ));

        let warnings = report.warnings();
        if !warnings.is_empty() {
            let ids: Vec<&str> = warnings.iter().map(|r| r.check_id()).collect();
            output.push_str(&self.yellow(&format!(
                "WARNINGS: {} advisory check(s) did not hold: {}",
                warnings.len(),
                ids.join(", ")
            )));
            output.push('\n');
        }

        if report.is_cancelled() {
            let never_started = report.declared().saturating_sub(report.results().len());
            output.push_str(&self.yellow(&format!(
                "CANCELLED: {} check(s) never started",
                never_started
            )));
            output.push('\n');
        }

        output.push_str(&format!(
            "Total time: {:.1}s\n",
            report.total_duration_ms() as f64 / 1000.0
        ));

        let verdict = if report.is_success() {
            self.green("VERDICT: PASS")
        } else {
            self.red("VERDICT: FAIL")
        };
        output.push_str(&format!(
            "{} (exit code {})\n",
            self.bold(&verdict),
            report.exit_code()
        ));
        output.push_str(RULE);

        output
    }
}

/// Listing for `--list`: one entry per check in declaration order.
pub fn format_check_list(suite: &Suite) -> String {
    let mut output = format!("Suite: {} ({} checks)\n", suite.name(), suite.len());
    if let Some(primary) = suite.primary() {
        output.push_str(&format!("Primary artifact: {}\n", primary));
    }
    output.push('\n');

    for check in suite.checks() {
        output.push_str(&format!(
            "{:<10} {:<9} {}\n",
            check.id,
            format!("[{}]", check.severity),
            check.description
        ));
        let target = match &check.target {
            Target::File { path } => format!("file {}", path),
            Target::Endpoint(endpoint) => format!("{} {}", endpoint.method, endpoint.url),
        };
        output.push_str(&format!("           target:    {}\n", target));
        if !check.target.is_endpoint() {
            output.push_str(&format!("           region:    {}\n", check.region.describe()));
        }
        output.push_str(&format!(
            "           predicate: {}\n",
            check.predicate.describe()
        ));
        if let Some(dep) = &check.depends_on {
            output.push_str(&format!("           after:     {}\n", dep));
        }
    }

    output
}
