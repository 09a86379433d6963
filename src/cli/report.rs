//! Text rendering of a stream scan.

#[cfg(feature = "colorized_output")]
use console::style;

#[cfg(feature = "colorized_output")]
use vaspio::stream::StreamKind;
use vaspio::stream::StreamReport;

/// Plain report, one line per recorded trigger
pub fn format_plain(file: &str, report: &StreamReport) -> String {
    let mut output = String::new();
    output.push_str("VASP Stream Report\n");
    output.push_str("==================\n");
    output.push_str(&format!("File: {}\n\n", file));

    for entry in report.entries() {
        output.push_str(&format!("{}\n", entry));
        if let Some(suggestion) = &entry.suggestion {
            output.push_str(&format!("    {}\n", suggestion));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "Summary: {} errors, {} warnings\n",
        report.errors().count(),
        report.warnings().count()
    ));
    output
}

/// Report with colors (requires console feature)
///
/// Falls back to the plain report when the terminal has no color support.
pub fn format_colored(file: &str, report: &StreamReport) -> String {
    #[cfg(feature = "colorized_output")]
    {
        if !console::colors_enabled() {
            return format_plain(file, report);
        }

        let mut output = String::new();
        output.push_str(&format!("{}\n", style("VASP Stream Report").bold().cyan()));
        output.push_str(&format!("{}\n", style("==================").cyan()));
        output.push_str(&format!("{}: {}\n\n", style("File").bold(), file));

        for entry in report.entries() {
            let kind = match entry.kind {
                StreamKind::Error => style(entry.kind.to_string()).red().bold(),
                StreamKind::Warning => style(entry.kind.to_string()).yellow().bold(),
            };
            output.push_str(&format!(
                "({}) {}: {}\n",
                kind,
                style(&entry.shortname).bold(),
                entry.message
            ));
            if let Some(suggestion) = &entry.suggestion {
                output.push_str(&format!("    {}\n", style(suggestion).dim()));
            }
        }

        output.push('\n');
        output.push_str(&format!(
            "{}: {} errors, {} warnings\n",
            style("Summary").bold(),
            style(report.errors().count()).red(),
            style(report.warnings().count()).yellow()
        ));
        output
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        format_plain(file, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaspio::stream::StreamScanner;

    #[test]
    fn test_plain_report() {
        let scanner = StreamScanner::new().unwrap();
        let report = scanner.scan_str(" running on 4 total cores\n internal error in subroutine IBZKPT\n");
        let text = format_plain("stdout", &report);

        assert!(text.contains("File: stdout\n"));
        assert!(text.contains("(ERROR) ibzkpt: Error with the k-points.\n"));
        assert!(text.ends_with("Summary: 1 errors, 0 warnings\n"));
        assert!(!text.contains("nostart"));
    }
}
