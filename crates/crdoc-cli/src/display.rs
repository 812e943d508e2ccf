//! Terminal output helpers

use console::style;
use crdoc_indexer::{IndexSummary, UnitReport};

/// Print one line per unit, then the totals
pub fn print_summary(summary: &IndexSummary) {
    for report in &summary.reports {
        print_report(report);
    }

    println!();
    let failed = summary.failed();
    let totals = format!(
        "{} indexed, {} failed, {} found, {} inserted",
        pluralize(summary.succeeded(), "unit", "units"),
        failed,
        pluralize(summary.crds_found(), "CRD", "CRDs"),
        summary.rows_inserted()
    );
    if failed == 0 {
        println!("{}", style(totals).green().bold());
    } else {
        println!("{}", style(totals).yellow().bold());
    }
}

fn print_report(report: &UnitReport) {
    match &report.error {
        None => {
            let mut line = format!(
                "{}, {} ({} new)",
                pluralize(report.tags_indexed, "tag", "tags"),
                pluralize(report.crds_found, "CRD", "CRDs"),
                report.rows_inserted
            );
            if report.tags_failed > 0 {
                line.push_str(&format!(", {} skipped", report.tags_failed));
            }
            println!("{} {} {}", style("✓").green(), report.unit, style(line).dim());
        }
        Some(error) => {
            println!(
                "{} {} failed after '{}': {}",
                style("✗").red(),
                report.unit,
                report.state,
                style(error).red()
            );
        }
    }
}

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "tag", "tags"), "1 tag");
        assert_eq!(pluralize(0, "tag", "tags"), "0 tags");
        assert_eq!(pluralize(3, "CRD", "CRDs"), "3 CRDs");
    }
}
