// qualis/src/render.rs
//
// Text rendering of reports, rule lists and profiles (comfy-table).

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use qualis_core::application::DatasetProfile;
use qualis_core::domain::{Report, Rule, RuleResult, RuleStatus};

fn new_table(header: Vec<&str>, plain: bool) -> Table {
    let mut table = Table::new();
    if plain {
        // No ANSI colours, even when stdout is a terminal
        table.force_no_tty();
    }
    table
        .load_preset(UTF8_FULL_CONDENSED)
        // Fixed layout: output does not depend on the terminal width
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(
            header
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
    table
}

fn align_right(table: &mut Table, columns: &[usize]) {
    for &index in columns {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn status_cell(status: RuleStatus) -> Cell {
    match status {
        RuleStatus::Pass => Cell::new("PASS").fg(Color::Green),
        RuleStatus::Fail => Cell::new("FAIL").fg(Color::Red),
        RuleStatus::Error => Cell::new("ERROR").fg(Color::Yellow),
    }
}

fn detail(result: &RuleResult) -> String {
    if let Some(error) = &result.error {
        return error.clone();
    }
    result
        .column_counts
        .iter()
        .map(|c| format!("{}: {}", c.column, c.violations))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the report as tables. `plain` drops colours, for files that
/// must compare byte for byte across runs.
pub fn report_text(report: &Report, plain: bool) -> String {
    let mut table = new_table(
        vec!["Rule", "Kind", "Status", "Examined", "Violations", "Detail"],
        plain,
    );
    for result in &report.results {
        table.add_row(vec![
            Cell::new(&result.rule),
            Cell::new(result.kind),
            status_cell(result.status),
            Cell::new(result.total_examined),
            Cell::new(result.violation_count),
            Cell::new(detail(result)),
        ]);
    }
    align_right(&mut table, &[3, 4]);

    let summary = report.summarize();
    let mut out = format!("Dataset: {}\n{}\n", report.dataset, table);

    let samples: Vec<_> = report.results.iter().flat_map(|r| &r.samples).collect();
    if !samples.is_empty() {
        let mut table = new_table(vec!["Rule", "Row", "Record"], plain);
        for sample in samples {
            let record = serde_json::to_string(&sample.record).unwrap_or_default();
            table.add_row(vec![
                Cell::new(&sample.rule),
                Cell::new(sample.row),
                Cell::new(record),
            ]);
        }
        align_right(&mut table, &[1]);
        out.push_str(&format!("Samples:\n{}\n", table));
    }

    out.push_str(&format!(
        "Summary: {} rules, {} passed, {} failed, {} errored -> {}\n",
        summary.total_rules,
        summary.passed,
        summary.failed,
        summary.errored,
        if report.passed() { "PASS" } else { "FAIL" }
    ));
    out
}

pub fn rules_text(rules: &[Rule]) -> String {
    let mut table = new_table(vec!["Rule", "Kind", "Check", "Description"], false);
    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.name()),
            Cell::new(rule.kind()),
            Cell::new(rule.check()),
            Cell::new(rule.description().unwrap_or("")),
        ]);
    }
    format!("{}\n", table)
}

pub fn profile_text(profile: &DatasetProfile) -> String {
    let mut table = new_table(vec!["Column", "Rows", "Nulls", "Distinct", "Complete"], false);
    for column in &profile.columns {
        table.add_row(vec![
            Cell::new(&column.column),
            Cell::new(column.rows),
            Cell::new(column.nulls),
            Cell::new(column.distinct),
            Cell::new(format!("{:.1}%", column.completeness() * 100.0)),
        ]);
    }
    align_right(&mut table, &[1, 2, 3, 4]);
    format!(
        "Dataset: {} ({} rows)\n{}\n",
        profile.dataset, profile.rows, table
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use qualis_core::application::ColumnProfile;
    use qualis_core::domain::{Record, Value};

    fn report() -> Report {
        let rule = Rule::completeness("order_id_complete", ["order_id"]).unwrap();
        let broken = Rule::completeness("ghost", ["nope"]).unwrap();
        let records = vec![
            Record::from_pairs([("order_id", Value::Integer(1))]),
            Record::from_pairs([("order_id", Value::Null)]),
        ];
        let results = vec![
            rule.evaluate(records, 5).unwrap(),
            RuleResult::errored(&broken, "unknown column 'nope'"),
        ];
        Report::completed("orders", results)
    }

    #[test]
    fn test_report_text_lists_rules_in_order() {
        let text = report_text(&report(), false);

        let first = text.find("order_id_complete").unwrap();
        let second = text.find("ghost").unwrap();
        assert!(first < second);
        assert!(text.contains("unknown column 'nope'"));
        assert!(text.contains("Samples:"));
        assert!(text.contains("Summary: 2 rules, 0 passed, 1 failed, 1 errored -> FAIL"));
    }

    #[test]
    fn test_report_text_is_deterministic() {
        assert_eq!(report_text(&report(), false), report_text(&report(), false));
    }

    #[test]
    fn test_plain_report_has_no_escape_codes() {
        let text = report_text(&report(), true);
        assert!(!text.contains('\u{1b}'));
        assert!(text.contains("FAIL"));
        assert_eq!(text, report_text(&report(), true));
    }

    #[test]
    fn test_profile_text() {
        let profile = DatasetProfile {
            dataset: "orders".into(),
            rows: 4,
            columns: vec![ColumnProfile {
                column: "order_id".into(),
                rows: 4,
                nulls: 1,
                distinct: 3,
            }],
        };
        let text = profile_text(&profile);
        assert!(text.starts_with("Dataset: orders (4 rows)"));
        assert!(text.contains("75.0%"));
    }
}
