use super::ui;
use crate::core::chart::PriceSummary;
use crate::core::metrics::DerivedMetrics;
use crate::core::snapshot::{SkippedDomain, Snapshot};
use crate::core::symbol::Symbol;
use crate::dashboard::{SnapshotOutcome, SymbolView, load_view};
use crate::App;
use anyhow::Result;
use comfy_table::{Cell, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOutput<'a> {
    snapshot: &'a Snapshot,
    metrics: &'a DerivedMetrics,
    price: &'a PriceSummary,
    skipped: &'a [SkippedDomain],
}

fn section_table(value: &Value) -> Option<Table> {
    let fields = value.as_object().filter(|f| !f.is_empty())?;
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);
    for (name, value) in fields {
        if value.is_null() {
            continue;
        }
        table.add_row(vec![Cell::new(name), Cell::new(ui::format_value(value))]);
    }
    Some(table)
}

fn metrics_table(view: &SymbolView, metrics: &DerivedMetrics) -> Option<Table> {
    let mut rows: Vec<(&str, Cell)> = Vec::new();
    if let Some(price) = view.chart.summary.current_price {
        rows.push(("Last close", ui::number_cell(price)));
    }
    let changes = [
        ("Change vs previous close (series)", view.chart.summary.change_pct),
        ("Day change", metrics.day_change_pct),
        ("Change vs previous close", metrics.change_from_prev_close_pct),
        ("Implied upside", metrics.implied_upside_pct),
        ("Series CAGR", metrics.series_cagr_pct),
    ];
    for (label, value) in changes {
        if let Some(v) = value {
            rows.push((label, ui::change_cell(v)));
        }
    }
    let levels = [
        ("SMA 20", metrics.sma_20),
        ("SMA 50", metrics.sma_50),
        ("Range high", metrics.range_high),
        ("Range low", metrics.range_low),
        ("Avg volume 10d", metrics.average_volume_10d),
        ("Avg volume 30d", metrics.average_volume_30d),
    ];
    for (label, value) in levels {
        if let Some(v) = value {
            rows.push((label, ui::number_cell(v)));
        }
    }
    if rows.is_empty() {
        return None;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
    for (label, cell) in rows {
        table.add_row(vec![Cell::new(label), cell]);
    }
    Some(table)
}

impl SymbolView {
    /// Renders the available sections; absent sections are left out.
    pub fn display_as_tables(&self) -> String {
        let (report, metrics) = match &self.outcome {
            SnapshotOutcome::Found { report, metrics } => (report, metrics),
            SnapshotOutcome::NotFound => {
                return ui::style_text(&format!("{}: no data", self.symbol), ui::StyleType::Error);
            }
            SnapshotOutcome::Failed(reason) => {
                return ui::style_text(
                    &format!("{}: unavailable ({reason})", self.symbol),
                    ui::StyleType::Error,
                );
            }
        };

        let snapshot = &report.snapshot;
        let mut output = format!(
            "{} {}\n{}\n",
            ui::style_text(&snapshot.identifiers.symbol, ui::StyleType::Title),
            ui::style_text(&snapshot.metadata.company_name, ui::StyleType::Label),
            ui::style_text(
                &format!(
                    "{} · {} · updated {}",
                    snapshot.identifiers.exchange,
                    snapshot.identifiers.currency,
                    snapshot.last_updated_at.format("%Y-%m-%d %H:%M UTC")
                ),
                ui::StyleType::Subtle
            ),
        );

        if let Some(table) = metrics_table(self, metrics) {
            output.push_str(&format!("\n{}\n", table));
        }

        let value = serde_json::to_value(snapshot).unwrap_or(Value::Null);
        if let Some(sections) = value.as_object() {
            for (name, section) in sections {
                if !section.is_object() {
                    continue;
                }
                if let Some(table) = section_table(section) {
                    output.push_str(&format!(
                        "\n{}\n{}\n",
                        ui::style_text(name, ui::StyleType::Label),
                        table
                    ));
                }
            }
        }

        if let Some(warning) = report.partial_warning() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(&warning.to_string(), ui::StyleType::Warning)
            ));
        }
        if let Some(error) = &self.series_error {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(&format!("series unavailable: {error}"), ui::StyleType::Warning)
            ));
        }
        output
    }

    /// JSON document for scripting; `None` when there is no snapshot.
    pub fn to_json(&self) -> Result<Option<String>> {
        let SnapshotOutcome::Found { report, metrics } = &self.outcome else {
            return Ok(None);
        };
        let output = SnapshotOutput {
            snapshot: &report.snapshot,
            metrics,
            price: &self.chart.summary,
            skipped: &report.skipped,
        };
        Ok(Some(serde_json::to_string_pretty(&output)?))
    }
}

pub async fn run(app: &App, symbol: &str, json: bool) -> Result<()> {
    let symbol = Symbol::parse(symbol)?;
    let aggregator = app.aggregator()?;
    let series = app.series_provider()?;

    let pb = ui::new_spinner(&format!("Loading {symbol}..."));
    let view = load_view(
        &aggregator,
        series.as_ref(),
        &symbol,
        app.config.series.default_range,
    )
    .await;
    pb.finish_and_clear();

    if json {
        match view.to_json()? {
            Some(doc) => println!("{doc}"),
            None => println!("{}", view.display_as_tables()),
        }
    } else {
        println!("{}", view.display_as_tables());
    }

    if let SnapshotOutcome::Failed(reason) = &view.outcome {
        anyhow::bail!("Snapshot for {} unavailable: {}", symbol, reason);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chart::ChartData;
    use crate::core::snapshot::SnapshotReport;
    use crate::core::snapshot::tests::bare_snapshot;
    use crate::core::records::Quote;

    fn view_with(snapshot: Snapshot) -> SymbolView {
        SymbolView {
            symbol: Symbol::parse("NVDA").unwrap(),
            outcome: SnapshotOutcome::Found {
                report: Box::new(SnapshotReport {
                    snapshot,
                    skipped: Vec::new(),
                }),
                metrics: DerivedMetrics::default(),
            },
            chart: ChartData::default(),
            dropped_points: 0,
            series_error: None,
        }
    }

    #[test]
    fn test_absent_sections_are_not_rendered() {
        let output = console::strip_ansi_codes(&view_with(bare_snapshot("NVDA")).display_as_tables())
            .to_string();
        assert!(output.contains("NVIDIA Corporation"));
        assert!(output.contains("identifiers"));
        assert!(!output.contains("quote"));
        assert!(!output.contains("esg"));
        assert!(!output.contains("Metric"));
    }

    #[test]
    fn test_present_fields_are_rendered() {
        let mut snapshot = bare_snapshot("NVDA");
        let quote: Quote = serde_json::from_value(serde_json::json!({
            "last": 181.25,
            "lastTimestamp": "2026-10-16T20:00:00Z",
            "prevClose": 179.0
        }))
        .unwrap();
        snapshot.quote = Some(quote);
        let output =
            console::strip_ansi_codes(&view_with(snapshot).display_as_tables()).to_string();
        assert!(output.contains("quote"));
        assert!(output.contains("prevClose"));
        assert!(output.contains("181.25"));
        assert!(!output.contains("high52Week"));
    }

    #[test]
    fn test_not_found_prints_no_data() {
        let view = SymbolView {
            outcome: SnapshotOutcome::NotFound,
            ..view_with(bare_snapshot("NVDA"))
        };
        let output = console::strip_ansi_codes(&view.display_as_tables()).to_string();
        assert_eq!(output, "NVDA: no data");
        assert!(view.to_json().unwrap().is_none());
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let doc = view_with(bare_snapshot("NVDA")).to_json().unwrap().unwrap();
        let value: Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(value["snapshot"]["identifiers"]["symbol"], "NVDA");
        assert!(value["snapshot"].get("quote").is_none());
        assert_eq!(value["metrics"], serde_json::json!({}));
        assert_eq!(value["price"], serde_json::json!({}));
    }
}
