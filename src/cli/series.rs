use super::ui;
use crate::App;
use crate::core::chart::ChartData;
use crate::core::series::{SeriesRange, get_series};
use crate::core::symbol::Symbol;
use anyhow::Result;
use comfy_table::Cell;

/// Rows shown in the table before older points are elided.
const TABLE_ROWS: usize = 20;

pub fn display_as_table(symbol: &Symbol, range: SeriesRange, chart: &ChartData) -> String {
    if chart.points.is_empty() {
        return ui::style_text(
            &format!("{symbol}: no price data for {range}"),
            ui::StyleType::Error,
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Open"),
        ui::header_cell("High"),
        ui::header_cell("Low"),
        ui::header_cell("Close"),
        ui::header_cell("Volume"),
    ]);
    let skip = chart.points.len().saturating_sub(TABLE_ROWS);
    for point in &chart.points[skip..] {
        table.add_row(vec![
            Cell::new(point.time.to_string()),
            ui::number_cell(point.open),
            ui::number_cell(point.high),
            ui::number_cell(point.low),
            ui::number_cell(point.close),
            point.volume.map_or(Cell::new(""), ui::number_cell),
        ]);
    }

    let closes: Vec<f64> = chart.points.iter().map(|p| p.close).collect();
    let mut output = format!(
        "{} {}\n{}\n",
        ui::style_text(symbol.as_str(), ui::StyleType::Title),
        ui::style_text(&range.to_string(), ui::StyleType::Subtle),
        ui::sparkline(&closes, ui::terminal_width().saturating_sub(2)),
    );
    if skip > 0 {
        output.push_str(&ui::style_text(
            &format!("... {skip} earlier points\n"),
            ui::StyleType::Subtle,
        ));
    }
    output.push_str(&table.to_string());

    if let (Some(price), Some(change)) = (chart.summary.current_price, chart.summary.change_pct) {
        output.push_str(&format!(
            "\n\n{} {} ({})",
            ui::style_text("Last close:", ui::StyleType::Label),
            ui::format_number(price),
            ui::change_cell(change).content()
        ));
    }
    output
}

pub async fn run(app: &App, symbol: &str, range: Option<&str>, json: bool) -> Result<()> {
    let symbol = Symbol::parse(symbol)?;
    let range = match range {
        Some(r) => r.parse()?,
        None => app.config.series.default_range,
    };
    let provider = app.series_provider()?;

    let pb = ui::new_spinner(&format!("Fetching {range} series for {symbol}..."));
    let report = get_series(provider.as_ref(), &symbol, range).await;
    pb.finish_and_clear();
    let report = report?;

    let chart = ChartData::from_series(&report.series);
    if json {
        println!("{}", serde_json::to_string_pretty(&chart.points)?);
    } else {
        println!("{}", display_as_table(&symbol, range, &chart));
        if report.dropped > 0 {
            println!(
                "{}",
                ui::style_text(
                    &format!("{} malformed points dropped", report.dropped),
                    ui::StyleType::Subtle
                )
            );
        }
    }
    Ok(())
}
