use super::ui;
use crate::App;
use crate::store::Bundle;
use anyhow::Result;
use comfy_table::Cell;

/// Loads each bundle file into the record store.
pub fn run(app: &App, paths: &[String]) -> Result<()> {
    let store = app.store()?;
    let pb = ui::new_progress_bar(paths.len() as u64);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Records"),
        ui::header_cell("Series points"),
    ]);
    for path in paths {
        pb.set_message(path.clone());
        let bundle = Bundle::from_path(path)?;
        let summary = store.import(&bundle)?;
        table.add_row(vec![
            Cell::new(summary.symbol.as_str()),
            Cell::new(summary.records),
            summary
                .series_points
                .map_or(Cell::new("-"), Cell::new),
        ]);
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("{table}");
    Ok(())
}
