use super::ui;
use crate::App;
use crate::core::chart::{ChartPoint, ChartSurface};
use crate::core::symbol::Symbol;
use crate::dashboard::{Dashboard, Screen, SymbolView};
use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Prints each applied view followed by a sparkline of its chart.
pub struct TerminalScreen<W: Write + Send + 'static> {
    out: W,
    chart: Vec<ChartPoint>,
    width: usize,
}

impl<W: Write + Send + 'static> TerminalScreen<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            chart: Vec::new(),
            width,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }
}

impl<W: Write + Send + 'static> ChartSurface for TerminalScreen<W> {
    fn clear(&mut self) {
        self.chart.clear();
    }

    fn set_data(&mut self, points: &[ChartPoint]) {
        self.chart.extend_from_slice(points);
    }
}

impl<W: Write + Send + 'static> Screen for TerminalScreen<W> {
    fn show(&mut self, view: &SymbolView) {
        let closes: Vec<f64> = self.chart.iter().map(|p| p.close).collect();
        let mut text = view.display_as_tables();
        if !closes.is_empty() {
            text.push_str(&format!("\n\n{}", ui::sparkline(&closes, self.width)));
        }
        if let Err(e) = writeln!(self.out, "{text}\n").and_then(|_| self.out.flush()) {
            warn!("Failed to write view: {e}");
        }
    }
}

/// Switches the dashboard to each symbol read from `input`, one per line.
/// Selecting a new symbol abandons the previous one if it is still loading.
pub async fn run_with_input<R, W>(
    app: &App,
    input: R,
    screen: TerminalScreen<W>,
) -> Result<Dashboard<TerminalScreen<W>>>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send + 'static,
{
    let mut dashboard = Dashboard::new(
        Arc::new(app.aggregator()?),
        app.series_provider()?,
        app.config.series.default_range,
        screen,
    );

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Symbol::parse(line) {
            Ok(symbol) => {
                debug!(%symbol, "Selecting symbol");
                dashboard.select(symbol);
            }
            Err(e) => eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
        }
    }
    dashboard.wait_idle().await;

    Ok(dashboard)
}

pub async fn run(app: &App) -> Result<()> {
    eprintln!(
        "{}",
        ui::style_text(
            "Enter a symbol per line, Ctrl-D to quit",
            ui::StyleType::Subtle
        )
    );
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let screen = TerminalScreen::new(std::io::stdout(), ui::terminal_width());
    run_with_input(app, stdin, screen).await?;
    Ok(())
}
