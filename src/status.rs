//! Turns transfer events into something a person (or a script) can read.

use std::io::{self, Write};

use humansize::{format_size, BINARY};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::types::{Direction, Outcome, TransferEvent};

const BAR_WIDTH: usize = 30;

/// `"{m}m {s}s"` or `"{s}s"`; `None` when there is nothing sensible to show.
pub fn format_duration(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).round().max(1.0) as u64;
    if minutes > 0 {
        Some(format!("{}m {}s", minutes, secs))
    } else {
        Some(format!("{}s", secs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Info,
    Success,
    Danger,
}

/// What the batch is, for wording: direction plus a label such as `3 files`
/// or `"report.pdf"`.
#[derive(Debug, Clone)]
pub struct StatusContext {
    pub direction: Direction,
    pub label: String,
}

impl StatusContext {
    pub fn new(direction: Direction, names: &[String]) -> Self {
        let label = match (direction, names) {
            (Direction::Download, [single]) => format!("\"{}\"", single),
            (_, [_]) => "1 file".to_string(),
            (_, many) => format!("{} files", many.len()),
        };
        Self { direction, label }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub message: String,
    /// `None` renders as a busy indicator.
    pub percent: Option<f64>,
    pub detail: String,
    pub variant: Variant,
    pub indeterminate: bool,
}

fn eta_detail(eta_seconds: Option<f64>) -> String {
    match eta_seconds.and_then(format_duration) {
        Some(text) => format!("Estimated time remaining: {}", text),
        None => "Calculating time remaining...".to_string(),
    }
}

impl StatusLine {
    /// `None` for events that do not change what is shown.
    pub fn from_event(ctx: &StatusContext, event: &TransferEvent) -> Option<Self> {
        let verb = match ctx.direction {
            Direction::Upload => "Uploading",
            Direction::Download => "Downloading",
        };
        match event {
            TransferEvent::Started { indeterminate, .. } => Some(Self {
                message: format!("{} {}...", verb, ctx.label),
                percent: if *indeterminate { None } else { Some(0.0) },
                detail: eta_detail(None),
                variant: Variant::Info,
                indeterminate: *indeterminate,
            }),
            TransferEvent::Progress(sample) => Some(Self {
                message: format!("{} {} ({:.0}%)", verb, ctx.label, sample.percent.min(100.0)),
                percent: Some(sample.percent),
                detail: eta_detail(sample.eta_seconds),
                variant: Variant::Info,
                indeterminate: sample.indeterminate,
            }),
            TransferEvent::ItemCompleted { .. } => None,
            TransferEvent::Finished(final_sample) => {
                let noun = match ctx.direction {
                    Direction::Upload => "Upload",
                    Direction::Download => "Download",
                };
                Some(match final_sample.outcome {
                    Outcome::Success => Self {
                        message: format!("{} complete!", noun),
                        percent: Some(100.0),
                        detail: final_sample.detail.clone(),
                        variant: Variant::Success,
                        indeterminate: false,
                    },
                    Outcome::Failure => Self {
                        message: format!("{} failed.", noun),
                        percent: None,
                        detail: final_sample.detail.clone(),
                        variant: Variant::Danger,
                        indeterminate: true,
                    },
                })
            }
        }
    }
}

pub trait StatusRenderer: Send {
    fn render(&mut self, event: &TransferEvent) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A single, continuously rewritten terminal line.
pub struct TextRenderer<W> {
    out: W,
    ctx: StatusContext,
    last_len: usize,
}

impl<W: Write + Send> TextRenderer<W> {
    pub fn new(out: W, ctx: StatusContext) -> Self {
        Self { out, ctx, last_len: 0 }
    }
}

/// `[=====     ]`, or a striped bar when the percent is unknown.
pub fn progress_bar(percent: Option<f64>, indeterminate: bool) -> String {
    let inner = match percent {
        Some(p) if !indeterminate => {
            let filled = ((p.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
            format!("{}{}", "=".repeat(filled), " ".repeat(BAR_WIDTH - filled))
        }
        _ => "/".repeat(BAR_WIDTH),
    };
    format!("[{}]", inner)
}

impl<W: Write + Send> StatusRenderer for TextRenderer<W> {
    fn render(&mut self, event: &TransferEvent) -> io::Result<()> {
        let Some(line) = StatusLine::from_event(&self.ctx, event) else {
            return Ok(());
        };
        let lead = match line.variant {
            Variant::Info => progress_bar(line.percent, line.indeterminate),
            Variant::Success => progress_bar(Some(100.0), false),
            Variant::Danger => format!("[{:^w$}]", "FAILED", w = BAR_WIDTH),
        };
        let mut text = format!("{} {} · {}", lead, line.message, line.detail);
        if let TransferEvent::Progress(sample) = event {
            text.push_str(&format!(
                " · {} @ {}/s",
                format_size(sample.cumulative_bytes, BINARY),
                format_size(sample.throughput.max(0.0) as u64, BINARY)
            ));
        }

        let pad = self.last_len.saturating_sub(text.chars().count());
        write!(self.out, "\r{}{}", text, " ".repeat(pad))?;
        self.last_len = text.chars().count();
        if matches!(event, TransferEvent::Finished(_)) {
            writeln!(self.out)?;
            self.last_len = 0;
        }
        self.out.flush()
    }
}

/// One JSON object per event and line, for scripts.
pub struct JsonRenderer<W> {
    out: W,
}

impl<W: Write + Send> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> StatusRenderer for JsonRenderer<W> {
    fn render(&mut self, event: &TransferEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Drains the event channel until every sender is gone.
pub async fn render_events(
    mut rx: UnboundedReceiver<TransferEvent>,
    mut renderer: Box<dyn StatusRenderer>,
) -> io::Result<()> {
    while let Some(event) = rx.recv().await {
        renderer.render(&event)?;
    }
    renderer.finish()
}
