//! Plain-text tables and the live countdown line.

use chrono::{DateTime, Local, Utc};
use pomodoro_core::timer::{describe_minutes, format_mm_ss, PRESETS};
use pomodoro_core::{DailySummary, Event, Phase, RecordStats, RunRecord};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;

const RECORD_HEADERS: [&str; 8] = [
    "Started",
    "Ended",
    "Sessions",
    "Rounds Per Session",
    "Minutes per Round",
    "Completed Sessions",
    "Completed Rounds",
    "Completed",
];

/// Left-aligned table with a header underline.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers.iter().map(|h| h.to_string()).collect()));
    out.push('\n');
    out.push_str(&line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.clone()));
        out.push('\n');
    }
    out
}

fn local(ts: &DateTime<Utc>, format: &str) -> String {
    ts.with_timezone(&Local).format(format).to_string()
}

fn record_row(record: &RunRecord, ts_format: &str) -> Vec<String> {
    vec![
        local(&record.started, ts_format),
        record
            .ended
            .as_ref()
            .map(|ts| local(ts, ts_format))
            .unwrap_or_else(|| "-".to_string()),
        record.number_of_sessions.to_string(),
        record.rounds_per_session.to_string(),
        record.minutes_per_session.to_string(),
        record.total_completed_sessions.to_string(),
        record.total_completed_rounds.to_string(),
        record.done.to_string(),
    ]
}

pub fn presets_table() -> String {
    let rows: Vec<Vec<String>> = PRESETS
        .iter()
        .enumerate()
        .map(|(i, p)| {
            vec![
                (i + 1).to_string(),
                describe_minutes(p.round_minutes),
                describe_minutes(p.short_break_minutes),
                describe_minutes(p.long_break_minutes),
            ]
        })
        .collect();
    table(&["Option", "Round Time", "Short Break Time", "Long Break Time"], &rows)
}

pub fn records_table(records: &[RecordStats]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| record_row(&r.record, "%Y-%m-%d %H:%M:%S"))
        .collect();
    table(&RECORD_HEADERS, &rows)
}

pub fn daily_table(summary: &DailySummary) -> String {
    let mut headers = RECORD_HEADERS.to_vec();
    headers.push("Time Spent Working");
    let rows: Vec<Vec<String>> = summary
        .records
        .iter()
        .map(|r| {
            let mut row = record_row(&r.record, "%H:%M:%S");
            row.push(format!("{} minutes", r.minutes_worked));
            row
        })
        .collect();

    format!(
        "Pomodoros for {}\n\n{}\nTotal Minutes Worked: {}\n",
        summary.date.format("%A %d %B %Y"),
        table(&headers, &rows),
        summary.total_minutes_worked
    )
}

pub fn final_record(record: &RunRecord) -> String {
    let status = if record.done { "finished" } else { "stopped early" };
    format!(
        "Run {status}: {}/{} sessions, {}/{} rounds, {} minutes of focus.",
        record.total_completed_sessions,
        record.number_of_sessions,
        record.total_completed_rounds,
        u64::from(record.number_of_sessions) * u64::from(record.rounds_per_session),
        record.minutes_worked()
    )
}

/// Where the run currently is, for the status line.
#[derive(Debug, Default)]
struct Progress {
    sessions: u32,
    rounds: u32,
    session: u32,
    round: u32,
}

impl Progress {
    fn line(&self, phase: Phase, remaining_secs: u64) -> String {
        format!(
            "Session {}/{}  Round {}/{}  {:<11}  {}",
            self.session,
            self.sessions,
            self.round,
            self.rounds,
            phase.label(),
            format_mm_ss(remaining_secs)
        )
    }
}

/// Draw engine events to `out` until the engine drops its sender.
pub async fn render_events<W>(mut rx: UnboundedReceiver<Event>, mut out: W)
where
    W: AsyncWrite + Unpin,
{
    let mut progress = Progress::default();
    while let Some(event) = rx.recv().await {
        let text = match event {
            Event::RunStarted {
                number_of_sessions,
                rounds_per_session,
                ..
            } => {
                progress.sessions = number_of_sessions;
                progress.rounds = rounds_per_session;
                "Press Ctrl-C to stop.\n".to_string()
            }
            Event::SessionStarted { session, .. } => {
                progress.session = session;
                continue;
            }
            Event::PhaseStarted { round, .. } => {
                progress.round = round;
                continue;
            }
            Event::Tick {
                phase,
                remaining_secs,
            } => format!("\r{}", progress.line(phase, remaining_secs)),
            Event::PhaseCompleted { .. } => "\n".to_string(),
            Event::PhaseCancelled { phase, .. } => format!("\n{} cancelled.\n", phase.label()),
            Event::RoundFinished { .. }
            | Event::SessionFinished { .. }
            | Event::RunFinished { .. } => continue,
        };
        if out.write_all(text.as_bytes()).await.is_err() || out.flush().await.is_err() {
            break;
        }
    }
}
