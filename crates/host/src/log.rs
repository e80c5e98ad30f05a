// crates/host/src/log.rs

//! Coloured per-stage console lines.

use std::fmt::Display;

use sched_assist_core::pipeline::Stage;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

fn color(stage: Stage) -> &'static str {
    match stage {
        Stage::Triage => BLUE,
        Stage::SlotSearch => CYAN,
        Stage::Confirmation => MAGENTA,
        Stage::Booking => YELLOW,
    }
}

fn icon(stage: Stage) -> &'static str {
    match stage {
        Stage::Triage => "📨",
        Stage::SlotSearch => "📅",
        Stage::Confirmation => "🙋",
        Stage::Booking => "📝",
    }
}

pub fn stage_banner(stage: Stage) {
    eprintln!(
        "\n{}{BOLD}{} {}{RESET}",
        color(stage),
        icon(stage),
        stage.as_str().to_uppercase()
    );
}

pub fn step(stage: Stage, step: usize) {
    eprintln!("{}{BOLD}[{}]{RESET} {DIM}Step {}{RESET}", color(stage), stage, step);
}

pub fn tool_call(stage: Stage, name: &str, args: &str) {
    eprintln!(
        "{}{BOLD}[{}]{RESET} {CYAN}→ {}{RESET} {DIM}{}{RESET}",
        color(stage),
        stage,
        name,
        truncate(args, 100)
    );
}

pub fn tool_result(stage: Stage, name: &str, result: &str, is_error: bool) {
    let (symbol, tone) = if is_error { ("✗", RED) } else { ("✓", GREEN) };
    eprintln!(
        "{}{BOLD}[{}]{RESET} {tone}{symbol} {}{RESET}: {DIM}{}{RESET}",
        color(stage),
        stage,
        name,
        truncate(result, 150)
    );
}

pub fn response(stage: Stage, text: &str) {
    eprintln!(
        "{}{BOLD}[{}]{RESET} {WHITE}← {}{RESET}",
        color(stage),
        stage,
        truncate(text, 200)
    );
}

pub fn done(stage: Stage) {
    eprintln!("{}{BOLD}[{}]{RESET} {GREEN}✓ Done{RESET}", color(stage), stage);
}

pub fn info(message: impl Display) {
    eprintln!("{DIM}[info]{RESET} {}", message);
}

pub fn error(message: impl Display) {
    eprintln!("{RED}{BOLD}[error]{RESET} {}", message);
}

pub fn success(message: impl Display) {
    eprintln!("{GREEN}[ok]{RESET} {}", message);
}

/// Single-line preview, cut on a char boundary.
fn truncate(s: &str, max: usize) -> String {
    let clean: String = s
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let trimmed = clean.trim();
    match trimmed.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
