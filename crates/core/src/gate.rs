// crates/core/src/gate.rs

//! Human confirmation gate over a line-oriented console.
//!
//! The prompt texts are part of the console protocol and are reproduced
//! exactly. The gate waits until a valid choice arrives, the optional
//! deadline passes, the cancel token fires, or input closes.

use std::fmt::Display;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::error::GateError;
use crate::types::ProposedSlot;

pub const OPTIONS_HEADER: &str = "Please review the following proposed meeting times:";
pub const SELECTION_PROMPT: &str = "Enter the number of your chosen time slot: ";
pub const NOT_A_NUMBER: &str = "Please enter a valid number.";
pub const OUT_OF_RANGE: &str = "Invalid selection. Please try again.";

/// How often a waiting reader re-checks the cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Source of human input lines.
pub trait LineSource {
    /// Next line without its terminator. `wait` bounds how long to block.
    fn next_line(&mut self, wait: Option<Duration>, cancel: &CancelToken)
        -> Result<String, GateError>;
}

/// Blocking reader over any `BufRead`. Ignores `wait`; checks the cancel token
/// only between lines.
pub struct ReaderLines<R> {
    reader: R,
}

impl<R: BufRead> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderLines<R> {
    fn next_line(
        &mut self,
        _wait: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<String, GateError> {
        if cancel.is_cancelled() {
            return Err(GateError::Cancelled);
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(GateError::InputClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Lines read on a background thread, so waits can time out and be cancelled.
pub struct ChannelLines {
    rx: Receiver<io::Result<String>>,
}

impl ChannelLines {
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in reader.lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Reader over the process's standard input.
    pub fn stdin() -> Self {
        Self::spawn(BufReader::new(io::stdin()))
    }
}

impl LineSource for ChannelLines {
    fn next_line(
        &mut self,
        wait: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<String, GateError> {
        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                return Err(GateError::Cancelled);
            }
            let slice = match wait {
                Some(limit) => {
                    let left = limit.saturating_sub(started.elapsed());
                    if left.is_zero() {
                        return Err(GateError::TimedOut);
                    }
                    left.min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            match self.rx.recv_timeout(slice) {
                Ok(line) => return Ok(line?),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(GateError::InputClosed),
            }
        }
    }
}

/// Presents numbered options and returns the one the human picks.
pub struct ConfirmationGate<L, W> {
    lines: L,
    out: W,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl<L: LineSource, W: Write> ConfirmationGate<L, W> {
    pub fn new(lines: L, out: W) -> Self {
        Self {
            lines,
            out,
            timeout: None,
            cancel: CancelToken::new(),
        }
    }

    /// Give up with [`GateError::TimedOut`] once this much time has passed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn into_inner(self) -> (L, W) {
        (self.lines, self.out)
    }

    /// Returns a reference into `options`, never a copy.
    pub fn confirm<'o, T: Display>(&mut self, options: &'o [T]) -> Result<&'o T, GateError> {
        if options.is_empty() {
            return Err(GateError::NoOptions);
        }

        writeln!(self.out, "{OPTIONS_HEADER}")?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.out, "{}. {}", i + 1, option)?;
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            write!(self.out, "{SELECTION_PROMPT}")?;
            self.out.flush()?;

            let wait = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Err(GateError::TimedOut);
                    }
                    Some(left)
                }
                None => None,
            };
            let line = self.lines.next_line(wait, &self.cancel)?;

            match parse_choice(&line, options.len()) {
                Ok(index) => return Ok(&options[index]),
                Err(rejection) => writeln!(self.out, "{rejection}")?,
            }
        }
    }
}

/// Zero-based index for a 1-based choice, or the rejection text to print.
fn parse_choice(input: &str, len: usize) -> Result<usize, &'static str> {
    use std::num::IntErrorKind;

    match input.trim().parse::<i64>() {
        Ok(n) if n >= 1 && (n as u64) <= len as u64 => Ok(n as usize - 1),
        Ok(_) => Err(OUT_OF_RANGE),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Err(OUT_OF_RANGE)
        }
        Err(_) => Err(NOT_A_NUMBER),
    }
}

/// Slot selection as seen by the confirmation tool.
pub trait SlotPicker {
    fn pick<'o>(&mut self, options: &'o [ProposedSlot]) -> Result<&'o ProposedSlot, GateError>;
}

impl<L: LineSource, W: Write> SlotPicker for ConfirmationGate<L, W> {
    fn pick<'o>(&mut self, options: &'o [ProposedSlot]) -> Result<&'o ProposedSlot, GateError> {
        self.confirm(options)
    }
}
