//! Line output for the REPL: prompt, echoed rows, error lines. Built on
//! `crossterm`'s styled `Print` without entering raw mode, exactly as the
//! teacher's `console.rs` does it — this crate does not need arrow-key
//! history or cooked/raw switching, so that half of the teacher's module
//! is left behind.

use std::io::{self, Write};

use crossterm::{cursor, execute, style, ExecutableCommand};

/// Prints the `db > ` prompt with no trailing newline (spec.md §6).
pub fn print_prompt() -> io::Result<()> {
    io::stdout().execute(style::Print("db > "))?;
    io::stdout().flush()
}

/// Prints `s` followed by a newline, one terminal line at a time.
pub fn println(s: &str) -> io::Result<()> {
    for line in s.lines() {
        io::stdout().execute(style::Print(format!("{line}\n")))?;
        execute!(io::stdout(), cursor::MoveToNextLine(0))?;
    }
    io::stdout().flush()
}
