//! Command parsing for the serial protocol.
//!
//! One command per line:
//!
//! ```text
//! CONNECT
//! START | STOP | STATUS
//! ADD_SCHEDULE <id> <day>-<hour>:<minute>:<second> <duration>
//! DELETE_SCHEDULE <id>
//! ```
//!
//! Arguments are matched the way C `sscanf` matches `%d` conversions: each
//! integer may be preceded by whitespace and a sign, the `-` and `:`
//! separators must follow the previous integer directly, and anything after
//! the last conversion is ignored.

/// A parsed host command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Full state dump
    Connect,
    /// Manual cleaning start
    Start,
    /// Manual cleaning stop
    Stop,
    /// Status query
    Status,
    /// Add or update a schedule; raw integers, `second` is not stored
    AddSchedule {
        id: i64,
        weekday: i64,
        hour: i64,
        minute: i64,
        second: i64,
        duration: i64,
    },
    /// Delete a schedule slot
    DeleteSchedule { id: i64 },
}

const ADD_SCHEDULE: &str = "ADD_SCHEDULE";
const DELETE_SCHEDULE: &str = "DELETE_SCHEDULE";

impl Command {
    /// Parse one line (without its newline). Unknown or malformed lines yield `None`.
    pub fn parse(line: &str) -> Option<Command> {
        match line {
            "CONNECT" => return Some(Command::Connect),
            "START" => return Some(Command::Start),
            "STOP" => return Some(Command::Stop),
            "STATUS" => return Some(Command::Status),
            _ => {}
        }

        if let Some(args) = line.strip_prefix(ADD_SCHEDULE) {
            let mut scan = Scanner::new(args);
            let id = scan.int()?;
            let weekday = scan.int()?;
            scan.literal('-')?;
            let hour = scan.int()?;
            scan.literal(':')?;
            let minute = scan.int()?;
            scan.literal(':')?;
            let second = scan.int()?;
            let duration = scan.int()?;
            return Some(Command::AddSchedule {
                id,
                weekday,
                hour,
                minute,
                second,
                duration,
            });
        }

        if let Some(args) = line.strip_prefix(DELETE_SCHEDULE) {
            let id = Scanner::new(args).int()?;
            return Some(Command::DeleteSchedule { id });
        }

        None
    }
}

/// `sscanf`-style cursor over command arguments
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    /// `%d`: optional whitespace, optional sign, at least one digit
    fn int(&mut self) -> Option<i64> {
        let trimmed = self.rest.trim_start();
        let bytes = trimmed.as_bytes();
        let mut end = 0;
        if matches!(bytes.first(), Some(b'+' | b'-')) {
            end = 1;
        }
        let digits_start = end;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        if end == digits_start {
            return None;
        }

        let value = trimmed[..end].parse().ok()?;
        self.rest = &trimmed[end..];
        Some(value)
    }

    /// Exact separator character
    fn literal(&mut self, expected: char) -> Option<()> {
        self.rest = self.rest.strip_prefix(expected)?;
        Some(())
    }
}
