//! Textual command parsing.

use regex::Regex;
use std::fmt;
use thiserror::Error;

use crate::record::{ColInfo, ColType, RecordError, RecordId};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Invalid record id: {0}")]
    InvalidRecordId(String),

    #[error("Record error: {0}")]
    RecordError(#[from] RecordError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTable { name: String, columns: Vec<ColInfo> },
    /// Values are kept as literals and typed against the table schema on execution
    Insert { table: String, values: Vec<String> },
    SelectAll { table: String },
    Get { table: String, rid: RecordId },
    Delete { table: String, rid: RecordId },
    ResetDb,
    Exit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CreateTable { name, columns } => {
                let cols: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{}:{}", c.name, c.col_type))
                    .collect();
                write!(f, "CREATE TABLE {} ({})", name, cols.join(","))
            }
            Command::Insert { table, values } => {
                write!(f, "INSERT INTO {} VALUES ({})", table, values.join(","))
            }
            Command::SelectAll { table } => write!(f, "SELECT * FROM {}", table),
            Command::Get { table, rid } => write!(f, "GET FROM {} RECORD {}", table, rid),
            Command::Delete { table, rid } => write!(f, "DELETE FROM {} RECORD {}", table, rid),
            Command::ResetDb => write!(f, "RESETDB"),
            Command::Exit => write!(f, "EXIT"),
        }
    }
}

/// Compiled command grammar
pub struct CommandParser {
    create_table: Regex,
    column: Regex,
    insert: Regex,
    select_all: Regex,
    record_op: Regex,
    reset_db: Regex,
    exit: Regex,
}

impl CommandParser {
    pub fn new() -> CommandResult<Self> {
        Ok(Self {
            create_table: Regex::new(r"(?is)^CREATE\s+TABLE\s+(\w+)\s*\((.*)\)$")?,
            column: Regex::new(r"^(\w+)\s*:\s*(\S.*)$")?,
            insert: Regex::new(r"(?is)^INSERT\s+INTO\s+(\w+)\s+VALUES\s*\((.*)\)$")?,
            select_all: Regex::new(r"(?i)^SELECT\s+\*\s+FROM\s+(\w+)$")?,
            record_op: Regex::new(r"(?i)^(GET|DELETE)\s+FROM\s+(\w+)\s+RECORD\s+(\S+)$")?,
            reset_db: Regex::new(r"(?i)^RESETDB$")?,
            exit: Regex::new(r"(?i)^EXIT$")?,
        })
    }

    pub fn parse(&self, line: &str) -> CommandResult<Command> {
        let line = line.trim();
        let line = line.strip_suffix(';').unwrap_or(line).trim_end();

        if let Some(caps) = self.create_table.captures(line) {
            let name = caps[1].to_string();
            let columns = self.parse_columns(&caps[2])?;
            return Ok(Command::CreateTable { name, columns });
        }

        if let Some(caps) = self.insert.captures(line) {
            return Ok(Command::Insert {
                table: caps[1].to_string(),
                values: split_values(&caps[2])?,
            });
        }

        if let Some(caps) = self.select_all.captures(line) {
            return Ok(Command::SelectAll {
                table: caps[1].to_string(),
            });
        }

        if let Some(caps) = self.record_op.captures(line) {
            let table = caps[2].to_string();
            let rid: RecordId = caps[3].parse().map_err(CommandError::InvalidRecordId)?;
            return Ok(if caps[1].eq_ignore_ascii_case("GET") {
                Command::Get { table, rid }
            } else {
                Command::Delete { table, rid }
            });
        }

        if self.reset_db.is_match(line) {
            return Ok(Command::ResetDb);
        }
        if self.exit.is_match(line) {
            return Ok(Command::Exit);
        }

        Err(CommandError::Syntax(format!("unrecognized command '{}'", line)))
    }

    fn parse_columns(&self, defs: &str) -> CommandResult<Vec<ColInfo>> {
        let mut columns: Vec<ColInfo> = Vec::new();
        for def in defs.split(',') {
            let def = def.trim();
            let caps = self.column.captures(def).ok_or_else(|| {
                CommandError::Syntax(format!("column definition '{}' is not name:TYPE", def))
            })?;
            let name = &caps[1];
            if columns.iter().any(|c| c.name == name) {
                return Err(CommandError::Syntax(format!("duplicate column '{}'", name)));
            }
            let col_type: ColType = caps[2].parse()?;
            columns.push(ColInfo::new(name, col_type));
        }
        Ok(columns)
    }
}

/// Split a VALUES list on commas outside double quotes. Quotes are kept.
fn split_values(list: &str) -> CommandResult<Vec<String>> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in list.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                values.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err(CommandError::Syntax("unterminated string literal".into()));
    }
    values.push(current.trim().to_string());
    Ok(values)
}
