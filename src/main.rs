use clap::Parser as ClapParser;
use prettytable::{Cell, Row, Table};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::error::Error;
use std::path::PathBuf;

use slotdb::{CommandParser, DatabaseManager, DbConfig, QueryResult};

/// Interactive shell over the slotted-page storage engine
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database directory
    #[arg(short = 'D', long)]
    db_path: Option<PathBuf>,

    /// Number of backing files
    #[arg(long)]
    files: Option<usize>,

    /// Maximum size of one backing file in bytes
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Number of buffer pool frames
    #[arg(long)]
    frames: Option<usize>,

    /// Wipe the database before starting
    #[arg(long)]
    reset: bool,
}

impl Args {
    fn to_config(&self) -> Result<DbConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => DbConfig::load(path)?,
            None => DbConfig::default(),
        };
        if let Some(db_path) = &self.db_path {
            config.db_path = db_path.clone();
        }
        if let Some(files) = self.files {
            config.file_count = files;
        }
        if let Some(max_file_size) = self.max_file_size {
            config.max_file_size = max_file_size;
        }
        if let Some(frames) = self.frames {
            config.frame_count = frames;
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_result(result: QueryResult) {
    match result {
        QueryResult::Empty => println!("OK"),
        QueryResult::TableCreated(table) => {
            let columns: Vec<String> = table
                .columns()
                .iter()
                .map(|c| format!("{}:{}", c.name, c.col_type))
                .collect();
            println!(
                "Table {} created ({}), header page {}",
                table.name(),
                columns.join(", "),
                table.header_page_id()
            );
        }
        QueryResult::RecordInserted(rid) => println!("Inserted record {}", rid),
        QueryResult::RowsAffected(count) => println!("{} record(s) affected", count),
        QueryResult::ResultSet(columns, rows) => {
            let mut table = Table::new();
            let mut titles = vec![Cell::new("rid")];
            titles.extend(columns.iter().map(|c| Cell::new(c)));
            table.set_titles(Row::new(titles));

            for (rid, record) in &rows {
                let mut cells = vec![Cell::new(&rid.to_string())];
                cells.extend(record.values().iter().map(|v| Cell::new(&v.to_string())));
                table.add_row(Row::new(cells));
            }
            table.printstd();
            println!("{} record(s)", rows.len());
        }
        QueryResult::Exit => {}
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = args.to_config()?;

    let mut db_manager = DatabaseManager::open(config)?;
    if args.reset {
        db_manager.reset()?;
    }

    let parser = CommandParser::new()?;
    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline("slotdb> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        let command = match parser.parse(line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("Error: {}", err);
                continue;
            }
        };

        match db_manager.execute(command) {
            Ok(QueryResult::Exit) => break,
            Ok(result) => print_result(result),
            Err(err) => eprintln!("Error: {}", err),
        }
    }

    db_manager.finish()?;
    Ok(())
}
