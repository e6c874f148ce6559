use std::{error::Error, path::PathBuf};

use clap::Parser;
use rusqlite::Connection;

use fintrack::{initialize_db, seed_reference_data};

/// A utility for creating a fintrack database with the default transaction types and categories.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database, it is created if it does not exist.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    println!("Opening database at {:#?}", args.db_path);
    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;

    let inserted = seed_reference_data(&connection)?;
    println!("Inserted {inserted} row(s) of reference data.");

    Ok(())
}
