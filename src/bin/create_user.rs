use std::{error::Error, io, path::PathBuf, process::exit};

use clap::Parser;
use email_address::EmailAddress;
use rusqlite::Connection;

use fintrack::{
    initialize_db,
    auth::{PasswordHash, ValidatedPassword, create_user},
};

/// A utility for registering a user that can log in to the fintrack API.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: PathBuf,

    /// The email the user logs in with.
    #[arg(long)]
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let email = match args.email.trim().parse::<EmailAddress>() {
        Ok(email) => email,
        Err(error) => {
            print_error(format!("Invalid email {:?}: {error}", args.email));
            exit(1);
        }
    };

    let Some(password_hash) = get_password_hash(email.as_str()) else {
        return Ok(());
    };

    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;

    match create_user(email.as_str(), password_hash, &connection) {
        Ok(user) => println!("Created user {} with ID {}", user.email, user.id),
        Err(error) => {
            print_error(error);
            exit(1);
        }
    }

    Ok(())
}

fn get_password_hash(email: &str) -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = prompt_password("Enter a password: ")?;

        let validated_password = match ValidatedPassword::new(&first_password, &[email]) {
            Ok(password) => password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = prompt_password("Enter the same password again: ")?;

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
                continue;
            }
        }
    }
}

/// Returns `None` if stdin was closed or could not be read.
fn prompt_password(prompt: &str) -> Option<String> {
    match rpassword::prompt_password(prompt) {
        Ok(password) => Some(password),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
