use clap::{Parser, Subcommand};
use clubbase_backend::config::Config;
use clubbase_backend::models::Role;
use clubbase_backend::setup::db_setup;
use redb::Database;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

use clubbase_backend::models::db_operations::accounts_db_operations;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup { db_type: Option<String> },
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => match db_type.as_deref() {
                Some("accounts") => setup_accounts_database(&config),
                Some("documents") => setup_documents_database(&config),
                Some(other) => eprintln!(
                    "❌ Error: Unknown database type '{}'. Use 'accounts' or 'documents'.",
                    other
                ),
                None => {
                    setup_accounts_database(&config);
                    setup_documents_database(&config);
                }
            },
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                name,
                email,
                password,
            } => {
                create_admin_account(&config, name, email, password);
            }
            AdminAction::List => {
                list_admin_accounts(&config);
            }
            AdminAction::ChangePassword {
                email,
                new_password,
            } => {
                change_admin_password(&config, email, new_password);
            }
        },
    }
}

fn setup_accounts_database(config: &Config) {
    let db_path = config.accounts_db_path();
    if db_path.exists() {
        println!(
            "ℹ️ Accounts database already exists at '{}'. Skipping creation.",
            db_path.display()
        );
        return;
    }
    println!("\nSetting up accounts database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create accounts database file.");
    match db_setup::setup_accounts_db(&mut conn) {
        Ok(_) => println!("✅ Accounts database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up accounts database: {}", e),
    }
}

fn setup_documents_database(config: &Config) {
    let db_path = config.documents_db_path();
    if db_path.exists() {
        println!(
            "ℹ️ Documents database already exists at '{}'. Skipping creation.",
            db_path.display()
        );
        return;
    }
    println!(
        "\nSetting up documents database at '{}'...",
        db_path.display()
    );

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let db = Database::create(&db_path).expect("Failed to create documents database file.");
    match db_setup::setup_documents_db(&db) {
        Ok(_) => println!("✅ Documents database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up documents database: {}", e),
    }
}

fn create_admin_account(config: &Config, name: &str, email: &str, password: &str) {
    let db_path = config.accounts_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Accounts database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return;
    }
    let conn = Connection::open(&db_path).expect("Could not open accounts database.");

    match accounts_db_operations::create_account(
        &conn,
        name,
        email,
        password,
        Role::Admin,
        None,
        None,
    ) {
        Ok(_) => println!("✅ Admin account '{}' created successfully.", email),
        Err(e) => eprintln!(
            "❌ Error creating admin account: {}. The email might already be taken.",
            e
        ),
    }
}

fn list_admin_accounts(config: &Config) {
    let conn = match Connection::open(config.accounts_db_path()) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("❌ Error: Accounts database not found. Please run `setup_cli db setup` first.");
            return;
        }
    };
    let mut stmt = match conn.prepare("SELECT email FROM accounts WHERE role = 'admin' ORDER BY email")
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Error preparing database query: {}", e);
            return;
        }
    };
    let account_iter = stmt.query_map([], |row| row.get::<_, String>(0));

    println!("Listing admin accounts:");
    match account_iter {
        Ok(accounts) => {
            for account in accounts {
                println!("- {}", account.unwrap_or_else(|_| "Invalid email".to_string()));
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, email: &str, new_password: &str) {
    let conn = match Connection::open(config.accounts_db_path()) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("❌ Error: Accounts database not found.");
            return;
        }
    };
    let hashed = match bcrypt::hash(new_password, bcrypt::DEFAULT_COST) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("❌ Error hashing new password: {}", e);
            return;
        }
    };
    match conn.execute(
        "UPDATE accounts SET password_hash = ?1 WHERE email = ?2 AND role = 'admin'",
        rusqlite::params![hashed, email],
    ) {
        Ok(0) => eprintln!("❌ Error: No admin account with email '{}' found.", email),
        Ok(_) => println!("✅ Password for admin '{}' changed successfully.", email),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
