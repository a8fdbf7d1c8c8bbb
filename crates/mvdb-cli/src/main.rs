//! mvdb CLI
//!
//! Inspect a file-backed mvdb store from the command line

use clap::{Parser, Subcommand};
use mvdb_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "mvdb")]
#[command(about = "mvdb - versioned object/link store inspector", long_about = None)]
struct Cli {
    /// Path of the SQLite store file
    #[arg(long, global = true, default_value = "mvdb.db")]
    db: String,

    /// Log every store operation to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List object ids
    Objects(commands::objects::ObjectsArgs),
    /// Print the state of an object revision
    State(commands::objects::StateArgs),
    /// List the revision numbers of an object
    Revs(commands::objects::RevsArgs),
    /// List links with their endpoints
    Links(commands::links::LinksArgs),
    /// List link revisions leaving an object revision
    Outgoing(commands::links::OutgoingArgs),
    /// Remove every object and link from the store
    Clear,
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        init(Profile::Development);
    }

    let result = commands::open(&cli.db).and_then(|mut db| match cli.command {
        Commands::Objects(args) => commands::objects::execute_objects(&db, args),
        Commands::State(args) => commands::objects::execute_state(&db, args),
        Commands::Revs(args) => commands::objects::execute_revs(&db, args),
        Commands::Links(args) => commands::links::execute_links(&db, args),
        Commands::Outgoing(args) => commands::links::execute_outgoing(&db, args),
        Commands::Clear => commands::clear::execute(&mut db),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
