//! Parse a configuration file and print its tree, or the entries matching
//! a name.

use clap::Parser;
use daemon_core::{logging, Context, LogLevel, Logger, Query};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "confdump", about = "Parse a daemon configuration file and dump it")]
struct Args {
    /// Configuration file to read.
    file: PathBuf,

    /// Print every entry with this name, at any depth, instead of the tree.
    #[arg(long, value_name = "NAME")]
    find: Option<String>,

    /// Compare names and values exactly instead of ignoring ASCII case.
    #[arg(long)]
    case_sensitive: bool,

    /// With --find, only print leaf values.
    #[arg(long, requires = "find")]
    entry: bool,
}

fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    let mut logger = Logger::new();
    logger.add_hook(LogLevel::Error, |_, ev| {
        eprintln!("confdump: {}", ev.message);
    });
    let mut ctx = Context::new(logger);
    // Failures are reported by the error hook.
    if ctx.load(&args.file).is_err() {
        return ExitCode::FAILURE;
    }
    let Some(tree) = ctx.conf() else {
        return ExitCode::FAILURE;
    };

    let Some(name) = args.find.as_deref() else {
        print!("{}", tree.display(tree.root()));
        return ExitCode::SUCCESS;
    };

    let mut query = Query::new(name).recursive();
    if args.case_sensitive {
        query = query.case_sensitive();
    }

    if args.entry {
        let mut prev = None;
        while let Some((id, value)) = tree.find_entry_next(tree.root(), &query, prev) {
            println!("{value}");
            prev = Some(id);
        }
        return ExitCode::SUCCESS;
    }

    for id in tree.matches(tree.root(), query) {
        let entry = &tree[id];
        match entry.children() {
            Some(children) => {
                match entry.value() {
                    Some(v) => println!("[{} {v}]", entry.name()),
                    None => println!("[{}]", entry.name()),
                }
                print!("{}", tree.display(children));
            }
            None => println!("{} = {}", entry.name(), entry.value().unwrap_or_default()),
        }
    }
    ExitCode::SUCCESS
}
