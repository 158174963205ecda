use std::env;
use std::process;

use domain::engine::EngineKind;

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain select <engine> <columns> <table> [--where <predicate>]\n  domain insert <engine> <table> <columns> <values>\n\nNotes:\n  - Prints the statement the given engine's dialect would send; nothing is executed.\n  - <engine> is 'mysql' or 'postgres'.",
        domain::about()
    );
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    let engine = match args.next() {
        Some(tag) => EngineKind::parse(&tag).map_err(|e| e.to_string())?,
        None if cmd == "select" || cmd == "insert" => {
            return Err(format!("missing <engine> for {}", cmd))
        }
        None => {
            print_usage();
            return Ok(());
        }
    };
    let dialect = engine.dialect();

    match cmd.as_str() {
        "select" => {
            let (Some(columns), Some(table)) = (args.next(), args.next()) else {
                return Err("select needs <columns> <table>".into());
            };
            let rest: Vec<String> = args.collect();
            let predicate = match rest.as_slice() {
                [] => None,
                [flag, pred] if flag == "--where" => Some(pred.as_str()),
                [unk, ..] => return Err(format!("unknown argument: {}", unk)),
            };
            println!("{}", dialect.select(&columns, &table, predicate));
            Ok(())
        }
        "insert" => {
            let (Some(table), Some(columns), Some(values)) = (args.next(), args.next(), args.next())
            else {
                return Err("insert needs <table> <columns> <values>".into());
            };
            println!("{}", dialect.insert(&table, &columns, &values));
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
