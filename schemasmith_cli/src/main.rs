mod commands;

use std::io::{self, Write};

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        match commands::parse_args(args.as_slice()).and_then(commands::run) {
            Ok(out) => println!("{out}"),
            Err(err) => {
                eprintln!("Error: {err:#}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("schemasmith_cli (type 'help' or 'exit')");
    loop {
        print!("schemasmith> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => {
                println!("Failed to read input");
                continue;
            }
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let words: Vec<&str> = input.split_whitespace().collect();
        match commands::parse_args(words.as_slice()).and_then(commands::run) {
            Ok(out) => println!("{out}"),
            Err(err) => eprintln!("{err:#}"),
        }
    }
}
