use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use schemasmith_core::ddl::{order_ddl_text, render_script};
use schemasmith_core::dml::format_result_set;
use schemasmith_core::parser::parse_ddl;
use schemasmith_core::{CoreConfig, DesignInput, DesignOutput, DesignSession};
use serde::Deserialize;
use tracing::debug;

pub const USAGE: &str = "\
Commands:
  design <input.json> [--config <file>] [--server <url>]  -> run the full design pipeline
  order <file.sql>                                        -> re-emit DDL in dependency order
  parse <file.sql>                                        -> show the parsed schema as JSON
  help                                                    -> help
  exit|quit                                               -> quit (interactive mode)";

#[derive(Debug, PartialEq)]
pub enum Command {
    Design {
        input: PathBuf,
        config: Option<PathBuf>,
        server: Option<String>,
    },
    Order(PathBuf),
    Parse(PathBuf),
    Help,
}

pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
    let Some((&first, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    match first.to_lowercase().as_str() {
        "design" => {
            let mut input = None;
            let mut config = None;
            let mut server = None;
            let mut it = rest.iter().copied();
            while let Some(arg) = it.next() {
                match arg {
                    "--config" => {
                        config = Some(PathBuf::from(it.next().context("--config needs a file")?))
                    }
                    "--server" => {
                        server = Some(it.next().context("--server needs a url")?.to_string())
                    }
                    other if input.is_none() => input = Some(PathBuf::from(other)),
                    other => bail!("Unexpected argument '{other}'"),
                }
            }
            Ok(Command::Design {
                input: input.context("design needs an input file")?,
                config,
                server,
            })
        }
        "order" | "parse" => {
            let &[path] = rest else {
                bail!("{first} needs exactly one SQL file");
            };
            let path = PathBuf::from(path);
            if first.eq_ignore_ascii_case("order") {
                Ok(Command::Order(path))
            } else {
                Ok(Command::Parse(path))
            }
        }
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("Unknown command '{other}'. Type 'help' for usage."),
    }
}

pub fn run(command: Command) -> Result<String> {
    match command {
        Command::Help => Ok(USAGE.to_string()),
        Command::Order(path) => {
            let sql = read(&path)?;
            Ok(render_script(&order_ddl_text(&sql)?))
        }
        Command::Parse(path) => {
            let sql = read(&path)?;
            Ok(serde_json::to_string_pretty(&parse_ddl(&sql)?)?)
        }
        Command::Design {
            input,
            config,
            server,
        } => {
            let raw = read(&input)?;
            let design: DesignInput = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid design input", input.display()))?;
            match server {
                Some(url) => design_remote(&url, &design),
                None => {
                    let config = match config {
                        Some(path) => CoreConfig::load_from_path(&path)?,
                        None => CoreConfig::default(),
                    };
                    let output = DesignSession::new(config)?.run(&design)?;
                    Ok(render_output(&output))
                }
            }
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[derive(Deserialize)]
struct RemoteError {
    kind: String,
    message: String,
}

fn design_remote(base: &str, design: &DesignInput) -> Result<String> {
    let url = format!("{}/v1/design", base.trim_end_matches('/'));
    debug!(%url, "posting design input");
    let response = reqwest::blocking::Client::new()
        .post(&url)
        .json(design)
        .send()
        .with_context(|| format!("Failed to reach {url}"))?;
    if !response.status().is_success() {
        let status = response.status();
        return match response.json::<RemoteError>() {
            Ok(err) => bail!("{} ({}): {}", status, err.kind, err.message),
            Err(_) => bail!("server answered {status}"),
        };
    }
    let body: serde_json::Value = response.json()?;
    Ok(serde_json::to_string_pretty(&body)?)
}

/// Plain-text report of a local run.
pub fn render_output(output: &DesignOutput) -> String {
    let mut out = Vec::new();
    let c = &output.classification;
    out.push(format!(
        "session {}\ncategory: {} (rule: {}{})",
        output.session_id,
        c.category,
        c.rule,
        if c.defaulted { ", defaulted" } else { "" }
    ));

    out.push("\n-- optimizer".to_string());
    for r in &output.rationale {
        let target = r.table.as_deref().unwrap_or("*");
        out.push(format!("[{}] {}: {}", r.rule, target, r.message));
    }

    out.push("\n-- ddl".to_string());
    out.push(output.script.clone());

    let p = &output.performance;
    out.push("\n-- performance".to_string());
    out.push(format!("transactional latency: {}", p.transactional_latency));
    out.push(format!("analytical throughput: {}", p.analytical_throughput));
    out.push(format!(
        "best for transactions: {}, best for analysis: {}",
        p.best_transactional, p.best_analytical
    ));
    for b in &p.bottlenecks {
        out.push(format!("bottleneck {:?}: {}", b.kind, b.message));
    }

    for rs in &output.result_sets {
        out.push(format!("\n-- example rows: {}", rs.table));
        out.push(format_result_set(rs));
    }

    if let Some(report) = &output.sample_report {
        out.push(format!("\n-- samples: {} rows checked", report.checked_rows));
        for f in &report.findings {
            let col = f.column.as_deref().unwrap_or("-");
            out.push(format!("{}[{}].{}: {}", f.table, f.row, col, f.message));
        }
    }
    out.join("\n")
}
