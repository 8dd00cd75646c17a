//! multi-http — 从批处理文件执行一组并发 HTTP 请求
//!
//! Usage:
//!   multi-http run <batch.json|batch.yaml>        Execute a batch and print a JSON report
//!   multi-http validate <batch.json|batch.yaml>   Check every task without sending anything
//!
//! A batch file is a list of request specs, each with an optional `name`:
//!
//! ```yaml
//! - name: trades
//!   url: http://trade.local/list?type=6
//!   method: get
//! - url: http://order.local/query
//!   method: post
//!   encoding: json
//!   params: {seller_uid: 97947, count: 1}
//!   timeout_ms: 2000
//! ```

use anyhow::{bail, Context};
use multi_http_batch::{BatchController, RequestSpec, TaskId, TaskInfo};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct BatchEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    spec: RequestSpec,
}

#[derive(Debug, Serialize)]
struct TaskReport {
    id: TaskId,
    info: TaskInfo,
    body: String,
}

#[derive(Debug, Serialize)]
struct BatchReport {
    status: bool,
    exec_time: f64,
    tasks: Vec<TaskReport>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "run" => cmd_run(&args[2..]),
        "validate" => cmd_validate(&args[2..]),
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"multi-http — 并发批量 HTTP 请求工具

USAGE:
    multi-http <COMMAND> [ARGS]

COMMANDS:
    run <file>          Execute all tasks in a JSON/YAML batch file
    validate <file>     Check the batch file without sending requests
    version             Show version information
    help                Show this help message

ENVIRONMENT:
    RUST_LOG                        Log filter (default: warn)
    MULTI_HTTP_USER_AGENT           Client identifier for GET requests
    MULTI_HTTP_PROXY_URL            Proxy for all requests
    MULTI_HTTP_MAX_REDIRECTS        Redirects to follow (default: 0)
    MULTI_HTTP_MAX_RESPONSE_BYTES   Cut stored bodies at this size"#
    );
}

fn cmd_version() {
    println!("multi-http {}", env!("CARGO_PKG_VERSION"));
}

fn load_batch(args: &[String]) -> anyhow::Result<BatchController> {
    let Some(path) = args.first() else {
        bail!("missing batch file argument");
    };
    let path = Path::new(path);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let entries = parse_entries(&content, is_json)
        .with_context(|| format!("cannot load batch from {}", path.display()))?;

    let batch = BatchController::new()?;
    add_entries(&batch, entries)?;
    Ok(batch)
}

fn parse_entries(content: &str, is_json: bool) -> anyhow::Result<Vec<BatchEntry>> {
    let entries = if is_json {
        serde_json::from_str(content).context("not a valid JSON batch")?
    } else {
        serde_yaml::from_str(content).context("not a valid YAML batch")?
    };
    Ok(entries)
}

fn add_entries(batch: &BatchController, entries: Vec<BatchEntry>) -> anyhow::Result<()> {
    for (i, entry) in entries.into_iter().enumerate() {
        batch
            .insert(entry.spec, entry.name.map(TaskId::Named))
            .with_context(|| format!("entry #{i}"))?;
    }
    Ok(())
}

fn cmd_validate(args: &[String]) -> anyhow::Result<()> {
    let batch = load_batch(args)?;
    for (id, spec) in batch.task_list() {
        println!("  {id}: {} {} ... OK", spec.method, spec.url);
    }
    println!("{} task(s) valid", batch.len());
    Ok(())
}

fn cmd_run(args: &[String]) -> anyhow::Result<()> {
    let batch = load_batch(args)?;
    batch.execute()?;

    let mut tasks = Vec::with_capacity(batch.len());
    for id in batch.task_ids() {
        let result = batch.result(&id)?;
        tasks.push(TaskReport {
            body: result.text_lossy(),
            info: result.info,
            id,
        });
    }
    let report = BatchReport {
        status: batch.status(),
        exec_time: batch.exec_time(),
        tasks,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
