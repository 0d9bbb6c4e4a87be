use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;

use discue_core::{apply_all, plan_all, Op, Plan, ResourceId};
use discue_provider::{build_resources, import, Kind, Stack};
use discue_state::{load_state, state_path, write_state};

#[derive(Parser, Debug)]
#[command(author, version, about = "discue: manage queues, listeners, domains and api keys from a stack file")]
struct Cli {
    /// Stack file (YAML)
    #[arg(short, long, global = true, default_value = "stack.yaml")]
    file: PathBuf,

    /// Directory holding the state file
    #[arg(short, long, default_value = "out", global = true)]
    out: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check the stack file without contacting the API
    Validate,
    Plan,
    Apply,
    /// Re-read every resource in state and store the result
    Refresh,
    Destroy,
    /// Adopt an existing entity, e.g. `import discue_queue.orders <id>`
    Import { address: String, id: String },
}

fn load_stack(path: &Path) -> Result<Stack> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let stack: Stack = serde_yaml::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    stack.validate()?;
    Ok(stack)
}

fn parse_address(address: &str) -> Result<ResourceId> {
    match address.split_once('.') {
        Some((type_name, name)) if !name.is_empty() => {
            Kind::from_type_name(type_name)?;
            Ok(ResourceId::new(type_name, name))
        }
        _ => anyhow::bail!("invalid address '{address}', expected <type>.<name>"),
    }
}

/// One line per pending change; values are left out so nothing sensitive is printed.
fn render_plan(plan: &Plan) -> Vec<String> {
    let (mut add, mut change, mut destroy) = (0, 0, 0);
    let mut lines: Vec<String> = plan
        .pending()
        .map(|(id, op)| {
            match op {
                Op::Create(_) => add += 1,
                Op::Update { .. } => change += 1,
                Op::Replace { .. } => { add += 1; destroy += 1; }
                Op::Delete(_) => destroy += 1,
                Op::Noop => {}
            }
            format!("{:>3} {id}", op.symbol())
        })
        .collect();
    if lines.is_empty() {
        lines.push("No changes.".to_string());
    } else {
        lines.push(format!("Plan: {add} to add, {change} to change, {destroy} to destroy."));
    }
    lines
}

fn print_plan(plan: &Plan) {
    for line in render_plan(plan) {
        println!("{line}");
    }
}

/// Applies `plan` and persists the outputs, even when a step failed midway.
/// Without pending changes the refreshed state is stored as read.
async fn apply_and_save(resources: &[Box<dyn discue_core::Resource>], plan: Plan, out: &Path) -> Result<usize> {
    let mut state = load_state(out)?;
    let mut outputs = plan.refreshed.clone();
    let result = if plan.has_changes() { apply_all(resources, plan, &mut outputs).await } else { Ok(0) };
    state.set_outputs(&outputs);
    write_state(&mut state, out)?;
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().json().with_span_events(FmtSpan::CLOSE).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let stack = load_stack(&cli.file)?;
    if let Cmd::Validate = cli.cmd {
        println!("{} is valid ({} resources).", cli.file.display(), stack.resources.len());
        return Ok(());
    }

    let client = Arc::new(stack.provider.client()?);
    let mut state = load_state(&cli.out)?;
    let prior = state.outputs();
    info!(project = stack.project.as_deref().unwrap_or("-"), state = %state_path(&cli.out).display(), serial = state.serial, "loaded");

    match cli.cmd {
        Cmd::Validate => {}
        Cmd::Plan => {
            let resources = build_resources(&stack.resources, client, &prior)?;
            print_plan(&plan_all(&resources, &prior).await?);
        }
        Cmd::Apply => {
            let resources = build_resources(&stack.resources, client, &prior)?;
            let plan = plan_all(&resources, &prior).await?;
            print_plan(&plan);
            let applied = apply_and_save(&resources, plan, &cli.out).await?;
            if applied > 0 {
                println!("Apply complete! {applied} change(s) applied.");
            }
        }
        Cmd::Refresh => {
            let resources = build_resources(&stack.resources, client, &prior)?;
            let plan = plan_all(&resources, &prior).await?;
            state.set_outputs(&plan.refreshed);
            write_state(&mut state, &cli.out)?;
            println!("Refreshed {} resource(s).", plan.refreshed.len());
        }
        Cmd::Destroy => {
            let resources = build_resources(&[], client, &prior)?;
            let plan = plan_all(&resources, &prior).await?;
            print_plan(&plan);
            let applied = apply_and_save(&resources, plan, &cli.out).await?;
            if applied > 0 {
                println!("Apply complete! {applied} change(s) applied.");
            }
        }
        Cmd::Import { address, id } => {
            let address = parse_address(&address)?;
            if stack.find(&address).is_none() {
                anyhow::bail!("{address} must be declared in {} before it can be imported", cli.file.display());
            }
            if prior.contains_key(&address) {
                anyhow::bail!("{address} is already managed");
            }
            let current = import(&client, &address, &id).await?;
            let mut outputs = prior;
            outputs.insert(address.clone(), current);
            state.set_outputs(&outputs);
            write_state(&mut state, &cli.out)?;
            println!("Imported {address}.");
        }
    }
    Ok(())
}
