use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cadence_core::config::{CadenceConfig, UserPreferences};
use cadence_core::package::StageOutput;
use cadence_core::stage::{DependencyKind, StageId};
use cadence_core::types::PipelineEvent;

use cadence_agent::workflow::templates;
use cadence_agent::{AgentDataContext, StepStatus, Workflow};

#[derive(Parser)]
#[command(name = "cadence", version, about = "Commercial-planning pipeline orchestration core")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "cadence.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which workflow a query would start
    Detect {
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },
    /// Detect a workflow and drive it to completion, approving review steps
    Walk {
        /// Reviewer input attached to every approved step (JSON or plain text)
        #[arg(long)]
        input: Option<String>,
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },
    /// Print the stage dependency graph
    Graph,
    /// Preview the downstream impact of a change at a stage
    Impact {
        /// Stage where the change is proposed
        stage: String,
        /// Changed field (KEY=VALUE, repeatable)
        #[arg(long = "change", value_name = "KEY=VALUE")]
        changes: Vec<String>,
    },
    /// Apply recorded stage outputs (JSONL) to a fresh context
    Replay {
        /// File with one `{"stage": ..., "data": ...}` object per line
        file: PathBuf,
    },
    /// Show or update user preferences
    Prefs {
        /// Preference to set (KEY=VALUE, repeatable; empty value clears)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        CadenceConfig::load(&cli.config)?
    } else {
        CadenceConfig::default()
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .init();

    if !cli.config.exists() {
        debug!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let prefs_path = config.preferences_file();
    let prefs = UserPreferences::load_or_default(&prefs_path)?;

    match cli.command {
        Commands::Detect { query } => {
            let query = query.join(" ");
            match templates::detect_workflow(&query) {
                Some(wf) => println!("{}", serde_json::to_string_pretty(&wf)?),
                None => println!("No workflow matched: {}", query),
            }
        }
        Commands::Walk { input, query } => {
            let query = query.join(" ");
            let Some(wf) = resolve_workflow(&query, &prefs) else {
                anyhow::bail!("No workflow matched '{}' and no preferred workflow is set", query);
            };
            walk(wf.with_brand_context(prefs.brand_context.clone()), input.as_deref(), &prefs);
        }
        Commands::Graph => print_graph(&AgentDataContext::new(&config)),
        Commands::Impact { stage, changes } => {
            let stage: StageId = stage.parse()?;
            let changes = parse_assignments(&changes)?;
            let ctx = AgentDataContext::new(&config);
            let impact = ctx.get_downstream_impact(stage, &serde_json::Value::Object(changes));
            if impact.is_empty() {
                println!("{} has no downstream stages.", stage.display_name());
            }
            for (downstream, rating) in impact {
                println!(
                    "{:<18} {:<7} {:<22} {}",
                    downstream.display_name(),
                    rating.severity.as_str(),
                    rating.estimated_change,
                    rating.description
                );
            }
        }
        Commands::Replay { file } => replay(&file, &config).await?,
        Commands::Prefs { set } => {
            if set.is_empty() {
                println!("# {}", prefs_path.display());
                println!("{}", toml::to_string_pretty(&prefs)?);
            } else {
                let mut prefs = prefs;
                for assignment in &set {
                    let (key, value) = split_assignment(assignment)?;
                    prefs.set(key, value)?;
                }
                prefs.save(&prefs_path)?;
                info!(path = %prefs_path.display(), "Preferences saved");
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Detected workflow, or the preferred template when nothing matches.
fn resolve_workflow(query: &str, prefs: &UserPreferences) -> Option<Workflow> {
    templates::detect_workflow(query).or_else(|| {
        let id = prefs.preferred_workflow.as_deref()?;
        warn!(workflow = id, "No workflow matched, starting preferred workflow");
        templates::start_workflow(id)
    })
}

fn walk(mut wf: Workflow, input: Option<&str>, prefs: &UserPreferences) {
    println!("{} ({})", wf.name, wf.id);
    if let Some(ctx) = &wf.brand_context {
        let pairs: Vec<_> = ctx.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("brand context: {}", pairs.join(", "));
    }

    for index in 0..wf.len() {
        wf.execute_step(index);
        let step = &wf.steps[index];
        println!(
            "[{}/{}] {:<18} {}",
            index + 1,
            wf.len(),
            step.agent.display_name(),
            step.action
        );
        if prefs.show_reasoning {
            for line in &step.reasoning {
                println!("        - {}", line);
            }
        }

        if wf.requires_review(index) {
            wf.process_module_step(index);
            let decision = reviewer_input(input, &wf.steps[index].data);
            println!("        review: {}", decision);
            wf.approve_module_step(index, Some(decision));
        } else {
            wf.complete_step(index);
        }
        println!("        -> {}", wf.steps[index].status);
    }

    let approved = wf.steps.iter().filter(|s| s.status == StepStatus::Approved).count();
    println!(
        "Done: {:.0}% complete, {} step(s) approved by review",
        wf.progress() * 100.0,
        approved
    );
}

/// Reviewer decision: explicit input, else the first offered option's id.
fn reviewer_input(input: Option<&str>, data: &Option<serde_json::Value>) -> serde_json::Value {
    if let Some(raw) = input {
        return parse_value(raw);
    }
    data.as_ref()
        .and_then(|d| d.get("options"))
        .and_then(|o| o.get(0))
        .and_then(|o| o.get("id"))
        .cloned()
        .unwrap_or(serde_json::Value::Bool(true))
}

fn print_graph(ctx: &AgentDataContext) {
    for (stage, ready) in ctx.readiness() {
        let deps: Vec<_> = ctx
            .graph()
            .dependencies(stage)
            .iter()
            .map(|d| match d.kind {
                DependencyKind::Required => d.stage.to_string(),
                DependencyKind::Feedback => format!("{} (feedback)", d.stage),
            })
            .collect();
        println!(
            "{} {:<18} <- {}",
            if ready { "●" } else { "○" },
            stage.as_str(),
            if deps.is_empty() { "-".to_string() } else { deps.join(", ") }
        );
    }
}

async fn replay(path: &Path, config: &CadenceConfig) -> anyhow::Result<()> {
    let file = std::fs::File::open(path)?;
    let ctx = Arc::new(AgentDataContext::new(config));

    // Mirror context events into the log while the replay runs.
    let mut rx = ctx.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(PipelineEvent::DataFlow(e)) => debug!(from = %e.from, to = %e.to, "data flow"),
                Ok(PipelineEvent::StageUpdated { stage, .. }) => debug!(stage = %stage, "stage updated"),
                Ok(other) => debug!(event = ?other, "context event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Replay listener lagged, skipped events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let output: StageOutput = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("line {}: {}", lineno + 1, e))?;
        let stage = output.stage();
        if !ctx.is_data_available(stage) {
            warn!(stage = %stage, line = lineno + 1, "Stage output recorded before its upstream data");
        }
        ctx.update_agent_data(stage, output)?;
    }

    print_graph(&ctx);
    println!();
    for event in ctx.data_flow_events() {
        println!(
            "{}  {} -> {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.from,
            event.to
        );
    }

    drop(ctx);
    listener.await?;
    Ok(())
}

fn split_assignment(raw: &str) -> anyhow::Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got '{}'", raw))
}

/// JSON when it parses, otherwise a plain string.
fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn parse_assignments(raw: &[String]) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    raw.iter()
        .map(|a| {
            let (k, v) = split_assignment(a)?;
            Ok((k.to_string(), parse_value(v)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments() {
        let parsed = parse_assignments(&["total_budget=2000000".into(), "note=shift to digital".into()]).unwrap();
        assert_eq!(parsed["total_budget"], 2_000_000);
        assert_eq!(parsed["note"], "shift to digital");
        assert!(parse_assignments(&["missing".into()]).is_err());
    }

    #[test]
    fn test_reviewer_input_defaults_to_first_option() {
        let data = Some(serde_json::json!({"options": [{"id": "barrier-led"}, {"id": "hybrid"}]}));
        assert_eq!(reviewer_input(None, &data), "barrier-led");
        assert_eq!(reviewer_input(Some("hybrid"), &data), "hybrid");
        assert_eq!(reviewer_input(None, &None), true);
    }

    #[test]
    fn test_resolve_falls_back_to_preferred() {
        let mut prefs = UserPreferences::default();
        assert!(resolve_workflow("what's the weather", &prefs).is_none());
        prefs.preferred_workflow = Some("content-approval".into());
        assert_eq!(resolve_workflow("what's the weather", &prefs).unwrap().id, "content-approval");
    }
}
