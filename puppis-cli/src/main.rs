mod record;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use puppis_core::differ::create_plan;
use puppis_core::effect::Effect;
use puppis_core::interpreter::{Interpreter, InterpreterConfig};
use puppis_core::plan::Plan;
use puppis_core::provider::Provider;
use puppis_core::resource::{Resource, ResourceId, State, Value};
use puppis_stack::{Stack, StackConfig};
use puppis_state::{BackendConfig, StateBackend, create_backend};

use record::RecordingProvider;

#[derive(Parser)]
#[command(name = "puppis")]
#[command(about = "Declarative provisioning of a GitOps-managed cluster", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "puppis.json")]
    config: PathBuf,

    /// Path to the state file
    #[arg(long, global = true, default_value = "puppis.state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and the declared stack
    Validate,
    /// Show the execution plan without applying changes
    Plan,
    /// Apply changes to reach the desired state
    Apply {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Remove every recorded resource from the state
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Export the stack as a JSON document in application order
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show the dependency graph in application order
    Graph,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate => run_validate(&cli.config),
        Commands::Plan => run_plan(&cli.config, &cli.state).await,
        Commands::Apply { auto_approve } => run_apply(&cli.config, &cli.state, auto_approve).await,
        Commands::Destroy { auto_approve } => {
            run_destroy(&cli.config, &cli.state, auto_approve).await
        }
        Commands::Export { output } => run_export(&cli.config, output.as_deref()),
        Commands::Graph => run_graph(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Load configuration, falling back to defaults when no file exists.
/// Missing required options still fail stack validation.
fn load_stack(config_path: &Path) -> Result<Stack, String> {
    let config = if config_path.exists() {
        StackConfig::from_file(config_path).map_err(|e| e.to_string())?
    } else {
        let mut config = StackConfig::default();
        config.apply_env_overrides();
        config
    };
    Stack::from_config(config).map_err(|e| e.to_string())
}

fn make_backend(state_path: &Path) -> Result<Box<dyn StateBackend>, String> {
    create_backend(&BackendConfig::local(state_path.display().to_string()))
        .map_err(|e| e.to_string())
}

fn run_validate(config_path: &Path) -> Result<(), String> {
    println!("{}", "Validating...".cyan());

    let stack = load_stack(config_path)?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            stack.resources().len()
        )
        .green()
        .bold()
    );

    for resource in stack.topological_resources() {
        println!("  • {}", resource.id);
    }

    Ok(())
}

async fn run_plan(config_path: &Path, state_path: &Path) -> Result<(), String> {
    let stack = load_stack(config_path)?;
    let backend = make_backend(state_path)?;

    let lock = backend
        .acquire_lock("plan")
        .await
        .map_err(|e| e.to_string())?;
    let result = build_plan(&stack, backend.as_ref()).await;
    backend
        .release_lock(&lock)
        .await
        .map_err(|e| e.to_string())?;

    let plan = result?;
    print_plan(&plan);
    Ok(())
}

async fn build_plan(stack: &Stack, backend: &dyn StateBackend) -> Result<Plan, String> {
    let recorded = match backend.read_state().await.map_err(|e| e.to_string())? {
        Some(file) => file.as_states().map_err(|e| e.to_string())?,
        None => HashMap::new(),
    };

    let desired: Vec<Resource> = stack.topological_resources().into_iter().cloned().collect();
    Ok(create_plan(&desired, &recorded))
}

async fn run_apply(
    config_path: &Path,
    state_path: &Path,
    auto_approve: bool,
) -> Result<(), String> {
    let stack = load_stack(config_path)?;
    let backend = make_backend(state_path)?;

    let lock = backend
        .acquire_lock("apply")
        .await
        .map_err(|e| e.to_string())?;
    let result = apply_inner(&stack, backend.as_ref(), auto_approve).await;
    backend
        .release_lock(&lock)
        .await
        .map_err(|e| e.to_string())?;
    result
}

async fn apply_inner(
    stack: &Stack,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<(), String> {
    let state_file = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    let recorded = state_file.as_states().map_err(|e| e.to_string())?;
    let desired: Vec<Resource> = stack.topological_resources().into_iter().cloned().collect();
    let plan = create_plan(&desired, &recorded);

    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return Ok(());
    }

    print_plan(&plan);
    println!();

    if !auto_approve && !confirm("Do you want to apply these changes?")? {
        println!("{}", "Apply cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let sensitive: HashMap<ResourceId, bool> = stack
        .resources()
        .iter()
        .map(|r| (r.id.clone(), r.sensitive))
        .collect();
    let provider = RecordingProvider::new(state_file, sensitive);
    let interpreter = Interpreter::new(provider).with_config(InterpreterConfig {
        continue_on_error: true,
        ..Default::default()
    });
    let result = interpreter.apply(&plan).await;

    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(_) => println!("  {} {}", "✓".green(), format_effect(effect)),
            Err(e) => println!("  {} {} - {}", "✗".red(), format_effect(effect), e),
        }
    }

    // Persist whatever converged, even after a partial failure
    let mut state_file = interpreter.into_provider().into_state_file();
    state_file.increment_serial();
    backend
        .write_state(&state_file)
        .await
        .map_err(|e| e.to_string())?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", result.success_count)
                .green()
                .bold()
        );
        print_outputs(stack);
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            result.success_count, result.failure_count
        ))
    }
}

async fn run_destroy(
    config_path: &Path,
    state_path: &Path,
    auto_approve: bool,
) -> Result<(), String> {
    let stack = load_stack(config_path)?;
    let backend = make_backend(state_path)?;

    let lock = backend
        .acquire_lock("destroy")
        .await
        .map_err(|e| e.to_string())?;
    let result = destroy_inner(&stack, backend.as_ref(), auto_approve).await;
    backend
        .release_lock(&lock)
        .await
        .map_err(|e| e.to_string())?;
    result
}

async fn destroy_inner(
    stack: &Stack,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<(), String> {
    let Some(state_file) = backend.read_state().await.map_err(|e| e.to_string())? else {
        println!("{}", "No state recorded; nothing to destroy.".green());
        return Ok(());
    };

    let recorded = state_file.as_states().map_err(|e| e.to_string())?;

    // Declared resources go in reverse application order; anything
    // recorded but no longer declared is removed last.
    let mut to_destroy: Vec<ResourceId> = stack
        .topological_resources()
        .into_iter()
        .rev()
        .filter(|r| recorded.contains_key(&r.id))
        .map(|r| r.id.clone())
        .collect();
    let declared: HashSet<ResourceId> = to_destroy.iter().cloned().collect();
    let mut orphaned: Vec<ResourceId> = recorded
        .keys()
        .filter(|id| !declared.contains(id))
        .cloned()
        .collect();
    orphaned.sort_by(|a, b| (&a.resource_type, &a.name).cmp(&(&b.resource_type, &b.name)));
    to_destroy.extend(orphaned);

    if to_destroy.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for id in &to_destroy {
        println!("  {} {}", "-".red().bold(), id);
    }
    println!();
    println!("Plan: {} to destroy.", to_destroy.len().to_string().red());
    println!();

    if !auto_approve {
        println!(
            "{}",
            "Do you really want to destroy all resources?".yellow().bold()
        );
        if !confirm("This action cannot be undone.")? {
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let provider = RecordingProvider::new(state_file, HashMap::new());
    let mut success_count = 0;

    for id in &to_destroy {
        provider.delete(id).await.map_err(|e| e.to_string())?;
        println!("  {} {}", "✓".green(), id);
        success_count += 1;
    }

    let mut state_file = provider.into_state_file();
    state_file.increment_serial();
    backend
        .write_state(&state_file)
        .await
        .map_err(|e| e.to_string())?;

    println!();
    println!(
        "{}",
        format!("Destroy complete! {} resources destroyed.", success_count)
            .green()
            .bold()
    );
    Ok(())
}

fn run_export(config_path: &Path, output: Option<&Path>) -> Result<(), String> {
    let stack = load_stack(config_path)?;
    let document = stack.export_document();
    let rendered = serde_json::to_string_pretty(&document).map_err(|e| e.to_string())?;

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            println!(
                "{}",
                format!("Exported {} resources to {}.", stack.resources().len(), path.display())
                    .green()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn run_graph(config_path: &Path) -> Result<(), String> {
    let stack = load_stack(config_path)?;

    println!("{}", "Application order:".cyan().bold());
    println!();

    for binding in stack.application_order() {
        let mut targets: Vec<&str> = stack
            .graph()
            .dependencies_of(binding)
            .iter()
            .map(|d| d.target.as_str())
            .collect();
        targets.sort();
        targets.dedup();

        if targets.is_empty() {
            println!("  {}", binding.bold());
        } else {
            println!("  {} {} {}", binding.bold(), "←".cyan(), targets.join(", "));
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, String> {
    println!("  {}", format!("{} Type 'yes' to confirm.", prompt).yellow());
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    println!();
    Ok(input.trim() == "yes")
}

fn print_outputs(stack: &Stack) {
    println!();
    println!("{}", "Outputs:".cyan().bold());
    for output in stack.outputs() {
        let rendered = if output.sensitive {
            "(sensitive)".to_string()
        } else {
            format_value(&output.value)
        };
        println!("  {} = {}", output.name, rendered);
    }
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        match effect {
            Effect::Create(resource) => {
                println!(
                    "  {} {}",
                    "+".green().bold(),
                    resource.id.to_string().cyan().bold()
                );
                print_attributes(resource, "    ");
            }
            Effect::Update { id, from, to } => {
                println!("  {} {}", "~".yellow().bold(), id.to_string().cyan().bold());
                print_changes(from, to, "    ");
            }
            Effect::Delete(id) => {
                println!("  {} {}", "-".red().bold(), id.to_string().cyan().bold());
            }
            Effect::Read(_) => {}
        }
    }

    println!();
    println!("{}", plan.summary());
}

fn print_attributes(resource: &Resource, indent: &str) {
    if resource.sensitive {
        println!("{}{}", indent, "(attributes redacted)".yellow());
        return;
    }

    let mut keys: Vec<&String> = resource.attributes.keys().collect();
    keys.sort();
    for key in keys {
        println!(
            "{}{}: {}",
            indent,
            key,
            format_value(&resource.attributes[key]).green()
        );
    }
}

fn print_changes(from: &State, to: &Resource, indent: &str) {
    if to.sensitive {
        println!("{}{}", indent, "(attributes redacted)".yellow());
        return;
    }

    let mut keys: Vec<&String> = to.attributes.keys().collect();
    keys.sort();
    for key in keys {
        let new_value = &to.attributes[key];
        let old_value = from.attributes.get(key);
        if old_value == Some(new_value) {
            continue;
        }

        // Multi-line strings (manifests, policy documents) get a line
        // diff instead of two truncated blobs
        if let (Some(Value::String(old)), Value::String(new)) = (old_value, new_value)
            && (old.contains('\n') || new.contains('\n'))
        {
            println!("{}{}:", indent, key);
            print_text_diff(old, new, indent);
            continue;
        }

        let old_rendered = old_value.map(format_value).unwrap_or_else(|| "(none)".to_string());
        println!(
            "{}{}: {} → {}",
            indent,
            key,
            old_rendered.red(),
            format_value(new_value).green()
        );
    }
}

fn print_text_diff(old: &str, new: &str, indent: &str) {
    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        match change.tag() {
            ChangeTag::Delete => println!("{}  {}", indent, format!("- {}", line).red()),
            ChangeTag::Insert => println!("{}  {}", indent, format!("+ {}", line).green()),
            ChangeTag::Equal => {}
        }
    }
}

fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Create(resource) => format!("create {}", resource.id),
        Effect::Update { id, .. } => format!("update {}", id),
        Effect::Delete(id) => format!("delete {}", id),
        Effect::Read(id) => format!("read {}", id),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.contains('\n') => {
            format!("<{} lines>", s.lines().count())
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Ref(binding, attribute) => format!("${{{}.{}}}", binding, attribute),
        Value::List(_) | Value::Map(_) => value.to_json().to_string(),
    }
}
