use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use tenant_mgmt_aws::AwsProvider;
use tenant_mgmt_core::assembly::{CloudAssembly, StackArtifact, read_template, write_assembly};
use tenant_mgmt_stacks::config::{AppConfig, Context, DEFAULT_CONTEXT_FILE};
use tenant_mgmt_stacks::{build_app, synthesize};

#[derive(Parser)]
#[command(name = "tenant-mgmt")]
#[command(about = "Synthesize the tenant management infrastructure", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where configuration comes from
#[derive(clap::Args)]
struct ContextArgs {
    /// Context value, e.g. -c env=prod (repeatable; wins over the context file)
    #[arg(long = "context", short = 'c', value_name = "KEY=VALUE")]
    context: Vec<String>,

    /// JSON context file
    #[arg(long, default_value = DEFAULT_CONTEXT_FILE)]
    context_file: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Write templates and manifest to the output directory
    Synth {
        #[command(flatten)]
        context: ContextArgs,

        /// Cloud assembly directory
        #[arg(long, short, default_value = "cdk.out")]
        output: PathBuf,
    },
    /// List stacks in deployment order
    List {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Synthesize and validate without writing anything
    Validate {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Compare synthesized templates with a previously written assembly
    Diff {
        #[command(flatten)]
        context: ContextArgs,

        /// Cloud assembly directory to compare against
        #[arg(long, short, default_value = "cdk.out")]
        output: PathBuf,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Synth { context, output } => run_synth(&context, &output),
        Commands::List { context } => run_list(&context),
        Commands::Validate { context } => run_validate(&context),
        Commands::Diff { context, output } => run_diff(&context, &output),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tenant-mgmt", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Context file (if present) overlaid with `-c` assignments
fn load_context(args: &ContextArgs) -> Result<Context, String> {
    let mut context = match Context::from_file(&args.context_file).map_err(|e| e.to_string())? {
        Some(context) => {
            log::debug!("loaded context from {}", args.context_file.display());
            context
        }
        None => Context::new(),
    };

    let mut overrides = Context::new();
    for assignment in &args.context {
        overrides.assign(assignment).map_err(|e| e.to_string())?;
    }
    context.merge(overrides);
    Ok(context)
}

fn load_config(args: &ContextArgs) -> Result<AppConfig, String> {
    let context = load_context(args)?;
    AppConfig::from_context(&context).map_err(|e| format!("Invalid configuration: {}", e))
}

fn synth(args: &ContextArgs) -> Result<(AppConfig, CloudAssembly), String> {
    let config = load_config(args)?;
    let assembly = synthesize(&config).map_err(|e| format!("Synthesis failed: {}", e))?;
    Ok((config, assembly))
}

fn run_synth(args: &ContextArgs, output: &Path) -> Result<(), String> {
    let (config, assembly) = synth(args)?;

    write_assembly(&assembly, output)
        .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;

    println!("{}", format!("✓ {}", assembly.summary()).green().bold());
    println!("  environment: {}", config.env_name);
    for artifact in &assembly.artifacts {
        println!("  • {}", output.join(artifact.template_file()).display());
    }
    Ok(())
}

fn run_list(args: &ContextArgs) -> Result<(), String> {
    let (_, assembly) = synth(args)?;

    for artifact in &assembly.artifacts {
        if artifact.dependencies.is_empty() {
            println!("{}", artifact.name);
        } else {
            println!(
                "{} {}",
                artifact.name,
                format!("(after {})", artifact.dependencies.join(", ")).dimmed()
            );
        }
    }
    Ok(())
}

fn run_validate(args: &ContextArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let app = build_app(&config).map_err(|e| e.to_string())?;

    println!("{}", "Validating...".cyan());

    let assembly = app.synth(&AwsProvider::new()).map_err(|e| e.to_string())?;

    let summary = assembly.summary();
    println!(
        "{}",
        format!("✓ {} resources validated successfully.", summary.resources)
            .green()
            .bold()
    );
    for artifact in &assembly.artifacts {
        println!(
            "  • {} ({} resources)",
            artifact.name,
            artifact.resource_count()
        );
    }
    Ok(())
}

/// Line counts of a template diff
#[derive(Debug, Default, PartialEq, Eq)]
struct DiffStat {
    insertions: usize,
    deletions: usize,
}

impl DiffStat {
    fn is_empty(&self) -> bool {
        self.insertions == 0 && self.deletions == 0
    }
}

fn diff_stat(old: &str, new: &str) -> DiffStat {
    let diff = TextDiff::from_lines(old, new);
    let mut stat = DiffStat::default();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => stat.deletions += 1,
            ChangeTag::Insert => stat.insertions += 1,
            ChangeTag::Equal => {}
        }
    }
    stat
}

/// How a freshly synthesized template compares with the one on disk
#[derive(Debug, PartialEq, Eq)]
enum StackChange {
    New,
    Unchanged,
    Changed(DiffStat),
}

fn compare_template(old: Option<&str>, new: &str) -> StackChange {
    match old {
        None => StackChange::New,
        Some(old) => {
            let stat = diff_stat(old, new);
            if stat.is_empty() {
                StackChange::Unchanged
            } else {
                StackChange::Changed(stat)
            }
        }
    }
}

fn run_diff(args: &ContextArgs, output: &Path) -> Result<(), String> {
    let (_, assembly) = synth(args)?;

    let mut changed = 0;
    for artifact in &assembly.artifacts {
        let new = artifact.template_text().map_err(|e| e.to_string())?;
        let old = read_template(output, &artifact.name).map_err(|e| e.to_string())?;

        match compare_template(old.as_deref(), &new) {
            StackChange::New => {
                changed += 1;
                println!("{} {}", "+ new stack:".green().bold(), artifact.name);
            }
            StackChange::Unchanged => {
                println!("{} {}", "  unchanged:".dimmed(), artifact.name);
            }
            StackChange::Changed(stat) => {
                changed += 1;
                print_diff(artifact, &stat, old.as_deref().unwrap_or_default(), &new);
            }
        }
    }

    if changed == 0 {
        println!("{}", "No differences.".green());
    } else {
        println!(
            "{}",
            format!("{} stack(s) differ from {}.", changed, output.display())
                .yellow()
                .bold()
        );
    }
    Ok(())
}

fn print_diff(artifact: &StackArtifact, stat: &DiffStat, old: &str, new: &str) {
    println!(
        "\n{} {} ({}, {})",
        "Diff for".cyan().bold(),
        artifact.name,
        format!("+{}", stat.insertions).green(),
        format!("-{}", stat.deletions).red()
    );

    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => continue,
        };
        print!("{}{}", sign, change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(file: &Path, assignments: &[&str]) -> ContextArgs {
        ContextArgs {
            context: assignments.iter().map(|a| a.to_string()).collect(),
            context_file: file.to_path_buf(),
        }
    }

    #[test]
    fn assignments_override_context_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tenant-mgmt.json");
        std::fs::write(
            &file,
            r#"{"context": {"env": "staging", "desiredCount": 3}}"#,
        )
        .unwrap();

        let context = load_context(&args(&file, &["env=prod"])).unwrap();
        assert_eq!(context.get("env"), Some("prod"));
        assert_eq!(context.get("desiredCount"), Some("3"));
    }

    #[test]
    fn missing_context_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let context = load_context(&args(&dir.path().join("absent.json"), &[])).unwrap();
        assert_eq!(context.get("env"), None);
    }

    #[test]
    fn malformed_assignment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_context(&args(&dir.path().join("absent.json"), &["env"])).unwrap_err();
        assert!(err.contains("key=value"));
    }

    #[test]
    fn diff_stat_counts_changed_lines() {
        let stat = diff_stat("a\nb\nc\n", "a\nB\nc\nd\n");
        assert_eq!(
            stat,
            DiffStat {
                insertions: 2,
                deletions: 1
            }
        );
        assert!(diff_stat("same\n", "same\n").is_empty());
    }

    #[test]
    fn template_comparison() {
        assert_eq!(compare_template(None, "{}\n"), StackChange::New);
        assert_eq!(
            compare_template(Some("{}\n"), "{}\n"),
            StackChange::Unchanged
        );
        assert_eq!(
            compare_template(Some("{\n  \"a\": 1\n}\n"), "{\n  \"a\": 2\n}\n"),
            StackChange::Changed(DiffStat {
                insertions: 1,
                deletions: 1
            })
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
