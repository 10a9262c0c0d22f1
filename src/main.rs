use clap::Parser;
use potgather::{Cli, OutputFormatter, OutputMode, PotGather, PotGatherError, UserFriendlyError};
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(&cli);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let potgather = match PotGather::from_cli(&cli) {
        Ok(potgather) => potgather,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&potgather);
    }

    match potgather.run() {
        Ok(_) => 0,
        Err(e) => {
            potgather.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &PotGatherError) -> i32 {
    match error {
        PotGatherError::Config { .. } | PotGatherError::UnsupportedBasePath { .. } => 2,
        PotGatherError::NoSourceFiles { .. } => 3,
        PotGatherError::NoTranslatableContent { .. } => 4,
        PotGatherError::MergeFailed { .. } => 5,
        PotGatherError::OutputExists { .. } => 6,
        _ => 1,
    }
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `-v` when set.
fn setup_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(cli.log_level()).into())
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set up logging: {}", e);
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "potgather.toml".to_string());

    match PotGather::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  potgather --config {}", config_path);
            println!("\nEdit the [[extractors]] tables to match your source languages.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(potgather: &PotGather) -> i32 {
    let formatter = potgather.output_formatter();

    formatter.info("DRY RUN MODE - no extractor will be run");

    match potgather.plan() {
        Ok((files, plan)) => {
            formatter.print_dispatch_plan(&files, &plan);
            if formatter.mode() != OutputMode::Json {
                formatter.print_separator();
                println!(
                    "Would write {}",
                    potgather.config().output.path.display()
                );
            }
            0
        }
        Err(e) => {
            potgather.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn print_startup_error(error: &PotGatherError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
