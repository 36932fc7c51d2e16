use brreg_etl::domain::catalog::FieldGroup;
use brreg_etl::utils::error::{EtlError, ErrorSeverity};
use brreg_etl::utils::logger;
use brreg_etl::{build_engine, CliConfig, FieldCatalog, RunConfig};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let catalog = Arc::new(FieldCatalog::standard());

    if cli.list_fields {
        print_fields(&catalog);
        return Ok(());
    }

    tracing::info!("Starting brreg-etl");
    tracing::debug!("CLI config: {:?}", cli);

    let config = match RunConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let result = match build_engine(&config, catalog) {
        Ok(mut engine) => engine.run().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            println!("✅ Done: {} of {} companies kept", summary.retained, summary.total_seen);
            if summary.partial {
                println!("⚠️ The registry stopped responding; results are incomplete");
            }
            if summary.interrupted {
                println!("⏹️ Interrupted; saved what was collected so far");
            }
            println!("📁 Output saved to: {}", summary.output);
            let code = summary.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

fn print_fields(catalog: &FieldCatalog) {
    for (group, title) in [
        (FieldGroup::General, "General fields"),
        (FieldGroup::Financial, "Financial fields (need --financials)"),
    ] {
        println!("{}:", title);
        for field in catalog.fields().filter(|f| f.group == group) {
            println!("  {:<20} {}", field.key, field.label);
        }
        println!();
    }
}

fn exit_with(e: EtlError) {
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}
