mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Command, RootArgs, RunArgs, ValidateArgs};
use enrollment_spans::{pipeline, Expectations, PipelineError, QualityEngine, Severity};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = RootArgs::parse();
    let outcome = match args.command {
        Some(Command::Run(run)) => run_pipeline(&run),
        Some(Command::Validate(validate)) => run_validate(&validate),
        None => run_pipeline(&RunArgs::conventional()),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            report_error(&err);
            std::process::exit(1);
        }
    }
}

fn report_error(err: &anyhow::Error) {
    if let Some(PipelineError::MissingInput { role, path }) = err.downcast_ref::<PipelineError>() {
        eprintln!("❌ {} file not found: {}", role, path.display());
        eprintln!("   Place the input CSV files in the data directory (or pass --membership / --visits).");
        return;
    }
    eprintln!("❌ {err:#}");
}

fn run_pipeline(args: &RunArgs) -> Result<bool> {
    let config = args.to_config();

    if !args.json {
        println!("🩺 Enrollment Spans & Outpatient Utilization");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let output = pipeline::run(&config)?;

    if args.json {
        let json = serde_json::to_string_pretty(&output.summary)
            .context("Failed to serialize run summary")?;
        println!("{json}");
        return Ok(true);
    }

    println!("\n{}", output.summary.render());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Answer 1 (rows in {}): {}", config.span_output_path().display(), output.summary.span_rows);
    println!(
        "Answer 2 (distinct ct_days_with_outpatient_visit values): {}",
        output.summary.distinct_day_value_count
    );
    println!("\nFiles written:");
    println!("  - {}", config.span_output_path().display());
    println!("  - {}", config.result_output_path().display());
    if !output.quality.issues.is_empty() {
        println!("\n⚠️  {}", output.quality.summary());
    }

    Ok(true)
}

fn run_validate(args: &ValidateArgs) -> Result<bool> {
    let engine = QualityEngine::with_expectations(Expectations {
        rows: args.expect_rows,
        distinct_day_values: args.expect_distinct_days,
    });

    let report = engine
        .validate_file(&args.result)
        .with_context(|| format!("Failed to validate {}", args.result.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize quality report")?;
        println!("{json}");
        return Ok(report.passed());
    }

    println!("🔍 Validating {}", args.result.display());
    for issue in &report.issues {
        let marker = match issue.severity {
            Severity::Critical => "❌",
            Severity::Warning => "⚠️ ",
            Severity::Info => "ℹ️ ",
        };
        match &issue.patient_id {
            Some(patient) => println!("{marker} line {} (patient {patient}): {}", issue.line, issue.message),
            None => println!("{marker} {}", issue.message),
        }
    }
    println!("{}", report.summary());
    if report.passed() {
        println!("✅ All checks passed");
    }

    Ok(report.passed())
}
