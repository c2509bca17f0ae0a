// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with `clap` and hands each subcommand to its
// use case in Layer 2:
//
//   1. `export`    dataset fields → data/<split>-<field>.txt
//   2. `train`     one regressor per float32 feature → model/
//   3. `predict`   reload a trained regressor, score a file
//   4. `generate`  train the SMILES generator, write model/output.txt

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ExportArgs, GenerateArgs, PredictArgs, TrainArgs};

use crate::domain::feature_table::FeatureTable;

#[derive(Parser, Debug)]
#[command(
    name = "smiles-regress",
    version,
    about = "Export molecular dataset fields and train SMILES → property regressors."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case; this layer only routes and prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Export(args)   => run_export(args),
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Generate(args) => run_generate(args),
        }
    }
}

fn run_export(args: ExportArgs) -> Result<()> {
    use crate::application::export_use_case::ExportUseCase;
    use crate::data::source::open_source;

    let source = open_source(&args.source)?;
    let report = ExportUseCase::new(source, &args.data_dir).execute()?;

    for file in &report.files {
        println!("{:>8} lines  {}", file.lines, file.path.display());
    }
    println!("Exported {} files.", report.files.len());
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let table = match &args.feature_table {
        Some(path) => FeatureTable::from_json_file(path)?,
        None => FeatureTable::qm9(),
    };
    tracing::info!("Feature table with {} entries", table.len());

    let report = TrainUseCase::new(args.into(), table).execute()?;
    print!("{}", report.render());

    let failed = report.failed();
    if !failed.is_empty() {
        anyhow::bail!("{} of {} features failed: {}", failed.len(), report.outcomes.len(), failed.join(", "));
    }
    println!("Training complete.");
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let output  = args.output.clone();
    let written = PredictUseCase::new(args.into()).execute()?;
    println!("Wrote {} predictions to {}", written, output.display());
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let text = GenerateUseCase::new(args.into()).execute()?;
    println!("\nGenerated: {text}");
    Ok(())
}
