use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use celldash_loader::app::{App, DEFAULT_PROJECT, LoadRequest};
use celldash_loader::config::StoreConfig;
use celldash_loader::domain::{AnalysisId, Framework, ProjectName, parse_metadata_pairs};
use celldash_loader::error::LoaderError;
use celldash_loader::es::EsStore;
use celldash_loader::extract::{CsvExtractor, ResultDirs, ResultsExtractor};
use celldash_loader::output::JsonOutput;
use celldash_loader::store::DocumentStore;

#[derive(Parser)]
#[command(name = "celldash")]
#[command(about = "Publish single-cell copy-number analyses to the dashboard's search index")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true, default_value = "localhost", help = "Hostname of the search engine")]
    host: String,

    #[arg(long, global = true, default_value_t = 9200, help = "Port of the search engine")]
    port: u16,

    #[arg(long, global = true, help = "ID of the analysis")]
    id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Load records for the analysis ID from result directories")]
    Load(LoadArgs),
    #[command(about = "Delete collections and records associated with the analysis ID")]
    Clean,
    #[command(about = "Add a new project")]
    AddProject(ProjectArgs),
    #[command(about = "Add analysis IDs to an existing project")]
    AddAnalysesToProject(ProjectArgs),
    #[command(about = "Remove a project")]
    RemoveProject(ProjectNameArg),
    #[command(about = "List all projects")]
    ListProject,
    #[command(about = "Report analyses with metadata but missing data collections")]
    Verify(VerifyArgs),
    #[command(about = "Initialize the store collections and the default project")]
    Initialize,
    #[command(about = "Print the loader version")]
    Version,
}

#[derive(Args)]
struct LoadArgs {
    #[arg(long, help = "Directory with combined QC results")]
    qc: Option<Utf8PathBuf>,

    #[arg(long, help = "Directory with alignment results")]
    alignment: Option<Utf8PathBuf>,

    #[arg(long, help = "Directory with hmmcopy results")]
    hmmcopy: Option<Utf8PathBuf>,

    #[arg(long, help = "Directory with annotation results")]
    annotation: Option<Utf8PathBuf>,

    #[arg(long, value_enum, default_value_t = Framework::Scp, help = "Pipeline that produced the results")]
    framework: Framework,

    #[arg(long, help = "Library ID of the analysis")]
    library: String,

    #[arg(long, help = "Sample ID of the analysis")]
    sample: String,

    #[arg(long, help = "Description of the analysis")]
    description: String,

    #[arg(long = "metadata", help = "Additional metadata as key:value", value_name = "KEY:VALUE")]
    metadata: Vec<String>,

    #[arg(
        long = "project",
        short = 'p',
        default_value = DEFAULT_PROJECT,
        help = "Projects to load the analysis into"
    )]
    projects: Vec<String>,
}

#[derive(Args)]
struct ProjectArgs {
    project: String,

    #[arg(long = "analysis", short = 'a', help = "Analysis IDs to add to the project")]
    analyses: Vec<String>,
}

#[derive(Args)]
struct ProjectNameArg {
    project: String,
}

#[derive(Args)]
struct VerifyArgs {
    #[arg(long, help = "Clean the dangling analyses that are found")]
    delete: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(loader) = report.downcast_ref::<LoaderError>() {
            return ExitCode::from(map_exit_code(loader));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LoaderError) -> u8 {
    match error {
        LoaderError::MissingTable(_)
        | LoaderError::MissingColumn { .. }
        | LoaderError::ResultsNotFound { .. }
        | LoaderError::AnalysesNotLoaded(_)
        | LoaderError::ProjectsMissing(_)
        | LoaderError::ProjectExists(_) => 2,
        LoaderError::StoreHttp(_)
        | LoaderError::StoreStatus { .. }
        | LoaderError::BulkMismatch { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = StoreConfig::resolve(&cli.host, cli.port).into_diagnostic()?;
    let store = EsStore::new(&config).into_diagnostic()?;
    let app = App::new(store, CsvExtractor);

    match cli.command {
        Commands::Load(args) => run_load(args, cli.id, &app),
        Commands::Clean => run_clean(cli.id, &app),
        Commands::AddProject(args) => {
            let (project, analyses) = parse_project_args(&args)?;
            app.add_project(&project, &analyses).into_diagnostic()
        }
        Commands::AddAnalysesToProject(args) => {
            let (project, analyses) = parse_project_args(&args)?;
            app.add_analyses_to_project(&project, &analyses)
                .into_diagnostic()
        }
        Commands::RemoveProject(args) => {
            let project: ProjectName = args.project.parse().into_diagnostic()?;
            app.remove_project(&project).into_diagnostic()
        }
        Commands::ListProject => {
            let result = app.list_projects().into_diagnostic()?;
            JsonOutput::print_projects(&result).into_diagnostic()
        }
        Commands::Verify(args) => {
            let result = app.verify(args.delete).into_diagnostic()?;
            JsonOutput::print_verify(&result).into_diagnostic()
        }
        Commands::Initialize => {
            let result = app.initialize().into_diagnostic()?;
            JsonOutput::print_initialize(&result).into_diagnostic()
        }
        Commands::Version => Ok(()),
    }
}

fn run_load<S: DocumentStore, E: ResultsExtractor>(
    args: LoadArgs,
    id: Option<String>,
    app: &App<S, E>,
) -> miette::Result<()> {
    let Some(id) = id else {
        warn_missing_id();
        return Ok(());
    };
    let id: AnalysisId = id.parse().into_diagnostic()?;

    let dirs = match (&args.qc, &args.alignment, &args.hmmcopy, &args.annotation) {
        (Some(qc), _, _, _) => ResultDirs::combined(qc),
        (None, Some(alignment), Some(hmmcopy), Some(annotation)) => ResultDirs {
            alignment: alignment.clone(),
            hmmcopy: hmmcopy.clone(),
            annotation: annotation.clone(),
        },
        _ => {
            eprintln!(
                "\x1b[33mPlease provide a qc directory or all of alignment, hmmcopy, and annotation directories\x1b[0m"
            );
            return Ok(());
        }
    };

    let metadata = parse_metadata_pairs(&args.metadata).into_diagnostic()?;
    let projects = args
        .projects
        .iter()
        .map(|name| name.parse::<ProjectName>())
        .collect::<Result<Vec<_>, _>>()
        .into_diagnostic()?;

    let request = LoadRequest {
        id,
        dirs,
        framework: args.framework,
        library_id: args.library,
        sample_id: args.sample,
        description: args.description,
        metadata,
        projects,
    };
    let summary = app.load(request).into_diagnostic()?;
    JsonOutput::print_load(&summary).into_diagnostic()
}

fn run_clean<S: DocumentStore, E: ResultsExtractor>(
    id: Option<String>,
    app: &App<S, E>,
) -> miette::Result<()> {
    let Some(id) = id else {
        warn_missing_id();
        return Ok(());
    };
    let id: AnalysisId = id.parse().into_diagnostic()?;
    app.clean(&id).into_diagnostic()
}

fn parse_project_args(args: &ProjectArgs) -> miette::Result<(ProjectName, Vec<AnalysisId>)> {
    let project: ProjectName = args.project.parse().into_diagnostic()?;
    let analyses = args
        .analyses
        .iter()
        .map(|id| id.parse::<AnalysisId>())
        .collect::<Result<Vec<_>, _>>()
        .into_diagnostic()?;
    Ok((project, analyses))
}

fn warn_missing_id() {
    eprintln!("\x1b[33mPlease specify an analysis ID\x1b[0m");
}
