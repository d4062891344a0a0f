
use log::{LevelFilter, debug, error, info, warn};
use indexmap::IndexMap;
use std::time::Instant;

use mycoid::analysis::{run_analysis, AnalysisContext, AnalysisResult, Backends};
use mycoid::backends::BackendError;
use mycoid::backends::alignment::{AlignmentClassifier, AlignmentConfigBuilder};
use mycoid::backends::datasets::DatasetCatalog;
use mycoid::backends::similarity::{CommandSimilaritySearch, SimilarityConfigBuilder};
use mycoid::cli::classify::{ClassifySettings, check_classify_settings, load_fasta_text, method_params};
use mycoid::cli::core::{Commands, get_cli};
use mycoid::cli::datasets::{DatasetsSettings, check_datasets_settings};
use mycoid::cli::normalize::{NormalizeSettings, check_normalize_settings, load_sequence_ids};
use mycoid::data_types::methods::Method;
use mycoid::data_types::similarity::FlatMatchRecord;
use mycoid::normalize::alignment::parse_classification_result;
use mycoid::normalize::display::prepare_for_display;
use mycoid::parsing::validation::MAX_SEQUENCES;
use mycoid::util::json_io::save_json;
use mycoid::writers::archive::{export_alignment_results, export_file_name};
use mycoid::writers::results_table::{format_display_table, write_classification_table};
use mycoid::writers::similarity_export::{format_similarity_table, write_similarity_table};

/// Sets up the logger, 0 = Info, 1 = Debug, 2+ = Trace
fn init_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

/// Settings problems are configuration errors, everything else is an engine failure
fn backend_exit_code(error: &BackendError) -> exitcode::ExitCode {
    match error {
        BackendError::InvalidCutoff { .. } |
        BackendError::InvalidTopN { .. } |
        BackendError::MethodNotImplemented(_) |
        BackendError::BackendUnavailable(_) |
        BackendError::MissingDataDir(_) |
        BackendError::DatasetNotFound { .. } |
        BackendError::MissingDatasetFile { .. } => exitcode::CONFIG,

        BackendError::CommandLaunch { .. } |
        BackendError::WorkingFiles(_) |
        BackendError::SearchFailed(_) |
        BackendError::ClassifyFailed(_) |
        BackendError::EngineFailed(_) |
        BackendError::ResultCountMismatch { .. } |
        BackendError::ResultParse { .. } => exitcode::SOFTWARE,
    }
}

fn run_classify(settings: ClassifySettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_classify_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // load and validate the sequences
    let fasta_text = match load_fasta_text(&settings) {
        Ok(t) => t,
        Err(e) => {
            error!("Error while loading FASTA input: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let params = match method_params(&settings) {
        Ok(p) => p,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let context = match AnalysisContext::new(&fasta_text, params) {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid FASTA input: {e}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    info!("You provided {} valid sequences (max: {MAX_SEQUENCES})", context.input().len());

    // create the primary output folder
    info!("Creating output folder at {:?}...", settings.output_folder);
    if let Err(e) = std::fs::create_dir_all(&settings.output_folder) {
        error!("Error while creating output folder: {e}");
        std::process::exit(exitcode::IOERR);
    }

    // save the CLI options
    let cli_json = settings.output_folder.join("cli_settings.json");
    info!("Saving CLI options to {cli_json:?}...");
    if let Err(e) = save_json(&settings, &cli_json) {
        error!("Error while saving CLI options: {e}");
        std::process::exit(exitcode::IOERR);
    }

    // build the engines; the alignment classifier is only loaded when it will be used
    let similarity_config = match SimilarityConfigBuilder::default()
        .program(settings.search_command.clone())
        .build() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while configuring the similarity engine: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let similarity_engine = CommandSimilaritySearch::new(similarity_config);

    let alignment_classifier = if context.method() == Method::Dnabarcoder {
        let alignment_config = match AlignmentConfigBuilder::default()
            .interpreter(settings.interpreter.clone())
            .script(settings.dnabarcoder_script.clone())
            .data_dir(settings.data_dir().to_path_buf())
            .build() {
            Ok(c) => c,
            Err(e) => {
                error!("Error while configuring the alignment classifier: {e}");
                std::process::exit(exitcode::CONFIG);
            }
        };
        match AlignmentClassifier::new(alignment_config) {
            Ok(c) => Some(c),
            Err(e) => {
                error!("Error while loading the alignment classifier: {e}");
                std::process::exit(backend_exit_code(&e));
            }
        }
    } else {
        None
    };

    let backends = Backends {
        similarity: Some(&similarity_engine),
        alignment: alignment_classifier.as_ref()
    };

    info!("Running {} on {} sequences...", context.method(), context.input().len());
    let result = match run_analysis(&context, &backends) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while running {}: {e}", context.method());
            std::process::exit(backend_exit_code(&e));
        }
    };

    let timestamp = chrono::Local::now();
    let method = result.method();
    match result {
        AnalysisResult::Similarity { raw, matches } => {
            log_similarity_tables(&matches, &context.input().ids(), settings.display_sequence.as_deref());

            let csv_fn = settings.output_folder.join(export_file_name(method, "csv", &timestamp));
            info!("Saving similarity matches to {csv_fn:?}...");
            if let Err(e) = write_similarity_table(&matches, &csv_fn) {
                error!("Error while saving similarity matches: {e:#}");
                std::process::exit(exitcode::IOERR);
            }

            let json_fn = settings.output_folder.join("similarity_results.json");
            info!("Saving raw similarity results to {json_fn:?}...");
            if let Err(e) = save_json(&raw, &json_fn) {
                error!("Error while saving raw similarity results: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        },
        AnalysisResult::Alignment { outcome, table } => {
            info!("{}", outcome.params().caption());
            info!("Reference dataset: {}", outcome.dataset().display_name());
            if table.is_empty() {
                warn!("No classification results were produced");
            } else {
                let rows = match settings.display_sequence.as_deref() {
                    Some(seq_id) if table.has_multiple_sequences() => table.filter_by_sequence(seq_id),
                    _ => table.records().iter().collect()
                };
                if table.has_multiple_sequences() {
                    debug!("Sequences: {:?}", table.display_ids().values().collect::<Vec<_>>());
                }
                info!("Classification results:\n{}", format_display_table(&rows));
            }

            let table_fn = settings.output_folder.join(export_file_name(method, "tsv", &timestamp));
            let zip_fn = settings.output_folder.join(export_file_name(method, "zip", &timestamp));
            info!("Saving results table to {table_fn:?} and result files to {zip_fn:?}...");
            // the outcome is consumed here, its working directory is gone before any exit below
            match export_alignment_results(outcome, table.records(), &table_fn, &zip_fn) {
                Ok(members) => debug!("Archived members: {members:?}"),
                Err(e) => {
                    error!("Error while saving alignment results: {e:#}");
                    std::process::exit(exitcode::IOERR);
                }
            }
        }
    }

    info!("Classification completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

/// Logs one match table per sequence, or only the selected one if it is known
fn log_similarity_tables(matches: &[FlatMatchRecord], sequence_ids: &[String], selected: Option<&str>) {
    let selected = selected.filter(|s| sequence_ids.iter().any(|id| id.as_str() == *s));
    for seq_id in sequence_ids.iter() {
        if selected.is_some_and(|s| s != seq_id.as_str()) {
            continue;
        }
        let records: Vec<&FlatMatchRecord> = matches.iter()
            .filter(|r| &r.sequence_id == seq_id)
            .collect();
        info!("Top matches for {seq_id}:\n{}", format_similarity_table(&records));
    }
}

fn run_datasets(settings: DatasetsSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_datasets_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    let catalog = DatasetCatalog::new(settings.data_dir());
    if let Some(dataset_id) = settings.info_dataset.as_deref() {
        let info = match catalog.info(dataset_id) {
            Ok(i) => i,
            Err(e) => {
                error!("Error while loading dataset information: {e}");
                std::process::exit(backend_exit_code(&e));
            }
        };
        info!("{}", info.display_name);
        info!("\tReference sequences: {}", info.sequence_count);
        if info.taxonomic_ranks.is_empty() {
            info!("\tTaxonomic ranks: Not specified");
        } else {
            info!("\tTaxonomic ranks: {}", info.taxonomic_ranks.join(", "));
        }
        if !info.cutoffs.is_empty() {
            info!("\tTaxonomic cutoffs:");
            for (rank, cutoff) in info.cutoffs.iter() {
                info!("\t\t{rank}: {cutoff}");
            }
        }

        if let Some(output_fn) = settings.output_json.as_deref() {
            info!("Saving dataset information to {output_fn:?}...");
            if let Err(e) = save_json(&info, output_fn) {
                error!("Error while saving dataset information: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        }
    } else {
        let datasets = catalog.available_datasets();
        if datasets.is_empty() {
            warn!("No reference datasets found in {:?}", catalog.root());
        } else {
            info!("Available reference datasets:");
            for dataset in datasets.iter() {
                info!("\t{}\t{}", dataset.id(), dataset.display_name());
            }
        }

        if let Some(output_fn) = settings.output_json.as_deref() {
            let listing: IndexMap<&str, &str> = datasets.iter()
                .map(|d| (d.id(), d.display_name()))
                .collect();
            info!("Saving dataset list to {output_fn:?}...");
            if let Err(e) = save_json(&listing, output_fn) {
                error!("Error while saving dataset list: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        }
    }

    info!("Datasets completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_normalize(settings: NormalizeSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_normalize_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    let sequence_ids = match load_sequence_ids(&settings) {
        Ok(ids) => ids,
        Err(e) => {
            error!("Error while loading FASTA input: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    info!("Loading classifier output from {:?}...", settings.input_filename);
    let records = match parse_classification_result(&settings.input_filename) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while parsing classifier output: {e}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    let table = prepare_for_display(records, &sequence_ids);
    info!("Normalized {} records for {} sequences", table.records().len(), table.sequence_ids().len());

    info!("Saving results table to {:?}...", settings.output_filename);
    if let Err(e) = write_classification_table(table.records(), &settings.output_filename) {
        error!("Error while saving results table: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Normalize completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Classify(settings) => {
            run_classify(*settings);
        },
        Commands::Datasets(settings) => {
            run_datasets(*settings);
        },
        Commands::Normalize(settings) => {
            run_normalize(*settings);
        }
    }

    info!("Process finished successfully.");
}
