//! Command-line surface: argument parsing and command dispatch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::entities::aggregate::{self, FacetAggregation, TrialAggregation};
use crate::entities::class_index::ClassMembershipIndex;
use crate::entities::filter::{self, FilterPredicate};
use crate::entities::reference::DrugReferenceTable;
use crate::entities::tooltip::{self, DEFAULT_NAMES_PER_LINE, TooltipRow};
use crate::entities::trial::TrialRecord;
use crate::error::DrugDashError;
use crate::render;
use crate::sources::clinicaltrials::CtGovClient;
use crate::sources::rxnav::RxNavClient;

pub mod health;

#[derive(Parser, Debug)]
#[command(
    name = "drugdash",
    version,
    about = "Aggregate clinical trials and RxNorm drug facets for a selection of drugs"
)]
pub struct Cli {
    /// Emit JSON instead of markdown
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct Selection {
    /// Drug names from the reference table (see `drugdash list`)
    pub drugs: Vec<String>,

    /// Accept names missing from the reference table
    #[arg(long)]
    pub allow_unlisted: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrialFilterArgs {
    /// Keep only trials with this overall status ("All" disables the filter)
    #[arg(long)]
    pub status: Option<String>,

    /// Keep trials listing any of these conditions (repeatable)
    #[arg(long = "condition")]
    pub conditions: Vec<String>,

    /// Write the filtered trials table to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ClassArgs {
    /// Class reference CSV with "Therapeutic Class" and "Drug Name" columns
    #[arg(long)]
    pub class_index: Option<PathBuf>,

    /// Drug names per tooltip line
    #[arg(long, default_value_t = DEFAULT_NAMES_PER_LINE)]
    pub per_line: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show the drug reference table
    List,

    /// Clinical trials for the selected drugs
    Trials {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        filters: TrialFilterArgs,
    },

    /// Brand names, mechanisms of action, indications and therapeutic classes
    Facets {
        #[command(flatten)]
        selection: Selection,
    },

    /// Therapeutic classes with every drug sharing each class
    Classes {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        classes: ClassArgs,
    },

    /// Trials, facets and class tooltips in one pass
    Search {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        filters: TrialFilterArgs,

        #[command(flatten)]
        classes: ClassArgs,
    },

    /// Check connectivity to the upstream APIs
    Health {
        /// Skip the class index check
        #[arg(long)]
        apis_only: bool,
    },
}

/// Maps requested names onto canonical reference names, keeping the first
/// occurrence of repeated names.
pub(crate) fn resolve_selection(
    table: &DrugReferenceTable,
    selection: &Selection,
) -> Result<Vec<String>, DrugDashError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in &selection.drugs {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let name = match table.resolve(raw) {
            Some(name) => name.to_string(),
            None if selection.allow_unlisted => raw.to_string(),
            None => {
                let suggestions = table.suggestions(raw);
                let hint = if suggestions.is_empty() {
                    "Run `drugdash list` to see available drugs.".to_string()
                } else {
                    format!("Did you mean: {}?", suggestions.join(", "))
                };
                return Err(DrugDashError::InvalidArgument(format!(
                    "'{raw}' is not in the drug reference table. {hint} \
                     Pass --allow-unlisted to query it anyway."
                )));
            }
        };
        if seen.insert(name.clone()) {
            out.push(name);
        }
    }

    if out.is_empty() {
        return Err(DrugDashError::InvalidArgument(
            "Please select at least one drug to search.".into(),
        ));
    }
    Ok(out)
}

fn load_class_index(path: Option<&Path>) -> Result<ClassMembershipIndex, DrugDashError> {
    match path {
        Some(path) => ClassMembershipIndex::from_path(path),
        None => ClassMembershipIndex::embedded(),
    }
}

fn filter_predicate(filters: &TrialFilterArgs) -> FilterPredicate {
    FilterPredicate::from_selection(filters.status.as_deref(), &filters.conditions)
}

fn export_trials(
    filters: &TrialFilterArgs,
    aggregation: &TrialAggregation,
    predicate: &FilterPredicate,
) -> Result<Option<String>, DrugDashError> {
    let Some(path) = filters.csv.as_deref() else {
        return Ok(None);
    };
    if aggregation.trials.is_no_results() {
        warn!(path = %path.display(), "no trials to export");
        return Ok(Some(format!(
            "Skipped CSV export to {}: no clinical trials data found for the selected drugs.",
            path.display()
        )));
    }
    let rows = predicate.apply(aggregation.trials.rows());
    render::export::write_trials_to_path(path, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "exported trials");
    Ok(Some(format!(
        "Exported {} trials to {}",
        rows.len(),
        path.display()
    )))
}

fn class_tooltips(facets: &FacetAggregation, index: &ClassMembershipIndex) -> Vec<TooltipRow> {
    tooltip::attach_tooltips(facets.therapeutic_class.rows(), index)
}

#[derive(serde::Serialize)]
struct TrialsOutput<'a> {
    drugs: &'a [String],
    trials: Vec<TrialRecord>,
    total: usize,
    status_options: Vec<String>,
    condition_options: Vec<String>,
    warnings: &'a [aggregate::Warning],
    no_results: bool,
}

impl<'a> TrialsOutput<'a> {
    fn new(
        drugs: &'a [String],
        aggregation: &'a TrialAggregation,
        predicate: &FilterPredicate,
    ) -> Self {
        let all_rows = aggregation.trials.rows();
        Self {
            drugs,
            trials: predicate.apply(all_rows),
            total: all_rows.len(),
            status_options: filter::status_options(all_rows),
            condition_options: filter::condition_options(all_rows),
            warnings: &aggregation.warnings,
            no_results: aggregation.trials.is_no_results(),
        }
    }
}

#[derive(serde::Serialize)]
struct ClassesOutput<'a> {
    drugs: &'a [String],
    therapeutic_classes: Vec<TooltipRow>,
    no_results: bool,
    warnings: &'a [aggregate::Warning],
}

#[derive(serde::Serialize)]
struct SearchOutput<'a> {
    trials: TrialsOutput<'a>,
    facets: &'a FacetAggregation,
    therapeutic_classes: Vec<TooltipRow>,
}

fn append_note(mut body: String, note: Option<String>) -> String {
    if let Some(note) = note {
        if !body.ends_with('\n') {
            body.push('\n');
        }
        body.push('\n');
        body.push_str(&note);
        body.push('\n');
    }
    body
}

/// Rendered command output. `success` is false when the command ran but
/// found a problem worth a non-zero exit, such as a failed health check.
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl From<String> for CommandOutput {
    fn from(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }
}

/// Executes one command and returns its rendered output.
///
/// # Errors
///
/// Returns an error for invalid selections, unreadable class data, failed
/// exports or rendering failures. Upstream API failures are reported inside
/// the output as warnings instead.
pub async fn run(cli: Cli) -> anyhow::Result<CommandOutput> {
    let ctgov = CtGovClient::new()?;
    let rxnav = RxNavClient::new()?;
    execute(cli, &ctgov, &rxnav).await
}

async fn execute(
    cli: Cli,
    ctgov: &CtGovClient,
    rxnav: &RxNavClient,
) -> anyhow::Result<CommandOutput> {
    let json = cli.json;
    let table = DrugReferenceTable::default();

    let text = match cli.command {
        Commands::List => {
            if json {
                let names: Vec<&str> = table.names().collect();
                render::json::to_pretty(&names)?
            } else {
                render::markdown::drug_list_markdown(&table)?
            }
        }
        Commands::Trials { selection, filters } => {
            let drugs = resolve_selection(&table, &selection)?;
            let aggregation = aggregate::aggregate_trials(ctgov, &drugs).await?;
            let predicate = filter_predicate(&filters);
            let note = export_trials(&filters, &aggregation, &predicate)?;
            let body = if json {
                render::json::to_pretty(&TrialsOutput::new(&drugs, &aggregation, &predicate))?
            } else {
                render::markdown::trials_markdown(&drugs, &aggregation, &predicate)?
            };
            append_note(body, note)
        }
        Commands::Facets { selection } => {
            let drugs = resolve_selection(&table, &selection)?;
            let aggregation = aggregate::aggregate_facets(rxnav, &drugs).await?;
            if json {
                render::json::to_pretty(&aggregation)?
            } else {
                render::markdown::facets_markdown(&drugs, &aggregation)?
            }
        }
        Commands::Classes { selection, classes } => {
            let drugs = resolve_selection(&table, &selection)?;
            let index = load_class_index(classes.class_index.as_deref())?;
            let aggregation = aggregate::aggregate_facets(rxnav, &drugs).await?;
            let rows = class_tooltips(&aggregation, &index);
            if json {
                render::json::to_pretty(&ClassesOutput {
                    drugs: &drugs,
                    therapeutic_classes: rows,
                    no_results: aggregation.therapeutic_class.is_no_results(),
                    warnings: &aggregation.warnings,
                })?
            } else {
                render::markdown::classes_markdown(
                    &drugs,
                    &aggregation.therapeutic_class,
                    &rows,
                    &aggregation.warnings,
                    classes.per_line,
                )?
            }
        }
        Commands::Search {
            selection,
            filters,
            classes,
        } => {
            let drugs = resolve_selection(&table, &selection)?;
            let index = load_class_index(classes.class_index.as_deref())?;
            let aggregation = aggregate::aggregate(ctgov, rxnav, &drugs).await?;
            let predicate = filter_predicate(&filters);
            let note = export_trials(&filters, &aggregation.trials, &predicate)?;
            let rows = class_tooltips(&aggregation.facets, &index);

            let body = if json {
                render::json::to_pretty(&SearchOutput {
                    trials: TrialsOutput::new(&drugs, &aggregation.trials, &predicate),
                    facets: &aggregation.facets,
                    therapeutic_classes: rows,
                })?
            } else {
                let mut out =
                    render::markdown::trials_markdown(&drugs, &aggregation.trials, &predicate)?;
                out.push('\n');
                out.push_str(&render::markdown::facets_markdown(
                    &drugs,
                    &aggregation.facets,
                )?);
                out.push('\n');
                // Facet warnings were already listed in the facets section.
                out.push_str(&render::markdown::classes_markdown(
                    &drugs,
                    &aggregation.facets.therapeutic_class,
                    &rows,
                    &[],
                    classes.per_line,
                )?);
                out
            };
            append_note(body, note)
        }
        Commands::Health { apis_only } => {
            let report = health::check(apis_only).await?;
            let text = if json {
                render::json::to_pretty(&report)?
            } else {
                report.to_markdown()
            };
            return Ok(CommandOutput {
                text,
                success: report.all_healthy(),
            });
        }
    };
    Ok(text.into())
}
