use std::sync::OnceLock;

use minijinja::{Environment, Value, context};

use crate::entities::FacetTable;
use crate::entities::aggregate::{FacetAggregation, TrialAggregation, Warning};
use crate::entities::facet::{Facet, FacetRecord};
use crate::entities::filter::{self, FilterPredicate};
use crate::entities::reference::DrugReferenceTable;
use crate::entities::tooltip::TooltipRow;
use crate::error::DrugDashError;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(serde::Serialize)]
struct FacetSection<'a> {
    title: &'static str,
    column: &'static str,
    has_class_type: bool,
    rows: &'a [FacetRecord],
}

#[derive(serde::Serialize)]
struct ClassRow<'a> {
    drug_name: &'a str,
    value: &'a str,
    class_type: Option<&'a str>,
    tooltip: String,
}

fn markdown_cell(value: Value) -> String {
    if value.is_undefined() || value.is_none() {
        return String::new();
    }
    value
        .to_string()
        .replace('|', "\\|")
        .replace('[', "\\[")
        .replace(']', "\\]")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

fn env() -> Result<&'static Environment<'static>, DrugDashError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_filter("cell", markdown_cell);
    env.add_template(
        "warnings.md.j2",
        include_str!("../../templates/warnings.md.j2"),
    )?;
    env.add_template(
        "drug_list.md.j2",
        include_str!("../../templates/drug_list.md.j2"),
    )?;
    env.add_template("trials.md.j2", include_str!("../../templates/trials.md.j2"))?;
    env.add_template("facets.md.j2", include_str!("../../templates/facets.md.j2"))?;
    env.add_template(
        "classes.md.j2",
        include_str!("../../templates/classes.md.j2"),
    )?;

    let _ = ENV.set(env);
    ENV.get().ok_or_else(|| DrugDashError::Api {
        api: "render".into(),
        message: "Template environment initialization failed".into(),
    })
}

fn warning_lines<'a>(warnings: impl IntoIterator<Item = &'a Warning>) -> Vec<String> {
    warnings.into_iter().map(ToString::to_string).collect()
}

fn describe_status(predicate: &FilterPredicate) -> String {
    predicate
        .status
        .clone()
        .unwrap_or_else(|| filter::ALL.to_string())
}

fn describe_conditions(predicate: &FilterPredicate) -> Vec<String> {
    match &predicate.conditions {
        Some(set) => set.iter().cloned().collect(),
        None => vec![filter::ALL.to_string()],
    }
}

pub fn drug_list_markdown(table: &DrugReferenceTable) -> Result<String, DrugDashError> {
    let names: Vec<&str> = table.names().collect();
    let tmpl = env()?.get_template("drug_list.md.j2")?;
    Ok(tmpl.render(context! {
        count => table.len(),
        names => names,
    })?)
}

/// Trials table after filtering, with the filter option lists of the full table.
pub fn trials_markdown(
    drugs: &[String],
    aggregation: &TrialAggregation,
    predicate: &FilterPredicate,
) -> Result<String, DrugDashError> {
    let all_rows = aggregation.trials.rows();
    let rows = predicate.apply(all_rows);
    let tmpl = env()?.get_template("trials.md.j2")?;
    Ok(tmpl.render(context! {
        drugs => drugs,
        warnings => warning_lines(&aggregation.warnings),
        no_results => aggregation.trials.is_no_results(),
        status => describe_status(predicate),
        conditions => describe_conditions(predicate),
        total => all_rows.len(),
        rows => rows,
        status_options => filter::status_options(all_rows),
        condition_options => filter::condition_options(all_rows),
    })?)
}

pub fn facets_markdown(
    drugs: &[String],
    aggregation: &FacetAggregation,
) -> Result<String, DrugDashError> {
    let sections: Vec<FacetSection<'_>> = Facet::ALL
        .into_iter()
        .map(|facet| FacetSection {
            title: facet.title(),
            column: facet.value_column(),
            has_class_type: facet.has_class_type(),
            rows: aggregation.table(facet).rows(),
        })
        .collect();
    let tmpl = env()?.get_template("facets.md.j2")?;
    Ok(tmpl.render(context! {
        drugs => drugs,
        warnings => warning_lines(&aggregation.warnings),
        sections => sections,
    })?)
}

/// Therapeutic-class rows with their peer tooltips, `per_line` names per line.
pub fn classes_markdown(
    drugs: &[String],
    table: &FacetTable<FacetRecord>,
    rows: &[TooltipRow],
    warnings: &[Warning],
    per_line: usize,
) -> Result<String, DrugDashError> {
    let class_rows: Vec<ClassRow<'_>> = if table.is_no_results() {
        Vec::new()
    } else {
        rows.iter()
            .map(|row| ClassRow {
                drug_name: &row.record.drug_name,
                value: &row.record.value,
                class_type: row.record.class_type.as_deref(),
                tooltip: row.tooltip_text(per_line),
            })
            .collect()
    };
    let tmpl = env()?.get_template("classes.md.j2")?;
    Ok(tmpl.render(context! {
        drugs => drugs,
        warnings => warning_lines(warnings),
        rows => class_rows,
    })?)
}
