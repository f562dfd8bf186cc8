use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use vote_tally::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tally::config_reader::*;

mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Several worksheets found in {path}, the name of the worksheet must be provided"))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("Unexpected cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a column or row index (number starting at 1, or column letters)"))]
    ParsingJsonNumber {},
    #[snafu(display("Cannot find the directory of the configuration file"))]
    MissingParentDir {},
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV content"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Line {lineno}: cannot read the vote count {content:?}"))]
    InvalidCount { lineno: usize, content: String },
    #[snafu(display("No source of votes: provide --input or a configuration file with sources"))]
    NoSources {},
    #[snafu(display("Unknown input type {provider}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Unknown row order {value}, expected as_given or stable"))]
    UnknownRowOrder { value: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TallyError>;
pub type BTabResult<T> = Result<T, Box<TallyError>>;

/// A vote line, as parsed by the readers.
/// This is before checking the categories and candidates against the roster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedRow {
    /// A generated identifier of the line (file name and line number)
    pub id: String,
    pub voter: Option<String>,
    pub category: String,
    pub candidate: String,
    /// None if the line is a single ballot
    pub count: Option<i64>,
}

// Resolves ids and display names of the roster.
struct Roster {
    categories: Vec<EventCategory>,
    candidates: Vec<EventCandidate>,
}

impl Roster {
    fn new(config: &TallyConfig) -> Roster {
        Roster {
            categories: config.categories.clone(),
            candidates: config.candidates.clone(),
        }
    }

    // An empty roster accepts everything.
    fn category_id(&self, s: &str) -> Option<String> {
        if self.categories.is_empty() {
            return Some(s.to_string());
        }
        self.categories
            .iter()
            .find(|c| c.id == s)
            .or_else(|| self.categories.iter().find(|c| c.name == s))
            .map(|c| c.id.clone())
    }

    fn candidate_id(&self, s: &str) -> Option<String> {
        if self.candidates.is_empty() {
            return Some(s.to_string());
        }
        self.candidates
            .iter()
            .find(|c| c.id == s)
            .or_else(|| self.candidates.iter().find(|c| c.name == s))
            .map(|c| c.id.clone())
    }

    fn category_name(&self, id: &str) -> String {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn candidate_name(&self, id: &str) -> String {
        self.candidates
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

fn read_vote_data(root_path: &Path, cfs: &FileSource) -> BTabResult<Vec<ParsedRow>> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read vote file {:?}", p2);
    let rows = match cfs.provider.as_str() {
        "csv" | "csv_ballots" => io_csv::read_csv_rows(&p2, cfs),
        "json" => io_json::read_json_rows(&p2),
        "json_ballots" => io_json::read_json_ballots(&p2),
        "xlsx" | "xlsx_ballots" => io_xlsx::read_excel_rows(&p2, cfs),
        x => Err(Box::new(TallyError::UnknownProvider {
            provider: x.to_string(),
        })),
    }?;
    info!("Read {} lines from {:?}", rows.len(), p2);
    Ok(rows)
}

/// Checks the lines against the roster and turns them into aggregate rows.
///
/// Lines with a count are kept as they are. Lines without a count are single
/// ballots: a later ballot of the same voter in the same category replaces the
/// earlier one, then the ballots are counted. The counted ballots come after the
/// aggregate lines.
fn validate_rows(parsed_rows: &[ParsedRow], roster: &Roster) -> Vec<VoteAggregateRow> {
    let mut rows: Vec<VoteAggregateRow> = Vec::new();
    let mut ballots: Vec<Ballot> = Vec::new();
    for pr in parsed_rows.iter() {
        let category_id = match roster.category_id(pr.category.trim()) {
            Some(x) if !x.is_empty() => x,
            _ => {
                warn!(
                    "validate_rows: line {}: skipping unknown category {:?}",
                    pr.id, pr.category
                );
                continue;
            }
        };
        let candidate_id = match roster.candidate_id(pr.candidate.trim()) {
            Some(x) if !x.is_empty() => x,
            _ => {
                warn!(
                    "validate_rows: line {}: skipping unknown candidate {:?}",
                    pr.id, pr.candidate
                );
                continue;
            }
        };
        match pr.count {
            Some(count) => {
                if count < 0 {
                    warn!(
                        "validate_rows: line {}: negative vote count {}",
                        pr.id, count
                    );
                }
                rows.push(VoteAggregateRow {
                    category_id,
                    candidate_id,
                    vote_count: count,
                });
            }
            None => {
                // Without a voter, every line is a distinct voter.
                let voter = match pr.voter.as_deref().map(|s| s.trim()) {
                    Some(v) if !v.is_empty() => v.to_string(),
                    _ => pr.id.clone(),
                };
                ballots.push(Ballot {
                    voter,
                    category_id,
                    candidate_id,
                });
            }
        }
    }
    debug!(
        "validate_rows: {} aggregate rows, {} ballots",
        rows.len(),
        ballots.len()
    );
    let kept = latest_ballots(&ballots);
    if kept.len() < ballots.len() {
        info!(
            "validate_rows: {} ballots superseded by a later ballot of the same voter",
            ballots.len() - kept.len()
        );
    }
    rows.extend(aggregate_ballots(&kept));
    rows
}

// Categories in roster order, then the ones only seen in the rows.
fn ordered_categories(rows: &[VoteAggregateRow], roster: &Roster) -> Vec<String> {
    let mut res: Vec<String> = roster.categories.iter().map(|c| c.id.clone()).collect();
    for r in rows.iter() {
        if !res.contains(&r.category_id) {
            res.push(r.category_id.clone());
        }
    }
    res
}

fn build_summary_js(
    config: &TallyConfig,
    rows: &[VoteAggregateRow],
    result: &TallyResult,
    roster: &Roster,
) -> JSValue {
    let c = OutputConfig {
        event: config.output_settings.event_name.clone(),
        date: config.output_settings.event_date.clone(),
        venue: config.output_settings.venue.clone(),
    };

    let mut totals: JSMap<String, JSValue> = JSMap::new();
    for (cid, count) in result.totals.iter() {
        totals.insert(roster.candidate_name(cid), json!(count));
    }

    let mut winners: JSMap<String, JSValue> = JSMap::new();
    for (cat, cid) in result.winners.iter() {
        winners.insert(roster.category_name(cat), json!(roster.candidate_name(cid)));
    }

    let mut categories: Vec<JSValue> = Vec::new();
    for cat in ordered_categories(rows, roster) {
        let standings: Vec<JSValue> = category_standings(rows, &cat)
            .iter()
            .map(|s| json!({"candidate": roster.candidate_name(&s.candidate_id), "votes": s.votes}))
            .collect();
        let winner = result.winners.get(&cat).map(|cid| roster.candidate_name(cid));
        categories.push(json!({
            "category": roster.category_name(&cat),
            "winner": winner,
            "standings": standings
        }));
    }

    json!({
        "config": c,
        "results": {
            "totals": totals,
            "winners": winners,
            "categories": categories
        }
    })
}

/// Reads all the sources, runs the tally and returns the JSON summary.
pub fn run_tally(config: &TallyConfig, root_path: &Path, rules: &TallyRules) -> BTabResult<JSValue> {
    info!("config: {:?}", config);
    if config.sources.is_empty() {
        return Err(Box::new(TallyError::NoSources {}));
    }

    let mut data: Vec<ParsedRow> = Vec::new();
    for cfs in config.sources.iter() {
        let mut file_data = read_vote_data(root_path, cfs)?;
        data.append(&mut file_data);
    }

    let roster = Roster::new(config);
    let rows = validate_rows(&data, &roster);
    info!("Processing {} aggregate rows, rules: {:?}", rows.len(), rules);

    let result = compute_tally_with(&rows, rules);
    for (cat, cid) in result.winners.iter() {
        info!(
            "Winner of {}: {}",
            roster.category_name(cat),
            roster.candidate_name(cid)
        );
    }

    Ok(build_summary_js(config, &rows, &result, &roster))
}

fn write_summary(pretty_js: &str, out: &str) -> BTabResult<()> {
    if out == "stdout" {
        println!("{}", pretty_js);
    } else {
        info!("Writing summary to {:?}", out);
        fs::write(out, pretty_js).context(WritingJsonSnafu { path: out })?;
    }
    Ok(())
}

fn check_reference(pretty_js_stats: &str, reference_path: &str) -> BTabResult<()> {
    let summary_ref = read_summary(reference_path)?;
    debug!("reference summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        difference_detected()?;
    }
    info!("The summary matches the reference {:?}", reference_path);
    Ok(())
}

fn difference_detected() -> TabResult<()> {
    whatever!("Difference detected between calculated summary and reference summary")
}

/// Runs a tally from a configuration file, optionally checking the outcome against a reference summary.
pub fn run_tally_config(config_path: &str, reference_path: Option<&str>) -> BTabResult<JSValue> {
    let config = read_config(config_path)?;
    let root_p = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu {})?;
    let rules = TallyRules {
        row_order: config.rules.row_order()?,
    };
    let summary = run_tally(&config, root_p, &rules)?;
    if let Some(reference) = reference_path {
        let pretty_js = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
        check_reference(&pretty_js, reference)?;
    }
    Ok(summary)
}

pub fn run_tally_from_args(args: &Args) -> BTabResult<()> {
    let input_source: Option<FileSource> = args.input.as_ref().map(|input| {
        let provider = args.input_type.clone().unwrap_or_else(|| "csv".to_string());
        let mut source = FileSource::from_path(&provider, input);
        source.excel_worksheet_name = args.excel_worksheet_name.clone();
        source
    });

    let (mut config, root_p): (TallyConfig, PathBuf) = match (&args.config, input_source) {
        (Some(config_path), input_source_o) => {
            let mut config = read_config(config_path)?;
            let root_p = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            if let Some(input_source) = input_source_o {
                // The input is given relative to the working directory.
                let abs_input = fs::canonicalize(&input_source.file_path)
                    .context(OpeningJsonSnafu {
                        path: input_source.file_path.clone(),
                    })?;
                config.sources = vec![FileSource {
                    file_path: abs_input.display().to_string(),
                    ..input_source
                }];
            }
            (config, root_p)
        }
        (None, Some(input_source)) => {
            let name = io_common::simplify_file_name(&input_source.file_path);
            (TallyConfig::from_input(&name, input_source), PathBuf::from("."))
        }
        (None, None) => return Err(Box::new(TallyError::NoSources {})),
    };

    if let Some(ro) = &args.row_order {
        config.rules.row_order = Some(ro.clone());
    }
    let rules = TallyRules {
        row_order: config.rules.row_order()?,
    };

    let summary = run_tally(&config, &root_p, &rules)?;
    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;

    let out: Option<String> = match (&args.out, &config.output_settings.output_directory) {
        (Some(out), _) => Some(out.clone()),
        (None, Some(dir)) => {
            let p: PathBuf = root_p.join(dir).join(format!(
                "{}_summary.json",
                config.output_settings.event_name
            ));
            Some(p.display().to_string())
        }
        (None, None) => None,
    };
    match out {
        Some(o) => write_summary(&pretty_js_stats, &o)?,
        None => write_summary(&pretty_js_stats, "stdout")?,
    }

    if let Some(reference) = &args.reference {
        check_reference(&pretty_js_stats, reference)?;
    }
    Ok(())
}
