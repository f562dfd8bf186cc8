use crate::tally::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "eventDate")]
    pub event_date: Option<String>,
    #[serde(rename = "venue")]
    pub venue: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub event: String,
    pub date: Option<String>,
    pub venue: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteRowIndex")]
    pub first_vote_row_index: Option<JSValue>,
    #[serde(rename = "categoryColumnIndex")]
    pub category_column_index: Option<JSValue>,
    #[serde(rename = "candidateColumnIndex")]
    pub candidate_column_index: Option<JSValue>,
    #[serde(rename = "countColumnIndex")]
    pub count_column_index: Option<JSValue>,
    #[serde(rename = "voterColumnIndex")]
    pub voter_column_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

// The position of the columns (1-based) when the source does not specify them.
struct ColumnLayout {
    voter: Option<usize>,
    category: usize,
    candidate: usize,
    count: Option<usize>,
}

impl FileSource {
    pub fn from_path(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            first_vote_row_index: None,
            category_column_index: None,
            candidate_column_index: None,
            count_column_index: None,
            voter_column_index: None,
            excel_worksheet_name: None,
        }
    }

    fn default_layout(&self) -> ColumnLayout {
        match self.provider.as_str() {
            // voter, category, candidate
            "csv_ballots" | "xlsx_ballots" => ColumnLayout {
                voter: Some(1),
                category: 2,
                candidate: 3,
                count: None,
            },
            // category, candidate, count
            _ => ColumnLayout {
                voter: None,
                category: 1,
                candidate: 2,
                count: Some(3),
            },
        }
    }

    /// The index (0-based) of the first row containing votes. By default the
    /// first row is a header.
    pub fn first_vote_row_index(&self) -> TabResult<usize> {
        match &self.first_vote_row_index {
            None => Ok(1),
            x => to_zero_based(read_js_int(x)?),
        }
    }

    pub fn category_column_index(&self) -> TabResult<usize> {
        match &self.category_column_index {
            None => Ok(self.default_layout().category - 1),
            x => to_zero_based(read_js_int(x)?),
        }
    }

    pub fn candidate_column_index(&self) -> TabResult<usize> {
        match &self.candidate_column_index {
            None => Ok(self.default_layout().candidate - 1),
            x => to_zero_based(read_js_int(x)?),
        }
    }

    /// No count column means that every row is a single ballot.
    pub fn count_column_index(&self) -> TabResult<Option<usize>> {
        match &self.count_column_index {
            None => Ok(self.default_layout().count.map(|x| x - 1)),
            x => to_zero_based(read_js_int(x)?).map(Some),
        }
    }

    pub fn voter_column_index(&self) -> TabResult<Option<usize>> {
        match &self.voter_column_index {
            None => Ok(self.default_layout().voter.map(|x| x - 1)),
            x => to_zero_based(read_js_int(x)?).map(Some),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EventCategory {
    pub id: String,
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EventCandidate {
    pub id: String,
    pub name: String,
    pub number: Option<i64>,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventRules {
    #[serde(rename = "rowOrder")]
    pub row_order: Option<String>,
}

impl EventRules {
    pub fn row_order(&self) -> TabResult<RowOrder> {
        match self.row_order.as_deref() {
            None => Ok(RowOrder::AsGiven),
            Some(s) => parse_row_order(s),
        }
    }
}

pub fn parse_row_order(s: &str) -> TabResult<RowOrder> {
    match s {
        "as_given" | "asGiven" => Ok(RowOrder::AsGiven),
        "stable" | "byCategoryThenCandidate" => Ok(RowOrder::ByCategoryThenCandidate),
        x => UnknownRowOrderSnafu { value: x }.fail(),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub sources: Vec<FileSource>,
    #[serde(default)]
    pub categories: Vec<EventCategory>,
    #[serde(default)]
    pub candidates: Vec<EventCandidate>,
    #[serde(default)]
    pub rules: EventRules,
}

impl TallyConfig {
    /// A configuration with a single source and no roster.
    pub fn from_input(event_name: &str, source: FileSource) -> TallyConfig {
        TallyConfig {
            output_settings: OutputSettings {
                event_name: event_name.to_string(),
                output_directory: None,
                event_date: None,
                venue: None,
            },
            sources: vec![source],
            categories: Vec::new(),
            candidates: Vec::new(),
            rules: EventRules::default(),
        }
    }
}

pub fn read_config(path: &str) -> BTabResult<TallyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: TallyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> BTabResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn to_zero_based(x: usize) -> TabResult<usize> {
    // Indexes start at 1 to follow the conventions of spreadsheets.
    x.checked_sub(1).context(ParsingJsonNumberSnafu {})
}

/// Reads a 1-based index: a number, a numeric string or a column name ("A", "AB").
fn read_js_int(x: &Option<JSValue>) -> TabResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        // Parsing the Excel-style columns
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_uppercase()
                .chars()
                .try_fold(0usize, |acc, c| {
                    acc.checked_mul(26)?
                        .checked_add(c as usize - 'A' as usize + 1)
                })
                .context(ParsingJsonNumberSnafu {})
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}
