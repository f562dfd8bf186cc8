// Reading JSON exports of the vote tables.

use serde::{Deserialize, Serialize};

use crate::tally::{io_common::make_default_id_lineno, *};

/// A row of the aggregate query, as exported by the backend.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct AggregateRecord {
    #[serde(alias = "categoryId")]
    category_id: String,
    #[serde(alias = "candidateId")]
    candidate_id: String,
    #[serde(alias = "voteCount", alias = "count")]
    vote_count: i64,
}

/// A row of the ballot table.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct BallotRecord {
    #[serde(alias = "voterName", alias = "voter")]
    voter_name: Option<String>,
    #[serde(alias = "categoryId")]
    category_id: String,
    #[serde(alias = "candidateId")]
    candidate_id: String,
}

fn read_records<T: serde::de::DeserializeOwned>(path: &str) -> BTabResult<Vec<T>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let records: Vec<T> = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(records)
}

pub fn read_json_rows(path: &str) -> BTabResult<Vec<ParsedRow>> {
    let default_id = make_default_id_lineno(path);
    let records: Vec<AggregateRecord> = read_records(path)?;
    let res = records
        .into_iter()
        .enumerate()
        .map(|(idx, r)| ParsedRow {
            id: default_id(idx + 1),
            voter: None,
            category: r.category_id,
            candidate: r.candidate_id,
            count: Some(r.vote_count),
        })
        .collect();
    Ok(res)
}

pub fn read_json_ballots(path: &str) -> BTabResult<Vec<ParsedRow>> {
    let default_id = make_default_id_lineno(path);
    let records: Vec<BallotRecord> = read_records(path)?;
    debug!("read_json_ballots: {} records", records.len());
    let res = records
        .into_iter()
        .enumerate()
        .map(|(idx, r)| ParsedRow {
            id: default_id(idx + 1),
            voter: r.voter_name,
            category: r.category_id,
            candidate: r.candidate_id,
            count: None,
        })
        .collect();
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases() {
        let js = r#"[{"categoryId": "a", "candidateId": "x", "count": 2},
                     {"category_id": "a", "candidate_id": "y", "vote_count": 3}]"#;
        let records: Vec<AggregateRecord> = serde_json::from_str(js).unwrap();
        assert_eq!(records[0].vote_count, 2);
        assert_eq!(records[1].candidate_id, "y");

        let js = r#"[{"voter_name": "Lan", "category_id": "a", "candidate_id": "x"},
                     {"category_id": "a", "candidate_id": "y"}]"#;
        let records: Vec<BallotRecord> = serde_json::from_str(js).unwrap();
        assert_eq!(records[0].voter_name.as_deref(), Some("Lan"));
        assert_eq!(records[1].voter_name, None);
    }

    #[test]
    fn read_export() {
        let path = format!(
            "{}/testdata/json_export/ballots.json",
            env!("CARGO_MANIFEST_DIR")
        );
        let rows = read_json_ballots(&path).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4].id, "ballots.json-00000005");
    }

    #[test]
    fn malformed() {
        let path = format!(
            "{}/testdata/json_export/json_export_config.json",
            env!("CARGO_MANIFEST_DIR")
        );
        let res = read_json_rows(&path);
        assert!(matches!(res.map_err(|e| *e), Err(TallyError::ParsingJson { .. })));
    }
}
