// Primitives for reading CSV files.

use std::fs::File;

use crate::tally::{io_common::make_default_id_lineno, io_common::parse_count, *};

/// Reads a CSV export, either of aggregate rows (with a count column) or of
/// single ballots (without one).
pub fn read_csv_rows(path: &str, cfs: &FileSource) -> BTabResult<Vec<ParsedRow>> {
    let default_id = make_default_id_lineno(path);

    let category_idx = cfs.category_column_index()?;
    let candidate_idx = cfs.candidate_column_index()?;
    let count_idx_o = cfs.count_column_index()?;
    let voter_idx_o = cfs.voter_column_index()?;

    let mut res: Vec<ParsedRow> = Vec::new();
    let (records, row_offset) = get_records(path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_rows: lineno: {:?} line: {:?}", lineno, line);
        // Blank lines at the end of exports
        if line.iter().all(|s| s.trim().is_empty()) {
            continue;
        }

        let category = line
            .get(category_idx)
            .context(CsvLineTooShortSnafu { lineno })?
            .to_string();
        let candidate = line
            .get(candidate_idx)
            .context(CsvLineTooShortSnafu { lineno })?
            .to_string();

        let count: Option<i64> = if let Some(count_idx) = count_idx_o {
            let s = line
                .get(count_idx)
                .context(CsvLineTooShortSnafu { lineno })?;
            let c = parse_count(s).context(InvalidCountSnafu {
                lineno,
                content: s,
            })?;
            Some(c)
        } else {
            None
        };

        let voter: Option<String> = match voter_idx_o {
            Some(voter_idx) => Some(
                line.get(voter_idx)
                    .context(CsvLineTooShortSnafu { lineno })?
                    .to_string(),
            ),
            None => None,
        };

        res.push(ParsedRow {
            id: default_id(lineno),
            voter,
            category,
            candidate,
            count,
        });
    }
    Ok(res)
}

fn get_records(path: &str, cfs: &FileSource) -> TabResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    for _ in 0..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
