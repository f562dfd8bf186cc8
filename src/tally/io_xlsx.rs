use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::tally::{io_common::make_default_id_lineno, *};

/// Reads the votes from an Excel workbook. The layout of the columns follows
/// the same conventions as the CSV files.
///
/// Rows and columns are positions in the worksheet (row 1 is the first row of
/// the sheet), even when the sheet starts with blank rows or columns.
pub fn read_excel_rows(path: &str, cfs: &FileSource) -> BTabResult<Vec<ParsedRow>> {
    let default_id = make_default_id_lineno(path);
    let wrange = get_range(path, cfs)?;

    let first_row = cfs.first_vote_row_index()?;
    let category_idx = cfs.category_column_index()?;
    let candidate_idx = cfs.candidate_column_index()?;
    let count_idx_o = cfs.count_column_index()?;
    let voter_idx_o = cfs.voter_column_index()?;

    let mut res: Vec<ParsedRow> = Vec::new();
    let last_row = match wrange.end() {
        Some((r, _)) => r as usize,
        None => {
            warn!("read_excel_rows: empty worksheet in {:?}", path);
            return Ok(res);
        }
    };

    for row_idx in first_row..=last_row {
        let lineno = row_idx + 1;
        // Cells outside of the used range are empty.
        let cell = |col: usize| {
            wrange
                .get_value((row_idx as u32, col as u32))
                .unwrap_or(&DataType::Empty)
        };

        let mut used: Vec<usize> = vec![category_idx, candidate_idx];
        used.extend(count_idx_o);
        used.extend(voter_idx_o);
        if used.iter().all(|c| cell_text(cell(*c)).trim().is_empty()) {
            continue;
        }
        debug!(
            "read_excel_rows: lineno: {:?} cells: {:?}",
            lineno,
            used.iter().map(|c| cell(*c)).collect::<Vec<_>>()
        );

        let count = match count_idx_o {
            Some(count_idx) => {
                let c = cell(count_idx);
                Some(cell_count(c).context(ExcelWrongCellTypeSnafu {
                    lineno,
                    content: format!("{:?}", c),
                })?)
            }
            None => None,
        };

        res.push(ParsedRow {
            id: default_id(lineno),
            voter: voter_idx_o.map(|idx| cell_text(cell(idx))),
            category: cell_text(cell(category_idx)),
            candidate: cell_text(cell(candidate_idx)),
            count,
        });
    }
    Ok(res)
}

fn get_range(path: &str, cfs: &FileSource) -> BTabResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(TallyError::EmptyExcel {
                path: path.to_string(),
            })),
            [(worksheet_name, wrange)] => {
                debug!("get_range: using worksheet {:?}", worksheet_name);
                Ok(wrange.clone())
            }
            _ => Err(Box::new(TallyError::AmbiguousWorksheet {
                path: path.to_string(),
            })),
        }
    }
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        // Identifiers typed as numbers come back as floats.
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn cell_count(cell: &DataType) -> Option<i64> {
    match cell {
        DataType::Int(i) => Some(*i),
        DataType::Float(f) => io_common::float_count(*f),
        DataType::String(s) => io_common::parse_count(s),
        _ => None,
    }
}
