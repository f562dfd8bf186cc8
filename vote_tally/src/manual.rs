/*!

This is the long-form manual for `vote_tally` and `motmtally`.

## Counting rules

The votes are folded one row at a time:
* the total of a candidate is the sum of all its rows, across all the categories
* the winner of a category is the candidate of the first row that has the
  strictly greatest count in this category. When two rows have the same count,
  the one seen first keeps the win.

The order of the rows therefore decides ties. By default the rows are counted in
the order in which they are read (`as_given`). With the `stable` row order, the
rows are first sorted by category and then by candidate, so that the outcome does
not depend on the order of the export.

A voter has a single ballot per category: when ballots are read one by one, a later
ballot of the same voter in the same category replaces the earlier one.

## Input formats

The following formats are supported:
* `csv` aggregate rows: category, candidate, count
* `csv_ballots` single ballots: voter, category, candidate
* `json` an array of aggregate rows, as returned by the counting query of the backend
* `json_ballots` an array of ballots, as exported from the ballot table
* `xlsx`, `xlsx_ballots` the same layouts as the CSV formats, in an Excel worksheet

Categories and candidates may be referred to by id or by display name when a
roster is provided in the configuration. Rows with an unknown category or
candidate are skipped with a warning.

### csv

```text
category,candidate,count
mvp,p7,3
mvp,p10,7
best-goal,p7,1
```

The count accepts integers and integral decimals (`3.0`).

### csv_ballots

```text
voter,category,candidate
Minh,mvp,p7
Lan,mvp,p10
Minh,mvp,p10
```

Here `Minh` changed their mind: only the second ballot is counted. Lines without
a voter are counted as distinct voters.

### json and json_ballots

```text
[{"categoryId": "mvp", "candidateId": "p7", "voteCount": 3}]
[{"voterName": "Minh", "categoryId": "mvp", "candidateId": "p7"}]
```

The snake_case names (`category_id`, `vote_count`, `voter_name`) are also accepted.

## Configuration

`motmtally` works without configuration when given `--input`. A configuration file
in JSON describes the event:

```text
{
  "outputSettings": {"eventName": "Cup final", "outputDirectory": "out", "eventDate": "2026-03-14", "venue": "My Dinh"},
  "sources": [{"provider": "csv", "filePath": "votes.csv"}],
  "categories": [{"id": "mvp", "name": "Man of the Match"}],
  "candidates": [{"id": "p7", "name": "Linh Nguyen", "number": 7, "avatarUrl": null}],
  "rules": {"rowOrder": "stable"}
}
```

Options for each source:
 - `firstVoteRowIndex` (string or number, optional, default 2): the first row
   (starting at 1) that contains votes.
 - `categoryColumnIndex`, `candidateColumnIndex`, `countColumnIndex`, `voterColumnIndex`
   (string or number, optional): the location of the columns, either as a number starting
   at 1 or as spreadsheet letters (`"A"`, `"AB"`). A source without a count column
   is read as single ballots.
 - `excelWorksheetName` (string, optional): for Excel inputs, the name of the worksheet.
   It is required when the workbook has several worksheets.

The file paths are relative to the configuration file.

 */
