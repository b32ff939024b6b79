use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{HarvestError, Result};
use crate::extract::extract_post_id;

/// Read a CSV table and collect the unique post ids found in `column`.
///
/// Rows whose cell is empty or does not hold a status URL are skipped.
/// Only a column missing from the header is an error.
pub fn collect_post_ids(path: &Path, column: &str) -> Result<BTreeSet<String>> {
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => HarvestError::MissingInput(path.to_path_buf()),
        _ => HarvestError::File { path: path.to_path_buf(), source },
    })?;
    let ids = collect_from_reader(file, column).map_err(|e| match e {
        HarvestError::Schema { column, .. } => HarvestError::Schema { column, path: path.to_path_buf() },
        other => other,
    })?;
    tracing::info!(path = %path.display(), column, unique = ids.len(), "collected post ids");
    Ok(ids)
}

pub fn collect_from_reader<R: Read>(reader: R, column: &str) -> Result<BTreeSet<String>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let idx = rdr
        .headers()?
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| HarvestError::Schema { column: column.to_string(), path: "<reader>".into() })?;

    let mut ids = BTreeSet::new();
    let mut rows = 0usize;
    for record in rdr.records() {
        let record = record?;
        rows += 1;
        let Some(cell) = record.get(idx).filter(|c| !c.is_empty()) else { continue };
        if let Some(id) = extract_post_id(cell) {
            ids.insert(id);
        }
    }
    tracing::debug!(rows, unique = ids.len(), "scanned table");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
id,検証対象URL,note
1,https://x.com/alice/status/100,a
2,https://twitter.com/bob/status/100,dup
3,,empty
4,https://example.com/page,unrelated
5,https://x.com/i/status/200,\"quoted, with comma\"
6
";

    #[test]
    fn dedups_and_skips_unusable_rows() {
        let ids = collect_from_reader(TABLE.as_bytes(), "検証対象URL").unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), ["100", "200"]);
    }

    #[test]
    fn same_input_same_set() {
        let a = collect_from_reader(TABLE.as_bytes(), "検証対象URL").unwrap();
        let b = collect_from_reader(TABLE.as_bytes(), "検証対象URL").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn row_order_does_not_matter() {
        let reversed = "url\nhttps://x.com/a/status/2\nhttps://x.com/a/status/1\n";
        let forward = "url\nhttps://x.com/a/status/1\nhttps://x.com/a/status/2\n";
        assert_eq!(
            collect_from_reader(reversed.as_bytes(), "url").unwrap(),
            collect_from_reader(forward.as_bytes(), "url").unwrap()
        );
    }

    #[test]
    fn missing_column_is_schema_error() {
        let err = collect_from_reader(TABLE.as_bytes(), "url").unwrap_err();
        assert!(matches!(err, HarvestError::Schema { ref column, .. } if column == "url"));
    }

    #[test]
    fn header_only_table_yields_empty_set() {
        assert!(collect_from_reader("url\n".as_bytes(), "url").unwrap().is_empty());
    }

    #[test]
    fn bom_prefixed_header_matches() {
        let table = "\u{feff}url\nhttps://x.com/a/status/9\n";
        assert_eq!(collect_from_reader(table.as_bytes(), "url").unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_post_ids(&dir.path().join("nope.csv"), "url").unwrap_err();
        assert!(matches!(err, HarvestError::MissingInput(_)));
    }

    #[test]
    fn schema_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        match collect_post_ids(&path, "url").unwrap_err() {
            HarvestError::Schema { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
