//! Common routines for handling input data.
//!
//! The configuration store is a directory containing one CSV file per input table. Columns are
//! matched by header name, so column order within a file does not matter.
use crate::id::{IDLike, TechID};
use anyhow::{Context, Result, bail, ensure};
use csv::StringRecord;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod connection;
pub mod fuel;
pub mod power_plant;
pub mod system;

use connection::{Connection, read_connections};
use fuel::{Fuel, read_fuels};
use power_plant::{PowerPlantTables, read_power_plants};
use system::{SystemTables, read_system_tables};

/// Text markers which are read as a missing value
const MISSING_MARKERS: [&str; 5] = ["nan", "null", "none", "na", "n/a"];

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = read_csv_optional(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }

    Ok(vec)
}

/// Read a series of type `T`s from a CSV file, which may contain no rows.
///
/// The file itself must exist.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;

    reader
        .deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check that a slice is sorted in strictly ascending order
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.iter().tuple_windows().all(|(a, b)| a < b)
}

/// Whether a cell holds one of the text markers used for missing values
fn is_missing_marker(s: &str) -> bool {
    s.is_empty() || MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m))
}

/// Read an optional numeric value.
///
/// Empty cells, NaN and the usual "missing" markers (`NULL`, `None`, etc.) all give [`None`].
pub fn deserialise_value<'de, D>(deserialiser: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(s) = Option::<String>::deserialize(deserialiser)? else {
        return Ok(None);
    };
    parse_value(&s).map_err(<D::Error as serde::de::Error>::custom)
}

/// Parse a cell holding an optional numeric value
pub fn parse_value(s: &str) -> Result<Option<f64>> {
    let s = s.trim();
    if is_missing_marker(s) {
        return Ok(None);
    }

    let value: f64 = s
        .parse()
        .ok()
        .with_context(|| format!("Invalid numeric value: {s}"))?;
    Ok((!value.is_nan()).then_some(value))
}

/// Read an optional text value, treating missing markers as [`None`]
pub fn deserialise_text<'de, D>(deserialiser: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserialiser)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !is_missing_marker(s)))
}

/// Read a `Y`/`N` flag. Anything other than `Y` counts as "no".
pub fn deserialise_flag<'de, D>(deserialiser: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserialiser)?;
    Ok(value.is_some_and(|s| is_yes(&s)))
}

/// Whether a cell holds the "yes" marker
pub fn is_yes(s: &str) -> bool {
    s.trim() == "Y"
}

/// An input table row which is looked up by entity name
pub trait HasName {
    /// The name of the entity this row describes
    fn name(&self) -> &str;
}

/// Implement [`HasName`] for a type with a `name` field
macro_rules! define_name_getter {
    ($t:ty) => {
        impl $crate::input::HasName for $t {
            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}
pub(crate) use define_name_getter;

/// An input table row whose optional numeric cells can be addressed by column name
pub trait NumericColumns {
    /// Mutable access to the numeric cell in the named column.
    ///
    /// Returns [`None`] if the row has no numeric column of that name.
    fn value_mut(&mut self, column: &str) -> Option<&mut Option<f64>>;
}

/// Implement [`NumericColumns`] by mapping column headers onto fields
macro_rules! define_numeric_columns {
    ($t:ty, { $($column:literal => $field:ident),* $(,)? }) => {
        impl $crate::input::NumericColumns for $t {
            fn value_mut(&mut self, column: &str) -> Option<&mut Option<f64>> {
                match column {
                    $($column => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}
pub(crate) use define_numeric_columns;

/// Check that every existing capacity row refers to a known entity
fn check_existing_names<T>(
    existing: &[ExistingCapacityRow],
    known: &IndexMap<TechID, T>,
    file_path: &Path,
) -> Result<()> {
    for row in existing {
        ensure!(
            known.contains_key(row.name.as_str()),
            "{}: existing capacity given for unknown entity {}",
            file_path.display(),
            row.name
        );
    }

    Ok(())
}

/// Index rows by entity name for fast lookup, preserving file order.
///
/// # Arguments
///
/// * `rows` - The rows of the table
/// * `table` - The name of the table (used in error messages)
pub fn index_by_name<ID, T>(rows: Vec<T>, table: &str) -> Result<IndexMap<ID, T>>
where
    ID: IDLike,
    T: HasName,
{
    let mut map = IndexMap::with_capacity(rows.len());
    for row in rows {
        let id = ID::from(row.name().to_string());
        ensure!(
            !map.contains_key(&id),
            "Duplicate entry for {id} in table {table}"
        );
        map.insert(id, row);
    }

    Ok(map)
}

/// Look up a row by entity name, failing if the name is not present
pub fn get_row<'a, T>(map: &'a IndexMap<TechID, T>, name: &str, table: &str) -> Result<&'a T> {
    map.get(name)
        .with_context(|| format!("Table {table} has no entry for {name}"))
}

/// Mutable version of [`get_row`]
pub fn get_row_mut<'a, T>(
    map: &'a mut IndexMap<TechID, T>,
    name: &str,
    table: &str,
) -> Result<&'a mut T> {
    map.get_mut(name)
        .with_context(|| format!("Table {table} has no entry for {name}"))
}

/// A table which is loaded verbatim and not interpreted
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    /// Column headers
    pub headers: Vec<String>,
    /// Rows, one string per column
    pub rows: Vec<Vec<String>>,
}

/// Read a CSV file without interpreting its columns
pub fn read_raw_table(file_path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;
    let headers = reader
        .headers()
        .with_context(|| input_err_msg(file_path))?
        .iter()
        .map(ToString::to_string)
        .collect();
    let rows: Vec<Vec<String>> = reader
        .records()
        .map_ok(|record: StringRecord| record.iter().map(ToString::to_string).collect())
        .try_collect()
        .with_context(|| input_err_msg(file_path))?;

    Ok(RawTable { headers, rows })
}

/// Every input table for a model.
///
/// This is the in-memory copy of the configuration store. It is only modified by applying
/// perturbations, which must happen before the model is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTables {
    /// Time slices, demand, discount rates and other system-wide data
    pub system: SystemTables,
    /// Power plant definitions
    pub power_plants: PowerPlantTables,
    /// Fuel supply definitions, indexed by fuel
    pub fuels: IndexMap<TechID, Fuel>,
    /// Existing fuel supply capacity
    pub fuels_existing: Vec<ExistingCapacityRow>,
    /// Transport connections, indexed by connection
    pub connections: IndexMap<TechID, Connection>,
    /// Existing connection capacity
    pub connections_existing: Vec<ExistingCapacityRow>,
}

/// A row of one of the existing capacity tables
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ExistingCapacityRow {
    /// The plant, fuel or connection this capacity belongs to
    #[serde(alias = "powerplant", alias = "fuel", alias = "connection")]
    pub name: String,
    /// The year the capacity was built
    #[serde(rename = "YearInstalled")]
    pub year_installed: u32,
    /// Capacity in MW
    #[serde(rename = "Capacity")]
    pub capacity: f64,
}

/// Read all model input tables from the specified directory.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
pub fn load_inputs(inputs_dir: &Path) -> Result<InputTables> {
    let system = read_system_tables(inputs_dir)?;
    let power_plants = read_power_plants(inputs_dir)?;
    let (fuels, fuels_existing) = read_fuels(inputs_dir)?;
    let (connections, connections_existing) = read_connections(inputs_dir)?;

    Ok(InputTables {
        system,
        power_plants,
        fuels,
        fuels_existing,
        connections,
        connections_existing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        name: String,
        #[serde(deserialize_with = "deserialise_value")]
        value: Option<f64>,
        #[serde(deserialize_with = "deserialise_flag")]
        flag: bool,
    }
    define_name_getter! {Record}

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let file_path = dir.join(name);
        let mut file = File::create(&file_path).unwrap();
        write!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = write_file(
            dir.path(),
            "test.csv",
            "name,value,flag\nhello,1,Y\nworld,,N\nfoo,nan,\nbar, NULL ,y\n",
        );

        let records: Vec<Record> = read_csv(&file_path).unwrap();
        assert_eq!(
            records,
            [
                Record {
                    name: "hello".into(),
                    value: Some(1.0),
                    flag: true
                },
                Record {
                    name: "world".into(),
                    value: None,
                    flag: false
                },
                Record {
                    name: "foo".into(),
                    value: None,
                    flag: false
                },
                Record {
                    name: "bar".into(),
                    value: None,
                    flag: false
                },
            ]
        );
    }

    #[test]
    fn test_read_csv_empty() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "test.csv", "name,value,flag\n");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(read_csv_optional::<Record>(&file_path).unwrap().is_empty());
    }

    #[test]
    fn test_read_csv_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("missing.csv");
        assert_error!(
            read_csv_optional::<Record>(&file_path),
            input_err_msg(&file_path)
        );
    }

    #[test]
    fn test_read_csv_bad_value() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "test.csv", "name,value,flag\nhello,abc,Y\n");
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_index_by_name() {
        let rows = vec![
            Record {
                name: "b".into(),
                value: None,
                flag: false,
            },
            Record {
                name: "a".into(),
                value: Some(2.0),
                flag: true,
            },
        ];
        let map: IndexMap<TechID, Record> = index_by_name(rows, "Records").unwrap();
        assert_eq!(map.keys().map(TechID::as_str).collect_vec(), ["b", "a"]);
        assert_eq!(get_row(&map, "a", "Records").unwrap().value, Some(2.0));
        assert_error!(
            get_row(&map, "c", "Records"),
            "Table Records has no entry for c"
        );
    }

    #[test]
    fn test_index_by_name_duplicate() {
        let rows = vec![
            Record {
                name: "a".into(),
                value: None,
                flag: false,
            },
            Record {
                name: "a".into(),
                value: None,
                flag: false,
            },
        ];
        assert_error!(
            index_by_name::<TechID, _>(rows, "Records"),
            "Duplicate entry for a in table Records"
        );
    }

    #[test]
    fn test_read_raw_table() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "ref.csv", "source,note\nEIA,2019\nNREL,ATB\n");
        let table = read_raw_table(&file_path).unwrap();
        assert_eq!(table.headers, ["source", "note"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], ["NREL", "ATB"]);
    }

    #[rstest]
    #[case(&[], true)]
    #[case(&[1], true)]
    #[case(&[1, 2], true)]
    #[case(&[1, 1], false)]
    #[case(&[2, 1], false)]
    fn test_is_sorted_and_unique(#[case] values: &[u32], #[case] expected: bool) {
        assert_eq!(is_sorted_and_unique(values), expected);
    }
}
