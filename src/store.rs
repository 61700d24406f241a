use crate::error::{LoadError, PersistError};
use crate::fuel_entry::{FuelLog, FuelType};
use crate::normalizer::{RawRow, normalize};
use crate::price::PriceCatalog;
use bigdecimal::BigDecimal;
use csv::{ByteRecord, StringRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const HEADERS: [&str; 6] = [
    "Date",
    "Odometer",
    "Liters",
    "Price_Per_L",
    "Fuel_Type",
    "Full_Tank",
];

/// The fuel log as a CSV file. Reads hand back every row; writes replace the
/// whole file.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_rows(&self) -> Result<Vec<RawRow>, LoadError> {
        let mut reader = open_csv(&self.path)?;
        let mut columns = Columns::new(reader.headers()?);
        let date = columns.require("Date", &["date"]);
        let odometer = columns.require("Odometer", &["odometer"]);
        let liters = columns.require("Liters", &["liters", "litres"]);
        let (Some(date), Some(odometer), Some(liters)) = (date, odometer, liters) else {
            return Err(LoadError::MissingColumns(columns.missing));
        };
        let price = columns.find(&["price_per_l", "price_per_liter", "price_per_litre", "price"]);
        let fuel_type = columns.find(&["fuel_type"]);
        let full_tank = columns.find(&["full_tank"]);

        let mut rows = Vec::new();
        for (index, record) in reader.byte_records().enumerate() {
            let Some(record) = readable(index, record) else {
                continue;
            };
            rows.push(RawRow {
                date: field(&record, Some(date)),
                odometer: field(&record, Some(odometer)),
                liters: field(&record, Some(liters)),
                price_per_liter: field(&record, price),
                fuel_type: field(&record, fuel_type),
                full_tank: field(&record, full_tank),
            });
        }
        debug!(path = %self.path.display(), rows = rows.len(), "read fuel log rows");
        Ok(rows)
    }

    /// Reads and normalizes the stored log.
    pub fn load_log(&self) -> Result<FuelLog, LoadError> {
        Ok(normalize(&self.read_rows()?))
    }

    /// Replaces the stored log with `log`. The file is written beside the
    /// target and renamed over it, so readers never see half a log.
    pub fn write_log(&self, log: &FuelLog) -> Result<(), PersistError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(file.as_file_mut());
            writer.write_record(HEADERS)?;
            for row in log.to_rows() {
                writer.write_record([
                    row.date.unwrap_or_default(),
                    row.odometer.unwrap_or_default(),
                    row.liters.unwrap_or_default(),
                    row.price_per_liter.unwrap_or_default(),
                    row.fuel_type.unwrap_or_default(),
                    row.full_tank.unwrap_or_default(),
                ])?;
            }
            writer.flush()?;
        }
        file.as_file_mut().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        info!(path = %self.path.display(), entries = log.len(), "saved fuel log");
        Ok(())
    }
}

/// Reads a `Fuel_Type,Price` table. Rows naming an unknown fuel type or
/// carrying an unreadable price are skipped.
pub fn load_price_catalog(path: &Path) -> Result<PriceCatalog, LoadError> {
    let mut reader = open_csv(path)?;
    let mut columns = Columns::new(reader.headers()?);
    let fuel_type = columns.require("Fuel_Type", &["fuel_type"]);
    let price = columns.require("Price", &["price", "price_per_l"]);
    let (Some(fuel_type), Some(price)) = (fuel_type, price) else {
        return Err(LoadError::MissingColumns(columns.missing));
    };

    let mut prices = HashMap::new();
    for (index, record) in reader.byte_records().enumerate() {
        let Some(record) = readable(index, record) else {
            continue;
        };
        let parsed = field(&record, Some(fuel_type))
            .and_then(|label| FuelType::from_str(&label).ok())
            .zip(field(&record, Some(price)).and_then(|p| BigDecimal::from_str(&p).ok()));
        match parsed {
            Some((fuel_type, price)) => {
                prices.insert(fuel_type, price);
            }
            None => debug!(index, "skipping unusable price catalog row"),
        }
    }
    Ok(PriceCatalog::new(prices))
}

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

/// A record that failed at the CSV level is skipped; its neighbours still load.
fn readable(index: usize, record: csv::Result<ByteRecord>) -> Option<ByteRecord> {
    record
        .inspect_err(|err| debug!(index, %err, "skipping unreadable record"))
        .ok()
}

/// Field text, with undecodable bytes replaced so the normalizer rejects the value.
fn field(record: &ByteRecord, index: Option<usize>) -> Option<String> {
    record
        .get(index?)
        .filter(|value| !value.is_empty())
        .map(|value| String::from_utf8_lossy(value).into_owned())
}

/// Header lookup that ignores case, spacing and column order.
struct Columns {
    names: Vec<String>,
    missing: Vec<&'static str>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        Self {
            names: headers
                .iter()
                .map(|h| h.trim().to_ascii_lowercase().replace(' ', "_"))
                .collect(),
            missing: Vec::new(),
        }
    }

    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.names.iter().position(|name| name == alias))
    }

    fn require(&mut self, column: &'static str, aliases: &[&str]) -> Option<usize> {
        let index = self.find(aliases);
        if index.is_none() {
            self.missing.push(column);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel_entry::tests::entry;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path().join("nope.csv"));
        assert!(matches!(store.load_log(), Err(LoadError::NotFound(_))));
    }

    #[test]
    fn reads_columns_in_any_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "log.csv",
            "Liters,price per l,ODOMETER,Date\n32,294,1400,2024-02-10\n35,,1000,2024-01-02\n",
        );
        let log = CsvStore::new(path).load_log().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].odometer, 1000);
        assert_eq!(log.entries()[0].price_per_liter, None);
        assert_eq!(log.entries()[1].price_per_liter, Some(BigDecimal::from(294)));
    }

    #[test]
    fn missing_required_columns_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.csv", "Date,Price_Per_L\n2024-01-02,294\n");
        match CsvStore::new(path).read_rows() {
            Err(LoadError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["Odometer", "Liters"]);
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn bad_bytes_drop_only_their_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let mut contents = b"Date,Odometer,Liters,Price_Per_L\n2024-01-02,1000,35,294\n".to_vec();
        contents.extend_from_slice(b"2024-01-20,1200,\xff\xfe,294\n");
        contents.extend_from_slice(b"2024-02-10,1400,32,294\n");
        fs::write(&path, contents).unwrap();

        let log = CsvStore::new(path).load_log().unwrap();
        let odometers: Vec<u64> = log.entries().iter().map(|e| e.odometer).collect();
        assert_eq!(odometers, vec![1000, 1400]);
    }

    #[test]
    fn directory_path_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        assert!(CsvStore::new(dir.path()).load_log().is_err());
    }

    #[test]
    fn header_only_file_is_empty_log() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.csv", "Date,Odometer,Liters,Price_Per_L\n");
        assert!(CsvStore::new(path).load_log().unwrap().is_empty());
    }

    #[test]
    fn write_then_read_gives_same_log() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path().join("log.csv"));
        let mut last = entry(1400, "32.5");
        last.price_per_liter = Some(BigDecimal::from(294));
        last.fuel_type = Some(FuelType::Petrol95);
        last.full_tank = Some(false);
        let log = FuelLog::from_entries(vec![entry(1000, "35"), last]);

        store.write_log(&log).unwrap();
        assert_eq!(store.load_log().unwrap(), log);

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("Date,Odometer,Liters,Price_Per_L,Fuel_Type,Full_Tank\n"));
        let last_line = text.lines().last().unwrap();
        assert!(last_line.starts_with("2024-01-01,1400,32.5,294,"));
        assert!(last_line.contains("Petrol 95"));
        assert!(last_line.ends_with(",FALSE"));
    }

    #[test]
    fn write_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path().join("log.csv"));
        store
            .write_log(&FuelLog::from_entries(vec![entry(1000, "35"), entry(1400, "32")]))
            .unwrap();
        store
            .write_log(&FuelLog::from_entries(vec![entry(5000, "20")]))
            .unwrap();
        let log = store.load_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.max_odometer(), Some(5000));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path().join("gone").join("log.csv"));
        assert!(store.write_log(&FuelLog::default()).is_err());
    }

    #[test]
    fn loads_price_catalog_and_skips_junk() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "prices.csv",
            "Fuel_Type,Price\nPetrol 92,299\nDiesel,abc\nJet A1,500\nPetrol 95,341.5\n",
        );
        let catalog = load_price_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(FuelType::Petrol92), Some(&BigDecimal::from(299)));
        assert_eq!(catalog.get(FuelType::Diesel), None);
        assert_eq!(
            catalog.get(FuelType::Petrol95),
            Some(&"341.5".parse::<BigDecimal>().unwrap())
        );
    }

    #[test]
    fn missing_price_catalog_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let result = load_price_catalog(&dir.path().join("prices.csv"));
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }
}
