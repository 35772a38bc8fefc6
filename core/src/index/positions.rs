use crate::interface::PositionRecord;
use crate::prelude::{CoreError, CoreResult};
use log::debug;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Directory of per-year scene position tables.
///
/// A year lives in `positions_<year>.csv`, or zipped as
/// `positions_<year>.csv.zip` with the table as its only member.
#[derive(Debug, Clone)]
pub struct PositionCache {
    directory: PathBuf,
}

impl PositionCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn csv_path(&self, year: i32) -> PathBuf {
        self.directory.join(format!("positions_{year}.csv"))
    }

    pub fn zip_path(&self, year: i32) -> PathBuf {
        self.directory.join(format!("positions_{year}.csv.zip"))
    }

    pub fn marker_path(&self, unit: &str) -> PathBuf {
        self.directory.join(format!("{unit}.incomplete"))
    }

    pub fn load_year(&self, year: i32) -> CoreResult<Vec<PositionRecord>> {
        let plain = self.csv_path(year);
        let zipped = self.zip_path(year);
        let records = if plain.is_file() {
            let file = File::open(&plain).map_err(|err| CoreError::io(&plain, err))?;
            read_records(file, &plain)?
        } else if zipped.is_file() {
            let file = File::open(&zipped).map_err(|err| CoreError::io(&zipped, err))?;
            let mut archive = zip::ZipArchive::new(file).map_err(|source| CoreError::Archive {
                path: zipped.clone(),
                source,
            })?;
            let member = archive.by_index(0).map_err(|source| CoreError::Archive {
                path: zipped.clone(),
                source,
            })?;
            read_records(member, &zipped)?
        } else {
            return Err(CoreError::parse(
                format!("positions for {year}"),
                format!("no table in {}", self.directory.display()),
            ));
        };
        debug!("loaded {} positions for {year}", records.len());
        Ok(records)
    }

    pub fn load_years(&self, first: i32, last: i32) -> CoreResult<Vec<PositionRecord>> {
        let mut records = Vec::new();
        for year in first..=last {
            records.extend(self.load_year(year)?);
        }
        Ok(records)
    }

    pub fn write_year(&self, year: i32, records: &[PositionRecord]) -> CoreResult<PathBuf> {
        fs::create_dir_all(&self.directory).map_err(|err| CoreError::io(&self.directory, err))?;
        let path = self.csv_path(year);
        let csv_error = |source| CoreError::Csv {
            path: path.clone(),
            source,
        };
        let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
        for record in records {
            writer.serialize(record).map_err(csv_error)?;
        }
        writer.flush().map_err(|err| CoreError::io(&path, err))?;
        Ok(path)
    }

    pub fn mark_incomplete(&self, unit: &str, reason: &str) -> CoreResult<()> {
        fs::create_dir_all(&self.directory).map_err(|err| CoreError::io(&self.directory, err))?;
        let path = self.marker_path(unit);
        fs::write(&path, reason).map_err(|err| CoreError::io(&path, err))
    }
}

fn read_records<R: Read>(reader: R, path: &Path) -> CoreResult<Vec<PositionRecord>> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in csv.deserialize() {
        let record: PositionRecord = row.map_err(|source| CoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        record.granule()?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TABLE: &str = "\
year,day,granule,lat,lon,GCA,hdf_filename
2016,15,1,10.5,20.25,3.5,AIRS.2016.01.15.001.json
2016,15,2,11.5,21.25,2.0,AIRS.2016.01.15.002.json
";

    #[test]
    fn reads_plain_tables_with_legacy_headers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("positions_2016.csv"), TABLE).unwrap();
        let records = PositionCache::new(dir.path()).load_year(2016).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].scene_ref, "AIRS.2016.01.15.001.json");
        assert_eq!(records[1].gca, 2.0);
    }

    #[test]
    fn reads_zipped_tables() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("positions_2016.csv.zip")).unwrap();
        let mut archive = zip::ZipWriter::new(file);
        archive
            .start_file("positions_2016.csv", zip::write::FileOptions::default())
            .unwrap();
        archive.write_all(TABLE.as_bytes()).unwrap();
        archive.finish().unwrap();

        let records = PositionCache::new(dir.path()).load_year(2016).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].granule().unwrap().index(), 1);
    }

    #[test]
    fn missing_year_names_the_year() {
        let dir = tempfile::tempdir().unwrap();
        let err = PositionCache::new(dir.path()).load_year(2003).unwrap_err();
        assert!(matches!(err, CoreError::Parse { ref source_name, .. } if source_name.contains("2003")));
    }

    #[test]
    fn invalid_granules_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("positions_2015.csv"),
            "year,day,granule,lat,lon,GCA,scene_ref\n2015,366,1,0,0,1,x.json\n",
        )
        .unwrap();
        let err = PositionCache::new(dir.path()).load_year(2015).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn written_tables_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PositionCache::new(dir.path().join("positions"));
        let record = PositionRecord {
            year: 2017,
            day: 200,
            granule: 33,
            lat: -12.5,
            lon: 170.0,
            gca: 4.0,
            scene_ref: "AIRS.2017.07.19.033.json".into(),
        };
        cache.write_year(2017, &[record.clone()]).unwrap();
        assert_eq!(cache.load_year(2017).unwrap(), vec![record]);
    }
}
