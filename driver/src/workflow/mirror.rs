use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use soundercore::fetch::SceneSource;
use soundercore::granule::Granule;
use soundercore::index::ListingSource;
use soundercore::interface::SceneMetadata;
use soundercore::prelude::{CoreError, CoreResult};
use std::fs;
use std::path::{Path, PathBuf};

const SCENE_SUFFIX: &str = ".json";
const META_SUFFIX: &str = ".meta.json";

/// What the listing exposes about a scene without reading it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MirrorMeta {
    pub lat: f64,
    pub lon: f64,
    pub gca: f64,
}

/// File name of the scene recorded in `granule`.
pub fn scene_name(granule: &Granule) -> String {
    let date = granule.date();
    format!(
        "AIRS.{}.{:02}.{:02}.{:03}.L2.RetStd_IR.json",
        date.year(),
        date.month(),
        date.day(),
        granule.index()
    )
}

/// Recovers the granule from a name produced by [`scene_name`].
pub fn parse_scene_name(scene_ref: &str) -> Option<Granule> {
    let mut parts = scene_ref.split('.').skip(1);
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let index: u32 = parts.next()?.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Granule::on_date(date, index).ok()
}

/// A directory laid out `<year>/<ddd>/<scene>.json`, each scene with a
/// `<scene>.meta.json` sidecar.
#[derive(Debug, Clone)]
pub struct LocalMirror {
    root: PathBuf,
}

impl LocalMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn day_directory(&self, year: i32, day: u32) -> PathBuf {
        self.root.join(year.to_string()).join(format!("{day:03}"))
    }

    pub fn scene_path(&self, granule: &Granule) -> PathBuf {
        self.day_directory(granule.year(), granule.day())
            .join(scene_name(granule))
    }

    pub fn meta_path(scene_path: &Path) -> PathBuf {
        let name = scene_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = name.strip_suffix(SCENE_SUFFIX).unwrap_or(&name);
        scene_path.with_file_name(format!("{stem}{META_SUFFIX}"))
    }

    fn locate(&self, scene_ref: &str) -> CoreResult<PathBuf> {
        let granule = parse_scene_name(scene_ref)
            .ok_or_else(|| CoreError::Validation(format!("unrecognised scene name {scene_ref}")))?;
        Ok(self.day_directory(granule.year(), granule.day()).join(scene_ref))
    }
}

fn list_directory(path: &Path) -> CoreResult<Vec<String>> {
    if !path.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(path).map_err(|err| CoreError::Network(format!("{}: {err}", path.display())))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| CoreError::Network(format!("{}: {err}", path.display())))?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}

impl SceneSource for LocalMirror {
    fn fetch(&self, scene_ref: &str, destination: &Path) -> CoreResult<()> {
        let source = self.locate(scene_ref)?;
        fs::copy(&source, destination)
            .map(|_| ())
            .map_err(|err| CoreError::Network(format!("{}: {err}", source.display())))
    }
}

impl ListingSource for LocalMirror {
    fn list_days(&self, year: i32) -> CoreResult<Vec<u32>> {
        let mut days: Vec<u32> = list_directory(&self.root.join(year.to_string()))?
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        days.sort_unstable();
        Ok(days)
    }

    fn list_scenes(&self, year: i32, day: u32) -> CoreResult<Vec<String>> {
        Ok(list_directory(&self.day_directory(year, day))?
            .into_iter()
            .filter(|name| name.ends_with(SCENE_SUFFIX) && !name.ends_with(META_SUFFIX))
            .collect())
    }

    fn describe(&self, _year: i32, _day: u32, scene_ref: &str) -> CoreResult<SceneMetadata> {
        let granule = parse_scene_name(scene_ref)
            .ok_or_else(|| CoreError::Validation(format!("unrecognised scene name {scene_ref}")))?;
        let meta_path = Self::meta_path(&self.locate(scene_ref)?);
        let text = fs::read_to_string(&meta_path)
            .map_err(|err| CoreError::Network(format!("{}: {err}", meta_path.display())))?;
        let meta: MirrorMeta = serde_json::from_str(&text)
            .map_err(|err| CoreError::parse(meta_path.display().to_string(), err.to_string()))?;
        Ok(SceneMetadata {
            granule: granule.index(),
            lat: meta.lat,
            lon: meta.lon,
            gca: meta.gca,
        })
    }
}
