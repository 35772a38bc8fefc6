use crate::interface::{NamedArray, SceneFile};
use crate::math::StatsHelper;
use crate::prelude::{CoreError, CoreResult, CHANNELS, FOOTPRINTS, FOOTPRINT_COLUMNS, FOOTPRINT_ROWS};
use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const RADIANCES: &str = "radiances";
pub const RADIANCES_QC: &str = "radiances_QC";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const SCAN_ANGLE: &str = "scanang";
pub const SOLAR_ZENITH: &str = "solzen";
pub const LAND_FRACTION: &str = "landFrac";
pub const CLOUD_COVER: &str = "TotCld_4_CCfinal";
pub const ALL_SPOTS: &str = "all_spots_avg";
pub const DUST_FLAG: &str = "dust_flag";
pub const NOISE_AMPLITUDE: &str = "CCfinal_Noise_Amp";
pub const TIME: &str = "Time";

/// QC code stored for cells whose recorded code is missing.
pub const MISSING_QUALITY: i16 = -1;
/// Dust flag stored for footprints whose recorded flag is missing.
pub const MISSING_DUST: i8 = i8::MIN;

/// One scene flattened to `FOOTPRINTS` rows.
///
/// Footprint `f` is grid row `f / 30`, column `f % 30`. Channel arrays are
/// `FOOTPRINTS × CHANNELS`; everything else holds one value per footprint.
#[derive(Debug, Clone)]
pub struct ScanTable {
    pub radiances: Array2<f32>,
    pub quality: Array2<i16>,
    pub latitude: Array1<f64>,
    pub longitude: Array1<f64>,
    pub scan_angle: Array1<f64>,
    pub solar_zenith: Array1<f64>,
    pub land_fraction: Array1<f64>,
    pub cloud_cover: Array1<f64>,
    pub all_spots: Array1<f64>,
    pub dust_flag: Array1<i8>,
    pub noise_amplitude: Array1<f64>,
    pub timestamp: Array1<f64>,
}

impl ScanTable {
    /// Decodes a scene container, consuming its arrays.
    pub fn from_scene_file(scene: &str, mut file: SceneFile) -> CoreResult<Self> {
        let radiances = channel_field(scene, &mut file, RADIANCES)?.mapv(|v| v as f32);
        let quality = channel_field(scene, &mut file, RADIANCES_QC)?.mapv(|v| {
            if v.is_finite() {
                v as i16
            } else {
                MISSING_QUALITY
            }
        });
        let dust_flag = footprint_field(scene, &mut file, DUST_FLAG)?.mapv(|v| {
            if v.is_finite() {
                v as i8
            } else {
                MISSING_DUST
            }
        });

        Ok(Self {
            radiances,
            quality,
            latitude: footprint_field(scene, &mut file, LATITUDE)?,
            longitude: footprint_field(scene, &mut file, LONGITUDE)?,
            scan_angle: footprint_field(scene, &mut file, SCAN_ANGLE)?,
            solar_zenith: footprint_field(scene, &mut file, SOLAR_ZENITH)?,
            land_fraction: footprint_field(scene, &mut file, LAND_FRACTION)?,
            cloud_cover: footprint_field(scene, &mut file, CLOUD_COVER)?,
            all_spots: footprint_field(scene, &mut file, ALL_SPOTS)?,
            dust_flag,
            noise_amplitude: footprint_field(scene, &mut file, NOISE_AMPLITUDE)?,
            timestamp: footprint_field(scene, &mut file, TIME)?,
        })
    }

    /// Writes the table back out with the instrument's grid shapes.
    pub fn to_scene_file(&self) -> SceneFile {
        let grid = vec![FOOTPRINT_ROWS, FOOTPRINT_COLUMNS];
        let cube = vec![FOOTPRINT_ROWS, FOOTPRINT_COLUMNS, CHANNELS];
        let per_footprint = |values: &Array1<f64>| NamedArray::new(grid.clone(), values.to_vec());

        let mut file = SceneFile::default();
        file.insert(
            RADIANCES,
            NamedArray::new(cube.clone(), self.radiances.iter().map(|&v| v as f64).collect()),
        );
        file.insert(
            RADIANCES_QC,
            NamedArray::new(cube, self.quality.iter().map(|&v| v as f64).collect()),
        );
        file.insert(LATITUDE, per_footprint(&self.latitude));
        file.insert(LONGITUDE, per_footprint(&self.longitude));
        file.insert(SCAN_ANGLE, per_footprint(&self.scan_angle));
        file.insert(SOLAR_ZENITH, per_footprint(&self.solar_zenith));
        file.insert(LAND_FRACTION, per_footprint(&self.land_fraction));
        file.insert(CLOUD_COVER, per_footprint(&self.cloud_cover));
        file.insert(ALL_SPOTS, per_footprint(&self.all_spots));
        file.insert(
            DUST_FLAG,
            NamedArray::new(grid.clone(), self.dust_flag.iter().map(|&v| v as f64).collect()),
        );
        file.insert(NOISE_AMPLITUDE, per_footprint(&self.noise_amplitude));
        file.insert(TIME, per_footprint(&self.timestamp));
        file
    }

    /// NaN-skipping mean of the primary cloud-cover estimator.
    pub fn mean_cloud_cover(&self) -> f64 {
        StatsHelper::nan_mean(self.cloud_cover.iter().copied()).unwrap_or(f64::NAN)
    }
}

fn take_array(scene: &str, file: &mut SceneFile, name: &str, expected: usize) -> CoreResult<Vec<f64>> {
    let array = file
        .take(name)
        .ok_or_else(|| CoreError::parse(scene, format!("missing array {name}")))?;
    if array.element_count() != array.data.len() {
        return Err(CoreError::parse(
            scene,
            format!(
                "{name} shape {:?} does not match its {} values",
                array.shape,
                array.data.len()
            ),
        ));
    }
    if array.data.len() != expected {
        return Err(CoreError::parse(
            scene,
            format!("{name} holds {} values, expected {expected}", array.data.len()),
        ));
    }
    Ok(array.data)
}

fn footprint_field(scene: &str, file: &mut SceneFile, name: &str) -> CoreResult<Array1<f64>> {
    take_array(scene, file, name, FOOTPRINTS).map(Array1::from)
}

fn channel_field(scene: &str, file: &mut SceneFile, name: &str) -> CoreResult<Array2<f64>> {
    let data = take_array(scene, file, name, FOOTPRINTS * CHANNELS)?;
    Array2::from_shape_vec((FOOTPRINTS, CHANNELS), data)
        .map_err(|err| CoreError::parse(scene, format!("cannot reshape {name}: {err}")))
}

/// Loads one scene from disk into the fixed footprint grid.
pub trait SceneReader: Send + Sync {
    fn read_scene(&self, path: &Path) -> CoreResult<ScanTable>;
}

/// Reads and writes the JSON container of named arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSceneCodec;

impl JsonSceneCodec {
    pub fn write(&self, path: &Path, table: &ScanTable) -> CoreResult<()> {
        let file = File::create(path).map_err(|err| CoreError::io(path, err))?;
        serde_json::to_writer(BufWriter::new(file), &table.to_scene_file())
            .map_err(|err| CoreError::parse(path.display().to_string(), err.to_string()))
    }
}

impl SceneReader for JsonSceneCodec {
    fn read_scene(&self, path: &Path) -> CoreResult<ScanTable> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|err| CoreError::parse(&name, err.to_string()))?;
        let container: SceneFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| CoreError::parse(&name, err.to_string()))?;
        ScanTable::from_scene_file(&name, container)
    }
}
