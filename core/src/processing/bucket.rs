use std::fmt;

pub const BUCKET_COUNT: usize = 18;
const BUCKET_WIDTH: f64 = 10.0;

/// Fixed-size storage indexed by [`LatitudeBucket::id`].
pub type PerBucket<T> = [T; BUCKET_COUNT];

/// One of the 18 ten-degree latitude bands covering `[-90, 90]`.
///
/// Bands south of the equator are `[low, high)`, the `[0, 10]` band is closed
/// on both ends, and bands north of it are `(low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LatitudeBucket(usize);

impl LatitudeBucket {
    pub fn all() -> impl Iterator<Item = LatitudeBucket> {
        (0..BUCKET_COUNT).map(LatitudeBucket)
    }

    pub fn from_id(id: usize) -> Option<Self> {
        (id < BUCKET_COUNT).then_some(LatitudeBucket(id))
    }

    pub fn id(self) -> usize {
        self.0
    }

    pub fn low(self) -> f64 {
        -90.0 + BUCKET_WIDTH * self.0 as f64
    }

    pub fn high(self) -> f64 {
        self.low() + BUCKET_WIDTH
    }

    pub fn label(self) -> String {
        format!("{}to{}", self.low() as i32, self.high() as i32)
    }

    pub fn of(latitude: f64) -> Option<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return None;
        }
        let offset = (latitude + 90.0) / BUCKET_WIDTH;
        let id = if latitude < 0.0 {
            offset.floor() as usize
        } else if latitude <= BUCKET_WIDTH {
            9
        } else {
            offset.ceil() as usize - 1
        };
        Self::from_id(id)
    }
}

impl fmt::Display for LatitudeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
