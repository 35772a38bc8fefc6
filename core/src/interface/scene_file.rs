use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A flat array plus the shape it was recorded with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArray {
    pub shape: Vec<usize>,
    #[serde(with = "missing_as_null")]
    pub data: Vec<f64>,
}

/// JSON has no NaN; missing values travel as `null`.
mod missing_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(data.iter().map(|v| v.is_finite().then_some(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

impl NamedArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Self {
        Self { shape, data }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// On-disk scene container: named arrays keyed by dataset name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneFile {
    pub arrays: BTreeMap<String, NamedArray>,
}

impl SceneFile {
    pub fn insert(&mut self, name: impl Into<String>, array: NamedArray) {
        self.arrays.insert(name.into(), array);
    }

    pub fn get(&self, name: &str) -> Option<&NamedArray> {
        self.arrays.get(name)
    }

    pub fn take(&mut self, name: &str) -> Option<NamedArray> {
        self.arrays.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_survive_json() {
        let array = NamedArray::new(vec![2, 2], vec![1.5, f64::NAN, -3.0, f64::NAN]);
        let text = serde_json::to_string(&array).unwrap();
        assert!(text.contains("null"));

        let decoded: NamedArray = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded.shape, vec![2, 2]);
        assert_eq!(decoded.data[0], 1.5);
        assert!(decoded.data[1].is_nan());
        assert_eq!(decoded.data[2], -3.0);
        assert!(decoded.data[3].is_nan());
    }
}
