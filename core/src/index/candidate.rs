use super::positions::PositionCache;
use crate::geo::{GeoWindow, SearchArea};
use crate::granule::Granule;
use crate::interface::PositionRecord;
use crate::prelude::CoreResult;
use log::info;

/// A scene selected for fetching and filtering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Candidate {
    pub scene_ref: String,
    pub granule: Granule,
}

/// Time span, region and illumination floor a candidate must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub start: Granule,
    pub end: Granule,
    pub window: GeoWindow,
    pub min_gca: f64,
}

impl CandidateQuery {
    /// Granule-index band; wraps past 240 when the end index is smaller.
    fn admits_index(&self, index: u32) -> bool {
        let (first, last) = (self.start.index(), self.end.index());
        if last < first {
            index >= first || index <= last
        } else {
            index >= first && index <= last
        }
    }

    fn admits_date(&self, record: &PositionRecord) -> bool {
        let date = record.date_value();
        date >= self.start.date_value() && date <= self.end.date_value()
    }
}

/// Scene centroids for a span of years, queried by time, region and GCA.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    records: Vec<PositionRecord>,
}

impl CandidateIndex {
    pub fn new(records: Vec<PositionRecord>) -> Self {
        Self { records }
    }

    /// Loads every year the two granules span.
    pub fn load(cache: &PositionCache, start: &Granule, end: &Granule) -> CoreResult<Self> {
        Ok(Self::new(cache.load_years(start.year(), end.year())?))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Matching scenes sorted by identifier, each listed once.
    pub fn resolve(&self, query: &CandidateQuery) -> CoreResult<Vec<Candidate>> {
        let area = SearchArea::new(&query.window)?;
        let mut candidates = Vec::new();
        for record in &self.records {
            let selected = query.admits_index(record.granule)
                && area.contains(record.lat, record.lon)
                && record.gca >= query.min_gca
                && query.admits_date(record);
            if selected {
                candidates.push(Candidate {
                    scene_ref: record.scene_ref.clone(),
                    granule: record.granule()?,
                });
            }
        }
        candidates.sort();
        candidates.dedup_by(|a, b| a.scene_ref == b.scene_ref);
        info!(
            "{} of {} scenes between {} and {} are candidates",
            candidates.len(),
            self.records.len(),
            query.start,
            query.end
        );
        Ok(candidates)
    }
}

/// Loads the position cache and resolves one query against it.
pub fn resolve(cache: &PositionCache, query: &CandidateQuery) -> CoreResult<Vec<Candidate>> {
    CandidateIndex::load(cache, &query.start, &query.end)?.resolve(query)
}
