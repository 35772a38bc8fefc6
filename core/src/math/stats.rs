pub struct StatsHelper;

impl StatsHelper {
    /// Mean of the non-NaN values, or `None` when there are none.
    pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
        let (sum, count) = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Share of `part` in `whole` as a percentage; zero when `whole` is.
    pub fn percentage(part: u64, whole: u64) -> f64 {
        if whole == 0 {
            return 0.0;
        }
        part as f64 * 100.0 / whole as f64
    }
}
