/// Descriptive statistics summarizing a set of repeated measurements.
///
/// Variance and standard deviation use the population divisor `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// Number of values in the dataset.
    pub count: usize,
    /// The minimum value in the dataset.
    pub min: f64,
    /// The maximum value in the dataset.
    pub max: f64,
    /// The arithmetic mean (average) of the dataset.
    pub mean: f64,
    /// The population variance of the dataset.
    pub variance: f64,
    /// The population standard deviation of the dataset.
    pub std_dev: f64,
    /// Peak-to-peak spread (`max - min`).
    pub range: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from values in any order.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use mlcqa_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([18.0, 19.0]).unwrap();
    /// assert_eq!(stats.mean, 18.5);
    /// assert_eq!(stats.std_dev, 0.5);
    /// assert_eq!(stats.range, 1.0);
    ///
    /// assert!(DescriptiveStats::new(Vec::new()).is_none());
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let first = *values.first()?;

        let (min, max) = values
            .iter()
            .fold((first, first), |(min, max), &v| (min.min(v), max.max(v)));
        let count = values.len();
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            count,
            min,
            max,
            mean,
            variance,
            std_dev: variance.sqrt(),
            range: max - min,
        })
    }
}
