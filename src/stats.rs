//! Descriptive statistics over cleaned product tables.
//!
//! A thin layer: summary numbers per dataset, category and brand, plus the
//! handful of standard tests (pooled two-sample t-test, Pearson correlation,
//! IQR outliers) the reports quote.

use crate::models::CleanRecord;
use crate::trends::{linregress, trend_direction, TrendDirection};
use chrono::Local;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::{BTreeMap, BTreeSet};

/// Significance level used throughout.
pub const SIGNIFICANCE: f64 = 0.05;

// ============ Primitive statistics ============

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1); needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Linear-interpolated quantile of an ascending slice, `q` in `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted(values), 0.5)
}

fn central_moment(values: &[f64], m: f64, k: i32) -> f64 {
    values.iter().map(|v| (v - m).powi(k)).sum::<f64>() / values.len() as f64
}

/// Biased sample skewness; `None` for constant or empty data.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let m2 = central_moment(values, m, 2);
    if m2 == 0.0 {
        return None;
    }
    Some(central_moment(values, m, 3) / m2.powf(1.5))
}

/// Biased excess kurtosis; `None` for constant or empty data.
pub fn kurtosis(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let m2 = central_moment(values, m, 2);
    if m2 == 0.0 {
        return None;
    }
    Some(central_moment(values, m, 4) / (m2 * m2) - 3.0)
}

/// Pearson correlation; `None` when either side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Two-sided p-value of a t statistic with `df` degrees of freedom.
pub fn two_sided_p(t: f64, df: f64) -> Option<f64> {
    if !(df > 0.0) || t.is_nan() {
        return None;
    }
    if t.is_infinite() {
        return Some(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

/// Result of a two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TTest {
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant_difference: bool,
}

/// Pooled-variance (equal variance) independent two-sample t-test.
pub fn ttest_ind(a: &[f64], b: &[f64]) -> Option<TTest> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let df = n1 + n2 - 2.0;
    if a.is_empty() || b.is_empty() || df < 1.0 {
        return None;
    }
    let (m1, m2) = (mean(a)?, mean(b)?);
    let v1 = sample_std(a).map_or(0.0, |s| s * s);
    let v2 = sample_std(b).map_or(0.0, |s| s * s);
    let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / df;
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se == 0.0 {
        return None;
    }
    let t = (m1 - m2) / se;
    let p = two_sided_p(t, df)?;
    Some(TTest {
        t_statistic: t,
        p_value: p,
        significant_difference: p < SIGNIFICANCE,
    })
}

// ============ Summaries ============

/// Full descriptive summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptive {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q75: f64,
    pub iqr: f64,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
}

pub fn describe(values: &[f64]) -> Option<Descriptive> {
    let s = sorted(values);
    let q25 = quantile_sorted(&s, 0.25)?;
    let q75 = quantile_sorted(&s, 0.75)?;
    Some(Descriptive {
        count: s.len(),
        mean: mean(&s)?,
        median: quantile_sorted(&s, 0.5)?,
        std: sample_std(&s),
        min: *s.first()?,
        max: *s.last()?,
        q25,
        q75,
        iqr: q75 - q25,
        skewness: skewness(&s),
        kurtosis: kurtosis(&s),
    })
}

/// Short per-group price summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl From<Descriptive> for GroupStats {
    fn from(d: Descriptive) -> Self {
        Self {
            count: d.count,
            mean: d.mean,
            median: d.median,
            std: d.std,
            min: d.min,
            max: d.max,
        }
    }
}

/// Count and share of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareEntry {
    pub name: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
    pub span_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_records: usize,
    pub date_range: Option<DateRange>,
    pub categories: BTreeMap<String, usize>,
    pub sources: BTreeMap<String, usize>,
    pub brands: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStats {
    pub avg_length: f64,
    pub min_length: usize,
    pub max_length: usize,
    pub unique_count: usize,
    pub empty_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStatistics {
    pub overview: Overview,
    pub price_statistics: Option<Descriptive>,
    pub price_by_category: BTreeMap<String, GroupStats>,
    pub text_statistics: BTreeMap<String, TextStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outliers {
    pub count: usize,
    pub percentage: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub outlier_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSegments {
    pub budget: usize,
    pub mid_range: usize,
    pub premium: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDistribution {
    pub outliers: Outliers,
    pub price_segments: PriceSegments,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandPositioning {
    pub premium_brands: Vec<String>,
    pub budget_brands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandAnalysis {
    /// Top ten brands by listing count.
    pub market_share: Vec<ShareEntry>,
    pub price_by_brand: BTreeMap<String, GroupStats>,
    pub brand_positioning: BrandPositioning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAnalysis {
    pub distribution: Vec<ShareEntry>,
    pub price_statistics: BTreeMap<String, GroupStats>,
    pub price_comparisons: BTreeMap<String, TTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrongCorrelation {
    pub variable1: String,
    pub variable2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationAnalysis {
    pub numerical_variables: Vec<String>,
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    pub strong_correlations: Vec<StrongCorrelation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPatterns {
    pub records_per_day: BTreeMap<String, usize>,
    pub avg_daily_records: f64,
    pub max_daily_records: usize,
    pub min_daily_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPatterns {
    pub records_by_hour: BTreeMap<u32, usize>,
    pub peak_hour: u32,
    pub lowest_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPatterns {
    pub records_by_weekday: BTreeMap<String, usize>,
    pub busiest_day: String,
    pub quietest_day: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPriceTrend {
    pub daily_avg_prices: BTreeMap<String, f64>,
    pub price_volatility: Option<f64>,
    pub trend_direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeAnalysis {
    pub daily_patterns: DailyPatterns,
    pub hourly_patterns: HourlyPatterns,
    pub weekly_patterns: WeeklyPatterns,
    pub price_trends: DailyPriceTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataOverview {
    pub total_records: usize,
    pub columns: Vec<String>,
}

/// Everything [`StatisticalAnalyzer`] computes, in one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticalReport {
    pub analysis_timestamp: String,
    pub data_overview: DataOverview,
    pub descriptive_statistics: DescriptiveStatistics,
    pub price_analysis: Option<PriceDistribution>,
    pub brand_analysis: BrandAnalysis,
    pub category_analysis: CategoryAnalysis,
    pub correlation_analysis: CorrelationAnalysis,
    pub time_analysis: Option<TimeAnalysis>,
}

/// Per-source slice of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceComparison {
    pub record_count: usize,
    pub statistics: DescriptiveStatistics,
}

// ============ Analyzer ============

/// Statistical analysis over a cleaned table.
pub struct StatisticalAnalyzer<'a> {
    records: &'a [CleanRecord],
}

impl<'a> StatisticalAnalyzer<'a> {
    pub fn new(records: &'a [CleanRecord]) -> Self {
        Self { records }
    }

    fn prices(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.price).collect()
    }

    fn prices_by<F>(&self, key: F) -> BTreeMap<String, Vec<f64>>
    where
        F: Fn(&CleanRecord) -> String,
    {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in self.records {
            groups.entry(key(record)).or_default().push(record.price);
        }
        groups
    }

    fn counts_by<F>(&self, key: F) -> BTreeMap<String, usize>
    where
        F: Fn(&CleanRecord) -> String,
    {
        let mut counts = BTreeMap::new();
        for record in self.records {
            *counts.entry(key(record)).or_default() += 1;
        }
        counts
    }

    fn date_range(&self) -> Option<DateRange> {
        let start = self.records.iter().map(|r| r.createdat).min()?;
        let end = self.records.iter().map(|r| r.createdat).max()?;
        Some(DateRange {
            start_date: start.to_rfc3339(),
            end_date: end.to_rfc3339(),
            span_days: (end - start).num_days(),
        })
    }

    pub fn descriptive_statistics(&self) -> DescriptiveStatistics {
        let overview = Overview {
            total_records: self.records.len(),
            date_range: self.date_range(),
            categories: self.counts_by(|r| r.category.to_string()),
            sources: self.counts_by(|r| r.source.to_string()),
            brands: self.counts_by(|r| r.brand.clone()),
        };

        let price_by_category = self
            .prices_by(|r| r.category.to_string())
            .into_iter()
            .filter_map(|(cat, prices)| describe(&prices).map(|d| (cat, d.into())))
            .collect();

        let text_fields: [(&str, fn(&CleanRecord) -> &str); 3] = [
            ("name", |r| r.name.as_str()),
            ("description", |r| r.description.as_str()),
            ("brand", |r| r.brand.as_str()),
        ];
        let mut text_statistics = BTreeMap::new();
        if !self.records.is_empty() {
            for (field, get) in text_fields {
                let lengths: Vec<usize> =
                    self.records.iter().map(|r| get(r).chars().count()).collect();
                let unique: BTreeSet<&str> = self.records.iter().map(get).collect();
                text_statistics.insert(
                    field.to_string(),
                    TextStats {
                        avg_length: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
                        min_length: lengths.iter().copied().min().unwrap_or(0),
                        max_length: lengths.iter().copied().max().unwrap_or(0),
                        unique_count: unique.len(),
                        empty_count: lengths.iter().filter(|&&l| l == 0).count(),
                    },
                );
            }
        }

        DescriptiveStatistics {
            overview,
            price_statistics: describe(&self.prices()),
            price_by_category,
            text_statistics,
        }
    }

    pub fn price_distribution_analysis(&self) -> Option<PriceDistribution> {
        let prices = sorted(&self.prices());
        let q1 = quantile_sorted(&prices, 0.25)?;
        let q3 = quantile_sorted(&prices, 0.75)?;
        let iqr = q3 - q1;
        let lower_bound = q1 - 1.5 * iqr;
        let upper_bound = q3 + 1.5 * iqr;

        let outlier_values: Vec<f64> = self
            .records
            .iter()
            .map(|r| r.price)
            .filter(|p| *p < lower_bound || *p > upper_bound)
            .collect();

        let q33 = quantile_sorted(&prices, 0.33)?;
        let q67 = quantile_sorted(&prices, 0.67)?;

        Some(PriceDistribution {
            outliers: Outliers {
                count: outlier_values.len(),
                percentage: outlier_values.len() as f64 / prices.len() as f64 * 100.0,
                lower_bound,
                upper_bound,
                outlier_values,
            },
            price_segments: PriceSegments {
                budget: prices.iter().filter(|p| **p <= q33).count(),
                mid_range: prices.iter().filter(|p| **p > q33 && **p <= q67).count(),
                premium: prices.iter().filter(|p| **p > q67).count(),
            },
        })
    }

    pub fn brand_analysis(&self) -> BrandAnalysis {
        let counts = self.counts_by(|r| r.brand.clone());
        let market_share = top_shares(&counts, self.records.len(), Some(10));

        let groups = self.prices_by(|r| r.brand.clone());
        let price_by_brand: BTreeMap<String, GroupStats> = groups
            .iter()
            .filter_map(|(brand, prices)| describe(prices).map(|d| (brand.clone(), d.into())))
            .collect();

        let (mut premium_brands, mut budget_brands) = (Vec::new(), Vec::new());
        if let Some(overall_median) = median(&self.prices()) {
            for (brand, stats) in &price_by_brand {
                if stats.mean > overall_median * 1.5 {
                    premium_brands.push(brand.clone());
                } else if stats.mean < overall_median * 0.7 {
                    budget_brands.push(brand.clone());
                }
            }
        }

        BrandAnalysis {
            market_share,
            price_by_brand,
            brand_positioning: BrandPositioning {
                premium_brands,
                budget_brands,
            },
        }
    }

    pub fn category_analysis(&self) -> CategoryAnalysis {
        let counts = self.counts_by(|r| r.category.to_string());
        let groups = self.prices_by(|r| r.category.to_string());

        let price_statistics = groups
            .iter()
            .filter_map(|(cat, prices)| describe(prices).map(|d| (cat.clone(), d.into())))
            .collect();

        let names: Vec<&String> = groups.keys().collect();
        let mut price_comparisons = BTreeMap::new();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                if let Some(test) = ttest_ind(&groups[*a], &groups[*b]) {
                    price_comparisons.insert(format!("{}_vs_{}", a, b), test);
                }
            }
        }

        CategoryAnalysis {
            distribution: top_shares(&counts, self.records.len(), None),
            price_statistics,
            price_comparisons,
        }
    }

    pub fn correlation_analysis(&self) -> CorrelationAnalysis {
        let variables: [(&str, fn(&CleanRecord) -> Option<f64>); 5] = [
            ("price", |r| Some(r.price)),
            ("storage_gb", |r| r.storage_gb.map(|v| v as f64)),
            ("ram_gb", |r| r.ram_gb.map(|v| v as f64)),
            ("data_quality_score", |r| Some(r.data_quality_score as f64)),
            ("scrape_hour", |r| Some(r.scrape_hour as f64)),
        ];

        let mut matrix: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();
        let mut strong = Vec::new();
        for (i, (name_a, get_a)) in variables.iter().enumerate() {
            for (j, (name_b, get_b)) in variables.iter().enumerate() {
                // pairwise-complete observations
                let (xs, ys): (Vec<f64>, Vec<f64>) = self
                    .records
                    .iter()
                    .filter_map(|r| Some((get_a(r)?, get_b(r)?)))
                    .unzip();
                let r = if i == j && xs.len() >= 2 && pearson(&xs, &ys).is_some() {
                    Some(1.0)
                } else {
                    pearson(&xs, &ys)
                };
                if j > i {
                    if let Some(value) = r.filter(|v| v.abs() > 0.7) {
                        strong.push(StrongCorrelation {
                            variable1: name_a.to_string(),
                            variable2: name_b.to_string(),
                            correlation: value,
                        });
                    }
                }
                matrix
                    .entry(name_a.to_string())
                    .or_default()
                    .insert(name_b.to_string(), r.map(|v| (v * 1000.0).round() / 1000.0));
            }
        }

        CorrelationAnalysis {
            numerical_variables: variables.iter().map(|(n, _)| n.to_string()).collect(),
            correlation_matrix: matrix,
            strong_correlations: strong,
        }
    }

    pub fn time_series_analysis(&self) -> Option<TimeAnalysis> {
        if self.records.is_empty() {
            return None;
        }

        let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
        let mut day_prices: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut per_hour: BTreeMap<u32, usize> = BTreeMap::new();
        let mut per_weekday: BTreeMap<String, usize> = BTreeMap::new();
        for r in self.records {
            let day = r.scrape_date.to_string();
            *per_day.entry(day.clone()).or_default() += 1;
            day_prices.entry(day).or_default().push(r.price);
            *per_hour.entry(r.scrape_hour).or_default() += 1;
            *per_weekday.entry(r.scrape_weekday.clone()).or_default() += 1;
        }

        let daily_counts: Vec<f64> = per_day.values().map(|&c| c as f64).collect();
        let daily_avg_prices: BTreeMap<String, f64> = day_prices
            .iter()
            .filter_map(|(day, prices)| mean(prices).map(|m| (day.clone(), m)))
            .collect();
        let daily_means: Vec<f64> = daily_avg_prices.values().copied().collect();

        Some(TimeAnalysis {
            daily_patterns: DailyPatterns {
                avg_daily_records: mean(&daily_counts).unwrap_or(0.0),
                max_daily_records: per_day.values().copied().max().unwrap_or(0),
                min_daily_records: per_day.values().copied().min().unwrap_or(0),
                records_per_day: per_day,
            },
            hourly_patterns: HourlyPatterns {
                peak_hour: arg_max(&per_hour).unwrap_or(0),
                lowest_hour: arg_min(&per_hour).unwrap_or(0),
                records_by_hour: per_hour,
            },
            weekly_patterns: WeeklyPatterns {
                busiest_day: arg_max(&per_weekday).unwrap_or_default(),
                quietest_day: arg_min(&per_weekday).unwrap_or_default(),
                records_by_weekday: per_weekday,
            },
            price_trends: DailyPriceTrend {
                price_volatility: sample_std(&daily_means),
                trend_direction: trend_direction(linregress(&daily_means).as_ref()),
                daily_avg_prices,
            },
        })
    }

    pub fn generate_summary_report(&self) -> StatisticalReport {
        StatisticalReport {
            analysis_timestamp: Local::now().to_rfc3339(),
            data_overview: DataOverview {
                total_records: self.records.len(),
                columns: crate::models::columns(self.records),
            },
            descriptive_statistics: self.descriptive_statistics(),
            price_analysis: self.price_distribution_analysis(),
            brand_analysis: self.brand_analysis(),
            category_analysis: self.category_analysis(),
            correlation_analysis: self.correlation_analysis(),
            time_analysis: self.time_series_analysis(),
        }
    }
}

/// Descriptive statistics computed separately for each source site.
pub fn compare_sources(records: &[CleanRecord]) -> BTreeMap<String, SourceComparison> {
    let mut by_source: BTreeMap<String, Vec<CleanRecord>> = BTreeMap::new();
    for record in records {
        by_source
            .entry(record.source.to_string())
            .or_default()
            .push(record.clone());
    }
    by_source
        .into_iter()
        .map(|(source, slice)| {
            let statistics = StatisticalAnalyzer::new(&slice).descriptive_statistics();
            (
                source,
                SourceComparison {
                    record_count: slice.len(),
                    statistics,
                },
            )
        })
        .collect()
}

/// Groups ordered by count (descending, then name), optionally truncated.
fn top_shares(counts: &BTreeMap<String, usize>, total: usize, limit: Option<usize>) -> Vec<ShareEntry> {
    let mut entries: Vec<(&String, &usize)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(name, &count)| ShareEntry {
            name: name.clone(),
            count,
            percentage: if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Key with the highest count; the first key in order wins ties.
fn arg_max<K: Clone + Ord>(counts: &BTreeMap<K, usize>) -> Option<K> {
    let mut best: Option<(&K, usize)> = None;
    for (k, &c) in counts {
        if best.map_or(true, |(_, b)| c > b) {
            best = Some((k, c));
        }
    }
    best.map(|(k, _)| k.clone())
}

/// Key with the lowest count; the first key in order wins ties.
fn arg_min<K: Clone + Ord>(counts: &BTreeMap<K, usize>) -> Option<K> {
    let mut best: Option<(&K, usize)> = None;
    for (k, &c) in counts {
        if best.map_or(true, |(_, b)| c < b) {
            best = Some((k, c));
        }
    }
    best.map(|(k, _)| k.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_describe_matches_reference_values() {
        let d = describe(&[599.0, 999.0, 799.0]).unwrap();
        assert_eq!(d.count, 3);
        assert!(approx(d.mean, 799.0));
        assert!(approx(d.median, 799.0));
        assert!(approx(d.std.unwrap(), 200.0));
        assert!(approx(d.q25, 699.0));
        assert!(approx(d.q75, 899.0));
        assert!(approx(d.iqr, 200.0));
        assert!(approx(d.skewness.unwrap(), 0.0));
        assert!(approx(d.kurtosis.unwrap(), -1.5));
    }

    #[test]
    fn test_single_value_has_no_spread() {
        let d = describe(&[42.0]).unwrap();
        assert_eq!(d.std, None);
        assert_eq!(d.skewness, None);
        assert!(approx(d.q25, 42.0));
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn test_quantile_interpolation() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(quantile_sorted(&s, 0.5).unwrap(), 2.5));
        assert!(approx(quantile_sorted(&s, 0.25).unwrap(), 1.75));
        assert!(approx(quantile_sorted(&s, 1.0).unwrap(), 4.0));
    }

    #[test]
    fn test_pearson() {
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap(), 1.0));
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap(), -1.0));
        assert_eq!(pearson(&[1.0, 1.0], &[2.0, 3.0]), None);
    }

    #[test]
    fn test_ttest_detects_separated_groups() {
        let cheap = [100.0, 110.0, 90.0, 105.0, 95.0];
        let pricey = [1000.0, 1100.0, 900.0, 1050.0, 950.0];
        let t = ttest_ind(&cheap, &pricey).unwrap();
        assert!(t.t_statistic < 0.0);
        assert!(t.p_value < 0.001);
        assert!(t.significant_difference);

        let same = ttest_ind(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(approx(same.t_statistic, 0.0));
        assert!(approx(same.p_value, 1.0));
        assert!(ttest_ind(&[1.0], &[2.0]).is_none());
    }

    #[test]
    fn test_two_sided_p_reference() {
        // t = 2.228 is the 97.5th percentile of t(10)
        let p = two_sided_p(2.228, 10.0).unwrap();
        assert!((p - 0.05).abs() < 1e-3);
        assert_eq!(two_sided_p(1.0, 0.0), None);
    }

    #[test]
    fn test_arg_extremes_prefer_first_key() {
        let counts: BTreeMap<u32, usize> = [(9, 3), (10, 3), (11, 1), (12, 1)].into_iter().collect();
        assert_eq!(arg_max(&counts), Some(9));
        assert_eq!(arg_min(&counts), Some(11));
    }
}
