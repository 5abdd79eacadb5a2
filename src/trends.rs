//! Trend detection over daily aggregates.

use crate::models::CleanRecord;
use crate::stats::{mean, median, sample_std, two_sided_p, SIGNIFICANCE};
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;

/// Ordinary least squares fit of `y` against `x = 0, 1, .., n-1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub p_value: f64,
}

impl Regression {
    pub fn is_significant(&self) -> bool {
        self.p_value < SIGNIFICANCE
    }
}

/// Fits a line through `y` over its index. `None` below two points.
///
/// The p-value tests the null hypothesis of zero slope. With exactly two
/// points the fit is perfect: p is 0 when the values differ and 1 otherwise.
pub fn linregress(y: &[f64]) -> Option<Regression> {
    let n = y.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mx = (nf - 1.0) / 2.0;
    let my = mean(y)?;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (i, v) in y.iter().enumerate() {
        let dx = i as f64 - mx;
        let dy = v - my;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let r = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let p_value = if n == 2 {
        if y[0] == y[1] {
            1.0
        } else {
            0.0
        }
    } else {
        let df = nf - 2.0;
        const TINY: f64 = 1e-20;
        let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
        two_sided_p(t, df)?
    };

    Some(Regression {
        slope,
        intercept,
        r_squared: r * r,
        p_value,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    InsufficientData,
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::InsufficientData => "insufficient_data",
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a fitted trend. A slope only counts when p < 0.05.
pub fn trend_direction(fit: Option<&Regression>) -> TrendDirection {
    match fit {
        None => TrendDirection::InsufficientData,
        Some(r) if r.is_significant() && r.slope > 0.0 => TrendDirection::Increasing,
        Some(r) if r.is_significant() && r.slope < 0.0 => TrendDirection::Decreasing,
        Some(_) => TrendDirection::Stable,
    }
}

/// Fitted trend of one daily series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTrend {
    pub trend_direction: TrendDirection,
    pub slope: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub is_significant: bool,
}

impl SeriesTrend {
    fn fit(series: &[f64]) -> Option<Self> {
        let fit = linregress(series)?;
        Some(Self {
            trend_direction: trend_direction(Some(&fit)),
            slope: fit.slope,
            r_squared: fit.r_squared,
            p_value: fit.p_value,
            is_significant: fit.is_significant(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPrice {
    pub date: String,
    pub mean: f64,
    pub median: f64,
    pub count: usize,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    #[serde(flatten)]
    pub trend: SeriesTrend,
    pub daily_data: Vec<DailyPrice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Volatility {
    pub daily_price_volatility: f64,
    pub coefficient_of_variation: Option<f64>,
    pub max_daily_change: f64,
    pub avg_daily_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTrends {
    pub daily_trends: Option<DailyTrend>,
    pub volatility: Option<Volatility>,
    pub category_trends: BTreeMap<String, SeriesTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeTrend {
    #[serde(flatten)]
    pub trend: SeriesTrend,
    pub avg_daily_volume: f64,
    pub max_daily_volume: usize,
    pub min_daily_volume: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyVolume {
    pub peak_hours: Vec<u32>,
    pub low_hours: Vec<u32>,
    pub hourly_distribution: BTreeMap<u32, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyVolume {
    pub busiest_days: Vec<String>,
    pub quietest_days: Vec<String>,
    pub weekly_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeTrends {
    pub daily_volume: Option<VolumeTrend>,
    pub hourly_patterns: HourlyVolume,
    pub weekly_patterns: WeeklyVolume,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPeriod {
    pub start_date: String,
    pub end_date: String,
    pub total_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub analysis_timestamp: String,
    pub data_period: Option<DataPeriod>,
    pub price_trends: PriceTrends,
    pub volume_trends: VolumeTrends,
}

/// Price and volume trends over the scrape dates of a cleaned table.
pub struct TrendAnalyzer<'a> {
    records: &'a [CleanRecord],
}

impl<'a> TrendAnalyzer<'a> {
    pub fn new(records: &'a [CleanRecord]) -> Self {
        Self { records }
    }

    /// Prices grouped by scrape date, in date order.
    fn daily_prices<'r>(records: impl Iterator<Item = &'r CleanRecord>) -> BTreeMap<String, Vec<f64>> {
        let mut days: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for r in records {
            days.entry(r.scrape_date.to_string()).or_default().push(r.price);
        }
        days
    }

    pub fn price_trends(&self) -> PriceTrends {
        let days = Self::daily_prices(self.records.iter());
        let daily_data: Vec<DailyPrice> = days
            .iter()
            .filter_map(|(date, prices)| {
                Some(DailyPrice {
                    date: date.clone(),
                    mean: mean(prices)?,
                    median: median(prices)?,
                    count: prices.len(),
                    std: sample_std(prices),
                })
            })
            .collect();
        let means: Vec<f64> = daily_data.iter().map(|d| d.mean).collect();

        let volatility = sample_std(&means).map(|std| {
            let changes: Vec<f64> = means.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
            Volatility {
                daily_price_volatility: std,
                coefficient_of_variation: mean(&means).filter(|m| *m != 0.0).map(|m| std / m),
                max_daily_change: changes.iter().copied().fold(0.0, f64::max),
                avg_daily_change: mean(&changes).unwrap_or(0.0),
            }
        });

        let mut by_category: BTreeMap<String, Vec<&CleanRecord>> = BTreeMap::new();
        for r in self.records {
            by_category.entry(r.category.to_string()).or_default().push(r);
        }
        let category_trends = by_category
            .into_iter()
            .filter_map(|(category, rows)| {
                let series: Vec<f64> = Self::daily_prices(rows.into_iter())
                    .values()
                    .filter_map(|p| mean(p))
                    .collect();
                SeriesTrend::fit(&series).map(|t| (category, t))
            })
            .collect();

        PriceTrends {
            daily_trends: SeriesTrend::fit(&means).map(|trend| DailyTrend { trend, daily_data }),
            volatility,
            category_trends,
        }
    }

    pub fn volume_trends(&self) -> VolumeTrends {
        let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
        let mut per_hour: BTreeMap<u32, usize> = BTreeMap::new();
        let mut per_weekday: BTreeMap<String, usize> = BTreeMap::new();
        for r in self.records {
            *per_day.entry(r.scrape_date.to_string()).or_default() += 1;
            *per_hour.entry(r.scrape_hour).or_default() += 1;
            *per_weekday.entry(r.scrape_weekday.clone()).or_default() += 1;
        }

        let counts: Vec<f64> = per_day.values().map(|&c| c as f64).collect();
        let daily_volume = SeriesTrend::fit(&counts).map(|trend| VolumeTrend {
            trend,
            avg_daily_volume: mean(&counts).unwrap_or(0.0),
            max_daily_volume: per_day.values().copied().max().unwrap_or(0),
            min_daily_volume: per_day.values().copied().min().unwrap_or(0),
        });

        VolumeTrends {
            daily_volume,
            hourly_patterns: HourlyVolume {
                peak_hours: ranked_keys(&per_hour, 3, true),
                low_hours: ranked_keys(&per_hour, 3, false),
                hourly_distribution: per_hour,
            },
            weekly_patterns: WeeklyVolume {
                busiest_days: ranked_keys(&per_weekday, 3, true),
                quietest_days: ranked_keys(&per_weekday, 3, false),
                weekly_distribution: per_weekday,
            },
        }
    }

    pub fn data_period(&self) -> Option<DataPeriod> {
        let start = self.records.iter().map(|r| r.scrape_date).min()?;
        let end = self.records.iter().map(|r| r.scrape_date).max()?;
        Some(DataPeriod {
            start_date: start.to_string(),
            end_date: end.to_string(),
            total_days: (end - start).num_days(),
        })
    }

    pub fn generate_trend_report(&self) -> TrendReport {
        TrendReport {
            analysis_timestamp: Local::now().to_rfc3339(),
            data_period: self.data_period(),
            price_trends: self.price_trends(),
            volume_trends: self.volume_trends(),
        }
    }
}

/// Up to `n` keys ordered by count; ties keep key order.
fn ranked_keys<K: Clone + Ord>(counts: &BTreeMap<K, usize>, n: usize, largest: bool) -> Vec<K> {
    let mut entries: Vec<(&K, usize)> = counts.iter().map(|(k, &c)| (k, c)).collect();
    // stable sort keeps key order among equal counts
    if largest {
        entries.sort_by(|a, b| b.1.cmp(&a.1));
    } else {
        entries.sort_by(|a, b| a.1.cmp(&b.1));
    }
    entries.into_iter().take(n).map(|(k, _)| k.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linregress_perfect_line() {
        let fit = linregress(&[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.p_value < 1e-6);
        assert_eq!(trend_direction(Some(&fit)), TrendDirection::Increasing);
    }

    #[test]
    fn test_two_points() {
        let up = linregress(&[100.0, 150.0]).unwrap();
        assert_eq!(up.p_value, 0.0);
        assert_eq!(trend_direction(Some(&up)), TrendDirection::Increasing);

        let down = linregress(&[150.0, 100.0]).unwrap();
        assert_eq!(trend_direction(Some(&down)), TrendDirection::Decreasing);

        let flat = linregress(&[100.0, 100.0]).unwrap();
        assert_eq!(flat.p_value, 1.0);
        assert_eq!(trend_direction(Some(&flat)), TrendDirection::Stable);
    }

    #[test]
    fn test_noisy_series_is_stable() {
        let fit = linregress(&[10.0, 12.0, 9.0, 11.0, 10.0, 12.0, 9.0]).unwrap();
        assert!(fit.p_value > SIGNIFICANCE);
        assert_eq!(trend_direction(Some(&fit)), TrendDirection::Stable);
    }

    #[test]
    fn test_insufficient_data() {
        assert!(linregress(&[5.0]).is_none());
        assert!(linregress(&[]).is_none());
        assert_eq!(trend_direction(None), TrendDirection::InsufficientData);
        assert_eq!(
            serde_json::to_value(TrendDirection::InsufficientData).unwrap(),
            "insufficient_data"
        );
    }

    #[test]
    fn test_ranked_keys() {
        let counts: BTreeMap<u32, usize> =
            [(8, 2), (9, 5), (10, 5), (11, 1), (12, 3)].into_iter().collect();
        assert_eq!(ranked_keys(&counts, 3, true), vec![9, 10, 12]);
        assert_eq!(ranked_keys(&counts, 3, false), vec![11, 8, 12]);
    }
}
