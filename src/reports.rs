//! Analysis reports: JSON, HTML and a plaintext summary.

use crate::errors::{PipelineError, ResultExt};
use crate::export::TIMESTAMP_FORMAT;
use crate::models::{columns, CleanRecord};
use crate::stats::{
    compare_sources, DateRange, DescriptiveStatistics, SourceComparison, StatisticalAnalyzer,
    StatisticalReport,
};
use crate::trends::{TrendAnalyzer, TrendReport};
use chrono::Local;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryOverview {
    pub total_products: usize,
    pub date_range: Option<DateRange>,
    pub categories_covered: usize,
    pub brands_covered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub report_date: String,
    pub data_overview: SummaryOverview,
    pub key_insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_records: usize,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub report_timestamp: String,
    pub data_summary: DataSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparativeAnalysis {
    pub source_comparison: BTreeMap<String, SourceComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedReport {
    pub metadata: ReportMetadata,
    pub executive_summary: ExecutiveSummary,
    pub statistical_analysis: StatisticalReport,
    pub trend_analysis: TrendReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparative_analysis: Option<ComparativeAnalysis>,
}

/// Builds and writes the analysis reports for one cleaned table.
pub struct ReportGenerator<'a> {
    records: &'a [CleanRecord],
    output_dir: PathBuf,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(records: &'a [CleanRecord], output_dir: impl Into<PathBuf>) -> Self {
        Self {
            records,
            output_dir: output_dir.into(),
        }
    }

    pub fn generate_executive_summary(&self) -> ExecutiveSummary {
        let stats = StatisticalAnalyzer::new(self.records).descriptive_statistics();
        ExecutiveSummary {
            report_date: Local::now().to_rfc3339(),
            data_overview: SummaryOverview {
                total_products: self.records.len(),
                date_range: stats.overview.date_range.clone(),
                categories_covered: stats.overview.categories.len(),
                brands_covered: stats.overview.brands.len(),
            },
            key_insights: key_insights(&stats, self.records.len()),
        }
    }

    pub fn generate_detailed_report(&self) -> DetailedReport {
        let sources: BTreeSet<_> = self.records.iter().map(|r| r.source).collect();
        let comparative_analysis = (sources.len() > 1).then(|| ComparativeAnalysis {
            source_comparison: compare_sources(self.records),
        });

        DetailedReport {
            metadata: ReportMetadata {
                report_timestamp: Local::now().to_rfc3339(),
                data_summary: DataSummary {
                    total_records: self.records.len(),
                    columns: columns(self.records),
                },
            },
            executive_summary: self.generate_executive_summary(),
            statistical_analysis: StatisticalAnalyzer::new(self.records).generate_summary_report(),
            trend_analysis: TrendAnalyzer::new(self.records).generate_trend_report(),
            comparative_analysis,
        }
    }

    /// Writes the JSON report, HTML report and plaintext summary.
    ///
    /// # Returns
    /// Map of report kind (`json_report`, `html_report`, `summary`) to path.
    pub fn generate_complete_report(&self) -> Result<BTreeMap<String, PathBuf>, PipelineError> {
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.generate_with_stamp(&stamp)
    }

    /// [`Self::generate_complete_report`] with an explicit timestamp suffix.
    pub fn generate_with_stamp(&self, stamp: &str) -> Result<BTreeMap<String, PathBuf>, PipelineError> {
        tracing::info!("Generating comprehensive analysis report...");
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let report = self.generate_detailed_report();
        let mut files = BTreeMap::new();

        let json_path = self
            .output_dir
            .join(format!("ecommerce_analysis_report_{}.json", stamp));
        let json = serde_json::to_string_pretty(&report)?;
        write_file(&json_path, &json)?;
        files.insert("json_report".to_string(), json_path);

        let html_path = self
            .output_dir
            .join(format!("ecommerce_analysis_report_{}.html", stamp));
        write_file(&html_path, &render_html(&report))?;
        files.insert("html_report".to_string(), html_path);

        let summary_path = self.output_dir.join(format!("report_summary_{}.txt", stamp));
        write_file(&summary_path, &render_summary(&report, &files))?;
        files.insert("summary".to_string(), summary_path);

        tracing::info!(
            "Complete report generated. Files: {:?}",
            files.keys().collect::<Vec<_>>()
        );
        Ok(files)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), PipelineError> {
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!("Report exported to: {}", path.display());
    Ok(())
}

/// Plain-language findings for the executive summary.
pub fn key_insights(stats: &DescriptiveStatistics, total: usize) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(price) = &stats.price_statistics {
        insights.push(format!("Average product price is {:.0} GEL", price.mean));
        if price.skewness.is_some_and(|s| s > 1.0) {
            insights.push("Price distribution is heavily skewed towards lower prices".to_string());
        }

        let by_category = &stats.price_by_category;
        if by_category.len() > 1 {
            let mut highest: Option<(&String, f64)> = None;
            let mut lowest: Option<(&String, f64)> = None;
            for (cat, s) in by_category {
                if highest.map_or(true, |(_, m)| s.mean > m) {
                    highest = Some((cat, s.mean));
                }
                if lowest.map_or(true, |(_, m)| s.mean < m) {
                    lowest = Some((cat, s.mean));
                }
            }
            if let (Some((hi, hi_mean)), Some((lo, lo_mean))) = (highest, lowest) {
                insights.push(format!("{} has the highest average prices ({:.0} GEL)", hi, hi_mean));
                insights.push(format!("{} has the lowest average prices ({:.0} GEL)", lo, lo_mean));
            }
        } else if let Some((cat, s)) = by_category.iter().next() {
            insights.push(format!(
                "All products are in {} category with average price {:.0} GEL",
                cat, s.mean
            ));
        }
    }

    let mut top: Option<(&String, usize)> = None;
    for (brand, &count) in &stats.overview.brands {
        if top.map_or(true, |(_, c)| count > c) {
            top = Some((brand, count));
        }
    }
    if let Some((brand, count)) = top.filter(|_| total > 0) {
        insights.push(format!(
            "{} dominates with {:.1}% market share",
            brand,
            count as f64 / total as f64 * 100.0
        ));
    }

    insights
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `1234567` -> `1,234,567`
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

const HTML_STYLE: &str = "
        body { font-family: Arial, sans-serif; margin: 40px; }
        .header { background-color: #f4f4f4; padding: 20px; border-radius: 5px; }
        .section { margin: 20px 0; padding: 15px; border-left: 4px solid #007ACC; }
        .insight { background-color: #e8f4f8; padding: 10px; margin: 10px 0; border-radius: 3px; }
        .metric { display: inline-block; margin: 10px; padding: 15px; background-color: #f9f9f9; border-radius: 5px; }
        table { border-collapse: collapse; width: 100%; margin: 10px 0; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #f2f2f2; }
";

pub fn render_html(report: &DetailedReport) -> String {
    let mut html = String::new();
    // writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"utf-8\">\n    <title>E-commerce Data Analysis Report</title>\n    <style>{}    </style>\n</head>\n<body>\n",
        HTML_STYLE
    );

    let _ = write!(
        html,
        "<div class=\"header\">\n    <h1>E-commerce Data Analysis Report</h1>\n    <p>Generated on: {}</p>\n    <p>Total Records Analyzed: {}</p>\n</div>\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        thousands(report.metadata.data_summary.total_records)
    );

    html.push_str("<div class=\"section\">\n    <h2>Executive Summary</h2>\n");
    if !report.executive_summary.key_insights.is_empty() {
        html.push_str("    <h3>Key Insights:</h3>\n");
        for insight in &report.executive_summary.key_insights {
            let _ = writeln!(html, "    <div class=\"insight\">{}</div>", escape_html(insight));
        }
    }
    html.push_str("</div>\n");

    let desc = &report.statistical_analysis.descriptive_statistics;
    html.push_str("<div class=\"section\">\n    <h2>Statistical Overview</h2>\n");
    if let Some(price) = &desc.price_statistics {
        html.push_str("    <h3>Price Statistics</h3>\n    <div style=\"display: flex; flex-wrap: wrap;\">\n");
        for (label, value) in [
            ("Average", price.mean),
            ("Median", price.median),
            ("Min", price.min),
            ("Max", price.max),
        ] {
            let _ = writeln!(
                html,
                "        <div class=\"metric\"><strong>{}:</strong><br>{:.0} GEL</div>",
                label, value
            );
        }
        html.push_str("    </div>\n");
    }

    let categories = &desc.overview.categories;
    if !categories.is_empty() {
        html.push_str("    <h3>Category Breakdown</h3>\n    <table>\n        <tr><th>Category</th><th>Count</th><th>Percentage</th></tr>\n");
        let total: usize = categories.values().sum();
        for (cat, count) in categories {
            let _ = writeln!(
                html,
                "        <tr><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
                escape_html(cat),
                count,
                *count as f64 / total as f64 * 100.0
            );
        }
        html.push_str("    </table>\n");
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

pub fn render_summary(report: &DetailedReport, files: &BTreeMap<String, PathBuf>) -> String {
    let mut out = String::new();
    out.push_str("E-COMMERCE DATA ANALYSIS REPORT SUMMARY\n");
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");
    let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        out,
        "Total Records: {}",
        thousands(report.metadata.data_summary.total_records)
    );
    let range = match &report.executive_summary.data_overview.date_range {
        Some(r) => format!("{} to {} ({} days)", r.start_date, r.end_date, r.span_days),
        None => "n/a".to_string(),
    };
    let _ = writeln!(out, "Date Range: {}\n", range);

    let insights = &report.executive_summary.key_insights;
    if !insights.is_empty() {
        out.push_str("KEY INSIGHTS:\n");
        for (i, insight) in insights.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, insight);
        }
    }

    out.push_str("\nFiles Generated:\n");
    for (kind, path) in files {
        let _ = writeln!(out, "- {}: {}", kind, path.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{GroupStats, Overview};

    fn group(mean: f64) -> GroupStats {
        GroupStats {
            count: 1,
            mean,
            median: mean,
            std: None,
            min: mean,
            max: mean,
        }
    }

    fn stats_with(categories: &[(&str, f64)], brands: &[(&str, usize)]) -> DescriptiveStatistics {
        DescriptiveStatistics {
            overview: Overview {
                total_records: 4,
                date_range: None,
                categories: BTreeMap::new(),
                sources: BTreeMap::new(),
                brands: brands.iter().map(|(b, c)| (b.to_string(), *c)).collect(),
            },
            price_statistics: crate::stats::describe(&[100.0, 200.0, 300.0, 400.0]),
            price_by_category: categories
                .iter()
                .map(|(c, m)| (c.to_string(), group(*m)))
                .collect(),
            text_statistics: BTreeMap::new(),
        }
    }

    #[test]
    fn test_insights_compare_categories() {
        let stats = stats_with(&[("laptops", 2500.0), ("phones", 1200.4)], &[("Apple", 3), ("Samsung", 1)]);
        let insights = key_insights(&stats, 4);
        assert_eq!(insights[0], "Average product price is 250 GEL");
        assert!(insights.contains(&"laptops has the highest average prices (2500 GEL)".to_string()));
        assert!(insights.contains(&"phones has the lowest average prices (1200 GEL)".to_string()));
        assert!(insights.contains(&"Apple dominates with 75.0% market share".to_string()));
    }

    #[test]
    fn test_single_category_insight() {
        let stats = stats_with(&[("tvs", 999.0)], &[]);
        let insights = key_insights(&stats, 4);
        assert!(insights.contains(&"All products are in tvs category with average price 999 GEL".to_string()));
        assert!(!insights.iter().any(|i| i.contains("dominates")));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1234567), "1,234,567");
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }
}
