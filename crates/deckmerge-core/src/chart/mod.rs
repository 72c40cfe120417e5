//! Chart data synchronization: the value caches inside chart XML and the
//! embedded workbook the chart was drawn from are rewritten together.

pub mod cache;
pub mod workbook;

use crate::error::{DeckMergeError, Result};
use crate::package::content_types::content_type_values as ctv;
use crate::package::paths;
use crate::package::relationships::relationship_types as rt;
use crate::package::{OoxmlPackage, Part, PartContent, PartRole, Relationship};
use crate::settings::MismatchPolicy;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartCategory {
    pub label: String,
    /// One value per series, in series order.
    pub values: Vec<f64>,
}

/// A chart's data as a category-by-series grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub series: Vec<ChartSeries>,
    pub categories: Vec<ChartCategory>,
}

impl ChartData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, label: impl Into<String>) -> Self {
        self.series.push(ChartSeries {
            label: label.into(),
        });
        self
    }

    pub fn with_category(mut self, label: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.categories.push(ChartCategory {
            label: label.into(),
            values: values.into(),
        });
        self
    }

    /// Value of series `series` in category `category`.
    pub fn value(&self, series: usize, category: usize) -> Option<f64> {
        self.categories.get(category)?.values.get(series).copied()
    }

    /// Checks the grid is rectangular, or cuts it down to the narrowest width.
    pub fn normalized(&self, policy: MismatchPolicy) -> Result<ChartData> {
        if self.series.is_empty() {
            return Err(DeckMergeError::ChartData {
                message: "chart data has no series".to_string(),
            });
        }
        let width = self.series.len();
        let mismatched = self.categories.iter().find(|c| c.values.len() != width);
        match (mismatched, policy) {
            (None, _) => Ok(self.clone()),
            (Some(category), MismatchPolicy::Reject) => Err(DeckMergeError::ChartData {
                message: format!(
                    "category '{}' has {} values for {} series",
                    category.label,
                    category.values.len(),
                    width
                ),
            }),
            (Some(_), MismatchPolicy::Truncate) => {
                let width = self
                    .categories
                    .iter()
                    .map(|c| c.values.len())
                    .min()
                    .unwrap_or(width)
                    .min(width);
                if width == 0 {
                    return Err(DeckMergeError::ChartData {
                        message: "a category has no values".to_string(),
                    });
                }
                let mut data = self.clone();
                data.series.truncate(width);
                for category in &mut data.categories {
                    category.values.truncate(width);
                }
                debug!("chart data truncated to {width} series");
                Ok(data)
            }
        }
    }
}

/// A chart part and the embedded workbook behind it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartParts {
    pub chart: String,
    pub workbook: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartSyncReport {
    pub chart: String,
    pub workbook: Option<String>,
    pub series: usize,
    pub categories: usize,
    /// The workbook was shared with another chart and got a private copy first.
    pub workbook_unshared: bool,
    pub shared_strings_appended: usize,
}

pub fn chart_parts(pkg: &OoxmlPackage, chart_path: &str) -> Result<ChartParts> {
    let part = pkg.part(chart_path)?;
    if part.role != PartRole::Chart {
        return Err(DeckMergeError::malformed(format!(
            "'{chart_path}' is a {:?} part, not a chart",
            part.role
        )));
    }
    let workbook = pkg
        .internal_targets(chart_path)
        .into_iter()
        .find(|(rel, _)| rel.rel_type == rt::PACKAGE)
        .map(|(_, target)| target);
    Ok(ChartParts {
        chart: chart_path.to_string(),
        workbook,
    })
}

/// Writes `data` into the chart's caches and its embedded workbook.
pub fn set_chart_data(
    pkg: &mut OoxmlPackage,
    chart_path: &str,
    data: &ChartData,
    policy: MismatchPolicy,
) -> Result<ChartSyncReport> {
    let data = data.normalized(policy)?;
    let mut parts = chart_parts(pkg, chart_path)?;
    let mut report = ChartSyncReport {
        chart: chart_path.to_string(),
        series: data.series.len(),
        categories: data.categories.len(),
        ..Default::default()
    };

    if let Some(workbook) = parts.workbook.clone() {
        if pkg.referencing(&workbook).len() > 1 {
            parts.workbook = Some(unshare_workbook(pkg, chart_path, &workbook)?);
            report.workbook_unshared = true;
        }
    }

    let mut sheet = cache::sheet_name(pkg.xml(chart_path)?).unwrap_or_else(|| "Sheet1".to_string());
    if let Some(workbook) = &parts.workbook {
        let bytes = pkg
            .part(workbook)?
            .as_binary()
            .ok_or_else(|| DeckMergeError::malformed(format!("'{workbook}' is not a binary part")))?
            .to_vec();
        let update = workbook::write_workbook(workbook, &bytes, &data, &sheet)?;
        sheet = update.sheet;
        report.shared_strings_appended = update.strings_appended;
        pkg.part_mut(workbook)?.content = PartContent::Binary(update.bytes);
    }

    cache::write_chart_cache(pkg.xml_mut(chart_path)?, &data, &sheet)?;
    report.workbook = parts.workbook;
    info!(
        "chart '{chart_path}' updated: {} series x {} categories",
        report.series, report.categories
    );
    Ok(report)
}

/// Reads the data currently cached in a chart part.
pub fn read_chart_data(pkg: &OoxmlPackage, chart_path: &str) -> Result<ChartData> {
    chart_parts(pkg, chart_path)?;
    Ok(cache::read_chart_cache(pkg.xml(chart_path)?))
}

/// Gives `chart_path` its own copy of a workbook other charts also point at.
fn unshare_workbook(pkg: &mut OoxmlPackage, chart_path: &str, workbook: &str) -> Result<String> {
    let rel_id = pkg
        .internal_targets(chart_path)
        .into_iter()
        .find(|(rel, target)| rel.rel_type == rt::PACKAGE && target == workbook)
        .map(|(rel, _)| rel.id)
        .ok_or_else(|| DeckMergeError::missing_part(workbook))?;
    let original = pkg.part(workbook)?.clone();
    let content_type = pkg
        .content_type_of(workbook)
        .unwrap_or(ctv::EMBEDDED_WORKBOOK)
        .to_string();

    let copy_path = pkg.allocate_part_path(workbook)?;
    pkg.add_part_with_type(
        Part {
            path: copy_path.clone(),
            ..original
        },
        &content_type,
    )?;
    let rels = pkg.relationships_mut(chart_path)?;
    rels.remove(&rel_id);
    rels.push(Relationship::new(
        &rel_id,
        rt::PACKAGE,
        &paths::relative_target(chart_path, &copy_path),
    ));
    debug!("'{chart_path}' now owns workbook copy '{copy_path}'");
    Ok(copy_path)
}

/// Spreadsheet column letters for a zero-based column index.
pub(crate) fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

pub(crate) fn cell_ref(row: usize, column: usize) -> String {
    format!("{}{}", column_name(column), row + 1)
}

pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
