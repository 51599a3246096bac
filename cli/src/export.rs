//! Excel, JSON and CSV export of extracted places.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone};
use placescout_core::{OutputConfig, Place};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const HEADER: [&str; 8] = [
    "name",
    "address",
    "phone",
    "website",
    "category",
    "rating",
    "review_count",
    "extracted_at",
];

/// Characters that are not allowed in file names on common platforms.
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Serialize)]
struct CsvRow<'a> {
    name: &'a str,
    address: Option<&'a str>,
    phone: Option<&'a str>,
    website: Option<&'a str>,
    category: Option<&'a str>,
    rating: Option<f64>,
    review_count: Option<u64>,
    extracted_at: String,
}

impl<'a> From<&'a Place> for CsvRow<'a> {
    fn from(place: &'a Place) -> Self {
        Self {
            name: place.name(),
            address: place.address(),
            phone: place.phone(),
            website: place.website(),
            category: place.category(),
            rating: place.rating().map(f64::from),
            review_count: place.known_review_count(),
            extracted_at: place.extracted_at().to_rfc3339(),
        }
    }
}

/// File name (without extension) for one export.
///
/// `google_maps_<query>[_<location>...]_<YYYYmmdd_HHMMSS>`, with characters
/// that are reserved in file names replaced by `_`.
pub fn output_stem<Tz: TimeZone>(query: &str, locations: &[String], at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut stem = format!("google_maps_{}", query.trim());
    for location in locations.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        stem.push('_');
        stem.push_str(location);
    }
    stem.push('_');
    stem.push_str(&at.format("%Y%m%d_%H%M%S").to_string());

    stem.chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect()
}

/// Create the output directory if it does not exist yet.
pub fn ensure_output_dir(directory: &Path) -> Result<()> {
    if !directory.exists() {
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create output directory {}", directory.display()))?;
        tracing::info!(directory = %directory.display(), "Created output directory");
    }
    Ok(())
}

/// Write places as a pretty-printed JSON array.
pub fn write_json(places: &[Place], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, places)
        .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write places as CSV with a single header row.
///
/// Unknown values are written as empty cells.
pub fn write_csv(places: &[Place], path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(HEADER)?;
    for place in places {
        writer
            .serialize(CsvRow::from(place))
            .with_context(|| format!("Failed to write CSV row for {}", place.name()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write places as an Excel workbook: a bold, frozen header row and one row
/// per place. Unknown values are left blank.
#[allow(clippy::cast_precision_loss)]
pub fn write_xlsx(places: &[Place], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, title) in (0u16..).zip(HEADER) {
        worksheet.write_string_with_format(0, col, title, &bold)?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    worksheet.set_column_width(0, 32)?;
    worksheet.set_column_width(1, 40)?;

    for (row, place) in (1u32..).zip(places) {
        let row_data = CsvRow::from(place);
        let text = [
            (0, Some(row_data.name)),
            (1, row_data.address),
            (2, row_data.phone),
            (3, row_data.website),
            (4, row_data.category),
        ];
        for (col, value) in text {
            if let Some(value) = value {
                worksheet.write_string(row, col, value)?;
            }
        }
        if let Some(rating) = row_data.rating {
            worksheet.write_number(row, 5, rating)?;
        }
        if let Some(count) = row_data.review_count {
            worksheet.write_number(row, 6, count as f64)?;
        }
        worksheet.write_string(row, 7, row_data.extracted_at)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook {}", path.display()))?;
    Ok(())
}

/// Write every configured format and return the paths written.
pub fn export(places: &[Place], output: &OutputConfig, stem: &str) -> Result<Vec<PathBuf>> {
    ensure_output_dir(&output.directory)?;

    let mut written = Vec::new();
    for extension in output.format.extensions() {
        let path = output.directory.join(format!("{stem}.{extension}"));
        match *extension {
            "xlsx" => write_xlsx(places, &path)?,
            "json" => write_json(places, &path)?,
            "csv" => write_csv(places, &path)?,
            other => bail!("unsupported export format: {other}"),
        }
        tracing::info!(path = %path.display(), records = places.len(), "Export written");
        written.push(path);
    }
    Ok(written)
}
