//! CSV export of the series collected by the engine.
//!
//! The three tick-indexed series (size, active count, lifetime) share a row
//! per tick even when their lengths differ; a series that is shorter than
//! the table leaves its cells empty. The size distribution is indexed by
//! object, not by tick: it rides along in the last column and never adds
//! rows of its own.

use std::fmt::Write as _;

use tracing::info;

use crate::config::Snapshot;
use crate::engine::SimulationEngine;

pub const CSV_MIME: &str = "attachment/text";
pub const DEFAULT_FILE_NAME: &str = "data.csv";

/// Which columns the export contains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeriesFlags {
    pub size: bool,
    pub active_count: bool,
    pub lifetime: bool,
    pub size_distribution: bool,
}

impl SeriesFlags {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            size: snapshot.track_size,
            active_count: snapshot.track_active_count,
            lifetime: snapshot.track_lifetime,
            size_distribution: snapshot.track_size_distribution,
        }
    }
}

/// The four series as handed out by the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeriesBundle {
    pub size: Vec<f64>,
    pub active_count: Vec<f64>,
    pub lifetime: Vec<f64>,
    pub size_distribution: Vec<f64>,
}

impl SeriesBundle {
    pub fn from_engine(engine: &impl SimulationEngine) -> Self {
        Self {
            size: engine.data_size(),
            active_count: engine.data_active_count(),
            lifetime: engine.data_lifetime(),
            size_distribution: engine.data_size_distribution(),
        }
    }

    /// Number of data rows: the longest tick-indexed series.
    pub fn row_count(&self) -> usize {
        self.size
            .len()
            .max(self.active_count.len())
            .max(self.lifetime.len())
    }
}

/// Physical unit of the size column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeUnit {
    Length,
    Area,
    Volume,
}

impl SizeUnit {
    /// 2 is an area, 3 and above a volume, anything else a length.
    pub fn for_dimension(dimensionality: f64) -> Self {
        if dimensionality == 2.0 {
            SizeUnit::Area
        } else if dimensionality >= 3.0 {
            SizeUnit::Volume
        } else {
            SizeUnit::Length
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            SizeUnit::Length => "l",
            SizeUnit::Area => "S",
            SizeUnit::Volume => "V",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            SizeUnit::Length => " [m]",
            SizeUnit::Area => " [m²]",
            SizeUnit::Volume => " [m³]",
        }
    }
}

/// Renders `bundle` as CSV text.
///
/// Header fields are quoted, data fields are not. Every row, the header
/// included, ends with a newline.
pub fn build_csv(flags: SeriesFlags, unit: SizeUnit, bundle: &SeriesBundle) -> String {
    let mut csv = String::from("\"t\"");

    let letter = unit.letter();
    let suffix = unit.suffix();
    if flags.size {
        let _ = write!(csv, ",\"{letter}{suffix}\"");
    }
    if flags.active_count {
        csv.push_str(",\"N active\"");
    }
    if flags.lifetime {
        csv.push_str(",\"T lifetime [s]\"");
    }
    if flags.size_distribution {
        let _ = write!(csv, ",\"{letter} final{suffix}\"");
    }
    csv.push('\n');

    let columns = [
        (flags.size, &bundle.size),
        (flags.active_count, &bundle.active_count),
        (flags.lifetime, &bundle.lifetime),
    ];

    for t in 0..bundle.row_count() {
        let _ = write!(csv, "{t}");
        for (_, series) in columns.iter().filter(|(enabled, _)| *enabled) {
            csv.push(',');
            if let Some(&v) = series.get(t) {
                push_number(&mut csv, v);
            }
        }
        if flags.size_distribution
            && let Some(&v) = bundle.size_distribution.get(t)
        {
            csv.push(',');
            push_number(&mut csv, v);
        }
        csv.push('\n');
    }

    csv
}

/// Writes `v` the way the data has always been presented: integral values
/// without a fractional part, spelled-out infinities, and exponent notation
/// (`1.5e-7`, `1e+21`) below 1e-6 and from 1e21 on.
fn push_number(out: &mut String, v: f64) {
    if v.is_nan() {
        out.push_str("NaN");
    } else if v.is_infinite() {
        out.push_str(if v > 0.0 { "Infinity" } else { "-Infinity" });
    } else if v == 0.0 {
        out.push('0');
    } else if v.abs() < 1e-6 || v.abs() >= 1e21 {
        let sci = format!("{v:e}");
        match sci.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => {
                let _ = write!(out, "{mantissa}e+{exp}");
            }
            _ => out.push_str(&sci),
        }
    } else {
        let _ = write!(out, "{v}");
    }
}

/// A file ready to be handed to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime: &'static str,
    pub body: String,
}

impl Download {
    pub fn csv(body: String) -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            mime: CSV_MIME,
            body,
        }
    }

    /// `data:` URI carrying the body, percent-encoded outside the URI
    /// character set.
    pub fn data_uri(&self) -> String {
        let mut uri = format!("data:{},", self.mime);
        encode_uri_into(&mut uri, &self.body);
        uri
    }
}

/// Characters that survive URI encoding untouched.
fn is_uri_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b";,/?:@&=+$-_.!~*'()#".contains(&b)
}

fn encode_uri_into(out: &mut String, text: &str) {
    for b in text.bytes() {
        if is_uri_safe(b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
}

/// Pulls the current series out of `engine` and packages them as a CSV
/// download, using the columns and unit of `snapshot`.
pub fn export(engine: &impl SimulationEngine, snapshot: &Snapshot) -> Download {
    let bundle = SeriesBundle::from_engine(engine);
    let flags = SeriesFlags::from_snapshot(snapshot);
    let unit = SizeUnit::for_dimension(snapshot.dimensionality);

    let body = build_csv(flags, unit, &bundle);
    info!(rows = bundle.row_count(), bytes = body.len(), "series exported");
    Download::csv(body)
}
