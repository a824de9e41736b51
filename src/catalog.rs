//! Detections, catalogs and the table loader.
//!
//! A catalog is read from a delimited text table, one detected source per row.
//! Fields may be separated by commas, semicolons, tabs or runs of spaces; the separator is taken
//! from the first data row, and quoted cells are allowed in the delimited forms. Blank lines and
//! lines starting with `#` are ignored. Which columns hold the position and the magnitude
//! is described by a [`ColumnLayout`].

use std::fs::File;
use std::io::Read;
use std::ops::{Deref, Index};
use std::path::Path;

use itertools::Itertools;
use log::info;
use nalgebra::{vector, Vector2};
use ndarray::Array2;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::Float;

/// One point source detected in an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection<F: Float> {
    /// Pixel coordinates in the frame of the source image.
    pub position: Vector2<F>,
    /// Instrumental magnitude after loading, calibrated magnitude after [`crate::calibrate`].
    pub magnitude: F,
}

impl<F: Float> Detection<F> {
    /// Create a new detection.
    pub fn new(x: F, y: F, magnitude: F) -> Self {
        Self {
            position: vector![x, y],
            magnitude,
        }
    }

    /// Horizontal pixel coordinate.
    pub fn x(&self) -> F {
        self.position[0]
    }

    /// Vertical pixel coordinate.
    pub fn y(&self) -> F {
        self.position[1]
    }
}

impl<F: Float> From<(F, F, F)> for Detection<F> {
    fn from((x, y, magnitude): (F, F, F)) -> Self {
        Self::new(x, y, magnitude)
    }
}

/// Zero-based indices of the columns holding `x`, `y` and the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnLayout {
    /// Column of the horizontal position.
    pub x: usize,
    /// Column of the vertical position.
    pub y: usize,
    /// Column of the instrumental magnitude.
    pub magnitude: usize,
}

impl Default for ColumnLayout {
    /// Column 0 holds a source id; position and magnitude follow.
    fn default() -> Self {
        Self {
            x: 1,
            y: 2,
            magnitude: 3,
        }
    }
}

impl ColumnLayout {
    /// Create a layout from explicit column indices.
    pub fn new(x: usize, y: usize, magnitude: usize) -> Self {
        Self { x, y, magnitude }
    }

    pub(crate) fn is_distinct(&self) -> bool {
        self.x != self.y && self.x != self.magnitude && self.y != self.magnitude
    }
}

/// Ordered detections of one image.
///
/// The order is the row order of the source table and is kept as is;
/// it decides which detection wins when two are equally close to a match candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog<F: Float> {
    detections: Vec<Detection<F>>,
}

impl<F: Float> Catalog<F> {
    /// Create a catalog from detections in their source order.
    pub fn new(detections: Vec<Detection<F>>) -> Self {
        Self { detections }
    }

    /// Parse a catalog table from `reader`.
    pub fn from_reader<R: Read>(mut reader: R, columns: ColumnLayout) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let detections = match sniff_delimiter(&text) {
            Some(delimiter) => {
                let mut table = csv::ReaderBuilder::new()
                    .has_headers(false)
                    .flexible(true)
                    .comment(Some(b'#'))
                    .trim(csv::Trim::All)
                    .delimiter(delimiter)
                    .from_reader(text.as_bytes());

                let mut detections = Vec::new();
                for record in table.records() {
                    let record = record?;
                    let comment = record.get(0).is_some_and(|f| f.starts_with('#'));
                    if comment || record.iter().all(str::is_empty) {
                        continue;
                    }
                    let line = record.position().map_or(0, |p| p.line() as usize);
                    let fields = record.iter().collect_vec();
                    detections.push(parse_row(&fields, line, columns)?);
                }
                detections
            }
            None => data_lines(&text)
                .map(|(line, row)| {
                    let fields = row.split_whitespace().collect_vec();
                    parse_row(&fields, line, columns)
                })
                .collect::<Result<_>>()?,
        };

        Ok(Self { detections })
    }

    /// Read a catalog table from the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, columns: ColumnLayout) -> Result<Self> {
        let path = path.as_ref();
        let catalog = Self::from_reader(File::open(path)?, columns)?;
        info!("Loaded {} detections from {}.", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Positions as a matrix of shape `(n_detections, 2)`.
    pub fn positions(&self) -> Array2<F> {
        let flat = self
            .detections
            .iter()
            .flat_map(|d| [d.x(), d.y()])
            .collect_vec();
        Array2::from_shape_vec((self.detections.len(), 2), flat)
            .expect("two coordinates per detection")
    }

    /// All magnitudes in catalog order.
    pub fn magnitudes(&self) -> Vec<F> {
        self.detections.iter().map(|d| d.magnitude).collect()
    }

    pub(crate) fn detections_mut(&mut self) -> &mut [Detection<F>] {
        &mut self.detections
    }
}

impl<F: Float> Deref for Catalog<F> {
    type Target = [Detection<F>];

    fn deref(&self) -> &Self::Target {
        &self.detections
    }
}

impl<F: Float> Index<usize> for Catalog<F> {
    type Output = Detection<F>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.detections[index]
    }
}

impl<F: Float> FromIterator<Detection<F>> for Catalog<F> {
    fn from_iter<I: IntoIterator<Item = Detection<F>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<F: Float> FromIterator<(F, F, F)> for Catalog<F> {
    fn from_iter<I: IntoIterator<Item = (F, F, F)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Detection::from).collect())
    }
}

impl<F: Float> IntoIterator for Catalog<F> {
    type Item = Detection<F>;

    type IntoIter = std::vec::IntoIter<Detection<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.into_iter()
    }
}

impl<'a, F: Float> IntoIterator for &'a Catalog<F> {
    type Item = &'a Detection<F>;

    type IntoIter = std::slice::Iter<'a, Detection<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

/// Trimmed rows that are neither blank nor comments, with their 1-based line numbers.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// First comma, semicolon or tab outside quotes in the first data row.
/// `None` means the table is separated by whitespace.
fn sniff_delimiter(text: &str) -> Option<u8> {
    let (_, row) = data_lines(text).next()?;
    let mut quoted = false;
    row.bytes().find(|&b| {
        if b == b'"' {
            quoted = !quoted;
        }
        !quoted && matches!(b, b',' | b';' | b'\t')
    })
}

/// Read the configured columns of one row. Empty cells count as missing.
fn parse_row<F: Float>(
    fields: &[&str],
    line: usize,
    columns: ColumnLayout,
) -> Result<Detection<F>> {
    let field = |column: usize| -> Result<F> {
        let raw = fields
            .get(column)
            .copied()
            .filter(|f| !f.is_empty())
            .ok_or(Error::MissingField { line, column })?;
        parse_field(raw, line, column)
    };

    Ok(Detection::new(
        field(columns.x)?,
        field(columns.y)?,
        field(columns.magnitude)?,
    ))
}

fn parse_field<F: Float>(raw: &str, line: usize, column: usize) -> Result<F> {
    let value: f64 = raw.parse().map_err(|_| Error::Parse {
        line,
        column,
        message: format!("`{raw}` is not a number"),
    })?;
    if !value.is_finite() {
        return Err(Error::Parse {
            line,
            column,
            message: format!("`{raw}` is not finite"),
        });
    }
    F::from_f64(value).ok_or_else(|| Error::Parse {
        line,
        column,
        message: format!("`{raw}` is out of range"),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn comma_separated() {
        let table = "1,10.5,20.25,21.3\n2,11,22,19.75\n";
        let catalog: Catalog<f64> =
            Catalog::from_reader(table.as_bytes(), ColumnLayout::default()).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0], Detection::new(10.5, 20.25, 21.3));
        assert_eq!(catalog[1], Detection::new(11., 22., 19.75));
    }

    #[test]
    fn whitespace_comments_and_blank_lines() {
        let table = "# id x y mag\n\n  7   1.0  2.0   3.0\n8 4.0\t5.0  6.0\n";
        let catalog: Catalog<f32> =
            Catalog::from_reader(table.as_bytes(), ColumnLayout::default()).unwrap();

        assert_eq!(catalog.magnitudes(), vec![3., 6.]);
        assert_eq!(catalog[1].x(), 4.);
        assert_eq!(catalog[1].y(), 5.);
    }

    #[test]
    fn tab_separated() {
        let table = "# id\tx\ty\tmag\n1\t4.0\t5.0\t6.0\n\n2\t 7.5 \t8.5\t9.5\n";
        let catalog: Catalog<f64> =
            Catalog::from_reader(table.as_bytes(), ColumnLayout::default()).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[1], Detection::new(7.5, 8.5, 9.5));
    }

    #[test]
    fn quoted_cells() {
        let table = "\"1\",\"10.5\",\"20.25\",\"21.3\"\n\"star, bright\",\"11\",\"22\",\"19.75\"\n";
        let catalog: Catalog<f64> =
            Catalog::from_reader(table.as_bytes(), ColumnLayout::default()).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0], Detection::new(10.5, 20.25, 21.3));
        assert_eq!(catalog[1], Detection::new(11., 22., 19.75));
    }

    #[test]
    fn comma_inside_quotes_is_not_a_delimiter() {
        let table = "\"NGC 1, a\";1;2;3\n\"NGC 1, b\";4;5;6\n";
        let catalog: Catalog<f64> =
            Catalog::from_reader(table.as_bytes(), ColumnLayout::default()).unwrap();

        assert_eq!(catalog.magnitudes(), vec![3., 6.]);
    }

    #[test]
    fn line_numbers_count_comments() {
        let table = "# header\n1,1,1,20\n\n  # indented comment\n2,1,x,20\n";
        let err = Catalog::<f64>::from_reader(table.as_bytes(), ColumnLayout::default())
            .unwrap_err();

        assert!(matches!(err, Error::Parse { line: 5, column: 2, .. }));
    }

    #[test]
    fn custom_layout() {
        let table = "19.5 100 200\n";
        let catalog: Catalog<f64> =
            Catalog::from_reader(table.as_bytes(), ColumnLayout::new(1, 2, 0)).unwrap();

        assert_eq!(catalog[0], Detection::new(100., 200., 19.5));
    }

    #[test]
    fn missing_field() {
        let table = "1,1,1,20\n2,1,,20\n";
        let err = Catalog::<f64>::from_reader(table.as_bytes(), ColumnLayout::default())
            .unwrap_err();

        assert!(matches!(err, Error::MissingField { line: 2, column: 2 }));
    }

    #[test]
    fn short_row() {
        let table = "1 2 3\n";
        let err = Catalog::<f64>::from_reader(table.as_bytes(), ColumnLayout::default())
            .unwrap_err();

        assert!(matches!(err, Error::MissingField { line: 1, column: 3 }));
    }

    #[test]
    fn non_numeric_field() {
        let table = "1 2 3 4\n1 2 three 4\n";
        let err = Catalog::<f64>::from_reader(table.as_bytes(), ColumnLayout::default())
            .unwrap_err();

        assert!(matches!(err, Error::Parse { line: 2, column: 2, .. }));
    }

    #[test]
    fn non_finite_field() {
        let table = "1 2 3 NaN\n";
        let err = Catalog::<f64>::from_reader(table.as_bytes(), ColumnLayout::default())
            .unwrap_err();

        assert!(matches!(err, Error::Parse { line: 1, column: 3, .. }));
    }

    #[test]
    fn empty_table() {
        let catalog: Catalog<f64> =
            Catalog::from_reader("# nothing here\n".as_bytes(), ColumnLayout::default()).unwrap();

        assert!(catalog.is_empty());
        assert_eq!(catalog.positions().shape(), &[0, 2]);
    }

    #[test]
    fn from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1;5.0;6.0;25.1").unwrap();
        writeln!(file, "2;7.0;8.0;24.9").unwrap();

        let catalog: Catalog<f64> =
            Catalog::from_path(file.path(), ColumnLayout::default()).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.positions(), ndarray::array![[5., 6.], [7., 8.]]);
    }

    #[test]
    fn unreadable_path() {
        let err = Catalog::<f64>::from_path("/nonexistent/catalog.csv", ColumnLayout::default())
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }
}
