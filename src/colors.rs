//! Color table — name ↔ RGB mapping loaded once at startup.
//!
//! The table backs the "nearest color name" readout next to the custom color
//! field: type an RGB triple and the closest named color from
//! `assets/colormap.csv` is shown.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One `r,g,b,name` row from the color map file. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorEntry {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub name: String,
}

#[derive(Debug)]
pub enum ColorTableError {
    Io(std::io::Error),
}

impl fmt::Display for ColorTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorTableError::Io(e) => write!(f, "color table I/O error: {}", e),
        }
    }
}

impl From<std::io::Error> for ColorTableError {
    fn from(e: std::io::Error) -> Self {
        ColorTableError::Io(e)
    }
}

/// Ordered list of color entries. File order is load-bearing: nearest-name
/// ties resolve to the earliest entry.
pub struct ColorTable {
    entries: Vec<ColorEntry>,
}

impl ColorTable {
    /// Parse a color map file. Each non-empty line is `r,g,b,name` with the
    /// name whitespace-trimmed; lines with fewer than four fields are skipped
    /// silently. Opening the file is the only fallible step — the caller
    /// decides whether that is fatal (it is, at startup).
    pub fn load(path: &Path) -> Result<Self, ColorTableError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if let Some(entry) = parse_entry(&line) {
                entries.push(entry);
            }
        }
        Ok(Self { entries })
    }

    /// Build a table directly from entries. Used by tests and the CLI.
    pub fn from_entries(entries: Vec<ColorEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the entry minimizing Euclidean RGB distance to the query.
    /// Strict `<` keeps the first entry in file order on ties. An empty
    /// table yields `None` — never an out-of-bounds index.
    pub fn nearest_name(&self, r: u8, g: u8, b: u8) -> Option<&str> {
        let mut best: Option<&ColorEntry> = None;
        let mut best_dist = u32::MAX;

        for entry in &self.entries {
            let dr = entry.r as i32 - r as i32;
            let dg = entry.g as i32 - g as i32;
            let db = entry.b as i32 - b as i32;
            // Squared distance orders identically to the Euclidean one.
            let dist = (dr * dr + dg * dg + db * db) as u32;
            if dist < best_dist {
                best_dist = dist;
                best = Some(entry);
            }
        }
        best.map(|e| e.name.as_str())
    }
}

fn parse_entry(line: &str) -> Option<ColorEntry> {
    let mut fields = line.splitn(4, ',');
    let r = fields.next()?.trim().parse::<u8>().ok()?;
    let g = fields.next()?.trim().parse::<u8>().ok()?;
    let b = fields.next()?.trim().parse::<u8>().ok()?;
    let name = fields.next()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(ColorEntry {
        r,
        g,
        b,
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(rows: &[(u8, u8, u8, &str)]) -> ColorTable {
        ColorTable::from_entries(
            rows.iter()
                .map(|&(r, g, b, name)| ColorEntry {
                    r,
                    g,
                    b,
                    name: name.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn nearest_name_black_white_scenario() {
        let t = table(&[(0, 0, 0, "Black"), (255, 255, 255, "White")]);
        assert_eq!(t.nearest_name(10, 10, 10), Some("Black"));
        assert_eq!(t.nearest_name(245, 245, 245), Some("White"));
    }

    #[test]
    fn exact_match_wins_with_distance_zero() {
        let t = table(&[(0, 0, 0, "Black"), (255, 0, 0, "Red")]);
        assert_eq!(t.nearest_name(0, 0, 0), Some("Black"));
        assert_eq!(t.nearest_name(255, 0, 0), Some("Red"));
    }

    #[test]
    fn ties_resolve_to_first_entry_in_file_order() {
        // Both entries are distance 10 from the query.
        let t = table(&[(10, 0, 0, "First"), (30, 0, 0, "Second")]);
        assert_eq!(t.nearest_name(20, 0, 0), Some("First"));
    }

    #[test]
    fn duplicates_are_kept_and_first_wins() {
        let t = table(&[(5, 5, 5, "Early"), (5, 5, 5, "Late")]);
        assert_eq!(t.nearest_name(5, 5, 5), Some("Early"));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn empty_table_returns_none() {
        let t = ColorTable::from_entries(Vec::new());
        assert_eq!(t.nearest_name(1, 2, 3), None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        assert!(parse_entry("255,0").is_none());
        assert!(parse_entry("").is_none());
        assert!(parse_entry("a,b,c,d").is_none());
        assert!(parse_entry("300,0,0,TooBig").is_none());
        assert!(parse_entry("1,2,3,").is_none());
    }

    #[test]
    fn names_are_trimmed_and_may_contain_commas_free_text() {
        let entry = parse_entry("46,139,87, Sea Green \t").unwrap();
        assert_eq!(entry.name, "Sea Green");
        // Only the first three commas delimit; the name keeps the rest.
        let entry = parse_entry("1,2,3,Dusk, pale").unwrap();
        assert_eq!(entry.name, "Dusk, pale");
    }

    #[test]
    fn load_reads_file_in_order_and_skips_bad_rows() {
        let path = std::env::temp_dir().join("retropaint_colormap_test.csv");
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "0,0,0,Black").unwrap();
            writeln!(f, "garbage line").unwrap();
            writeln!(f, "255,255,255,White").unwrap();
        }
        let t = ColorTable::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(t.len(), 2);
        assert_eq!(t.nearest_name(1, 1, 1), Some("Black"));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("retropaint_no_such_colormap.csv");
        assert!(ColorTable::load(&path).is_err());
    }
}
