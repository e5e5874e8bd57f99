//! Spreadsheet ingestion: turns an uploaded workbook into a validated
//! [`DatasetSnapshot`] or a [`ValidationError`], without touching the store.
//!
//! # Layout
//!
//! Sheet `module codes` (row 0 is a header):
//! ```text
//! col 1 semester | col 2 module code | col 3 duration | col 4 is common
//! col 5 department | col 6 students
//! ```
//! Sheet `halls` (row 0 is a header):
//! ```text
//! col 2 hall code (row skipped when empty) | col 4 room name | col 7 capacity
//! ```
//! Rows whose module code / hall code is blank are skipped. Sheet names are
//! matched case-insensitively.

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};

use crate::error::{Result, ValidationError};
use crate::paths;
use crate::types::{DatasetSnapshot, Hall, Module, ScheduleKind};

pub const MODULE_SHEET: &str = "module codes";
pub const HALL_SHEET: &str = "halls";

const ACCEPTED_EXTENSIONS: &[&str] = &["xls", "xlsx"];

mod module_col {
    pub const SEMESTER: u32 = 1;
    pub const CODE: u32 = 2;
    pub const DURATION: u32 = 3;
    pub const IS_COMMON: u32 = 4;
    pub const DEPARTMENT: u32 = 5;
    pub const STUDENTS: u32 = 6;
}

mod hall_col {
    pub const CODE: u32 = 2;
    pub const ROOM_NAME: u32 = 4;
    pub const CAPACITY: u32 = 7;
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// A workbook as received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name, bytes }
    }

    /// Check emptiness, extension, then content, in that order.
    pub fn validate(&self) -> std::result::Result<DatasetSnapshot, ValidationError> {
        if self.bytes.is_empty() {
            return Err(ValidationError::EmptyFile);
        }
        check_file_name(self.file_name.as_deref())?;
        parse_workbook(&self.bytes)
    }

    /// Store the raw workbook under `.planner/uploads/<kind>/`. Only the final
    /// component of the client-supplied name is used.
    pub fn archive(&self, root: &Path, kind: ScheduleKind) -> Result<PathBuf> {
        let name = self
            .file_name
            .as_deref()
            .and_then(archive_file_name)
            .ok_or(ValidationError::InvalidFileType)?;
        let path = paths::uploads_dir(root, kind).join(name);
        crate::io::atomic_write(&path, &self.bytes)?;
        Ok(path)
    }
}

fn archive_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}

pub fn check_file_name(name: Option<&str>) -> std::result::Result<(), ValidationError> {
    let accepted = name
        .and_then(|n| Path::new(n).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|ok| ext.eq_ignore_ascii_case(ok))
        })
        .unwrap_or(false);
    if accepted {
        Ok(())
    } else {
        Err(ValidationError::InvalidFileType)
    }
}

// ---------------------------------------------------------------------------
// Workbook parsing
// ---------------------------------------------------------------------------

pub fn parse_workbook(bytes: &[u8]) -> std::result::Result<DatasetSnapshot, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| {
        ValidationError::InvalidContent {
            detail: e.to_string(),
        }
    })?;

    let names = workbook.sheet_names();
    let find = |wanted: &str| {
        names
            .iter()
            .find(|n| n.trim().eq_ignore_ascii_case(wanted))
            .cloned()
    };
    let module_sheet = find(MODULE_SHEET);
    let hall_sheet = find(HALL_SHEET);

    let (module_sheet, hall_sheet) = match (module_sheet, hall_sheet) {
        (Some(m), Some(h)) => (m, h),
        (m, h) => {
            let mut missing = Vec::new();
            if m.is_none() {
                missing.push(MODULE_SHEET.to_string());
            }
            if h.is_none() {
                missing.push(HALL_SHEET.to_string());
            }
            return Err(ValidationError::MissingSheets(missing));
        }
    };

    let module_range = sheet_range(&mut workbook, &module_sheet)?;
    let hall_range = sheet_range(&mut workbook, &hall_sheet)?;

    Ok(DatasetSnapshot {
        modules: parse_modules(&module_range)?,
        halls: parse_halls(&hall_range)?,
    })
}

fn sheet_range<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    name: &str,
) -> std::result::Result<Range<Data>, ValidationError> {
    workbook
        .worksheet_range(name)
        .map_err(|e| ValidationError::InvalidContent {
            detail: format!("sheet '{name}': {e}"),
        })
}

fn data_rows(range: &Range<Data>) -> std::ops::RangeInclusive<u32> {
    match range.end() {
        Some((last, _)) => 1..=last,
        #[allow(clippy::reversed_empty_ranges)]
        None => 1..=0,
    }
}

fn parse_modules(range: &Range<Data>) -> std::result::Result<Vec<Module>, ValidationError> {
    let mut modules = Vec::new();
    let mut seen = HashSet::new();

    for row in data_rows(range) {
        let cells = RowCells {
            range,
            sheet: MODULE_SHEET,
            row,
        };
        let module_code = cells.text(module_col::CODE);
        if module_code.is_empty() {
            continue;
        }
        if !seen.insert(module_code.clone()) {
            return Err(ValidationError::DuplicateModule(module_code));
        }

        modules.push(Module {
            semester: cells.positive(module_col::SEMESTER, "semester")?,
            duration: cells.positive(module_col::DURATION, "duration")?,
            is_common: cells.flag(module_col::IS_COMMON),
            department: cells.text(module_col::DEPARTMENT),
            students: cells.non_negative(module_col::STUDENTS, "students")?,
            module_code,
        });
    }

    Ok(modules)
}

fn parse_halls(range: &Range<Data>) -> std::result::Result<Vec<Hall>, ValidationError> {
    let mut halls = Vec::new();

    for row in data_rows(range) {
        let cells = RowCells {
            range,
            sheet: HALL_SHEET,
            row,
        };
        if cells.text(hall_col::CODE).is_empty() {
            continue;
        }
        let room_name = cells.text(hall_col::ROOM_NAME);
        if room_name.is_empty() {
            return Err(cells.invalid("missing room name"));
        }
        halls.push(Hall {
            room_name,
            capacity: cells.non_negative(hall_col::CAPACITY, "capacity")?,
        });
    }

    Ok(halls)
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

struct RowCells<'a> {
    range: &'a Range<Data>,
    sheet: &'static str,
    /// Absolute, zero-based row index.
    row: u32,
}

impl RowCells<'_> {
    fn get(&self, col: u32) -> Option<&Data> {
        self.range.get_value((self.row, col))
    }

    fn invalid(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::InvalidRow {
            sheet: self.sheet.to_string(),
            row: self.row as usize + 1,
            reason: reason.into(),
        }
    }

    /// Strings are trimmed; numbers render as integers; booleans as `true`/`false`.
    fn text(&self, col: u32) -> String {
        match self.get(col) {
            Some(Data::String(s)) => s.trim().to_string(),
            Some(Data::Int(i)) => i.to_string(),
            Some(Data::Float(f)) => (f.trunc() as i64).to_string(),
            Some(Data::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    fn number(&self, col: u32, field: &str) -> std::result::Result<i64, ValidationError> {
        let value = match self.get(col) {
            Some(Data::Int(i)) => Some(*i),
            Some(Data::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
            Some(Data::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
            _ => None,
        };
        value.ok_or_else(|| self.invalid(format!("{field} is missing or not a number")))
    }

    fn positive(&self, col: u32, field: &str) -> std::result::Result<u32, ValidationError> {
        let n = self.number(col, field)?;
        u32::try_from(n)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| self.invalid(format!("{field} must be a positive integer, got {n}")))
    }

    fn non_negative(&self, col: u32, field: &str) -> std::result::Result<u32, ValidationError> {
        let n = self.number(col, field)?;
        u32::try_from(n)
            .map_err(|_| self.invalid(format!("{field} must be a non-negative integer, got {n}")))
    }

    fn flag(&self, col: u32) -> bool {
        match self.get(col) {
            Some(Data::Bool(b)) => *b,
            Some(Data::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            Some(Data::Int(i)) => *i != 0,
            Some(Data::Float(f)) => *f != 0.0,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{Workbook, Worksheet};
    use tempfile::TempDir;

    #[derive(Clone, Copy)]
    enum Cell<'a> {
        S(&'a str),
        N(f64),
        B(bool),
        E,
    }
    use Cell::{B, E, N, S};

    fn fill(ws: &mut Worksheet, rows: &[Vec<Cell>]) {
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match *cell {
                    S(s) => {
                        ws.write_string(r, c, s).unwrap();
                    }
                    N(n) => {
                        ws.write_number(r, c, n).unwrap();
                    }
                    B(b) => {
                        ws.write_boolean(r, c, b).unwrap();
                    }
                    E => {}
                }
            }
        }
    }

    fn module_header() -> Vec<Cell<'static>> {
        vec![
            S("id"),
            S("semester"),
            S("module_code"),
            S("duration"),
            S("iscommon"),
            S("department"),
            S("no_of_students"),
        ]
    }

    fn hall_header() -> Vec<Cell<'static>> {
        vec![
            S("id"),
            S("block"),
            S("hall_code"),
            S("floor"),
            S("room_name"),
            S("type"),
            S("projector"),
            S("capacity"),
        ]
    }

    fn hall_row<'a>(code: &'a str, name: &'a str, capacity: f64) -> Vec<Cell<'a>> {
        vec![E, E, S(code), E, S(name), E, E, N(capacity)]
    }

    fn workbook(sheets: &[(&str, Vec<Vec<Cell>>)]) -> Vec<u8> {
        let mut wb = Workbook::new();
        for (name, rows) in sheets {
            let ws = wb.add_worksheet();
            ws.set_name(*name).unwrap();
            fill(ws, rows);
        }
        wb.save_to_buffer().unwrap()
    }

    fn standard_workbook(module_rows: Vec<Vec<Cell>>) -> Vec<u8> {
        let mut modules = vec![module_header()];
        modules.extend(module_rows);
        workbook(&[
            ("module codes", modules),
            (
                "halls",
                vec![hall_header(), hall_row("H1", "LT1", 200.0), hall_row("H2", "LT2", 80.0)],
            ),
        ])
    }

    #[test]
    fn parses_module_row() {
        let bytes = standard_workbook(vec![vec![
            S(""),
            N(5.0),
            S("CS3203"),
            N(2.0),
            B(true),
            S("CS"),
            N(150.0),
        ]]);
        let dataset = parse_workbook(&bytes).unwrap();
        assert_eq!(
            dataset.modules,
            vec![Module {
                module_code: "CS3203".into(),
                semester: 5,
                duration: 2,
                department: "CS".into(),
                is_common: true,
                students: 150,
            }]
        );
        assert_eq!(
            dataset.halls,
            vec![
                Hall {
                    room_name: "LT1".into(),
                    capacity: 200
                },
                Hall {
                    room_name: "LT2".into(),
                    capacity: 80
                },
            ]
        );
    }

    #[test]
    fn skips_rows_without_module_code() {
        let bytes = standard_workbook(vec![
            vec![E, N(5.0), S("CS3203"), N(2.0), B(false), S("CS"), N(150.0)],
            vec![E, N(5.0), S("   "), N(2.0), B(false), S("CS"), N(150.0)],
            vec![E, N(7.0), E, N(3.0), B(false), S("EE"), N(90.0)],
            vec![E, N(3.0), S("EE2101"), N(1.0), S("TRUE"), S(" EE "), N(60.0)],
        ]);
        let dataset = parse_workbook(&bytes).unwrap();
        let codes: Vec<_> = dataset.modules.iter().map(|m| m.module_code.as_str()).collect();
        assert_eq!(codes, vec!["CS3203", "EE2101"]);
        assert!(dataset.modules[1].is_common);
        assert_eq!(dataset.modules[1].department, "EE");
    }

    #[test]
    fn numeric_module_code_is_rendered_as_integer() {
        let bytes = standard_workbook(vec![vec![
            E,
            N(1.0),
            N(1010.0),
            N(1.0),
            E,
            S("MA"),
            N(30.0),
        ]]);
        let dataset = parse_workbook(&bytes).unwrap();
        assert_eq!(dataset.modules[0].module_code, "1010");
        assert!(!dataset.modules[0].is_common);
    }

    #[test]
    fn header_only_sheets_yield_empty_dataset() {
        let bytes = workbook(&[
            ("module codes", vec![module_header()]),
            ("halls", vec![hall_header()]),
        ]);
        let dataset = parse_workbook(&bytes).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn missing_halls_sheet_is_named() {
        let bytes = workbook(&[("module codes", vec![module_header()])]);
        let err = parse_workbook(&bytes).unwrap_err();
        match err {
            ValidationError::MissingSheets(missing) => assert_eq!(missing, vec!["halls"]),
            other => panic!("expected MissingSheets, got {other:?}"),
        }
    }

    #[test]
    fn missing_both_sheets_lists_both() {
        let bytes = workbook(&[("Sheet1", vec![vec![S("x")]])]);
        let err = parse_workbook(&bytes).unwrap_err();
        assert!(
            matches!(&err, ValidationError::MissingSheets(m) if m.len() == 2),
            "{err:?}"
        );
    }

    #[test]
    fn sheet_names_match_case_insensitively() {
        let bytes = workbook(&[
            ("Module Codes", vec![module_header()]),
            ("HALLS", vec![hall_header(), hall_row("H1", "LT1", 10.0)]),
        ]);
        let dataset = parse_workbook(&bytes).unwrap();
        assert_eq!(dataset.halls.len(), 1);
    }

    #[test]
    fn non_spreadsheet_bytes_are_invalid_content() {
        let err = parse_workbook(b"module_code,semester\nCS3203,5\n").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContent { .. }), "{err:?}");
    }

    #[test]
    fn zero_semester_is_rejected_with_row_number() {
        let bytes = standard_workbook(vec![vec![
            E,
            N(0.0),
            S("CS3203"),
            N(2.0),
            B(false),
            S("CS"),
            N(150.0),
        ]]);
        let err = parse_workbook(&bytes).unwrap_err();
        match err {
            ValidationError::InvalidRow { sheet, row, reason } => {
                assert_eq!(sheet, "module codes");
                assert_eq!(row, 2);
                assert!(reason.contains("semester"), "{reason}");
            }
            other => panic!("expected InvalidRow, got {other:?}"),
        }
    }

    #[test]
    fn missing_student_count_is_rejected() {
        let bytes = standard_workbook(vec![vec![
            E,
            N(5.0),
            S("CS3203"),
            N(2.0),
            B(false),
            S("CS"),
            E,
        ]]);
        let err = parse_workbook(&bytes).unwrap_err();
        assert!(err.to_string().contains("students"), "{err}");
    }

    #[test]
    fn duplicate_module_code_is_rejected() {
        let row = vec![E, N(5.0), S("CS3203"), N(2.0), B(false), S("CS"), N(150.0)];
        let bytes = standard_workbook(vec![row.clone(), row]);
        let err = parse_workbook(&bytes).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateModule(ref c) if c == "CS3203"));
    }

    #[test]
    fn hall_without_room_name_is_rejected() {
        let bytes = workbook(&[
            ("module codes", vec![module_header()]),
            ("halls", vec![hall_header(), vec![E, E, S("H1"), E, E, E, E, N(50.0)]]),
        ]);
        let err = parse_workbook(&bytes).unwrap_err();
        assert!(err.to_string().contains("room name"), "{err}");
    }

    #[test]
    fn upload_checks_empty_then_extension() {
        let empty = Upload::new(Some("data.csv".into()), Vec::new());
        assert!(matches!(empty.validate(), Err(ValidationError::EmptyFile)));

        let csv = Upload::new(Some("data.csv".into()), b"a,b".to_vec());
        assert!(matches!(csv.validate(), Err(ValidationError::InvalidFileType)));

        let unnamed = Upload::new(None, b"a,b".to_vec());
        assert!(matches!(unnamed.validate(), Err(ValidationError::InvalidFileType)));
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(check_file_name(Some("Timetable.XLSX")).is_ok());
        assert!(check_file_name(Some("legacy.xls")).is_ok());
        assert!(check_file_name(Some("notes.xlsx.txt")).is_err());
    }

    #[test]
    fn archive_strips_directories_from_client_name() {
        let dir = TempDir::new().unwrap();
        let upload = Upload::new(Some("../../etc/plan.xlsx".into()), b"bytes".to_vec());
        let path = upload.archive(dir.path(), ScheduleKind::Exam).unwrap();
        assert_eq!(
            path,
            paths::uploads_dir(dir.path(), ScheduleKind::Exam).join("plan.xlsx")
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");

        let windows = Upload::new(Some(r"C:\Users\me\plan.xlsx".into()), b"x".to_vec());
        let path = windows.archive(dir.path(), ScheduleKind::Regular).unwrap();
        assert!(path.ends_with("regular/plan.xlsx"));
    }
}
