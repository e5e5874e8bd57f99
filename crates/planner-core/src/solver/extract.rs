//! Locates the `{"timetable": [...]}` payload in raw solver output and maps
//! it to [`ScheduleEntry`] records.
//!
//! The payload may be surrounded by arbitrary diagnostics. The span from the
//! first `{` to the last `}` is tried first; when that span is not valid JSON
//! (stray braces in log lines, for example) each `{` is tried in turn as the
//! start of a single JSON value, and the first object carrying `timetable`
//! wins.

use serde_json::{Map, Value};

use crate::error::ExtractionError;
use crate::types::{ScheduleEntry, ScheduleKind};

type Object = Map<String, Value>;

pub fn extract(kind: ScheduleKind, output: &str) -> Result<Vec<ScheduleEntry>, ExtractionError> {
    let payload = locate_payload(output)?;

    if payload.get("status").and_then(Value::as_str) == Some("INFEASIBLE") {
        return Err(ExtractionError::Infeasible);
    }

    let timetable = payload
        .get("timetable")
        .and_then(Value::as_array)
        .ok_or(ExtractionError::MissingTimetable)?;

    timetable
        .iter()
        .enumerate()
        .map(|(index, element)| {
            let record = Record::new(index, element)?;
            match kind {
                ScheduleKind::Regular => record.regular(),
                ScheduleKind::Exam => record.exam(),
            }
        })
        .collect()
}

fn locate_payload(output: &str) -> Result<Object, ExtractionError> {
    let (Some(first), Some(last)) = (output.find('{'), output.rfind('}')) else {
        return Err(ExtractionError::NoPayload);
    };
    if last < first {
        return Err(ExtractionError::NoPayload);
    }

    let greedy_err = match serde_json::from_str::<Value>(&output[first..=last]) {
        Ok(Value::Object(obj)) => return Ok(obj),
        Ok(_) => return Err(ExtractionError::MissingTimetable),
        Err(e) => e,
    };

    output
        .match_indices('{')
        .find_map(|(start, _)| {
            let mut values = serde_json::Deserializer::from_str(&output[start..]).into_iter::<Value>();
            match values.next() {
                Some(Ok(Value::Object(obj))) if obj.contains_key("timetable") => Some(obj),
                _ => None,
            }
        })
        .ok_or_else(|| ExtractionError::MalformedPayload(greedy_err.to_string()))
}

// ---------------------------------------------------------------------------
// Record mapping
// ---------------------------------------------------------------------------

struct Record<'a> {
    index: usize,
    obj: &'a Object,
}

impl<'a> Record<'a> {
    fn new(index: usize, element: &'a Value) -> Result<Self, ExtractionError> {
        element
            .as_object()
            .map(|obj| Self { index, obj })
            .ok_or(ExtractionError::InvalidRecord {
                index,
                field: "timetable",
            })
    }

    fn invalid(&self, field: &'static str) -> ExtractionError {
        ExtractionError::InvalidRecord {
            index: self.index,
            field,
        }
    }

    fn string(&self, field: &'static str) -> Result<String, ExtractionError> {
        self.obj
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.invalid(field))
    }

    fn count(&self, field: &'static str) -> Result<u32, ExtractionError> {
        self.obj
            .get(field)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| self.invalid(field))
    }

    fn flag(&self, field: &'static str) -> Result<bool, ExtractionError> {
        self.obj
            .get(field)
            .and_then(Value::as_bool)
            .ok_or_else(|| self.invalid(field))
    }

    /// Exam entries list their halls; a lone `hall` string is one hall.
    fn halls(&self) -> Result<String, ExtractionError> {
        match self.obj.get("halls") {
            Some(Value::Array(items)) => {
                let names = items
                    .iter()
                    .map(|v| v.as_str().ok_or_else(|| self.invalid("halls")))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names.join(", "))
            }
            Some(_) => Err(self.invalid("halls")),
            None => self.string("hall").map_err(|_| self.invalid("halls")),
        }
    }

    fn regular(&self) -> Result<ScheduleEntry, ExtractionError> {
        Ok(ScheduleEntry {
            code: self.string("code")?,
            day: self.string("day")?,
            hall: self.string("hall")?,
            slot: self.count("slot")?,
            duration: Some(self.count("duration")?),
            students: self.count("students")?,
            department: self.string("department")?,
            semester: self.count("semester")?,
            is_common: self.flag("iscommon")?,
            name: None,
        })
    }

    fn exam(&self) -> Result<ScheduleEntry, ExtractionError> {
        let name = match self.obj.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(self.invalid("name")),
        };
        Ok(ScheduleEntry {
            code: self.string("code")?,
            day: self.string("day")?,
            hall: self.halls()?,
            slot: self.count("slot")?,
            duration: None,
            students: self.count("students")?,
            department: self.string("department")?,
            semester: self.count("semester")?,
            is_common: self.flag("iscommon")?,
            name,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
