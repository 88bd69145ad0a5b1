//! In-memory data service
//!
//! Emulates the hosted database closely enough to drive the HTTP layer in
//! tests: rows per table, the two stored procedures, a log of every call in
//! arrival order, injectable failures and simulated concurrent writers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};

use crate::models::{Record, EYE_MEASUREMENT_FIELDS};

use super::errors::{DataResult, DataServiceError};
use super::{DataFuture, DataService, Filter, Table, ADD_PRESCRIPTION_FN, LIST_PRESCRIPTION_IDS_FN};

/// A call received by the in-memory service
#[derive(Debug, Clone, PartialEq)]
pub enum DataCall {
    ListPrescriptionIds { patient_id: String },
    ReadOne { table: Table, filter: Filter },
    UpdateWhere { table: Table, filters: Vec<Filter>, fields: Record },
    AddPrescription { params: Record },
}

/// Where an injected failure fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Read(Table),
    Update(Table),
    Rpc(&'static str),
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Record>>,
    next_id: u64,
    calls: Vec<DataCall>,
    faults: HashMap<FaultPoint, DataServiceError>,
    interfering_writes: VecDeque<(Table, Filter, Record)>,
}

/// Data service held entirely in process memory
#[derive(Default)]
pub struct InMemoryDataService {
    state: Mutex<MemoryState>,
}

impl InMemoryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the rows from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a row; `row` must be a JSON object
    pub fn insert(&self, table: Table, row: Value) {
        if let Value::Object(record) = row {
            self.state().tables.entry(table).or_default().push(record);
        }
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_row(self, table: Table, row: Value) -> Self {
        self.insert(table, row);
        self
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: Table) -> Vec<Record> {
        self.state().tables.get(&table).cloned().unwrap_or_default()
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<DataCall> {
        self.state().calls.clone()
    }

    /// Make every call at `point` fail with `error`
    pub fn fail(&self, point: FaultPoint, error: DataServiceError) {
        self.state().faults.insert(point, error);
    }

    /// Apply `fields` to rows matching `filter` right before the next update
    /// of `table`, as if another client had written first.
    pub fn interfere_before_update(&self, table: Table, filter: Filter, fields: Value) {
        if let Value::Object(fields) = fields {
            self.state()
                .interfering_writes
                .push_back((table, filter, fields));
        }
    }

    fn check_fault(state: &MemoryState, point: FaultPoint) -> DataResult<()> {
        match state.faults.get(&point) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn apply_fields(rows: &mut [Record], filters: &[Filter], fields: &Record) -> u64 {
    let mut changed = 0;
    for row in rows.iter_mut() {
        if filters.iter().all(|f| f.matches(row)) {
            for (key, value) in fields {
                row.insert(key.clone(), value.clone());
            }
            changed += 1;
        }
    }
    changed
}

fn eye_row(id: u64, params: &Record, prefix: &str) -> Record {
    let mut row = Record::new();
    row.insert("id".to_string(), json!(id));
    for field in EYE_MEASUREMENT_FIELDS {
        let value = params
            .get(&format!("{}{}", prefix, field))
            .cloned()
            .unwrap_or(Value::Null);
        row.insert(field.to_string(), value);
    }
    row
}

fn param(params: &Record, key: &str) -> Value {
    params.get(key).cloned().unwrap_or(Value::Null)
}

impl DataService for InMemoryDataService {
    fn list_prescription_ids<'a>(&'a self, patient_id: &'a str) -> DataFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let mut state = self.state();
            state.calls.push(DataCall::ListPrescriptionIds {
                patient_id: patient_id.to_string(),
            });
            Self::check_fault(&state, FaultPoint::Rpc(LIST_PRESCRIPTION_IDS_FN))?;

            let by_patient = Filter::eq("p_id", patient_id);
            Ok(state
                .tables
                .get(&Table::Prescription)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| by_patient.matches(row))
                        .filter_map(|row| row.get("id").cloned())
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn read_one<'a>(&'a self, table: Table, filter: &'a Filter) -> DataFuture<'a, Option<Record>> {
        Box::pin(async move {
            let mut state = self.state();
            state.calls.push(DataCall::ReadOne {
                table,
                filter: filter.clone(),
            });
            Self::check_fault(&state, FaultPoint::Read(table))?;

            let mut found: Vec<Record> = state
                .tables
                .get(&table)
                .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
                .unwrap_or_default();

            match found.len() {
                0 => Ok(None),
                1 => Ok(found.pop()),
                n => Err(DataServiceError::api(
                    406,
                    Some("PGRST116".to_string()),
                    format!("expected a single row from '{}', found {}", table, n),
                )),
            }
        })
    }

    fn update_where<'a>(
        &'a self,
        table: Table,
        filters: &'a [Filter],
        fields: &'a Record,
    ) -> DataFuture<'a, u64> {
        Box::pin(async move {
            let mut state = self.state();
            state.calls.push(DataCall::UpdateWhere {
                table,
                filters: filters.to_vec(),
                fields: fields.clone(),
            });
            Self::check_fault(&state, FaultPoint::Update(table))?;

            let interference = state
                .interfering_writes
                .iter()
                .position(|(t, _, _)| *t == table)
                .and_then(|i| state.interfering_writes.remove(i));
            if let Some((_, filter, other_fields)) = interference {
                let rows = state.tables.entry(table).or_default();
                apply_fields(rows, std::slice::from_ref(&filter), &other_fields);
            }

            let rows = state.tables.entry(table).or_default();
            Ok(apply_fields(rows, filters, fields))
        })
    }

    fn add_prescription<'a>(&'a self, params: &'a Record) -> DataFuture<'a, Value> {
        Box::pin(async move {
            let mut state = self.state();
            state.calls.push(DataCall::AddPrescription {
                params: params.clone(),
            });
            Self::check_fault(&state, FaultPoint::Rpc(ADD_PRESCRIPTION_FN))?;

            state.next_id += 1;
            let id = state.next_id;

            let left = eye_row(id, params, "l_");
            let right = eye_row(id, params, "r_");
            let prescription = json!({
                "id": id,
                "p_id": param(params, "p_id"),
                "d_id": param(params, "d_id"),
                "ipd": param(params, "p_ipd"),
                "remarks": param(params, "p_remarks"),
                "bifocal": param(params, "p_bifocal"),
                "colour": param(params, "p_colour"),
                "left_eye_id": id,
                "right_eye_id": id,
            });

            state.tables.entry(Table::LeftEye).or_default().push(left);
            state.tables.entry(Table::RightEye).or_default().push(right);
            if let Value::Object(row) = prescription {
                state.tables.entry(Table::Prescription).or_default().push(row);
            }
            Ok(json!(id))
        })
    }
}
