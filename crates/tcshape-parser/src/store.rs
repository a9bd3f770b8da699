//! In-memory table-per-kind store for parsed rows.
//!
//! Each kind gets its own table, created on the first insert of at least
//! one row. Querying a kind that has no table yet returns
//! [`TcShapeError::TableNotFound`], which callers treat as "no data".

use std::collections::HashMap;

use tcshape_common::{TcShapeError, TcShapeResult};
use tcshape_types::TcObjectKind;

use crate::record::{ClassRecord, FilterRecord, QdiscRecord};

/// Rows of one kind, indexed by device name.
#[derive(Debug, Clone)]
pub struct Table<T> {
    rows: HashMap<String, Vec<T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<T: StoredRecord> Table<T> {
    /// Returns the rows stored for `device` (empty if none).
    pub fn select(&self, device: &str) -> &[T] {
        self.rows.get(device).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of rows across all devices.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, row: T) -> bool {
        let rows = self.rows.entry(row.device().to_string()).or_default();

        if rows.iter().any(|r| r.duplicates(&row)) {
            tracing::warn!(
                table = T::KIND.as_str(),
                device = %row.device(),
                row = ?row,
                "Duplicate row ignored"
            );
            return false;
        }

        rows.push(row);
        true
    }
}

/// A row type the store can hold.
pub trait StoredRecord: Sized + std::fmt::Debug {
    /// Table this row belongs to.
    const KIND: TcObjectKind;

    /// Device the row was read from.
    fn device(&self) -> &str;

    /// True if `other` repeats the identity of this row on the same device.
    fn duplicates(&self, _other: &Self) -> bool {
        false
    }

    #[doc(hidden)]
    fn table(store: &RecordStore) -> Option<&Table<Self>>;

    #[doc(hidden)]
    fn table_mut(store: &mut RecordStore) -> &mut Option<Table<Self>>;
}

impl StoredRecord for QdiscRecord {
    const KIND: TcObjectKind = TcObjectKind::Qdisc;

    fn device(&self) -> &str {
        &self.device
    }

    fn table(store: &RecordStore) -> Option<&Table<Self>> {
        store.qdiscs.as_ref()
    }

    fn table_mut(store: &mut RecordStore) -> &mut Option<Table<Self>> {
        &mut store.qdiscs
    }
}

impl StoredRecord for ClassRecord {
    const KIND: TcObjectKind = TcObjectKind::Class;

    fn device(&self) -> &str {
        &self.device
    }

    fn table(store: &RecordStore) -> Option<&Table<Self>> {
        store.classes.as_ref()
    }

    fn table_mut(store: &mut RecordStore) -> &mut Option<Table<Self>> {
        &mut store.classes
    }
}

impl StoredRecord for FilterRecord {
    const KIND: TcObjectKind = TcObjectKind::Filter;

    fn device(&self) -> &str {
        &self.device
    }

    /// Filter ids are allocated per parent qdisc, so only the
    /// `(parent, filter_id)` pair identifies a filter.
    fn duplicates(&self, other: &Self) -> bool {
        self.filter_id.is_some() && self.filter_id == other.filter_id && self.parent == other.parent
    }

    fn table(store: &RecordStore) -> Option<&Table<Self>> {
        store.filters.as_ref()
    }

    fn table_mut(store: &mut RecordStore) -> &mut Option<Table<Self>> {
        &mut store.filters
    }
}

/// Holds the qdisc, class and filter tables.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    qdiscs: Option<Table<QdiscRecord>>,
    classes: Option<Table<ClassRecord>>,
    filters: Option<Table<FilterRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts rows, creating the table if needed.
    ///
    /// Returns the number of rows actually stored; a filter repeating the
    /// parent and filter id of one already stored for the device is dropped.
    pub fn insert<T: StoredRecord>(&mut self, rows: Vec<T>) -> usize {
        if rows.is_empty() {
            return 0;
        }

        let table = T::table_mut(self).get_or_insert_with(Table::default);
        let mut stored = 0;
        for row in rows {
            if table.insert(row) {
                stored += 1;
            }
        }
        stored
    }

    /// Returns the rows of kind `T` stored for `device`.
    ///
    /// # Errors
    ///
    /// [`TcShapeError::TableNotFound`] if no row of this kind was ever stored.
    pub fn select<T: StoredRecord>(&self, device: &str) -> TcShapeResult<&[T]> {
        T::table(self)
            .map(|table| table.select(device))
            .ok_or_else(|| TcShapeError::table_not_found(T::KIND.as_str()))
    }

    /// Like [`select`](Self::select), with a missing table read as no rows.
    pub fn select_or_empty<T: StoredRecord>(&self, device: &str) -> &[T] {
        match self.select(device) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::debug!(device = %device, "{}", e);
                &[]
            }
        }
    }

    /// Returns true if a table exists for `kind`.
    pub fn has_table(&self, kind: TcObjectKind) -> bool {
        match kind {
            TcObjectKind::Qdisc => self.qdiscs.is_some(),
            TcObjectKind::Class => self.classes.is_some(),
            TcObjectKind::Filter => self.filters.is_some(),
        }
    }

    /// Drops every table.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
