//! Copy-on-write record snapshots for one pair.
//!
//! Slots 0 and 1 hold the original master and slave records. The first write
//! to a side appends a clone of its original; later writes mutate that clone.

use fieldsync_types::{Record, Side};

#[derive(Debug, Clone)]
pub struct SnapshotArena {
    records: Vec<Record>,
    current: [usize; 2],
}

const ORIGINALS: usize = 2;

fn slot(side: Side) -> usize {
    match side {
        Side::Master => 0,
        Side::Slave => 1,
    }
}

impl SnapshotArena {
    pub fn new(master: Record, slave: Record) -> Self {
        Self {
            records: vec![master, slave],
            current: [0, 1],
        }
    }

    pub fn original(&self, side: Side) -> &Record {
        &self.records[slot(side)]
    }

    /// The side's latest state: its snapshot if written, else the original.
    pub fn current(&self, side: Side) -> &Record {
        &self.records[self.current[slot(side)]]
    }

    pub fn is_modified(&self, side: Side) -> bool {
        self.current[slot(side)] >= ORIGINALS
    }

    /// The side's snapshot, if it has been written.
    pub fn snapshot(&self, side: Side) -> Option<&Record> {
        self.is_modified(side).then(|| self.current(side))
    }

    /// The side's snapshot for writing, allocated on first use.
    pub fn snapshot_mut(&mut self, side: Side) -> &mut Record {
        if !self.is_modified(side) {
            let copy = self.original(side).clone();
            self.records.push(copy);
            self.current[slot(side)] = self.records.len() - 1;
        }
        let index = self.current[slot(side)];
        &mut self.records[index]
    }

    /// Number of records held, originals included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
