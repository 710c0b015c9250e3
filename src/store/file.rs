//! File store
//!
//! Persistent record store over a flat file of fixed-size slots.
//!
//! ## File Format
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬─────┐
//! │ Slot 0 (278) │ Slot 1 (278) │ Slot 2 (278) │ ... │
//! └──────────────┴──────────────┴──────────────┴─────┘
//! ```
//! No header. The file length is always a multiple of [`SLOT_SIZE`]. A slot's
//! status is the only authority on liveness; deleted slots stay in place
//! until [`FileStore::purge`] compacts the file.
//!
//! ## Ordering
//! Live slots appear in ascending id order. `create` appends `max + 1`,
//! `insert` and `restore` merge new ids into place, and nothing changes an
//! id in place.
//!
//! ## Integrity
//! Every live slot write is read back and compared. On a mismatch the slot is
//! marked deleted and `CabinetError::Integrity` is returned. This catches
//! torn or redirected writes, not silent media corruption: there is no
//! checksum in the slot format.

use std::fs::{File, OpenOptions};
use std::io::SeekFrom;
use std::ops::Range;
use std::path::Path;

use crate::error::{CabinetError, Result};
use crate::index::{IndexManager, SearchField};
use crate::record::codec::{self, SlotStatus, SLOT_SIZE};
use crate::record::{Record, RecordParams};
use crate::snapshot::Snapshot;
use crate::validation::Validator;

use super::memory::next_id;
use super::{partition_snapshot, PurgeStat, RecordStore, RestoreReport, SlotStream, StoreStat};

const SLOT: u64 = SLOT_SIZE as u64;

/// A record id with its encoded live slot
type EncodedSlot = (i32, [u8; SLOT_SIZE]);

fn encode_live(record: &Record) -> Result<EncodedSlot> {
    Ok((record.id, codec::encode(SlotStatus::Live, record)?))
}

/// Record store backed by a slot file
///
/// Index locations are slot byte offsets. The stream is owned exclusively;
/// nothing else may write the file while the store is open.
pub struct FileStore<S: SlotStream = File> {
    stream: S,
    index: IndexManager<u64>,
    validator: Validator,
}

impl FileStore<File> {
    /// Open or create the slot file at `path`
    pub fn open(path: &Path, validator: Validator) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let store = Self::from_stream(file, validator)?;
        tracing::info!(
            "Opened record file {} ({} live records)",
            path.display(),
            store.index.len()
        );
        Ok(store)
    }
}

impl<S: SlotStream> FileStore<S> {
    /// Wrap an already-open stream and index its live slots
    pub fn from_stream(mut stream: S, validator: Validator) -> Result<Self> {
        let len = stream.byte_len()?;
        if len % SLOT != 0 {
            return Err(CabinetError::Storage(format!(
                "File length {} is not a multiple of the {}-byte slot size",
                len, SLOT_SIZE
            )));
        }

        let mut store = Self {
            stream,
            index: IndexManager::new(),
            validator,
        };
        store.reindex_all()?;
        Ok(store)
    }

    /// The live index (for inspection and tests)
    pub fn index(&self) -> &IndexManager<u64> {
        &self.index
    }

    /// An index rebuilt by scanning the file
    pub fn rebuilt_index(&mut self) -> Result<IndexManager<u64>> {
        let live = self.live_slots()?;
        let mut index = IndexManager::new();
        index.reindex_all(live.iter().map(|(offset, record)| (record, *offset)));
        Ok(index)
    }

    /// Replace the live index with one rebuilt from the file
    pub fn reindex_all(&mut self) -> Result<()> {
        self.index = self.rebuilt_index()?;
        Ok(())
    }

    /// Borrow the underlying stream
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Mutably borrow the underlying stream
    ///
    /// Writing through it bypasses the index; call `reindex_all` afterwards.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    // =========================================================================
    // Slot I/O
    // =========================================================================

    fn slot_count(&mut self) -> Result<u64> {
        Ok(self.stream.byte_len()? / SLOT)
    }

    fn read_slot(&mut self, offset: u64) -> Result<[u8; SLOT_SIZE]> {
        let mut slot = [0u8; SLOT_SIZE];
        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.read_exact(&mut slot)?;
        Ok(slot)
    }

    fn read_record(&mut self, offset: u64) -> Result<Record> {
        let slot = self.read_slot(offset)?;
        match codec::decode(&slot)? {
            (SlotStatus::Live, record) => Ok(record),
            (SlotStatus::Deleted, _) => Err(CabinetError::Storage(format!(
                "Index points at deleted slot {}",
                offset
            ))),
        }
    }

    fn write_raw(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    fn write_status(&mut self, offset: u64, status: SlotStatus) -> Result<()> {
        self.write_raw(offset, &status.to_bytes())
    }

    /// Write a slot and read it back; a mismatch marks the slot deleted
    fn write_verified(&mut self, offset: u64, slot: &[u8; SLOT_SIZE]) -> Result<()> {
        self.write_raw(offset, slot)?;

        let written = self.read_slot(offset)?;
        if &written != slot {
            tracing::warn!("Slot at offset {} failed write verification", offset);
            self.write_status(offset, SlotStatus::Deleted)?;
            return Err(CabinetError::Integrity { offset });
        }
        Ok(())
    }

    /// Mark every slot in `range` (slot numbers) deleted
    fn discard_slots(&mut self, range: Range<u64>) -> Result<()> {
        for slot in range {
            self.write_status(slot * SLOT, SlotStatus::Deleted)?;
        }
        Ok(())
    }

    /// Whole file contents, for linear scans
    fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.stream.seek(SeekFrom::Start(0))?;
        self.stream.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// `(offset, record)` of every live slot, in file order
    fn live_slots(&mut self) -> Result<Vec<(u64, Record)>> {
        let bytes = self.read_all()?;
        let mut live = Vec::new();

        for (i, chunk) in bytes.chunks_exact(SLOT_SIZE).enumerate() {
            if codec::read_status(chunk)? == SlotStatus::Live {
                let (_, record) = codec::decode(chunk)?;
                live.push((i as u64 * SLOT, record));
            }
        }
        Ok(live)
    }

    /// On failure, rebuild the index from the file so it never drifts from
    /// what is actually stored
    fn resync<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            if let Err(e) = self.reindex_all() {
                tracing::error!("Failed to rebuild index after error: {}", e);
            }
        }
        result
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn create_inner(&mut self, params: RecordParams) -> Result<i32> {
        let id = next_id(self.index.max_id())?;
        let record = Record::new(id, params);
        self.validate(&record)?;

        let slot = codec::encode(SlotStatus::Live, &record)?;
        let offset = self.slot_count()? * SLOT;
        self.write_verified(offset, &slot)?;
        self.index.add(&record, offset);

        tracing::debug!("Created record #{} at offset {}", id, offset);
        Ok(id)
    }

    fn edit_inner(&mut self, record: Record) -> Result<bool> {
        let Some(offset) = self.index.lookup_id(record.id) else {
            return Ok(false);
        };
        self.validate(&record)?;

        let old = self.read_record(offset)?;
        let slot = codec::encode(SlotStatus::Live, &record)?;

        self.index.remove(&old, offset);
        self.write_verified(offset, &slot)?;
        self.index.add(&record, offset);

        tracing::debug!("Edited record #{} at offset {}", record.id, offset);
        Ok(true)
    }

    fn remove_inner(&mut self, id: i32) -> Result<bool> {
        let Some(offset) = self.index.lookup_id(id) else {
            return Ok(false);
        };

        let old = self.read_record(offset)?;
        self.index.remove(&old, offset);
        self.write_status(offset, SlotStatus::Deleted)?;

        tracing::debug!("Removed record #{} at offset {}", id, offset);
        Ok(true)
    }

    /// Stable in-place compaction
    ///
    /// `right` scans every slot; `left` trails it at the next free position.
    /// Each live slot found past a gap is copied down to `left` and its old
    /// position is marked deleted, then the file is truncated at `left`.
    fn purge_inner(&mut self) -> Result<PurgeStat> {
        let total = self.slot_count()?;
        let mut left = 0u64;
        let mut purged = 0usize;

        for right in 0..total {
            let slot = self.read_slot(right * SLOT)?;
            if codec::read_status(&slot)? == SlotStatus::Deleted {
                purged += 1;
                continue;
            }

            if right != left {
                self.write_verified(left * SLOT, &slot)?;
                if let Err(e) = self.write_status(right * SLOT, SlotStatus::Deleted) {
                    // The original is still live; the copy must not be.
                    if let Err(undo) = self.discard_slots(left..left + 1) {
                        tracing::error!("Failed to discard slot {} copy: {}", left, undo);
                    }
                    return Err(e);
                }
            }
            left += 1;
        }

        self.stream.resize(left * SLOT)?;
        self.stream.sync()?;
        self.reindex_all()?;

        tracing::info!("Purged {} of {} slots", purged, total);
        Ok(PurgeStat {
            purged,
            live: left as usize,
        })
    }

    /// Merge records with ids not yet in the file into id order
    ///
    /// The file grows by one deleted slot per new record. Walking backward
    /// from the old tail, the larger of (current live slot, largest pending
    /// record) goes into the highest unfilled slot. The gap between the read
    /// and write cursors is at least the number of pending records, so no
    /// live slot is overwritten before it has been read.
    ///
    /// Slots between the cursors hold blanks or stale copies of records that
    /// already moved up. They are marked deleted when the walk ends, whether
    /// it finished or failed, so every id keeps exactly one live slot.
    ///
    /// `pending` must be sorted ascending by id and contain no existing id.
    fn merge_new(&mut self, mut pending: Vec<EncodedSlot>) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }
        self.ensure_id_order()?;

        let existing = self.slot_count()?;
        let grown = existing + pending.len() as u64;

        let mut blank = [0u8; SLOT_SIZE];
        blank[..2].copy_from_slice(&SlotStatus::Deleted.to_bytes());
        for slot in existing..grown {
            self.write_raw(slot * SLOT, &blank)?;
        }

        // Slot numbers: `read` is one past the next slot to examine, `write`
        // is the lowest slot already holding its final record.
        let mut read = existing;
        let mut write = grown;

        let walked = self.merge_walk(&mut pending, &mut read, &mut write);
        let discarded = self.discard_slots(read..write);
        if let (Err(_), Err(e)) = (&walked, &discarded) {
            tracing::error!(
                "Failed to discard slots {}..{} after merge error: {}",
                read,
                write,
                e
            );
        }
        walked.and(discarded)?;

        self.stream.sync()?;
        Ok(())
    }

    /// Cursors only move past a slot once its write has succeeded.
    fn merge_walk(
        &mut self,
        pending: &mut Vec<EncodedSlot>,
        read: &mut u64,
        write: &mut u64,
    ) -> Result<()> {
        while let Some(&(pending_id, _)) = pending.last() {
            let mut candidate = None;
            while *read > 0 {
                let slot = self.read_slot((*read - 1) * SLOT)?;
                if codec::read_status(&slot)? == SlotStatus::Live {
                    candidate = Some(slot);
                    break;
                }
                *read -= 1;
            }

            let target = (*write - 1) * SLOT;
            match candidate {
                Some(slot) if codec::read_id(&slot)? > pending_id => {
                    self.write_verified(target, &slot)?;
                    *read -= 1;
                }
                _ => {
                    let Some((_, slot)) = pending.pop() else {
                        break;
                    };
                    self.write_verified(target, &slot)?;
                }
            }
            *write -= 1;
        }
        Ok(())
    }

    /// Rewrite the live slots in id order if they are not already
    ///
    /// Only files written by something other than this store can be out of
    /// order; the rewrite also drops deleted slots.
    fn ensure_id_order(&mut self) -> Result<()> {
        let mut live = self.live_slots()?;
        if live.windows(2).all(|pair| pair[0].1.id < pair[1].1.id) {
            return Ok(());
        }

        tracing::warn!("Live records out of id order; rewriting file sorted");
        live.sort_by_key(|(_, record)| record.id);
        for (slot, (_, record)) in live.iter().enumerate() {
            let bytes = codec::encode(SlotStatus::Live, record)?;
            self.write_verified(slot as u64 * SLOT, &bytes)?;
        }
        self.stream.resize(live.len() as u64 * SLOT)?;
        Ok(())
    }

    fn insert_inner(&mut self, record: Record) -> Result<()> {
        self.validate(&record)?;
        if self.index.contains_id(record.id) {
            return Err(CabinetError::DuplicateId(record.id));
        }

        let id = record.id;
        self.merge_new(vec![encode_live(&record)?])?;
        self.reindex_all()?;

        tracing::debug!("Inserted record #{}", id);
        Ok(())
    }

    fn restore_inner(&mut self, snapshot: &Snapshot) -> Result<RestoreReport> {
        let (accepted, rejected) = partition_snapshot(snapshot, &self.validator);
        let imported = accepted.len();

        // Encode everything before the first write.
        let mut overwrites = Vec::new();
        let mut fresh = Vec::new();
        for (id, record) in &accepted {
            let encoded = encode_live(record)?;
            match self.index.lookup_id(*id) {
                Some(offset) => overwrites.push((offset, encoded.1)),
                None => fresh.push(encoded),
            }
        }

        for (offset, slot) in &overwrites {
            self.write_verified(*offset, slot)?;
        }
        // BTreeMap iteration already yields ascending ids.
        self.merge_new(fresh)?;
        self.reindex_all()?;

        tracing::info!(
            "Restored {} records into file ({} rejected)",
            imported,
            rejected.len()
        );
        Ok(RestoreReport { imported, rejected })
    }
}

impl<S: SlotStream> RecordStore for FileStore<S> {
    fn validate(&self, record: &Record) -> Result<()> {
        Ok(self.validator.validate(record)?)
    }

    fn create(&mut self, params: RecordParams) -> Result<i32> {
        let result = self.create_inner(params);
        self.resync(result)
    }

    fn records(&mut self) -> Result<Vec<Record>> {
        Ok(self
            .live_slots()?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    fn stat(&mut self) -> Result<StoreStat> {
        let bytes = self.read_all()?;
        let mut stat = StoreStat {
            live: 0,
            deleted: 0,
        };

        for chunk in bytes.chunks_exact(SLOT_SIZE) {
            match codec::read_status(chunk)? {
                SlotStatus::Live => stat.live += 1,
                SlotStatus::Deleted => stat.deleted += 1,
            }
        }
        Ok(stat)
    }

    fn edit(&mut self, record: Record) -> Result<bool> {
        let result = self.edit_inner(record);
        self.resync(result)
    }

    fn find_by_field(&mut self, field: &SearchField) -> Result<Vec<Record>> {
        let offsets = self.index.lookup(field);
        offsets
            .into_iter()
            .map(|offset| self.read_record(offset))
            .collect()
    }

    fn find_by_id(&mut self, id: i32) -> Result<Option<Record>> {
        match self.index.lookup_id(id) {
            Some(offset) => self.read_record(offset).map(Some),
            None => Ok(None),
        }
    }

    fn insert(&mut self, record: Record) -> Result<()> {
        let result = self.insert_inner(record);
        self.resync(result)
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<RestoreReport> {
        let result = self.restore_inner(snapshot);
        self.resync(result)
    }

    fn remove(&mut self, id: i32) -> Result<bool> {
        let result = self.remove_inner(id);
        self.resync(result)
    }

    fn purge(&mut self) -> Result<PurgeStat> {
        let result = self.purge_inner();
        self.resync(result)
    }

    fn close(&mut self) -> Result<()> {
        self.stream.sync()?;
        Ok(())
    }
}

impl<S: SlotStream> Drop for FileStore<S> {
    fn drop(&mut self) {
        if let Err(e) = self.stream.sync() {
            tracing::warn!("Failed to sync record file on drop: {}", e);
        }
    }
}
