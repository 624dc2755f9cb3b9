//! Blob Inspector - read-only verification of a written blob
//!
//! Walks the records of a blob using the live type descriptors named by
//! the token side table. Nothing is reconstructed; the inspector only
//! checks that the framing is consistent and that every patched reference
//! lands on the token field of a record.

use crate::error::{FrzError, Result};
use crate::object::{ObjectAccessor, ObjectExtent, ObjectModel, TypeHandle};
use crate::serializer::TypeToken;
use crate::util::{read_u32, read_word};
use crate::walker::GraphWalker;
use rustc_hash::{FxHashMap, FxHashSet};

/// One record of a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInfo {
    /// Offset of the (zero) header word
    pub start: usize,
    /// Offset of the token field; what references to this record hold
    pub token_offset: usize,
    pub token: usize,
    pub type_handle: TypeHandle,
    /// Object size, header included
    pub size: usize,
    pub padding: usize,
}

impl RecordInfo {
    /// Offset right after the record's padding
    pub fn end(&self) -> usize {
        self.start + self.size + self.padding
    }
}

/// Result of [`BlobInspector::verify`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobSummary {
    pub records: usize,
    /// Non-null reference slots, all resolved
    pub references: usize,
    pub null_references: usize,
}

pub struct BlobInspector<'a> {
    bytes: &'a [u8],
    types: FxHashMap<usize, TypeHandle>,
    accessor: ObjectAccessor,
}

impl<'a> BlobInspector<'a> {
    pub fn new(bytes: &'a [u8], type_tokens: &[TypeToken]) -> Self {
        Self {
            bytes,
            types: type_tokens
                .iter()
                .map(|entry| (entry.token, entry.type_handle))
                .collect(),
            accessor: ObjectAccessor::new(ObjectModel::NATIVE),
        }
    }

    /// Every record in blob order
    ///
    /// # Safety
    ///
    /// Every type handle in the token table must point at a live type
    /// descriptor.
    pub unsafe fn records(&self) -> Result<Vec<RecordInfo>> {
        let model = *self.accessor.model();
        let word = model.pointer_size;
        let mut records = Vec::new();
        let mut start = 0;

        while start < self.bytes.len() {
            let token_offset = start + model.header_size;
            let token = read_word(self.bytes, token_offset)
                .ok_or_else(|| corrupt(start, "truncated record frame"))?;
            let type_handle = *self
                .types
                .get(&token)
                .ok_or_else(|| corrupt(token_offset, format!("unknown type token {}", token)))?;

            let method_table = type_handle.method_table()?;
            let components = if method_table.has_component_size() {
                read_u32(self.bytes, token_offset + word)
                    .ok_or_else(|| corrupt(token_offset + word, "truncated component count"))?
            } else {
                0
            };
            let size = self.accessor.instance_size(method_table, components)?;
            let padding = model.padding(size);

            let record = RecordInfo {
                start,
                token_offset,
                token,
                type_handle,
                size,
                padding,
            };
            if record.end() > self.bytes.len() {
                return Err(corrupt(
                    start,
                    format!(
                        "record of {} bytes runs past the blob end {}",
                        size + padding,
                        self.bytes.len()
                    ),
                ));
            }

            records.push(record);
            start = record.end();
        }

        Ok(records)
    }

    /// Check headers and resolve every reference slot
    ///
    /// # Safety
    ///
    /// Same contract as [`records`](Self::records); the layout descriptors
    /// in front of those type descriptors must be live as well.
    pub unsafe fn verify(&self) -> Result<BlobSummary> {
        let records = self.records()?;
        let targets: FxHashSet<usize> = records.iter().map(|record| record.token_offset).collect();
        let mut walker = GraphWalker::new();
        let mut summary = BlobSummary {
            records: records.len(),
            ..Default::default()
        };

        for record in &records {
            if read_word(self.bytes, record.start) != Some(0) {
                return Err(corrupt(record.start, "non-zero object header"));
            }

            if !record.type_handle.method_table()?.contains_pointers_or_collectible() {
                continue;
            }

            // Blob offsets stand in for addresses: the token field plays
            // the role of the type descriptor slot.
            let extent = ObjectExtent::new(record.token_offset, record.size);
            let descriptor = walker.layout_of(record.type_handle)?;
            descriptor.for_each_reference(extent, |slot| {
                match read_word(self.bytes, slot) {
                    Some(0) => summary.null_references += 1,
                    Some(target) if targets.contains(&target) => summary.references += 1,
                    Some(target) => {
                        return Err(corrupt(
                            slot,
                            format!("reference {} does not point at a record", target),
                        ))
                    },
                    None => return Err(corrupt(slot, "reference slot past the blob end")),
                }
                Ok(())
            })?;
        }

        log::debug!(
            "verified blob: {} records, {} references, {} null",
            summary.records,
            summary.references,
            summary.null_references
        );
        Ok(summary)
    }
}

fn corrupt(offset: usize, reason: impl Into<String>) -> FrzError {
    FrzError::CorruptBlob {
        offset,
        reason: reason.into(),
    }
}
