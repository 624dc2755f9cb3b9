//! Serializer - writes a reachable object graph as a relocatable blob
//!
//! The serializer walks the graph breadth-first from a root. Disk space
//! for an object is reserved the moment it is discovered, so a reference
//! can be patched to its target's final offset before the target itself
//! has been written.
//!
//! # Record Format
//!
//! ```text
//! ┌──────────┬──────────┬──────────────────────────┬─────────┐
//! │ header   │ token    │ payload (size - 2W)      │ padding │
//! │ W, zero  │ W        │ reference slots patched  │ to W    │
//! └──────────┴──────────┴──────────────────────────┴─────────┘
//!            ▲
//!            └── what a patched reference points at
//! ```
//!
//! # Object Lifecycle
//!
//! 1. Discovered: size computed, record reserved, queued (`Pending`)
//! 2. Popped: record written at the linear cursor (`Written`)
//! 3. Scanned: every reference slot patched in place, then done
//!
//! # Safety
//!
//! The heap must be quiescent for the whole run: object identities are raw
//! addresses that are re-read across steps.

pub mod offset_map;
pub mod queue;
pub mod sink;
pub mod stats;
pub mod token_map;

pub use offset_map::IdentityOffsetMap;
pub use queue::{PendingObject, TraversalQueue};
pub use sink::BlobSink;
pub use stats::{RunTimer, SerializeStats};
pub use token_map::{TypeToken, TypeTokenMap};

use crate::config::SerializerConfig;
use crate::error::{FrzError, Result};
use crate::logging::{JsonTraceSink, TraceEvent, TraceSink};
use crate::object::{ObjectAccessor, ObjectId, ObjectModel, TypeHandle};
use crate::util::format_address;
use crate::walker::GraphWalker;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

/// Side tables of a finished run
///
/// Owns both tables; dropping it (or taking them with
/// [`into_parts`](Self::into_parts)) releases them exactly once.
#[derive(Debug, Clone)]
pub struct SerializedGraph {
    type_tokens: Vec<TypeToken>,
    fixups: Vec<usize>,
    stats: SerializeStats,
}

impl SerializedGraph {
    /// Type descriptors in token order
    pub fn type_tokens(&self) -> &[TypeToken] {
        &self.type_tokens
    }

    /// Content-start offsets of records whose type is the sentinel
    pub fn fixups(&self) -> &[usize] {
        &self.fixups
    }

    pub fn stats(&self) -> &SerializeStats {
        &self.stats
    }

    pub fn into_parts(self) -> (Vec<TypeToken>, Vec<usize>) {
        (self.type_tokens, self.fixups)
    }
}

/// Serializer
///
/// Holds only configuration; every run builds its own maps, queue and
/// layout cache.
#[derive(Debug, Clone)]
pub struct Serializer {
    config: SerializerConfig,
    accessor: ObjectAccessor,
}

impl Serializer {
    /// Create a serializer with a validated configuration
    pub fn new(config: SerializerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            accessor: ObjectAccessor::new(ObjectModel::NATIVE),
        })
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Serialize the graph under `root` into a file at `path`
    ///
    /// The file is truncated first. A JSON trace is written next to it when
    /// `trace_path` is configured. On failure the partially written file is
    /// left in place for the caller to discard.
    ///
    /// # Safety
    ///
    /// `root` must address a live object of a quiescent heap whose type and
    /// layout descriptors follow [`ObjectModel::NATIVE`].
    pub unsafe fn serialize(
        &self,
        root: ObjectId,
        path: impl AsRef<Path>,
        function_pointer_type: Option<TypeHandle>,
    ) -> Result<SerializedGraph> {
        let out = self.create_output(path.as_ref())?;

        match &self.config.trace_path {
            Some(trace_path) => {
                let mut trace = JsonTraceSink::create(trace_path).map_err(|err| {
                    FrzError::io(format!("creating trace {}", trace_path.display()), err)
                })?;
                self.serialize_into(root, out, function_pointer_type, Some(&mut trace))
            },
            None => self.serialize_into(root, out, function_pointer_type, None),
        }
    }

    /// Like [`serialize`](Self::serialize) but reporting to `trace`
    ///
    /// # Safety
    ///
    /// Same contract as [`serialize`](Self::serialize).
    pub unsafe fn serialize_traced(
        &self,
        root: ObjectId,
        path: impl AsRef<Path>,
        function_pointer_type: Option<TypeHandle>,
        trace: &mut dyn TraceSink,
    ) -> Result<SerializedGraph> {
        let out = self.create_output(path.as_ref())?;
        self.serialize_into(root, out, function_pointer_type, Some(trace))
    }

    /// Serialize into any seekable output positioned at offset 0
    ///
    /// # Safety
    ///
    /// Same contract as [`serialize`](Self::serialize).
    pub unsafe fn serialize_into<W: Write + Seek>(
        &self,
        root: ObjectId,
        out: W,
        function_pointer_type: Option<TypeHandle>,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<SerializedGraph> {
        let timer = RunTimer::new();
        if root.is_null() {
            return Err(FrzError::InvalidPointer { address: 0 });
        }

        let model = *self.accessor.model();
        let root_size = self.accessor.size_of(root)?;
        log::debug!(
            "serializing graph from root {} ({} bytes, {})",
            format_address(root.addr()),
            root_size,
            model.name
        );

        let mut run = Run {
            accessor: self.accessor,
            sink: BlobSink::new(out),
            offsets: IdentityOffsetMap::new(model, self.config.expected_objects),
            queue: TraversalQueue::with_capacity(self.config.expected_objects.min(4096)),
            tokens: TypeTokenMap::new(),
            fixups: Vec::new(),
            trace,
            objects: 0,
            null_references: 0,
        };
        let mut walker = GraphWalker::new();

        run.emit(TraceEvent::RunStarted {
            root: root.addr(),
            root_size,
            convention: model.name,
        })?;

        let token_offset = run.offsets.reserve(root, root_size);
        run.queue.push(PendingObject {
            object: root,
            size: root_size,
            token_offset,
        });

        while let Some(pending) = run.queue.pop() {
            let type_handle = run.write_record(pending)?;

            if function_pointer_type == Some(type_handle) {
                run.fixups.push(pending.token_offset);
            }

            walker.walk(pending.object, pending.size, |owner, slot| {
                run.patch_reference(owner, slot, pending.token_offset)
            })?;
        }

        let graph = run.finish(walker, timer)?;
        if self.config.verbose {
            log::info!("[FRZ] Serialized {}", graph.stats());
        }
        Ok(graph)
    }

    fn create_output(&self, path: &Path) -> Result<BufWriter<File>> {
        let file = File::create(path)
            .map_err(|err| FrzError::io(format!("creating {}", path.display()), err))?;
        Ok(BufWriter::with_capacity(self.config.buffer_capacity, file))
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self {
            config: SerializerConfig::default(),
            accessor: ObjectAccessor::new(ObjectModel::NATIVE),
        }
    }
}

/// State of one run
struct Run<'t, W: Write + Seek> {
    accessor: ObjectAccessor,
    sink: BlobSink<W>,
    offsets: IdentityOffsetMap,
    queue: TraversalQueue,
    tokens: TypeTokenMap,
    fixups: Vec<usize>,
    trace: Option<&'t mut dyn TraceSink>,
    objects: u64,
    null_references: u64,
}

impl<W: Write + Seek> Run<'_, W> {
    /// Append the record of `pending` at the linear cursor
    unsafe fn write_record(&mut self, pending: PendingObject) -> Result<TypeHandle> {
        let model = *self.accessor.model();
        let word = model.pointer_size;
        let PendingObject {
            object,
            size,
            token_offset,
        } = pending;

        let type_handle = object.type_handle()?;
        let token = self.tokens.token_for(type_handle);

        self.sink.expect_position(token_offset - model.header_size)?;
        self.sink.append_zeros(model.header_size)?;
        self.sink.append_word(token)?;

        let payload = std::slice::from_raw_parts((object.addr() + word) as *const u8, size - 2 * word);
        self.sink.append(payload)?;

        let padding = model.padding(size);
        self.sink.append_zeros(padding)?;
        self.objects += 1;

        log::trace!(
            "wrote object {} as token {} at {} ({} bytes + {} padding)",
            format_address(object.addr()),
            token,
            token_offset,
            size,
            padding
        );
        self.emit(TraceEvent::ObjectWritten {
            token,
            file_position: token_offset as u64,
            size,
            padding,
        })?;

        Ok(type_handle)
    }

    /// Resolve the reference held in `slot` of `owner` and patch it on disk
    unsafe fn patch_reference(&mut self, owner: ObjectId, slot: usize, owner_offset: usize) -> Result<()> {
        let target = ObjectId::from_addr((slot as *const usize).read_unaligned());
        if target.is_null() {
            self.null_references += 1;
            return Ok(());
        }

        let target_offset = match self.offsets.get(target) {
            Some(offset) => offset,
            None => {
                let size = self.accessor.size_of(target)?;
                let offset = self.offsets.reserve(target, size);
                self.queue.push(PendingObject {
                    object: target,
                    size,
                    token_offset: offset,
                });
                offset
            },
        };

        let field = slot - owner.addr();
        let at = owner_offset + field;
        self.sink.patch_word(at, target_offset)?;

        log::trace!(
            "patched {} -> {} (object {} field +{})",
            at,
            target_offset,
            format_address(owner.addr()),
            field
        );
        self.emit(TraceEvent::ReferencePatched {
            from: at as u64,
            to: target_offset as u64,
            offset: field,
        })
    }

    fn emit(&mut self, event: TraceEvent) -> Result<()> {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace
                .record(&event)
                .map_err(|err| FrzError::io("writing trace", err))?;
        }
        Ok(())
    }

    fn finish(mut self, walker: GraphWalker, timer: RunTimer) -> Result<SerializedGraph> {
        let bytes = self.sink.position();
        if bytes != self.offsets.next_free() {
            return Err(FrzError::Internal(format!(
                "wrote {} bytes but reserved {}",
                bytes,
                self.offsets.next_free()
            )));
        }

        let references_patched = self.sink.patches();
        self.emit(TraceEvent::RunFinished {
            objects: self.objects,
            bytes: bytes as u64,
            types: self.tokens.len(),
            fixups: self.fixups.len(),
        })?;
        if let Some(trace) = self.trace.as_deref_mut() {
            trace
                .finish()
                .map_err(|err| FrzError::io("finishing trace", err))?;
        }
        self.sink.finish()?;

        let stats = SerializeStats {
            objects: self.objects,
            bytes: bytes as u64,
            references_patched,
            null_references: self.null_references,
            distinct_types: self.tokens.len(),
            fixups: self.fixups.len(),
            layout_cache: walker.stats(),
            elapsed: timer.elapsed(),
        };
        log::debug!("serialization finished: {}", stats);

        Ok(SerializedGraph {
            type_tokens: self.tokens.into_type_tokens(),
            fixups: self.fixups,
            stats,
        })
    }
}
