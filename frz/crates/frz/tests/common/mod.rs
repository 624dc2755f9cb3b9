//! Test Utilities for the FRZ Test Suite
//!
//! Builds a synthetic managed heap in process memory: real type
//! descriptors, real layout descriptors in front of them, and objects laid
//! out exactly as the pinned object model expects. Serializing it exercises
//! the same raw-memory paths a hosting runtime would.
//!
//! ============================================================================
//! Every object is a `Box<[usize]>` owned by the heap, so addresses stay
//! stable until the heap is dropped.
//! ============================================================================

#![allow(dead_code)]

use frz::object::header::{
    CATEGORY_ARRAY, FLAG_COLLECTIBLE, FLAG_CONTAINS_POINTERS, FLAG_HAS_COMPONENT_SIZE,
};
use frz::{
    BlobInspector, BlobSummary, MethodTable, ObjectId, SerializedGraph, Serializer,
    SerializerConfig, TypeHandle,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Pointer width of the build
pub const W: usize = std::mem::size_of::<usize>();

/// Minimum object size of the pinned model
pub const MIN_SIZE: usize = 3 * W;

/// ============================================================================
/// SYNTHETIC HEAP
/// ============================================================================

/// Owner of every type and object a test builds
#[derive(Default)]
pub struct SyntheticHeap {
    blocks: Vec<Box<[usize]>>,
}

impl SyntheticHeap {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, words: usize) -> *mut usize {
        let mut block = vec![0usize; words].into_boxed_slice();
        let ptr = block.as_mut_ptr();
        self.blocks.push(block);
        ptr
    }

    /// Define a type: `descriptor` words immediately followed by the
    /// method table
    ///
    /// **Bug this finds:** descriptor lookup reading the wrong words
    pub fn define_type(&mut self, descriptor: &[usize], flags: u32, base_size: usize) -> TypeHandle {
        let mt_words = std::mem::size_of::<MethodTable>().div_ceil(W);
        let block = self.alloc(descriptor.len() + mt_words);
        unsafe {
            for (i, word) in descriptor.iter().enumerate() {
                block.add(i).write(*word);
            }
            let method_table = block.add(descriptor.len()) as *mut MethodTable;
            method_table.write(MethodTable::new(flags, base_size as u32));
            TypeHandle::from_addr(method_table as usize)
        }
    }

    /// Type without references: header, type pointer, `data_words` words
    pub fn plain_type(&mut self, data_words: usize) -> TypeHandle {
        self.define_type(&[], 0, (2 + data_words) * W)
    }

    /// Type whose first `refs` fields are references, then `data_words`
    /// plain words
    ///
    /// Layout: `[header][type][ref 0 .. ref n-1][data ...]`
    pub fn ref_type(&mut self, refs: usize, data_words: usize) -> TypeHandle {
        if refs == 0 {
            return self.plain_type(data_words);
        }
        let base_size = (2 + refs + data_words) * W;
        let size_adjust = neg(base_size - refs * W);
        self.define_type(&[size_adjust, W, 1], FLAG_CONTAINS_POINTERS, base_size)
    }

    /// Like [`ref_type`](Self::ref_type) but flagged collectible only
    pub fn collectible_type(&mut self, refs: usize) -> TypeHandle {
        let base_size = (2 + refs) * W;
        self.define_type(&[neg(base_size - refs * W), W, 1], FLAG_COLLECTIBLE, base_size)
    }

    /// Array of references
    ///
    /// Layout: `[header][type][count][elem 0 ...]`
    pub fn ref_array_type(&mut self) -> TypeHandle {
        self.define_type(
            &[neg(3 * W), 2 * W, 1],
            FLAG_HAS_COMPONENT_SIZE | CATEGORY_ARRAY | FLAG_CONTAINS_POINTERS | W as u32,
            3 * W,
        )
    }

    /// Array of `{ ref, data }` structs, described by a repeating pattern
    ///
    /// **Bug this finds:** repeating branch walking past the last element
    pub fn struct_array_type(&mut self) -> TypeHandle {
        self.define_type(
            &[pattern_group(1, W), 2 * W, neg(1)],
            FLAG_HAS_COMPONENT_SIZE | CATEGORY_ARRAY | FLAG_CONTAINS_POINTERS | (2 * W) as u32,
            3 * W,
        )
    }

    /// Two-byte character string: `[header][type][length u32][chars][nul]`
    ///
    /// **Bug this finds:** missing padding for sizes that are not word
    /// multiples
    pub fn string_type(&mut self) -> TypeHandle {
        self.define_type(&[], FLAG_HAS_COMPONENT_SIZE | 2, 2 * W + 4 + 2)
    }

    fn base_size(ty: TypeHandle) -> usize {
        unsafe { ty.method_table().expect("valid type").base_size() as usize }
    }

    fn component_size(ty: TypeHandle) -> usize {
        unsafe { ty.method_table().expect("valid type").component_size() as usize }
    }

    fn place(&mut self, ty: TypeHandle, size: usize) -> ObjectId {
        let words = size.max(MIN_SIZE).div_ceil(W);
        let block = self.alloc(words);
        unsafe {
            block.add(1).write(ty.addr());
            ObjectId::from_addr(block.add(1) as usize)
        }
    }

    /// Allocate a fixed-size object of `ty`, all fields zero
    pub fn object(&mut self, ty: TypeHandle) -> ObjectId {
        self.place(ty, Self::base_size(ty))
    }

    /// Allocate an array or string of `ty` with `len` components
    pub fn array(&mut self, ty: TypeHandle, len: u32) -> ObjectId {
        let size = Self::base_size(ty) + len as usize * Self::component_size(ty);
        let object = self.place(ty, size);
        unsafe { ((object.addr() + W) as *mut u32).write(len) };
        object
    }

    /// Write a word at `offset` bytes from the object address
    pub fn set_word(&mut self, object: ObjectId, offset: usize, value: usize) {
        unsafe { ((object.addr() + offset) as *mut usize).write(value) };
    }

    pub fn word(&self, object: ObjectId, offset: usize) -> usize {
        unsafe { ((object.addr() + offset) as *const usize).read() }
    }

    /// Set reference field `index` of a [`ref_type`](Self::ref_type) object
    pub fn set_field(&mut self, object: ObjectId, index: usize, target: ObjectId) {
        self.set_word(object, W + index * W, target.addr());
    }

    /// Set element `index` of a [`ref_array_type`](Self::ref_array_type) array
    pub fn set_element(&mut self, array: ObjectId, index: usize, target: ObjectId) {
        self.set_word(array, 2 * W + index * W, target.addr());
    }

    /// Set the reference of struct element `index` of a
    /// [`struct_array_type`](Self::struct_array_type) array
    pub fn set_struct_ref(&mut self, array: ObjectId, index: usize, target: ObjectId) {
        self.set_word(array, 2 * W + index * 2 * W, target.addr());
    }

    /// Set the plain word of struct element `index`
    pub fn set_struct_data(&mut self, array: ObjectId, index: usize, value: usize) {
        self.set_word(array, 3 * W + index * 2 * W, value);
    }

    /// Set data word `index` of a [`ref_type`](Self::ref_type) object with
    /// `refs` references
    pub fn set_data(&mut self, object: ObjectId, refs: usize, index: usize, value: usize) {
        self.set_word(object, W + (refs + index) * W, value);
    }
}

/// Two's complement of a byte count, as the descriptor stores it
pub fn neg(value: usize) -> usize {
    (value as isize).wrapping_neg() as usize
}

/// Pattern group word: pointer count in the low half, skip in the high half
pub fn pattern_group(pointers: usize, skip: usize) -> usize {
    pointers | (skip << (W * 4))
}

/// ============================================================================
/// SERIALIZE FIXTURE
/// ============================================================================

/// Output of one run to a temporary file
pub struct Frozen {
    pub dir: TempDir,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub graph: SerializedGraph,
}

impl Frozen {
    /// Record-level view of the blob
    pub fn inspector(&self) -> BlobInspector<'_> {
        BlobInspector::new(&self.bytes, self.graph.type_tokens())
    }

    /// Verify framing and that every reference resolves
    ///
    /// **Bug this finds:** dangling patches, wrong record sizes
    pub fn verify(&self) -> BlobSummary {
        unsafe { self.inspector().verify() }.expect("blob should verify")
    }

    pub fn word_at(&self, offset: usize) -> usize {
        word_at(&self.bytes, offset)
    }
}

/// Serialize `root` into a fresh temporary file with the default config
pub fn freeze(root: ObjectId, function_pointer_type: Option<TypeHandle>) -> Frozen {
    freeze_with(root, function_pointer_type, SerializerConfig::default())
}

pub fn freeze_with(
    root: ObjectId,
    function_pointer_type: Option<TypeHandle>,
    config: SerializerConfig,
) -> Frozen {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("graph.frz");
    let serializer = Serializer::new(config).expect("valid config");
    let graph = unsafe { serializer.serialize(root, &path, function_pointer_type) }
        .unwrap_or_else(|e| panic!("serialization failed: {}", e));
    let bytes = read_blob(&path);
    Frozen {
        dir,
        path,
        bytes,
        graph,
    }
}

pub fn read_blob(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

/// Native-endian word at `offset`
pub fn word_at(bytes: &[u8], offset: usize) -> usize {
    let mut buf = [0u8; W];
    buf.copy_from_slice(&bytes[offset..offset + W]);
    usize::from_ne_bytes(buf)
}
