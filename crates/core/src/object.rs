//! Heap-managed runtime objects.
//!
//! Heap values do not carry raw pointers: the 48-bit payload of a boxed
//! object value is an index into a [`Heap`] arena. The arena owns every
//! object allocated during a run and frees them all when it is dropped,
//! which keeps object lifetime explicit and leaves the door open for a
//! tracing collector whose roots are the value stack, the constant pool and
//! the arena's live set.

use crate::error::Result;
use crate::string::StrObj;
use crate::types::Type;
use crate::value::Value;

/// An index into a [`Heap`], as carried in the payload of an object value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjHandle(u32);

impl ObjHandle {
    pub fn from_index(index: u32) -> Self {
        ObjHandle(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// The runtime tag of a heap object.
///
/// Only strings can be constructed in the current backend; the sequence and
/// record tags are reserved for the paths that parse but do not execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    Str,
    Sequence,
    Record,
}

impl ObjKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjKind::Str => "String",
            ObjKind::Sequence => "Sequence",
            ObjKind::Record => "Record",
        }
    }
}

/// A runtime-tagged heap object.
#[derive(Debug)]
pub enum HeapObject {
    Str(StrObj),
}

impl HeapObject {
    pub fn kind(&self) -> ObjKind {
        match self {
            HeapObject::Str(_) => ObjKind::Str,
        }
    }

    pub fn type_of(&self) -> Type {
        match self {
            HeapObject::Str(_) => Type::string(),
        }
    }

    /// The canonical textual form of the object.
    ///
    /// Strings render as their raw bytes; any other object kind renders as
    /// an opaque tag with the boxed word.
    pub fn render(&self, value: Value) -> String {
        match self {
            HeapObject::Str(text) => text.as_str().to_string(),
            #[allow(unreachable_patterns)]
            _ => format!("<object {} at {:#x}>", self.kind().name(), value.bits()),
        }
    }

    /// The string payload, if this object is a string.
    pub fn as_str(&self) -> Option<&StrObj> {
        match self {
            HeapObject::Str(text) => Some(text),
        }
    }
}

/// Arena that owns every heap object allocated during a run.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    /// Allocate a string object and return its handle.
    pub fn alloc_str(&mut self, text: StrObj) -> ObjHandle {
        let index = self.objects.len() as u32;
        self.objects.push(HeapObject::Str(text));
        ObjHandle::from_index(index)
    }

    /// Allocate a string from raw bytes, validating UTF-8.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> Result<ObjHandle> {
        Ok(self.alloc_str(StrObj::from_bytes(bytes)?))
    }

    /// Allocate a string and box it as a value in one step.
    pub fn string_value(&mut self, text: impl Into<StrObj>) -> Value {
        Value::of_obj(self.alloc_str(text.into()))
    }

    pub fn get(&self, handle: ObjHandle) -> Option<&HeapObject> {
        self.objects.get(handle.index() as usize)
    }

    /// The string behind a handle, if the handle is live and names one.
    pub fn string(&self, handle: ObjHandle) -> Option<&StrObj> {
        self.get(handle).and_then(HeapObject::as_str)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
