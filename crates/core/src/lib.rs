//! Core runtime representation for the Rill language.
//!
//! This crate holds the pieces every other stage of the interpreter builds
//! on: source locations, the NaN-boxed [`Value`] word, the heap arena that
//! owns string objects, the nominal [`Type`] used by the resolver, the
//! bytecode [`Code`] buffer with its [`Instruction`] set, and the shared
//! diagnostic [`Error`] type.

pub mod code;
pub mod error;
pub mod location;
pub mod math;
pub mod object;
pub mod string;
pub mod types;
pub mod value;

pub use code::{Code, Instruction};
pub use error::{Error, ErrorKind, Result};
pub use location::Location;
pub use object::{Heap, HeapObject, ObjHandle, ObjKind};
pub use string::StrObj;
pub use types::{Type, TypeKind};
pub use value::Value;
