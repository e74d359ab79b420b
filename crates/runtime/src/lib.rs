//! Execution backends for the Rill language.
//!
//! Two sinks consume the compiler crate's output: the [`Vm`] executes the
//! typed bytecode produced by the bytecode compiler, and the [`Walker`]
//! evaluates the resolved expression tree directly. Both write the
//! canonical textual form of echoed values to an injected sink (stdout by
//! default) and abort the run on the first runtime error.

pub mod disassemble;
pub mod vm;
pub mod walker;

pub use disassemble::disassemble;
pub use vm::{Vm, VmState};
pub use walker::Walker;
