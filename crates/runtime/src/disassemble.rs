//! Bytecode disassembly.
//!
//! One line per instruction: the byte offset, the source line the byte came
//! from, the mnemonic, and for constant instructions the pool index and the
//! rendered constant.

use rill_core::{Code, Heap, Instruction};
use std::fmt::Write;

/// Disassemble one instruction; returns the rendered line and the offset of
/// the next instruction.
pub fn disassemble_at(code: &Code, heap: &Heap, offset: usize) -> (String, usize) {
    let mut line = String::new();
    let byte = match code.byte_at(offset) {
        Some(byte) => byte,
        None => return (line, offset),
    };
    let location = code.location_at(offset);
    let _ = write!(line, "{offset:04} {:>4} ", location.line + 1);

    match Instruction::try_from(byte) {
        Ok(instruction) => {
            let _ = write!(line, "{}", instruction.mnemonic());
            if instruction.operand_len() == 1 {
                match code.byte_at(offset + 1) {
                    Some(index) => {
                        let _ = write!(line, " {index}");
                        if let Some(constant) = code.constant_at(index as usize) {
                            let _ = write!(line, " ; {}", constant.render(heap));
                        } else {
                            let _ = write!(line, " ; <missing constant>");
                        }
                        return (line, offset + 2);
                    }
                    None => {
                        let _ = write!(line, " <truncated>");
                        return (line, offset + 1);
                    }
                }
            }
            (line, offset + 1)
        }
        Err(invalid) => {
            let _ = write!(line, "<invalid {invalid:#04x}>");
            (line, offset + 1)
        }
    }
}

/// Disassemble a whole block of code.
pub fn disassemble(code: &Code, heap: &Heap) -> String {
    let mut listing = String::new();
    let mut offset = 0;
    while offset < code.len() {
        let (line, next) = disassemble_at(code, heap, offset);
        listing.push_str(&line);
        listing.push('\n');
        offset = next;
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::{Location, Value};

    #[test]
    fn test_listing_shape() {
        let mut code = Code::new();
        let index = code.add_constant(Value::of_int(42).unwrap());
        code.push(Instruction::IConst as u8, Location::new(0, 5));
        code.push(index as u8, Location::new(0, 5));
        code.push(Instruction::Echo as u8, Location::new(0, 0));
        let heap = Heap::new();
        let listing = disassemble(&code, &heap);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ICONST 0 ; 42"));
        assert!(lines[1].contains("ECHO"));
    }

    #[test]
    fn test_invalid_byte_is_shown() {
        let mut code = Code::new();
        code.push(0xfe, Location::default());
        let heap = Heap::new();
        let listing = disassemble(&code, &heap);
        assert!(listing.contains("<invalid 0xfe>"));
    }
}
