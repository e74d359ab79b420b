//! The stack virtual machine.
//!
//! A single-threaded fetch-execute loop over a [`Code`] block: read the
//! opcode byte, consume its operand byte if it has one, dispatch. The
//! operand stack holds [`Value`]s; every instruction has a fixed arity, and
//! popping from an empty stack or failing to grow it aborts the run with
//! the source location of the current byte. Int arithmetic is checked
//! against the 48-bit range before boxing; Real arithmetic is IEEE 754.
//!
//! The machine owns the heap arena for the run. String constants in the
//! pool hold handles into it, so the pool must not outlive the machine.

use rill_core::{
    Code, Error, ErrorKind, Heap, Instruction, Location, ObjHandle, Result, Value, math,
};
use std::io::Write;
use tracing::trace;

/// The per-run state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Idle,
    Running,
    Success,
    RuntimeError,
    CompileError,
}

pub struct Vm {
    stack: Vec<Value>,
    heap: Heap,
    state: VmState,
    out: Box<dyn Write>,
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl Vm {
    /// A machine that echoes to stdout.
    pub fn new() -> Self {
        Vm::with_output(Box::new(std::io::stdout()))
    }

    /// A machine that echoes to the given sink.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Vm {
            stack: Vec::new(),
            heap: Heap::new(),
            state: VmState::Idle,
            out,
        }
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    /// The heap arena owned by this machine. The frontend allocates string
    /// literals here so their handles stay valid for the whole run.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Allocate a string owned by this machine.
    pub fn allocate_string(&mut self, bytes: &[u8]) -> Result<ObjHandle> {
        self.heap.alloc_bytes(bytes)
    }

    /// Current operand stack depth.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Execute a block of code to completion or to its first error.
    pub fn run(&mut self, code: &Code) -> Result<()> {
        self.state = VmState::Running;
        match self.execute(code) {
            Ok(()) => {
                self.state = VmState::Success;
                Ok(())
            }
            Err(error) => {
                self.state = if error.kind.is_runtime() {
                    VmState::RuntimeError
                } else {
                    VmState::CompileError
                };
                Err(error)
            }
        }
    }

    fn execute(&mut self, code: &Code) -> Result<()> {
        let mut ip = 0usize;
        while ip < code.len() {
            let location = code.location_at(ip);
            let byte = code.byte_at(ip).unwrap_or(Instruction::Nop as u8);
            ip += 1;

            let instruction = Instruction::try_from(byte).map_err(|invalid| {
                Error::new(
                    ErrorKind::ValueMismatch,
                    location,
                    format!("Invalid virtual machine instruction {invalid:#04x}"),
                )
            })?;
            trace!(ip = ip - 1, op = instruction.mnemonic(), depth = self.stack.len());

            match instruction {
                Instruction::Nop => {}

                Instruction::Nil => self.push(Value::NOTHING, location)?,
                Instruction::False => self.push(Value::FALSE, location)?,
                Instruction::True => self.push(Value::TRUE, location)?,

                Instruction::IConst | Instruction::RConst | Instruction::UConst => {
                    let index = code.byte_at(ip).ok_or_else(|| {
                        Error::new(
                            ErrorKind::Compiler,
                            location,
                            "Missing constant operand byte",
                        )
                    })?;
                    ip += 1;
                    let constant = code.constant_at(index as usize).ok_or_else(|| {
                        Error::new(
                            ErrorKind::Compiler,
                            location,
                            format!("No constant at index {index}"),
                        )
                    })?;
                    self.push(constant, location)?;
                }

                Instruction::Not => {
                    let a = self.pop_bool(location)?;
                    self.push(Value::of_bool(!a), location)?;
                }

                Instruction::INeg => {
                    let a = self.pop_int(location)?;
                    self.push_int(-a, location)?;
                }
                Instruction::RNeg => {
                    let a = self.pop_real(location)?;
                    self.push(Value::of_real(-a), location)?;
                }
                Instruction::IAbs => {
                    let a = self.pop_int(location)?;
                    self.push_int(a.abs(), location)?;
                }
                Instruction::RAbs => {
                    let a = self.pop_real(location)?;
                    self.push(Value::of_real(a.abs()), location)?;
                }
                Instruction::ISign => {
                    let a = self.pop_int(location)?;
                    self.push_int(math::isign(a), location)?;
                }
                Instruction::RSign => {
                    let a = self.pop_real(location)?;
                    self.push(Value::of_real(math::rsign(a)), location)?;
                }

                Instruction::IAdd => {
                    let (a, b) = self.pop_int_pair(location)?;
                    self.push_int(a + b, location)?;
                }
                Instruction::RAdd => {
                    let (a, b) = self.pop_real_pair(location)?;
                    self.push(Value::of_real(a + b), location)?;
                }
                Instruction::ISub => {
                    let (a, b) = self.pop_int_pair(location)?;
                    self.push_int(a - b, location)?;
                }
                Instruction::RSub => {
                    let (a, b) = self.pop_real_pair(location)?;
                    self.push(Value::of_real(a - b), location)?;
                }
                Instruction::IMul => {
                    let (a, b) = self.pop_int_pair(location)?;
                    let product = a.checked_mul(b).ok_or_else(|| {
                        Error::new(
                            ErrorKind::ValueOverflow,
                            location,
                            format!("The product of {a} and {b} exceeds the int range"),
                        )
                    })?;
                    self.push_int(product, location)?;
                }
                Instruction::RMul => {
                    let (a, b) = self.pop_real_pair(location)?;
                    self.push(Value::of_real(a * b), location)?;
                }

                Instruction::IDiv => {
                    let (a, b) = self.pop_int_pair(location)?;
                    if b == 0 {
                        return Err(Self::division_by_zero(location));
                    }
                    self.push(Value::of_real(a as f64 / b as f64), location)?;
                }
                Instruction::RDiv => {
                    let (a, b) = self.pop_real_pair(location)?;
                    self.push(Value::of_real(a / b), location)?;
                }
                Instruction::IQuo => {
                    let (a, b) = self.pop_int_pair(location)?;
                    if b == 0 {
                        return Err(Self::division_by_zero(location));
                    }
                    self.push_int(math::ifloordiv(a, b), location)?;
                }
                Instruction::RQuo => {
                    let (a, b) = self.pop_real_pair(location)?;
                    self.push(Value::of_real(math::rfloordiv(a, b)), location)?;
                }
                Instruction::IRem => {
                    let (a, b) = self.pop_int_pair(location)?;
                    if b == 0 {
                        return Err(Self::division_by_zero(location));
                    }
                    self.push_int(math::ifloorrem(a, b), location)?;
                }
                Instruction::RRem => {
                    let (a, b) = self.pop_real_pair(location)?;
                    self.push(Value::of_real(math::rfloorrem(a, b)), location)?;
                }

                Instruction::BEq => {
                    let b = self.pop_bool(location)?;
                    let a = self.pop_bool(location)?;
                    self.push(Value::of_bool(a == b), location)?;
                }
                Instruction::ICmp => {
                    let (a, b) = self.pop_int_pair(location)?;
                    self.push_int(Self::order(a.cmp(&b)), location)?;
                }
                Instruction::RCmp => {
                    let (a, b) = self.pop_real_pair(location)?;
                    let ordering = if a < b {
                        -1
                    } else if a > b {
                        1
                    } else {
                        0
                    };
                    self.push_int(ordering, location)?;
                }
                Instruction::UCmp => {
                    let b = self.pop_rune(location)?;
                    let a = self.pop_rune(location)?;
                    self.push_int(Self::order(a.cmp(&b)), location)?;
                }

                Instruction::IEqz => self.int_test(location, |a| a == 0)?,
                Instruction::INez => self.int_test(location, |a| a != 0)?,
                Instruction::ILtz => self.int_test(location, |a| a < 0)?,
                Instruction::ILez => self.int_test(location, |a| a <= 0)?,
                Instruction::IGtz => self.int_test(location, |a| a > 0)?,
                Instruction::IGez => self.int_test(location, |a| a >= 0)?,
                Instruction::REqz => {
                    let a = self.pop_real(location)?;
                    self.push(Value::of_bool(a == 0.0), location)?;
                }
                Instruction::RNan => {
                    let a = self.pop_real(location)?;
                    self.push(Value::of_bool(a.is_nan()), location)?;
                }

                Instruction::IToR => {
                    let a = self.pop_int(location)?;
                    self.push(Value::of_real(a as f64), location)?;
                }
                Instruction::IToU => {
                    let a = self.pop_int(location)?;
                    let code_point = u32::try_from(a).map_err(|_| {
                        Error::new(
                            ErrorKind::ValueOverflow,
                            location,
                            format!("The int {a} specifies a non-existing code point"),
                        )
                    })?;
                    let rune = Value::of_rune(code_point).map_err(|error| error.at(location))?;
                    self.push(rune, location)?;
                }
                Instruction::RTrunc => self.real_to_int(location, "truncate", f64::trunc)?,
                Instruction::RFloor => self.real_to_int(location, "floor", f64::floor)?,
                Instruction::RCeil => self.real_to_int(location, "ceil", f64::ceil)?,
                Instruction::UToI => {
                    let a = self.pop_rune(location)?;
                    self.push_int(i64::from(u32::from(a)), location)?;
                }

                Instruction::Pop => {
                    self.pop(location)?;
                }
                Instruction::Echo => {
                    let value = self.pop(location)?;
                    let rendered = value.render(&self.heap);
                    writeln!(self.out, "{rendered}").map_err(|error| {
                        Error::new(
                            ErrorKind::Str,
                            location,
                            format!("Failed to write to the output stream: {error}"),
                        )
                    })?;
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Stack discipline
    // =========================================================================

    fn push(&mut self, value: Value, location: Location) -> Result<()> {
        if self.stack.len() == self.stack.capacity() {
            self.stack
                .try_reserve(1)
                .map_err(|_| Error::new(ErrorKind::StackOverflow, location, "Stack overflow"))?;
        }
        self.stack.push(value);
        Ok(())
    }

    fn push_int(&mut self, value: i64, location: Location) -> Result<()> {
        let boxed = Value::of_int(value).map_err(|error| error.at(location))?;
        self.push(boxed, location)
    }

    fn pop(&mut self, location: Location) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| Error::new(ErrorKind::StackUnderflow, location, "Stack underflow"))
    }

    fn pop_int(&mut self, location: Location) -> Result<i64> {
        self.pop(location)?.as_int().map_err(|error| error.at(location))
    }

    fn pop_real(&mut self, location: Location) -> Result<f64> {
        self.pop(location)?.as_real().map_err(|error| error.at(location))
    }

    fn pop_bool(&mut self, location: Location) -> Result<bool> {
        self.pop(location)?.as_bool().map_err(|error| error.at(location))
    }

    fn pop_rune(&mut self, location: Location) -> Result<char> {
        self.pop(location)?.as_rune().map_err(|error| error.at(location))
    }

    /// Pop β then α, returning them in operand order (α, β).
    fn pop_int_pair(&mut self, location: Location) -> Result<(i64, i64)> {
        let b = self.pop_int(location)?;
        let a = self.pop_int(location)?;
        Ok((a, b))
    }

    fn pop_real_pair(&mut self, location: Location) -> Result<(f64, f64)> {
        let b = self.pop_real(location)?;
        let a = self.pop_real(location)?;
        Ok((a, b))
    }

    fn int_test(&mut self, location: Location, test: fn(i64) -> bool) -> Result<()> {
        let a = self.pop_int(location)?;
        self.push(Value::of_bool(test(a)), location)
    }

    fn real_to_int(
        &mut self,
        location: Location,
        verb: &str,
        round: fn(f64) -> f64,
    ) -> Result<()> {
        let a = self.pop_real(location)?;
        if a.is_nan() {
            return Err(Error::new(
                ErrorKind::Conversion,
                location,
                format!("Cannot {verb} a NaN real value"),
            ));
        }
        self.push_int(round(a) as i64, location)
    }

    fn order(ordering: std::cmp::Ordering) -> i64 {
        match ordering {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }
    }

    fn division_by_zero(location: Location) -> Error {
        Error::new(ErrorKind::DivisionByZero, location, "Division by zero")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A clonable sink so tests can read back what the machine echoed.
    #[derive(Clone, Default)]
    struct SharedOut(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedOut {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedOut {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn vm() -> (Vm, SharedOut) {
        let out = SharedOut::default();
        (Vm::with_output(Box::new(out.clone())), out)
    }

    fn int_const(code: &mut Code, value: i64) {
        let index = code.add_constant(Value::of_int(value).unwrap());
        code.push(Instruction::IConst as u8, Location::default());
        code.push(index as u8, Location::default());
    }

    fn real_const(code: &mut Code, value: f64) {
        let index = code.add_constant(Value::of_real(value));
        code.push(Instruction::RConst as u8, Location::default());
        code.push(index as u8, Location::default());
    }

    fn op(code: &mut Code, instruction: Instruction) {
        code.push(instruction as u8, Location::default());
    }

    #[test]
    fn test_state_machine_success() {
        let (mut machine, _) = vm();
        assert_eq!(machine.state(), VmState::Idle);
        let mut code = Code::new();
        op(&mut code, Instruction::Nop);
        machine.run(&code).unwrap();
        assert_eq!(machine.state(), VmState::Success);
    }

    #[test]
    fn test_int_arithmetic() {
        let (mut machine, out) = vm();
        let mut code = Code::new();
        int_const(&mut code, 1);
        int_const(&mut code, 2);
        op(&mut code, Instruction::IAdd);
        op(&mut code, Instruction::Echo);
        machine.run(&code).unwrap();
        assert_eq!(out.text(), "3\n");
        assert_eq!(machine.stack_depth(), 0);
    }

    #[test]
    fn test_operand_order_of_subtraction() {
        let (mut machine, out) = vm();
        let mut code = Code::new();
        int_const(&mut code, 10);
        int_const(&mut code, 4);
        op(&mut code, Instruction::ISub);
        op(&mut code, Instruction::Echo);
        machine.run(&code).unwrap();
        assert_eq!(out.text(), "6\n");
    }

    #[test]
    fn test_floor_quotient_and_remainder() {
        for (a, b, quo, rem) in [(7, 2, 3, 1), (-7, 2, -4, 1), (7, -2, -4, -1)] {
            let (mut machine, out) = vm();
            let mut code = Code::new();
            int_const(&mut code, a);
            int_const(&mut code, b);
            op(&mut code, Instruction::IQuo);
            op(&mut code, Instruction::Echo);
            int_const(&mut code, a);
            int_const(&mut code, b);
            op(&mut code, Instruction::IRem);
            op(&mut code, Instruction::Echo);
            machine.run(&code).unwrap();
            assert_eq!(out.text(), format!("{quo}\n{rem}\n"), "for {a} and {b}");
        }
    }

    #[test]
    fn test_int_division_promotes_to_real() {
        let (mut machine, out) = vm();
        let mut code = Code::new();
        int_const(&mut code, 1);
        int_const(&mut code, 2);
        op(&mut code, Instruction::IDiv);
        op(&mut code, Instruction::Echo);
        machine.run(&code).unwrap();
        assert_eq!(out.text(), "0.5\n");
    }

    #[test]
    fn test_division_by_zero() {
        let (mut machine, _) = vm();
        let mut code = Code::new();
        int_const(&mut code, 1);
        int_const(&mut code, 0);
        op(&mut code, Instruction::IQuo);
        let error = machine.run(&code).unwrap_err();
        assert_eq!(error.kind, ErrorKind::DivisionByZero);
        assert_eq!(machine.state(), VmState::RuntimeError);
    }

    #[test]
    fn test_int_overflow_is_checked() {
        let (mut machine, _) = vm();
        let mut code = Code::new();
        int_const(&mut code, rill_core::value::INT_MAX);
        int_const(&mut code, 1);
        op(&mut code, Instruction::IAdd);
        let error = machine.run(&code).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValueOverflow);
    }

    #[test]
    fn test_comparisons() {
        for (a, b, expected) in [(3, 5, "-1"), (5, 5, "0"), (7, 5, "1")] {
            let (mut machine, out) = vm();
            let mut code = Code::new();
            int_const(&mut code, a);
            int_const(&mut code, b);
            op(&mut code, Instruction::ICmp);
            op(&mut code, Instruction::Echo);
            machine.run(&code).unwrap();
            assert_eq!(out.text(), format!("{expected}\n"));
        }
    }

    #[test]
    fn test_sign_tests() {
        let (mut machine, out) = vm();
        let mut code = Code::new();
        int_const(&mut code, -3);
        op(&mut code, Instruction::ILtz);
        op(&mut code, Instruction::Echo);
        int_const(&mut code, 0);
        op(&mut code, Instruction::IEqz);
        op(&mut code, Instruction::Echo);
        machine.run(&code).unwrap();
        assert_eq!(out.text(), "true\ntrue\n");
    }

    #[test]
    fn test_conversions() {
        let (mut machine, out) = vm();
        let mut code = Code::new();
        real_const(&mut code, -1.5);
        op(&mut code, Instruction::RFloor);
        op(&mut code, Instruction::Echo);
        real_const(&mut code, -1.5);
        op(&mut code, Instruction::RCeil);
        op(&mut code, Instruction::Echo);
        real_const(&mut code, -1.5);
        op(&mut code, Instruction::RTrunc);
        op(&mut code, Instruction::Echo);
        int_const(&mut code, 0x41);
        op(&mut code, Instruction::IToU);
        op(&mut code, Instruction::Echo);
        machine.run(&code).unwrap();
        assert_eq!(out.text(), "-2\n-1\n-1\nA\n");
    }

    #[test]
    fn test_nan_conversion_fails() {
        let (mut machine, _) = vm();
        let mut code = Code::new();
        real_const(&mut code, f64::NAN);
        op(&mut code, Instruction::RTrunc);
        let error = machine.run(&code).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Conversion);
    }

    #[test]
    fn test_itou_range_check() {
        let (mut machine, _) = vm();
        let mut code = Code::new();
        int_const(&mut code, 0xd800);
        op(&mut code, Instruction::IToU);
        let error = machine.run(&code).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValueOverflow);

        let (mut machine, _) = vm();
        let mut code = Code::new();
        int_const(&mut code, -1);
        op(&mut code, Instruction::IToU);
        assert!(machine.run(&code).is_err());
    }

    #[test]
    fn test_stack_underflow() {
        let (mut machine, _) = vm();
        let mut code = Code::new();
        code.push(Instruction::IAdd as u8, Location::new(2, 7));
        let error = machine.run(&code).unwrap_err();
        assert_eq!(error.kind, ErrorKind::StackUnderflow);
        assert_eq!(error.location, Some(Location::new(2, 7)));
        assert_eq!(machine.state(), VmState::RuntimeError);
    }

    #[test]
    fn test_invalid_opcode() {
        let (mut machine, _) = vm();
        let mut code = Code::new();
        code.push(0xfe, Location::default());
        let error = machine.run(&code).unwrap_err();
        assert!(error.message.contains("Invalid virtual machine instruction"));
        assert_eq!(machine.state(), VmState::RuntimeError);
    }

    #[test]
    fn test_missing_constant_is_a_compile_side_defect() {
        let (mut machine, _) = vm();
        let mut code = Code::new();
        code.push(Instruction::IConst as u8, Location::default());
        code.push(9, Location::default());
        let error = machine.run(&code).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Compiler);
        assert_eq!(machine.state(), VmState::CompileError);
    }

    #[test]
    fn test_net_stack_effect() {
        let (mut machine, _) = vm();
        let mut code = Code::new();
        int_const(&mut code, 1);
        int_const(&mut code, 2);
        op(&mut code, Instruction::IAdd);
        machine.run(&code).unwrap();
        // two pushes, one two-in-one-out instruction
        assert_eq!(machine.stack_depth(), 1);
    }

    #[test]
    fn test_echo_rune_writes_utf8() {
        let (mut machine, out) = vm();
        let mut code = Code::new();
        let index = code.add_constant(Value::of_char('😀'));
        code.push(Instruction::UConst as u8, Location::default());
        code.push(index as u8, Location::default());
        op(&mut code, Instruction::Echo);
        machine.run(&code).unwrap();
        assert_eq!(out.text(), "😀\n");
    }

    #[test]
    fn test_echo_string_constant() {
        let (mut machine, out) = vm();
        let value = machine.heap_mut().string_value("hello");
        let mut code = Code::new();
        let index = code.add_constant(value);
        // string constants ride on the generic pool the same way
        code.push(Instruction::IConst as u8, Location::default());
        code.push(index as u8, Location::default());
        op(&mut code, Instruction::Echo);
        machine.run(&code).unwrap();
        assert_eq!(out.text(), "hello\n");
    }

    #[test]
    fn test_bool_and_signs() {
        let (mut machine, out) = vm();
        let mut code = Code::new();
        op(&mut code, Instruction::True);
        op(&mut code, Instruction::False);
        op(&mut code, Instruction::BEq);
        op(&mut code, Instruction::Echo);
        int_const(&mut code, -9);
        op(&mut code, Instruction::ISign);
        op(&mut code, Instruction::Echo);
        real_const(&mut code, -2.5);
        op(&mut code, Instruction::RSign);
        op(&mut code, Instruction::Echo);
        machine.run(&code).unwrap();
        assert_eq!(out.text(), "false\n-1\n-1.0\n");
    }
}
