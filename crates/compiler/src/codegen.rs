//! Lowering of the typed tree to bytecode.
//!
//! Each operator lowers to the instruction variant picked by the resolved
//! operand types. An ill-typed or unimplemented node reports through the
//! [`Reporter`] and emits nothing, so one run surfaces every lowering
//! problem at once; callers check the reporter before handing the code to
//! the virtual machine.

use crate::ast::{Expr, ExprKind};
use crate::reporter::Reporter;
use crate::token::TokenKind;
use rill_core::{Code, Error, ErrorKind, Instruction, Location, TypeKind, Value};
use tracing::debug;

pub struct Compiler<'a> {
    code: &'a mut Code,
    reporter: &'a mut Reporter,
}

impl<'a> Compiler<'a> {
    pub fn new(code: &'a mut Code, reporter: &'a mut Reporter) -> Self {
        Compiler { code, reporter }
    }

    /// Compile the root expression.
    pub fn compile(&mut self, expr: &Expr) {
        self.emit_expr(expr);
        debug!(bytes = self.code.len(), "compiled bytecode");
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn emit(&mut self, instruction: Instruction, location: Location) {
        self.code.push(instruction as u8, location);
    }

    fn emit_with_operand(&mut self, instruction: Instruction, operand: u8, location: Location) {
        self.emit(instruction, location);
        self.code.push(operand, location);
    }

    /// Emit the load of a literal value: the fixed patterns have dedicated
    /// instructions, everything else goes through the constant pool.
    fn emit_constant(&mut self, value: Value, location: Location) {
        if value.is_nothing() {
            self.emit(Instruction::Nil, location);
        } else if value.is_false() {
            self.emit(Instruction::False, location);
        } else if value.is_true() {
            self.emit(Instruction::True, location);
        } else if value.is_int() {
            self.emit_pooled(Instruction::IConst, value, location);
        } else if value.is_real() {
            self.emit_pooled(Instruction::RConst, value, location);
        } else if value.is_rune() {
            self.emit_pooled(Instruction::UConst, value, location);
        } else if value.is_obj() {
            // String and regex literals; the pool load is untyped
            self.emit_pooled(Instruction::IConst, value, location);
        } else {
            self.report(
                ErrorKind::Compiler,
                location,
                "No constant instruction for this value".to_string(),
            );
        }
    }

    fn emit_pooled(&mut self, instruction: Instruction, value: Value, location: Location) {
        let index = self.code.add_constant(value);
        match u8::try_from(index) {
            Ok(operand) => self.emit_with_operand(instruction, operand, location),
            Err(_) => self.report(
                ErrorKind::Compiler,
                location,
                "Too many constants in one block of code".to_string(),
            ),
        }
    }

    fn report(&mut self, kind: ErrorKind, location: Location, message: String) {
        self.reporter.report(Error::new(kind, location, message));
    }

    fn unimplemented(&mut self, location: Location, what: &str) {
        self.report(
            ErrorKind::Unimplemented,
            location,
            format!("Compiling {what} is not implemented in the bytecode backend"),
        );
    }

    // =========================================================================
    // Expression lowering
    // =========================================================================

    fn emit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(value) => self.emit_constant(*value, expr.location),

            ExprKind::Grouped { inner } => self.emit_expr(inner),

            ExprKind::Block { exprs } => {
                for sub in exprs {
                    self.emit_expr(sub);
                }
            }

            ExprKind::Echo { inner } => {
                self.emit_expr(inner);
                self.emit(Instruction::Echo, expr.location);
            }

            ExprKind::Unary { op, right } => self.emit_unary(expr, *op, right),

            ExprKind::Binary { left, op, right } => self.emit_binary(expr, left, *op, right),

            ExprKind::Name { .. } => self.unimplemented(expr.location, "name expressions"),
            ExprKind::Sequence { .. } => self.unimplemented(expr.location, "sequence expressions"),
            ExprKind::Record { .. } => self.unimplemented(expr.location, "record expressions"),
            ExprKind::Function { .. } => self.unimplemented(expr.location, "function expressions"),
            ExprKind::Call { .. } => self.unimplemented(expr.location, "call expressions"),
            ExprKind::Get { .. } => self.unimplemented(expr.location, "get expressions"),
            ExprKind::If { .. } => self.unimplemented(expr.location, "if expressions"),
            ExprKind::For { .. } => self.unimplemented(expr.location, "for expressions"),
            ExprKind::While { .. } => self.unimplemented(expr.location, "while expressions"),
            ExprKind::Until { .. } => self.unimplemented(expr.location, "until expressions"),
            ExprKind::Def { .. } => self.unimplemented(expr.location, "def declarations"),
        }
    }

    fn emit_unary(&mut self, expr: &Expr, op: TokenKind, right: &Expr) {
        // The logic operators never reach instruction selection
        if op == TokenKind::OperatorLogicNot {
            self.unimplemented(expr.location, "the logic not operation");
            return;
        }

        self.emit_expr(right);

        match op {
            TokenKind::OperatorSubtract => {
                if right.has_type(TypeKind::Int) {
                    self.emit(Instruction::INeg, expr.location);
                } else if right.has_type(TypeKind::Real) {
                    self.emit(Instruction::RNeg, expr.location);
                } else {
                    self.report(
                        ErrorKind::Compiler,
                        expr.location,
                        "Wrong operand type for -".to_string(),
                    );
                }
            }
            TokenKind::OperatorLength => self.unimplemented(expr.location, "the length operation"),
            TokenKind::OperatorString => self.unimplemented(expr.location, "the string operation"),
            _ => self.report(
                ErrorKind::Compiler,
                expr.location,
                "Unknown unary operator".to_string(),
            ),
        }
    }

    fn emit_binary(&mut self, expr: &Expr, left: &Expr, op: TokenKind, right: &Expr) {
        // Short-circuit operators have no straight-line lowering
        if op == TokenKind::OperatorLogicAnd || op == TokenKind::OperatorLogicOr {
            self.unimplemented(expr.location, "the logic operations");
            return;
        }

        let both = |kind: TypeKind| left.has_type(kind) && right.has_type(kind);
        let location = expr.location;

        // Real equality emits its operands itself: the NaN probe needs them
        // a second time
        if both(TypeKind::Real)
            && matches!(op, TokenKind::OperatorEqual | TokenKind::OperatorNotEqual)
        {
            self.emit_real_equal(left, right, location);
            if op == TokenKind::OperatorNotEqual {
                self.emit(Instruction::Not, location);
            }
            return;
        }

        self.emit_expr(left);
        self.emit_expr(right);

        match op {
            TokenKind::OperatorMultiply => {
                self.emit_arith(both, location, Instruction::IMul, Instruction::RMul, "*");
            }
            TokenKind::OperatorDivide => {
                self.emit_arith(both, location, Instruction::IDiv, Instruction::RDiv, "/");
            }
            TokenKind::OperatorQuotient => {
                self.emit_arith(both, location, Instruction::IQuo, Instruction::RQuo, "//");
            }
            TokenKind::OperatorRemainder => {
                self.emit_arith(both, location, Instruction::IRem, Instruction::RRem, "%");
            }
            TokenKind::OperatorAdd => {
                self.emit_arith(both, location, Instruction::IAdd, Instruction::RAdd, "+");
            }
            TokenKind::OperatorSubtract => {
                self.emit_arith(both, location, Instruction::ISub, Instruction::RSub, "-");
            }

            TokenKind::OperatorCompare => {
                self.emit_compare(both, location, "<=>");
            }

            // Ordering operators lower as a compare and a sign test
            TokenKind::OperatorLess => {
                self.emit_compare(both, location, "<");
                self.emit(Instruction::ILtz, location);
            }
            TokenKind::OperatorLessEqual => {
                self.emit_compare(both, location, "<=");
                self.emit(Instruction::ILez, location);
            }
            TokenKind::OperatorGreater => {
                self.emit_compare(both, location, ">");
                self.emit(Instruction::IGtz, location);
            }
            TokenKind::OperatorGreaterEqual => {
                self.emit_compare(both, location, ">=");
                self.emit(Instruction::IGez, location);
            }

            TokenKind::OperatorEqual => {
                self.emit_equal(both, location);
            }
            TokenKind::OperatorNotEqual => {
                self.emit_equal(both, location);
                self.emit(Instruction::Not, location);
            }

            TokenKind::OperatorMatch | TokenKind::OperatorNotMatch => {
                self.unimplemented(location, "the match operation");
            }
            TokenKind::OperatorIdentical | TokenKind::OperatorNotIdentical => {
                self.unimplemented(location, "the identity operation");
            }
            TokenKind::OperatorRange => {
                self.unimplemented(location, "the range operation");
            }

            _ => self.report(
                ErrorKind::Compiler,
                location,
                "Unknown binary operator".to_string(),
            ),
        }
    }

    /// Pick the Int or Real variant of an arithmetic instruction.
    fn emit_arith(
        &mut self,
        both: impl Fn(TypeKind) -> bool,
        location: Location,
        int_op: Instruction,
        real_op: Instruction,
        symbol: &str,
    ) {
        if both(TypeKind::Int) {
            self.emit(int_op, location);
        } else if both(TypeKind::Real) {
            self.emit(real_op, location);
        } else {
            self.report(
                ErrorKind::Compiler,
                location,
                format!("Wrong operand types for {symbol}"),
            );
        }
    }

    /// Emit the three-way compare for the operand type.
    fn emit_compare(&mut self, both: impl Fn(TypeKind) -> bool, location: Location, symbol: &str) {
        if both(TypeKind::Int) {
            self.emit(Instruction::ICmp, location);
        } else if both(TypeKind::Real) {
            self.emit(Instruction::RCmp, location);
        } else if both(TypeKind::Rune) {
            self.emit(Instruction::UCmp, location);
        } else {
            self.report(
                ErrorKind::Compiler,
                location,
                format!("Wrong operand types for {symbol}"),
            );
        }
    }

    /// Equality: Bool gets the dedicated instruction, Int and Rune lower as
    /// compare-then-equals-zero. Real pairs never reach this point; they
    /// take [`Compiler::emit_real_equal`].
    fn emit_equal(&mut self, both: impl Fn(TypeKind) -> bool, location: Location) {
        if both(TypeKind::Bool) {
            self.emit(Instruction::BEq, location);
        } else if both(TypeKind::Int) {
            self.emit(Instruction::ICmp, location);
            self.emit(Instruction::IEqz, location);
        } else if both(TypeKind::Rune) {
            self.emit(Instruction::UCmp, location);
            self.emit(Instruction::IEqz, location);
        } else {
            self.report(
                ErrorKind::Compiler,
                location,
                "Wrong operand types for ==".to_string(),
            );
        }
    }

    /// Real equality with the NaN rule intact.
    ///
    /// `RCMP; IEQZ` alone maps the unordered case to equal, so two NaN
    /// operands would compare true. The operands are evaluated a second
    /// time through `RSIGN` (whose result is NaN exactly when the operand
    /// is, and finite otherwise, so the sum of the two signs is NaN exactly
    /// when either operand is) and `RNAN; NOT` turns that probe into
    /// "neither is NaN". `BEQ` then stands in for the conjunction: whenever
    /// the probe is false the compare half is already true, so the
    /// false/false case cannot occur and bool equality equals bool and.
    ///
    /// Operands in the compilable subset are literals and arithmetic, so
    /// the re-evaluation repeats no side effects; a run that faults does so
    /// on the first evaluation.
    fn emit_real_equal(&mut self, left: &Expr, right: &Expr, location: Location) {
        self.emit_expr(left);
        self.emit_expr(right);
        self.emit(Instruction::RCmp, location);
        self.emit(Instruction::IEqz, location);
        self.emit_expr(left);
        self.emit(Instruction::RSign, location);
        self.emit_expr(right);
        self.emit(Instruction::RSign, location);
        self.emit(Instruction::RAdd, location);
        self.emit(Instruction::RNan, location);
        self.emit(Instruction::Not, location);
        self.emit(Instruction::BEq, location);
    }
}
