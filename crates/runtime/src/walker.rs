//! The tree-walking evaluator.
//!
//! The alternative sink: consumes the resolved expression tree directly
//! and writes echoed values to its output. Unlike the bytecode pipeline it
//! executes control flow, short-circuit logic, string operations and
//! definitions, dispatching on the runtime type of each operand. Constructs
//! without evaluation semantics report `UnimplementedError` and abort the
//! run, like any other runtime error.

use rill_core::{Error, ErrorKind, Heap, Location, Result, StrObj, Value, math};
use rillc::ast::{Expr, ExprKind};
use rillc::token::TokenKind;
use std::collections::HashMap;
use std::io::Write;

pub struct Walker {
    heap: Heap,
    scope: HashMap<String, Value>,
    out: Box<dyn Write>,
}

impl Default for Walker {
    fn default() -> Self {
        Walker::new()
    }
}

impl Walker {
    /// An evaluator that echoes to stdout.
    pub fn new() -> Self {
        Walker::with_output(Box::new(std::io::stdout()))
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        Walker {
            heap: Heap::new(),
            scope: HashMap::new(),
            out,
        }
    }

    /// The heap arena owned by this evaluator; string literals are
    /// allocated here by the frontend.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Evaluate the root expression, yielding its value.
    pub fn run(&mut self, expr: &Expr) -> Result<Value> {
        self.eval(expr)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        let location = expr.location;
        match &expr.kind {
            ExprKind::Literal(value) => Ok(*value),

            ExprKind::Grouped { inner } => self.eval(inner),

            ExprKind::Block { exprs } => {
                let mut last = Value::NOTHING;
                for sub in exprs {
                    last = self.eval(sub)?;
                }
                Ok(last)
            }

            ExprKind::Echo { inner } => {
                let value = self.eval(inner)?;
                let rendered = value.render(&self.heap);
                writeln!(self.out, "{rendered}").map_err(|error| {
                    Error::new(
                        ErrorKind::Str,
                        location,
                        format!("Failed to write to the output stream: {error}"),
                    )
                })?;
                Ok(Value::NOTHING)
            }

            ExprKind::Def { name, value, .. } => {
                let value = self.eval(value)?;
                self.scope.insert(name.text.clone(), value);
                Ok(value)
            }

            ExprKind::Name { name } => {
                self.scope.get(&name.text).copied().ok_or_else(|| {
                    Error::new(
                        ErrorKind::ValueMismatch,
                        location,
                        format!("The name '{}' is not defined", name.text),
                    )
                })
            }

            ExprKind::Unary { op, right } => {
                let right = self.eval(right)?;
                self.eval_unary(*op, right, location)
            }

            ExprKind::Binary { left, op, right } => {
                // Short-circuit operators evaluate their own operands
                if *op == TokenKind::OperatorLogicAnd || *op == TokenKind::OperatorLogicOr {
                    return self.eval_logic(*op, left, right, location);
                }
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.eval_binary(*op, left, right, location)
            }

            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.eval_condition(condition)?;
                if condition {
                    self.eval(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.eval(else_branch)
                } else {
                    Ok(Value::NOTHING)
                }
            }

            // A loop whose body never ran yields nothing
            ExprKind::While { condition, body } => {
                let mut last = Value::NOTHING;
                while self.eval_condition(condition)? {
                    last = self.eval(body)?;
                }
                Ok(last)
            }
            ExprKind::Until { condition, body } => {
                let mut last = Value::NOTHING;
                while !self.eval_condition(condition)? {
                    last = self.eval(body)?;
                }
                Ok(last)
            }

            ExprKind::Sequence { .. } => Err(self.unimplemented(location, "sequence expressions")),
            ExprKind::Record { .. } => Err(self.unimplemented(location, "record expressions")),
            ExprKind::Function { .. } => Err(self.unimplemented(location, "function expressions")),
            ExprKind::Call { .. } => Err(self.unimplemented(location, "call expressions")),
            ExprKind::Get { .. } => Err(self.unimplemented(location, "get expressions")),
            ExprKind::For { .. } => Err(self.unimplemented(location, "for expressions")),
        }
    }

    fn unimplemented(&self, location: Location, what: &str) -> Error {
        Error::new(
            ErrorKind::Unimplemented,
            location,
            format!("Evaluating {what} is not implemented"),
        )
    }

    fn eval_condition(&mut self, condition: &Expr) -> Result<bool> {
        let location = condition.location;
        self.eval(condition)?.as_bool().map_err(|_| {
            Error::new(
                ErrorKind::ValueMismatch,
                location,
                "The condition must evaluate to a Bool",
            )
        })
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn eval_unary(&mut self, op: TokenKind, right: Value, location: Location) -> Result<Value> {
        match op {
            TokenKind::OperatorLogicNot => {
                let value = right.as_bool().map_err(|_| {
                    Error::new(ErrorKind::ValueMismatch, location, "Wrong operand type for not")
                })?;
                Ok(Value::of_bool(!value))
            }

            TokenKind::OperatorSubtract => {
                if right.is_int() {
                    Value::of_int(-right.as_int()?).map_err(|error| error.at(location))
                } else if right.is_real() {
                    Ok(Value::of_real(-right.as_real()?))
                } else {
                    Err(Error::new(
                        ErrorKind::ValueMismatch,
                        location,
                        "Wrong operand type for -",
                    ))
                }
            }

            TokenKind::OperatorLength => {
                let text = self.as_string(right, location, "#")?;
                let length = text.len() as i64;
                Value::of_int(length).map_err(|error| error.at(location))
            }

            TokenKind::OperatorString => {
                if right.is_obj() {
                    // Strings stringify to themselves
                    return Ok(right);
                }
                let rendered = right.render(&self.heap);
                Ok(self.heap.string_value(rendered))
            }

            _ => Err(Error::new(
                ErrorKind::Unimplemented,
                location,
                "Unknown unary operator",
            )),
        }
    }

    fn eval_logic(
        &mut self,
        op: TokenKind,
        left: &Expr,
        right: &Expr,
        location: Location,
    ) -> Result<Value> {
        let test = |walker: &mut Self, side: &Expr| -> Result<bool> {
            walker.eval(side)?.as_bool().map_err(|_| {
                Error::new(
                    ErrorKind::ValueMismatch,
                    location,
                    format!(
                        "Wrong operand type for {}",
                        if op == TokenKind::OperatorLogicAnd { "and" } else { "or" }
                    ),
                )
            })
        };
        let left = test(self, left)?;
        match op {
            TokenKind::OperatorLogicAnd if !left => Ok(Value::FALSE),
            TokenKind::OperatorLogicOr if left => Ok(Value::TRUE),
            _ => Ok(Value::of_bool(test(self, right)?)),
        }
    }

    fn eval_binary(
        &mut self,
        op: TokenKind,
        left: Value,
        right: Value,
        location: Location,
    ) -> Result<Value> {
        match op {
            TokenKind::OperatorMultiply => self.arith(left, right, location, "*", |a, b| a.checked_mul(b), |a, b| a * b),
            TokenKind::OperatorAdd => {
                if left.is_obj() && right.is_obj() {
                    return self.concat(left, right, location);
                }
                self.arith(left, right, location, "+", |a, b| a.checked_add(b), |a, b| a + b)
            }
            TokenKind::OperatorSubtract => {
                self.arith(left, right, location, "-", |a, b| a.checked_sub(b), |a, b| a - b)
            }

            TokenKind::OperatorDivide => {
                if left.is_int() && right.is_int() {
                    let (a, b) = (left.as_int()?, right.as_int()?);
                    if b == 0 {
                        return Err(Error::new(ErrorKind::DivisionByZero, location, "Division by zero"));
                    }
                    Ok(Value::of_real(a as f64 / b as f64))
                } else if left.is_real() && right.is_real() {
                    Ok(Value::of_real(left.as_real()? / right.as_real()?))
                } else {
                    Err(self.operand_error(location, "/"))
                }
            }

            TokenKind::OperatorQuotient => {
                if left.is_int() && right.is_int() {
                    let (a, b) = (left.as_int()?, right.as_int()?);
                    if b == 0 {
                        return Err(Error::new(ErrorKind::DivisionByZero, location, "Division by zero"));
                    }
                    Value::of_int(math::ifloordiv(a, b)).map_err(|error| error.at(location))
                } else if left.is_real() && right.is_real() {
                    Ok(Value::of_real(math::rfloordiv(left.as_real()?, right.as_real()?)))
                } else {
                    Err(self.operand_error(location, "//"))
                }
            }

            TokenKind::OperatorRemainder => {
                if left.is_int() && right.is_int() {
                    let (a, b) = (left.as_int()?, right.as_int()?);
                    if b == 0 {
                        return Err(Error::new(ErrorKind::DivisionByZero, location, "Division by zero"));
                    }
                    Value::of_int(math::ifloorrem(a, b)).map_err(|error| error.at(location))
                } else if left.is_real() && right.is_real() {
                    Ok(Value::of_real(math::rfloorrem(left.as_real()?, right.as_real()?)))
                } else {
                    Err(self.operand_error(location, "%"))
                }
            }

            TokenKind::OperatorCompare => {
                let ordering = self.compare(left, right, location, "<=>")?;
                Value::of_int(ordering).map_err(|error| error.at(location))
            }
            TokenKind::OperatorLess => {
                Ok(Value::of_bool(self.compare(left, right, location, "<")? < 0))
            }
            TokenKind::OperatorLessEqual => {
                Ok(Value::of_bool(self.compare(left, right, location, "<=")? <= 0))
            }
            TokenKind::OperatorGreater => {
                Ok(Value::of_bool(self.compare(left, right, location, ">")? > 0))
            }
            TokenKind::OperatorGreaterEqual => {
                Ok(Value::of_bool(self.compare(left, right, location, ">=")? >= 0))
            }

            TokenKind::OperatorEqual => Ok(Value::of_bool(left == right)),
            TokenKind::OperatorNotEqual => Ok(Value::of_bool(left != right)),

            // Identity is bit-exact: NaN is identical to itself, two equal
            // strings at different handles are not
            TokenKind::OperatorIdentical => Ok(Value::of_bool(left.bits() == right.bits())),
            TokenKind::OperatorNotIdentical => Ok(Value::of_bool(left.bits() != right.bits())),

            TokenKind::OperatorMatch | TokenKind::OperatorNotMatch => {
                Err(self.unimplemented(location, "the match operation"))
            }
            TokenKind::OperatorRange => Err(self.unimplemented(location, "the range operation")),

            _ => Err(Error::new(
                ErrorKind::Unimplemented,
                location,
                "Unknown binary operator",
            )),
        }
    }

    /// Int/Int or Real/Real arithmetic with checked int boxing.
    fn arith(
        &mut self,
        left: Value,
        right: Value,
        location: Location,
        symbol: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        real_op: fn(f64, f64) -> f64,
    ) -> Result<Value> {
        if left.is_int() && right.is_int() {
            let (a, b) = (left.as_int()?, right.as_int()?);
            let result = int_op(a, b).ok_or_else(|| {
                Error::new(
                    ErrorKind::ValueOverflow,
                    location,
                    format!("The result of {symbol} exceeds the int range"),
                )
            })?;
            Value::of_int(result).map_err(|error| error.at(location))
        } else if left.is_real() && right.is_real() {
            Ok(Value::of_real(real_op(left.as_real()?, right.as_real()?)))
        } else {
            Err(self.operand_error(location, symbol))
        }
    }

    /// Three-way comparison over Int, Real, Rune or String operands.
    fn compare(&self, left: Value, right: Value, location: Location, symbol: &str) -> Result<i64> {
        if left.is_int() && right.is_int() {
            return Ok(order(left.as_int()?.cmp(&right.as_int()?)));
        }
        if left.is_real() && right.is_real() {
            let (a, b) = (left.as_real()?, right.as_real()?);
            return Ok(if a < b {
                -1
            } else if a > b {
                1
            } else {
                0
            });
        }
        if left.is_rune() && right.is_rune() {
            return Ok(order(left.as_rune()?.cmp(&right.as_rune()?)));
        }
        if let (Some(a), Some(b)) = (self.try_string(left), self.try_string(right)) {
            return Ok(order(a.compare(b)));
        }
        Err(self.operand_error(location, symbol))
    }

    fn concat(&mut self, left: Value, right: Value, location: Location) -> Result<Value> {
        let (Some(a), Some(b)) = (self.try_string(left), self.try_string(right)) else {
            return Err(self.operand_error(location, "+"));
        };
        let joined = a.concat(b);
        Ok(self.heap.string_value(joined))
    }

    fn try_string(&self, value: Value) -> Option<&StrObj> {
        self.heap.string(value.as_obj().ok()?)
    }

    fn as_string(&self, value: Value, location: Location, symbol: &str) -> Result<&StrObj> {
        self.try_string(value)
            .ok_or_else(|| self.operand_error(location, symbol))
    }

    fn operand_error(&self, location: Location, symbol: &str) -> Error {
        Error::new(
            ErrorKind::ValueMismatch,
            location,
            format!("Wrong operand types for {symbol}"),
        )
    }
}

fn order(ordering: std::cmp::Ordering) -> i64 {
    match ordering {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rillc::lexer::Lexer;
    use rillc::parser::Parser;
    use rillc::reporter::Reporter;
    use rillc::resolver::TypeResolver;
    use rillc::source::Source;
    use std::sync::{Arc, Mutex};

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

    fn run(text: &str) -> (Result<Value>, String) {
        let out = SharedOut::default();
        let mut walker = Walker::with_output(Box::new(out.clone()));
        let source = Source::new("<test>", text);
        let tokens = Lexer::new(&source).tokenize().unwrap();
        let mut reporter = Reporter::new();
        let mut root = Parser::new(tokens, &mut reporter, walker.heap_mut()).parse();
        assert!(!reporter.had_error(), "{:?}", reporter.errors());
        TypeResolver::new(&mut reporter, walker.heap()).resolve(&mut root);
        let result = walker.run(&root);
        (result, out.text())
    }

    fn output(text: &str) -> String {
        let (result, printed) = run(text);
        result.expect("evaluation must succeed");
        printed
    }

    #[test]
    fn test_arithmetic_and_echo() {
        assert_eq!(output("echo 1 + 2"), "3\n");
        assert_eq!(output("echo 7 // 2"), "3\n");
        assert_eq!(output("echo 7 % 2"), "1\n");
        assert_eq!(output("echo 1.5 * 2.0"), "3.0\n");
        assert_eq!(output("echo 1 / 2"), "0.5\n");
    }

    #[test]
    fn test_threeway_compare() {
        assert_eq!(output("echo 3 <=> 5"), "-1\n");
        assert_eq!(output("echo 5 <=> 5"), "0\n");
        assert_eq!(output("echo 7 <=> 5"), "1\n");
        assert_eq!(output("echo 'a' <=> 'b'"), "-1\n");
        assert_eq!(output(r#"echo "abc" <=> "abd""#), "-1\n");
    }

    #[test]
    fn test_comparisons_and_equality() {
        assert_eq!(output("echo 1 < 2"), "true\n");
        assert_eq!(output("echo 2.5 >= 2.5"), "true\n");
        assert_eq!(output("echo 1 == 1"), "true\n");
        assert_eq!(output("echo 1 != 1"), "false\n");
        assert_eq!(output("echo true == true"), "true\n");
    }

    #[test]
    fn test_string_operations() {
        assert_eq!(output(r#"echo "foo" + "bar""#), "foobar\n");
        assert_eq!(output(r#"echo #"abc""#), "3\n");
        assert_eq!(output(r#"echo #"ß😀""#), "2\n");
        assert_eq!(output("echo $42"), "42\n");
        assert_eq!(output("echo $true"), "true\n");
    }

    #[test]
    fn test_logic_operators_short_circuit() {
        assert_eq!(output("echo true and false"), "false\n");
        assert_eq!(output("echo false or true"), "true\n");
        assert_eq!(output("echo not false"), "true\n");
        // the right operand of a short-circuited `and` is never evaluated,
        // so its unbound name cannot fail the run
        assert_eq!(output("echo false and missing"), "false\n");
    }

    #[test]
    fn test_if_expression() {
        assert_eq!(output("if 1 < 2 then echo 'y' else echo 'n'"), "y\n");
        assert_eq!(output("if 1 > 2 then echo 'y' else echo 'n'"), "n\n");
        // an untaken if without an else yields nothing
        assert_eq!(output("def v = if false then 1\necho v"), "nothing\n");
    }

    #[test]
    fn test_def_and_name() {
        assert_eq!(output("def x = 40\necho x + 2"), "42\n");
        assert_eq!(output("def s = \"hi\"\necho s + s"), "hihi\n");
    }

    #[test]
    fn test_undefined_name() {
        let (result, _) = run("echo missing");
        let error = result.unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValueMismatch);
        assert!(error.message.contains("missing"));
    }

    #[test]
    fn test_while_loop_with_false_condition_yields_nothing() {
        assert_eq!(output("def r = while false do echo 99\necho r"), "nothing\n");
    }

    #[test]
    fn test_until_loop_runs_while_condition_is_false() {
        // until with an immediately-true condition never runs its body
        assert_eq!(output("until true do echo 99\necho 1"), "1\n");
    }

    #[test]
    fn test_while_loop_body_with_defs() {
        // the body runs while the condition holds; with constant conditions
        // the interesting cases are zero iterations
        assert_eq!(output("while 1 > 2 do echo 'x'\necho 'done'"), "done\n");
    }

    #[test]
    fn test_division_by_zero() {
        let (result, _) = run("echo 1 // 0");
        assert_eq!(result.unwrap_err().kind, ErrorKind::DivisionByZero);
        let (result, _) = run("echo 1 % 0");
        assert_eq!(result.unwrap_err().kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_identity_vs_equality() {
        // equal ints are also identical
        assert_eq!(output("echo 1 === 1"), "true\n");
        // equal strings at different handles are equal in no sense here:
        // `==` is word equality and `===` is bit identity
        assert_eq!(output(r#"echo "a" == "a""#), "false\n");
        assert_eq!(output(r#"echo "a" === "a""#), "false\n");
        // a bound name is identical to itself
        assert_eq!(output("def s = \"a\"\necho s === s"), "true\n");
    }

    #[test]
    fn test_mixed_operand_types_fail() {
        let (result, _) = run("echo 1 + 2.0");
        assert_eq!(result.unwrap_err().kind, ErrorKind::ValueMismatch);
        let (result, _) = run("echo 'a' + 'b'");
        assert_eq!(result.unwrap_err().kind, ErrorKind::ValueMismatch);
    }

    #[test]
    fn test_condition_must_be_bool() {
        let (result, _) = run("if 1 then 2");
        let error = result.unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValueMismatch);
        assert!(error.message.contains("condition"));
    }

    #[test]
    fn test_unimplemented_constructs() {
        for text in [
            "echo [1, 2]",
            "echo { x: 1 }",
            "for i in 5 do echo i",
            "echo 1 .. 5",
            r#"echo "a" =~ /a/"#,
        ] {
            let (result, _) = run(text);
            assert_eq!(
                result.unwrap_err().kind,
                ErrorKind::Unimplemented,
                "for {text}"
            );
        }
    }

    #[test]
    fn test_block_yields_last_value() {
        let (result, printed) = run("def x =\n  1\n  2\necho x");
        result.unwrap();
        assert_eq!(printed, "2\n");
    }

    #[test]
    fn test_negative_int_overflow_checked() {
        let (result, _) = run(&format!("echo 0 - {} - 2", rill_core::value::INT_MAX));
        assert_eq!(result.unwrap_err().kind, ErrorKind::ValueOverflow);
    }
}
