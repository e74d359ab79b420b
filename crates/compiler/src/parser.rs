//! Recursive-descent parser.
//!
//! Consumes the token list and produces a root block expression. Binary
//! levels come in two templates: *chaining* (`a + b + c` folds left) and
//! *non-chaining* (`a == b == c` is rejected by leaving the second operator
//! for the caller, which fails on it). Prefix operators are
//! right-recursive. Errors are recorded through the [`Reporter`] and the
//! parser synchronizes to the next NEWLINE, so one run reports as many
//! syntax errors as it can find.

use crate::ast::{Expr, ExprKind, Param, TypeExpr, TypeExprKind};
use crate::literals::{self, QuoteKind};
use crate::reporter::Reporter;
use crate::token::{Token, TokenKind};
use rill_core::{Error, ErrorKind, Heap, Result, Value};

pub struct Parser<'a> {
    tokens: Vec<Token>,
    index: usize,
    reporter: &'a mut Reporter,
    heap: &'a mut Heap,
    /// Comment-only lines preceding a definition, kept as its doc text.
    line_comment: String,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, reporter: &'a mut Reporter, heap: &'a mut Heap) -> Self {
        Parser {
            tokens,
            index: 0,
            reporter,
            heap,
            line_comment: String::new(),
        }
    }

    /// Parse the whole token list into a root block.
    ///
    /// Lines that fail to parse are reported and skipped; the block holds
    /// whatever parsed. Callers check the reporter before executing.
    pub fn parse(&mut self) -> Expr {
        let location = self.next().location;
        let mut exprs = Vec::new();
        while !self.at_end() {
            if let Some(expr) = self.parse_line() {
                exprs.push(expr);
            }
        }
        Expr::new(ExprKind::Block { exprs }, location)
    }

    // =========================================================================
    // Token plumbing
    // =========================================================================

    /// The most recently consumed token.
    fn current(&self) -> &Token {
        &self.tokens[self.index - 1]
    }

    /// The token about to be consumed.
    fn next(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn at_end(&self) -> bool {
        self.next().kind == TokenKind::End
    }

    fn advance(&mut self) -> &Token {
        if !self.at_end() {
            self.index += 1;
        }
        self.current()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.at_end() && self.next().kind == kind
    }

    /// Consume the next token if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_any(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    /// Consume the next token or fail with a syntax error naming the
    /// expected kind and the context.
    fn consume(&mut self, kind: TokenKind, context: &str) -> Result<Token> {
        if self.eat(kind) {
            return Ok(self.current().clone());
        }
        let next = self.next();
        let message = if context.is_empty() {
            format!("Expected {}, but found {}", kind, next.kind)
        } else {
            format!("Expected {} {}, but found {}", kind, context, next.kind)
        };
        Err(Error::new(ErrorKind::Syntax, next.location, message))
    }

    /// Skip tokens until just past the next NEWLINE.
    fn synchronize(&mut self) {
        self.advance();
        while !self.at_end() && self.current().kind != TokenKind::Newline {
            self.advance();
        }
    }

    // =========================================================================
    // Operator templates
    // =========================================================================

    /// `operand (op operand)*`, folding left.
    fn parse_infix_chain(
        &mut self,
        ops: &[TokenKind],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = operand(self)?;
        while self.eat_any(ops) {
            let op = self.current().clone();
            let right = operand(self)?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op: op.kind,
                    right: Box::new(right),
                },
                op.location,
            );
        }
        Ok(left)
    }

    /// `operand (op operand)?`; a second operator at this level is left in
    /// place and rejected by the caller.
    fn parse_infix_single(
        &mut self,
        ops: &[TokenKind],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let left = operand(self)?;
        if self.eat_any(ops) {
            let op = self.current().clone();
            let right = operand(self)?;
            return Ok(Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op: op.kind,
                    right: Box::new(right),
                },
                op.location,
            ));
        }
        Ok(left)
    }

    /// `(op)* operand`, right-recursive.
    fn parse_prefix(
        &mut self,
        ops: &[TokenKind],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        if self.eat_any(ops) {
            let op = self.current().clone();
            let right = self.parse_prefix(ops, operand)?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: op.kind,
                    right: Box::new(right),
                },
                op.location,
            ));
        }
        operand(self)
    }

    // =========================================================================
    // Lines and declarations
    // =========================================================================

    /// Parse one line; errors are reported and resolved by synchronizing.
    fn parse_line(&mut self) -> Option<Expr> {
        match self.parse_line_inner() {
            Ok(expr) => expr,
            Err(error) => {
                self.reporter.report(error);
                self.synchronize();
                None
            }
        }
    }

    /// line → COMMENT* (expression COMMENT?) NEWLINE
    fn parse_line_inner(&mut self) -> Result<Option<Expr>> {
        self.line_comment.clear();
        while self.eat(TokenKind::Comment) {
            let text = self.current().text.clone();
            if !self.line_comment.is_empty() {
                self.line_comment.push('\n');
            }
            self.line_comment.push_str(&text);
            self.consume(TokenKind::Newline, "after comment")?;
        }

        // Comment-only tail of the source
        if self.at_end() {
            return Ok(None);
        }

        let expr = self.parse_expression()?;

        // A trailing comment is discarded
        if self.check(TokenKind::Comment) {
            self.advance();
        }

        // A block already consumed its closing DEDENT in place of a newline
        if self.current().kind != TokenKind::Dedent {
            self.consume(TokenKind::Newline, "after expression")?;
        }
        Ok(Some(expr))
    }

    /// expression → def | control
    fn parse_expression(&mut self) -> Result<Expr> {
        if self.eat(TokenKind::KeywordDef) {
            return self.parse_def();
        }
        self.parse_control()
    }

    /// def → 'def' IDENTIFIER ('(' parameters ')')? (':' type)? '=' control
    fn parse_def(&mut self) -> Result<Expr> {
        let keyword = self.current().clone();
        let name = self.consume(TokenKind::Identifier, "in def declaration")?;
        let doc = (!self.line_comment.is_empty()).then(|| std::mem::take(&mut self.line_comment));

        if self.eat(TokenKind::ParenthesisLeft) {
            // Function declaration
            let token = self.current().clone();
            let params = self.parse_parameters()?;
            let return_type = if self.eat(TokenKind::SymbolColon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            self.consume(TokenKind::OperatorAssign, "in def declaration")?;
            let body = self.parse_control()?;
            let function = Expr::new(
                ExprKind::Function {
                    token: token.clone(),
                    params,
                    return_type,
                    body: Box::new(body),
                },
                token.location,
            );
            return Ok(Expr::new(
                ExprKind::Def {
                    name,
                    ty: None,
                    value: Box::new(function),
                    doc,
                },
                keyword.location,
            ));
        }

        // Value declaration
        let ty = if self.eat(TokenKind::SymbolColon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.consume(TokenKind::OperatorAssign, "in def declaration")?;
        let value = self.parse_control()?;
        Ok(Expr::new(
            ExprKind::Def {
                name,
                ty,
                value: Box::new(value),
                doc,
            },
            keyword.location,
        ))
    }

    /// control → echo | if | for | while | until | block | operation
    fn parse_control(&mut self) -> Result<Expr> {
        if self.eat(TokenKind::KeywordEcho) {
            return self.parse_echo();
        }
        if self.eat(TokenKind::KeywordIf) {
            return self.parse_if();
        }
        if self.eat(TokenKind::KeywordFor) {
            return self.parse_for();
        }
        if self.eat(TokenKind::KeywordWhile) {
            return self.parse_while();
        }
        if self.eat(TokenKind::KeywordUntil) {
            return self.parse_until();
        }
        if self.eat(TokenKind::Newline) {
            return self.parse_block();
        }
        self.parse_operation()
    }

    /// echo → 'echo' operation
    fn parse_echo(&mut self) -> Result<Expr> {
        let keyword = self.current().clone();
        let inner = self.parse_operation()?;
        Ok(Expr::new(
            ExprKind::Echo {
                inner: Box::new(inner),
            },
            keyword.location,
        ))
    }

    /// if → 'if' operation 'then' expression ('else' expression)?
    fn parse_if(&mut self) -> Result<Expr> {
        let keyword = self.current().clone();
        let condition = self.parse_operation()?;
        self.consume(TokenKind::KeywordThen, "in if expression")?;
        let then_branch = self.parse_expression()?;
        let else_branch = if self.eat(TokenKind::KeywordElse) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            keyword.location,
        ))
    }

    /// for → 'for' IDENTIFIER 'in' operation 'do' expression
    fn parse_for(&mut self) -> Result<Expr> {
        let keyword = self.current().clone();
        let name = self.consume(TokenKind::Identifier, "in for expression")?;
        self.consume(TokenKind::KeywordIn, "in for expression")?;
        let iterable = self.parse_operation()?;
        self.consume(TokenKind::KeywordDo, "in for expression")?;
        let body = self.parse_expression()?;
        Ok(Expr::new(
            ExprKind::For {
                name,
                iterable: Box::new(iterable),
                body: Box::new(body),
            },
            keyword.location,
        ))
    }

    /// while → 'while' operation 'do' expression
    fn parse_while(&mut self) -> Result<Expr> {
        let keyword = self.current().clone();
        let condition = self.parse_operation()?;
        self.consume(TokenKind::KeywordDo, "in while expression")?;
        let body = self.parse_expression()?;
        Ok(Expr::new(
            ExprKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
            keyword.location,
        ))
    }

    /// until → 'until' operation 'do' expression
    fn parse_until(&mut self) -> Result<Expr> {
        let keyword = self.current().clone();
        let condition = self.parse_operation()?;
        self.consume(TokenKind::KeywordDo, "in until expression")?;
        let body = self.parse_expression()?;
        Ok(Expr::new(
            ExprKind::Until {
                condition: Box::new(condition),
                body: Box::new(body),
            },
            keyword.location,
        ))
    }

    /// block → NEWLINE INDENT line+ DEDENT
    fn parse_block(&mut self) -> Result<Expr> {
        let open = self.consume(TokenKind::Indent, "in block")?;
        let mut exprs = Vec::new();
        loop {
            if let Some(expr) = self.parse_line() {
                exprs.push(expr);
            }
            if self.eat(TokenKind::Dedent) || self.at_end() {
                break;
            }
        }
        Ok(Expr::new(ExprKind::Block { exprs }, open.location))
    }

    // =========================================================================
    // Operations, by precedence
    // =========================================================================

    /// operation → logic_or
    fn parse_operation(&mut self) -> Result<Expr> {
        self.parse_logic_or()
    }

    /// logic_or → logic_and ('or' logic_and)*
    fn parse_logic_or(&mut self) -> Result<Expr> {
        self.parse_infix_chain(&[TokenKind::OperatorLogicOr], Self::parse_logic_and)
    }

    /// logic_and → logic_not ('and' logic_not)*
    fn parse_logic_and(&mut self) -> Result<Expr> {
        self.parse_infix_chain(&[TokenKind::OperatorLogicAnd], Self::parse_logic_not)
    }

    /// logic_not → 'not' logic_not | equality
    fn parse_logic_not(&mut self) -> Result<Expr> {
        self.parse_prefix(&[TokenKind::OperatorLogicNot], Self::parse_equality)
    }

    /// equality → comparison (('==' | '!=' | '===' | '!==') comparison)?
    fn parse_equality(&mut self) -> Result<Expr> {
        self.parse_infix_single(
            &[
                TokenKind::OperatorEqual,
                TokenKind::OperatorNotEqual,
                TokenKind::OperatorIdentical,
                TokenKind::OperatorNotIdentical,
            ],
            Self::parse_comparison,
        )
    }

    /// comparison → threeway (('<' | '<=' | '>' | '>=' | '=~' | '!~') threeway)?
    fn parse_comparison(&mut self) -> Result<Expr> {
        self.parse_infix_single(
            &[
                TokenKind::OperatorLess,
                TokenKind::OperatorLessEqual,
                TokenKind::OperatorGreater,
                TokenKind::OperatorGreaterEqual,
                TokenKind::OperatorMatch,
                TokenKind::OperatorNotMatch,
            ],
            Self::parse_threeway,
        )
    }

    /// threeway → range ('<=>' range)?
    fn parse_threeway(&mut self) -> Result<Expr> {
        self.parse_infix_single(&[TokenKind::OperatorCompare], Self::parse_range)
    }

    /// range → term ('..' term)?
    fn parse_range(&mut self) -> Result<Expr> {
        self.parse_infix_single(&[TokenKind::OperatorRange], Self::parse_term)
    }

    /// term → factor (('+' | '-') factor)*
    fn parse_term(&mut self) -> Result<Expr> {
        self.parse_infix_chain(
            &[TokenKind::OperatorAdd, TokenKind::OperatorSubtract],
            Self::parse_factor,
        )
    }

    /// factor → unary (('*' | '/' | '//' | '%') unary)*
    fn parse_factor(&mut self) -> Result<Expr> {
        self.parse_infix_chain(
            &[
                TokenKind::OperatorMultiply,
                TokenKind::OperatorDivide,
                TokenKind::OperatorQuotient,
                TokenKind::OperatorRemainder,
            ],
            Self::parse_unary,
        )
    }

    /// unary → ('-' | '#' | '$') unary | primary
    fn parse_unary(&mut self) -> Result<Expr> {
        self.parse_prefix(
            &[
                TokenKind::OperatorSubtract,
                TokenKind::OperatorLength,
                TokenKind::OperatorString,
            ],
            Self::parse_primary,
        )
    }

    /// primary → atom ('(' arguments? ')' | '.' IDENTIFIER)*
    fn parse_primary(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(TokenKind::ParenthesisLeft) {
                let token = self.current().clone();
                let args = self.parse_arguments()?;
                let location = expr.location;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        token,
                        args,
                    },
                    location,
                );
            } else if self.eat(TokenKind::SymbolDot) {
                let name = self.consume(TokenKind::Identifier, "in get expression")?;
                let location = expr.location;
                expr = Expr::new(
                    ExprKind::Get {
                        object: Box::new(expr),
                        name,
                    },
                    location,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    // =========================================================================
    // Atoms
    // =========================================================================

    /// atom → literal | name | sequence | record | lambda | grouped
    fn parse_atom(&mut self) -> Result<Expr> {
        let token = self.next().clone();
        match token.kind {
            TokenKind::KeywordNothing => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::NOTHING), token.location))
            }
            TokenKind::KeywordFalse => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::FALSE), token.location))
            }
            TokenKind::KeywordTrue => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::TRUE), token.location))
            }
            TokenKind::LiteralInt => {
                self.advance();
                let parsed = literals::parse_int(&token.text)
                    .and_then(Value::of_int)
                    .map_err(|error| error.at(token.location))?;
                Ok(Expr::new(ExprKind::Literal(parsed), token.location))
            }
            TokenKind::LiteralReal => {
                self.advance();
                let parsed = literals::parse_real(&token.text)
                    .map_err(|error| error.at(token.location))?;
                Ok(Expr::new(
                    ExprKind::Literal(Value::of_real(parsed)),
                    token.location,
                ))
            }
            TokenKind::LiteralRune => {
                self.advance();
                let rune = literals::parse_rune(&token.text)
                    .map_err(|error| error.at(token.location))?;
                Ok(Expr::new(
                    ExprKind::Literal(Value::of_char(rune)),
                    token.location,
                ))
            }
            TokenKind::LiteralString => {
                self.advance();
                let decoded = literals::unescape(&token.text, QuoteKind::Double)
                    .map_err(|error| error.at(token.location))?;
                let value = self.heap.string_value(decoded);
                Ok(Expr::new(ExprKind::Literal(value), token.location))
            }
            TokenKind::LiteralRegex => {
                self.advance();
                // The pattern body stays raw; its own escapes are not ours
                let value = self.heap.string_value(token.text.clone());
                Ok(Expr::new(ExprKind::Literal(value), token.location))
            }
            TokenKind::Identifier => {
                self.advance();
                let name = self.current().clone();
                Ok(Expr::new(ExprKind::Name { name }, token.location))
            }
            TokenKind::SquareBracketLeft => {
                self.advance();
                self.parse_sequence()
            }
            TokenKind::CurlyBracketLeft => {
                self.advance();
                self.parse_record()
            }
            TokenKind::SymbolBackslash => {
                self.advance();
                self.parse_lambda()
            }
            TokenKind::ParenthesisLeft => {
                self.advance();
                self.parse_grouped()
            }
            _ => Err(Error::new(
                ErrorKind::Syntax,
                token.location,
                format!("Expected atom, but found {}", token.kind),
            )),
        }
    }

    /// sequence → '[' expression (',' expression)* ']'
    fn parse_sequence(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let mut items = Vec::new();
        loop {
            items.push(self.parse_expression()?);
            if !self.eat(TokenKind::SymbolComma) {
                break;
            }
        }
        self.consume(TokenKind::SquareBracketRight, "in sequence atom")?;
        Ok(Expr::new(
            ExprKind::Sequence {
                token: token.clone(),
                items,
            },
            token.location,
        ))
    }

    /// record → '{' IDENTIFIER ':' expression (',' …)* '}'
    fn parse_record(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let mut items = Vec::new();
        loop {
            let name = self.consume(TokenKind::Identifier, "in record atom")?;
            self.consume(TokenKind::SymbolColon, "in record atom")?;
            items.push((name.text, self.parse_expression()?));
            if !self.eat(TokenKind::SymbolComma) {
                break;
            }
        }
        self.consume(TokenKind::CurlyBracketRight, "in record atom")?;
        Ok(Expr::new(
            ExprKind::Record {
                token: token.clone(),
                items,
            },
            token.location,
        ))
    }

    /// lambda → '\' '(' parameters? ')' (':' type)? '=' control
    fn parse_lambda(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        self.consume(TokenKind::ParenthesisLeft, "in lambda atom")?;
        let params = self.parse_parameters()?;
        let return_type = if self.eat(TokenKind::SymbolColon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.consume(TokenKind::OperatorAssign, "in lambda atom")?;
        let body = self.parse_control()?;
        Ok(Expr::new(
            ExprKind::Function {
                token: token.clone(),
                params,
                return_type,
                body: Box::new(body),
            },
            token.location,
        ))
    }

    /// grouped → '(' expression ')'
    fn parse_grouped(&mut self) -> Result<Expr> {
        let location = self.current().location;
        let inner = self.parse_expression()?;
        self.consume(TokenKind::ParenthesisRight, "in grouped atom")?;
        Ok(Expr::new(
            ExprKind::Grouped {
                inner: Box::new(inner),
            },
            location,
        ))
    }

    // =========================================================================
    // Parameters and arguments
    // =========================================================================

    /// parameters → (IDENTIFIER ':' type (',' IDENTIFIER ':' type)*)? ')'
    fn parse_parameters(&mut self) -> Result<Vec<Param>> {
        let mut params = Vec::new();
        if !self.check(TokenKind::ParenthesisRight) {
            loop {
                let name = self.consume(TokenKind::Identifier, "in parameters")?;
                self.consume(TokenKind::SymbolColon, "in parameters")?;
                let ty = self.parse_type()?;
                params.push(Param { name, ty });
                if !self.eat(TokenKind::SymbolComma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::ParenthesisRight, "in parameters")?;
        Ok(params)
    }

    /// arguments → (control (',' control)*)? ')'
    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(TokenKind::ParenthesisRight) {
            loop {
                args.push(self.parse_control()?);
                if !self.eat(TokenKind::SymbolComma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::ParenthesisRight, "in arguments")?;
        Ok(args)
    }

    // =========================================================================
    // Type expressions
    // =========================================================================

    /// type → type_union
    fn parse_type(&mut self) -> Result<TypeExpr> {
        self.parse_type_union()
    }

    /// type_union → type_intersection ('|' type_intersection)*
    fn parse_type_union(&mut self) -> Result<TypeExpr> {
        let mut left = self.parse_type_intersection()?;
        while self.eat(TokenKind::OperatorUnion) {
            let location = self.current().location;
            let right = self.parse_type_intersection()?;
            left = TypeExpr::new(
                TypeExprKind::Union {
                    left: Box::new(left),
                    right: Box::new(right),
                },
                location,
            );
        }
        Ok(left)
    }

    /// type_intersection → type_maybe ('&' type_maybe)*
    fn parse_type_intersection(&mut self) -> Result<TypeExpr> {
        let mut left = self.parse_type_maybe()?;
        while self.eat(TokenKind::OperatorIntersection) {
            let location = self.current().location;
            let right = self.parse_type_maybe()?;
            left = TypeExpr::new(
                TypeExprKind::Intersection {
                    left: Box::new(left),
                    right: Box::new(right),
                },
                location,
            );
        }
        Ok(left)
    }

    /// type_maybe → type_generic ('?')?
    fn parse_type_maybe(&mut self) -> Result<TypeExpr> {
        let base = self.parse_type_generic()?;
        if self.eat(TokenKind::OperatorMaybe) {
            let location = self.current().location;
            return Ok(TypeExpr::new(
                TypeExprKind::Maybe {
                    base: Box::new(base),
                },
                location,
            ));
        }
        Ok(base)
    }

    /// type_generic → IDENTIFIER ('[' type (',' type)* ']')? | '(' type ')'
    fn parse_type_generic(&mut self) -> Result<TypeExpr> {
        if self.eat(TokenKind::ParenthesisLeft) {
            let location = self.current().location;
            let inner = self.parse_type()?;
            self.consume(TokenKind::ParenthesisRight, "in grouped type")?;
            return Ok(TypeExpr::new(
                TypeExprKind::Grouped {
                    inner: Box::new(inner),
                },
                location,
            ));
        }

        let name = self.consume(TokenKind::Identifier, "in type")?;
        let base = TypeExpr::new(
            TypeExprKind::Name { name: name.clone() },
            name.location,
        );

        if self.eat(TokenKind::SquareBracketLeft) {
            if self.check(TokenKind::SquareBracketRight) {
                return Err(Error::new(
                    ErrorKind::Syntax,
                    self.next().location,
                    format!("Expected type, but found {}", self.next().kind),
                ));
            }
            let mut args = Vec::new();
            loop {
                args.push(self.parse_type()?);
                if !self.eat(TokenKind::SymbolComma) {
                    break;
                }
            }
            self.consume(TokenKind::SquareBracketRight, "in type arguments")?;
            return Ok(TypeExpr::new(
                TypeExprKind::Generic {
                    base: Box::new(base),
                    args,
                },
                name.location,
            ));
        }

        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::source::Source;

    fn parse(text: &str) -> (Expr, Reporter, Heap) {
        let source = Source::new("<test>", text);
        let tokens = Lexer::new(&source).tokenize().expect("lexing must succeed");
        let mut reporter = Reporter::new();
        let mut heap = Heap::new();
        let root = Parser::new(tokens, &mut reporter, &mut heap).parse();
        (root, reporter, heap)
    }

    fn single(text: &str) -> Expr {
        let (root, reporter, _) = parse(text);
        assert!(!reporter.had_error(), "unexpected errors: {:?}", reporter.errors());
        let ExprKind::Block { mut exprs } = root.kind else {
            panic!("root must be a block");
        };
        assert_eq!(exprs.len(), 1);
        exprs.remove(0)
    }

    #[test]
    fn test_echo_with_binary_operand() {
        let expr = single("echo 1 + 2");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        let ExprKind::Binary { op, .. } = inner.kind else {
            panic!("expected binary operand");
        };
        assert_eq!(op, TokenKind::OperatorAdd);
    }

    #[test]
    fn test_factor_binds_tighter_than_term() {
        let expr = single("echo 1 + 2 * 3");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        let ExprKind::Binary { op, left, right } = inner.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, TokenKind::OperatorAdd);
        assert!(matches!(left.kind, ExprKind::Literal(_)));
        let ExprKind::Binary { op: inner_op, .. } = right.kind else {
            panic!("expected nested binary");
        };
        assert_eq!(inner_op, TokenKind::OperatorMultiply);
    }

    #[test]
    fn test_term_chains_left() {
        let expr = single("echo 1 - 2 - 3");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        let ExprKind::Binary { left, op, .. } = inner.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, TokenKind::OperatorSubtract);
        // the left operand is itself `1 - 2`
        assert!(matches!(
            left.kind,
            ExprKind::Binary {
                op: TokenKind::OperatorSubtract,
                ..
            }
        ));
    }

    #[test]
    fn test_comparison_does_not_chain() {
        let (_, reporter, _) = parse("echo 1 < 2 < 3");
        assert!(reporter.had_error());
        let message = &reporter.errors()[0].message;
        assert!(message.contains("Expected newline"), "got: {message}");
    }

    #[test]
    fn test_unary_is_right_recursive() {
        let expr = single("echo - -3");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        let ExprKind::Unary { op, right } = inner.kind else {
            panic!("expected unary");
        };
        assert_eq!(op, TokenKind::OperatorSubtract);
        // `-3` lexes as a negative int literal, so the outer minus wraps it
        assert!(matches!(right.kind, ExprKind::Literal(_)));
    }

    #[test]
    fn test_value_def() {
        let expr = single("def answer = 42");
        let ExprKind::Def { name, ty, value, doc } = expr.kind else {
            panic!("expected def");
        };
        assert_eq!(name.text, "answer");
        assert!(ty.is_none());
        assert!(doc.is_none());
        assert!(matches!(value.kind, ExprKind::Literal(_)));
    }

    #[test]
    fn test_typed_def() {
        let expr = single("def answer: Int = 42");
        let ExprKind::Def { ty, .. } = expr.kind else {
            panic!("expected def");
        };
        assert!(matches!(
            ty.unwrap().kind,
            TypeExprKind::Name { .. }
        ));
    }

    #[test]
    fn test_function_def() {
        let expr = single("def double(x: Int): Int = x * 2");
        let ExprKind::Def { name, value, .. } = expr.kind else {
            panic!("expected def");
        };
        assert_eq!(name.text, "double");
        let ExprKind::Function { params, return_type, .. } = value.kind else {
            panic!("expected function value");
        };
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name.text, "x");
        assert!(return_type.is_some());
    }

    #[test]
    fn test_doc_comment_attaches_to_def() {
        let expr = single("-- the answer\n-- to everything\ndef answer = 42");
        let ExprKind::Def { doc, .. } = expr.kind else {
            panic!("expected def");
        };
        assert_eq!(doc.as_deref(), Some("the answer\nto everything"));
    }

    #[test]
    fn test_if_then_else() {
        let expr = single("if true then 1 else 2");
        let ExprKind::If { else_branch, .. } = expr.kind else {
            panic!("expected if");
        };
        assert!(else_branch.is_some());
    }

    #[test]
    fn test_while_with_indented_block() {
        let (root, reporter, _) = parse("while false do\n  echo 1\n  echo 2\necho 3");
        assert!(!reporter.had_error(), "{:?}", reporter.errors());
        let ExprKind::Block { exprs } = root.kind else {
            panic!("root must be a block");
        };
        assert_eq!(exprs.len(), 2);
        let ExprKind::While { body, .. } = &exprs[0].kind else {
            panic!("expected while");
        };
        let ExprKind::Block { exprs: body_exprs } = &body.kind else {
            panic!("expected block body");
        };
        assert_eq!(body_exprs.len(), 2);
    }

    #[test]
    fn test_sequence_record_lambda_atoms() {
        let expr = single("echo [1, 2, 3]");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        assert!(matches!(inner.kind, ExprKind::Sequence { ref items, .. } if items.len() == 3));

        let expr = single("echo { x: 1, y: 2 }");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        let ExprKind::Record { items, .. } = inner.kind else {
            panic!("expected record");
        };
        assert_eq!(items[0].0, "x");
        assert_eq!(items[1].0, "y");

        let expr = single(r"echo \(x: Int) = x");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        assert!(matches!(inner.kind, ExprKind::Function { .. }));
    }

    #[test]
    fn test_call_and_get_postfix_chain() {
        let expr = single("echo point.x(1, 2).y");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        let ExprKind::Get { object, name } = inner.kind else {
            panic!("expected outer get");
        };
        assert_eq!(name.text, "y");
        let ExprKind::Call { callee, args, .. } = object.kind else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(callee.kind, ExprKind::Get { .. }));
    }

    #[test]
    fn test_string_literal_allocates_on_heap() {
        let (root, reporter, heap) = parse(r#"echo "hi\n""#);
        assert!(!reporter.had_error());
        assert_eq!(heap.len(), 1);
        let ExprKind::Block { exprs } = root.kind else {
            panic!("root must be a block");
        };
        let ExprKind::Echo { inner } = &exprs[0].kind else {
            panic!("expected echo");
        };
        let ExprKind::Literal(value) = &inner.kind else {
            panic!("expected literal");
        };
        assert_eq!(value.render(&heap), "hi\n");
    }

    #[test]
    fn test_int_literal_overflow_is_reported() {
        let (_, reporter, _) = parse("echo 281474976710656"); // 2^48
        assert!(reporter.had_error());
        assert_eq!(reporter.errors()[0].kind, ErrorKind::ValueOverflow);
    }

    #[test]
    fn test_multiple_errors_in_one_run() {
        let (_, reporter, _) = parse("echo +\necho 2\necho *");
        assert_eq!(reporter.errors().len(), 2);
        assert!(reporter.errors().iter().all(|e| e.kind == ErrorKind::Syntax));
    }

    #[test]
    fn test_error_recovery_keeps_good_lines() {
        let (root, reporter, _) = parse("echo +\necho 2");
        assert!(reporter.had_error());
        let ExprKind::Block { exprs } = root.kind else {
            panic!("root must be a block");
        };
        assert_eq!(exprs.len(), 1);
    }

    #[test]
    fn test_type_operators() {
        let expr = single("def x: Int | Real & Rune? = 1");
        let ExprKind::Def { ty, .. } = expr.kind else {
            panic!("expected def");
        };
        let TypeExprKind::Union { right, .. } = ty.unwrap().kind else {
            panic!("expected union at the top");
        };
        let TypeExprKind::Intersection { right: maybe, .. } = right.kind else {
            panic!("expected intersection under the union");
        };
        assert!(matches!(maybe.kind, TypeExprKind::Maybe { .. }));
    }

    #[test]
    fn test_generic_type_arguments() {
        let expr = single("def xs: Sequence[Int] = [1]");
        let ExprKind::Def { ty, .. } = expr.kind else {
            panic!("expected def");
        };
        let TypeExprKind::Generic { args, .. } = ty.unwrap().kind else {
            panic!("expected generic type");
        };
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_trailing_comment_only_source() {
        let (root, reporter, _) = parse("echo 1\n-- done");
        assert!(!reporter.had_error(), "{:?}", reporter.errors());
        let ExprKind::Block { exprs } = root.kind else {
            panic!("root must be a block");
        };
        assert_eq!(exprs.len(), 1);
    }

    #[test]
    fn test_grouped_expression() {
        let expr = single("echo (1 + 2) * 3");
        let ExprKind::Echo { inner } = expr.kind else {
            panic!("expected echo");
        };
        let ExprKind::Binary { left, op, .. } = inner.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, TokenKind::OperatorMultiply);
        assert!(matches!(left.kind, ExprKind::Grouped { .. }));
    }
}
