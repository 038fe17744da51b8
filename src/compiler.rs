// File: src/compiler.rs
//
// Single-pass recursive-descent compiler: tokens go straight to bytecode,
// there is no intermediate tree. The grammar is compiled by a ladder of
// mutually recursive methods, one per precedence level, with `if`/`while`
// and `and`/`or` lowered to Jump/JumpIfFalse patch points as they're parsed.

use std::collections::HashMap;

use crate::bytecode::{Bytecode, OpCode};
use crate::errors::CompileError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::value::Value;

struct Local {
    name: String,
    depth: usize,
    slot: usize,
}

pub struct Compiler<'a> {
    lexer: Lexer<'a>,
    cursor: Token,
    prev: Token,
    bytecode: Bytecode,
    locals: Vec<Local>,
    block_depth: usize,
    strings: HashMap<String, usize>,
    errors: Vec<CompileError>,
}

/// Compile a full program into bytecode, or the errors collected along the way.
pub fn compile(source: &str) -> Result<Bytecode, Vec<CompileError>> {
    let mut compiler = Compiler::new(source);
    compiler.run()
}

impl<'a> Compiler<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let first = lexer.next_token();
        Compiler {
            lexer,
            prev: first.clone(),
            cursor: first,
            bytecode: Bytecode::new(),
            locals: Vec::new(),
            block_depth: 0,
            strings: HashMap::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Bytecode, Vec<CompileError>> {
        while self.cursor.kind != TokenKind::Eof {
            self.declaration();
        }
        self.bytecode.emit_op(OpCode::Return, self.cursor.line);
        if self.errors.is_empty() {
            Ok(self.bytecode)
        } else {
            Err(self.errors)
        }
    }

    // --- token plumbing -----------------------------------------------

    fn advance(&mut self) {
        self.prev = std::mem::replace(&mut self.cursor, self.lexer.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.cursor.kind == kind
    }

    fn match_tok(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(&kind) {
            self.advance();
        } else {
            self.error_unexpected(message);
            self.advance();
        }
    }

    fn consume_identifier(&mut self, message: &str) -> String {
        if let TokenKind::Identifier(name) = self.cursor.kind.clone() {
            self.advance();
            name
        } else {
            self.error_unexpected(message);
            self.advance();
            String::new()
        }
    }

    fn error_unexpected(&mut self, message: &str) {
        let got = self.cursor.kind.to_string();
        self.errors.push(CompileError::new(self.cursor.line, self.cursor.column, message).with_got(got));
    }

    fn error_at_prev(&mut self, message: &str) {
        self.errors.push(CompileError::new(self.prev.line, self.prev.column, message));
    }

    // --- emission helpers -----------------------------------------------

    fn emit_op(&mut self, op: OpCode, line: usize) -> usize {
        self.bytecode.emit_op(op, line)
    }

    fn emit_op_u16(&mut self, op: OpCode, operand: u16, line: usize) -> usize {
        self.bytecode.emit_op_u16(op, operand, line)
    }

    fn emit_constant(&mut self, value: Value, line: usize) {
        let idx = self.bytecode.add_const(value);
        self.emit_op_u16(OpCode::Constant16, idx as u16, line);
    }

    fn patch_jump(&mut self, operand_addr: usize) {
        let target = self.bytecode.len() as u16;
        self.bytecode.set_u16(operand_addr, target);
    }

    fn resolve_string(&mut self, text: &str) -> usize {
        if let Some(idx) = self.strings.get(text) {
            return *idx;
        }
        let idx = self.bytecode.add_const(Value::string(text));
        self.strings.insert(text.to_string(), idx);
        idx
    }

    fn resolve_local_slot(&self, name: &str) -> Option<usize> {
        self.locals.iter().rev().find(|l| l.name == name).map(|l| l.slot)
    }

    fn resolve_variable(&mut self, name: &str, line: usize) {
        if let Some(slot) = self.resolve_local_slot(name) {
            self.emit_op_u16(OpCode::LoadLocal, slot as u16, line);
        } else {
            let idx = self.resolve_string(name);
            self.emit_op_u16(OpCode::LoadGlobal, idx as u16, line);
        }
    }

    // --- declarations / statements ---------------------------------------

    fn declaration(&mut self) {
        match self.cursor.kind {
            TokenKind::Let => {
                self.advance();
                self.let_declaration();
            }
            TokenKind::LeftBrace => {
                self.advance();
                self.enter_block();
                self.block();
            }
            _ => self.statement(),
        }
    }

    fn enter_block(&mut self) {
        self.block_depth += 1;
    }

    /// Compiles statements up to (and consuming) the closing `}`, then pops
    /// any locals declared at this depth back off the evaluation stack.
    fn block(&mut self) {
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            self.declaration();
        }
        let line = self.cursor.line;
        self.consume(TokenKind::RightBrace, "'}' expected");
        while let Some(last) = self.locals.last() {
            if last.depth == self.block_depth {
                self.locals.pop();
                self.emit_op(OpCode::Pop, line);
            } else {
                break;
            }
        }
        self.block_depth -= 1;
    }

    fn let_declaration(&mut self) {
        let line = self.prev.line;
        let name = self.consume_identifier("variable name expected");

        if self.block_depth == 0 {
            let name_idx = self.resolve_string(&name);
            self.emit_op_u16(OpCode::AllocGlobal, name_idx as u16, line);
            if self.match_tok(&TokenKind::Eq) {
                self.expression();
            } else {
                self.emit_op(OpCode::LoadNull, line);
            }
            self.emit_op_u16(OpCode::StoreGlobal, name_idx as u16, line);
        } else {
            let redefined = self
                .locals
                .iter()
                .any(|l| l.depth == self.block_depth && l.name == name);
            if redefined {
                self.error_at_prev("Redefinition of a local variable");
            }
            if self.match_tok(&TokenKind::Eq) {
                self.expression();
            } else {
                self.emit_op(OpCode::LoadNull, line);
            }
            let slot = self.locals.len();
            self.emit_op_u16(OpCode::StoreLocal, slot as u16, line);
            if !redefined {
                self.locals.push(Local { name, depth: self.block_depth, slot });
            }
        }
        self.consume(TokenKind::Semicolon, "';' expected");
    }

    fn statement(&mut self) {
        match self.cursor.kind {
            TokenKind::Print => {
                self.advance();
                self.print_stmt();
            }
            TokenKind::Identifier(_) => {
                self.advance();
                self.assignment_stmt();
            }
            TokenKind::If => {
                self.advance();
                self.if_stmt();
            }
            TokenKind::While => {
                self.advance();
                self.while_stmt();
            }
            _ => {
                let line = self.cursor.line;
                self.expression();
                self.consume(TokenKind::Semicolon, "';' expected");
                self.emit_op(OpCode::Pop, line);
            }
        }
    }

    fn print_stmt(&mut self) {
        self.expression();
        let line = self.prev.line;
        self.emit_op(OpCode::Print, line);
        self.consume(TokenKind::Semicolon, "';' expected");
    }

    fn assignment_stmt(&mut self) {
        let name = match self.prev.kind.clone() {
            TokenKind::Identifier(name) => name,
            _ => String::new(),
        };
        let line = self.prev.line;
        self.consume(TokenKind::Eq, "'=' expected");
        self.expression();
        self.consume(TokenKind::Semicolon, "';' expected");

        if let Some(slot) = self.resolve_local_slot(&name) {
            self.emit_op_u16(OpCode::StoreLocal, slot as u16, line);
            self.emit_op(OpCode::Pop, line);
        } else {
            let idx = self.resolve_string(&name);
            self.emit_op_u16(OpCode::StoreGlobal, idx as u16, line);
        }
    }

    fn if_stmt(&mut self) {
        self.expression();
        let line = self.prev.line;
        self.consume(TokenKind::LeftBrace, "'{' expected");
        self.enter_block();

        let mut next_target = self.emit_op_u16(OpCode::JumpIfFalse, 0, line);
        self.block();
        let mut end_jumps = vec![self.emit_op_u16(OpCode::Jump, 0, line)];
        self.patch_jump(next_target);

        loop {
            if !self.check(&TokenKind::Else) {
                break;
            }
            self.advance();
            if self.check(&TokenKind::If) {
                self.advance();
                self.expression();
                let line = self.prev.line;
                self.consume(TokenKind::LeftBrace, "'{' expected");
                self.enter_block();
                next_target = self.emit_op_u16(OpCode::JumpIfFalse, 0, line);
                self.block();
                end_jumps.push(self.emit_op_u16(OpCode::Jump, 0, line));
                self.patch_jump(next_target);
            } else {
                self.consume(TokenKind::LeftBrace, "'{' expected");
                self.enter_block();
                self.block();
                break;
            }
        }

        for jump in end_jumps {
            self.patch_jump(jump);
        }
    }

    fn while_stmt(&mut self) {
        let loop_top = self.bytecode.len();
        self.expression();
        let line = self.prev.line;
        self.consume(TokenKind::LeftBrace, "'{' expected");
        self.enter_block();

        let exit_jump = self.emit_op_u16(OpCode::JumpIfFalse, 0, line);
        self.block();
        self.emit_op_u16(OpCode::Jump, loop_top as u16, line);
        self.patch_jump(exit_jump);
    }

    // --- expressions, lowest to highest precedence -----------------------

    fn expression(&mut self) {
        self.logical_or();
    }

    fn logical_or(&mut self) {
        self.logical_and();
        while self.check(&TokenKind::Or) {
            let line = self.cursor.line;
            self.advance();
            let else_jump = self.emit_op_u16(OpCode::JumpIfFalse, 0, line);
            self.emit_constant(Value::Bool(true), line);
            let end_jump = self.emit_op_u16(OpCode::Jump, 0, line);
            self.patch_jump(else_jump);
            self.logical_and();
            self.patch_jump(end_jump);
        }
    }

    fn logical_and(&mut self) {
        self.logical_not();
        while self.check(&TokenKind::And) {
            let line = self.cursor.line;
            self.advance();
            let false_jump = self.emit_op_u16(OpCode::JumpIfFalse, 0, line);
            self.logical_not();
            let end_jump = self.emit_op_u16(OpCode::Jump, 0, line);
            self.patch_jump(false_jump);
            self.emit_constant(Value::Bool(false), line);
            self.patch_jump(end_jump);
        }
    }

    fn logical_not(&mut self) {
        if self.check(&TokenKind::Not) {
            let line = self.cursor.line;
            self.advance();
            self.comparison();
            self.emit_op(OpCode::Not, line);
        } else {
            self.comparison();
        }
    }

    fn comparison(&mut self) {
        self.addition();
        loop {
            let line = self.cursor.line;
            match self.cursor.kind {
                TokenKind::EqEq => {
                    self.advance();
                    self.addition();
                    self.emit_op(OpCode::Equal, line);
                }
                TokenKind::BangEq => {
                    self.advance();
                    self.addition();
                    self.emit_op(OpCode::Equal, line);
                    self.emit_op(OpCode::Not, line);
                }
                TokenKind::GreaterEq => {
                    self.advance();
                    self.addition();
                    self.emit_op(OpCode::Less, line);
                    self.emit_op(OpCode::Not, line);
                }
                TokenKind::LessEq => {
                    self.advance();
                    self.addition();
                    self.emit_op(OpCode::Greater, line);
                    self.emit_op(OpCode::Not, line);
                }
                TokenKind::Greater => {
                    self.advance();
                    self.addition();
                    self.emit_op(OpCode::Greater, line);
                }
                TokenKind::Less => {
                    self.advance();
                    self.addition();
                    self.emit_op(OpCode::Less, line);
                }
                _ => break,
            }
        }
    }

    fn addition(&mut self) {
        self.multiplication();
        loop {
            let line = self.cursor.line;
            match self.cursor.kind {
                TokenKind::Plus => {
                    self.advance();
                    self.multiplication();
                    self.emit_op(OpCode::Add, line);
                }
                TokenKind::Minus => {
                    self.advance();
                    self.multiplication();
                    self.emit_op(OpCode::Subtract, line);
                }
                _ => break,
            }
        }
    }

    fn multiplication(&mut self) {
        self.unary();
        loop {
            let line = self.cursor.line;
            match self.cursor.kind {
                TokenKind::Star => {
                    self.advance();
                    self.unary();
                    self.emit_op(OpCode::Multiply, line);
                }
                TokenKind::Slash => {
                    self.advance();
                    self.unary();
                    self.emit_op(OpCode::Divide, line);
                }
                _ => break,
            }
        }
    }

    fn unary(&mut self) {
        if self.check(&TokenKind::Minus) {
            let line = self.cursor.line;
            self.advance();
            self.exp();
            self.emit_op(OpCode::Negate, line);
        } else {
            self.exp();
        }
    }

    /// Right-associative: `a ** b ** c == a ** (b ** c)`.
    fn exp(&mut self) {
        self.arbitrary();
        if self.check(&TokenKind::StarStar) {
            let line = self.cursor.line;
            self.advance();
            self.exp();
            self.emit_op(OpCode::Exp, line);
        }
    }

    fn arbitrary(&mut self) {
        let line = self.cursor.line;
        match self.cursor.kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                self.emit_constant(Value::Number(n), line);
            }
            TokenKind::String(s) => {
                self.advance();
                let idx = self.resolve_string(&s);
                self.emit_op_u16(OpCode::Constant16, idx as u16, line);
            }
            TokenKind::True => {
                self.advance();
                self.emit_constant(Value::Bool(true), line);
            }
            TokenKind::False => {
                self.advance();
                self.emit_constant(Value::Bool(false), line);
            }
            TokenKind::Null => {
                self.advance();
                self.emit_op(OpCode::LoadNull, line);
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.resolve_variable(&name, line);
            }
            TokenKind::LeftParen => {
                self.advance();
                self.expression();
                self.consume(TokenKind::RightParen, "')' expected");
            }
            _ => {
                self.error_unexpected("expression expected");
                self.advance();
            }
        }
    }
}
