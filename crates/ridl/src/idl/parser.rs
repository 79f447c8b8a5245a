// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recursive-descent parser over the token stream.

use crate::descriptor::{ConstValue, MessageVariant, Requiredness};
use crate::idl::ast::{
    RawConst, RawDecl, RawEnum, RawField, RawMessage, RawMethod, RawProgram, RawService,
    RawType, RawTypedef,
};
use crate::idl::lexer::{tokenize, Token, TokenKind};
use crate::idl::ParseError;

/// Parse one IDL source blob into an unresolved program.
///
/// `program_name` is the file stem; it only names the result, the
/// parser itself never touches the filesystem.
pub fn parse(source: &str, program_name: &str) -> Result<RawProgram, ParseError> {
    let (tokens, lines) = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        lines,
        index: 0,
    };
    parser.program(program_name)
}

struct Parser {
    tokens: Vec<Token>,
    lines: Vec<String>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn next(&mut self, expected: &str) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.index)
            .cloned()
            .ok_or_else(|| self.eof_error(expected))?;
        self.index += 1;
        Ok(token)
    }

    fn eof_error(&self, expected: &str) -> ParseError {
        let line = self.lines.len().max(1);
        let text = self.lines.last().cloned().unwrap_or_default();
        ParseError::new(
            format!("Unexpected end of input, expected {}", expected),
            line,
            text.chars().count(),
            1,
            text,
        )
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        let line_text = self
            .lines
            .get(token.line - 1)
            .cloned()
            .unwrap_or_default();
        ParseError::new(message, token.line, token.pos, token.len(), line_text)
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<Token, ParseError> {
        let token = self.next(expected)?;
        if token.kind == TokenKind::Identifier {
            Ok(token)
        } else {
            Err(self.error_at(
                &token,
                format!("Expected {}, got '{}'", expected, token.text),
            ))
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<Token, ParseError> {
        let token = self.next(&format!("'{}'", symbol))?;
        if token.is_symbol(symbol) {
            Ok(token)
        } else {
            Err(self.error_at(
                &token,
                format!("Expected '{}', got '{}'", symbol, token.text),
            ))
        }
    }

    /// Consume a `,` or `;` list separator if present.
    fn skip_separator(&mut self) {
        if self
            .peek()
            .is_some_and(|t| t.is_symbol(',') || t.is_symbol(';'))
        {
            self.index += 1;
        }
    }

    fn program(&mut self, name: &str) -> Result<RawProgram, ParseError> {
        let mut program = RawProgram {
            name: name.to_string(),
            includes: Vec::new(),
            namespaces: Vec::new(),
            decls: Vec::new(),
        };

        while let Some(token) = self.peek().cloned() {
            match token.kind {
                TokenKind::Identifier => {}
                _ => {
                    return Err(self.error_at(
                        &token,
                        format!("Unexpected token '{}', expected declaration", token.text),
                    ))
                }
            }
            self.index += 1;
            match token.text.as_str() {
                "include" => {
                    let path = self.next("include path")?;
                    match path.kind {
                        TokenKind::StringLiteral(value) => program.includes.push(value),
                        _ => {
                            return Err(self.error_at(
                                &path,
                                format!("Expected include path string, got '{}'", path.text),
                            ))
                        }
                    }
                }
                "namespace" => {
                    let language = self.expect_identifier("namespace language")?;
                    let value = self.next("namespace value")?;
                    let value_text = match value.kind {
                        TokenKind::Identifier => value.text,
                        TokenKind::StringLiteral(s) => s,
                        _ => {
                            return Err(self.error_at(
                                &value,
                                format!("Expected namespace, got '{}'", value.text),
                            ))
                        }
                    };
                    program.namespaces.push((language.text, value_text));
                }
                "enum" => program.decls.push(RawDecl::Enum(self.enum_decl()?)),
                "struct" => program
                    .decls
                    .push(RawDecl::Message(self.message_decl(MessageVariant::Struct)?)),
                "union" => program
                    .decls
                    .push(RawDecl::Message(self.message_decl(MessageVariant::Union)?)),
                "exception" => program.decls.push(RawDecl::Message(
                    self.message_decl(MessageVariant::Exception)?,
                )),
                "typedef" => {
                    let target = self.type_ref()?;
                    let name = self.expect_identifier("typedef name")?;
                    self.skip_separator();
                    program.decls.push(RawDecl::Typedef(RawTypedef {
                        name: name.text,
                        target,
                    }));
                }
                "const" => {
                    let value_type = self.type_ref()?;
                    let name = self.expect_identifier("const name")?;
                    self.expect_symbol('=')?;
                    let value = self.const_value()?;
                    self.skip_separator();
                    program.decls.push(RawDecl::Const(RawConst {
                        name: name.text,
                        value_type,
                        value,
                    }));
                }
                "service" => program.decls.push(RawDecl::Service(self.service_decl()?)),
                other => {
                    return Err(self.error_at(
                        &token,
                        format!("Unexpected token '{}', expected declaration", other),
                    ))
                }
            }
        }

        Ok(program)
    }

    fn enum_decl(&mut self) -> Result<RawEnum, ParseError> {
        let name = self.expect_identifier("enum name")?;
        self.expect_symbol('{')?;
        let mut values = Vec::new();
        let mut next_value: i32 = 0;
        loop {
            let token = self.next("enum value or '}'")?;
            if token.is_symbol('}') {
                break;
            }
            if token.kind != TokenKind::Identifier {
                return Err(self.error_at(
                    &token,
                    format!("Expected enum value name, got '{}'", token.text),
                ));
            }
            let value = if self.peek().is_some_and(|t| t.is_symbol('=')) {
                self.index += 1;
                let literal = self.next("enum value")?;
                match literal.kind {
                    TokenKind::IntLiteral(v) if i32::try_from(v).is_ok() => v as i32,
                    _ => {
                        return Err(self.error_at(
                            &literal,
                            format!("Expected enum value integer, got '{}'", literal.text),
                        ))
                    }
                }
            } else {
                next_value
            };
            next_value = value.saturating_add(1);
            values.push((token.text, value));
            self.skip_separator();
        }
        Ok(RawEnum {
            name: name.text,
            values,
        })
    }

    fn message_decl(&mut self, variant: MessageVariant) -> Result<RawMessage, ParseError> {
        let name = self.expect_identifier("type name")?;
        self.expect_symbol('{')?;
        let mut fields = Vec::new();
        loop {
            let token = self.next("field or '}'")?;
            if token.is_symbol('}') {
                break;
            }
            fields.push(self.field(token)?);
        }
        let annotations = self.annotations()?;
        Ok(RawMessage {
            variant,
            name: name.text,
            fields,
            annotations,
        })
    }

    /// Field declaration, with its id token already consumed.
    fn field(&mut self, id_token: Token) -> Result<RawField, ParseError> {
        let id = match id_token.kind {
            TokenKind::IntLiteral(v) if i16::try_from(v).is_ok() && v != 0 => v as i16,
            TokenKind::IntLiteral(_) => {
                return Err(self.error_at(
                    &id_token,
                    format!("Field id '{}' outside signed 16-bit non-zero range", id_token.text),
                ))
            }
            _ => {
                return Err(self.error_at(
                    &id_token,
                    format!("Expected field id, got '{}'", id_token.text),
                ))
            }
        };
        self.expect_symbol(':')?;

        let mut requiredness = Requiredness::Default;
        if let Some(token) = self.peek() {
            if token.is_identifier("required") {
                requiredness = Requiredness::Required;
                self.index += 1;
            } else if token.is_identifier("optional") {
                requiredness = Requiredness::Optional;
                self.index += 1;
            }
        }

        let field_type = self.type_ref()?;
        let name = self.expect_identifier("field name")?;

        let default = if self.peek().is_some_and(|t| t.is_symbol('=')) {
            self.index += 1;
            Some(self.const_value()?)
        } else {
            None
        };
        self.skip_separator();

        Ok(RawField {
            id,
            name: name.text,
            requiredness,
            field_type,
            default,
            line: id_token.line,
        })
    }

    fn type_ref(&mut self) -> Result<RawType, ParseError> {
        let token = self.expect_identifier("type")?;
        Ok(match token.text.as_str() {
            "void" => RawType::Void,
            "bool" => RawType::Bool,
            "byte" | "i8" => RawType::Byte,
            "i16" => RawType::I16,
            "i32" => RawType::I32,
            "i64" => RawType::I64,
            "double" => RawType::Double,
            "string" => RawType::Str,
            "binary" => RawType::Binary,
            "list" => {
                self.expect_symbol('<')?;
                let item = self.type_ref()?;
                self.expect_symbol('>')?;
                RawType::List(Box::new(item))
            }
            "set" => {
                self.expect_symbol('<')?;
                let item = self.type_ref()?;
                self.expect_symbol('>')?;
                RawType::Set(Box::new(item))
            }
            "map" => {
                self.expect_symbol('<')?;
                let key = self.type_ref()?;
                self.expect_symbol(',')?;
                let value = self.type_ref()?;
                self.expect_symbol('>')?;
                RawType::Map(Box::new(key), Box::new(value))
            }
            _ => RawType::Named(token.text),
        })
    }

    fn const_value(&mut self) -> Result<ConstValue, ParseError> {
        let token = self.next("constant value")?;
        Ok(match &token.kind {
            TokenKind::IntLiteral(v) => ConstValue::Int(*v),
            TokenKind::DoubleLiteral(v) => ConstValue::Double(*v),
            TokenKind::StringLiteral(v) => ConstValue::Str(v.clone()),
            TokenKind::Identifier if token.text == "true" => ConstValue::Bool(true),
            TokenKind::Identifier if token.text == "false" => ConstValue::Bool(false),
            TokenKind::Identifier => ConstValue::Identifier(token.text.clone()),
            TokenKind::Symbol('[') => {
                let mut items = Vec::new();
                loop {
                    if self.peek().is_some_and(|t| t.is_symbol(']')) {
                        self.index += 1;
                        break;
                    }
                    items.push(self.const_value()?);
                    self.skip_separator();
                }
                ConstValue::List(items)
            }
            TokenKind::Symbol('{') => {
                let mut entries = Vec::new();
                loop {
                    if self.peek().is_some_and(|t| t.is_symbol('}')) {
                        self.index += 1;
                        break;
                    }
                    let key = self.const_value()?;
                    self.expect_symbol(':')?;
                    let value = self.const_value()?;
                    entries.push((key, value));
                    self.skip_separator();
                }
                ConstValue::Map(entries)
            }
            _ => {
                return Err(self.error_at(
                    &token,
                    format!("Expected constant value, got '{}'", token.text),
                ))
            }
        })
    }

    /// Optional trailing annotation list: `(key = "value", flag)`.
    fn annotations(&mut self) -> Result<Vec<(String, String)>, ParseError> {
        let mut annotations = Vec::new();
        if !self.peek().is_some_and(|t| t.is_symbol('(')) {
            return Ok(annotations);
        }
        self.index += 1;
        loop {
            let token = self.next("annotation or ')'")?;
            if token.is_symbol(')') {
                break;
            }
            if token.kind != TokenKind::Identifier {
                return Err(self.error_at(
                    &token,
                    format!("Expected annotation name, got '{}'", token.text),
                ));
            }
            let value = if self.peek().is_some_and(|t| t.is_symbol('=')) {
                self.index += 1;
                let literal = self.next("annotation value")?;
                match literal.kind {
                    TokenKind::StringLiteral(s) => s,
                    _ => {
                        return Err(self.error_at(
                            &literal,
                            format!("Expected annotation string, got '{}'", literal.text),
                        ))
                    }
                }
            } else {
                String::new()
            };
            annotations.push((token.text, value));
            self.skip_separator();
        }
        Ok(annotations)
    }

    fn service_decl(&mut self) -> Result<RawService, ParseError> {
        let name = self.expect_identifier("service name")?;
        let extends = if self.peek().is_some_and(|t| t.is_identifier("extends")) {
            self.index += 1;
            Some(self.expect_identifier("extended service")?.text)
        } else {
            None
        };
        self.expect_symbol('{')?;

        let mut methods = Vec::new();
        loop {
            let token = self.next("method or '}'")?;
            if token.is_symbol('}') {
                break;
            }
            if token.kind != TokenKind::Identifier {
                return Err(self.error_at(
                    &token,
                    format!("Expected method return type, got '{}'", token.text),
                ));
            }
            let oneway = token.is_identifier("oneway");
            let returns = if oneway {
                self.type_ref()?
            } else {
                self.index -= 1;
                self.type_ref()?
            };
            let method_name = self.expect_identifier("method name")?;
            self.expect_symbol('(')?;
            let params = self.method_fields(')')?;
            let throws = if self.peek().is_some_and(|t| t.is_identifier("throws")) {
                self.index += 1;
                self.expect_symbol('(')?;
                self.method_fields(')')?
            } else {
                Vec::new()
            };
            self.skip_separator();
            methods.push(RawMethod {
                name: method_name.text,
                oneway,
                returns,
                params,
                throws,
            });
        }

        Ok(RawService {
            name: name.text,
            extends,
            methods,
        })
    }

    fn method_fields(&mut self, close: char) -> Result<Vec<RawField>, ParseError> {
        let mut fields = Vec::new();
        loop {
            let token = self.next(&format!("field or '{}'", close))?;
            if token.is_symbol(close) {
                break;
            }
            fields.push(self.field(token)?);
        }
        Ok(fields)
    }
}
