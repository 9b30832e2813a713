use crate::{
    tokenizer::Token,
    types::{
        Attribute, BasicType, ClassDef, ClassItem, ClassMember, ClassTemplateParam, Declaration,
        EnumDef, EnumValue, MemberKind, NamespaceDef, TemplateType, Type,
    },
    utils::{error, quote},
    error::IdlError,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:        Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref INTEGER:           Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref ATTRIBUTE:         Regex = Regex::new(r"^\[\[([^\]]*)\]\]$").unwrap();
    static ref SCOPE:             Regex = Regex::new(r"^::$").unwrap();
    static ref EQUALS:            Regex = Regex::new(r"^=$").unwrap();
    static ref COLON:             Regex = Regex::new(r"^:$").unwrap();
    static ref SEMICOLON:         Regex = Regex::new(r"^;$").unwrap();
    static ref COMMA:             Regex = Regex::new(r"^,$").unwrap();
    static ref LEFT_BRACE:        Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:       Regex = Regex::new(r"^\}$").unwrap();
    static ref LEFT_ANGLE:        Regex = Regex::new(r"^<$").unwrap();
    static ref RIGHT_ANGLE:       Regex = Regex::new(r"^>$").unwrap();
    static ref LEFT_PAREN:        Regex = Regex::new(r"^\($").unwrap();
    static ref RIGHT_PAREN:       Regex = Regex::new(r"^\)$").unwrap();
    static ref NAMESPACE_KEYWORD: Regex = Regex::new(r"^namespace$").unwrap();
    static ref ENUM_KEYWORD:      Regex = Regex::new(r"^enum$").unwrap();
    static ref CLASS_KEYWORD:     Regex = Regex::new(r"^(class|struct)$").unwrap();
    static ref TEMPLATE_KEYWORD:  Regex = Regex::new(r"^template$").unwrap();
    static ref FINAL_KEYWORD:     Regex = Regex::new(r"^final$").unwrap();
    static ref STUB_KEYWORD:      Regex = Regex::new(r"^stub$").unwrap();
    static ref CONST_KEYWORD:     Regex = Regex::new(r"^const$").unwrap();
    static ref EOF:               Regex = Regex::new(r"^$").unwrap();
}

/// Parses a whole IDL file. `source` is the text `tokens` were produced
/// from; default values are sliced out of it verbatim.
pub fn parse_schema(tokens: &[Token], source: &str) -> Result<Vec<Declaration>, IdlError> {
    if tokens.is_empty() {
        return Err(error("Unexpected end of input", 1, 1));
    }
    let mut parser = Parser { tokens, source, index: 0 };

    let mut declarations = vec![parser.declaration()?];
    while !parser.eat(&EOF) {
        declarations.push(parser.declaration()?);
    }
    Ok(declarations)
}

struct Parser<'a> {
    tokens: &'a [Token],
    source: &'a str,
    index:  usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &'a Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek(&self, test: &Regex) -> bool {
        test.is_match(&self.current().text)
    }

    fn eat(&mut self, test: &Regex) -> bool {
        if self.peek(test) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, test: &Regex, expected: &str) -> Result<&'a Token, IdlError> {
        let tok = self.current();
        if !self.eat(test) {
            return Err(error(
                &format!("Expected {} but found {}", expected, quote(&tok.text)),
                tok.line,
                tok.column,
            ));
        }
        Ok(tok)
    }

    fn unexpected_token(&self) -> IdlError {
        let tok = self.current();
        error(
            &format!("Unexpected token {}", quote(&tok.text)),
            tok.line,
            tok.column,
        )
    }

    fn declaration(&mut self) -> Result<Declaration, IdlError> {
        if self.peek(&NAMESPACE_KEYWORD) {
            Ok(Declaration::Namespace(self.namespace()?))
        } else if self.peek(&ENUM_KEYWORD) {
            Ok(Declaration::Enum(self.enum_def()?))
        } else if self.peek(&TEMPLATE_KEYWORD) || self.peek(&CLASS_KEYWORD) {
            Ok(Declaration::Class(self.class_def()?))
        } else {
            Err(self.unexpected_token())
        }
    }

    fn namespace(&mut self) -> Result<NamespaceDef, IdlError> {
        self.expect(&NAMESPACE_KEYWORD, "\"namespace\"")?;
        let name = self.expect(&IDENTIFIER, "identifier")?.text.clone();
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let mut members = vec![self.declaration()?];
        while !self.eat(&RIGHT_BRACE) {
            members.push(self.declaration()?);
        }
        Ok(NamespaceDef { name, members })
    }

    /// `a::b::c` as a single string.
    fn qualified_ident(&mut self) -> Result<String, IdlError> {
        let mut name = self.expect(&IDENTIFIER, "identifier")?.text.clone();
        while self.eat(&SCOPE) {
            name.push_str("::");
            name.push_str(&self.expect(&IDENTIFIER, "identifier")?.text);
        }
        Ok(name)
    }

    fn attribute(&mut self) -> Option<Attribute> {
        let captures = ATTRIBUTE.captures(&self.current().text)?;
        let name = captures[1].trim().to_string();
        self.index += 1;
        Some(Attribute { name })
    }

    fn enum_def(&mut self) -> Result<EnumDef, IdlError> {
        self.expect(&ENUM_KEYWORD, "\"enum\"")?;
        self.expect(&CLASS_KEYWORD, "\"class\"")?;
        let name_tok = self.expect(&IDENTIFIER, "identifier")?;
        self.expect(&COLON, "\":\"")?;
        let underlying_type = self.qualified_ident()?;
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let mut members = Vec::new();
        loop {
            let value_name = self.expect(&IDENTIFIER, "identifier")?.text.clone();
            let initializer = if self.eat(&EQUALS) {
                Some(self.expect(&INTEGER, "integer")?.text.clone())
            } else {
                None
            };
            members.push(EnumValue { name: value_name, initializer });

            if self.eat(&COMMA) {
                if self.eat(&RIGHT_BRACE) {
                    break;
                }
            } else {
                self.expect(&RIGHT_BRACE, "\"}\"")?;
                break;
            }
        }
        self.eat(&SEMICOLON);

        Ok(EnumDef {
            name: name_tok.text.clone(),
            line: name_tok.line,
            column: name_tok.column,
            underlying_type,
            members,
            namespace_path: Vec::new(),
            parent_template_params: Vec::new(),
        })
    }

    fn class_def(&mut self) -> Result<ClassDef, IdlError> {
        let template_params = if self.eat(&TEMPLATE_KEYWORD) {
            self.expect(&LEFT_ANGLE, "\"<\"")?;
            let mut params = Vec::new();
            loop {
                let typename = self.expect(&IDENTIFIER, "identifier")?.text.clone();
                let name = self.expect(&IDENTIFIER, "identifier")?.text.clone();
                params.push(ClassTemplateParam { typename, name });
                if !self.eat(&COMMA) {
                    break;
                }
            }
            self.expect(&RIGHT_ANGLE, "\">\"")?;
            Some(params)
        } else {
            None
        };

        self.expect(&CLASS_KEYWORD, "\"class\" or \"struct\"")?;
        let name_tok = self.current();
        let name = self.qualified_ident()?;
        let is_final = self.eat(&FINAL_KEYWORD);
        let is_stub = self.eat(&STUB_KEYWORD);
        let attribute = self.attribute();
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let mut members = Vec::new();
        while !self.eat(&RIGHT_BRACE) {
            members.push(self.class_item()?);
        }
        self.eat(&SEMICOLON);

        Ok(ClassDef {
            name,
            line: name_tok.line,
            column: name_tok.column,
            members,
            is_final,
            is_stub,
            attribute,
            template_params,
            namespace_path: Vec::new(),
            parent_template_params: Vec::new(),
        })
    }

    fn class_item(&mut self) -> Result<ClassItem, IdlError> {
        if self.peek(&ENUM_KEYWORD) {
            Ok(ClassItem::Enum(self.enum_def()?))
        } else if self.peek(&TEMPLATE_KEYWORD) || self.peek(&CLASS_KEYWORD) {
            Ok(ClassItem::Class(self.class_def()?))
        } else if self.peek(&EOF) {
            Err(self.unexpected_token())
        } else {
            Ok(ClassItem::Member(self.class_member()?))
        }
    }

    fn class_member(&mut self) -> Result<ClassMember, IdlError> {
        let type_ = self.type_ref()?;
        let name_tok = self.expect(&IDENTIFIER, "identifier")?;
        let kind = if self.eat(&LEFT_PAREN) {
            self.expect(&RIGHT_PAREN, "\")\"")?;
            MemberKind::Function
        } else {
            MemberKind::Data
        };
        let attribute = self.attribute();
        let default_value = if self.eat(&EQUALS) {
            Some(self.default_expr()?)
        } else {
            None
        };
        self.expect(&SEMICOLON, "\";\"")?;

        Ok(ClassMember {
            kind,
            type_,
            name: name_tok.text.clone(),
            line: name_tok.line,
            column: name_tok.column,
            attribute,
            default_value,
        })
    }

    /// Raw source text up to (not including) the next `;`.
    fn default_expr(&mut self) -> Result<String, IdlError> {
        let start = self.current().offset;
        while !self.peek(&SEMICOLON) {
            if self.peek(&EOF) {
                return Err(self.unexpected_token());
            }
            self.index += 1;
        }
        let end = self.current().offset;
        let text = self.source.get(start..end).unwrap_or_default().trim();
        if text.is_empty() {
            return Err(error("Expected default value", self.current().line, self.current().column));
        }
        Ok(text.to_string())
    }

    fn type_ref(&mut self) -> Result<Type, IdlError> {
        if self.eat(&CONST_KEYWORD) {
            let name = self.qualified_ident()?;
            return Ok(Type::Basic(BasicType { name, is_const: true }));
        }

        let name = self.qualified_ident()?;
        if !self.eat(&LEFT_ANGLE) {
            return Ok(Type::Basic(BasicType { name, is_const: false }));
        }

        let mut template_parameters = Vec::new();
        loop {
            if self.peek(&INTEGER) {
                let number = self.expect(&INTEGER, "integer")?.text.clone();
                template_parameters.push(Type::basic(&number));
            } else {
                template_parameters.push(self.type_ref()?);
            }
            if !self.eat(&COMMA) {
                break;
            }
        }
        self.expect(&RIGHT_ANGLE, "\">\"")?;
        Ok(Type::Template(TemplateType { name, template_parameters }))
    }
}
