//! Lexer and recursive descent parser for the template language.

use std::iter::Peekable;
use std::str::Chars;
use std::vec::IntoIter;

use crate::template::TemplateError;
use crate::template::ast::{Element, ListName, Location};

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Literal(String),
    Reference { name: String, list: bool },
    Word(String),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    location: Location,
}

struct Lexer<'s> {
    chars: Peekable<Chars<'s>>,
    line: usize,
    column: usize,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn tokens(mut self) -> Result<Vec<Token>, TemplateError> {
        let mut tokens = Vec::new();
        while let Some(&ch) = self.chars.peek() {
            let location = self.location();
            let kind = match ch {
                _ if ch.is_whitespace() => {
                    self.bump();
                    continue;
                }
                '#' => {
                    while self.bump().is_some_and(|next| next != '\n') {}
                    continue;
                }
                '"' => {
                    self.bump();
                    TokenKind::Literal(self.literal(location)?)
                }
                '$' | '&' => {
                    self.bump();
                    TokenKind::Reference {
                        name: self.reference(location)?,
                        list: ch == '&',
                    }
                }
                '{' => {
                    self.bump();
                    TokenKind::Open
                }
                '}' => {
                    self.bump();
                    TokenKind::Close
                }
                _ if ch.is_ascii_alphabetic() => TokenKind::Word(self.word()),
                other => {
                    return Err(TemplateError::parse(
                        location,
                        format!("unexpected character '{other}'"),
                    ));
                }
            };
            tokens.push(Token { kind, location });
        }
        Ok(tokens)
    }

    fn literal(&mut self, start: Location) -> Result<String, TemplateError> {
        let mut text = String::new();
        loop {
            let location = self.location();
            match self.bump() {
                None => return Err(TemplateError::parse(start, "unterminated literal")),
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('"') => text.push('"'),
                    Some('\\') => text.push('\\'),
                    Some(other) => {
                        return Err(TemplateError::parse(
                            location,
                            format!("unknown escape '\\{other}'"),
                        ));
                    }
                    None => return Err(TemplateError::parse(start, "unterminated literal")),
                },
                Some(ch) => text.push(ch),
            }
        }
    }

    fn reference(&mut self, start: Location) -> Result<String, TemplateError> {
        if self.bump() != Some('{') {
            return Err(TemplateError::parse(start, "expected '{' after reference sigil"));
        }
        let mut name = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(TemplateError::parse(start, "unterminated reference")),
                Some('}') => break,
                Some(ch) => name.push(ch),
            }
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(TemplateError::parse(start, "empty reference"));
        }
        Ok(name.to_owned())
    }

    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&ch) = self.chars.peek() {
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            word.push(ch);
            self.bump();
        }
        word
    }
}

struct Parser {
    tokens: IntoIter<Token>,
    end: Location,
}

/// Parse template source into its element tree.
pub(crate) fn parse(source: &str) -> Result<Vec<Element>, TemplateError> {
    let lexer = Lexer::new(source);
    let mut end = Location::new(1, 1);
    for ch in source.chars() {
        if ch == '\n' {
            end.line += 1;
            end.column = 1;
        } else {
            end.column += 1;
        }
    }
    let mut parser = Parser {
        tokens: lexer.tokens()?.into_iter(),
        end,
    };
    parser.elements(false, None)
}

impl Parser {
    fn elements(
        &mut self,
        in_loop: bool,
        open: Option<Location>,
    ) -> Result<Vec<Element>, TemplateError> {
        let mut elements = Vec::new();
        loop {
            let Some(Token { kind, location }) = self.tokens.next() else {
                return match open {
                    Some(open) => Err(TemplateError::parse(open, "unclosed '{'")),
                    None => Ok(elements),
                };
            };
            let element = match kind {
                TokenKind::Literal(text) => Element::Literal(text),
                TokenKind::Reference { name, .. } => Element::Variable { name, location },
                TokenKind::Close if open.is_some() => return Ok(elements),
                TokenKind::Close => return Err(TemplateError::parse(location, "unexpected '}'")),
                TokenKind::Open => return Err(TemplateError::parse(location, "unexpected '{'")),
                TokenKind::Word(word) => match word.as_str() {
                    "LOOP" => self.loop_element(location)?,
                    "IF" => self.conditional(in_loop, location)?,
                    "CONTINUE" if in_loop => Element::Continue { location },
                    "CONTINUE" => {
                        return Err(TemplateError::parse(location, "CONTINUE outside of a LOOP"));
                    }
                    _ => {
                        return Err(TemplateError::parse(
                            location,
                            format!("unexpected word '{word}'"),
                        ));
                    }
                },
            };
            elements.push(element);
        }
    }

    fn loop_element(&mut self, location: Location) -> Result<Element, TemplateError> {
        let (name, at) = match self.tokens.next() {
            Some(Token {
                kind: TokenKind::Reference { name, list: true },
                location,
            }) => (name, location),
            other => {
                return Err(TemplateError::parse(
                    self.location_of(other.as_ref()),
                    "expected a list reference &{...} after LOOP",
                ));
            }
        };
        let list = ListName::from_name(&name)
            .ok_or(TemplateError::UnknownList { name, location: at })?;
        let open = self.open_brace("LOOP")?;
        let body = self.elements(true, Some(open))?;
        Ok(Element::Loop {
            list,
            body,
            location,
        })
    }

    fn conditional(&mut self, in_loop: bool, location: Location) -> Result<Element, TemplateError> {
        let mut next = self.tokens.next();
        let negated = matches!(&next, Some(Token { kind: TokenKind::Word(word), .. }) if word == "NOT");
        if negated {
            next = self.tokens.next();
        }
        let reference = match next {
            Some(Token {
                kind: TokenKind::Reference { name, .. },
                ..
            }) => name,
            other => {
                return Err(TemplateError::parse(
                    self.location_of(other.as_ref()),
                    "expected a reference after IF",
                ));
            }
        };
        match self.tokens.next() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) if word == "THEN" => {}
            other => {
                return Err(TemplateError::parse(
                    self.location_of(other.as_ref()),
                    "expected THEN",
                ));
            }
        }
        let open = self.open_brace("THEN")?;
        let body = self.elements(in_loop, Some(open))?;
        Ok(Element::Conditional {
            reference,
            negated,
            body,
            location,
        })
    }

    fn open_brace(&mut self, after: &str) -> Result<Location, TemplateError> {
        match self.tokens.next() {
            Some(Token {
                kind: TokenKind::Open,
                location,
            }) => Ok(location),
            other => Err(TemplateError::parse(
                self.location_of(other.as_ref()),
                format!("expected '{{' after {after}"),
            )),
        }
    }

    fn location_of(&self, token: Option<&Token>) -> Location {
        token.map_or(self.end, |token| token.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(source: &str) -> TemplateError {
        parse(source).expect_err("template should be rejected")
    }

    #[test]
    fn parses_nested_loop_and_conditionals() {
        let elements = parse(
            "# header\nLOOP &{Consumer} {\n  ${Consumer.Name} \"\\t|\"\n  IF NOT &{Consumer.IsCondo} THEN { CONTINUE }\n}",
        )
        .expect("valid template");
        assert_eq!(
            elements,
            vec![Element::Loop {
                list: ListName::Consumer,
                location: Location::new(2, 1),
                body: vec![
                    Element::Variable {
                        name: "Consumer.Name".to_owned(),
                        location: Location::new(3, 3),
                    },
                    Element::Literal("\t|".to_owned()),
                    Element::Conditional {
                        reference: "Consumer.IsCondo".to_owned(),
                        negated: true,
                        location: Location::new(4, 3),
                        body: vec![Element::Continue {
                            location: Location::new(4, 37),
                        }],
                    },
                ],
            }]
        );
    }

    #[test]
    fn reference_names_keep_interior_spaces() {
        let elements = parse("${ NotAReal Field }").expect("valid template");
        assert_eq!(
            elements,
            vec![Element::Variable {
                name: "NotAReal Field".to_owned(),
                location: Location::new(1, 1),
            }]
        );
    }

    #[test]
    fn driver_consumer_is_an_alias() {
        let elements = parse("LOOP &{Driver.Consumer} { }").expect("valid template");
        assert!(matches!(
            elements.as_slice(),
            [Element::Loop {
                list: ListName::Consumer,
                ..
            }]
        ));
    }

    #[test]
    fn continue_needs_an_enclosing_loop() {
        let error = parse_err("IF &{Driver.HasCondo} THEN {\n  CONTINUE\n}");
        assert_eq!(error.to_string(), "2:3: CONTINUE outside of a LOOP");
    }

    #[test]
    fn unknown_list_is_rejected_at_parse_time() {
        let error = parse_err("\"x\" LOOP &{Restaurants} { }");
        assert_eq!(
            error,
            TemplateError::UnknownList {
                name: "Restaurants".to_owned(),
                location: Location::new(1, 10),
            }
        );
    }

    #[test]
    fn reports_lexical_errors_with_locations() {
        assert_eq!(parse_err("\"open").to_string(), "1:1: unterminated literal");
        assert_eq!(parse_err("  \"a\\qb\"").to_string(), "1:5: unknown escape '\\q'");
        assert_eq!(parse_err("${Driver.Name").to_string(), "1:1: unterminated reference");
        assert_eq!(parse_err("\n %").to_string(), "2:2: unexpected character '%'");
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(parse_err("IF &{A} { }").to_string(), "1:9: expected THEN");
        assert_eq!(
            parse_err("LOOP ${Driver} { }").to_string(),
            "1:6: expected a list reference &{...} after LOOP"
        );
        assert_eq!(parse_err("LOOP &{Driver} {").to_string(), "1:16: unclosed '{'");
        assert_eq!(parse_err("\"a\" }").to_string(), "1:5: unexpected '}'");
        assert_eq!(parse_err("IF &{A} THEN").to_string(), "1:13: expected '{' after THEN");
    }
}
