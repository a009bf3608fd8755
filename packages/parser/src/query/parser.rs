use super::selector::{Combinator, ComplexSelector, Compound, Filter, SelectorList};
use crate::error::{QueryError, QueryResult};
use crate::tokenizer::{tokenize, unquote, Token};

/// Parse a locator string into a [`SelectorList`]
pub fn parse_selector(source: &str) -> QueryResult<SelectorList> {
    LocatorParser::new(source)?.parse_list()
}

/// Recursive-descent parser for the locator dialect
pub struct LocatorParser<'src> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    end: usize,
}

impl<'src> LocatorParser<'src> {
    pub fn new(source: &'src str) -> QueryResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            end: source.len(),
        })
    }

    /// list := complex ("," complex)*
    pub fn parse_list(&mut self) -> QueryResult<SelectorList> {
        let mut selectors = Vec::new();
        self.skip_whitespace();
        selectors.push(self.parse_complex()?);

        while self.match_token(&Token::Comma) {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
        }

        if let Some((token, span)) = self.peek() {
            return Err(QueryError::unexpected_token(
                span.start,
                "',' or end of locator",
                token.to_string(),
            ));
        }
        Ok(SelectorList::new(selectors))
    }

    /// complex := compound (combinator compound)*
    fn parse_complex(&mut self) -> QueryResult<ComplexSelector> {
        let mut selector = ComplexSelector::new(self.parse_compound()?);

        loop {
            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                Some((Token::RAngle, _)) => {
                    self.advance();
                    self.skip_whitespace();
                    let compound = self.parse_compound()?;
                    selector.combinators.push(Combinator::Child);
                    selector.compounds.push(compound);
                }
                None | Some((Token::Comma, _)) => break,
                Some(_) if had_whitespace => {
                    let compound = self.parse_compound()?;
                    selector.combinators.push(Combinator::Descendant);
                    selector.compounds.push(compound);
                }
                Some((token, span)) => {
                    return Err(QueryError::unexpected_token(
                        span.start,
                        "combinator",
                        token.to_string(),
                    ))
                }
            }
        }

        Ok(selector)
    }

    /// compound := (tag | "*")? simple*
    fn parse_compound(&mut self) -> QueryResult<Compound> {
        let mut compound = Compound::any();
        let mut universal = false;

        match self.peek() {
            Some((Token::Ident(tag), _)) => {
                compound.tag = Some(tag.to_string());
                self.advance();
            }
            Some((Token::Star, _)) => {
                universal = true;
                self.advance();
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some((Token::LBracket, _)) => {
                    let filter = self.parse_attribute()?;
                    compound.filters.push(filter);
                }
                Some((Token::Colon, _)) => {
                    let filter = self.parse_pseudo_class()?;
                    compound.filters.push(filter);
                }
                _ => break,
            }
        }

        if compound.tag.is_none() && compound.filters.is_empty() && !universal {
            return match self.peek() {
                Some((token, span)) => Err(QueryError::unexpected_token(
                    span.start,
                    "selector",
                    token.to_string(),
                )),
                None => Err(QueryError::unexpected_end(self.end)),
            };
        }

        Ok(compound)
    }

    /// "[" name "]" | "[" name "=" value "]"
    fn parse_attribute(&mut self) -> QueryResult<Filter> {
        self.expect(Token::LBracket)?;
        self.skip_whitespace();
        let name = self.expect_ident()?;
        self.skip_whitespace();

        if self.match_token(&Token::Equals) {
            self.skip_whitespace();
            let value = self.expect_value()?;
            self.skip_whitespace();
            self.expect(Token::RBracket)?;
            return Ok(Filter::AttributeEquals(name, value));
        }

        self.expect(Token::RBracket)?;
        Ok(Filter::HasAttribute(name))
    }

    /// ":root" | ":not(" compound [" *"] ")" | ":index(" number ")" | ":text(" string ")"
    fn parse_pseudo_class(&mut self) -> QueryResult<Filter> {
        self.expect(Token::Colon)?;
        let start = self.current_pos();
        let name = self.expect_ident()?;

        match name.as_str() {
            "root" => Ok(Filter::Root),
            "not" => self.parenthesized(|p| {
                let inner = Box::new(p.parse_compound()?);
                if p.skip_whitespace() && p.match_token(&Token::Star) {
                    Ok(Filter::NotWithin(inner))
                } else {
                    Ok(Filter::Not(inner))
                }
            }),
            "index" => {
                let index = self.parenthesized(|p| p.expect_number())?;
                Ok(Filter::Index(index))
            }
            "text" => {
                let text = self.parenthesized(|p| p.expect_string())?;
                Ok(Filter::Text(text))
            }
            _ => Err(QueryError::UnknownPseudoClass { pos: start, name }),
        }
    }

    fn parenthesized<T>(
        &mut self,
        inner: impl FnOnce(&mut Self) -> QueryResult<T>,
    ) -> QueryResult<T> {
        self.expect(Token::LParen)?;
        self.skip_whitespace();
        let value = inner(self)?;
        self.skip_whitespace();
        self.expect(Token::RParen)?;
        Ok(value)
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        self.tokens.get(self.pos - 1)
    }

    fn check(&self, token: &Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume any whitespace, reporting whether there was some
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.match_token(&Token::Whitespace) {
            skipped = true;
        }
        skipped
    }

    fn expect(&mut self, expected: Token) -> QueryResult<()> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn expect_ident(&mut self) -> QueryResult<String> {
        match self.peek() {
            Some((Token::Ident(name), _)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_string(&mut self) -> QueryResult<String> {
        match self.peek() {
            Some((Token::String(s), _)) => {
                let s = unquote(s);
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("string")),
        }
    }

    /// Attribute values may be quoted strings or bare identifiers and numbers
    fn expect_value(&mut self) -> QueryResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) | Some((Token::Number(s), _)) => {
                let s = s.to_string();
                self.advance();
                Ok(s)
            }
            _ => self.expect_string(),
        }
    }

    fn expect_number(&mut self) -> QueryResult<usize> {
        match self.peek() {
            Some((Token::Number(n), span)) => {
                let start = span.start;
                let value = n
                    .parse::<usize>()
                    .map_err(|_| QueryError::unexpected_token(start, "index", n.to_string()))?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("number")),
        }
    }

    fn unexpected(&self, expected: &str) -> QueryError {
        match self.peek() {
            Some((token, span)) => {
                QueryError::unexpected_token(span.start, expected, token.to_string())
            }
            None => QueryError::unexpected_end(self.end),
        }
    }

    fn current_pos(&self) -> usize {
        self.peek().map(|(_, span)| span.start).unwrap_or(self.end)
    }
}
