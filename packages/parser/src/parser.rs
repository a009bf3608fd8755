use crate::ast::{Document, Element, NodeId};
use crate::error::{ParseError, ParseResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, instrument};

/// Parse an XML source into an arena [`Document`]
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source).parse_document()
}

/// Streaming reader that builds the element arena
pub struct Parser<'src> {
    reader: Reader<&'src [u8]>,
    nodes: Vec<Element>,
    stack: Vec<NodeId>,
    root: Option<NodeId>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            nodes: Vec::new(),
            stack: Vec::new(),
            root: None,
        }
    }

    /// Parse a complete document
    #[instrument(skip(self))]
    pub fn parse_document(mut self) -> ParseResult<Document> {
        loop {
            let event = self
                .reader
                .read_event()
                .map_err(|e| ParseError::xml(self.current_pos(), e.to_string()))?;

            match event {
                Event::Start(start) => {
                    let id = self.open_element(&start)?;
                    self.stack.push(id);
                }
                Event::Empty(start) => {
                    self.open_element(&start)?;
                }
                Event::End(end) => {
                    let name = self.decode(end.name().as_ref())?;
                    let open = self
                        .stack
                        .pop()
                        .ok_or_else(|| ParseError::xml(self.current_pos(), "unbalanced end tag"))?;
                    if self.nodes[open.0].tag != name {
                        return Err(ParseError::mismatched_tag(
                            self.current_pos(),
                            self.nodes[open.0].tag.clone(),
                            name,
                        ));
                    }
                }
                Event::Text(text) => {
                    let content = text
                        .unescape()
                        .map_err(|e| ParseError::xml(self.current_pos(), e.to_string()))?;
                    self.push_text(&content)?;
                }
                Event::CData(data) => {
                    let content = self.decode(&data)?;
                    self.push_text(&content)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctypes carry no content
                _ => {}
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(ParseError::unexpected_eof(
                self.current_pos(),
                self.nodes[open.0].tag.clone(),
            ));
        }

        let root = self.root.ok_or(ParseError::EmptyDocument)?;
        debug!(elements = self.nodes.len(), "parsed document");
        Ok(Document::from_parts(self.nodes, root))
    }

    fn open_element(&mut self, start: &BytesStart<'_>) -> ParseResult<NodeId> {
        let tag = self.decode(start.name().as_ref())?;
        let mut element = Element::new(tag);

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::xml(self.current_pos(), e.to_string()))?;
            let key = self.decode(attr.key.as_ref())?;
            let value = attr
                .unescape_value()
                .map_err(|e| ParseError::xml(self.current_pos(), e.to_string()))?;
            element.attributes.insert(key, value.into_owned());
        }

        let id = NodeId(self.nodes.len());
        match self.stack.last() {
            Some(parent) => {
                element.parent = Some(*parent);
                self.nodes[parent.0].children.push(id);
            }
            None if self.root.is_none() => self.root = Some(id),
            None => {
                return Err(ParseError::TrailingContent {
                    pos: self.current_pos(),
                })
            }
        }
        self.nodes.push(element);
        Ok(id)
    }

    fn push_text(&mut self, content: &str) -> ParseResult<()> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        let Some(current) = self.stack.last() else {
            return Err(ParseError::xml(self.current_pos(), "text outside the root element"));
        };
        let text = &mut self.nodes[current.0].text;
        match text {
            Some(existing) => existing.push_str(trimmed),
            None => *text = Some(trimmed.to_string()),
        }
        Ok(())
    }

    fn decode(&self, raw: &[u8]) -> ParseResult<String> {
        self.reader
            .decoder()
            .decode(raw)
            .map(|s| s.into_owned())
            .map_err(|e| ParseError::xml(self.current_pos(), e.to_string()))
    }

    fn current_pos(&self) -> usize {
        self.reader.buffer_position() as usize
    }
}
