use crate::tokenizer::quote;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comma-separated alternatives; an element matches when any branch matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

/// Compound selectors joined by child or descendant combinators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    pub combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    Child,
    Descendant,
}

/// An optional tag test plus any number of filters, all of which must hold
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Compound {
    pub tag: Option<String>,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    Root,
    HasAttribute(String),
    AttributeEquals(String, String),
    Not(Box<Compound>),
    /// No ancestor matches the compound, written `:not(Compound *)`
    NotWithin(Box<Compound>),
    /// Position among the parent's children that satisfy the compound's other filters
    Index(usize),
    /// Trimmed text content equality
    Text(String),
}

impl SelectorList {
    pub fn new(selectors: Vec<ComplexSelector>) -> Self {
        Self { selectors }
    }

    /// The locator that never matches, `:not(*)`
    pub fn void() -> Self {
        Self::new(vec![ComplexSelector::new(
            Compound::any().with(Filter::Not(Box::new(Compound::any()))),
        )])
    }

    pub fn is_void(&self) -> bool {
        self.selectors.iter().all(ComplexSelector::is_void)
    }
}

impl ComplexSelector {
    pub fn new(compound: Compound) -> Self {
        Self {
            compounds: vec![compound],
            combinators: Vec::new(),
        }
    }

    /// Append `compound` as a direct child of the current subject
    pub fn child(mut self, compound: Compound) -> Self {
        self.combinators.push(Combinator::Child);
        self.compounds.push(compound);
        self
    }

    /// Append `compound` as a descendant of the current subject
    pub fn descendant(mut self, compound: Compound) -> Self {
        self.combinators.push(Combinator::Descendant);
        self.compounds.push(compound);
        self
    }

    /// The rightmost compound, the one that selects the result
    pub fn subject(&self) -> Option<&Compound> {
        self.compounds.last()
    }

    /// True when some compound can never match
    pub fn is_void(&self) -> bool {
        self.compounds.iter().any(Compound::is_void)
    }
}

impl Compound {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            filters: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::any().with(Filter::Root)
    }

    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(Filter::AttributeEquals(name.into(), value.into()))
    }

    /// Contains `:not(*)`, requires two values for one attribute, or pairs
    /// an attribute test with `:not([attr])`
    pub fn is_void(&self) -> bool {
        self.filters.iter().any(|filter| match filter {
            Filter::Not(inner) => match (&inner.tag, inner.filters.as_slice()) {
                (None, []) => true,
                (None, [Filter::HasAttribute(name)]) => self.requires_attribute(name),
                _ => false,
            },
            Filter::AttributeEquals(name, value) => self.filters.iter().any(|other| {
                matches!(other, Filter::AttributeEquals(n, v) if n == name && v != value)
            }),
            _ => false,
        })
    }

    fn requires_attribute(&self, name: &str) -> bool {
        self.filters.iter().any(|f| match f {
            Filter::HasAttribute(n) | Filter::AttributeEquals(n, _) => n == name,
            _ => false,
        })
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.selectors.is_empty() {
            return write!(f, ":not(*)");
        }
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", selector)?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if i > 0 {
                match self.combinators.get(i - 1) {
                    Some(Combinator::Descendant) => write!(f, " ")?,
                    _ => write!(f, ">")?,
                }
            }
            write!(f, "{}", compound)?;
        }
        Ok(())
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}", tag)?,
            None if self.filters.is_empty() => write!(f, "*")?,
            None => {}
        }
        for filter in &self.filters {
            write!(f, "{}", filter)?;
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Root => write!(f, ":root"),
            Filter::HasAttribute(name) => write!(f, "[{}]", name),
            Filter::AttributeEquals(name, value) => write!(f, "[{}={}]", name, quote(value)),
            Filter::Not(inner) => write!(f, ":not({})", inner),
            Filter::NotWithin(inner) => write!(f, ":not({} *)", inner),
            Filter::Index(n) => write!(f, ":index({})", n),
            Filter::Text(text) => write!(f, ":text({})", quote(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_builders() {
        let selector = ComplexSelector::new(Compound::tag("IED").attribute("name", "IED1"))
            .descendant(Compound::tag("LDevice").attribute("inst", "CB"))
            .child(Compound::tag("LN0").with(Filter::Not(Box::new(Compound::any().with(
                Filter::HasAttribute("prefix".into()),
            )))));

        assert_eq!(
            selector.to_string(),
            r#"IED[name="IED1"] LDevice[inst="CB"]>LN0:not([prefix])"#
        );

        let outside = Compound::tag("LNode").with(Filter::NotWithin(Box::new(Compound::tag("Private"))));
        assert_eq!(outside.to_string(), "LNode:not(Private *)");
    }

    #[test]
    fn test_void() {
        assert_eq!(SelectorList::void().to_string(), ":not(*)");
        assert!(SelectorList::void().is_void());
        assert!(SelectorList::new(vec![]).is_void());
        assert!(!SelectorList::new(vec![ComplexSelector::new(Compound::root())]).is_void());
    }
}
