/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Parses a document into an [`XmlElement`] tree.
//!
//! Lookups on an element only ever consider its *direct* children, so a tag that appears at
//! several depths resolves to the occurrence that belongs to the element being read.

use crate::unescape::unescape;
use std::borrow::Cow;
use thiserror::Error;
use xmlparser::{ElementEnd, Token, Tokenizer};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("invalid XML: {0}")]
    InvalidXml(#[from] xmlparser::Error),
    #[error("invalid XML escape: {0}")]
    InvalidEscape(String),
    #[error("{0}")]
    Custom(Cow<'static, str>),
}

impl XmlError {
    pub(crate) fn invalid_escape(esc: impl Into<String>) -> Self {
        XmlError::InvalidEscape(esc.into())
    }

    pub fn custom(msg: impl Into<Cow<'static, str>>) -> Self {
        XmlError::Custom(msg.into())
    }

    /// Stable error code reported to callers.
    pub fn code(&self) -> &'static str {
        "XMLParserError"
    }

    /// Malformed XML is usually a truncated response, so it is worth retrying.
    pub fn retryable(&self) -> bool {
        true
    }
}

/// An element with its attributes, child elements and concatenated text content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    name: String,
    prefix: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// Local name, without namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every direct child named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text content of this element (not including descendants).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of the direct child `name`, if present.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text())
    }

    /// Depth-first search for the first element named `name`, including `self`.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

/// Parses `doc` and returns its root element.
pub fn parse(doc: &str) -> Result<XmlElement, XmlError> {
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    for token in Tokenizer::from(doc) {
        match token? {
            Token::ElementStart { prefix, local, .. } => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::custom("document has more than one root element"));
                }
                stack.push(XmlElement {
                    name: local.as_str().to_string(),
                    prefix: Some(prefix.as_str())
                        .filter(|p| !p.is_empty())
                        .map(str::to_string),
                    ..Default::default()
                });
            }
            Token::Attribute { local, value, .. } => {
                let element = stack
                    .last_mut()
                    .ok_or_else(|| XmlError::custom("attribute outside of an element"))?;
                element
                    .attributes
                    .push((local.as_str().to_string(), unescape(value.as_str())?.into_owned()));
            }
            Token::ElementEnd { end, .. } => match end {
                ElementEnd::Open => {}
                ElementEnd::Empty => close(&mut stack, &mut root, None)?,
                ElementEnd::Close(_, local) => close(&mut stack, &mut root, Some(local.as_str()))?,
            },
            Token::Text { text } => match stack.last_mut() {
                Some(element) => element.text.push_str(&unescape(text.as_str())?),
                None if text.as_str().trim().is_empty() => {}
                None => return Err(XmlError::custom("text outside of the root element")),
            },
            Token::Cdata { text, .. } => match stack.last_mut() {
                Some(element) => element.text.push_str(text.as_str()),
                None => return Err(XmlError::custom("CDATA outside of the root element")),
            },
            _ => {}
        }
    }
    if let Some(open) = stack.last() {
        return Err(XmlError::custom(format!(
            "unexpected end of document: <{}> is not closed",
            open.name
        )));
    }
    root.ok_or_else(|| XmlError::custom("document has no root element"))
}

fn close(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    closing: Option<&str>,
) -> Result<(), XmlError> {
    let element = stack
        .pop()
        .ok_or_else(|| XmlError::custom("closing tag without a matching start tag"))?;
    if let Some(closing) = closing {
        if closing != element.name {
            return Err(XmlError::custom(format!(
                "mismatched tags: <{}> closed by </{}>",
                element.name, closing
            )));
        }
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
    Ok(())
}
