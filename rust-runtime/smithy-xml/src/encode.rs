/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Streaming XML writer.
//!
//! ```
//! use smithy_xml::encode::XmlWriter;
//! let mut out = String::new();
//! let mut writer = XmlWriter::new(&mut out);
//! let mut root = writer.start_el("Root").write_ns("urn:example", None).finish();
//! root.start_el("Name").finish().data("a < b");
//! root.finish();
//! assert_eq!(out, r#"<Root xmlns="urn:example"><Name>a &lt; b</Name></Root>"#);
//! ```

use crate::escape::escape;

pub struct XmlWriter<'a> {
    doc: &'a mut String,
}

impl<'a> XmlWriter<'a> {
    pub fn new(doc: &'a mut String) -> Self {
        XmlWriter { doc }
    }

    pub fn start_el<'b>(&'b mut self, tag: &'b str) -> ElWriter<'b> {
        ElWriter::new(self.doc, tag)
    }
}

/// Writer for a start tag that may still receive attributes.
#[must_use]
pub struct ElWriter<'a> {
    doc: &'a mut String,
    tag: &'a str,
}

impl<'a> ElWriter<'a> {
    fn new(doc: &'a mut String, tag: &'a str) -> Self {
        doc.push('<');
        doc.push_str(tag);
        ElWriter { doc, tag }
    }

    pub fn write_attribute(self, key: &str, value: &str) -> Self {
        self.doc.push(' ');
        self.doc.push_str(key);
        self.doc.push_str("=\"");
        self.doc.push_str(&escape(value));
        self.doc.push('"');
        self
    }

    pub fn write_ns(self, namespace: &str, prefix: Option<&str>) -> Self {
        match prefix {
            Some(prefix) => {
                let key = format!("xmlns:{}", prefix);
                self.write_attribute(&key, namespace)
            }
            None => self.write_attribute("xmlns", namespace),
        }
    }

    /// Closes the start tag; the returned scope writes the element body.
    pub fn finish(self) -> ScopeWriter<'a> {
        self.doc.push('>');
        ScopeWriter {
            doc: self.doc,
            tag: self.tag,
        }
    }
}

/// Writer for the body of an open element. The end tag is written by [`ScopeWriter::finish`]
/// or by [`ScopeWriter::data`].
#[must_use]
pub struct ScopeWriter<'a> {
    doc: &'a mut String,
    tag: &'a str,
}

impl<'a> ScopeWriter<'a> {
    pub fn start_el<'b>(&'b mut self, tag: &'b str) -> ElWriter<'b> {
        ElWriter::new(self.doc, tag)
    }

    /// Writes escaped text and closes the element.
    pub fn data(self, data: &str) {
        self.doc.push_str(&escape(data));
        self.finish();
    }

    pub fn finish(self) {
        self.doc.push_str("</");
        self.doc.push_str(self.tag);
        self.doc.push('>');
    }
}
