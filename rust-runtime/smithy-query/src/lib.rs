/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Writer for `application/x-www-form-urlencoded` query protocol bodies.
//!
//! Parameter names are built up from prefixes: structure members append `.Member`, lists append
//! `.member.N` (or `.N` when flattened) and maps append `.entry.N.key` / `.entry.N.value`.

use smithy_types::instant::Format;
use smithy_types::Instant;
use std::borrow::Cow;
use urlencoding::encode;

pub struct QueryWriter<'a> {
    output: &'a mut String,
}

impl<'a> QueryWriter<'a> {
    /// Starts a body with the mandatory `Action` and `Version` parameters.
    pub fn new(output: &'a mut String, action: &str, version: &str) -> Self {
        output.push_str("Action=");
        output.push_str(&encode(action));
        output.push_str("&Version=");
        output.push_str(&encode(version));
        QueryWriter { output }
    }

    pub fn prefix(&mut self, prefix: &str) -> QueryValueWriter<'_> {
        QueryValueWriter::new(self.output, Cow::Owned(prefix.to_string()))
    }

    pub fn finish(self) {}
}

#[must_use]
pub struct QueryMapWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
    flatten: bool,
    key_name: &'a str,
    value_name: &'a str,
    next_index: usize,
}

impl<'a> QueryMapWriter<'a> {
    pub fn entry(&mut self, key: &str) -> QueryValueWriter<'_> {
        let entry = if self.flatten { "" } else { ".entry" };
        self.output.push('&');
        self.output.push_str(&format!(
            "{}{}.{}.{}",
            self.prefix, entry, self.next_index, self.key_name
        ));
        self.output.push('=');
        self.output.push_str(&encode(key));
        let value_name = format!(
            "{}{}.{}.{}",
            self.prefix, entry, self.next_index, self.value_name
        );
        self.next_index += 1;
        QueryValueWriter::new(self.output, Cow::Owned(value_name))
    }

    pub fn finish(self) {}
}

#[must_use]
pub struct QueryListWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
    flatten: bool,
    member_override: Option<&'a str>,
    next_index: usize,
}

impl<'a> QueryListWriter<'a> {
    pub fn entry(&mut self) -> QueryValueWriter<'_> {
        let value_name = match (self.flatten, self.member_override) {
            (true, _) => format!("{}.{}", self.prefix, self.next_index),
            (false, Some(member)) => format!("{}.{}.{}", self.prefix, member, self.next_index),
            (false, None) => format!("{}.member.{}", self.prefix, self.next_index),
        };
        self.next_index += 1;
        QueryValueWriter::new(self.output, Cow::Owned(value_name))
    }

    /// An empty list still serializes its parameter name with an empty value.
    pub fn finish(self) {
        if self.next_index == 1 {
            QueryValueWriter::new(self.output, self.prefix).write_param_name();
        }
    }
}

#[must_use]
pub struct QueryValueWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
}

impl<'a> QueryValueWriter<'a> {
    pub fn new(output: &'a mut String, prefix: Cow<'a, str>) -> QueryValueWriter<'a> {
        QueryValueWriter { output, prefix }
    }

    /// Starts a nested prefix, e.g. a structure member.
    pub fn prefix(&mut self, prefix: &str) -> QueryValueWriter<'_> {
        QueryValueWriter::new(
            self.output,
            Cow::Owned(format!("{}.{}", self.prefix, prefix)),
        )
    }

    pub fn boolean(mut self, value: bool) {
        self.write_param_name();
        self.output.push_str(if value { "true" } else { "false" });
    }

    pub fn string(mut self, value: &str) {
        self.write_param_name();
        self.output.push_str(&encode(value));
    }

    pub fn integer(self, value: i64) {
        self.string(&value.to_string())
    }

    pub fn float(self, value: f64) {
        self.string(&value.to_string())
    }

    pub fn instant(self, instant: &Instant, format: Format) {
        self.string(&instant.fmt(format));
    }

    pub fn start_map(self, flat: bool, key_name: &'a str, value_name: &'a str) -> QueryMapWriter<'a> {
        QueryMapWriter {
            output: self.output,
            prefix: self.prefix,
            flatten: flat,
            key_name,
            value_name,
            next_index: 1,
        }
    }

    pub fn start_list(self, flat: bool, member_override: Option<&'a str>) -> QueryListWriter<'a> {
        QueryListWriter {
            output: self.output,
            prefix: self.prefix,
            flatten: flat,
            member_override,
            next_index: 1,
        }
    }

    fn write_param_name(&mut self) {
        self.output.push('&');
        self.output.push_str(&self.prefix);
        self.output.push('=');
    }
}

#[cfg(test)]
mod tests {
    use crate::QueryWriter;
    use smithy_types::instant::Format;
    use smithy_types::Instant;

    #[test]
    fn no_params() {
        let mut out = String::new();
        let writer = QueryWriter::new(&mut out, "SomeAction", "1.0");
        writer.finish();
        assert_eq!("Action=SomeAction&Version=1.0", out);
    }

    #[test]
    fn empty_list_and_empty_string_are_present() {
        let mut out = String::new();
        let mut writer = QueryWriter::new(&mut out, "SomeAction", "1.0");
        writer.prefix("myList").start_list(false, None).finish();
        writer.prefix("myString").string("");
        writer.finish();
        assert_eq!("Action=SomeAction&Version=1.0&myList=&myString=", out);
    }

    #[test]
    fn lists() {
        let mut out = String::new();
        let mut writer = QueryWriter::new(&mut out, "SomeAction", "1.0");
        let mut list = writer.prefix("Names").start_list(false, None);
        list.entry().string("a b");
        list.entry().string("c");
        list.finish();
        let mut flat = writer.prefix("Ids").start_list(true, None);
        flat.entry().integer(1);
        flat.finish();
        let mut custom = writer.prefix("Items").start_list(false, Some("item"));
        custom.entry().boolean(true);
        custom.finish();
        writer.finish();
        assert_eq!(
            "Action=SomeAction&Version=1.0\
             &Names.member.1=a%20b&Names.member.2=c\
             &Ids.1=1\
             &Items.item.1=true",
            out
        );
    }

    #[test]
    fn maps_and_nested_structures() {
        let mut out = String::new();
        let mut writer = QueryWriter::new(&mut out, "SomeAction", "1.0");
        let mut map = writer.prefix("Attrs").start_map(false, "key", "value");
        map.entry("color").string("red");
        map.finish();
        let mut flat = writer.prefix("Flat").start_map(true, "Name", "Value");
        flat.entry("k").float(1.5);
        flat.finish();
        writer
            .prefix("Outer")
            .prefix("When")
            .instant(&Instant::from_epoch_seconds(0), Format::DateTime);
        writer.finish();
        assert_eq!(
            "Action=SomeAction&Version=1.0\
             &Attrs.entry.1.key=color&Attrs.entry.1.value=red\
             &Flat.1.Name=k&Flat.1.Value=1.5\
             &Outer.When=1970-01-01T00%3A00%3A00Z",
            out
        );
    }
}
