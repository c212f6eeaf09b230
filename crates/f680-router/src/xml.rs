//! Router XML responses
//!
//! Every XML endpoint answers with an `ajax_response_xml_root` document.
//! Responses are small, so they are read into a tree and queried from there.

use f680_core::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;

/// Root element of every XML response
pub(crate) const RESPONSE_ROOT: &str = "ajax_response_xml_root";

const ERROR_ID: &str = "IF_ERRORID";
const ERROR_STR: &str = "IF_ERRORSTR";
const INSTANCE: &str = "Instance";
const PARA_NAME: &str = "ParaName";
const PARA_VALUE: &str = "ParaValue";

/// One element with its concatenated text and child elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct XmlNode {
    pub(crate) tag: String,
    pub(crate) text: Option<String>,
    pub(crate) children: Vec<XmlNode>,
}

impl XmlNode {
    fn new(tag: String) -> Self {
        Self {
            tag,
            ..Self::default()
        }
    }

    /// First child named `tag`
    pub(crate) fn child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Text of the first child named `tag`, empty when missing
    pub(crate) fn child_text(&self, tag: &str) -> &str {
        self.child(tag).map(XmlNode::text).unwrap_or("")
    }

    pub(crate) fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Parse an XML document into a tree
pub(crate) fn parse(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::parse(format!("malformed XML: {}", e)))?;

        match event {
            Event::Start(e) => stack.push(node_from_start(&e)?),
            Event::Empty(e) => attach(&mut stack, &mut root, node_from_start(&e)?)?,
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::parse(format!("undecodable XML text: {}", e)))?;
                append_text(&mut stack, &text);
            }
            Event::CData(e) => append_text(&mut stack, &String::from_utf8_lossy(&e)),
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| Error::parse("closing tag without open tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::parse("unclosed element(s) at end of document"));
    }

    root.ok_or_else(|| Error::parse("no root element found"))
}

fn node_from_start(e: &BytesStart<'_>) -> Result<XmlNode> {
    Ok(XmlNode::new(qname_to_string(e.name())?))
}

fn qname_to_string(name: QName<'_>) -> Result<String> {
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|e| Error::parse(format!("invalid UTF-8 in tag name: {}", e)))
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    } else {
        return Err(Error::parse("multiple top-level elements found"));
    }
    Ok(())
}

fn append_text(stack: &mut [XmlNode], text: &str) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    if text.trim().is_empty() {
        return;
    }
    match &mut current.text {
        Some(existing) => existing.push_str(text),
        None => current.text = Some(text.to_string()),
    }
}

/// Parse a response and require the `ajax_response_xml_root` root
pub(crate) fn parse_response(xml: &str) -> Result<XmlNode> {
    let root = parse(xml)?;
    if root.tag != RESPONSE_ROOT {
        return Err(Error::parse(format!(
            "unexpected XML root <{}>, expected <{}>",
            root.tag, RESPONSE_ROOT
        )));
    }
    Ok(root)
}

/// Fail on a non-zero `IF_ERRORID`
///
/// A missing `IF_ERRORID` counts as an error with an empty code.
pub(crate) fn check_remote_error(root: &XmlNode) -> Result<()> {
    match Error::remote(root.child_text(ERROR_ID).trim(), root.child_text(ERROR_STR).trim()) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// `Instance` elements of the object `object`, as name/value pairs
///
/// Names and values are zipped by position. A missing object yields no
/// instances. A name without a value is returned with `None`.
pub(crate) fn instances<'a>(
    root: &'a XmlNode,
    object: &str,
) -> Vec<Vec<(&'a str, Option<&'a str>)>> {
    let Some(object) = root.child(object) else {
        return Vec::new();
    };

    object
        .children
        .iter()
        .filter(|c| c.tag == INSTANCE)
        .map(|instance| {
            let names = instance.children.iter().filter(|c| c.tag == PARA_NAME);
            let mut values = instance.children.iter().filter(|c| c.tag == PARA_VALUE);
            names
                .map(|name| (name.text().trim(), values.next().map(XmlNode::text)))
                .collect()
        })
        .collect()
}
