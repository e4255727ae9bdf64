//! Incremental XML tokenizer for the INDI wire stream
//!
//! INDI has no message framing: a server writes one root element after
//! another onto a TCP stream and socket reads can end anywhere, even in the
//! middle of a multi-byte character. [`XmlTokenizer`] is a byte-level state
//! machine that keeps its state between calls to [`XmlTokenizer::parse`] and
//! only surfaces an [`XmlNode`] once a root element has been closed.
//!
//! The grammar is deliberately small: tags, attributes, text and
//! self-closing tags. No entity decoding is performed, declarations and
//! comments are skipped, and malformed input never produces an error. It
//! either stalls in the current state or is dropped.

use indexmap::IndexMap;

/// Attribute map of an [`XmlNode`], in document order.
pub type XmlAttributes = IndexMap<String, String>;

/// A completed XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: XmlAttributes,
    pub children: Vec<XmlNode>,
    /// Trimmed text segments of this element, concatenated.
    pub text: String,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Iterate over the children with the given tag name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    TagOpen,
    TagName,
    AttrName,
    AttrValue,
    Text,
    SelfClose,
    TagClose,
    /// `<?...>` and `<!...>`, skipped up to the next `>`
    Declaration,
}

const OPEN_ANGLE: u8 = b'<';
const CLOSE_ANGLE: u8 = b'>';
const SLASH: u8 = b'/';
const EQUAL: u8 = b'=';

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b':' | b'_' | b'-' | b'.')
}

fn is_quote(byte: u8) -> bool {
    byte == b'"' || byte == b'\''
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Byte-incremental XML tokenizer.
///
/// Feed it arbitrary slices of the stream; every call returns the root
/// elements completed by that slice, in order.
#[derive(Debug)]
pub struct XmlTokenizer {
    state: State,
    tag: Vec<u8>,
    name: Vec<u8>,
    value: Vec<u8>,
    quote: Option<u8>,
    text: Vec<u8>,
    attributes: XmlAttributes,
    tree: Vec<XmlNode>,
}

impl Default for XmlTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlTokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Start,
            tag: Vec::new(),
            name: Vec::new(),
            value: Vec::new(),
            quote: None,
            text: Vec::new(),
            attributes: XmlAttributes::new(),
            tree: Vec::new(),
        }
    }

    /// Consume a chunk of the stream and return every root element it completed.
    pub fn parse(&mut self, input: &[u8]) -> Vec<XmlNode> {
        let mut nodes = Vec::new();

        for &byte in input {
            if let Some(node) = self.process_byte(byte) {
                nodes.push(node);
            }
        }

        nodes
    }

    /// Discard any partially parsed element.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.tree.len()
    }

    fn process_byte(&mut self, byte: u8) -> Option<XmlNode> {
        match self.state {
            State::Start => {
                if byte == OPEN_ANGLE {
                    self.state = State::TagOpen;
                }
            }
            State::TagOpen => {
                if byte.is_ascii_alphanumeric() {
                    self.tag.clear();
                    self.tag.push(byte);
                    self.attributes.clear();
                    self.state = State::TagName;
                } else if byte == SLASH {
                    self.tag.clear();
                    self.state = State::TagClose;
                } else if byte == b'?' || byte == b'!' {
                    self.state = State::Declaration;
                }
            }
            State::TagName => {
                if is_name_byte(byte) {
                    self.tag.push(byte);
                } else if byte.is_ascii_whitespace() {
                    self.state = State::AttrName;
                } else if byte == CLOSE_ANGLE {
                    self.open_node();
                    self.state = State::Text;
                } else if byte == SLASH {
                    self.state = State::SelfClose;
                }
            }
            State::AttrName => {
                if is_name_byte(byte) {
                    self.name.push(byte);
                } else if byte == EQUAL {
                    self.quote = None;
                    self.value.clear();
                    self.state = State::AttrValue;
                } else if byte.is_ascii_whitespace() {
                    self.commit_bare_attribute();
                } else if byte == CLOSE_ANGLE {
                    self.commit_bare_attribute();
                    self.open_node();
                    self.state = State::Text;
                } else if byte == SLASH {
                    self.commit_bare_attribute();
                    self.state = State::SelfClose;
                }
            }
            State::AttrValue => match self.quote {
                Some(quote) if byte == quote => {
                    let name = lossy(&self.name);
                    let value = lossy(&self.value);
                    self.attributes.insert(name, value);
                    self.name.clear();
                    self.value.clear();
                    self.quote = None;
                    self.state = State::AttrName;
                }
                Some(_) => self.value.push(byte),
                None if is_quote(byte) => self.quote = Some(byte),
                None => {}
            },
            State::Text => {
                if byte == OPEN_ANGLE {
                    self.commit_text();
                    self.state = State::TagOpen;
                } else {
                    self.text.push(byte);
                }
            }
            State::SelfClose => {
                if byte == CLOSE_ANGLE {
                    let node = self.take_node();
                    return self.finish(node);
                }
            }
            State::TagClose => {
                if is_name_byte(byte) {
                    self.tag.push(byte);
                } else if byte == CLOSE_ANGLE {
                    return self.close_node();
                }
            }
            State::Declaration => {
                if byte == CLOSE_ANGLE {
                    self.state = self.resting_state();
                }
            }
        }

        None
    }

    fn resting_state(&self) -> State {
        if self.tree.is_empty() {
            State::Start
        } else {
            State::Text
        }
    }

    fn commit_bare_attribute(&mut self) {
        if !self.name.is_empty() {
            let name = lossy(&self.name);
            self.attributes.insert(name, String::new());
            self.name.clear();
        }
    }

    fn commit_text(&mut self) {
        if let Some(node) = self.tree.last_mut() {
            let text = String::from_utf8_lossy(&self.text);
            let text = text.trim();

            if !text.is_empty() {
                node.text.push_str(text);
            }
        }

        self.text.clear();
    }

    fn take_node(&mut self) -> XmlNode {
        let node = XmlNode {
            name: lossy(&self.tag),
            attributes: std::mem::take(&mut self.attributes),
            children: Vec::new(),
            text: String::new(),
        };

        self.tag.clear();
        self.name.clear();
        self.value.clear();
        self.quote = None;

        node
    }

    fn open_node(&mut self) {
        let node = self.take_node();
        self.tree.push(node);
    }

    fn close_node(&mut self) -> Option<XmlNode> {
        let name = lossy(&self.tag);
        self.tag.clear();

        let index = if name.is_empty() {
            self.tree.len().checked_sub(1)
        } else {
            self.tree.iter().rposition(|node| node.name == name)
        };

        let Some(index) = index else {
            tracing::debug!("ignoring close tag </{}> without a matching open element", name);
            self.state = self.resting_state();
            return None;
        };

        // Elements left open inside the closed one are closed implicitly.
        while self.tree.len() > index + 1 {
            if let Some(node) = self.tree.pop() {
                tracing::debug!("implicitly closing <{}> at </{}>", node.name, name);
                self.finish(node);
            }
        }

        let node = self.tree.pop()?;
        self.finish(node)
    }

    /// Attach a finalized node to its parent, or hand it out when it is a root.
    fn finish(&mut self, node: XmlNode) -> Option<XmlNode> {
        let completed = match self.tree.last_mut() {
            Some(parent) => {
                parent.children.push(node);
                None
            }
            None => Some(node),
        };

        self.state = self.resting_state();
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: &str = r#"
<person id="1" type="student">
    <name>
    John Doe
    </name>
    <age>25</age>
    <address city="New York"/>
</person>
"#;

    fn node(name: &str, attributes: &[(&str, &str)], children: Vec<XmlNode>, text: &str) -> XmlNode {
        XmlNode {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
            text: text.to_string(),
        }
    }

    fn parse_str(input: &str) -> Vec<XmlNode> {
        XmlTokenizer::new().parse(input.as_bytes())
    }

    fn assert_person(tag: &XmlNode) {
        assert_eq!(tag.name, "person");
        assert_eq!(tag.attribute("id"), Some("1"));
        assert_eq!(tag.attribute("type"), Some("student"));
        assert!(tag.text.is_empty());
        assert_eq!(tag.children.len(), 3);
        assert_eq!(tag.children[0].name, "name");
        assert_eq!(tag.children[0].text, "John Doe");
        assert!(tag.children[0].children.is_empty());
        assert_eq!(tag.children[1].name, "age");
        assert_eq!(tag.children[1].text, "25");
        assert_eq!(tag.children[2].name, "address");
        assert_eq!(tag.children[2].attribute("city"), Some("New York"));
        assert_eq!(tag.children[2].text, "");
    }

    #[test]
    fn test_single_document() {
        let tags = parse_str(PERSON);
        assert_eq!(tags.len(), 1);
        assert_person(&tags[0]);
    }

    #[test]
    fn test_multiple_documents() {
        let tags = parse_str(&format!("{PERSON}{PERSON}{PERSON}"));
        assert_eq!(tags.len(), 3);
        tags.iter().for_each(assert_person);
    }

    #[test]
    fn test_split_by_lines() {
        let mut tokenizer = XmlTokenizer::new();
        let lines: Vec<&str> = PERSON.trim().split('\n').collect();

        for line in &lines[..lines.len() - 1] {
            assert!(tokenizer.parse(line.as_bytes()).is_empty());
        }

        let tags = tokenizer.parse(lines[lines.len() - 1].as_bytes());
        assert_eq!(tags.len(), 1);
        assert_person(&tags[0]);
    }

    #[test]
    fn test_chunking_does_not_change_output() {
        let input = format!(
            "{PERSON}<a><b>x</b>y</a><defSwitchVector device='CCD Simulator'\n    name=\"CONNECTION\">\n<defSwitch name=\"CONNECT\">Off</defSwitch></defSwitchVector>"
        );
        let expected = parse_str(&input);
        assert_eq!(expected.len(), 3);

        for size in [1, 2, 3, 7, 64] {
            let mut tokenizer = XmlTokenizer::new();
            let mut nodes = Vec::new();

            for chunk in input.as_bytes().chunks(size) {
                nodes.extend(tokenizer.parse(chunk));
            }

            assert_eq!(nodes, expected, "chunk size {size}");
        }
    }

    #[test]
    fn test_text_after_child() {
        let tags = parse_str("<a><b>x</b>y</a>");
        assert_eq!(tags, vec![node("a", &[], vec![node("b", &[], vec![], "x")], "y")]);
    }

    #[test]
    fn test_two_roots_in_order() {
        let tags = parse_str("<a></a><b></b>");
        assert_eq!(tags, vec![node("a", &[], vec![], ""), node("b", &[], vec![], "")]);
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(parse_str("<person></person>"), vec![node("person", &[], vec![], "")]);
        assert_eq!(parse_str("<person age=\"30\"></person>"), vec![node("person", &[("age", "30")], vec![], "")]);
        assert_eq!(
            parse_str("<person name=\"John\" disabled student></person>"),
            vec![node("person", &[("name", "John"), ("disabled", ""), ("student", "")], vec![], "")]
        );
        assert_eq!(parse_str("<person gender=\"\"></person>"), vec![node("person", &[("gender", "")], vec![], "")]);
        assert_eq!(parse_str("<person>Text</person>"), vec![node("person", &[], vec![], "Text")]);

        let phone = node("phone", &[("number", "5511987654321")], vec![], "");
        let expected = vec![node("person", &[("name", "John")], vec![phone], "")];
        assert_eq!(parse_str("<person name=\"John\"><phone number=\"5511987654321\"></phone></person>"), expected);
        assert_eq!(parse_str("<person name=\"John\"><phone number=\"5511987654321\" /></person>"), expected);

        assert_eq!(
            parse_str("<person name=\"John\"><address><city>New York</city><complement/></address></person>"),
            vec![node(
                "person",
                &[("name", "John")],
                vec![node(
                    "address",
                    &[],
                    vec![node("city", &[], vec![], "New York"), node("complement", &[], vec![], "")],
                    ""
                )],
                ""
            )]
        );

        assert_eq!(parse_str("<person/>"), vec![node("person", &[], vec![], "")]);
        assert_eq!(parse_str("<person name=\"John\"/>"), vec![node("person", &[("name", "John")], vec![], "")]);
        assert_eq!(
            parse_str("<person name=\"John\" disabled student/>"),
            vec![node("person", &[("name", "John"), ("disabled", ""), ("student", "")], vec![], "")]
        );
        assert_eq!(parse_str("<person gender=\"\"/>"), vec![node("person", &[("gender", "")], vec![], "")]);
    }

    #[test]
    fn test_single_quotes_and_mixed_quotes() {
        let tags = parse_str("<a x='1' y=\"it's\"/>");
        assert_eq!(tags, vec![node("a", &[("x", "1"), ("y", "it's")], vec![], "")]);
    }

    #[test]
    fn test_mismatched_close_tag_is_ignored() {
        let tags = parse_str("<a><b>x</c></b></a>");
        assert_eq!(tags, vec![node("a", &[], vec![node("b", &[], vec![], "x")], "")]);
    }

    #[test]
    fn test_close_tag_closes_unterminated_children() {
        let tags = parse_str("<a><b>x</a>");
        assert_eq!(tags, vec![node("a", &[], vec![node("b", &[], vec![], "x")], "")]);
    }

    #[test]
    fn test_declarations_and_comments_are_skipped() {
        let tags = parse_str("<?xml version=\"1.0\"?>\n<!-- hello --><a><!-- inner -->t</a>");
        assert_eq!(tags, vec![node("a", &[], vec![], "t")]);
    }

    #[test]
    fn test_split_multibyte_text() {
        let input = "<a>température</a>".as_bytes();
        let mut tokenizer = XmlTokenizer::new();
        let mut nodes = Vec::new();

        for chunk in input.chunks(1) {
            nodes.extend(tokenizer.parse(chunk));
        }

        assert_eq!(nodes, vec![node("a", &[], vec![], "température")]);
    }

    #[test]
    fn test_garbage_outside_elements_is_ignored() {
        let tags = parse_str("junk > / = \"<a>1</a> trailing");
        assert_eq!(tags, vec![node("a", &[], vec![], "1")]);
    }

    #[test]
    fn test_reset_discards_partial_element() {
        let mut tokenizer = XmlTokenizer::new();
        assert!(tokenizer.parse(b"<a><b>half").is_empty());
        assert_eq!(tokenizer.depth(), 2);

        tokenizer.reset();
        assert_eq!(tokenizer.depth(), 0);
        assert_eq!(tokenizer.parse(b"<c/>"), vec![node("c", &[], vec![], "")]);
    }
}
