//! Minimal reader for Slack `rich_text` block trees.
//!
//! Message events carry their formatted body as a tree of typed nodes. The
//! inbox only needs the leading run of plain text, so this module models just
//! enough of the shape to walk it.

use serde::Deserialize;

/// One node of a `rich_text` tree. Unknown fields are ignored so new Slack
/// element types deserialize without errors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub elements: Vec<RichTextNode>,
}

/// Depth-first search for the first node carrying a `text` field. Mention and
/// emoji elements have no `text`, so a message that opens with one still
/// yields its first written words.
pub fn first_leaf_text(nodes: &[RichTextNode]) -> Option<&str> {
    for node in nodes {
        if let Some(ref text) = node.text {
            return Some(text);
        }
        if let Some(found) = first_leaf_text(&node.elements) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: &str, text: Option<&str>, elements: Vec<RichTextNode>) -> RichTextNode {
        RichTextNode {
            kind: kind.to_string(),
            text: text.map(str::to_string),
            elements,
        }
    }

    #[test]
    fn finds_first_text_two_levels_down() {
        let blocks = vec![node(
            "rich_text",
            None,
            vec![node(
                "rich_text_section",
                None,
                vec![
                    node("text", Some("hello there"), vec![]),
                    node("text", Some("ignored"), vec![]),
                ],
            )],
        )];

        assert_eq!(first_leaf_text(&blocks), Some("hello there"));
    }

    #[test]
    fn skips_textless_siblings() {
        let blocks = vec![node(
            "rich_text",
            None,
            vec![node(
                "rich_text_section",
                None,
                vec![
                    node("user", None, vec![]),
                    node("text", Some("after the mention"), vec![]),
                ],
            )],
        )];

        assert_eq!(first_leaf_text(&blocks), Some("after the mention"));
    }

    #[test]
    fn empty_or_textless_tree_yields_none() {
        assert_eq!(first_leaf_text(&[]), None);

        let blocks = vec![node(
            "rich_text",
            None,
            vec![node("rich_text_section", None, vec![node("user", None, vec![])])],
        )];
        assert_eq!(first_leaf_text(&blocks), None);
    }

    #[test]
    fn deserializes_event_payload_shape() {
        let raw = serde_json::json!([
            {
                "type": "rich_text",
                "block_id": "b1",
                "elements": [
                    {
                        "type": "rich_text_section",
                        "elements": [
                            { "type": "text", "text": "need a hand" },
                            { "type": "emoji", "name": "wave" }
                        ]
                    }
                ]
            }
        ]);

        let blocks: Vec<RichTextNode> = serde_json::from_value(raw).unwrap();
        assert_eq!(first_leaf_text(&blocks), Some("need a hand"));
    }
}
