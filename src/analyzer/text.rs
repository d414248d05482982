//! Plain SQL and text files.

use super::SourceNode;
use crate::query::HostNode;

/// The whole file as a single node starting on line 1.
pub fn text_nodes(content: &str) -> Vec<SourceNode> {
    vec![SourceNode {
        node: HostNode::plain_text(content),
        line: Some(1),
        range: Some(0..content.len()),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_node_per_file() {
        let nodes = text_nodes("select 1\n");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node.text(), Some("select 1\n"));
        assert_eq!(nodes[0].range, Some(0..9));
    }
}
