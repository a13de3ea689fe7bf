//! Newick reading and writing.
//!
//! Input is split into tokens first (punctuation, bare or single-quoted
//! labels), skipping whitespace and `[...]` comments. A second pass builds
//! the node arena with an explicit stack of open clades, so deeply nested
//! trees do not recurse. Errors carry the byte offset of the offending token.

use std::fmt::Write as _;

use crate::tree::{Node, NodeId, PhyloTree};
use phylopotts_core::{PottsError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Open,
    Close,
    Comma,
    Colon,
    Semicolon,
    Label(String),
}

fn syntax(offset: usize, what: &str) -> PottsError {
    PottsError::Parse(format!("Newick: {what} at byte {offset}"))
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b',' | b':' | b';' | b'[' | b']' | b'\'') || b.is_ascii_whitespace()
}

fn tokenize(input: &[u8]) -> Result<Vec<(usize, Tok)>> {
    let mut toks = Vec::new();
    let mut i = 0;
    while i < input.len() {
        let start = i;
        let tok = match input[i] {
            b if b.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            b'[' => {
                let Some(len) = input[i..].iter().position(|&b| b == b']') else {
                    return Err(syntax(start, "unterminated comment"));
                };
                i += len + 1;
                continue;
            }
            b']' => return Err(syntax(start, "stray ']'")),
            b'(' => Tok::Open,
            b')' => Tok::Close,
            b',' => Tok::Comma,
            b':' => Tok::Colon,
            b';' => Tok::Semicolon,
            b'\'' => {
                // '' inside quotes is one literal quote
                let mut text = Vec::new();
                i += 1;
                loop {
                    match (input.get(i), input.get(i + 1)) {
                        (None, _) => return Err(syntax(start, "unterminated quoted label")),
                        (Some(b'\''), Some(b'\'')) => {
                            text.push(b'\'');
                            i += 2;
                        }
                        (Some(b'\''), _) => break,
                        (Some(&b), _) => {
                            text.push(b);
                            i += 1;
                        }
                    }
                }
                Tok::Label(String::from_utf8_lossy(&text).into_owned())
            }
            _ => {
                let end = input[i..]
                    .iter()
                    .position(|&b| is_delimiter(b))
                    .map_or(input.len(), |n| i + n);
                let text = String::from_utf8_lossy(&input[i..end]).into_owned();
                i = end - 1;
                Tok::Label(text)
            }
        };
        i += 1;
        toks.push((start, tok));
    }
    Ok(toks)
}

/// Where the current node is in its `(children)name:length` production.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Fresh,
    Closed,
    Named,
    Measured,
}

/// Parse one Newick tree terminated by `;`.
pub fn parse(input: &str) -> Result<PhyloTree> {
    let toks = tokenize(input.as_bytes())?;
    let mut nodes = vec![Node::bare(0, None)];
    let mut open: Vec<NodeId> = Vec::new();
    let mut cur: NodeId = 0;
    let mut phase = Phase::Fresh;

    let new_child = |nodes: &mut Vec<Node>, parent: NodeId| {
        let id = nodes.len();
        nodes.push(Node::bare(id, Some(parent)));
        nodes[parent].children.push(id);
        id
    };

    let mut iter = toks.into_iter();
    while let Some((at, tok)) = iter.next() {
        match tok {
            Tok::Open if phase == Phase::Fresh => {
                open.push(cur);
                cur = new_child(&mut nodes, cur);
            }
            Tok::Open => return Err(syntax(at, "unexpected '('")),
            Tok::Comma => {
                let &parent = open.last().ok_or_else(|| syntax(at, "',' outside parentheses"))?;
                cur = new_child(&mut nodes, parent);
                phase = Phase::Fresh;
            }
            Tok::Close => {
                cur = open.pop().ok_or_else(|| syntax(at, "unbalanced ')'"))?;
                phase = Phase::Closed;
            }
            Tok::Label(text) if matches!(phase, Phase::Fresh | Phase::Closed) => {
                if !text.is_empty() {
                    nodes[cur].name = Some(text);
                }
                phase = Phase::Named;
            }
            Tok::Label(text) => return Err(syntax(at, &format!("unexpected label '{text}'"))),
            Tok::Colon if phase != Phase::Measured => {
                let Some((num_at, Tok::Label(text))) = iter.next() else {
                    return Err(syntax(at, "expected number after ':'"));
                };
                let length: f64 = text
                    .parse()
                    .ok()
                    .filter(|v: &f64| v.is_finite())
                    .ok_or_else(|| syntax(num_at, &format!("invalid branch length '{text}'")))?;
                nodes[cur].branch_length = Some(length);
                phase = Phase::Measured;
            }
            Tok::Colon => return Err(syntax(at, "second branch length")),
            Tok::Semicolon => {
                if !open.is_empty() {
                    return Err(syntax(at, "unbalanced '(' before ';'"));
                }
                if let Some((extra, _)) = iter.next() {
                    return Err(syntax(extra, "unexpected content after ';'"));
                }
                return PhyloTree::from_nodes(nodes, 0);
            }
        }
    }
    Err(syntax(input.len(), "expected ';'"))
}

/// Render a tree as Newick text ending in `;`.
///
/// Branch lengths use at most ten decimals with trailing zeros dropped.
/// Labels containing Newick punctuation or whitespace are single-quoted.
pub fn write(tree: &PhyloTree) -> String {
    enum Step {
        Enter(NodeId),
        Comma,
        Leave(NodeId),
    }

    let nodes = tree.nodes();
    let mut out = String::new();
    let mut todo = vec![Step::Enter(tree.root())];
    while let Some(step) = todo.pop() {
        match step {
            Step::Comma => out.push(','),
            Step::Enter(id) if nodes[id].is_leaf() => push_label(&nodes[id], &mut out),
            Step::Enter(id) => {
                out.push('(');
                todo.push(Step::Leave(id));
                for (k, &child) in nodes[id].children.iter().enumerate().rev() {
                    todo.push(Step::Enter(child));
                    if k > 0 {
                        todo.push(Step::Comma);
                    }
                }
            }
            Step::Leave(id) => {
                out.push(')');
                push_label(&nodes[id], &mut out);
            }
        }
    }
    out.push(';');
    out
}

fn push_label(node: &Node, out: &mut String) {
    if let Some(name) = &node.name {
        if name.bytes().any(is_delimiter) {
            let _ = write!(out, "'{}'", name.replace('\'', "''"));
        } else {
            out.push_str(name);
        }
    }
    if let Some(length) = node.branch_length {
        out.push(':');
        out.push_str(&format_length(length));
    }
}

/// `0.3000000000` becomes `0.3`, and `-0.0` becomes `0`.
fn format_length(length: f64) -> String {
    let fixed = format!("{length:.10}");
    match fixed.trim_end_matches('0').trim_end_matches('.') {
        "" | "-" | "-0" => "0".to_owned(),
        short => short.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named<'t>(tree: &'t PhyloTree, name: &str) -> &'t Node {
        tree.nodes()
            .iter()
            .find(|n| n.name.as_deref() == Some(name))
            .unwrap()
    }

    #[test]
    fn two_leaf_tree() {
        let tree = parse("(p,q);").unwrap();
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.leaf_names(), vec!["p", "q"]);
        assert_eq!(tree.get_node(tree.root()).unwrap().name, None);
    }

    #[test]
    fn lengths_attach_to_the_right_nodes() {
        let tree = parse("((homo:0.3,mouse:0.3):0.4,fish:0.5);").unwrap();
        assert_eq!(tree.node_count(), 5);
        let fish = named(&tree, "fish");
        assert_eq!(fish.branch_length, Some(0.5));
        assert_eq!(fish.parent, Some(tree.root()));
        let clade = named(&tree, "homo").parent.unwrap();
        assert_eq!(tree.get_node(clade).unwrap().branch_length, Some(0.4));
    }

    #[test]
    fn internal_labels() {
        let tree = parse("((a,b)ab:1,(c,d)cd)all;").unwrap();
        assert_eq!(tree.get_node(tree.root()).unwrap().name.as_deref(), Some("all"));
        assert_eq!(named(&tree, "ab").children.len(), 2);
        assert_eq!(named(&tree, "ab").branch_length, Some(1.0));
    }

    #[test]
    fn lone_leaf() {
        let tree = parse("solo:2.5;").unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(named(&tree, "solo").branch_length, Some(2.5));
    }

    #[test]
    fn whitespace_and_comments_are_ignored() {
        let tree = parse(" ( a : 0.1 [&support=0.9] ,\n b:0.2 )[root] ;\n").unwrap();
        assert_eq!(tree.leaf_names(), vec!["a", "b"]);
        assert_eq!(named(&tree, "a").branch_length, Some(0.1));
    }

    #[test]
    fn quoted_labels_round_trip() {
        let text = "('Homo sapiens':0.1,'O''Brien':0.2);";
        let tree = parse(text).unwrap();
        assert_eq!(tree.leaf_names(), vec!["Homo sapiens", "O'Brien"]);
        assert_eq!(write(&tree), text);
    }

    #[test]
    fn errors_report_offsets() {
        let err = parse("(a,b)").unwrap_err();
        assert_eq!(err.to_string(), "parse error: Newick: expected ';' at byte 5");
        let err = parse("(a:x,b);").unwrap_err();
        assert!(err.to_string().contains("invalid branch length 'x' at byte 3"));
    }

    #[test]
    fn malformed_inputs() {
        for bad in [
            "((a,b);",
            "(a,b));",
            "(a,b);(c,d);",
            "(a:1:2,b);",
            "(a b,c);",
            "(a:,b);",
            "(a,b)[note;",
            "('open,b);",
            "a,b;",
            "(a:inf,b);",
            "(a)(b);",
        ] {
            assert!(parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn writer_trims_lengths() {
        let tree = parse("((0:0.300,2:0.3):0.40,1:0.5);").unwrap();
        assert_eq!(write(&tree), "((0:0.3,2:0.3):0.4,1:0.5);");
        let tree = parse("(a:0,b:0.0,c:-0.0);").unwrap();
        assert_eq!(write(&tree), "(a:0,b:0,c:0);");
    }

    #[test]
    fn topology_only_round_trip() {
        let text = "(((a,b),c),(d,e)f);";
        assert_eq!(write(&parse(text).unwrap()), text);
    }
}
