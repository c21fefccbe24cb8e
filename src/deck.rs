//! Player deck: a queue of detached nodes, the first of which can be swapped onto the board.

use crate::node::Node;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct Deck {
    current: Option<Node>,
    /// Shown behind the current node.
    shown: VecDeque<Node>,
    hidden: VecDeque<Node>,
    visible: usize,
}

impl Deck {
    /// Deal the first `visible` nodes: the first becomes current, the rest are shown.
    pub fn new(nodes: impl IntoIterator<Item = Node>, visible: usize) -> Self {
        let mut hidden: VecDeque<Node> = nodes.into_iter().collect();
        let mut deck = Self {
            current: None,
            shown: VecDeque::new(),
            hidden: VecDeque::new(),
            visible: visible.max(1),
        };
        for i in 0..deck.visible {
            let Some(node) = hidden.pop_front() else {
                break;
            };
            if i == 0 {
                deck.current = Some(node);
            } else {
                deck.shown.push_back(node);
            }
        }
        deck.hidden = hidden;
        deck
    }

    pub fn current(&self) -> Option<&Node> {
        self.current.as_ref()
    }

    /// Nodes shown after the current one, nearest first.
    pub fn upcoming(&self) -> impl Iterator<Item = &Node> {
        self.shown.iter()
    }

    /// Nodes still waiting behind the current one.
    pub fn node_count(&self) -> usize {
        self.hidden.len() + self.shown.len()
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn take_current(&mut self) -> Option<Node> {
        self.current.take()
    }

    /// Put `node` in the current slot and hand back the one it replaces.
    pub fn replace_current(&mut self, node: Node) -> Option<Node> {
        self.current.replace(node)
    }

    /// Discard the current node and advance the queue. Returns false when nothing is left.
    pub fn next_node(&mut self) -> bool {
        self.current = None;
        if let Some(node) = self.hidden.pop_front() {
            self.shown.push_back(node);
        }
        self.current = self.shown.pop_front();
        self.current.is_some()
    }
}
