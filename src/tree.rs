/// Arena tree
///
/// Nodes live in one vector and refer to each other by index, so a tree
/// is built once and walked without pointers.
#[derive(Debug)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
}

pub type NodeIndex = usize;

#[derive(Debug)]
pub struct Node<T> {
    pub data: T,
    pub parent: Option<NodeIndex>,
    /// children in insertion order
    pub children: Vec<NodeIndex>,
}

impl<T> Node<T> {
    pub fn add_child(&mut self, node_idx: NodeIndex) {
        self.children.push(node_idx);
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Tree { nodes: Vec::new() }
    }
}

impl<T> Tree<T> {
    /// the first node added
    pub const ROOT: NodeIndex = 0;

    /// Adds a node and links it under `parent`
    pub fn add_node(&mut self, parent: Option<NodeIndex>, data: T) -> NodeIndex {
        let next_index = self.nodes.len();
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            data,
        });
        if let Some(parent) = parent {
            self.get_node_mut(parent).add_child(next_index);
        }
        next_index
    }

    pub fn get_node_mut(&mut self, node_idx: NodeIndex) -> &mut Node<T> {
        assert!(node_idx < self.nodes.len());
        &mut self.nodes[node_idx]
    }

    pub fn get_node(&self, node_idx: NodeIndex) -> &Node<T> {
        assert!(node_idx < self.nodes.len());
        &self.nodes[node_idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// number of edges from the root
    pub fn depth(&self, mut node_idx: NodeIndex) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.get_node(node_idx).parent {
            node_idx = parent;
            depth += 1;
        }
        depth
    }

    /// Preorder iterator from the root
    pub fn iter(&self) -> TreeIter<'_, T> {
        TreeIter::new(Self::ROOT, self)
    }
}

/// Preorder tree iterator, children visited in insertion order
pub struct TreeIter<'a, T> {
    stack: Vec<NodeIndex>,
    tree: &'a Tree<T>,
}

impl<'a, T> TreeIter<'a, T> {
    pub fn new(root: NodeIndex, tree: &'a Tree<T>) -> Self {
        let stack = if tree.is_empty() { Vec::new() } else { vec![root] };
        TreeIter { stack, tree }
    }
}

impl<'a, T> Iterator for TreeIter<'a, T> {
    type Item = (NodeIndex, &'a Node<T>);
    fn next(&mut self) -> Option<Self::Item> {
        let node_idx = self.stack.pop()?;
        let node = self.tree.get_node(node_idx);
        self.stack.extend(node.children.iter().rev());
        Some((node_idx, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preorder() {
        let mut tree = Tree::default();
        let root = tree.add_node(None, 'a');
        let b = tree.add_node(Some(root), 'b');
        tree.add_node(Some(b), 'c');
        tree.add_node(Some(root), 'd');
        let order: String = tree.iter().map(|(_, node)| node.data).collect();
        assert_eq!(order, "abcd");
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.depth(2), 2);
        assert!(tree.get_node(3).is_leaf());
    }

    #[test]
    fn test_empty() {
        let tree: Tree<u8> = Tree::default();
        assert!(tree.iter().next().is_none());
    }
}
