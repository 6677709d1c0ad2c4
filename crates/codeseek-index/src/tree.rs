//! Parser-independent pre-order traversal.

/// Minimal view of a syntax tree node.
pub(crate) trait TreeNode: Copy {
    fn child_nodes(&self) -> Vec<Self>;
}

impl TreeNode for tree_sitter::Node<'_> {
    fn child_nodes(&self) -> Vec<Self> {
        let mut cursor = self.walk();
        self.children(&mut cursor).collect()
    }
}

/// Lazy, one-shot depth-first pre-order iterator. Siblings are yielded in
/// tree order.
pub(crate) struct Preorder<N> {
    stack: Vec<N>,
}

impl<N: TreeNode> Preorder<N> {
    pub(crate) fn new(root: N) -> Self {
        Self { stack: vec![root] }
    }
}

impl<N: TreeNode> Iterator for Preorder<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let node = self.stack.pop()?;
        let mut children = node.child_nodes();
        children.reverse();
        self.stack.extend(children);
        Some(node)
    }
}
