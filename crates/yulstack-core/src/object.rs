/*! Arena of nested Yul objects.
 *
 * An object owns one code block and an ordered list of children, each either another object
 * (a nested deployable region) or a data blob. Nodes are addressed by `NodeId`; traversals use
 * explicit work stacks so arbitrarily nested input never recurses on the native stack.
 */

use crate::{analysis::AnalysisInfo, ast::Block, CoreError, Result};
use std::collections::BTreeSet;
use std::fmt;

/// Bound on object nesting, enforced when the tree is built.
pub const MAX_OBJECT_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: String,
    code: Option<Block>,
    children: Vec<NodeId>,
    analysis_info: Option<AnalysisInfo>,
}

impl Object {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            children: Vec::new(),
            analysis_info: None,
        }
    }

    pub fn with_code(name: impl Into<String>, code: Block) -> Self {
        Self {
            code: Some(code),
            ..Self::new(name)
        }
    }

    pub fn code(&self) -> Option<&Block> {
        self.code.as_ref()
    }

    /// Mutable access to the code. Any previous analysis no longer describes the code the
    /// caller is about to rewrite, so it is dropped.
    pub fn code_mut(&mut self) -> Option<&mut Block> {
        self.analysis_info = None;
        self.code.as_mut()
    }

    pub fn set_code(&mut self, code: Block) {
        self.analysis_info = None;
        self.code = Some(code);
    }

    pub fn take_code(&mut self) -> Option<Block> {
        self.analysis_info = None;
        self.code.take()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn analysis_info(&self) -> Option<&AnalysisInfo> {
        self.analysis_info.as_ref()
    }

    pub fn set_analysis_info(&mut self, info: AnalysisInfo) -> Result<()> {
        if self.code.is_none() {
            return Err(CoreError::MissingCode(self.name.clone()));
        }
        self.analysis_info = Some(info);
        Ok(())
    }

    pub fn clear_analysis_info(&mut self) {
        self.analysis_info = None;
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis_info.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Data {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectNode {
    Object(Object),
    Data(Data),
}

impl ObjectNode {
    pub fn name(&self) -> &str {
        match self {
            ObjectNode::Object(object) => &object.name,
            ObjectNode::Data(data) => &data.name,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            ObjectNode::Object(object) => Some(object),
            ObjectNode::Data(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTree {
    nodes: Vec<ObjectNode>,
    parents: Vec<Option<NodeId>>,
}

impl ObjectTree {
    pub fn new(root: Object) -> Self {
        Self {
            nodes: vec![ObjectNode::Object(root)],
            parents: vec![None],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_object(&self) -> &Object {
        match &self.nodes[0] {
            ObjectNode::Object(object) => object,
            ObjectNode::Data(_) => unreachable!("the root node is always an object"),
        }
    }

    pub fn root_object_mut(&mut self) -> &mut Object {
        match &mut self.nodes[0] {
            ObjectNode::Object(object) => object,
            ObjectNode::Data(_) => unreachable!("the root node is always an object"),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&ObjectNode> {
        self.nodes.get(id.index())
    }

    pub fn object(&self, id: NodeId) -> Option<&Object> {
        self.node(id).and_then(ObjectNode::as_object)
    }

    pub fn object_mut(&mut self, id: NodeId) -> Option<&mut Object> {
        match self.nodes.get_mut(id.index()) {
            Some(ObjectNode::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id.index()).copied().flatten()
    }

    pub fn add_object(&mut self, parent: NodeId, object: Object) -> Result<NodeId> {
        self.push_child(parent, ObjectNode::Object(object))
    }

    pub fn add_data(&mut self, parent: NodeId, data: Data) -> Result<NodeId> {
        self.push_child(parent, ObjectNode::Data(data))
    }

    fn push_child(&mut self, parent: NodeId, node: ObjectNode) -> Result<NodeId> {
        if self.object(parent).is_none() {
            return Err(CoreError::InvalidNode(parent));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.parents.push(Some(parent));
        if let Some(ObjectNode::Object(object)) = self.nodes.get_mut(parent.index()) {
            object.children.push(id);
        }
        Ok(id)
    }

    /// Number of object ancestors of `id`; the root has depth zero.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Direct children of `id` that are objects, in declaration order.
    pub fn sub_objects(&self, id: NodeId) -> Vec<NodeId> {
        self.object(id)
            .map(|object| {
                object
                    .children
                    .iter()
                    .copied()
                    .filter(|child| self.object(*child).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every object id below and including the root, parents before children.
    pub fn object_ids(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.sub_objects(id).into_iter().rev());
        }
        order
    }

    /// Every object id with all children ahead of their parent.
    pub fn post_order_object_ids(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![(self.root(), false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.sub_objects(id).into_iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Names an object's code may reference through `datasize`/`dataoffset`: its own name,
    /// every child, and every descendant qualified by the path of names leading to it.
    pub fn qualified_data_names(&self, id: NodeId) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let Some(object) = self.object(id) else {
            return names;
        };
        names.insert(object.name.clone());

        let mut stack: Vec<(NodeId, String)> = object
            .children
            .iter()
            .map(|child| (*child, String::new()))
            .collect();
        while let Some((node_id, prefix)) = stack.pop() {
            let Some(node) = self.node(node_id) else {
                continue;
            };
            let qualified = if prefix.is_empty() {
                node.name().to_string()
            } else {
                format!("{}.{}", prefix, node.name())
            };
            if let ObjectNode::Object(sub) = node {
                stack.extend(
                    sub.children
                        .iter()
                        .map(|grandchild| (*grandchild, qualified.clone())),
                );
            }
            names.insert(qualified);
        }
        names
    }

    pub fn objects(&self) -> impl Iterator<Item = (NodeId, &Object)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| node.as_object().map(|object| (NodeId(idx as u32), object)))
    }

    pub fn is_fully_analyzed(&self) -> bool {
        self.objects().all(|(_, object)| object.is_analyzed())
    }
}
