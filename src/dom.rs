use super::html::is_void_tag;
use super::*;

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id = self.create_node(Some(parent), NodeType::Element(Element { tag_name, attrs }));
        if let Some(id_attr) = self
            .element(id)
            .and_then(|element| element.attrs.get("id").cloned())
        {
            self.index_id(&id_attr, id);
        }
        id
    }

    pub(crate) fn create_detached_element(&mut self, tag_name: String) -> NodeId {
        self.create_node(
            None,
            NodeType::Element(Element {
                tag_name,
                attrs: HashMap::new(),
            }),
        )
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn has_tag(&self, node_id: NodeId, tag: &str) -> bool {
        self.tag_name(node_id)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.element(node_id)
            .and_then(|element| element.attrs.get(name))
            .map(String::as_str)
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes
            .get(node_id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn child_elements(&self, node_id: NodeId) -> Vec<NodeId> {
        self.children(node_id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    pub(crate) fn previous_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent = self.parent(node_id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|id| *id == node_id)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|sibling| self.element(*sibling).is_some())
    }

    /// One-based position among the parent's element children.
    pub(crate) fn element_index(&self, node_id: NodeId) -> Option<usize> {
        let parent = self.parent(node_id)?;
        self.child_elements(parent)
            .iter()
            .position(|id| *id == node_id)
            .map(|pos| pos + 1)
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).and_then(|ids| ids.first().copied())
    }

    pub(crate) fn by_id_all(&self, id: &str) -> Vec<NodeId> {
        self.id_index.get(id).cloned().unwrap_or_default()
    }

    pub(crate) fn index_id(&mut self, id: &str, node_id: NodeId) {
        if id.is_empty() {
            return;
        }
        self.id_index
            .entry(id.to_string())
            .or_default()
            .push(node_id);
    }

    pub(crate) fn rebuild_id_index(&mut self) {
        let mut next: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if let NodeType::Element(element) = &self.nodes[node.0].node_type {
                if let Some(id) = element.attrs.get("id").filter(|id| !id.is_empty()) {
                    next.entry(id.clone()).or_default().push(node);
                }
            }
            for child in self.nodes[node.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        self.id_index = next;
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node_id];
        while let Some(node) = stack.pop() {
            match &self.nodes[node.0].node_type {
                NodeType::Document | NodeType::Element(_) => {
                    stack.extend(self.nodes[node.0].children.iter().rev().copied());
                }
                NodeType::Text(text) => out.push_str(text),
            }
        }
        out
    }

    /// Pre-order walk pushing `node_id` (when an element) and every
    /// element below it.
    pub(crate) fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        let mut stack = vec![node_id];
        while let Some(node) = stack.pop() {
            if matches!(self.nodes[node.0].node_type, NodeType::Element(_)) {
                out.push(node);
            }
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
    }

    pub(crate) fn collect_elements_descendants_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node_id.0].children {
            self.collect_elements_dfs(*child, out);
        }
    }

    /// Descendant elements named `tag`, in document order.
    pub(crate) fn elements_by_tag_name(&self, node_id: NodeId, tag: &str) -> Vec<NodeId> {
        let mut all = Vec::new();
        self.collect_elements_descendants_dfs(node_id, &mut all);
        all.retain(|candidate| self.has_tag(*candidate, tag));
        all
    }

    pub(crate) fn t_bodies(&self, table: NodeId) -> Vec<NodeId> {
        self.child_elements(table)
            .into_iter()
            .filter(|child| self.has_tag(*child, "tbody"))
            .collect()
    }

    pub(crate) fn can_have_children(&self, node_id: NodeId) -> bool {
        matches!(
            self.nodes.get(node_id.0).map(|n| &n.node_type),
            Some(NodeType::Document | NodeType::Element(_))
        )
    }

    pub(crate) fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    /// Appends `child` as the last child of `parent`, detaching it from its
    /// current parent first. Appending a node already under `parent` moves
    /// it to the end.
    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.can_have_children(parent) {
            return Err(Error::Dom("appendChild target cannot have children".into()));
        }
        if child == self.root || child == parent {
            return Err(Error::Dom("invalid appendChild node".into()));
        }
        if !self.is_valid_node(child) {
            return Err(Error::Dom("appendChild node is invalid".into()));
        }

        // parent must not sit inside child's subtree
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::Dom("appendChild would create a cycle".into()));
            }
            cursor = self.parent(node);
        }

        if let Some(old_parent) = self.parent(child) {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub(crate) fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<()> {
        if self.parent(reference) != Some(parent) {
            return Err(Error::Dom(
                "insertBefore reference is not a direct child".into(),
            ));
        }
        if child == reference {
            return Ok(());
        }
        self.append_child(parent, child)?;
        let children = &mut self.nodes[parent.0].children;
        children.pop();
        let index = children
            .iter()
            .position(|id| *id == reference)
            .ok_or_else(|| Error::Dom("insertBefore reference is missing".into()))?;
        children.insert(index, child);
        Ok(())
    }

    /// Wraps runs of `tr` elements sitting directly under a `table` in an
    /// implied `tbody`, the way browsers build the tree.
    pub(crate) fn normalize_implied_table_bodies(&mut self) -> Result<()> {
        let mut tables = Vec::new();
        self.collect_elements_dfs(self.root, &mut tables);
        tables.retain(|node| self.has_tag(*node, "table"));

        for table in tables {
            let mut current_body: Option<NodeId> = None;
            for child in self.children(table).to_vec() {
                if self.has_tag(child, "tr") {
                    let body = match current_body {
                        Some(body) => body,
                        None => {
                            let body = self.create_detached_element("tbody".to_string());
                            self.insert_before(table, body, child)?;
                            current_body = Some(body);
                            body
                        }
                    };
                    self.append_child(body, child)?;
                } else if self.element(child).is_some() {
                    current_body = None;
                } else if let Some(body) = current_body {
                    // keep inter-row whitespace with the rows it separates
                    self.append_child(body, child)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![DumpStep::Node(node_id)];
        while let Some(step) = stack.pop() {
            let node_id = match step {
                DumpStep::Node(node_id) => node_id,
                DumpStep::Raw(text) => {
                    out.push_str(text);
                    continue;
                }
                DumpStep::Close(tag_name) => {
                    out.push_str("</");
                    out.push_str(tag_name);
                    out.push('>');
                    continue;
                }
            };

            match &self.nodes[node_id.0].node_type {
                NodeType::Document => {
                    for child in self.nodes[node_id.0].children.iter().rev() {
                        stack.push(DumpStep::Node(*child));
                    }
                }
                NodeType::Text(text) => out.push_str(&escape_html_text(text)),
                NodeType::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag_name);
                    let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                    attrs.sort_by(|(left, _), (right, _)| left.cmp(right));
                    for (k, v) in attrs {
                        out.push(' ');
                        out.push_str(k);
                        out.push_str("=\"");
                        out.push_str(&escape_html_attr(v));
                        out.push('"');
                    }
                    out.push('>');
                    if is_void_tag(&element.tag_name) {
                        continue;
                    }
                    let raw_text_container = element.tag_name.eq_ignore_ascii_case("script")
                        || element.tag_name.eq_ignore_ascii_case("style");
                    stack.push(DumpStep::Close(&element.tag_name));
                    for child in self.nodes[node_id.0].children.iter().rev() {
                        match &self.nodes[child.0].node_type {
                            NodeType::Text(text) if raw_text_container => {
                                stack.push(DumpStep::Raw(text));
                            }
                            _ => stack.push(DumpStep::Node(*child)),
                        }
                    }
                }
            }
        }
        out
    }
}

enum DumpStep<'a> {
    Node(NodeId),
    Raw(&'a str),
    Close(&'a str),
}

fn escape_html_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
