use std::fmt;

/// Handle into a [`Document`]'s node arena. Ids are never reused within a
/// document; detaching a subtree leaves its ids valid but unreachable from
/// the page roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub text: String,
    classes: Vec<String>,
    /// data-post-id tag linking generated buttons/sections to their post.
    pub post_id: Option<i64>,
    /// Form value (select options carry the user id here).
    pub value: String,
    pub disabled: bool,
}

impl Element {
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    element: Element,
}

/// Arena-backed element tree standing in for the live browser document: an
/// owned mutable tree with explicit mutation entry points instead of ambient
/// global lookups.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            element: Element {
                tag: tag.to_string(),
                ..Element::default()
            },
        });
        id
    }

    /// Element factory: tag plus text content plus an optional single class.
    /// Never fails; omitting the class leaves the class list empty.
    pub fn create_elem_with_text(
        &mut self,
        tag: &str,
        text: &str,
        class: Option<&str>,
    ) -> NodeId {
        let id = self.create_element(tag);
        let element = &mut self.nodes[id.0].element;
        element.text = text.to_string();
        if let Some(class) = class {
            if !class.is_empty() {
                element.classes.push(class.to_string());
            }
        }
        id
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id.0].element
    }

    pub fn element_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0].element
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.nodes[id.0].element.text
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].element.text = text.to_string();
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Moves `child` under `parent`, detaching it from any previous parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if parent == child {
            return;
        }
        if let Some(old_parent) = self.nodes[child.0].parent {
            self.nodes[old_parent.0].children.retain(|&c| c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn append_all(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.append(parent, child);
        }
    }

    /// Unlinks every direct child of `parent` and returns the emptied node.
    /// Absent input is a no-op signalled with `None`.
    pub fn delete_child_elements(&mut self, parent: Option<NodeId>) -> Option<NodeId> {
        let parent = parent?;
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        Some(parent)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let element = &mut self.nodes[id.0].element;
        if !element.has_class(class) {
            element.classes.push(class.to_string());
        }
    }

    /// Toggles a class and reports whether it is present afterwards.
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> bool {
        let element = &mut self.nodes[id.0].element;
        if element.has_class(class) {
            element.classes.retain(|c| c != class);
            false
        } else {
            element.classes.push(class.to_string());
            true
        }
    }

    /// Depth-first walk of the subtree rooted at `root`, root excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[root.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    pub fn find<F>(&self, root: NodeId, mut pred: F) -> Option<NodeId>
    where
        F: FnMut(&Element) -> bool,
    {
        self.descendants(root)
            .into_iter()
            .find(|&id| pred(self.element(id)))
    }

    pub fn find_all<F>(&self, root: NodeId, mut pred: F) -> Vec<NodeId>
    where
        F: FnMut(&Element) -> bool,
    {
        self.descendants(root)
            .into_iter()
            .filter(|&id| pred(self.element(id)))
            .collect()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_sets_tag_text_and_class() {
        let mut doc = Document::new();
        let node = doc.create_elem_with_text("p", "hello", Some("default-text"));
        let element = doc.element(node);
        assert_eq!(element.tag, "p");
        assert_eq!(element.text, "hello");
        assert_eq!(element.classes(), ["default-text".to_string()]);
    }

    #[test]
    fn factory_without_class_leaves_class_list_empty() {
        let mut doc = Document::new();
        let node = doc.create_elem_with_text("h2", "title", None);
        assert!(doc.element(node).classes().is_empty());
    }

    #[test]
    fn append_reparents_child() {
        let mut doc = Document::new();
        let first = doc.create_element("main");
        let second = doc.create_element("section");
        let child = doc.create_elem_with_text("p", "body", None);
        doc.append(first, child);
        doc.append(second, child);
        assert!(doc.children(first).is_empty());
        assert_eq!(doc.children(second), [child]);
        assert_eq!(doc.parent(child), Some(second));
    }

    #[test]
    fn delete_child_elements_empties_parent() {
        let mut doc = Document::new();
        let main = doc.create_element("main");
        let a = doc.create_element("article");
        let b = doc.create_element("article");
        doc.append(main, a);
        doc.append(main, b);
        let emptied = doc.delete_child_elements(Some(main));
        assert_eq!(emptied, Some(main));
        assert!(doc.children(main).is_empty());
        assert_eq!(doc.parent(a), None);
    }

    #[test]
    fn delete_child_elements_absent_input_is_noop() {
        let mut doc = Document::new();
        assert_eq!(doc.delete_child_elements(None), None);
    }

    #[test]
    fn toggle_class_round_trips() {
        let mut doc = Document::new();
        let section = doc.create_element("section");
        doc.add_class(section, "hide");
        assert!(!doc.toggle_class(section, "hide"));
        assert!(doc.toggle_class(section, "hide"));
        assert!(doc.element(section).has_class("hide"));
    }

    #[test]
    fn find_matches_descendants_in_document_order() {
        let mut doc = Document::new();
        let main = doc.create_element("main");
        let article = doc.create_element("article");
        let button = doc.create_element("button");
        doc.element_mut(button).post_id = Some(7);
        doc.append(main, article);
        doc.append(article, button);
        let found = doc.find(main, |el| el.tag == "button" && el.post_id == Some(7));
        assert_eq!(found, Some(button));
        assert_eq!(doc.find(main, |el| el.tag == "select"), None);
    }
}
