//! Composition element tree
//!
//! Layout elements live in an [`ElementTree`] arena and are addressed by
//! [`ElementId`]. Each node owns its element variant, its properties, the ids
//! of its children and a non-owning parent id that is assigned once, when the
//! node is attached. Exporters read the tree through [`ElementRef`] views.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::data::{DataError, DataPreparationContext};
use crate::models::{DataSet, DataTable, PropertyContainer};

/// Errors raised by element tree operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElementError {
    /// The element lacks a capability the operation needs
    #[error("Element '{element}' does not support {capability}")]
    UnsupportedCapability {
        element: String,
        capability: &'static str,
    },

    /// The operation is not valid for this kind of element
    #[error("Operation '{operation}' is not supported by element '{element}'")]
    UnsupportedOperation {
        element: String,
        operation: &'static str,
    },

    /// The child already has a parent
    #[error("Element {child} is already attached to {parent}")]
    AlreadyAttached { child: ElementId, parent: ElementId },

    /// Attaching would make an element its own ancestor
    #[error("Attaching {child} under {parent} would create a cycle")]
    Cycle { parent: ElementId, child: ElementId },

    /// No node with this id exists in the tree
    #[error("Element {0} does not exist in this tree")]
    UnknownElement(ElementId),

    /// A property value could not be converted to the requested type
    #[error("Property '{name}' value '{value}' is not a valid {target}: {reason}")]
    PropertyConversion {
        name: String,
        value: String,
        target: &'static str,
        reason: String,
    },
}

impl ElementError {
    pub fn unsupported_capability(element: &dyn CompositionElement, capability: &'static str) -> Self {
        Self::UnsupportedCapability {
            element: element.display_name().to_string(),
            capability,
        }
    }

    pub fn unsupported_operation(element: &dyn CompositionElement, operation: &'static str) -> Self {
        Self::UnsupportedOperation {
            element: element.display_name().to_string(),
            operation,
        }
    }
}

/// Identifier of a node inside one [`ElementTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bit set describing what an element renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ElementClassification(u32);

impl ElementClassification {
    pub const OTHER: Self = Self(0);
    pub const CONTAINER: Self = Self(1);
    pub const TEXT: Self = Self(2);
    pub const TABLE: Self = Self(4);
    pub const PLACEHOLDER: Self = Self(2048);
    pub const SEPARATOR: Self = Self(4096);

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ElementClassification {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for ElementClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ElementClassification, &str); 5] = [
            (ElementClassification::CONTAINER, "container"),
            (ElementClassification::TEXT, "text"),
            (ElementClassification::TABLE, "table"),
            (ElementClassification::PLACEHOLDER, "placeholder"),
            (ElementClassification::SEPARATOR, "separator"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "other")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// A layout element variant
///
/// Variants describe behaviour only; properties, parent and children are held
/// by the owning [`ElementTree`] node.
pub trait CompositionElement: fmt::Debug + Send + Sync {
    /// Stable wire identifier, `None` for variants that cannot be serialized
    fn type_key(&self) -> Option<&str>;

    /// Rust type name, used in diagnostics
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn classification(&self) -> ElementClassification;

    /// Whether the element may hold children; fixed per variant
    fn supports_children(&self) -> bool {
        false
    }

    /// Data binding hook run by the preparation pass
    ///
    /// Called after every child has been prepared. The returned data set, if
    /// any, is stored on the node and exposed through [`ElementRef::binding`].
    fn prepare(
        &self,
        element: ElementRef<'_>,
        context: &dyn DataPreparationContext,
    ) -> Result<Option<Arc<DataSet>>, DataError> {
        let _ = (element, context);
        Ok(None)
    }

    fn as_scalar_producer(&self) -> Option<&dyn ScalarValueProducer> {
        None
    }

    fn as_rows_producer(&self) -> Option<&dyn MultipleRowsProducer> {
        None
    }

    /// Type key if present, otherwise the type name
    fn display_name(&self) -> &str {
        self.type_key().unwrap_or_else(|| self.type_name())
    }
}

/// Capability: the element renders a single late-bound value
pub trait ScalarValueProducer {
    fn value(&self, element: ElementRef<'_>) -> Option<String>;
}

/// Capability: the element renders rows with a columnar schema
pub trait MultipleRowsProducer {
    /// Table to render, resolved from the element's prepared binding
    fn table<'a>(&self, element: ElementRef<'a>) -> Option<&'a DataTable>;
}

#[derive(Debug)]
struct ElementNode {
    element: Box<dyn CompositionElement>,
    properties: PropertyContainer,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    binding: Option<Arc<DataSet>>,
}

/// Arena holding every element of one section
#[derive(Debug, Default)]
pub struct ElementTree {
    nodes: Vec<ElementNode>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached element to the tree
    pub fn insert(&mut self, element: impl CompositionElement + 'static) -> ElementId {
        self.insert_boxed(Box::new(element))
    }

    pub fn insert_boxed(&mut self, element: Box<dyn CompositionElement>) -> ElementId {
        let id = ElementId(self.nodes.len());
        self.nodes.push(ElementNode {
            element,
            properties: PropertyContainer::new(),
            parent: None,
            children: Vec::new(),
            binding: None,
        });
        id
    }

    /// Attach `child` as the last child of `parent`
    ///
    /// Fails without modifying the tree if `parent` cannot hold children, if
    /// `child` already has a parent, or if `child` is an ancestor of `parent`.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), ElementError> {
        let parent_node = self.node(parent)?;
        if !parent_node.element.supports_children() {
            return Err(ElementError::unsupported_capability(
                parent_node.element.as_ref(),
                "children",
            ));
        }
        if let Some(existing) = self.node(child)?.parent {
            return Err(ElementError::AlreadyAttached {
                child,
                parent: existing,
            });
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(ElementError::Cycle { parent, child });
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Insert `element` and attach it under `parent`
    pub fn append(
        &mut self,
        parent: ElementId,
        element: impl CompositionElement + 'static,
    ) -> Result<ElementId, ElementError> {
        self.append_boxed(parent, Box::new(element))
    }

    pub fn append_boxed(
        &mut self,
        parent: ElementId,
        element: Box<dyn CompositionElement>,
    ) -> Result<ElementId, ElementError> {
        // Check before inserting so a failed append leaves no orphan behind
        let parent_node = self.node(parent)?;
        if !parent_node.element.supports_children() {
            return Err(ElementError::unsupported_capability(
                parent_node.element.as_ref(),
                "children",
            ));
        }
        let id = self.insert_boxed(element);
        self.add_child(parent, id)?;
        Ok(id)
    }

    pub fn get(&self, id: ElementId) -> Result<ElementRef<'_>, ElementError> {
        self.node(id)?;
        Ok(ElementRef { tree: self, id })
    }

    pub fn properties(&self, id: ElementId) -> Result<&PropertyContainer, ElementError> {
        Ok(&self.node(id)?.properties)
    }

    pub fn properties_mut(&mut self, id: ElementId) -> Result<&mut PropertyContainer, ElementError> {
        self.nodes
            .get_mut(id.0)
            .map(|n| &mut n.properties)
            .ok_or(ElementError::UnknownElement(id))
    }

    pub fn parent(&self, id: ElementId) -> Result<Option<ElementId>, ElementError> {
        Ok(self.node(id)?.parent)
    }

    /// Ordered children of a container
    ///
    /// Fails with [`ElementError::UnsupportedOperation`] on elements that
    /// cannot hold children.
    pub fn children(&self, id: ElementId) -> Result<&[ElementId], ElementError> {
        let node = self.node(id)?;
        if !node.element.supports_children() {
            return Err(ElementError::unsupported_operation(
                node.element.as_ref(),
                "children",
            ));
        }
        Ok(&node.children)
    }

    /// Look up a property on the element or its nearest ancestor that sets it
    pub fn get_property<T>(&self, id: ElementId, name: &str, default: T) -> Result<T, ElementError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.node(id)?;
        let found = std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|a| self.nodes[a.0].properties.get(name));

        match found {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse::<T>()
                .map_err(|e| ElementError::PropertyConversion {
                    name: name.to_string(),
                    target: std::any::type_name::<T>(),
                    reason: e.to_string(),
                    value,
                }),
        }
    }

    /// Store the data set produced by an element's preparation hook
    pub fn bind(&mut self, id: ElementId, binding: Option<Arc<DataSet>>) -> Result<(), ElementError> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(ElementError::UnknownElement(id))?;
        node.binding = binding;
        Ok(())
    }

    /// Ids of `id`'s ancestors, nearest first
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.nodes.get(id.0).and_then(|n| n.parent), move |p| {
            self.nodes.get(p.0).and_then(|n| n.parent)
        })
    }

    /// Structural snapshot of the subtree rooted at `id`
    pub fn outline(&self, id: ElementId) -> Result<ElementOutline, ElementError> {
        let element = self.get(id)?;
        Ok(ElementOutline {
            type_key: element.type_key().map(str::to_string),
            properties: element.properties().clone(),
            children: element
                .child_elements()
                .map(|c| self.outline(c.id()))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: ElementId) -> Result<&ElementNode, ElementError> {
        self.nodes.get(id.0).ok_or(ElementError::UnknownElement(id))
    }
}

/// Type keys, properties and child order of a subtree
///
/// Two templates with equal outlines serialize to the same layout.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ElementOutline {
    pub type_key: Option<String>,
    pub properties: PropertyContainer,
    pub children: Vec<ElementOutline>,
}

/// Read-only view of one node of an [`ElementTree`]
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    tree: &'a ElementTree,
    id: ElementId,
}

impl<'a> ElementRef<'a> {
    fn node(&self) -> &'a ElementNode {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn tree(&self) -> &'a ElementTree {
        self.tree
    }

    pub fn element(&self) -> &'a dyn CompositionElement {
        self.node().element.as_ref()
    }

    pub fn type_key(&self) -> Option<&'a str> {
        self.element().type_key()
    }

    pub fn classification(&self) -> ElementClassification {
        self.element().classification()
    }

    pub fn supports_children(&self) -> bool {
        self.element().supports_children()
    }

    pub fn properties(&self) -> &'a PropertyContainer {
        &self.node().properties
    }

    /// See [`ElementTree::get_property`]
    pub fn get_property<T>(&self, name: &str, default: T) -> Result<T, ElementError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.tree.get_property(self.id, name, default)
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.node().parent.map(|id| ElementRef {
            tree: self.tree,
            id,
        })
    }

    /// Ordered children; fails on elements that cannot hold children
    pub fn children(&self) -> Result<Vec<ElementRef<'a>>, ElementError> {
        let tree = self.tree;
        Ok(tree
            .children(self.id)?
            .iter()
            .map(|&id| ElementRef { tree, id })
            .collect())
    }

    /// Ordered children, empty for elements that cannot hold children
    pub fn child_elements(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&id| ElementRef { tree, id })
    }

    /// Data set attached during preparation
    pub fn binding(&self) -> Option<&'a DataSet> {
        self.node().binding.as_deref()
    }

    pub fn as_scalar_producer(&self) -> Option<&'a dyn ScalarValueProducer> {
        self.element().as_scalar_producer()
    }

    pub fn as_rows_producer(&self) -> Option<&'a dyn MultipleRowsProducer> {
        self.element().as_rows_producer()
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("type", &self.element().display_name())
            .field("properties", self.properties())
            .finish()
    }
}
