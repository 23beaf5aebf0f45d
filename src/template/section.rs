//! Report sections

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::element::{CompositionElement, ElementId, ElementRef, ElementTree};

/// Kind of section within a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    /// Main body of the report
    Detail,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Detail => "detail",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detail" => Ok(SectionType::Detail),
            other => Err(format!("Unknown section type: {other}")),
        }
    }
}

/// A section: an element tree with a single root
#[derive(Debug)]
pub struct ReportSection {
    section_type: SectionType,
    tree: ElementTree,
    root: Option<ElementId>,
}

impl ReportSection {
    pub fn new(section_type: SectionType) -> Self {
        Self {
            section_type,
            tree: ElementTree::new(),
            root: None,
        }
    }

    pub fn section_type(&self) -> SectionType {
        self.section_type
    }

    /// Install a new root element, discarding any previous layout
    pub fn set_root(&mut self, element: impl CompositionElement + 'static) -> ElementId {
        self.set_root_boxed(Box::new(element))
    }

    pub fn set_root_boxed(&mut self, element: Box<dyn CompositionElement>) -> ElementId {
        self.tree = ElementTree::new();
        let id = self.tree.insert_boxed(element);
        self.root = Some(id);
        id
    }

    pub fn root_id(&self) -> Option<ElementId> {
        self.root
    }

    pub fn root(&self) -> Option<ElementRef<'_>> {
        self.root.and_then(|id| self.tree.get(id).ok())
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }
}

/// Ordered section list; currently holds exactly one Detail section
#[derive(Debug)]
pub struct SectionCollection {
    sections: Vec<ReportSection>,
}

impl Default for SectionCollection {
    fn default() -> Self {
        Self {
            sections: vec![ReportSection::new(SectionType::Detail)],
        }
    }
}

impl SectionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, section_type: SectionType) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.section_type == section_type)
    }

    pub fn get_mut(&mut self, section_type: SectionType) -> Option<&mut ReportSection> {
        self.sections
            .iter_mut()
            .find(|s| s.section_type == section_type)
    }

    pub fn detail(&self) -> &ReportSection {
        &self.sections[0]
    }

    pub fn detail_mut(&mut self) -> &mut ReportSection {
        &mut self.sections[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportSection> {
        self.sections.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ReportSection> {
        self.sections.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
