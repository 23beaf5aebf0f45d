//! Preparation pass
//!
//! Walks each section's element tree post-order, running every element's
//! preparation hook after those of all its children, and stores the returned
//! data bindings on the tree.

use tracing::debug;

use crate::data::{DataError, DataPreparationContext};
use crate::template::{ElementId, ElementTree, ReportSection};

/// Prepare every element of `section`, returning how many were prepared
pub fn prepare_section(
    section: &mut ReportSection,
    context: &dyn DataPreparationContext,
) -> Result<usize, DataError> {
    let Some(root) = section.root_id() else {
        debug!(section = %section.section_type(), "Section has no root element");
        return Ok(0);
    };
    let prepared = prepare_element(section.tree_mut(), root, context)?;
    debug!(section = %section.section_type(), prepared, "Prepared section");
    Ok(prepared)
}

/// Prepare the subtree rooted at `id`, children first
pub fn prepare_element(
    tree: &mut ElementTree,
    id: ElementId,
    context: &dyn DataPreparationContext,
) -> Result<usize, DataError> {
    let mut prepared = 0;
    if tree.get(id)?.supports_children() {
        let children = tree.children(id)?.to_vec();
        for child in children {
            prepared += prepare_element(tree, child, context)?;
        }
    }

    let binding = {
        let element = tree.get(id)?;
        element.element().prepare(element, context)?
    };
    tree.bind(id, binding)?;
    Ok(prepared + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSourceCollection, StaticDataProvider};
    use crate::models::{DataSet, DataTable};
    use crate::template::{
        CompositionElement, ElementClassification, ElementRef, SectionType,
        VerticalContainerElement,
    };
    use std::sync::{Arc, Mutex};

    /// Container recording the order in which hooks run
    #[derive(Debug)]
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl CompositionElement for Recorder {
        fn type_key(&self) -> Option<&str> {
            None
        }

        fn classification(&self) -> ElementClassification {
            ElementClassification::CONTAINER
        }

        fn supports_children(&self) -> bool {
            true
        }

        fn prepare(
            &self,
            _element: ElementRef<'_>,
            _context: &dyn DataPreparationContext,
        ) -> Result<Option<Arc<DataSet>>, DataError> {
            self.log.lock().unwrap().push(self.label);
            Ok(None)
        }
    }

    #[test]
    fn test_children_are_prepared_before_parents() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let rec = |label| Recorder {
            label,
            log: Arc::clone(&log),
        };

        let mut section = ReportSection::new(SectionType::Detail);
        let root = section.set_root(rec("root"));
        let tree = section.tree_mut();
        let left = tree.append(root, rec("left")).unwrap();
        tree.append(left, rec("left.a")).unwrap();
        tree.append(left, rec("left.b")).unwrap();
        tree.append(root, rec("right")).unwrap();

        let sources = DataSourceCollection::new();
        let prepared = prepare_section(&mut section, &sources).unwrap();

        assert_eq!(prepared, 5);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["left.a", "left.b", "left", "right", "root"]
        );
    }

    #[test]
    fn test_table_binding_is_stored() {
        let mut provider = StaticDataProvider::new();
        provider.add_table(DataTable::new("t").with_columns(["Id"]));
        let mut sources = DataSourceCollection::new();
        sources.set_provider("src", provider);

        let mut section = ReportSection::new(SectionType::Detail);
        let root = section.set_root(VerticalContainerElement);
        let table = section.tree_mut().add_table(root, "src", None).unwrap();

        prepare_section(&mut section, &sources).unwrap();

        let element = section.tree().get(table).unwrap();
        assert_eq!(element.binding().unwrap().tables[0].name, "t");
        assert!(section.tree().get(root).unwrap().binding().is_none());
    }

    #[test]
    fn test_missing_source_fails() {
        let mut section = ReportSection::new(SectionType::Detail);
        let root = section.set_root(VerticalContainerElement);
        section.tree_mut().add_table(root, "absent", None).unwrap();

        let err = prepare_section(&mut section, &DataSourceCollection::new()).unwrap_err();
        assert!(matches!(err, DataError::DataSourceNotFound(_)));
    }

    #[test]
    fn test_empty_section() {
        let mut section = ReportSection::new(SectionType::Detail);
        assert_eq!(prepare_section(&mut section, &DataSourceCollection::new()).unwrap(), 0);
    }
}
