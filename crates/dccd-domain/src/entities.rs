//! Flattened entity index over a TRiDaS document.
//!
//! The archive needs a uniform view of every entity in a project for
//! search indexing and traversal, regardless of where it sits in the
//! hierarchy. Rather than one wrapper class per node type, the tree is a
//! flat pre-order listing of tagged nodes, rebuilt from the document
//! whenever the document changes (notably after the import value-merge,
//! so newly created values groups become discoverable).

use crate::tridas::{EntityKind, TridasObject, TridasProject};

/// One entity in the flattened pre-order walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNode {
    pub kind: EntityKind,
    pub title: Option<String>,
    /// Depth below the project root (project itself is 0).
    pub depth: usize,
}

/// Pre-order index of all entities in a TRiDaS document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTree {
    nodes: Vec<EntityNode>,
}

impl EntityTree {
    /// Builds the index by walking the whole document.
    pub fn build(project: &TridasProject) -> Self {
        let mut tree = EntityTree::default();
        tree.rebuild(project);
        tree
    }

    /// Recreates the whole index, no matter what is already there.
    pub fn rebuild(&mut self, project: &TridasProject) {
        self.nodes.clear();
        self.push(EntityKind::Project, Some(project.title.clone()), 0);
        for object in &project.objects {
            self.walk_object(object, 1);
        }
        for series in &project.derived_series {
            self.push(EntityKind::DerivedSeries, series.title.clone(), 1);
            for values in &series.values {
                self.push(EntityKind::Values, values.variable.clone(), 2);
            }
        }
    }

    fn walk_object(&mut self, object: &TridasObject, depth: usize) {
        self.push(EntityKind::Object, object.title.clone(), depth);
        for element in &object.elements {
            self.push(EntityKind::Element, element.title.clone(), depth + 1);
            for sample in &element.samples {
                self.push(EntityKind::Sample, sample.title.clone(), depth + 2);
                for radius in &sample.radiuses {
                    self.push(EntityKind::Radius, radius.title.clone(), depth + 3);
                    for series in &radius.measurement_series {
                        self.push(EntityKind::MeasurementSeries, series.title.clone(), depth + 4);
                        for values in &series.values {
                            self.push(EntityKind::Values, values.variable.clone(), depth + 5);
                        }
                    }
                }
            }
        }
        for sub_object in &object.objects {
            self.walk_object(sub_object, depth + 1);
        }
    }

    fn push(&mut self, kind: EntityKind, title: Option<String>, depth: usize) {
        self.nodes.push(EntityNode { kind, title, depth });
    }

    pub fn nodes(&self) -> &[EntityNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of indexed entities of the given kind.
    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tridas::{
        parse_project, TridasDerivedSeries, TridasValues,
    };

    const XML: &str = r#"<project>
  <title>P</title>
  <object>
    <title>O</title>
    <element>
      <title>E</title>
      <sample>
        <radius>
          <measurementSeries>
            <values><value value="1"/></values>
          </measurementSeries>
        </radius>
      </sample>
    </element>
    <object><title>O-sub</title></object>
  </object>
</project>"#;

    #[test]
    fn test_build_counts_all_entity_kinds() {
        let project = parse_project(XML).unwrap();
        let tree = EntityTree::build(&project);

        assert_eq!(tree.count_of(EntityKind::Project), 1);
        assert_eq!(tree.count_of(EntityKind::Object), 2);
        assert_eq!(tree.count_of(EntityKind::Element), 1);
        assert_eq!(tree.count_of(EntityKind::Sample), 1);
        assert_eq!(tree.count_of(EntityKind::Radius), 1);
        assert_eq!(tree.count_of(EntityKind::MeasurementSeries), 1);
        assert_eq!(tree.count_of(EntityKind::Values), 1);
    }

    #[test]
    fn test_rebuild_discovers_new_values() {
        let mut project = parse_project(XML).unwrap();
        let mut tree = EntityTree::build(&project);
        assert_eq!(tree.count_of(EntityKind::Values), 1);

        project.derived_series.push(TridasDerivedSeries {
            title: Some("D".into()),
            values: vec![TridasValues::default(), TridasValues::default()],
            ..Default::default()
        });
        tree.rebuild(&project);
        assert_eq!(tree.count_of(EntityKind::DerivedSeries), 1);
        assert_eq!(tree.count_of(EntityKind::Values), 3);
    }
}
