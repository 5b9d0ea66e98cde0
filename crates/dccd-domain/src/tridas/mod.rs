//! TRiDaS (Tree-Ring Data Standard) document model.
//!
//! The hierarchy is Project → Object* (recursively nested) → Element* →
//! Sample* → Radius* → MeasurementSeries*, with DerivedSeries* at project
//! level; every series holds Values* groups of numeric readings. Each node
//! carries generic name/value annotation fields which double as domain
//! metadata (raw-data file references) and as the permission restrictor's
//! signalling channel (incompleteness notes, removed-entity placeholders).
//!
//! The model is kept to the subset the archive touches; documents are
//! read and written with quick-xml serde:
//!
//! ```not_rust
//! <project>
//!   <title>Dendro survey</title>
//!   <object>
//!     <title>Gate house</title>
//!     <element>
//!       <title>Beam 1</title>
//!       <sample>
//!         <radius>
//!           <measurementSeries>
//!             <genericField name="dccd.treeRingDataFile">beam1.fh</genericField>
//!             <values>
//!               <value value="53"/>
//!             </values>
//!           </measurementSeries>
//!         </radius>
//!       </sample>
//!     </element>
//!   </object>
//! </project>
//! ```

pub mod restrict;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Tag identifying a TRiDaS node kind, with the fixed display labels used
/// in removed-entity placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Object,
    Element,
    Sample,
    Radius,
    MeasurementSeries,
    DerivedSeries,
    Values,
}

impl EntityKind {
    /// Display label, exactly as it appears in placeholder annotations.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Object => "object",
            EntityKind::Element => "element",
            EntityKind::Sample => "sample",
            EntityKind::Radius => "radius",
            EntityKind::MeasurementSeries => "measurementSeries",
            EntityKind::DerivedSeries => "derivedSeries",
            EntityKind::Values => "values",
        }
    }
}

/// A generic name/value annotation field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasGenericField {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TridasGenericField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
            value: Some(value.into()),
        }
    }
}

/// `<identifier domain="…">text</identifier>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasIdentifier {
    #[serde(rename = "@domain", skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// `<file xlink:href="…"/>`, a reference to an external file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasFile {
    #[serde(rename = "@href")]
    pub href: String,
}

/// Location metadata on an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasLocation {
    #[serde(rename = "locationType", skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(rename = "locationComment", skip_serializing_if = "Option::is_none")]
    pub location_comment: Option<String>,
}

/// Temporal coverage metadata on an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasCoverage {
    #[serde(rename = "coverageTemporal", skip_serializing_if = "Option::is_none")]
    pub coverage_temporal: Option<String>,
    #[serde(
        rename = "coverageTemporalFoundation",
        skip_serializing_if = "Option::is_none"
    )]
    pub coverage_temporal_foundation: Option<String>,
}

/// One numeric reading within a values group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasValue {
    #[serde(rename = "@value")]
    pub value: String,
}

impl TridasValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// A group of numeric readings plus its measurement metadata.
///
/// A group whose `values` list is empty is a *placeholder*: a slot declared
/// by the TRiDaS document to be filled from an external raw-data file
/// during import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasValues {
    #[serde(rename = "variable", skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(rename = "unit", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, rename = "value", skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<TridasValue>,
}

impl TridasValues {
    /// Whether any readings have been set on this group.
    pub fn is_set_values(&self) -> bool {
        !self.values.is_empty()
    }
}

/// A series of raw instrument readings measured on a radius.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasMeasurementSeries {
    #[serde(rename = "title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "measuringMethod", skip_serializing_if = "Option::is_none")]
    pub measuring_method: Option<String>,
    #[serde(
        default,
        rename = "genericField",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub generic_fields: Vec<TridasGenericField>,
    #[serde(default, rename = "values", skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<TridasValues>,
}

/// A computed or combined series living at project level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasDerivedSeries {
    #[serde(rename = "title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub series_type: Option<String>,
    #[serde(
        default,
        rename = "genericField",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub generic_fields: Vec<TridasGenericField>,
    #[serde(default, rename = "values", skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<TridasValues>,
}

/// Common access to the two series shapes; the import value-merger works
/// through this seam instead of one routine per concrete series type.
pub trait TridasSeries {
    fn kind(&self) -> EntityKind;
    fn generic_fields(&self) -> &[TridasGenericField];
    fn generic_fields_mut(&mut self) -> &mut Vec<TridasGenericField>;
    fn values(&self) -> &[TridasValues];
    fn values_mut(&mut self) -> &mut Vec<TridasValues>;
}

impl TridasSeries for TridasMeasurementSeries {
    fn kind(&self) -> EntityKind {
        EntityKind::MeasurementSeries
    }
    fn generic_fields(&self) -> &[TridasGenericField] {
        &self.generic_fields
    }
    fn generic_fields_mut(&mut self) -> &mut Vec<TridasGenericField> {
        &mut self.generic_fields
    }
    fn values(&self) -> &[TridasValues] {
        &self.values
    }
    fn values_mut(&mut self) -> &mut Vec<TridasValues> {
        &mut self.values
    }
}

impl TridasSeries for TridasDerivedSeries {
    fn kind(&self) -> EntityKind {
        EntityKind::DerivedSeries
    }
    fn generic_fields(&self) -> &[TridasGenericField] {
        &self.generic_fields
    }
    fn generic_fields_mut(&mut self) -> &mut Vec<TridasGenericField> {
        &mut self.generic_fields
    }
    fn values(&self) -> &[TridasValues] {
        &self.values
    }
    fn values_mut(&mut self) -> &mut Vec<TridasValues> {
        &mut self.values
    }
}

/// `<radius>`: a measurement path across a sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasRadius {
    #[serde(rename = "title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        rename = "genericField",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub generic_fields: Vec<TridasGenericField>,
    #[serde(
        default,
        rename = "measurementSeries",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub measurement_series: Vec<TridasMeasurementSeries>,
}

/// `<sample>`: a physical sample taken from an element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasSample {
    #[serde(rename = "title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub sample_type: Option<String>,
    #[serde(
        default,
        rename = "genericField",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub generic_fields: Vec<TridasGenericField>,
    #[serde(default, rename = "radius", skip_serializing_if = "Vec::is_empty")]
    pub radiuses: Vec<TridasRadius>,
}

/// `<element>`: a piece of wood within an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasElement {
    #[serde(rename = "title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "taxon", skip_serializing_if = "Option::is_none")]
    pub taxon: Option<String>,
    #[serde(
        default,
        rename = "genericField",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub generic_fields: Vec<TridasGenericField>,
    #[serde(default, rename = "sample", skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<TridasSample>,
}

/// `<object>`: a studied structure or site; objects nest recursively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasObject {
    #[serde(rename = "title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(rename = "identifier", skip_serializing_if = "Option::is_none")]
    pub identifier: Option<TridasIdentifier>,
    #[serde(rename = "createdTimestamp", skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<String>,
    #[serde(
        rename = "lastModifiedTimestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_timestamp: Option<String>,
    #[serde(rename = "comments", skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "creator", skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(rename = "owner", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "coverage", skip_serializing_if = "Option::is_none")]
    pub coverage: Option<TridasCoverage>,
    #[serde(rename = "location", skip_serializing_if = "Option::is_none")]
    pub location: Option<TridasLocation>,
    #[serde(default, rename = "file", skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<TridasFile>,
    #[serde(
        default,
        rename = "genericField",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub generic_fields: Vec<TridasGenericField>,
    #[serde(default, rename = "element", skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<TridasElement>,
    #[serde(default, rename = "object", skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<TridasObject>,
}

/// `<project>`: the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TridasProject {
    #[serde(rename = "title", default)]
    pub title: String,
    #[serde(rename = "identifier", skip_serializing_if = "Option::is_none")]
    pub identifier: Option<TridasIdentifier>,
    #[serde(rename = "createdTimestamp", skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<String>,
    #[serde(
        rename = "lastModifiedTimestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_timestamp: Option<String>,
    #[serde(rename = "comments", skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "category", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "investigator", skip_serializing_if = "Option::is_none")]
    pub investigator: Option<String>,
    #[serde(rename = "period", skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(rename = "commissioner", skip_serializing_if = "Option::is_none")]
    pub commissioner: Option<String>,
    #[serde(default, rename = "reference", skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, rename = "research", skip_serializing_if = "Vec::is_empty")]
    pub researches: Vec<String>,
    #[serde(default, rename = "file", skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<TridasFile>,
    #[serde(
        default,
        rename = "genericField",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub generic_fields: Vec<TridasGenericField>,
    #[serde(default, rename = "object", skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<TridasObject>,
    #[serde(
        default,
        rename = "derivedSeries",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub derived_series: Vec<TridasDerivedSeries>,
}

/// XML declaration emitted ahead of serialized documents.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";

/// Parses a TRiDaS document from XML text.
pub fn parse_project(xml: &str) -> DomainResult<TridasProject> {
    quick_xml::de::from_str(xml).map_err(|e| DomainError::TridasParse {
        message: e.to_string(),
    })
}

/// Serializes a TRiDaS document to XML text with declaration.
pub fn to_xml(project: &TridasProject) -> DomainResult<String> {
    let body = quick_xml::se::to_string_with_root("project", project).map_err(|e| {
        DomainError::TridasSerialize {
            message: e.to_string(),
        }
    })?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <title>Dendro survey</title>
  <category>archaeology</category>
  <object>
    <title>Gate house</title>
    <type>building</type>
    <element>
      <title>Beam 1</title>
      <taxon>Quercus</taxon>
      <sample>
        <title>S1</title>
        <radius>
          <title>R1</title>
          <measurementSeries>
            <title>M1</title>
            <genericField name="dccd.treeRingDataFile">beam1.fh</genericField>
            <values>
              <variable>ring width</variable>
              <unit>1/100 mm</unit>
            </values>
          </measurementSeries>
        </radius>
      </sample>
    </element>
  </object>
  <derivedSeries>
    <title>Site chronology</title>
    <values>
      <value value="120"/>
      <value value="118"/>
    </values>
  </derivedSeries>
</project>
"#;

    #[test]
    fn test_parse_sample_project() {
        let project = parse_project(SAMPLE).unwrap();
        assert_eq!(project.title, "Dendro survey");
        assert_eq!(project.objects.len(), 1);

        let object = &project.objects[0];
        assert_eq!(object.title.as_deref(), Some("Gate house"));

        let series = &object.elements[0].samples[0].radiuses[0].measurement_series[0];
        assert_eq!(series.generic_fields[0].name, "dccd.treeRingDataFile");
        assert_eq!(series.generic_fields[0].value.as_deref(), Some("beam1.fh"));
        // the single values group is an unfilled placeholder
        assert!(!series.values[0].is_set_values());
        assert_eq!(series.values[0].unit.as_deref(), Some("1/100 mm"));

        assert_eq!(project.derived_series.len(), 1);
        assert_eq!(project.derived_series[0].values[0].values.len(), 2);
    }

    #[test]
    fn test_xml_round_trip_preserves_structure() {
        let project = parse_project(SAMPLE).unwrap();
        let xml = to_xml(&project).unwrap();
        let reparsed = parse_project(&xml).unwrap();
        assert_eq!(project, reparsed);
    }

    #[test]
    fn test_entity_labels() {
        assert_eq!(EntityKind::MeasurementSeries.label(), "measurementSeries");
        assert_eq!(EntityKind::DerivedSeries.label(), "derivedSeries");
        assert_eq!(EntityKind::Values.label(), "values");
    }
}
