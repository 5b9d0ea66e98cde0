//! Project import pipeline.
//!
//! Turns an unpacked bundle's data folder into a stored project:
//! metadata resolution → TRiDaS parse → value-file merge → entity-tree
//! rebuild → associated-file attachment → persist → audit log. Any
//! failure aborts the whole import; nothing is retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use dccd_domain::project::{self, Project};
use dccd_domain::treering::{self, TreeRingError};
use dccd_domain::tridas::{
    EntityKind, TridasMeasurementSeries, TridasObject, TridasProject, TridasSeries, TridasValues,
};
use dccd_domain::{DatasetState, DomainError};
use dccd_storage::{DataStore, StorageError};

use crate::config::ImportSettings;
use crate::handlers::bundle;

/// Errors that can occur during a project import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The bundle metadata names a value-file format we cannot read.
    #[error("unsupported values format in bundle metadata: {format}")]
    UnsupportedFormat { format: String },

    /// The data folder holds no TRiDaS XML file.
    #[error("no tridas file found in folder: {folder}")]
    MissingTridas { folder: String },

    /// A file referenced by the TRiDaS document is absent from the bundle.
    #[error("file referenced by tridas not found in bundle: {name}")]
    MissingFile { name: String },

    /// TRiDaS parsing or project construction failed.
    #[error("tridas import error: {0}")]
    Tridas(#[from] DomainError),

    /// A raw value file could not be read or parsed.
    #[error("value file error: {0}")]
    TreeRing(#[from] TreeRingError),

    /// The data service refused to persist the project.
    #[error("failed to store project: {0}")]
    Store(#[from] StorageError),

    /// The import audit log could not be written. The project has already
    /// been stored when this occurs.
    #[error("failed to log project import: {message}")]
    AuditLog { message: String },

    /// Underlying file-system failure.
    #[error("import file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Metadata not in the TRiDaS file but needed for the archive; read from
/// the bundle's metadata XML:
///
/// ```not_rust
/// <?xml version="1.0" encoding="UTF-8"?>
/// <dccdmetadata>
///  <language></language>
///  <values>
///   <format></format>
///  </values>
/// </dccdmetadata>
/// ```
///
/// Both elements are optional; configured defaults apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivalMetadata {
    /// Main language used in the TRiDaS text content.
    pub language: String,
    /// Format of the raw value files in the bundle.
    pub values_format: String,
}

#[derive(Debug, serde::Deserialize)]
struct MetadataDoc {
    language: Option<String>,
    values: Option<MetadataValues>,
}

#[derive(Debug, serde::Deserialize)]
struct MetadataValues {
    format: Option<String>,
}

/// Imports unpacked bundles into the archive.
pub struct ProjectImporter<D: DataStore> {
    data: Arc<D>,
    settings: ImportSettings,
}

impl<D: DataStore> ProjectImporter<D> {
    pub fn new(data: Arc<D>, settings: ImportSettings) -> Self {
        Self { data, settings }
    }

    /// Runs the whole pipeline on a bundle's data folder and returns the
    /// store identifier of the persisted project.
    pub async fn import_project(&self, data_folder: &Path, owner_id: &str) -> ImportResult<String> {
        let metadata = self.load_metadata(data_folder);
        self.validate_metadata(&metadata)?;

        // the tridas file is the only xml file in the data folder;
        // always take the first one
        let tridas_file = bundle::xml_files(data_folder)?
            .into_iter()
            .next()
            .ok_or_else(|| ImportError::MissingTridas {
                folder: data_folder.display().to_string(),
            })?;

        info!(file = %tridas_file.display(), "tridas file import");
        let mut project = self.import_tridas_file(&tridas_file, &metadata.language, owner_id)?;

        info!("value files import");
        let values_dir = data_folder.join(&self.settings.values_folder_name);
        if !values_dir.is_dir() {
            warn!(folder = %data_folder.display(), "no values folder found in bundle");
        }
        let values_folder = values_dir.is_dir().then_some(values_dir.as_path());
        let consumed = import_value_files(&mut project, values_folder, &metadata.values_format)?;
        for file in &consumed {
            project.add_original_file(file)?;
        }
        // value entities might have been added: recreate the whole entity
        // tree no matter what is already there
        project.rebuild_entity_tree();

        info!("associated files import");
        self.import_associated_files(&mut project, data_folder)?;

        info!("storing project");
        project.state = DatasetState::Published;
        let sid = self.data.store_project(&mut project).await?;

        self.log_project_import(&sid, data_folder)?;

        Ok(sid)
    }

    /// Reads the bundle metadata, falling back to configured defaults for
    /// anything absent or unreadable.
    pub fn load_metadata(&self, data_folder: &Path) -> ArchivalMetadata {
        let mut metadata = ArchivalMetadata {
            language: self.settings.default_language.clone(),
            values_format: self.settings.default_values_format.clone(),
        };

        // the metadata file sits next to the data folder
        let Some(bundle_root) = data_folder.parent() else {
            return metadata;
        };
        let metadata_file = match bundle::metadata_file(bundle_root) {
            Ok(Some(file)) => file,
            Ok(None) => return metadata,
            Err(e) => {
                warn!(error = %e, "cannot look up bundle metadata file; using defaults");
                return metadata;
            }
        };
        let text = match std::fs::read_to_string(&metadata_file) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "cannot read bundle metadata file; using defaults");
                return metadata;
            }
        };
        match quick_xml::de::from_str::<MetadataDoc>(&text) {
            Ok(doc) => {
                let language = doc
                    .language
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                if let Some(language) = language {
                    info!(language, "found language");
                    metadata.language = language.to_string();
                }
                let format = doc
                    .values
                    .as_ref()
                    .and_then(|v| v.format.as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                if let Some(format) = format {
                    info!(format, "found values format");
                    metadata.values_format = format.to_string();
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot parse bundle metadata file; using defaults");
            }
        }
        metadata
    }

    fn validate_metadata(&self, metadata: &ArchivalMetadata) -> ImportResult<()> {
        if !treering::reading_formats().contains(&metadata.values_format.as_str()) {
            return Err(ImportError::UnsupportedFormat {
                format: metadata.values_format.clone(),
            });
        }
        Ok(())
    }

    fn import_tridas_file(
        &self,
        tridas_file: &Path,
        language: &str,
        owner_id: &str,
    ) -> ImportResult<Project> {
        let xml = std::fs::read_to_string(tridas_file)?;
        let mut project = Project::from_tridas_xml(&xml, owner_id)?;
        project.file_name = tridas_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        project.language = language.to_string();
        project.add_original_file(tridas_file)?;
        Ok(project)
    }

    fn import_associated_files(
        &self,
        project: &mut Project,
        data_folder: &Path,
    ) -> ImportResult<()> {
        let expected = project.expected_associated_file_names();
        if expected.is_empty() {
            return Ok(());
        }
        let folder = data_folder.join(&self.settings.associated_folder_name);
        for name in expected {
            let file = folder
                .is_dir()
                .then(|| bundle::find_file_no_case(&folder, &name))
                .flatten()
                .ok_or(ImportError::MissingFile { name })?;
            project.add_associated_file(&file)?;
        }
        Ok(())
    }

    /// Appends one line per imported project to the audit log. The
    /// project is already stored when this runs; a logging failure fails
    /// the import call but does not undo the store.
    fn log_project_import(&self, sid: &str, data_folder: &Path) -> ImportResult<()> {
        let Some(path) = &self.settings.audit_log else {
            return Ok(());
        };
        use std::io::Write;
        let audit = |e: std::io::Error| ImportError::AuditLog {
            message: e.to_string(),
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(audit)?;
        writeln!(file, "{sid}\t{}", data_folder.display()).map_err(audit)?;
        Ok(())
    }
}

/// Walks every series with an external raw-data file reference, merging
/// the referenced file's value groups into it. Returns the raw files
/// consumed, in merge order.
fn import_value_files(
    project: &mut Project,
    values_folder: Option<&Path>,
    format: &str,
) -> ImportResult<Vec<PathBuf>> {
    let mut consumed = Vec::new();
    walk_measurement_series(&mut project.tridas, &mut |series| {
        merge_series_data(series, values_folder, format, &mut consumed)
    })?;
    for series in &mut project.tridas.derived_series {
        merge_series_data(series, values_folder, format, &mut consumed)?;
    }
    Ok(consumed)
}

fn walk_measurement_series<F>(tridas: &mut TridasProject, visit: &mut F) -> ImportResult<()>
where
    F: FnMut(&mut TridasMeasurementSeries) -> ImportResult<()>,
{
    fn walk_object<F>(object: &mut TridasObject, visit: &mut F) -> ImportResult<()>
    where
        F: FnMut(&mut TridasMeasurementSeries) -> ImportResult<()>,
    {
        for element in &mut object.elements {
            for sample in &mut element.samples {
                for radius in &mut sample.radiuses {
                    for series in &mut radius.measurement_series {
                        visit(series)?;
                    }
                }
            }
        }
        for sub_object in &mut object.objects {
            walk_object(sub_object, visit)?;
        }
        Ok(())
    }
    for object in &mut tridas.objects {
        walk_object(object, visit)?;
    }
    Ok(())
}

/// Loads and merges one series' referenced raw file, if any.
///
/// Only the first matching generic field is consulted; more than one
/// matching field on a series is not supported and the rest are ignored.
fn merge_series_data<S: TridasSeries>(
    series: &mut S,
    values_folder: Option<&Path>,
    format: &str,
    consumed: &mut Vec<PathBuf>,
) -> ImportResult<()> {
    let Some(field_index) = series.generic_fields().iter().position(|f| {
        f.value.is_some() && project::is_tree_ring_data_file_indicator(&f.name)
    }) else {
        return Ok(());
    };
    let Some(file_name) = series.generic_fields()[field_index].value.clone() else {
        return Ok(());
    };

    let folder = values_folder.ok_or_else(|| ImportError::MissingFile {
        name: file_name.clone(),
    })?;
    let file = bundle::find_file_no_case(folder, &file_name).ok_or_else(|| {
        ImportError::MissingFile {
            name: file_name.clone(),
        }
    })?;

    let data = treering::load(&file, format)?;
    let groups = match series.kind() {
        EntityKind::DerivedSeries => data.values_for_derived_series(),
        _ => data.values_for_measurement_series(),
    };
    debug!(groups = groups.len(), file = %data.file_name, "found groups of values");
    if groups.is_empty() {
        warn!(file = %data.file_name, "no series values found in uploaded tree-ring data");
    } else {
        merge_values_into_series(series, groups);
    }

    consumed.push(file);
    // rewrite the field name so the series is not matched again later
    series.generic_fields_mut()[field_index].name =
        project::DATAFILE_INDICATOR_UPLOADED.to_string();
    Ok(())
}

/// Fills a series' empty placeholder values groups from incoming groups,
/// strictly by position, creating new groups for any overflow.
///
/// With P placeholders and V incoming groups, the first `min(P, V)`
/// placeholders receive the corresponding group's readings (their own
/// unit/variable metadata is preserved) and `max(0, V - P)` new groups are
/// appended, so the series ends up with `max(P, V)` values groups.
pub fn merge_values_into_series<S: TridasSeries>(series: &mut S, groups: &[TridasValues]) {
    let placeholder_indices: Vec<usize> = series
        .values()
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_set_values())
        .map(|(i, _)| i)
        .collect();

    let fill_count = placeholder_indices.len().min(groups.len());
    for slot in 0..fill_count {
        let readings = groups[slot].values.clone();
        series.values_mut()[placeholder_indices[slot]]
            .values
            .extend(readings);
    }

    for group in groups.iter().skip(placeholder_indices.len()) {
        series.values_mut().push(group.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dccd_domain::tridas::TridasValue;
    use dccd_storage::MemoryArchiveStore;
    use tempfile::TempDir;

    fn group(readings: &[&str]) -> TridasValues {
        TridasValues {
            variable: Some("ring width".into()),
            unit: None,
            values: readings.iter().map(|r| TridasValue::new(*r)).collect(),
        }
    }

    fn placeholder(unit: &str) -> TridasValues {
        TridasValues {
            variable: Some("ring width".into()),
            unit: Some(unit.into()),
            values: Vec::new(),
        }
    }

    #[test]
    fn test_merge_no_placeholders_creates_all_groups() {
        let mut series = TridasMeasurementSeries::default();
        let groups = vec![group(&["1"]), group(&["2"]), group(&["3"])];
        merge_values_into_series(&mut series, &groups);

        assert_eq!(series.values.len(), 3);
        assert_eq!(series.values[2].values[0].value, "3");
    }

    #[test]
    fn test_merge_more_placeholders_than_groups() {
        let mut series = TridasMeasurementSeries {
            values: vec![placeholder("mm"), placeholder("cm")],
            ..Default::default()
        };
        merge_values_into_series(&mut series, &[group(&["7", "8"])]);

        assert_eq!(series.values.len(), 2);
        // first placeholder filled by position, metadata preserved
        assert_eq!(series.values[0].unit.as_deref(), Some("mm"));
        assert_eq!(series.values[0].values.len(), 2);
        // second placeholder remains empty
        assert!(!series.values[1].is_set_values());
    }

    #[test]
    fn test_merge_equal_placeholders_and_groups() {
        let mut series = TridasMeasurementSeries {
            values: vec![placeholder("mm"), placeholder("cm")],
            ..Default::default()
        };
        merge_values_into_series(&mut series, &[group(&["1"]), group(&["2"])]);

        assert_eq!(series.values.len(), 2);
        assert_eq!(series.values[0].values[0].value, "1");
        assert_eq!(series.values[1].values[0].value, "2");
        assert_eq!(series.values[1].unit.as_deref(), Some("cm"));
    }

    #[test]
    fn test_merge_overflow_creates_new_groups() {
        let mut series = TridasMeasurementSeries {
            values: vec![placeholder("mm")],
            ..Default::default()
        };
        merge_values_into_series(&mut series, &[group(&["1"]), group(&["2"]), group(&["3"])]);

        // total = max(P, V)
        assert_eq!(series.values.len(), 3);
        assert_eq!(series.values[0].unit.as_deref(), Some("mm"));
        assert_eq!(series.values[1].values[0].value, "2");
        assert_eq!(series.values[2].values[0].value, "3");
    }

    // ------------------------------------------------------------------
    // Pipeline tests over on-disk bundles
    // ------------------------------------------------------------------

    const TRIDAS_TWO_SERIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <title>Test survey</title>
  <object>
    <title>Barn</title>
    <element>
      <title>Beam</title>
      <sample>
        <radius>
          <measurementSeries>
            <title>With data file</title>
            <genericField name="dccd.treeRingDataFile">Beam1.fh</genericField>
            <values>
              <variable>ring width</variable>
              <unit>1/100 mm</unit>
            </values>
          </measurementSeries>
          <measurementSeries>
            <title>Without data file</title>
          </measurementSeries>
        </radius>
      </sample>
    </element>
  </object>
</project>
"#;

    const HEIDELBERG_ONE_GROUP: &str =
        "HEADER:\nKeyCode=BEAM1\nDataFormat=Tree\nUnit=1/100 mm\nDATA:Single\n 53 60 71 0\n";

    /// Lays out `root/{metadata.xml, data/{tridas.xml, values/...}}`.
    fn write_bundle(metadata: Option<&str>, tridas: &str, value_files: &[(&str, &str)]) -> TempDir {
        let root = TempDir::new().unwrap();
        if let Some(metadata) = metadata {
            std::fs::write(root.path().join("metadata.xml"), metadata).unwrap();
        }
        let data = root.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(data.join("tridas.xml"), tridas).unwrap();
        if !value_files.is_empty() {
            let values = data.join("values");
            std::fs::create_dir(&values).unwrap();
            for (name, content) in value_files {
                std::fs::write(values.join(name), content).unwrap();
            }
        }
        root
    }

    fn importer(store: &Arc<MemoryArchiveStore>) -> ProjectImporter<MemoryArchiveStore> {
        ProjectImporter::new(Arc::clone(store), ImportSettings::default())
    }

    #[tokio::test]
    async fn test_metadata_defaults_when_elements_absent() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        let bundle = write_bundle(Some("<dccdmetadata/>"), TRIDAS_TWO_SERIES, &[]);

        let metadata = importer(&store).load_metadata(&bundle.path().join("data"));
        assert_eq!(
            metadata,
            ArchivalMetadata {
                language: "en".into(),
                values_format: "Heidelberg".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_metadata_values_read_from_file() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        let bundle = write_bundle(
            Some("<dccdmetadata><language>nl</language><values><format>Tucson</format></values></dccdmetadata>"),
            TRIDAS_TWO_SERIES,
            &[],
        );

        let metadata = importer(&store).load_metadata(&bundle.path().join("data"));
        assert_eq!(metadata.language, "nl");
        assert_eq!(metadata.values_format, "Tucson");
    }

    #[tokio::test]
    async fn test_unsupported_format_aborts_before_tridas_parse() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        // the tridas file is garbage; a format error must win because
        // validation happens before any parsing
        let bundle = write_bundle(
            Some("<dccdmetadata><values><format>XYZ123</format></values></dccdmetadata>"),
            "this is not xml at all",
            &[],
        );

        let err = importer(&store)
            .import_project(&bundle.path().join("data"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat { format } if format == "XYZ123"));
    }

    #[tokio::test]
    async fn test_missing_tridas_file() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        let root = TempDir::new().unwrap();
        let data = root.path().join("data");
        std::fs::create_dir(&data).unwrap();

        let err = importer(&store)
            .import_project(&data, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingTridas { .. }));
    }

    #[tokio::test]
    async fn test_end_to_end_import_merges_and_stores() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        // the raw file is located case-insensitively: referenced as
        // Beam1.fh, present as BEAM1.FH
        let bundle = write_bundle(
            Some("<dccdmetadata/>"),
            TRIDAS_TWO_SERIES,
            &[("BEAM1.FH", HEIDELBERG_ONE_GROUP)],
        );

        let sid = importer(&store)
            .import_project(&bundle.path().join("data"), "alice")
            .await
            .unwrap();

        let project = store.get_project(&sid).await.unwrap();
        assert_eq!(project.owner_id, "alice");
        assert_eq!(project.file_name, "tridas.xml");

        let radius = &project.tridas.objects[0].elements[0].samples[0].radiuses[0];
        let with_file = &radius.measurement_series[0];
        // placeholder filled, metadata preserved
        assert_eq!(with_file.values.len(), 1);
        assert_eq!(with_file.values[0].values.len(), 3);
        assert_eq!(with_file.values[0].unit.as_deref(), Some("1/100 mm"));
        // indicator renamed so a later pass does not re-match
        assert_eq!(
            with_file.generic_fields[0].name,
            project::DATAFILE_INDICATOR_UPLOADED
        );

        let without_file = &radius.measurement_series[1];
        assert!(without_file.values.is_empty());
        assert!(without_file.generic_fields.is_empty());

        // tridas file + one consumed raw file
        assert_eq!(project.original_files.len(), 2);
        assert_eq!(project.original_files[1].file_name, "BEAM1.FH");

        // rebuilt entity tree indexes the filled values group
        assert_eq!(project.entity_tree.count_of(EntityKind::Values), 1);
    }

    #[tokio::test]
    async fn test_referenced_value_file_missing_aborts() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        let bundle = write_bundle(Some("<dccdmetadata/>"), TRIDAS_TWO_SERIES, &[]);

        let err = importer(&store)
            .import_project(&bundle.path().join("data"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingFile { name } if name == "Beam1.fh"));
    }

    #[tokio::test]
    async fn test_missing_associated_file_aborts() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        let tridas = r#"<project>
  <title>P</title>
  <file href="report.pdf"/>
</project>"#;
        let bundle = write_bundle(Some("<dccdmetadata/>"), tridas, &[]);

        let err = importer(&store)
            .import_project(&bundle.path().join("data"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingFile { name } if name == "report.pdf"));
    }

    #[tokio::test]
    async fn test_associated_files_attached() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        let tridas = r#"<project>
  <title>P</title>
  <file href="report.pdf"/>
</project>"#;
        let bundle = write_bundle(Some("<dccdmetadata/>"), tridas, &[]);
        let associated = bundle.path().join("data").join("associated");
        std::fs::create_dir(&associated).unwrap();
        std::fs::write(associated.join("report.pdf"), b"%PDF-").unwrap();

        let sid = importer(&store)
            .import_project(&bundle.path().join("data"), "alice")
            .await
            .unwrap();
        let project = store.get_project(&sid).await.unwrap();
        assert_eq!(project.associated_files.len(), 1);
        assert_eq!(project.associated_files[0].file_name, "report.pdf");
        assert_eq!(project.associated_files[0].unit_id, "AF1");
    }

    #[tokio::test]
    async fn test_audit_log_appended_after_store() {
        let store = Arc::new(MemoryArchiveStore::new().unwrap());
        let log_dir = TempDir::new().unwrap();
        let log_path = log_dir.path().join("imports.log");
        let settings = ImportSettings {
            audit_log: Some(log_path.display().to_string()),
            ..Default::default()
        };
        let importer = ProjectImporter::new(Arc::clone(&store), settings);

        let bundle = write_bundle(
            Some("<dccdmetadata/>"),
            TRIDAS_TWO_SERIES,
            &[("beam1.fh", HEIDELBERG_ONE_GROUP)],
        );
        let sid = importer
            .import_project(&bundle.path().join("data"), "alice")
            .await
            .unwrap();

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.starts_with(&format!("{sid}\t")));
    }
}
