// Dataset store
// Loads and saves record collections by coordinate and discovers projects

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use super::address::{validate_name, AddressResolver, Coordinate, Datatype};
use super::jsonl;
use super::prepare::{prepare_raw, ExportRow};
use super::records::DocumentRecord;
use super::split::{split, stratified_k_fold, Splits};
use crate::config::DataConfig;
use crate::errors::{AnalyticsError, Result};
use crate::taxonomy::Sdg;

/// Owner of every partition file
#[derive(Debug, Clone)]
pub struct DatasetStore {
    resolver: AddressResolver,
}

impl DatasetStore {
    pub fn new(resolver: AddressResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    /// Records at a coordinate; `NotFound` when nothing backs it
    pub fn load<T: DeserializeOwned>(&self, coordinate: &Coordinate) -> Result<Vec<T>> {
        let path = self.resolver.resolve(coordinate)?;
        jsonl::read_records(&path)
    }

    /// Replace whatever is stored at a coordinate
    pub fn save<T: Serialize>(&self, records: &[T], coordinate: &Coordinate) -> Result<PathBuf> {
        let path = self.resolver.resolve(coordinate)?;
        jsonl::write_records(&path, records)?;
        tracing::debug!(
            coordinate = %coordinate,
            records = records.len(),
            path = %path.display(),
            "Saved records"
        );
        Ok(path)
    }

    pub fn exists(&self, coordinate: &Coordinate) -> Result<bool> {
        Ok(self.resolver.resolve(coordinate)?.exists())
    }

    /// Project-wide dataset (raw or a partition)
    pub fn load_documents(&self, datatype: Datatype, project: &str) -> Result<Vec<DocumentRecord>> {
        ensure_dataset(datatype)?;
        self.load(&Coordinate::dataset(datatype, project))
    }

    /// Dataset for one category: the category-specific partition when present,
    /// otherwise the project-wide one
    pub fn load_for_category(
        &self,
        datatype: Datatype,
        category: Sdg,
        project: &str,
    ) -> Result<Vec<DocumentRecord>> {
        ensure_dataset(datatype)?;
        if datatype.is_partition() {
            let specific = Coordinate::dataset(datatype, project).with_category(category);
            if self.exists(&specific)? {
                return self.load(&specific);
            }
        }
        self.load_documents(datatype, project)
    }

    pub fn save_splits(&self, project: &str, splits: &Splits) -> Result<()> {
        for (datatype, records) in [
            (Datatype::Train, &splits.train),
            (Datatype::Dev, &splits.dev),
            (Datatype::Test, &splits.test),
            (Datatype::Traindev, &splits.traindev),
        ] {
            self.save(records, &Coordinate::dataset(datatype, project))?;
        }
        tracing::info!(
            project = project,
            train = splits.train.len(),
            dev = splits.dev.len(),
            test = splits.test.len(),
            "Saved dataset partitions"
        );
        Ok(())
    }

    /// Distinct projects with data for `datatype`, or for any datatype
    pub fn discover_projects(&self, datatype: Option<Datatype>) -> Result<BTreeSet<String>> {
        let datatypes: Vec<Datatype> = match datatype {
            Some(Datatype::Models) => {
                return Err(AnalyticsError::Config(
                    "model artifacts are not keyed by project".to_string(),
                ))
            }
            Some(d) => vec![d],
            None => Datatype::ALL
                .into_iter()
                .filter(|d| *d != Datatype::Models)
                .collect(),
        };

        let mut projects = BTreeSet::new();
        for datatype in datatypes {
            for (_, coordinate) in self.resolver.discover(&Coordinate::any(datatype))? {
                projects.extend(coordinate.project);
            }
        }
        Ok(projects)
    }

    /// Projects holding `datatype` data usable for `category`
    pub fn projects_with_data(&self, datatype: Datatype, category: Sdg) -> Result<BTreeSet<String>> {
        ensure_dataset(datatype)?;
        let projects = self
            .resolver
            .discover(&Coordinate::any(datatype))?
            .into_iter()
            .filter(|(_, c)| c.category.map_or(true, |c| c == category))
            .filter_map(|(_, c)| c.project)
            .collect();
        Ok(projects)
    }

    /// Pick a project by its position in the sorted discovery list
    pub fn select_project(&self, datatype: Datatype, index: usize) -> Result<String> {
        let projects: Vec<String> = self.discover_projects(Some(datatype))?.into_iter().collect();
        if projects.is_empty() {
            return Err(AnalyticsError::NotFound(self.resolver.directory(datatype)));
        }
        let available = projects.len();
        projects
            .into_iter()
            .nth(index)
            .ok_or(AnalyticsError::SelectionOutOfRange { index, available })
    }

    /// Every project-wide datatype with a backing file for `project`
    pub fn project_mappings(&self, project: &str) -> Result<BTreeMap<Datatype, PathBuf>> {
        validate_name(project)?;
        let mut mappings = BTreeMap::new();
        for datatype in Datatype::ALL.into_iter().filter(Datatype::is_dataset) {
            let path = self.resolver.resolve(&Coordinate::dataset(datatype, project))?;
            if path.exists() {
                mappings.insert(datatype, path);
            }
        }
        Ok(mappings)
    }

    /// Projects with an annotation export directory
    pub fn export_projects(&self) -> Result<Vec<String>> {
        let root = self.resolver.storage().exports_path();
        let pattern = format!("{}/*", glob::Pattern::escape(&root.to_string_lossy()));

        let mut projects = Vec::new();
        for path in glob::glob(&pattern)?.flatten() {
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match validate_name(name) {
                Ok(()) => projects.push(name.to_string()),
                Err(e) => tracing::warn!(error = %e, "Skipping export directory"),
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Every row of every JSONL export file of a project, in file-name order
    pub fn load_exports(&self, project: &str) -> Result<Vec<ExportRow>> {
        validate_name(project)?;
        let dir = self.resolver.storage().exports_path().join(project);
        if !dir.is_dir() {
            return Err(AnalyticsError::NotFound(dir));
        }

        let pattern = format!("{}/*.jsonl", glob::Pattern::escape(&dir.to_string_lossy()));
        let mut files: Vec<PathBuf> = glob::glob(&pattern)?.flatten().collect();
        files.sort();

        let mut rows = Vec::new();
        for file in files {
            rows.extend(jsonl::read_records::<ExportRow>(&file)?);
        }
        Ok(rows)
    }
}

impl DatasetStore {
    /// Build the raw set of a project from its exports, then split and save
    /// every partition
    pub fn prepare_project(&self, project: &str, data: &DataConfig) -> Result<Splits> {
        let rows = self.load_exports(project)?;
        let records = prepare_raw(rows, &data.required_columns)?;
        self.save(&records, &Coordinate::raw(project))?;

        let splits = split(&records, data.seed);
        self.save_splits(project, &splits)?;
        tracing::info!(project = project, documents = records.len(), "Prepared raw data");
        Ok(splits)
    }

    /// Cross-validation folds of a project's `traindev` set, stratified on
    /// the configured grouping column
    pub fn k_folds(
        &self,
        project: &str,
        data: &DataConfig,
    ) -> Result<Vec<(Vec<DocumentRecord>, Vec<DocumentRecord>)>> {
        let traindev = self.load_documents(Datatype::Traindev, project)?;
        stratified_k_fold(&traindev, &data.stratify_column, data.folds, data.seed)
    }
}

fn ensure_dataset(datatype: Datatype) -> Result<()> {
    if datatype.is_dataset() {
        Ok(())
    } else {
        Err(AnalyticsError::Config(format!(
            "'{}' does not hold document records",
            datatype
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use serde_json::Map;
    use std::fs;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> DatasetStore {
        DatasetStore::new(AddressResolver::new(StorageConfig::rooted_at(dir.path())))
    }

    fn documents(n: usize) -> Vec<DocumentRecord> {
        (0..n)
            .map(|i| DocumentRecord::new(i, format!("doc {}", i), vec![], vec![], Map::new()))
            .collect()
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir)
            .load_documents(Datatype::Train, "nothing")
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound(_)));
    }

    #[test]
    fn test_save_overwrites_and_loads() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let coordinate = Coordinate::raw("proj");

        store.save(&documents(5), &coordinate).unwrap();
        store.save(&documents(2), &coordinate).unwrap();

        let loaded: Vec<DocumentRecord> = store.load(&coordinate).unwrap();
        assert_eq!(loaded, documents(2));
    }

    #[test]
    fn test_discover_projects() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let docs = documents(10);

        store.save(&docs, &Coordinate::raw("alpha")).unwrap();
        store.save_splits("alpha", &split(&docs, 1)).unwrap();
        store.save(&docs, &Coordinate::raw("beta")).unwrap();
        store
            .save(&docs, &Coordinate::dataset(Datatype::Test, "gamma").with_category(Sdg::NoPoverty))
            .unwrap();

        let all = store.discover_projects(None).unwrap();
        assert_eq!(
            all.into_iter().collect::<Vec<_>>(),
            vec!["alpha", "beta", "gamma"]
        );

        let train = store.discover_projects(Some(Datatype::Train)).unwrap();
        assert_eq!(train.into_iter().collect::<Vec<_>>(), vec!["alpha"]);

        let test_sdg1 = store.projects_with_data(Datatype::Test, Sdg::NoPoverty).unwrap();
        assert_eq!(test_sdg1.len(), 2);
        let test_sdg2 = store.projects_with_data(Datatype::Test, Sdg::ZeroHunger).unwrap();
        assert_eq!(test_sdg2.into_iter().collect::<Vec<_>>(), vec!["alpha"]);

        let mappings = store.project_mappings("alpha").unwrap();
        assert_eq!(mappings.len(), 5);
    }

    #[test]
    fn test_select_project_out_of_range() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store
            .save(&documents(3), &Coordinate::dataset(Datatype::Train, "only"))
            .unwrap();

        assert_eq!(store.select_project(Datatype::Train, 0).unwrap(), "only");
        assert!(matches!(
            store.select_project(Datatype::Train, 1),
            Err(AnalyticsError::SelectionOutOfRange {
                index: 1,
                available: 1
            })
        ));
    }

    #[test]
    fn test_category_partition_preferred() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store
            .save(&documents(4), &Coordinate::dataset(Datatype::Dev, "p"))
            .unwrap();
        store
            .save(
                &documents(2),
                &Coordinate::dataset(Datatype::Dev, "p").with_category(Sdg::GenderEquality),
            )
            .unwrap();

        assert_eq!(
            store
                .load_for_category(Datatype::Dev, Sdg::GenderEquality, "p")
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            store
                .load_for_category(Datatype::Dev, Sdg::DecentWork, "p")
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn test_prepare_project_writes_raw_and_partitions() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let project_dir = dir.path().join("doccano_export/grad");
        fs::create_dir_all(&project_dir).unwrap();
        let lines: Vec<String> = (0..10)
            .map(|i| {
                format!(
                    "{{\"text\": \"course {}\", \"cats\": [], \"entities\": [], \"DEPARTMENT\": \"d{}\"}}",
                    i,
                    i % 2
                )
            })
            .collect();
        fs::write(project_dir.join("export.jsonl"), lines.join("\n")).unwrap();

        let data = DataConfig {
            required_columns: ["text", "cats", "entities", "DEPARTMENT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..DataConfig::default()
        };
        let splits = store.prepare_project("grad", &data).unwrap();
        assert_eq!(splits.test.len(), 2);
        assert_eq!(store.load_documents(Datatype::Raw, "grad").unwrap().len(), 10);
        assert_eq!(store.project_mappings("grad").unwrap().len(), 5);

        let folds = store
            .k_folds("grad", &DataConfig { folds: 2, ..data })
            .unwrap();
        assert_eq!(folds.len(), 2);
        assert!(folds.iter().all(|(train, dev)| train.len() + dev.len() == 8));
    }

    #[test]
    fn test_prepare_project_reports_missing_columns() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let project_dir = dir.path().join("doccano_export/grad");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("export.jsonl"), "{\"text\": \"a\"}\n").unwrap();

        let err = store.prepare_project("grad", &DataConfig::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumns { .. }));
        assert!(!store.exists(&Coordinate::raw("grad")).unwrap());
    }

    #[test]
    fn test_load_exports_in_file_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let project_dir = dir.path().join("doccano_export/uoft");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("b.jsonl"), "{\"text\": \"second\"}\n").unwrap();
        fs::write(project_dir.join("a.jsonl"), "{\"text\": \"first\"}\n").unwrap();

        assert_eq!(store.export_projects().unwrap(), vec!["uoft"]);
        let rows = store.load_exports("uoft").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["text"], "first");
    }
}
