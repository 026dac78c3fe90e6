// Address resolver
// Maps coordinates (datatype, category, project, model) to file locations and back

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::constants::{ARTIFACT_EXTENSION, FIELD_SEPARATOR, RECORDS_EXTENSION};
use crate::config::StorageConfig;
use crate::errors::{AnalyticsError, Result};
use crate::taxonomy::Sdg;

const PREDICTIONS_SUFFIX: &str = "predictions";

/// Kind of stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Raw,
    Train,
    Dev,
    Test,
    Traindev,
    Models,
    Predictions,
}

impl Datatype {
    pub const ALL: [Datatype; 7] = [
        Datatype::Raw,
        Datatype::Train,
        Datatype::Dev,
        Datatype::Test,
        Datatype::Traindev,
        Datatype::Models,
        Datatype::Predictions,
    ];

    /// Partitions produced by the split
    pub const PARTITIONS: [Datatype; 4] = [
        Datatype::Train,
        Datatype::Dev,
        Datatype::Test,
        Datatype::Traindev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Train => "train",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Traindev => "traindev",
            Self::Models => "models",
            Self::Predictions => "predictions",
        }
    }

    /// Collections of Document Records (raw or a partition)
    pub fn is_dataset(&self) -> bool {
        matches!(self, Self::Raw) || self.is_partition()
    }

    pub fn is_partition(&self) -> bool {
        matches!(self, Self::Train | Self::Dev | Self::Test | Self::Traindev)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|d| d.as_str() == s)
            .copied()
            .ok_or_else(|| AnalyticsError::UnknownDatatype(s.to_string()))
    }
}

/// Logical address of a stored object.
///
/// Unset fields act as wildcards when the coordinate is used as a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub datatype: Datatype,
    pub category: Option<Sdg>,
    pub project: Option<String>,
    pub model_name: Option<String>,
    /// Dataset a prediction file was produced from
    pub source: Option<Datatype>,
}

impl Coordinate {
    /// Every field unset
    pub fn any(datatype: Datatype) -> Self {
        Self {
            datatype,
            category: None,
            project: None,
            model_name: None,
            source: None,
        }
    }

    pub fn raw(project: impl Into<String>) -> Self {
        Self::any(Datatype::Raw).with_project(project)
    }

    /// Project-wide dataset (raw or partition)
    pub fn dataset(datatype: Datatype, project: impl Into<String>) -> Self {
        Self::any(datatype).with_project(project)
    }

    pub fn model(category: Sdg, model_name: impl Into<String>) -> Self {
        Self::any(Datatype::Models)
            .with_category(category)
            .with_model(model_name)
    }

    pub fn predictions(
        category: Sdg,
        model_name: impl Into<String>,
        project: impl Into<String>,
        source: Datatype,
    ) -> Self {
        Self::any(Datatype::Predictions)
            .with_category(category)
            .with_model(model_name)
            .with_project(project)
            .with_source(source)
    }

    pub fn with_category(mut self, category: Sdg) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn with_source(mut self, source: Datatype) -> Self {
        self.source = Some(source);
        self
    }

    /// First field that is set but not part of the datatype's key
    fn unexpected_field(&self) -> Option<&'static str> {
        let (category, project, model_name, source) = match self.datatype {
            Datatype::Raw => (false, true, false, false),
            Datatype::Models => (true, false, true, false),
            Datatype::Predictions => (true, true, true, true),
            _ => (true, true, false, false),
        };
        [
            ("category", category, self.category.is_some()),
            ("project", project, self.project.is_some()),
            ("model_name", model_name, self.model_name.is_some()),
            ("source", source, self.source.is_some()),
        ]
        .into_iter()
        .find(|(_, allowed, set)| *set && !allowed)
        .map(|(field, _, _)| field)
    }

    /// True when every field set on `self` equals the same field on `other`
    pub fn matches(&self, other: &Coordinate) -> bool {
        fn field<T: PartialEq>(query: &Option<T>, value: &Option<T>) -> bool {
            query.as_ref().map_or(true, |q| value.as_ref() == Some(q))
        }

        self.datatype == other.datatype
            && field(&self.category, &other.category)
            && field(&self.project, &other.project)
            && field(&self.model_name, &other.model_name)
            && field(&self.source, &other.source)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datatype)?;
        for part in [
            self.category.map(|c| c.key()),
            self.model_name.clone(),
            self.project.clone(),
            self.source.map(|s| s.to_string()),
        ]
        .into_iter()
        .flatten()
        {
            write!(f, "/{}", part)?;
        }
        Ok(())
    }
}

/// Reject names that would make a location ambiguous or unsafe
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains(FIELD_SEPARATOR) {
        Some("'__' is reserved as the field separator")
    } else if name.starts_with('_') || name.ends_with('_') {
        Some("name must not start or end with '_'")
    } else if name.contains(['/', '\\']) {
        Some("name must not contain path separators")
    } else if name.contains(['*', '?', '[', ']']) {
        Some("name must not contain glob metacharacters")
    } else if name == "." || name == ".." {
        Some("name must not be a relative path component")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AnalyticsError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Single source of truth for artifact locations
#[derive(Debug, Clone)]
pub struct AddressResolver {
    storage: StorageConfig,
}

impl AddressResolver {
    pub fn new(storage: StorageConfig) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Directory holding every object of a datatype
    pub fn directory(&self, datatype: Datatype) -> PathBuf {
        match datatype {
            Datatype::Raw => self.storage.raw_path(),
            Datatype::Models => self.storage.models_path(),
            Datatype::Predictions => self.storage.predictions_path(),
            _ => self.storage.processed_path(),
        }
    }

    /// Aggregated evaluation table
    pub fn results_file(&self) -> PathBuf {
        self.storage.results_file()
    }

    /// Concrete location of a fully specified coordinate
    pub fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        let name = file_name(coordinate, false)?;
        Ok(self.directory(coordinate.datatype).join(name))
    }

    /// Glob pattern matching every location the coordinate could address
    pub fn pattern(&self, coordinate: &Coordinate) -> Result<String> {
        let dir = self.directory(coordinate.datatype);
        let dir = glob::Pattern::escape(&dir.to_string_lossy());
        Ok(format!("{}/{}", dir, file_name(coordinate, true)?))
    }

    /// Recover the coordinate of a location produced by [`resolve`](Self::resolve)
    pub fn parse(&self, datatype: Datatype, path: &Path) -> Result<Coordinate> {
        let invalid = |reason: &str| AnalyticsError::InvalidLocation {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| invalid("no file name"))?;

        let extension = match datatype {
            Datatype::Models => ARTIFACT_EXTENSION,
            _ => RECORDS_EXTENSION,
        };
        let stem = file_name
            .strip_suffix(extension)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(|| invalid("unexpected extension"))?;

        let coordinate = match datatype {
            Datatype::Raw => Coordinate::raw(stem),
            Datatype::Models => {
                let (category, model_name) = stem
                    .split_once(FIELD_SEPARATOR)
                    .ok_or_else(|| invalid("expected <category>__<model>"))?;
                Coordinate::model(parse_category(category, path)?, model_name)
            }
            Datatype::Predictions => {
                let body = stem
                    .strip_suffix(PREDICTIONS_SUFFIX)
                    .and_then(|s| s.strip_suffix(FIELD_SEPARATOR))
                    .ok_or_else(|| invalid("missing __predictions suffix"))?;
                let (category, rest) = body
                    .split_once(FIELD_SEPARATOR)
                    .ok_or_else(|| invalid("missing category"))?;
                let (rest, source) = rest
                    .rsplit_once(FIELD_SEPARATOR)
                    .ok_or_else(|| invalid("missing source datatype"))?;
                let (model_name, project) = rest
                    .split_once(FIELD_SEPARATOR)
                    .ok_or_else(|| invalid("expected <model>__<project>"))?;
                let source: Datatype = source.parse()?;
                if !source.is_dataset() {
                    return Err(invalid("source datatype is not a dataset"));
                }
                Coordinate::predictions(
                    parse_category(category, path)?,
                    model_name,
                    project,
                    source,
                )
            }
            partition => {
                let (head, split) = stem
                    .rsplit_once(FIELD_SEPARATOR)
                    .ok_or_else(|| invalid("missing partition suffix"))?;
                if split != partition.as_str() {
                    return Err(invalid("partition suffix does not match datatype"));
                }
                // Category keys never contain the separator, so the first one ends it
                match head.split_once(FIELD_SEPARATOR) {
                    Some((category, project)) => Coordinate::dataset(partition, project)
                        .with_category(parse_category(category, path)?),
                    None => Coordinate::dataset(partition, head),
                }
            }
        };

        for name in [&coordinate.project, &coordinate.model_name]
            .into_iter()
            .flatten()
        {
            validate_name(name).map_err(|e| invalid(&e.to_string()))?;
        }

        Ok(coordinate)
    }

    /// Every existing location matching the query, with its parsed coordinate
    pub fn discover(&self, query: &Coordinate) -> Result<Vec<(PathBuf, Coordinate)>> {
        let pattern = self.pattern(query)?;
        let mut found = Vec::new();

        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                AnalyticsError::io(path, e.into_error())
            })?;
            match self.parse(query.datatype, &path) {
                Ok(coordinate) if query.matches(&coordinate) => found.push((path, coordinate)),
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Ignoring foreign file"),
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }
}

fn parse_category(raw: &str, path: &Path) -> Result<Sdg> {
    raw.parse().map_err(|_| AnalyticsError::InvalidLocation {
        path: path.to_path_buf(),
        reason: format!("unknown category '{}'", raw),
    })
}

/// File name for a coordinate; unset fields become `*` when `wildcard` is set
fn file_name(coordinate: &Coordinate, wildcard: bool) -> Result<String> {
    let datatype = coordinate.datatype;
    let datatype_name = datatype.as_str();
    if let Some(field) = coordinate.unexpected_field() {
        return Err(AnalyticsError::UnexpectedCoordinateField {
            datatype: datatype_name,
            field,
        });
    }

    let text = |value: &Option<String>, field: &'static str| -> Result<String> {
        match value {
            Some(v) => {
                validate_name(v)?;
                Ok(if wildcard {
                    glob::Pattern::escape(v)
                } else {
                    v.clone()
                })
            }
            None if wildcard => Ok("*".to_string()),
            None => Err(AnalyticsError::MissingCoordinateField {
                datatype: datatype_name,
                field,
            }),
        }
    };
    let category = |field: &'static str| -> Result<String> {
        match coordinate.category {
            Some(c) => Ok(c.key()),
            None if wildcard => Ok("*".to_string()),
            None => Err(AnalyticsError::MissingCoordinateField {
                datatype: datatype_name,
                field,
            }),
        }
    };
    let sep = FIELD_SEPARATOR;

    let name = match datatype {
        Datatype::Raw => format!("{}.{}", text(&coordinate.project, "project")?, RECORDS_EXTENSION),
        Datatype::Models => format!(
            "{}{sep}{}.{}",
            category("category")?,
            text(&coordinate.model_name, "model_name")?,
            ARTIFACT_EXTENSION
        ),
        Datatype::Predictions => {
            let source = match coordinate.source {
                Some(source) if source.is_dataset() => source.as_str().to_string(),
                Some(_) => {
                    return Err(AnalyticsError::Config(
                        "predictions can only be made on dataset partitions".to_string(),
                    ))
                }
                None if wildcard => "*".to_string(),
                None => {
                    return Err(AnalyticsError::MissingCoordinateField {
                        datatype: datatype_name,
                        field: "source",
                    })
                }
            };
            format!(
                "{}{sep}{}{sep}{}{sep}{}{sep}{PREDICTIONS_SUFFIX}.{}",
                category("category")?,
                text(&coordinate.model_name, "model_name")?,
                text(&coordinate.project, "project")?,
                source,
                RECORDS_EXTENSION
            )
        }
        partition => {
            let project = text(&coordinate.project, "project")?;
            let prefix = match (coordinate.category, wildcard) {
                (Some(c), _) => format!("{}{sep}", c.key()),
                // Category is optional for partitions; the query filter drops over-matches
                (None, true) if project != "*" => "*".to_string(),
                (None, _) => String::new(),
            };
            format!(
                "{prefix}{project}{sep}{}.{}",
                partition.as_str(),
                RECORDS_EXTENSION
            )
        }
    };

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn resolver(root: &Path) -> AddressResolver {
        AddressResolver::new(StorageConfig::rooted_at(root))
    }

    fn sample_coordinates() -> Vec<Coordinate> {
        let mut coordinates = vec![
            Coordinate::raw("uoft_courses"),
            Coordinate::model(Sdg::CleanEnergy, "stars_sustain"),
            Coordinate::model(Sdg::PeaceJustice, "logistic_regression_subsampled"),
            Coordinate::predictions(Sdg::NoPoverty, "keyword_dictionary", "grad-2023", Datatype::Test),
            Coordinate::predictions(Sdg::ClimateAction, "stars_sustain", "a_b", Datatype::Raw),
        ];
        for partition in Datatype::PARTITIONS {
            coordinates.push(Coordinate::dataset(partition, "course_outlines_v2"));
            coordinates.push(
                Coordinate::dataset(partition, "under_grad").with_category(Sdg::LifeOnLand),
            );
        }
        coordinates
    }

    #[test]
    fn test_datatype_parse_rejects_unknown() {
        assert_eq!("traindev".parse::<Datatype>().unwrap(), Datatype::Traindev);
        assert!(matches!(
            "prediction".parse::<Datatype>(),
            Err(AnalyticsError::UnknownDatatype(_))
        ));
    }

    #[test]
    fn test_resolve_then_parse_round_trips() {
        let resolver = resolver(Path::new("/data"));
        for coordinate in sample_coordinates() {
            let path = resolver.resolve(&coordinate).unwrap();
            let parsed = resolver.parse(coordinate.datatype, &path).unwrap();
            assert_eq!(parsed, coordinate, "round trip failed for {}", path.display());
        }
    }

    #[test]
    fn test_fields_outside_the_key_are_rejected() {
        let resolver = resolver(Path::new("/data"));
        let foreign = [
            (Coordinate::raw("p").with_category(Sdg::ZeroHunger), "category"),
            (Coordinate::raw("p").with_model("m"), "model_name"),
            (Coordinate::dataset(Datatype::Dev, "p").with_source(Datatype::Test), "source"),
            (Coordinate::model(Sdg::NoPoverty, "m").with_project("p"), "project"),
            (Coordinate::any(Datatype::Models).with_source(Datatype::Raw), "source"),
        ];
        for (coordinate, expected) in foreign {
            for result in [
                resolver.resolve(&coordinate).map(|_| ()),
                resolver.pattern(&coordinate).map(|_| ()),
            ] {
                match result {
                    Err(AnalyticsError::UnexpectedCoordinateField { field, .. }) => {
                        assert_eq!(field, expected, "{}", coordinate)
                    }
                    other => panic!("{} resolved: {:?}", coordinate, other),
                }
            }
        }
        assert!(resolver.resolve(&Coordinate::raw("p")).is_ok());
    }

    #[test]
    fn test_resolved_file_names() {
        let resolver = resolver(Path::new("/data"));
        assert_eq!(
            resolver
                .resolve(&Coordinate::dataset(Datatype::Train, "proj"))
                .unwrap(),
            PathBuf::from("/data/processed/proj__train.jsonl")
        );
        assert_eq!(
            resolver
                .resolve(&Coordinate::model(Sdg::NoPoverty, "stars_sustain"))
                .unwrap(),
            PathBuf::from("/data/models/SDG 1__stars_sustain.json")
        );
        assert_eq!(
            resolver
                .resolve(&Coordinate::predictions(
                    Sdg::ZeroHunger,
                    "m",
                    "p",
                    Datatype::Dev
                ))
                .unwrap(),
            PathBuf::from("/data/predictions/SDG 2__m__p__dev__predictions.jsonl")
        );
    }

    #[test]
    fn test_project_with_single_underscores_parses_on_first_separator() {
        let resolver = resolver(Path::new("/data"));
        let path = PathBuf::from("/data/processed/SDG 4__my_project_x__dev.jsonl");
        let parsed = resolver.parse(Datatype::Dev, &path).unwrap();
        assert_eq!(parsed.category, Some(Sdg::QualityEducation));
        assert_eq!(parsed.project.as_deref(), Some("my_project_x"));
    }

    #[test]
    fn test_resolve_requires_fields() {
        let resolver = resolver(Path::new("/data"));
        let err = resolver.resolve(&Coordinate::any(Datatype::Models)).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MissingCoordinateField { field: "category", .. }
        ));
    }

    #[test]
    fn test_reserved_separator_rejected() {
        let resolver = resolver(Path::new("/data"));
        let err = resolver
            .resolve(&Coordinate::raw("bad__name"))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidName { .. }));
        assert!(validate_name("trailing_").is_err());
        assert!(validate_name("glob*").is_err());
        assert!(validate_name("fine-name_1").is_ok());
    }

    #[test]
    fn test_wildcard_patterns() {
        let resolver = resolver(Path::new("/data"));
        assert_eq!(
            resolver.pattern(&Coordinate::any(Datatype::Test)).unwrap(),
            "/data/processed/*__test.jsonl"
        );
        assert_eq!(
            resolver.pattern(&Coordinate::any(Datatype::Predictions)).unwrap(),
            "/data/predictions/*__*__*__*__predictions.jsonl"
        );
        assert_eq!(
            resolver
                .pattern(&Coordinate::any(Datatype::Models).with_category(Sdg::NoPoverty))
                .unwrap(),
            "/data/models/SDG 1__*.json"
        );
    }

    #[test]
    fn test_discover_filters_by_query() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(dir.path());
        let written = [
            Coordinate::dataset(Datatype::Train, "alpha"),
            Coordinate::dataset(Datatype::Train, "beta").with_category(Sdg::GoodHealth),
            Coordinate::dataset(Datatype::Dev, "alpha"),
            Coordinate::dataset(Datatype::Train, "xalpha"),
        ];
        for coordinate in &written {
            let path = resolver.resolve(coordinate).unwrap();
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
        fs::write(dir.path().join("processed/notes.txt"), "").unwrap();

        let all_train = resolver.discover(&Coordinate::any(Datatype::Train)).unwrap();
        assert_eq!(all_train.len(), 3);

        let alpha = resolver
            .discover(&Coordinate::dataset(Datatype::Train, "alpha"))
            .unwrap();
        assert_eq!(alpha.len(), 1);
        assert_eq!(alpha[0].1, written[0]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_fails_discovery() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let resolver = resolver(dir.path());
        let models = resolver.directory(Datatype::Models);
        fs::create_dir_all(&models).unwrap();
        fs::write(models.join("SDG 1__stars_sustain.json"), "{}").unwrap();
        fs::set_permissions(&models, fs::Permissions::from_mode(0o000)).unwrap();

        // permissions do not apply to a privileged user
        let readable = fs::read_dir(&models).is_ok();
        let result = resolver.discover(&Coordinate::any(Datatype::Models));
        fs::set_permissions(&models, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }
        assert!(matches!(result, Err(AnalyticsError::Io { .. })));
    }
}
