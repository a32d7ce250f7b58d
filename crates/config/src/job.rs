use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use dbrecon_recon::{CompareOptions, JoinKeySpec, ReconError, Side, ToleranceMap};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::source::{ConnectionConfig, ResolvedSource, SourceConfig};

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,
    /// Jobs in the order they appear in the file.
    #[serde(deserialize_with = "ordered_jobs")]
    pub jobs: Vec<Job>,
    /// Directory that relative paths resolve against.
    #[serde(skip, default = "default_base_dir")]
    pub base_dir: PathBuf,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug)]
pub struct Job {
    pub name: String,
    pub config: JobConfig,
}

impl JobFile {
    /// Parse and validate. Relative paths resolve against the current directory.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let file: JobFile = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    /// Read, parse and validate a config file. Relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = Self::from_toml(&input)?;
        file.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(default_base_dir);
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs.is_empty() {
            return Err(ConfigError::NoJobs);
        }
        for job in &self.jobs {
            job.config.compare_options(&job.name)?;
            self.resolve_sources(job)?;
        }
        Ok(())
    }

    pub fn job(&self, name: &str) -> Result<&Job, ConfigError> {
        self.jobs
            .iter()
            .find(|j| j.name == name)
            .ok_or_else(|| ConfigError::UnknownJob(name.to_string()))
    }

    /// Resolve both sides of `job` against the shared connections.
    pub fn resolve_sources(&self, job: &Job) -> Result<(ResolvedSource, ResolvedSource), ConfigError> {
        let resolve = |side: Side, cfg: &SourceConfig| {
            let connection = match &cfg.connection {
                Some(name) => Some(self.connections.get(name).ok_or_else(|| {
                    ConfigError::UnknownConnection {
                        job: job.name.clone(),
                        side,
                        connection: name.clone(),
                    }
                })?),
                None => None,
            };
            cfg.resolve(&job.name, side, connection, &self.base_dir)
        };
        Ok((
            resolve(Side::Source1, &job.config.source1)?,
            resolve(Side::Source2, &job.config.source2)?,
        ))
    }

    /// Where a job's reports go: `output_dir` if set, else `output/<job>`.
    pub fn output_dir(&self, job: &Job) -> PathBuf {
        match &job.config.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.base_dir.join(dir),
            None => self.base_dir.join("output").join(&job.name),
        }
    }
}

fn ordered_jobs<'de, D>(deserializer: D) -> Result<Vec<Job>, D::Error>
where
    D: Deserializer<'de>,
{
    struct JobsVisitor;

    impl<'de> Visitor<'de> for JobsVisitor {
        type Value = Vec<Job>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of jobs")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut jobs = Vec::new();
            while let Some((name, config)) = map.next_entry::<String, JobConfig>()? {
                jobs.push(Job { name, config });
            }
            Ok(jobs)
        }
    }

    deserializer.deserialize_map(JobsVisitor)
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub source1: SourceConfig,
    pub source2: SourceConfig,
    pub join_keys: Vec<JoinKeyEntry>,
    pub compare_columns: Option<Vec<String>>,
    #[serde(default)]
    pub column_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerance: BTreeMap<String, f64>,
    pub abs_tol: Option<f64>,
    pub rel_tol: Option<f64>,
    #[serde(default = "default_true")]
    pub validate_duplicates: bool,
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub reports: ReportConfig,
}

fn default_true() -> bool {
    true
}

/// A join key: a bare column name, or a table with per-side columns and transforms.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JoinKeyEntry {
    Column(String),
    Spec(JoinKeyTable),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinKeyTable {
    pub column: String,
    pub source1_column: Option<String>,
    pub source2_column: Option<String>,
    pub source1_transform: Option<String>,
    pub source2_transform: Option<String>,
}

impl JoinKeyEntry {
    pub fn to_spec(&self) -> Result<JoinKeySpec, ReconError> {
        match self {
            Self::Column(name) => Ok(JoinKeySpec::new(name.as_str())),
            Self::Spec(t) => JoinKeySpec::from_names(
                &t.column,
                t.source1_column.as_deref(),
                t.source2_column.as_deref(),
                t.source1_transform.as_deref(),
                t.source2_transform.as_deref(),
            ),
        }
    }
}

impl JobConfig {
    /// Typed comparison options. Fails on unknown transforms or bad tolerances.
    pub fn compare_options(&self, job: &str) -> Result<CompareOptions, ConfigError> {
        let recon = |source: ReconError| ConfigError::Recon {
            job: job.to_string(),
            source,
        };
        if self.join_keys.is_empty() {
            return Err(ConfigError::NoJoinKeys { job: job.to_string() });
        }
        let join_keys = self
            .join_keys
            .iter()
            .map(JoinKeyEntry::to_spec)
            .collect::<Result<Vec<_>, _>>()
            .map_err(recon)?;
        let tolerances = ToleranceMap::try_from(self.tolerance.clone()).map_err(recon)?;

        Ok(CompareOptions {
            join_keys,
            // An empty list means the same as an absent one: compare every field.
            fields: self.compare_columns.clone().filter(|fields| !fields.is_empty()),
            tolerances,
            column_mapping: self.column_mapping.clone(),
            validate_duplicates: self.validate_duplicates,
            abs_tol: self.abs_tol,
            rel_tol: self.rel_tol,
        })
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub full_csv: bool,
    pub diff_csv: bool,
    pub summary: bool,
    pub side_by_side_excel: bool,
    pub show_join_columns_both_sides: bool,
    pub show_transformed_columns: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            full_csv: true,
            diff_csv: true,
            summary: true,
            side_by_side_excel: false,
            show_join_columns_both_sides: false,
            show_transformed_columns: false,
        }
    }
}
