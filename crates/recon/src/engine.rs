use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{info, warn};

use crate::compare::{compare_fields, resolve_fields, ToleranceMap};
use crate::dataset::Dataset;
use crate::duplicates::validate_duplicates;
use crate::error::ReconError;
use crate::keys::{apply_column_mapping, JoinKeySpec, KeyTransformPipeline, OriginalKeyColumns};
use crate::matcher::{full_outer_join, key_indices};
use crate::model::{ComparisonSummary, DuplicateCheck, MergedDataset, RunMetrics, Side};
use crate::summary::summarize;

/// Everything one comparison needs besides the two datasets.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub join_keys: Vec<JoinKeySpec>,
    /// Declared fields to compare. `None` or an empty list compares every source1 field.
    pub fields: Option<Vec<String>>,
    pub tolerances: ToleranceMap,
    /// Source1 column renames applied before key construction.
    pub column_mapping: BTreeMap<String, String>,
    pub validate_duplicates: bool,
    /// Accepted for configuration compatibility; field comparison only consults `tolerances`.
    pub abs_tol: Option<f64>,
    /// Accepted for configuration compatibility; field comparison only consults `tolerances`.
    pub rel_tol: Option<f64>,
}

impl CompareOptions {
    pub fn new(join_keys: Vec<JoinKeySpec>) -> Self {
        Self {
            join_keys,
            validate_duplicates: true,
            ..Self::default()
        }
    }

    pub fn key_columns(&self) -> Vec<String> {
        self.join_keys.iter().map(|k| k.target.clone()).collect()
    }
}

/// Output of one comparison run.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub merged: MergedDataset,
    pub summary: ComparisonSummary,
    /// `None` when duplicate validation was disabled.
    pub duplicates: Option<DuplicateCheck>,
    pub original_keys: OriginalKeyColumns,
    /// Post-transform schemas, as joined.
    pub source1_columns: Vec<String>,
    pub source2_columns: Vec<String>,
    pub metrics: RunMetrics,
}

/// Run the full pipeline: mapping, key transforms, duplicate check, outer join,
/// field comparison and summary.
pub fn compare(
    mut source1: Dataset,
    mut source2: Dataset,
    options: &CompareOptions,
) -> Result<Comparison, ReconError> {
    let started = Instant::now();
    let key_columns = options.key_columns();

    if options.abs_tol.is_some() || options.rel_tol.is_some() {
        warn!("abs_tol/rel_tol are accepted but not applied; use per-field tolerance");
    }

    apply_column_mapping(&mut source1, &options.column_mapping);

    let declared = options.fields.as_deref().filter(|fields| !fields.is_empty());
    let pipeline = KeyTransformPipeline::new(&options.join_keys, declared);
    let original_keys = pipeline.apply(&mut source1, &mut source2)?;

    key_indices(&source1, &key_columns, Side::Source1)?;
    key_indices(&source2, &key_columns, Side::Source2)?;

    let duplicates = if options.validate_duplicates {
        Some(validate_duplicates(&source1, &source2, &key_columns)?)
    } else {
        None
    };

    let mut merged = full_outer_join(&source1, &source2, &key_columns)?;

    let fields = resolve_fields(declared, source1.columns(), &key_columns);
    compare_fields(&mut merged, &fields, &options.tolerances)?;

    let summary = summarize(&merged);
    info!(
        total = summary.total_rows,
        equal = summary.equal_rows,
        different = summary.different_rows,
        "comparison complete"
    );
    info!(
        in_both = summary.in_both,
        only_in_source1 = summary.only_in_source1,
        only_in_source2 = summary.only_in_source2,
        "merge status"
    );

    let metrics = RunMetrics {
        source1_rows: source1.len(),
        source2_rows: source2.len(),
        merged_rows: merged.len(),
        merged_cells: merged.len() * merged.header().len(),
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
    };

    Ok(Comparison {
        merged,
        summary,
        duplicates,
        original_keys,
        source1_columns: source1.columns().to_vec(),
        source2_columns: source2.columns().to_vec(),
        metrics,
    })
}

// ---------------------------------------------------------------------------
// Data collectors
// ---------------------------------------------------------------------------

/// A collector that yields one dataset per run.
///
/// The core never owns a collector's resources; [`fetch_and_compare`] calls
/// `close` on both collectors whatever the outcome.
pub trait TabularSource {
    type Error;

    fn name(&self) -> &str;

    fn fetch(&mut self) -> Result<Dataset, Self::Error>;

    fn close(&mut self) {}
}

/// Fetch both datasets and compare them. Collector errors pass through unchanged.
pub fn fetch_and_compare<S1, S2, E>(
    source1: &mut S1,
    source2: &mut S2,
    options: &CompareOptions,
) -> Result<Comparison, E>
where
    S1: TabularSource<Error = E>,
    S2: TabularSource<Error = E>,
    E: From<ReconError>,
{
    let started = Instant::now();
    let outcome = fetch_both(source1, source2)
        .and_then(|(d1, d2)| compare(d1, d2, options).map_err(E::from));
    source1.close();
    source2.close();

    outcome.map(|mut comparison| {
        comparison.metrics.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        comparison
    })
}

fn fetch_both<S1, S2, E>(source1: &mut S1, source2: &mut S2) -> Result<(Dataset, Dataset), E>
where
    S1: TabularSource<Error = E>,
    S2: TabularSource<Error = E>,
{
    info!(source = source1.name(), "fetching");
    let d1 = source1.fetch()?;
    info!(source = source1.name(), rows = d1.len(), columns = ?d1.columns(), "fetched");

    info!(source = source2.name(), "fetching");
    let d2 = source2.fetch()?;
    info!(source = source2.name(), rows = d2.len(), columns = ?d2.columns(), "fetched");
    Ok((d1, d2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct Fixed {
        name: &'static str,
        data: Option<Dataset>,
        closed: bool,
    }

    #[derive(Debug, PartialEq)]
    enum TestError {
        Unavailable(&'static str),
        Recon(String),
    }

    impl From<ReconError> for TestError {
        fn from(e: ReconError) -> Self {
            TestError::Recon(e.to_string())
        }
    }

    impl TabularSource for Fixed {
        type Error = TestError;

        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&mut self) -> Result<Dataset, TestError> {
            self.data.take().ok_or(TestError::Unavailable(self.name))
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn ids(ids: &[i64]) -> Dataset {
        Dataset::from_rows(["id"], ids.iter().map(|&i| vec![Value::Int(i)]).collect()).unwrap()
    }

    #[test]
    fn closes_both_on_fetch_failure() {
        let mut s1 = Fixed { name: "a", data: Some(ids(&[1])), closed: false };
        let mut s2 = Fixed { name: "b", data: None, closed: false };
        let opts = CompareOptions::new(vec![JoinKeySpec::new("id")]);

        let err = fetch_and_compare(&mut s1, &mut s2, &opts).unwrap_err();
        assert_eq!(err, TestError::Unavailable("b"));
        assert!(s1.closed && s2.closed);
    }

    #[test]
    fn core_errors_convert_into_collector_error() {
        let mut s1 = Fixed { name: "a", data: Some(ids(&[1])), closed: false };
        let mut s2 = Fixed { name: "b", data: Some(ids(&[1])), closed: false };
        let opts = CompareOptions::new(vec![JoinKeySpec::new("code")]);

        let err = fetch_and_compare(&mut s1, &mut s2, &opts).unwrap_err();
        assert!(matches!(err, TestError::Recon(ref msg) if msg.contains("code")));
        assert!(s1.closed && s2.closed);
    }

    #[test]
    fn key_only_datasets_are_equal_when_present_in_both() {
        let opts = CompareOptions::new(vec![JoinKeySpec::new("id")]);
        let result = compare(ids(&[1, 2]), ids(&[2, 3]), &opts).unwrap();
        assert!(result.merged.compared_fields.is_empty());
        // No compared fields: every row is vacuously equal.
        assert_eq!(result.summary.equal_rows, 3);
        assert_eq!(result.summary.in_both, 1);
    }

    fn id_val(rows: &[(i64, i64)]) -> Dataset {
        Dataset::from_rows(
            ["id", "val"],
            rows.iter().map(|&(id, val)| vec![Value::Int(id), Value::Int(val)]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn empty_field_list_compares_every_field() {
        let s1 = id_val(&[(1, 10), (2, 20), (3, 30)]);
        let s2 = id_val(&[(1, 10), (2, 21), (4, 40)]);
        let mut opts = CompareOptions::new(vec![JoinKeySpec::new("id")]);
        opts.fields = Some(vec![]);

        let result = compare(s1, s2, &opts).unwrap();
        assert_eq!(result.merged.compared_fields, ["val"]);
        assert_eq!(result.summary.total_rows, 4);
        assert_eq!(result.summary.equal_rows, 1);
        assert_eq!(result.summary.match_percentage, 25.0);
    }

    #[test]
    fn missing_join_key_fails_fast() {
        let opts = CompareOptions::new(vec![JoinKeySpec::new("code")]);
        let err = compare(ids(&[1]), ids(&[1]), &opts).unwrap_err();
        assert!(matches!(err, ReconError::MissingKeyColumn { side: Side::Source1, .. }));
    }
}
