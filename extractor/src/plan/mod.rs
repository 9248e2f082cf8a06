//! Extraction plan definition
//!
//! The plan describes, as data, which sheets each extraction pass reads and
//! how their block headers are laid out. New header conventions are added by
//! editing the plan JSON, not the code.
//!
//! ```json
//! {
//!   "passes": [{
//!     "name": "multiheader",
//!     "sheet_pattern": "^Table [1-2] [MQA]$",
//!     "header": { "convention": "labelled", "max_rows": 5, "data_offset": "label_count" }
//!   }]
//! }
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::{PlanError, PlanResult};

/// Semantic fields a header row can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderField {
    TimePeriodDescription,
    AggSicCode,
    DatasetCode,
    #[serde(rename = "sales_in_2022")]
    Sales,
    PercentageWeight,
    AverageSales2022,
}

impl HeaderField {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderField::TimePeriodDescription => "time_period_description",
            HeaderField::AggSicCode => "agg_sic_code",
            HeaderField::DatasetCode => "dataset_code",
            HeaderField::Sales => "sales_in_2022",
            HeaderField::PercentageWeight => "percentage_weight",
            HeaderField::AverageSales2022 => "average_sales_2022",
        }
    }
}

/// Field name → lowercase substrings that identify its header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDictionary(pub BTreeMap<HeaderField, Vec<String>>);

impl LabelDictionary {
    /// Fields whose labels occur in `leading_cell` (case-insensitive).
    pub fn matches<'a>(&'a self, leading_cell: &'a str) -> impl Iterator<Item = HeaderField> + 'a {
        let cell = leading_cell.trim().to_lowercase();
        self.0.iter().filter_map(move |(field, labels)| {
            labels
                .iter()
                .any(|label| cell.contains(&label.to_lowercase()))
                .then_some(*field)
        })
    }

    /// Labels for tables keyed by dataset identifier with an optional
    /// average weekly sales row.
    pub fn average_sales() -> Self {
        let mut map = BTreeMap::new();
        map.insert(HeaderField::TimePeriodDescription, vec!["time period".to_string()]);
        map.insert(
            HeaderField::DatasetCode,
            vec!["dataset identifier code".to_string()],
        );
        map.insert(
            HeaderField::AverageSales2022,
            vec!["average weekly sales".to_string()],
        );
        Self(map)
    }
}

impl Default for LabelDictionary {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert(HeaderField::TimePeriodDescription, vec!["time period".to_string()]);
        map.insert(HeaderField::Sales, vec!["sales in 2022".to_string()]);
        map.insert(
            HeaderField::AggSicCode,
            vec!["agg/sic".to_string(), "agg/sic code".to_string()],
        );
        map.insert(HeaderField::PercentageWeight, vec!["percentage weight".to_string()]);
        map.insert(
            HeaderField::DatasetCode,
            vec!["dataset identifier code".to_string()],
        );
        Self(map)
    }
}

/// Where data rows start for a label-scanned header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataOffset {
    /// One past the highest matched header row.
    AfterLastMatch,
    /// As many rows as fields were matched.
    #[default]
    LabelCount,
    /// A fixed number of header rows.
    Rows(usize),
}

/// How a block's header rows are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "convention", rename_all = "snake_case")]
pub enum HeaderConvention {
    /// Row `k` of the block always carries `rows[k]`.
    Fixed { rows: Vec<HeaderField> },
    /// Each leading cell is matched against the label dictionary.
    Labelled {
        #[serde(default = "default_max_rows")]
        max_rows: usize,
        #[serde(default)]
        data_offset: DataOffset,
    },
}

fn default_max_rows() -> usize {
    5
}

/// Where a column's reconciliation code comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeSource {
    /// Read from the header row labelled as the code.
    #[default]
    Header,
    /// Derived from an earlier pass by description, plus a size suffix.
    DescriptionLookup {
        reference_pass: String,
        #[serde(default)]
        suffixes: BTreeMap<String, String>,
    },
    /// No code in the header; columns are keyed by dataset identifier and
    /// records get their code from the backfill.
    Backfill,
}

impl CodeSource {
    /// The header field whose presence makes a column a data column.
    pub fn key_field(&self) -> HeaderField {
        match self {
            CodeSource::Header => HeaderField::AggSicCode,
            CodeSource::DescriptionLookup { .. } => HeaderField::TimePeriodDescription,
            CodeSource::Backfill => HeaderField::DatasetCode,
        }
    }
}

/// One extraction pass over the sheets matching `sheet_pattern`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSpec {
    pub name: String,
    pub sheet_pattern: String,
    pub header: HeaderConvention,
    #[serde(default)]
    pub labels: LabelDictionary,
    #[serde(default)]
    pub code_source: CodeSource,
}

impl PassSpec {
    pub fn sheet_regex(&self) -> PlanResult<Regex> {
        Regex::new(&self.sheet_pattern).map_err(|e| PlanError::InvalidPattern {
            pass: self.name.clone(),
            message: e.to_string(),
        })
    }

    /// Sheet names this pass reads, in workbook order.
    pub fn matching_sheets<'a>(&self, sheet_names: &'a [String]) -> PlanResult<Vec<&'a str>> {
        let re = self.sheet_regex()?;
        Ok(sheet_names
            .iter()
            .filter(|name| re.is_match(name))
            .map(String::as_str)
            .collect())
    }
}

/// A single-header table melted into one record per category and column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTableSpec {
    pub name: String,
    pub sheet_pattern: String,
    /// Header cell naming the category column (case-insensitive substring).
    pub key_label: String,
    /// Footnote → note text, e.g. `C` → `Confidential`.
    #[serde(default)]
    pub note_labels: BTreeMap<String, String>,
}

impl CategoryTableSpec {
    pub fn sheet_regex(&self) -> PlanResult<Regex> {
        Regex::new(&self.sheet_pattern).map_err(|e| PlanError::InvalidPattern {
            pass: self.name.clone(),
            message: e.to_string(),
        })
    }
}

/// The complete extraction plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPlan {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    pub passes: Vec<PassSpec>,

    #[serde(default)]
    pub category_tables: Vec<CategoryTableSpec>,

    /// Sheet holding the worksheet number/description listing.
    #[serde(default)]
    pub contents_sheet: Option<String>,

    /// Sheet holding the note number/text listing.
    #[serde(default)]
    pub notes_sheet: Option<String>,

    /// Table names whose records are dropped from the final dataset.
    #[serde(default)]
    pub excluded_tables: Vec<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl ExtractionPlan {
    pub fn from_json(json: &str) -> PlanResult<Self> {
        let plan: Self = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn from_file(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check patterns, names, lookup ordering and key fields.
    pub fn validate(&self) -> PlanResult<()> {
        let mut seen = HashSet::new();

        for pass in &self.passes {
            pass.sheet_regex()?;

            if let CodeSource::DescriptionLookup { reference_pass, .. } = &pass.code_source {
                if !seen.contains(reference_pass.as_str()) {
                    return Err(PlanError::UnknownReferencePass {
                        pass: pass.name.clone(),
                        reference: reference_pass.clone(),
                    });
                }
            }

            if !seen.insert(pass.name.as_str()) {
                return Err(PlanError::DuplicatePass(pass.name.clone()));
            }

            let key = pass.code_source.key_field();
            let key_reachable = match &pass.header {
                HeaderConvention::Fixed { rows } => rows.contains(&key),
                HeaderConvention::Labelled { max_rows, .. } => {
                    *max_rows > 0 && pass.labels.0.get(&key).is_some_and(|l| !l.is_empty())
                }
            };
            if !key_reachable {
                return Err(PlanError::InvalidHeader {
                    pass: pass.name.clone(),
                    message: format!("header never yields key field '{}'", key.as_str()),
                });
            }
        }

        for table in &self.category_tables {
            table.sheet_regex()?;
            if !seen.insert(table.name.as_str()) {
                return Err(PlanError::DuplicatePass(table.name.clone()));
            }
        }

        Ok(())
    }

    pub fn pass(&self, name: &str) -> Option<&PassSpec> {
        self.passes.iter().find(|p| p.name == name)
    }

    /// Plan matching the Retail Sales Index main reference tables workbook.
    pub fn rsi_default() -> Self {
        let mut suffixes = BTreeMap::new();
        suffixes.insert("all businesses".to_string(), "-AB".to_string());
        suffixes.insert("large businesses".to_string(), "-LB".to_string());
        suffixes.insert("small businesses".to_string(), "-SB".to_string());

        let mut note_labels = BTreeMap::new();
        note_labels.insert("C".to_string(), "Confidential".to_string());

        Self {
            version: default_version(),
            description: "Retail Sales Index main reference tables".to_string(),
            passes: vec![
                PassSpec {
                    name: "dual_table".to_string(),
                    sheet_pattern: "^(CPSA|CPSB|CPSC|KPSA[1-4]?|Table ID)".to_string(),
                    header: HeaderConvention::Fixed {
                        rows: vec![
                            HeaderField::TimePeriodDescription,
                            HeaderField::AggSicCode,
                            HeaderField::DatasetCode,
                        ],
                    },
                    labels: LabelDictionary::default(),
                    code_source: CodeSource::Header,
                },
                PassSpec {
                    name: "multiheader".to_string(),
                    sheet_pattern: "^Table [1-2] [MQA]$".to_string(),
                    header: HeaderConvention::Labelled {
                        max_rows: 5,
                        data_offset: DataOffset::LabelCount,
                    },
                    labels: LabelDictionary::default(),
                    code_source: CodeSource::Header,
                },
                PassSpec {
                    name: "table_3_4".to_string(),
                    sheet_pattern: "^Table [34] [MQA]$".to_string(),
                    header: HeaderConvention::Labelled {
                        max_rows: 3,
                        data_offset: DataOffset::Rows(3),
                    },
                    labels: LabelDictionary::default(),
                    code_source: CodeSource::DescriptionLookup {
                        reference_pass: "multiheader".to_string(),
                        suffixes,
                    },
                },
                PassSpec {
                    name: "table_5".to_string(),
                    sheet_pattern: "^Table 5".to_string(),
                    header: HeaderConvention::Labelled {
                        max_rows: 3,
                        data_offset: DataOffset::Rows(3),
                    },
                    labels: LabelDictionary::average_sales(),
                    code_source: CodeSource::Backfill,
                },
            ],
            category_tables: vec![CategoryTableSpec {
                name: "table_6".to_string(),
                sheet_pattern: "^Table 6".to_string(),
                key_label: "business type".to_string(),
                note_labels,
            }],
            contents_sheet: Some("Contents".to_string()),
            notes_sheet: Some("Notes".to_string()),
            excluded_tables: vec![
                "Some cells in this table are empty because data was not collected for these variables at these time points."
                    .to_string(),
            ],
        }
    }
}

impl Default for ExtractionPlan {
    fn default() -> Self {
        Self::rsi_default()
    }
}
