/// Labeled flood dataset reader.
///
/// Format: comma-separated text with a header row.
/// - Header names are matched exactly; column order is irrelevant.
/// - `risk` holds the string label; every schema feature must be present.
/// - Columns outside the schema are ignored with a warning, never used as
///   features.
/// - A repeated header is an error only for `risk` or a schema feature;
///   other repeats are ignored along with their column.
/// - Blank lines are skipped. Cells may be wrapped in double quotes, in
///   which case commas are literal and `""` stands for one quote.
///
/// This is the only input the trainer reads from disk.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::model::{FeatureSchema, RiskError, LABEL_COLUMN};

/// Feature vectors and labels read against a fixed schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub schema: FeatureSchema,
    /// One schema-ordered vector per row.
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<String>,
    /// Header names that were present but not in the schema.
    pub ignored_columns: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Reads and parses the dataset at `path`.
pub fn load_dataset(path: &Path, schema: &FeatureSchema) -> Result<Dataset, RiskError> {
    let text = fs::read_to_string(path).map_err(|e| RiskError::from_io(path, e))?;
    let dataset = parse_csv(&text, schema)?;

    log::info!(
        "Loaded {} rows from {} ({} features)",
        dataset.len(),
        path.display(),
        schema.len()
    );
    for column in &dataset.ignored_columns {
        log::warn!(
            "Column '{}' in {} is not a known feature and will be ignored",
            column,
            path.display()
        );
    }

    Ok(dataset)
}

/// Parses dataset text already in memory.
///
/// Column checks run before any row is parsed, so a missing `risk` column is
/// reported even when the body is empty.
pub fn parse_csv(text: &str, schema: &FeatureSchema) -> Result<Dataset, RiskError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    // First non-empty line: column headers
    let (header_idx, header_line) = lines
        .next()
        .ok_or_else(|| RiskError::InsufficientData("dataset is empty".to_string()))?;
    let headers = split_fields(header_line, header_idx + 1)?;

    // Build column index map; first occurrence wins for ignored columns
    let mut col_map: HashMap<&str, usize> = HashMap::new();
    let mut ignored_columns: Vec<String> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        let header = header.as_str();
        let known = header == LABEL_COLUMN || schema.contains(header);
        if col_map.contains_key(header) {
            if known {
                return Err(RiskError::Schema(format!("duplicate column '{}'", header)));
            }
            log::warn!("Duplicate column '{}' at position {} is ignored", header, idx + 1);
            continue;
        }
        col_map.insert(header, idx);
        if !known {
            ignored_columns.push(header.to_string());
        }
    }

    let label_idx = *col_map.get(LABEL_COLUMN).ok_or_else(|| {
        RiskError::Schema(format!(
            "missing label column '{}' (found: {:?})",
            LABEL_COLUMN, headers
        ))
    })?;

    let feature_idx: Vec<usize> = schema
        .features
        .iter()
        .map(|name| {
            col_map.get(name.as_str()).copied().ok_or_else(|| {
                RiskError::Schema(format!("missing feature column '{}'", name))
            })
        })
        .collect::<Result<_, _>>()?;

    // Parse data rows
    let mut features = Vec::new();
    let mut labels = Vec::new();
    for (line_idx, line) in lines {
        let line_no = line_idx + 1;
        let fields = split_fields(line, line_no)?;
        if fields.len() != headers.len() {
            return Err(RiskError::Parse(format!(
                "line {}: expected {} fields, found {}",
                line_no,
                headers.len(),
                fields.len()
            )));
        }

        let row = feature_idx
            .iter()
            .zip(&schema.features)
            .map(|(&idx, name)| {
                fields[idx].parse::<f64>().map_err(|_| {
                    RiskError::Parse(format!(
                        "line {}: column '{}' value '{}' is not a number",
                        line_no, name, fields[idx]
                    ))
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let label = &fields[label_idx];
        if label.is_empty() {
            return Err(RiskError::Parse(format!("line {}: empty '{}' label", line_no, LABEL_COLUMN)));
        }

        features.push(row);
        labels.push(label.clone());
    }

    Ok(Dataset {
        schema: schema.clone(),
        features,
        labels,
        ignored_columns,
    })
}

/// Splits one line on commas outside double quotes.
///
/// Unquoted cells are trimmed. A quoted cell keeps its inner text as written,
/// with `""` unescaped to `"`.
fn split_fields(line: &str, line_no: usize) -> Result<Vec<String>, RiskError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            ',' => {
                fields.push(finish_field(&field, quoted));
                field.clear();
                quoted = false;
            }
            '"' if !quoted && field.trim().is_empty() => {
                field.clear();
                quoted = true;
                in_quotes = true;
            }
            // Whitespace between a closing quote and the next comma
            c if quoted && c.is_whitespace() => {}
            '"' => {
                return Err(RiskError::Parse(format!(
                    "line {}: stray quote in field {}",
                    line_no,
                    fields.len() + 1
                )));
            }
            _ if quoted => {
                return Err(RiskError::Parse(format!(
                    "line {}: text after closing quote in field {}",
                    line_no,
                    fields.len() + 1
                )));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(RiskError::Parse(format!(
            "line {}: unterminated quote in field {}",
            line_no,
            fields.len() + 1
        )));
    }
    fields.push(finish_field(&field, quoted));
    Ok(fields)
}

fn finish_field(field: &str, quoted: bool) -> String {
    if quoted {
        field.to_string()
    } else {
        field.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_CSV: &str = "\
rainfall,water_level,elevation,soil_moisture,river_distance,risk
22.8,0.53,190.7,12.5,9.89,Low
68.3,1.6,80.6,36.1,3.45,Medium

96.3,3.27,28.3,88.9,0.4,High
";

    #[test]
    fn test_parse_csv_basic() {
        let dataset = parse_csv(SMALL_CSV, &FeatureSchema::flood_v1()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.labels, vec!["Low", "Medium", "High"]);
        assert_eq!(dataset.features[2], vec![96.3, 3.27, 28.3, 88.9, 0.4]);
        assert!(dataset.ignored_columns.is_empty());
    }

    #[test]
    fn test_column_order_is_irrelevant() {
        let csv = "\
risk,river_distance,soil_moisture,elevation,water_level,rainfall
High,0.4,88.9,28.3,3.27,96.3
";
        let dataset = parse_csv(csv, &FeatureSchema::flood_v1()).unwrap();
        assert_eq!(dataset.features[0], vec![96.3, 3.27, 28.3, 88.9, 0.4]);
    }

    #[test]
    fn test_missing_label_column_is_schema_error() {
        let csv = SMALL_CSV.replacen("risk", "risk_level", 1);
        match parse_csv(&csv, &FeatureSchema::flood_v1()) {
            Err(RiskError::Schema(msg)) => assert!(msg.contains("risk")),
            other => panic!("expected SchemaError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_feature_column_is_schema_error() {
        let csv = SMALL_CSV.replacen("soil_moisture", "moisture", 1);
        match parse_csv(&csv, &FeatureSchema::flood_v1()) {
            Err(RiskError::Schema(msg)) => assert!(msg.contains("soil_moisture")),
            other => panic!("expected SchemaError, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_columns_are_ignored_not_absorbed() {
        let csv = "\
station,rainfall,water_level,elevation,soil_moisture,river_distance,risk
\"Peoria\",22.8,0.53,190.7,12.5,9.89,Low
";
        let dataset = parse_csv(csv, &FeatureSchema::flood_v1()).unwrap();
        assert_eq!(dataset.ignored_columns, vec!["station"]);
        assert_eq!(dataset.features[0].len(), 5);
    }

    #[test]
    fn test_quoted_extra_column_may_contain_commas() {
        let csv = "\
station,rainfall,water_level,elevation,soil_moisture,river_distance,risk
\"Peoria, IL\",22.8,0.53,190.7,12.5,9.89,Low
\"Havana, \"\"north\"\" gauge\",96.3,3.27,28.3,88.9,0.4,\"High\"
";
        let dataset = parse_csv(csv, &FeatureSchema::flood_v1()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.ignored_columns, vec!["station"]);
        assert_eq!(dataset.features[0], vec![22.8, 0.53, 190.7, 12.5, 9.89]);
        assert_eq!(dataset.labels, vec!["Low", "High"]);
    }

    #[test]
    fn test_split_fields_handles_quotes() {
        assert_eq!(split_fields("a, \"b,c\" ,d", 1).unwrap(), vec!["a", "b,c", "d"]);
        assert_eq!(split_fields("\"say \"\"hi\"\"\",x", 1).unwrap(), vec!["say \"hi\"", "x"]);
        assert_eq!(split_fields("a,,\"\"", 1).unwrap(), vec!["a", "", ""]);
    }

    #[test]
    fn test_malformed_quotes_are_parse_errors() {
        for line in ["\"open,1,2", "ab\"c,1", "\"done\"x,1"] {
            match split_fields(line, 4) {
                Err(RiskError::Parse(msg)) => assert!(msg.contains("line 4"), "{}", msg),
                other => panic!("expected ParseError for {:?}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_duplicate_extra_column_is_ignored() {
        let csv = "\
note,rainfall,water_level,elevation,soil_moisture,river_distance,risk,note
a,22.8,0.53,190.7,12.5,9.89,Low,b
";
        let dataset = parse_csv(csv, &FeatureSchema::flood_v1()).unwrap();
        assert_eq!(dataset.ignored_columns, vec!["note"]);
        assert_eq!(dataset.labels, vec!["Low"]);
    }

    #[test]
    fn test_duplicate_known_column_is_schema_error() {
        for dup in ["risk", "rainfall"] {
            let csv = format!(
                "rainfall,water_level,elevation,soil_moisture,river_distance,risk,{}\n1,1,1,1,1,Low,1\n",
                dup
            );
            match parse_csv(&csv, &FeatureSchema::flood_v1()) {
                Err(RiskError::Schema(msg)) => assert!(msg.contains(dup), "{}", msg),
                other => panic!("expected SchemaError for duplicate {}, got {:?}", dup, other),
            }
        }
    }

    #[test]
    fn test_non_numeric_feature_is_parse_error() {
        let csv = SMALL_CSV.replacen("68.3", "heavy", 1);
        match parse_csv(&csv, &FeatureSchema::flood_v1()) {
            Err(RiskError::Parse(msg)) => {
                assert!(msg.contains("line 3"), "message should name the line: {}", msg);
                assert!(msg.contains("rainfall"));
            }
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let csv = "\
rainfall,water_level,elevation,soil_moisture,river_distance,risk
22.8,0.53,190.7,12.5,Low
";
        assert!(matches!(
            parse_csv(csv, &FeatureSchema::flood_v1()),
            Err(RiskError::Parse(_))
        ));
    }

    #[test]
    fn test_header_only_dataset_is_empty() {
        let csv = "rainfall,water_level,elevation,soil_moisture,river_distance,risk\n";
        let dataset = parse_csv(csv, &FeatureSchema::flood_v1()).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_blank_file_is_insufficient() {
        assert!(matches!(
            parse_csv("\n\n", &FeatureSchema::flood_v1()),
            Err(RiskError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = load_dataset(
            Path::new("/nonexistent/flood_data.csv"),
            &FeatureSchema::flood_v1(),
        );
        assert!(matches!(result, Err(RiskError::NotFound(_))));
    }
}
