//! # Results Data Parser
//!
//! Summarises a SorbentFit results table into `sbf_d:*` properties. The
//! first line is a header. Every data row has six columns: CO2 pressure,
//! H2O pressure, temperature, time, and two more not summarised here.
//! Columns are tab-separated when the first data row contains a tab,
//! otherwise whitespace-separated.

use dmf_core::{ParseError, PropertyMap, PropertyValue};

use super::{parse_f64, text, PropertyParser};

const COLUMNS: usize = 6;

/// Parser for [`MetadataType::ResultsData`](dmf_core::MetadataType::ResultsData).
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsParser;

#[derive(Debug, Clone, Copy)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn new(v: f64) -> Self {
        Self { min: v, max: v }
    }

    fn include(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }
}

impl PropertyParser for ResultsParser {
    fn parse(&self, content: &[u8]) -> Result<PropertyMap, ParseError> {
        let rows: Vec<(usize, &str)> = text(content)?
            .lines()
            .enumerate()
            .skip(1)
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();
        let Some(&(_, first_row)) = rows.first() else {
            return Err(ParseError::Missing {
                what: "results data rows".into(),
            });
        };
        let tab_separated = first_row.contains('\t');

        let mut co2: Option<Range> = None;
        let mut h2o: Option<Range> = None;
        let mut temperature: Option<Range> = None;
        let mut times = Vec::with_capacity(rows.len());

        for &(index, line) in &rows {
            let fields: Vec<&str> = if tab_separated {
                line.split('\t').collect()
            } else {
                line.split_whitespace().collect()
            };
            if fields.len() != COLUMNS {
                return Err(ParseError::MalformedLine {
                    line: index + 1,
                    reason: format!("expected {COLUMNS} columns, found {}", fields.len()),
                });
            }
            for (range, field) in [(&mut co2, fields[0]), (&mut h2o, fields[1]), (&mut temperature, fields[2])] {
                let v = parse_f64(index, field)?;
                match range {
                    Some(r) => r.include(v),
                    None => *range = Some(Range::new(v)),
                }
            }
            times.push(parse_f64(index, fields[3])?);
        }

        let mut props = PropertyMap::new();
        for (name, range) in [("CO2Pressure", co2), ("H2OPressure", h2o), ("Temperature", temperature)] {
            if let Some(r) = range {
                props.insert(format!("sbf_d:{name}Min"), PropertyValue::Decimal(r.min));
                props.insert(format!("sbf_d:{name}Max"), PropertyValue::Decimal(r.max));
            }
        }

        let (time_step, duration) = match (times.first(), times.get(1), times.last()) {
            (Some(first), Some(second), Some(last)) => (second - first, last - first),
            (Some(only), _, _) => (*only, *only),
            _ => {
                return Err(ParseError::Missing {
                    what: "results data rows".into(),
                })
            }
        };
        props.insert("sbf_d:TimeStep".into(), PropertyValue::Decimal(time_step));
        props.insert("sbf_d:TimeDuration".into(), PropertyValue::Decimal(duration));
        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(props: &PropertyMap, name: &str) -> f64 {
        props
            .get(name)
            .and_then(PropertyValue::as_f64)
            .unwrap_or_else(|| panic!("missing {name}"))
    }

    #[test]
    fn test_summarises_space_separated_rows() {
        let content = "\
co2 h2o temp time weight fraction
10 1 300 0 0.1 0.2
12 0.5 310 5 0.1 0.3
8 2 305 15 0.1 0.4
";
        let props = ResultsParser.parse(content.as_bytes()).unwrap();
        assert_eq!(decimal(&props, "sbf_d:CO2PressureMin"), 8.0);
        assert_eq!(decimal(&props, "sbf_d:CO2PressureMax"), 12.0);
        assert_eq!(decimal(&props, "sbf_d:H2OPressureMin"), 0.5);
        assert_eq!(decimal(&props, "sbf_d:H2OPressureMax"), 2.0);
        assert_eq!(decimal(&props, "sbf_d:TemperatureMin"), 300.0);
        assert_eq!(decimal(&props, "sbf_d:TemperatureMax"), 310.0);
        assert_eq!(decimal(&props, "sbf_d:TimeStep"), 5.0);
        assert_eq!(decimal(&props, "sbf_d:TimeDuration"), 15.0);
    }

    #[test]
    fn test_two_rows_give_duration_between_them() {
        let content = "header\n1 1 1 2 0 0\n1 1 1 7 0 0\n";
        let props = ResultsParser.parse(content.as_bytes()).unwrap();
        assert_eq!(decimal(&props, "sbf_d:TimeStep"), 5.0);
        assert_eq!(decimal(&props, "sbf_d:TimeDuration"), 5.0);
    }

    #[test]
    fn test_single_row_uses_its_own_time() {
        let content = "header\n1\t2\t3\t42\t0\t0\n";
        let props = ResultsParser.parse(content.as_bytes()).unwrap();
        assert_eq!(decimal(&props, "sbf_d:TimeStep"), 42.0);
        assert_eq!(decimal(&props, "sbf_d:TimeDuration"), 42.0);
    }

    #[test]
    fn test_tab_separated_rows_keep_empty_fields() {
        let content = "header\n1\t2\t3\t4\t\t6\n";
        assert!(ResultsParser.parse(content.as_bytes()).is_ok());
        let content = "header\n1\t2\t3\t4\t6\n";
        assert!(matches!(
            ResultsParser.parse(content.as_bytes()),
            Err(ParseError::MalformedLine { line: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_row_names_its_line() {
        let content = "header\n1 2 3 4 5 6\n\n1 2 3 4 5\n";
        assert_eq!(
            ResultsParser.parse(content.as_bytes()),
            Err(ParseError::MalformedLine {
                line: 4,
                reason: "expected 6 columns, found 5".into()
            })
        );
    }

    #[test]
    fn test_header_only_is_missing_rows() {
        assert!(matches!(
            ResultsParser.parse(b"co2 h2o temp time a b\n"),
            Err(ParseError::Missing { .. })
        ));
    }
}
