//! # Optimisation Output Parser
//!
//! Reads `sbf_o:*` properties from a SorbentFit optimisation summary:
//!
//! ```text
//! SorbentFit optimisation results
//! dh_kap1 | ds_kap1 | nv
//! 1 0.91 1.20
//! 2 0.52 0.88
//! The Final Parameters are as Follows:
//! [best] (-65000.0, -170.5, 2.1)
//! ```
//!
//! Line 2 names the fitted parameters. The last line after it that is
//! neither a `[...]` result line nor the "final parameters" banner holds
//! `iterations min-cost max-cost`, and a file without one is rejected. The final line's last parenthesised
//! tuple holds the fitted values, in parameter order.

use dmf_core::{ParseError, PropertyMap, PropertyValue};

use super::{line_at, parse_f64, parse_i64, text, PropertyParser};

const FINAL_BANNER: &str = "The Final Parameters are as Follows:";

/// Iteration rows start after the title and parameter-name lines.
const FIRST_ITERATION_LINE: usize = 2;

/// Parameters with a property in the content model.
pub const KNOWN_PARAMETERS: [&str; 13] = [
    "dh_kap1", "ds_kap1", "dh_k1", "zeta_k1", "dh_kaph", "ds_kaph", "dh_kh", "zeta_kh", "dh_kap2",
    "ds_kap2", "dh_k2", "zeta_k2", "nv",
];

/// Parser for [`MetadataType::Output`](dmf_core::MetadataType::Output).
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputParser;

impl PropertyParser for OutputParser {
    fn parse(&self, content: &[u8]) -> Result<PropertyMap, ParseError> {
        let mut lines: Vec<&str> = text(content)?.lines().collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        let mut props = PropertyMap::new();
        let header = line_at(&lines, 1, "parameter names")?.trim();
        let parameters: Vec<&str> = if header.is_empty() {
            Vec::new()
        } else {
            header.split('|').map(str::trim).collect()
        };
        props.insert(
            "sbf_o:NumberOfParams".into(),
            PropertyValue::Integer(parameters.len() as i64),
        );

        let (index, line) = lines
            .iter()
            .enumerate()
            .skip(FIRST_ITERATION_LINE)
            .rev()
            .find(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('[') && !line.eq_ignore_ascii_case(FINAL_BANNER)
            })
            .ok_or_else(|| ParseError::Missing {
                what: format!("iteration summary (line {} onwards)", FIRST_ITERATION_LINE + 1),
            })?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [iterations, min, max] = tokens.as_slice() else {
            return Err(ParseError::MalformedLine {
                line: index + 1,
                reason: format!(
                    "expected iterations, minimum and maximum cost, found {} values",
                    tokens.len()
                ),
            });
        };
        props.insert(
            "sbf_o:NumberOfIterations".into(),
            PropertyValue::Integer(parse_i64(index, iterations)?),
        );
        props.insert("sbf_o:CostMin".into(), PropertyValue::Decimal(parse_f64(index, min)?));
        props.insert("sbf_o:CostMax".into(), PropertyValue::Decimal(parse_f64(index, max)?));

        if parameters.is_empty() {
            return Ok(props);
        }

        let last = lines.len() - 1;
        let values = final_tuple(lines[last]).ok_or_else(|| ParseError::MalformedLine {
            line: last + 1,
            reason: "no parenthesised parameter values".into(),
        })?;
        let values: Vec<&str> = values.split(',').map(str::trim).collect();
        if values.len() > parameters.len() {
            return Err(ParseError::MalformedLine {
                line: last + 1,
                reason: format!(
                    "{} parameter values for {} parameter names",
                    values.len(),
                    parameters.len()
                ),
            });
        }
        for (name, value) in parameters.iter().zip(&values) {
            let Some(known) = KNOWN_PARAMETERS.iter().find(|k| k.eq_ignore_ascii_case(name)) else {
                tracing::debug!(parameter = %name, "ignoring unknown output parameter");
                continue;
            };
            props.insert(format!("sbf_o:{known}"), PropertyValue::Decimal(parse_f64(last, value)?));
        }
        Ok(props)
    }
}

/// Text between the line's last `(` and the `)` following it.
fn final_tuple(line: &str) -> Option<&str> {
    let open = line.rfind('(')?;
    let rest = &line[open + 1..];
    let close = rest.find(')')?;
    Some(&rest[..close])
}
