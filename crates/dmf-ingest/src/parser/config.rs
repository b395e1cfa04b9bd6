//! # Fitting Configuration Parser
//!
//! Reads `sbf_c:*` properties from a SorbentFit configuration file.
//! Values sit on the line after their heading or label:
//!
//! ```text
//! # timestep (s) | relative convergence tolerance | absolute convergence tolerance
//! 0.5 1e-4 1e-6
//! # dry case bounds
//! # reaction enthalpy (J/mol)
//! -70000 -50000
//! ```
//!
//! Headings match case-insensitively by containment. Absent headings are
//! skipped. Bounded quantities hold either one value (low = high) or a
//! `low high` pair.

use dmf_core::{ParseError, PropertyMap, PropertyValue};

use super::{find_line, line_at, parse_f64, parse_i64, text, PropertyParser};

const TOLERANCE_HEADING: &str =
    "# timestep (s) | relative convergence tolerance | absolute convergence tolerance";
const PRESSURE_HEADING: &str = "# atmospheric pressure of data (Pa) | sorbent density (kg/m^3)";
const PSO_LABEL: &str = "number of PSO agents per CPU node";

const REACTION_QUANTITIES: [(&str, &str); 4] = [
    ("reaction enthalpy", "ReactionEnthalpy"),
    ("reaction entropy", "ReactionEntropy"),
    ("activation enthalpy", "ActivationEnthalpy"),
    ("base-10 logarithm of preexponential factor", "PreexponentialFactor"),
];

const ADSORPTION_SITES: (&str, &str) = (
    "number of active adsorption sites for unit volume",
    "NumberActiveAdsorpSites",
);

/// A `# ... case bounds` section and the property-name prefix of its
/// quantities.
struct CaseSection {
    heading: &'static str,
    prefix: &'static str,
    adsorption_sites: bool,
}

const CASE_SECTIONS: [CaseSection; 3] = [
    CaseSection {
        heading: "# dry case bounds",
        prefix: "Dry",
        adsorption_sites: false,
    },
    CaseSection {
        heading: "# Wat (Water) Case Bounds",
        prefix: "Wat",
        adsorption_sites: true,
    },
    CaseSection {
        heading: "# humid case bounds",
        prefix: "Humid",
        adsorption_sites: false,
    },
];

/// Parser for [`MetadataType::Config`](dmf_core::MetadataType::Config).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigParser;

impl PropertyParser for ConfigParser {
    fn parse(&self, content: &[u8]) -> Result<PropertyMap, ParseError> {
        let lines: Vec<&str> = text(content)?.lines().collect();
        let mut props = PropertyMap::new();

        if let Some(i) = find_line(&lines, 0, TOLERANCE_HEADING) {
            let [timestep, relative, absolute] = fixed_values::<3>(&lines, i + 1, "tolerance values")?;
            insert(&mut props, "Timestep", timestep);
            insert(&mut props, "RelativeTolerance", relative);
            insert(&mut props, "AbsoluteTolerance", absolute);
        }

        if let Some(i) = find_line(&lines, 0, PRESSURE_HEADING) {
            let [pressure, density] = fixed_values::<2>(&lines, i + 1, "pressure and density")?;
            insert(&mut props, "AtmosphericPressure", pressure);
            insert(&mut props, "SorbentDensity", density);
        }

        for section in &CASE_SECTIONS {
            let Some(start) = find_line(&lines, 0, section.heading) else {
                continue;
            };
            let extra = section.adsorption_sites.then_some(ADSORPTION_SITES);
            for (label, name) in REACTION_QUANTITIES.iter().copied().chain(extra) {
                let Some(i) = find_line(&lines, start, label) else {
                    continue;
                };
                let (low, high) = bounds(&lines, i + 1, label)?;
                insert(&mut props, &format!("{}{name}Low", section.prefix), low);
                insert(&mut props, &format!("{}{name}High", section.prefix), high);
            }
        }

        if let Some(i) = find_line(&lines, 0, PSO_LABEL) {
            let line = line_at(&lines, i + 1, PSO_LABEL)?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let [count] = tokens.as_slice() else {
                return Err(malformed(i + 1, PSO_LABEL, 1, tokens.len()));
            };
            props.insert(
                "sbf_c:NumberOfPSO".into(),
                PropertyValue::Integer(parse_i64(i + 1, count)?),
            );
        }

        Ok(props)
    }
}

fn insert(props: &mut PropertyMap, name: &str, value: f64) {
    props.insert(format!("sbf_c:{name}"), PropertyValue::Decimal(value));
}

fn fixed_values<const N: usize>(lines: &[&str], index: usize, what: &str) -> Result<[f64; N], ParseError> {
    let line = line_at(lines, index, what)?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != N {
        return Err(malformed(index, what, N, tokens.len()));
    }
    let mut values = [0.0; N];
    for (slot, token) in values.iter_mut().zip(&tokens) {
        *slot = parse_f64(index, token)?;
    }
    Ok(values)
}

fn bounds(lines: &[&str], index: usize, what: &str) -> Result<(f64, f64), ParseError> {
    let line = line_at(lines, index, what)?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [only] => {
            let v = parse_f64(index, only)?;
            Ok((v, v))
        }
        [low, high] => Ok((parse_f64(index, low)?, parse_f64(index, high)?)),
        _ => Err(ParseError::MalformedLine {
            line: index + 1,
            reason: format!("{what}: expected 1 or 2 values, found {}", tokens.len()),
        }),
    }
}

fn malformed(index: usize, what: &str, expected: usize, found: usize) -> ParseError {
    ParseError::MalformedLine {
        line: index + 1,
        reason: format!("{what}: expected {expected} values, found {found}"),
    }
}
