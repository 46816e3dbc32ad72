use std::collections::{BTreeMap, HashMap};

use ark_bn254::Fr;
use groth16::field::fr_from_decimal_reduced;
use serde_json::Value;

use crate::WitnessError;

/// Types that can be turned into the named inputs of a witness program.
pub trait ProofInput {
    /// Returns the values of every input signal, arrays flattened in row-major order.
    fn prepare_input(&self) -> HashMap<String, Vec<Fr>>;
}

impl ProofInput for HashMap<String, Vec<Fr>> {
    fn prepare_input(&self) -> HashMap<String, Vec<Fr>> {
        self.to_owned()
    }
}

impl ProofInput for BTreeMap<String, Vec<Fr>> {
    fn prepare_input(&self) -> HashMap<String, Vec<Fr>> {
        self.iter()
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect()
    }
}

impl ProofInput for HashMap<String, Fr> {
    fn prepare_input(&self) -> HashMap<String, Vec<Fr>> {
        self.iter()
            .map(|(name, value)| (name.clone(), vec![*value]))
            .collect()
    }
}

/// Parses prover inputs from a JSON object.
///
/// Every member maps a signal name to a value or a (nested) array of values. Values are
/// decimal strings or JSON integers, negative values and values above the modulus are
/// reduced mod p.
///
/// ```
/// # use g16_material::parse_inputs;
/// let inputs = parse_inputs(r#"{"x": "3", "path": [["1", 2], [3, "-1"]]}"#)?;
/// assert_eq!(inputs["path"].len(), 4);
/// # Ok::<(), g16_material::WitnessError>(())
/// ```
pub fn parse_inputs(json: &str) -> Result<HashMap<String, Vec<Fr>>, WitnessError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|err| WitnessError::MalformedInput(format!("invalid JSON: {err}")))?;
    let Value::Object(members) = value else {
        return Err(WitnessError::MalformedInput(
            "inputs must be a JSON object".to_owned(),
        ));
    };
    members
        .into_iter()
        .map(|(name, value)| {
            let mut values = Vec::new();
            flatten(&name, &value, &mut values)?;
            Ok((name, values))
        })
        .collect()
}

fn flatten(name: &str, value: &Value, out: &mut Vec<Fr>) -> Result<(), WitnessError> {
    let malformed = |what: &str| {
        WitnessError::MalformedInput(format!("signal `{name}`: {what}"))
    };
    match value {
        Value::Array(values) => {
            for value in values {
                flatten(name, value, out)?;
            }
        }
        Value::String(s) => {
            let value = fr_from_decimal_reduced(s.trim())
                .map_err(|_| malformed(&format!("`{s}` is not an integer")))?;
            out.push(value);
        }
        // floats and integers beyond 64 bits lose precision in JSON numbers
        Value::Number(number) => {
            let value = if let Some(v) = number.as_u64() {
                Fr::from(v)
            } else if let Some(v) = number.as_i64() {
                Fr::from(v)
            } else {
                return Err(malformed(&format!(
                    "{number} is not exact, pass it as a decimal string"
                )));
            };
            out.push(value);
        }
        Value::Null | Value::Bool(_) | Value::Object(_) => {
            return Err(malformed("expected a number, a decimal string or an array"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{One, PrimeField};

    #[test]
    fn scalars_arrays_and_nesting() {
        let inputs = parse_inputs(r#"{"a": "5", "b": [1, "2"], "c": [[3], [4, 5]], "d": []}"#)
            .unwrap();
        assert_eq!(inputs["a"], vec![Fr::from(5u64)]);
        assert_eq!(inputs["b"], vec![Fr::from(1u64), Fr::from(2u64)]);
        assert_eq!(inputs["c"].len(), 3);
        assert!(inputs["d"].is_empty());
    }

    #[test]
    fn values_are_reduced() {
        let modulus = Fr::MODULUS.to_string();
        let json = format!(r#"{{"a": "-1", "b": "{modulus}", "c": -2}}"#);
        let inputs = parse_inputs(&json).unwrap();
        assert_eq!(inputs["a"], vec![-Fr::one()]);
        assert_eq!(inputs["b"], vec![Fr::from(0u64)]);
        assert_eq!(inputs["c"], vec![-Fr::from(2u64)]);
    }

    #[test]
    fn rejects_malformed_values() {
        for json in [
            r#"["1"]"#,
            r#"{"a": "abc"}"#,
            r#"{"a": 1.5}"#,
            r#"{"a": true}"#,
            r#"{"a": {"b": "1"}}"#,
            r#"{"a": null}"#,
            "not json",
        ] {
            assert!(
                matches!(parse_inputs(json), Err(WitnessError::MalformedInput(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn typed_inputs() {
        let single = HashMap::from([("x".to_owned(), Fr::from(3u64))]);
        assert_eq!(single.prepare_input()["x"], vec![Fr::from(3u64)]);
        let ordered = BTreeMap::from([("x".to_owned(), vec![Fr::from(3u64)])]);
        assert_eq!(ordered.prepare_input(), single.prepare_input());
    }
}
