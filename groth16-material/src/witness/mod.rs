//! The compiled witness program of a circuit and its evaluator.
//!
//! A program is a DAG of [`Node`]s in topological order. The witness is the value of
//! the nodes listed in `outputs`, one per R1CS wire. Programs are stored as JSON or
//! CBOR:
//!
//! ```json
//! {
//!   "num_wires": 3,
//!   "inputs": [{ "name": "y", "offset": 0, "len": 1 }, { "name": "x", "offset": 1, "len": 1 }],
//!   "nodes": [{ "Constant": "1" }, { "Input": 0 }, { "Input": 1 }],
//!   "outputs": [0, 1, 2]
//! }
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use ark_bn254::Fr;
use ark_ff::{One, Zero};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use groth16::ErrorKind;

mod black_box;
mod ops;

pub use black_box::{
    BlackBoxFunction, BlackBoxRegistry, bbf_inv, bbf_legendre, bbf_num_2_bits_helper,
    bbf_sqrt_input, bbf_sqrt_unchecked,
};
pub use ops::{Operation, TresOperation, UnoOperation};

/// Errors of witness calculation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WitnessError {
    /// A declared input signal was not provided.
    #[error("missing input signal `{0}`")]
    MissingInput(String),
    /// The inputs do not fit the declared signals or could not be decoded.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// A node divided by zero.
    #[error("division by zero in node {node}")]
    DivisionByZero {
        /// The failing node.
        node: usize,
    },
    /// A node calls a black-box function that is not registered.
    #[error("unknown black-box function `{0}`")]
    UnknownFunction(String),
    /// The program is structurally invalid.
    #[error("invalid witness program: {0}")]
    InvalidProgram(String),
}

impl WitnessError {
    /// Returns the kind of this error.
    ///
    /// Broken programs are reported as [`ErrorKind::InvalidEncoding`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            WitnessError::MissingInput(_) => ErrorKind::MissingInput,
            WitnessError::MalformedInput(_) => ErrorKind::MalformedInput,
            WitnessError::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            WitnessError::UnknownFunction(_) | WitnessError::InvalidProgram(_) => {
                ErrorKind::InvalidEncoding
            }
        }
    }
}

/// An input signal and the slots it occupies in the input buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSignal {
    /// The signal name as used in the input JSON.
    pub name: String,
    /// First slot.
    pub offset: usize,
    /// Number of values, arrays are flattened in row-major order.
    pub len: usize,
}

impl InputSignal {
    /// Creates a signal occupying `offset..offset + len`.
    pub fn new(name: impl Into<String>, offset: usize, len: usize) -> Self {
        Self {
            name: name.into(),
            offset,
            len,
        }
    }
}

/// A node of the witness program. Operands are indices of earlier nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// A slot of the input buffer.
    Input(usize),
    /// A constant.
    Constant(
        #[serde(serialize_with = "ark_serde_compat::serialize_f")]
        #[serde(deserialize_with = "ark_serde_compat::deserialize_f")]
        Fr,
    ),
    /// A binary operation.
    Op(Operation, usize, usize),
    /// A unary operation.
    UnoOp(UnoOperation, usize),
    /// A ternary operation.
    TresOp(TresOperation, usize, usize, usize),
    /// A black-box function call.
    Call(String, Vec<usize>),
}

impl Node {
    fn operands(&self) -> Vec<usize> {
        match self {
            Node::Input(_) | Node::Constant(_) => vec![],
            Node::Op(_, a, b) => vec![*a, *b],
            Node::UnoOp(_, a) => vec![*a],
            Node::TresOp(_, a, b, c) => vec![*a, *b, *c],
            Node::Call(_, args) => args.clone(),
        }
    }
}

/// A compiled witness program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessProgram {
    num_wires: usize,
    inputs: Vec<InputSignal>,
    nodes: Vec<Node>,
    outputs: Vec<usize>,
}

impl WitnessProgram {
    /// Builds and validates a program.
    pub fn new(
        num_wires: usize,
        inputs: Vec<InputSignal>,
        nodes: Vec<Node>,
        outputs: Vec<usize>,
    ) -> Result<Self, WitnessError> {
        let program = Self {
            num_wires,
            inputs,
            nodes,
            outputs,
        };
        program.validate()?;
        Ok(program)
    }

    /// Parses a JSON program.
    pub fn from_json(bytes: &[u8]) -> Result<Self, WitnessError> {
        let program: Self = serde_json::from_slice(bytes)
            .map_err(|err| WitnessError::InvalidProgram(err.to_string()))?;
        program.validate()?;
        Ok(program)
    }

    /// Parses a CBOR program.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, WitnessError> {
        let program: Self = ciborium::from_reader(bytes)
            .map_err(|err| WitnessError::InvalidProgram(err.to_string()))?;
        program.validate()?;
        Ok(program)
    }

    /// Parses a program, treating input that starts with `{` as JSON and anything else as
    /// CBOR.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WitnessError> {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Self::from_json(bytes),
            _ => Self::from_cbor(bytes),
        }
    }

    /// Encodes the program as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, WitnessError> {
        serde_json::to_vec(self).map_err(|err| WitnessError::InvalidProgram(err.to_string()))
    }

    /// Encodes the program as CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>, WitnessError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|err| WitnessError::InvalidProgram(err.to_string()))?;
        Ok(bytes)
    }

    /// Number of wires, the length of every computed witness.
    pub fn num_wires(&self) -> usize {
        self.num_wires
    }

    /// The declared input signals.
    pub fn inputs(&self) -> &[InputSignal] {
        &self.inputs
    }

    /// The nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Names of the black-box functions the program calls.
    pub fn black_boxes(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Call(name, _) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn input_len(&self) -> usize {
        self.inputs
            .iter()
            .map(|signal| signal.offset + signal.len)
            .max()
            .unwrap_or(0)
    }

    /// Checks the structure of the program.
    pub fn validate(&self) -> Result<(), WitnessError> {
        let invalid = |msg: String| Err(WitnessError::InvalidProgram(msg));

        if self.outputs.len() != self.num_wires {
            return invalid(format!(
                "{} outputs for {} wires",
                self.outputs.len(),
                self.num_wires
            ));
        }
        if let Some(output) = self.outputs.iter().find(|out| **out >= self.nodes.len()) {
            return invalid(format!("output references missing node {output}"));
        }
        // every input slot is a wire
        let in_range = self.inputs.iter().all(|signal| {
            signal
                .offset
                .checked_add(signal.len)
                .is_some_and(|end| end <= self.num_wires)
        });
        if !in_range {
            return invalid("input signals exceed the wire count".to_owned());
        }

        let mut names = HashSet::new();
        let mut covered = vec![false; self.input_len()];
        for signal in &self.inputs {
            if !names.insert(signal.name.as_str()) {
                return invalid(format!("input signal `{}` declared twice", signal.name));
            }
            for slot in &mut covered[signal.offset..signal.offset + signal.len] {
                if *slot {
                    return invalid(format!("input signal `{}` overlaps", signal.name));
                }
                *slot = true;
            }
        }

        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Input(slot) = node {
                if !covered.get(*slot).copied().unwrap_or(false) {
                    return invalid(format!("node {id} reads unassigned input slot {slot}"));
                }
            }
            if let Some(operand) = node.operands().into_iter().find(|op| *op >= id) {
                return invalid(format!("node {id} references later node {operand}"));
            }
        }
        Ok(())
    }

    /// Checks that every called black-box function is in `registry`.
    pub fn check_black_boxes(&self, registry: &BlackBoxRegistry) -> Result<(), WitnessError> {
        match self
            .black_boxes()
            .into_iter()
            .find(|name| !registry.contains_key(*name))
        {
            Some(name) => Err(WitnessError::UnknownFunction(name.to_owned())),
            None => Ok(()),
        }
    }

    /// Computes the witness for `inputs`.
    ///
    /// Every declared signal must be present with exactly its declared number of values,
    /// missing signals are never filled with zero. Undeclared names are rejected. The
    /// result is not checked against the constraint system.
    #[instrument(level = "debug", skip_all, fields(wires = self.num_wires))]
    pub fn calculate(
        &self,
        inputs: &HashMap<String, Vec<Fr>>,
        black_boxes: &BlackBoxRegistry,
    ) -> Result<Vec<Fr>, WitnessError> {
        if let Some(name) = inputs
            .keys()
            .find(|name| !self.inputs.iter().any(|signal| &signal.name == *name))
        {
            return Err(WitnessError::MalformedInput(format!(
                "unknown input signal `{name}`"
            )));
        }
        let mut buffer = vec![Fr::zero(); self.input_len()];
        for signal in &self.inputs {
            let values = inputs
                .get(&signal.name)
                .ok_or_else(|| WitnessError::MissingInput(signal.name.clone()))?;
            if values.len() != signal.len {
                return Err(WitnessError::MalformedInput(format!(
                    "signal `{}` expects {} values, got {}",
                    signal.name,
                    signal.len,
                    values.len()
                )));
            }
            buffer[signal.offset..signal.offset + signal.len].copy_from_slice(values);
        }

        let mut values = vec![None; self.nodes.len()];
        let witness = self
            .outputs
            .iter()
            .map(|output| self.evaluate(*output, &buffer, black_boxes, &mut values))
            .collect::<Result<Vec<_>, _>>()?;
        match witness.first() {
            Some(one) if one.is_one() => Ok(witness),
            _ => Err(WitnessError::InvalidProgram(
                "wire 0 does not evaluate to one".to_owned(),
            )),
        }
    }

    // Evaluates `root` and the nodes it depends on. Iterative, the graphs of real
    // circuits are far deeper than the stack.
    fn evaluate(
        &self,
        root: usize,
        buffer: &[Fr],
        black_boxes: &BlackBoxRegistry,
        values: &mut [Option<Fr>],
    ) -> Result<Fr, WitnessError> {
        let mut stack = vec![root];
        while let Some(&id) = stack.last() {
            if values[id].is_some() {
                stack.pop();
                continue;
            }
            // the first operand without a value, if any
            let pending = |ids: &[usize]| ids.iter().copied().find(|op| values[*op].is_none());
            let value = match &self.nodes[id] {
                Node::Input(slot) => buffer[*slot],
                Node::Constant(c) => *c,
                Node::UnoOp(op, a) => match values[*a] {
                    Some(a) => op.eval(a),
                    None => {
                        stack.push(*a);
                        continue;
                    }
                },
                Node::Op(op, a, b) => {
                    if let Some(next) = pending(&[*a, *b]) {
                        stack.push(next);
                        continue;
                    }
                    let (a, b) = (values[*a].unwrap_or_default(), values[*b].unwrap_or_default());
                    op.eval(a, b)
                        .map_err(|_| WitnessError::DivisionByZero { node: id })?
                }
                Node::TresOp(TresOperation::TernCond, cond, when_true, when_false) => {
                    let Some(cond) = values[*cond] else {
                        stack.push(*cond);
                        continue;
                    };
                    let branch = if cond.is_zero() {
                        *when_false
                    } else {
                        *when_true
                    };
                    match values[branch] {
                        Some(value) => value,
                        None => {
                            stack.push(branch);
                            continue;
                        }
                    }
                }
                Node::Call(name, args) => {
                    if let Some(next) = pending(args) {
                        stack.push(next);
                        continue;
                    }
                    let function = black_boxes
                        .get(name)
                        .ok_or_else(|| WitnessError::UnknownFunction(name.clone()))?;
                    let args = args
                        .iter()
                        .map(|arg| values[*arg].unwrap_or_default())
                        .collect::<Vec<_>>();
                    function(&args)
                }
            };
            values[id] = Some(value);
            stack.pop();
        }
        Ok(values[root].unwrap_or_default())
    }
}
