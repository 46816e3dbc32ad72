#![allow(dead_code)]

use std::path::PathBuf;

use ark_bn254::{Bn254, Fr};
use ark_ff::One;
use ark_serialize::{CanonicalSerialize, Compress};
use circom_types::R1CS;
use circom_types::groth16::{ArkZkey, ZKey};
use g16_material::witness::{InputSignal, Node, Operation};
use g16_material::{ProvingContext, ProvingContextBuilder, WitnessProgram};
use groth16::{CircomReduction, Groth16};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Program, `.r1cs` and proving key of a circuit. The key is stored both as an arkworks
/// cache and in the snarkjs layout.
pub struct Circuit {
    pub program: WitnessProgram,
    pub r1cs: Vec<u8>,
    pub zkey: Vec<u8>,
    pub snarkjs_zkey: Vec<u8>,
}

impl Circuit {
    fn new(program: WitnessProgram, r1cs: R1CS<Fr>) -> Self {
        let matrices = r1cs.to_matrices();
        let mut r1cs_bytes = Vec::new();
        r1cs.to_writer(&mut r1cs_bytes).unwrap();
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::from_seed([
            1, 0, 0, 0, 23, 0, 0, 0, 200, 1, 0, 0, 210, 30, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0,
        ]);
        let pk =
            Groth16::<Bn254>::insecure_setup::<CircomReduction, _>(&matrices, &mut rng).unwrap();
        let mut snarkjs_zkey = Vec::new();
        ZKey::from_ark(&matrices, pk.clone())
            .to_writer(&mut snarkjs_zkey)
            .unwrap();
        let mut zkey = Vec::new();
        ArkZkey { matrices, pk }
            .serialize_with_mode(&mut zkey, Compress::No)
            .unwrap();
        Self {
            program,
            r1cs: r1cs_bytes,
            zkey,
            snarkjs_zkey,
        }
    }

    pub fn context(&self) -> ProvingContext {
        ProvingContextBuilder::new()
            .build_from_bytes(&self.program.to_json().unwrap(), &self.r1cs, &self.zkey)
            .unwrap()
    }

    /// Writes the artefacts to a fresh directory and returns the paths of program, r1cs
    /// and proving key.
    pub fn write_to(&self, name: &str, program_ext: &str) -> (PathBuf, PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("g16-material-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let program_path = dir.join(format!("circuit.{program_ext}"));
        let program = match program_ext {
            "json" => self.program.to_json().unwrap(),
            _ => self.program.to_cbor().unwrap(),
        };
        std::fs::write(&program_path, program).unwrap();
        let r1cs_path = dir.join("circuit.r1cs");
        std::fs::write(&r1cs_path, &self.r1cs).unwrap();
        let zkey_path = dir.join("circuit.arkzkey");
        std::fs::write(&zkey_path, &self.zkey).unwrap();
        (program_path, r1cs_path, zkey_path)
    }
}

/// `x * x = y` with `y` public and `x` private. Wires `[1, y, x]`.
pub fn square_root() -> Circuit {
    let program = WitnessProgram::new(
        3,
        vec![InputSignal::new("y", 0, 1), InputSignal::new("x", 1, 1)],
        vec![Node::Constant(Fr::one()), Node::Input(0), Node::Input(1)],
        vec![0, 1, 2],
    )
    .unwrap();
    let one = Fr::one();
    let r1cs = R1CS {
        num_inputs: 2,
        num_aux: 1,
        num_variables: 3,
        n_pub_out: 0,
        n_pub_in: 1,
        n_prv_in: 1,
        n_labels: 3,
        constraints: vec![(vec![(2, one)], vec![(2, one)], vec![(1, one)])],
        wire_mapping: vec![0, 1, 2],
    };
    Circuit::new(program, r1cs)
}

/// `out = sum of in[i] * in[i]` over four private inputs, computed through a chain of
/// squares. Wires `[1, out, in[0..4], sq[0..4], acc[0..3]]`.
pub fn sum_of_squares() -> Circuit {
    let one = Fr::one();
    let mut nodes = vec![Node::Constant(one)];
    // nodes 1..5: inputs
    nodes.extend((0..4).map(Node::Input));
    // nodes 5..9: squares
    nodes.extend((1..5).map(|i| Node::Op(Operation::Mul, i, i)));
    // nodes 9..12: running sums
    nodes.push(Node::Op(Operation::Add, 5, 6));
    nodes.push(Node::Op(Operation::Add, 9, 7));
    nodes.push(Node::Op(Operation::Add, 10, 8));

    let outputs = vec![0, 11, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
    let program =
        WitnessProgram::new(outputs.len(), vec![InputSignal::new("in", 0, 4)], nodes, outputs)
            .unwrap();

    let mut constraints = (0..4)
        .map(|i| (vec![(2 + i, one)], vec![(2 + i, one)], vec![(6 + i, one)]))
        .collect::<Vec<_>>();
    // acc0 = sq0 + sq1, acc1 = acc0 + sq2, acc2 = acc1 + sq3 = out
    constraints.push((vec![(6, one), (7, one)], vec![(0, one)], vec![(10, one)]));
    constraints.push((vec![(10, one), (8, one)], vec![(0, one)], vec![(11, one)]));
    constraints.push((vec![(11, one), (9, one)], vec![(0, one)], vec![(12, one)]));
    constraints.push((vec![(12, one)], vec![(0, one)], vec![(1, one)]));
    let r1cs = R1CS {
        num_inputs: 2,
        num_aux: 11,
        num_variables: 13,
        n_pub_out: 1,
        n_pub_in: 0,
        n_prv_in: 4,
        n_labels: 13,
        constraints,
        wire_mapping: (0..13).collect(),
    };
    Circuit::new(program, r1cs)
}
