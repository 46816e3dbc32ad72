//! Loading circuits and proving with them.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintMatrices;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, Compress, Validate};
use circom_types::groth16::{ArkZkey, VerificationKey, ZKey};
use circom_types::{CheckElement, R1CS};
use groth16::r1cs::is_satisfied;
use groth16::{
    CircomReduction, Groth16, Groth16Error, LibSnarkReduction, PreparedVerifyingKey,
    check_key_consistency, check_proving_key,
};
use parking_lot::RwLock;
use rand::{CryptoRng, Rng};
use sha2::Digest as _;
use tracing::instrument;

use crate::input::{ProofInput, parse_inputs};
use crate::output::ProvingOutput;
use crate::witness::{self, BlackBoxFunction, BlackBoxRegistry, WitnessProgram};
use crate::{ContextError, LoadError};

/// The QAP reduction a proving key was generated for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QapReduction {
    /// snarkjs keys. This is what every `.zkey` uses.
    #[default]
    Circom,
    /// Keys generated by `ark-groth16`.
    LibSnark,
}

#[derive(Debug, Clone, Copy)]
enum ProgramEncoding {
    Json,
    Cbor,
    Detect,
}

fn check_fingerprint(
    bytes: &[u8],
    expected: Option<&str>,
    mismatch: fn(String) -> LoadError,
) -> Result<bool, LoadError> {
    let Some(expected) = expected else {
        return Ok(false);
    };
    let actual = hex::encode(sha2::Sha256::digest(bytes));
    if actual != expected {
        return Err(mismatch(actual));
    }
    Ok(true)
}

/// Loads the artefacts of a circuit into a [`ProvingContext`].
pub struct ProvingContextBuilder {
    compress: Compress,
    validate: Validate,
    fingerprint_zkey: Option<String>,
    fingerprint_r1cs: Option<String>,
    fingerprint_program: Option<String>,
    num_threads: Option<usize>,
    reduction: QapReduction,
    bbfs: BlackBoxRegistry,
}

impl Default for ProvingContextBuilder {
    fn default() -> Self {
        Self {
            compress: Compress::No,
            validate: Validate::Yes,
            fingerprint_zkey: None,
            fingerprint_r1cs: None,
            fingerprint_program: None,
            num_threads: None,
            reduction: QapReduction::default(),
            bbfs: BlackBoxRegistry::default(),
        }
    }
}

impl ProvingContextBuilder {
    /// A builder with point validation on, the circom reduction and no black boxes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an [`ArkZkey`] proving key was serialized with compressed points.
    pub fn compress(mut self, compress: Compress) -> Self {
        self.compress = compress;
        self
    }

    /// Whether points of the proving key are checked for curve and subgroup membership.
    /// Skipped anyway if the key matches its fingerprint.
    pub fn validate(mut self, validate: Validate) -> Self {
        self.validate = validate;
        self
    }

    /// Expected hex SHA-256 of the proving key.
    pub fn fingerprint_zkey(mut self, fingerprint: String) -> Self {
        self.fingerprint_zkey = Some(fingerprint);
        self
    }

    /// Expected hex SHA-256 of the `.r1cs`.
    pub fn fingerprint_r1cs(mut self, fingerprint: String) -> Self {
        self.fingerprint_r1cs = Some(fingerprint);
        self
    }

    /// Expected hex SHA-256 of the witness program.
    pub fn fingerprint_program(mut self, fingerprint: String) -> Self {
        self.fingerprint_program = Some(fingerprint);
        self
    }

    /// Proves on a dedicated pool of `num_threads` workers instead of the global pool.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// The reduction the proving key was generated for.
    pub fn reduction(mut self, reduction: QapReduction) -> Self {
        self.reduction = reduction;
        self
    }

    /// Registers black-box functions, replacing functions of the same name.
    pub fn add_bbfs(mut self, bbfs: BlackBoxRegistry) -> Self {
        self.bbfs.extend(bbfs);
        self
    }

    fn bbf(mut self, name: &str, function: BlackBoxFunction) -> Self {
        self.bbfs.insert(name.to_owned(), function);
        self
    }

    /// Registers `bbf_inv`, see [`witness::bbf_inv`].
    pub fn bbf_inv(self) -> Self {
        self.bbf("bbf_inv", witness::bbf_inv())
    }

    /// Registers `bbf_legendre`, see [`witness::bbf_legendre`].
    pub fn bbf_legendre(self) -> Self {
        self.bbf("bbf_legendre", witness::bbf_legendre())
    }

    /// Registers `bbf_sqrt_unchecked`, see [`witness::bbf_sqrt_unchecked`].
    pub fn bbf_sqrt_unchecked(self) -> Self {
        self.bbf("bbf_sqrt_unchecked", witness::bbf_sqrt_unchecked())
    }

    /// Registers `bbf_sqrt_input`, see [`witness::bbf_sqrt_input`].
    pub fn bbf_sqrt_input(self) -> Self {
        self.bbf("bbf_sqrt_input", witness::bbf_sqrt_input())
    }

    /// Registers `bbf_num_2_bits_helper`, see [`witness::bbf_num_2_bits_helper`].
    pub fn bbf_num_2_bits_helper(self) -> Self {
        self.bbf("bbf_num_2_bits_helper", witness::bbf_num_2_bits_helper())
    }

    /// Loads the witness program, the `.r1cs` and the proving key from files.
    ///
    /// Programs ending in `.json` are parsed as JSON, anything else as CBOR.
    pub fn build_from_paths(
        self,
        program_path: impl AsRef<Path>,
        r1cs_path: impl AsRef<Path>,
        zkey_path: impl AsRef<Path>,
    ) -> Result<ProvingContext, LoadError> {
        let program_path = program_path.as_ref();
        let encoding = match program_path.extension().and_then(OsStr::to_str) {
            Some("json") => ProgramEncoding::Json,
            _ => ProgramEncoding::Cbor,
        };
        let program_bytes = std::fs::read(program_path)?;
        let r1cs_bytes = std::fs::read(r1cs_path)?;
        let zkey_bytes = std::fs::read(zkey_path)?;
        self.build(&program_bytes, encoding, &r1cs_bytes, &zkey_bytes)
    }

    /// Builds a context from readers of the witness program, the `.r1cs` and the proving key.
    pub fn build_from_reader(
        self,
        mut program_reader: impl std::io::Read,
        mut r1cs_reader: impl std::io::Read,
        mut zkey_reader: impl std::io::Read,
    ) -> Result<ProvingContext, LoadError> {
        let mut program_bytes = Vec::new();
        program_reader.read_to_end(&mut program_bytes)?;
        let mut r1cs_bytes = Vec::new();
        r1cs_reader.read_to_end(&mut r1cs_bytes)?;
        let mut zkey_bytes = Vec::new();
        zkey_reader.read_to_end(&mut zkey_bytes)?;
        self.build_from_bytes(&program_bytes, &r1cs_bytes, &zkey_bytes)
    }

    /// Builds a context from in-memory artefacts.
    ///
    /// The program encoding is detected from its first byte. The proving key is read as a
    /// snarkjs `.zkey` if it starts with the `zkey` magic and as an [`ArkZkey`] otherwise.
    pub fn build_from_bytes(
        self,
        program_bytes: &[u8],
        r1cs_bytes: &[u8],
        zkey_bytes: &[u8],
    ) -> Result<ProvingContext, LoadError> {
        self.build(program_bytes, ProgramEncoding::Detect, r1cs_bytes, zkey_bytes)
    }

    #[instrument(level = "debug", skip_all)]
    fn build(
        self,
        program_bytes: &[u8],
        encoding: ProgramEncoding,
        r1cs_bytes: &[u8],
        zkey_bytes: &[u8],
    ) -> Result<ProvingContext, LoadError> {
        let validate = if check_fingerprint(
            zkey_bytes,
            self.fingerprint_zkey.as_deref(),
            LoadError::ZkeyFingerprintMismatch,
        )? {
            Validate::No
        } else {
            self.validate
        };
        check_fingerprint(
            r1cs_bytes,
            self.fingerprint_r1cs.as_deref(),
            LoadError::R1csFingerprintMismatch,
        )?;
        check_fingerprint(
            program_bytes,
            self.fingerprint_program.as_deref(),
            LoadError::ProgramFingerprintMismatch,
        )?;

        let program = match encoding {
            ProgramEncoding::Json => WitnessProgram::from_json(program_bytes),
            ProgramEncoding::Cbor => WitnessProgram::from_cbor(program_bytes),
            ProgramEncoding::Detect => WitnessProgram::from_slice(program_bytes),
        }
        .and_then(|program| {
            program.check_black_boxes(&self.bbfs)?;
            Ok(program)
        })
        .map_err(|err| LoadError::ProgramInvalid(eyre::eyre!(err)))?;

        let matrices = R1CS::<Fr>::from_bytes(r1cs_bytes)?.to_matrices();

        let pk = if zkey_bytes.starts_with(b"zkey") {
            let check = match validate {
                Validate::Yes => CheckElement::Yes,
                Validate::No => CheckElement::No,
            };
            ZKey::<Bn254>::from_bytes(zkey_bytes, check)?.pk
        } else {
            ArkZkey::<Bn254>::deserialize_with_mode(zkey_bytes, self.compress, validate)?.pk
        };

        let num_variables = matrices.num_instance_variables + matrices.num_witness_variables;
        if program.num_wires() != num_variables {
            return Err(Groth16Error::WitnessSizeMismatch {
                expected: num_variables,
                actual: program.num_wires(),
            }
            .into());
        }
        match self.reduction {
            QapReduction::Circom => check_proving_key::<Bn254, CircomReduction>(&pk, &matrices)?,
            QapReduction::LibSnark => {
                check_proving_key::<Bn254, LibSnarkReduction>(&pk, &matrices)?
            }
        }
        check_key_consistency(&pk)?;

        let pool = self
            .num_threads
            .map(|num_threads| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .thread_name(|i| format!("groth16-prover-{i}"))
                    .build()
            })
            .transpose()?;
        let mut vk_bytes = Vec::with_capacity(pk.vk.compressed_size());
        pk.vk.serialize_compressed(&mut vk_bytes)?;

        tracing::info!(
            wires = num_variables,
            constraints = matrices.num_constraints,
            public_inputs = matrices.num_instance_variables - 1,
            reduction = ?self.reduction,
            "loaded proving context"
        );
        Ok(ProvingContext {
            material: RwLock::new(Some(Arc::new(Material {
                pvk: Groth16::prepare_verifying_key(pk.vk.clone()),
                program,
                matrices,
                pk,
                vk_bytes,
                black_boxes: self.bbfs,
                reduction: self.reduction,
                pool,
            }))),
        })
    }
}

struct Material {
    program: WitnessProgram,
    matrices: ConstraintMatrices<Fr>,
    pk: ProvingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
    vk_bytes: Vec<u8>,
    black_boxes: BlackBoxRegistry,
    reduction: QapReduction,
    pool: Option<rayon::ThreadPool>,
}

impl Material {
    fn install<T: Send>(&self, f: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    fn generate_witness(&self, inputs: &impl ProofInput) -> Result<Vec<Fr>, ContextError> {
        let witness = self
            .program
            .calculate(&inputs.prepare_input(), &self.black_boxes)?;
        is_satisfied(&self.matrices, &witness)?;
        Ok(witness)
    }

    // The witness must already satisfy the constraints.
    fn prove_satisfied<R: Rng + CryptoRng>(
        &self,
        witness: &[Fr],
        rng: &mut R,
    ) -> Result<(Proof<Bn254>, Vec<Fr>), ContextError> {
        let proof = match self.reduction {
            QapReduction::Circom => Groth16::prove_with_rng::<CircomReduction, _>(
                &self.pk,
                &self.matrices,
                witness,
                rng,
            )?,
            QapReduction::LibSnark => Groth16::prove_with_rng::<LibSnarkReduction, _>(
                &self.pk,
                &self.matrices,
                witness,
                rng,
            )?,
        };
        let public_inputs = witness[1..self.matrices.num_instance_variables].to_vec();
        Ok((proof, public_inputs))
    }
}

/// A loaded circuit: witness program, constraint system and proving key.
///
/// The material is immutable after loading and all methods take `&self`, so a context can
/// be shared between threads and proves concurrently. [`release`](Self::release) drops the
/// material, after which every method fails with [`ContextError::ContextClosed`]. Proofs
/// running at that moment still complete.
pub struct ProvingContext {
    material: RwLock<Option<Arc<Material>>>,
}

impl std::fmt::Debug for ProvingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvingContext").finish_non_exhaustive()
    }
}

impl ProvingContext {
    /// Shorthand for [`ProvingContextBuilder::build_from_paths`] with default options.
    pub fn load(
        program_path: impl AsRef<Path>,
        r1cs_path: impl AsRef<Path>,
        zkey_path: impl AsRef<Path>,
    ) -> Result<Self, LoadError> {
        ProvingContextBuilder::new().build_from_paths(program_path, r1cs_path, zkey_path)
    }

    fn material(&self) -> Result<Arc<Material>, ContextError> {
        self.material
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(ContextError::ContextClosed)
    }

    /// Computes the witness for `inputs` and checks it against the constraints.
    pub fn generate_witness(&self, inputs: &impl ProofInput) -> Result<Vec<Fr>, ContextError> {
        let material = self.material()?;
        material.generate_witness(inputs)
    }

    /// Proves `witness` after checking it against the constraints. Returns the proof and
    /// the public inputs.
    pub fn prove_witness(&self, witness: &[Fr]) -> Result<(Proof<Bn254>, Vec<Fr>), ContextError> {
        let material = self.material()?;
        is_satisfied(&material.matrices, witness)?;
        material.install(|| material.prove_satisfied(witness, &mut rand::thread_rng()))
    }

    /// Computes the witness for `inputs` and proves it. Returns the proof and the public
    /// inputs.
    pub fn prove_typed(
        &self,
        inputs: &(impl ProofInput + Sync),
    ) -> Result<(Proof<Bn254>, Vec<Fr>), ContextError> {
        let material = self.material()?;
        material.install(|| {
            let witness = material.generate_witness(inputs)?;
            material.prove_satisfied(&witness, &mut rand::thread_rng())
        })
    }

    /// Proves the JSON `inputs` (see [`parse_inputs`]) and returns the [`ProvingOutput`] JSON.
    #[instrument(level = "debug", skip_all)]
    pub fn prove(&self, inputs: &str) -> Result<String, ContextError> {
        let inputs = parse_inputs(inputs)?;
        let (proof, public_inputs) = self.prove_typed(&inputs)?;
        Ok(ProvingOutput::new(&public_inputs, &proof)?.to_json()?)
    }

    /// Verifies `proof` against the verifying key of this context.
    pub fn verify_proof(
        &self,
        proof: &Proof<Bn254>,
        public_inputs: &[Fr],
    ) -> Result<bool, ContextError> {
        let material = self.material()?;
        Ok(Groth16::verify_prepared(&material.pvk, proof, public_inputs)?)
    }

    /// The verifying key.
    pub fn vk(&self) -> Result<VerifyingKey<Bn254>, ContextError> {
        Ok(self.material()?.pk.vk.clone())
    }

    /// The compressed canonical encoding of the verifying key.
    pub fn verifying_key(&self) -> Result<Vec<u8>, ContextError> {
        Ok(self.material()?.vk_bytes.clone())
    }

    /// Hex of [`verifying_key`](Self::verifying_key), as expected by [`verify`](crate::verify).
    pub fn verifying_key_hex(&self) -> Result<String, ContextError> {
        Ok(hex::encode(&self.material()?.vk_bytes))
    }

    /// Length of [`verifying_key`](Self::verifying_key) in bytes.
    pub fn verifying_key_size(&self) -> Result<usize, ContextError> {
        Ok(self.material()?.vk_bytes.len())
    }

    /// The verifying key as snarkjs `verification_key.json`.
    pub fn verification_key_json(&self) -> Result<String, ContextError> {
        let vk = VerificationKey::from(self.material()?.pk.vk.clone());
        serde_json::to_string(&vk)
            .map_err(|err| Groth16Error::InvalidEncoding(err.to_string()).into())
    }

    /// Number of public inputs of the circuit.
    pub fn num_public_inputs(&self) -> Result<usize, ContextError> {
        Ok(self.material()?.matrices.num_instance_variables - 1)
    }

    /// Releases the material. Calling it again has no effect.
    pub fn release(&self) {
        if self.material.write().take().is_some() {
            tracing::info!("released proving context");
        }
    }

    /// Whether [`release`](Self::release) was called.
    pub fn is_released(&self) -> bool {
        self.material.read().is_none()
    }
}

impl Drop for ProvingContext {
    fn drop(&mut self) {
        self.release();
    }
}
