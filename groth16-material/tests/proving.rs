mod common;

use ark_bn254::Fr;
use ark_serialize::CanonicalSerialize;
use g16_material::{
    ContextError, LoadError, ProofEnvelope, ProvingContext, ProvingContextBuilder,
    ProvingOutput, Validate, VerifyStatus, WitnessError, verify, verify_bn254, verify_envelope,
};
use sha2::Digest as _;
use groth16::ErrorKind;
use groth16::field::fr_to_le_bytes;

use common::{init_tracing, square_root, sum_of_squares};

#[test]
fn square_root_of_nine() {
    init_tracing();
    let context = square_root().context();
    let vk = context.verifying_key_hex().unwrap();

    let output = context.prove(r#"{"x": "3", "y": "9"}"#).unwrap();
    let parsed = ProvingOutput::from_json(&output).unwrap();
    assert_eq!(parsed.public_inputs, vec!["9".to_owned()]);
    assert!(verify(&vk, &output).unwrap());

    let claimed_sixteen = ProvingOutput {
        public_inputs: vec!["16".to_owned()],
        ..parsed
    };
    assert!(!verify(&vk, &claimed_sixteen.to_json().unwrap()).unwrap());
}

#[test]
fn negative_root_is_also_a_root() {
    let context = square_root().context();
    let output = context.prove(r#"{"x": "-3", "y": 9}"#).unwrap();
    assert!(verify(&context.verifying_key_hex().unwrap(), &output).unwrap());
}

#[test]
fn wrong_root_violates_the_constraint() {
    let context = square_root().context();
    let err = context.prove(r#"{"x": "4", "y": "9"}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintUnsatisfied);
}

#[test]
fn omitted_input_is_missing_not_zero() {
    let context = square_root().context();
    // x = 0 and y = 0 would satisfy the constraint
    let err = context.prove(r#"{"y": "0"}"#).unwrap_err();
    assert!(matches!(
        err,
        ContextError::Witness(WitnessError::MissingInput(ref name)) if name == "x"
    ));
    assert_eq!(err.kind(), ErrorKind::MissingInput);
}

#[test]
fn malformed_inputs() {
    let context = square_root().context();
    for inputs in [
        r#"{"x": "3", "y": "9", "z": "1"}"#,
        r#"{"x": ["3", "3"], "y": "9"}"#,
        r#"{"x": "three", "y": "9"}"#,
        r#"["3", "9"]"#,
    ] {
        assert_eq!(
            context.prove(inputs).unwrap_err().kind(),
            ErrorKind::MalformedInput,
            "{inputs}"
        );
    }
}

#[test]
fn proofs_are_randomized() {
    let context = square_root().context();
    let a = ProvingOutput::from_json(&context.prove(r#"{"x": "3", "y": "9"}"#).unwrap()).unwrap();
    let b = ProvingOutput::from_json(&context.prove(r#"{"x": "3", "y": "9"}"#).unwrap()).unwrap();
    assert_eq!(a.public_inputs, b.public_inputs);
    assert_ne!(a.proof, b.proof);
}

#[test]
fn every_flipped_proof_byte_is_rejected() {
    let context = square_root().context();
    let vk = context.verifying_key().unwrap();
    let output = ProvingOutput::from_json(&context.prove(r#"{"x": "3", "y": "9"}"#).unwrap())
        .unwrap();
    let (public_inputs, proof) = output.decode().unwrap();
    let input = fr_to_le_bytes(&public_inputs[0]);
    let mut bytes = Vec::new();
    proof.serialize_compressed(&mut bytes).unwrap();
    assert_eq!(
        verify_bn254(&vk, &[input.as_slice()], &bytes),
        VerifyStatus::Valid
    );

    for i in 0..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0x01;
        let status = verify_bn254(&vk, &[input.as_slice()], &tampered);
        assert!(
            matches!(status, VerifyStatus::Invalid | VerifyStatus::InvalidEncoding),
            "byte {i}: {status:?}"
        );
    }
}

#[test]
fn wrong_public_input_count() {
    let context = square_root().context();
    let vk = context.verifying_key().unwrap();
    let (proof, public_inputs) = context
        .prove_typed(&std::collections::HashMap::from([
            ("x".to_owned(), Fr::from(3u64)),
            ("y".to_owned(), Fr::from(9u64)),
        ]))
        .unwrap();
    let mut bytes = Vec::new();
    proof.serialize_compressed(&mut bytes).unwrap();
    let input = fr_to_le_bytes(&public_inputs[0]);
    assert_eq!(
        verify_bn254(&vk, &[input.as_slice(), input.as_slice()], &bytes),
        VerifyStatus::PublicInputCountMismatch
    );
    let envelope = ProofEnvelope {
        public_inputs: vec![],
        proof,
    };
    assert_eq!(
        verify_envelope(&vk, &envelope.to_bytes().unwrap()),
        VerifyStatus::PublicInputCountMismatch
    );
}

#[test]
fn arrays_of_private_inputs() {
    init_tracing();
    let context = sum_of_squares().context();
    let output = context.prove(r#"{"in": [1, 2, "3", "4"]}"#).unwrap();
    let parsed = ProvingOutput::from_json(&output).unwrap();
    assert_eq!(parsed.public_inputs, vec!["30".to_owned()]);
    assert!(verify(&context.verifying_key_hex().unwrap(), &output).unwrap());

    let err = context.prove(r#"{"in": [1, 2, 3]}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn loads_from_files() {
    let circuit = square_root();
    for ext in ["json", "cbor"] {
        let (program, r1cs, zkey) = circuit.write_to(ext, ext);
        let context = ProvingContext::load(&program, &r1cs, &zkey).unwrap();
        let output = context.prove(r#"{"x": "3", "y": "9"}"#).unwrap();
        assert!(verify(&context.verifying_key_hex().unwrap(), &output).unwrap());

        let context = ProvingContextBuilder::new()
            .build_from_reader(
                std::fs::File::open(&program).unwrap(),
                std::fs::File::open(&r1cs).unwrap(),
                std::fs::File::open(&zkey).unwrap(),
            )
            .unwrap();
        assert_eq!(context.num_public_inputs().unwrap(), 1);
        let _ = std::fs::remove_dir_all(program.parent().unwrap());
    }
}

#[test]
fn snarkjs_zkey() {
    init_tracing();
    let circuit = square_root();
    let program = circuit.program.to_json().unwrap();
    let fingerprint = hex::encode(sha2::Sha256::digest(&circuit.snarkjs_zkey));

    for builder in [
        ProvingContextBuilder::new().validate(Validate::Yes),
        ProvingContextBuilder::new().fingerprint_zkey(fingerprint),
    ] {
        let context = builder
            .build_from_bytes(&program, &circuit.r1cs, &circuit.snarkjs_zkey)
            .unwrap();
        let output = context.prove(r#"{"x": "3", "y": "9"}"#).unwrap();
        assert!(verify(&context.verifying_key_hex().unwrap(), &output).unwrap());
    }

    // same key as the arkworks cache
    let ark = circuit.context();
    let snarkjs = ProvingContextBuilder::new()
        .build_from_bytes(&program, &circuit.r1cs, &circuit.snarkjs_zkey)
        .unwrap();
    assert_eq!(ark.verifying_key().unwrap(), snarkjs.verifying_key().unwrap());

    let mut corrupted = circuit.snarkjs_zkey.clone();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xff;
    let err = ProvingContextBuilder::new()
        .validate(Validate::Yes)
        .build_from_bytes(&program, &circuit.r1cs, &corrupted)
        .unwrap_err();
    assert!(matches!(err, LoadError::ZkeyInvalid(_)), "{err}");
}
