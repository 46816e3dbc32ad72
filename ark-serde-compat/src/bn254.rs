//! JSON encodings for BN254 points.
//!
//! G1 points are `[x, y, z]`, G2 points are `[[x0, x1], [y0, y1], [z0, z1]]` and target
//! group elements are `[[[a00, a01], [a10, a11], [a20, a21]], [[b00, b01], ...]]`, all
//! as decimal strings. Finite points are written with `z = 1`; the identity is
//! `["0", "1", "0"]` on G1 and `[["0", "0"], ["1", "0"], ["0", "0"]]` on G2.

use std::marker::PhantomData;

use ark_bn254::{Fq, Fq2, Fq6, Fq12, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup};
use serde::{Serializer, de, ser::SerializeSeq as _};

use crate::{CheckElement, SerdeCompatError, f_from_str};

/// Serializes a G1 point as `[x, y, z]`.
pub fn serialize_g1<S: Serializer>(p: &G1Affine, ser: S) -> Result<S::Ok, S::Error> {
    let strings = g1_to_strings(p);
    let mut seq = ser.serialize_seq(Some(3))?;
    for s in strings {
        seq.serialize_element(&s)?;
    }
    seq.end()
}

/// Serializes a slice of G1 points as an array of `[x, y, z]` arrays.
pub fn serialize_g1_seq<S: Serializer>(ps: &[G1Affine], ser: S) -> Result<S::Ok, S::Error> {
    let mut seq = ser.serialize_seq(Some(ps.len()))?;
    for p in ps {
        seq.serialize_element(&g1_to_strings(p))?;
    }
    seq.end()
}

/// Serializes a G2 point as `[[x0, x1], [y0, y1], [z0, z1]]`.
pub fn serialize_g2<S: Serializer>(p: &G2Affine, ser: S) -> Result<S::Ok, S::Error> {
    let mut seq = ser.serialize_seq(Some(3))?;
    match p.xy() {
        Some((x, y)) => {
            seq.serialize_element(&fq2_to_strings(&x))?;
            seq.serialize_element(&fq2_to_strings(&y))?;
            seq.serialize_element(&["1", "0"])?;
        }
        None => {
            seq.serialize_element(&["0", "0"])?;
            seq.serialize_element(&["1", "0"])?;
            seq.serialize_element(&["0", "0"])?;
        }
    }
    seq.end()
}

/// Serializes a target group element (an `Fq12`).
pub fn serialize_gt<S: Serializer>(p: &Fq12, ser: S) -> Result<S::Ok, S::Error> {
    let halves = [p.c0, p.c1].map(|half| {
        [
            fq2_to_strings(&half.c0),
            fq2_to_strings(&half.c1),
            fq2_to_strings(&half.c2),
        ]
    });
    let mut seq = ser.serialize_seq(Some(2))?;
    for half in halves {
        seq.serialize_element(&half)?;
    }
    seq.end()
}

/// Deserializes a G1 point with curve and subgroup checks.
pub fn deserialize_g1<'de, D>(deserializer: D) -> Result<G1Affine, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_seq(G1Visitor(CheckElement::Yes))
}

/// Deserializes a G1 point without curve and subgroup checks. Only for trusted input.
pub fn deserialize_g1_unchecked<'de, D>(deserializer: D) -> Result<G1Affine, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_seq(G1Visitor(CheckElement::No))
}

/// Deserializes an array of G1 points with curve and subgroup checks.
pub fn deserialize_g1_seq<'de, D>(deserializer: D) -> Result<Vec<G1Affine>, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_seq(G1SeqVisitor(CheckElement::Yes))
}

/// Deserializes an array of G1 points without checks. Only for trusted input.
pub fn deserialize_g1_seq_unchecked<'de, D>(deserializer: D) -> Result<Vec<G1Affine>, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_seq(G1SeqVisitor(CheckElement::No))
}

/// Deserializes a G2 point with curve and subgroup checks.
pub fn deserialize_g2<'de, D>(deserializer: D) -> Result<G2Affine, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_seq(G2Visitor(CheckElement::Yes))
}

/// Deserializes a G2 point without curve and subgroup checks. Only for trusted input.
pub fn deserialize_g2_unchecked<'de, D>(deserializer: D) -> Result<G2Affine, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_seq(G2Visitor(CheckElement::No))
}

/// Deserializes a target group element.
pub fn deserialize_gt<'de, D>(deserializer: D) -> Result<Fq12, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_seq(GtVisitor(PhantomData))
}

/// Parses a G1 point from projective decimal coordinates.
pub fn g1_from_strings(
    x: &str,
    y: &str,
    z: &str,
    check: CheckElement,
) -> Result<G1Affine, de::value::Error> {
    g1_from_strings_inner(x, y, z, check)
        .map_err(|_| de::Error::custom("invalid projective point on G1"))
}

fn g1_to_strings(p: &G1Affine) -> [String; 3] {
    match p.xy() {
        Some((x, y)) => [x.to_string(), y.to_string(), "1".to_owned()],
        None => ["0".to_owned(), "1".to_owned(), "0".to_owned()],
    }
}

fn fq2_to_strings(f: &Fq2) -> [String; 2] {
    [f.c0.to_string(), f.c1.to_string()]
}

fn fq2_from_strings(strings: &[String]) -> Result<Fq2, SerdeCompatError> {
    match strings {
        [c0, c1] => Ok(Fq2::new(f_from_str(c0)?, f_from_str(c1)?)),
        _ => Err(SerdeCompatError),
    }
}

fn g1_from_strings_inner(
    x: &str,
    y: &str,
    z: &str,
    check: CheckElement,
) -> Result<G1Affine, SerdeCompatError> {
    let x: Fq = f_from_str(x)?;
    let y: Fq = f_from_str(y)?;
    let z: Fq = f_from_str(z)?;
    let p = G1Projective::new_unchecked(x, y, z).into_affine();
    validate_g1(p, check)
}

fn validate_g1(p: G1Affine, check: CheckElement) -> Result<G1Affine, SerdeCompatError> {
    if p.is_zero() || !check.enabled() {
        return Ok(p);
    }
    if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(SerdeCompatError);
    }
    Ok(p)
}

fn g2_from_strings(
    x: &[String],
    y: &[String],
    z: &[String],
    check: CheckElement,
) -> Result<G2Affine, SerdeCompatError> {
    let p = G2Projective::new_unchecked(
        fq2_from_strings(x)?,
        fq2_from_strings(y)?,
        fq2_from_strings(z)?,
    )
    .into_affine();
    if p.is_zero() || !check.enabled() {
        return Ok(p);
    }
    if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(SerdeCompatError);
    }
    Ok(p)
}

struct G1Visitor(CheckElement);

struct G1SeqVisitor(CheckElement);

struct G2Visitor(CheckElement);

struct GtVisitor(PhantomData<Fq12>);

impl<'de> de::Visitor<'de> for G1Visitor {
    type Value = G1Affine;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence of 3 strings, representing a projective point on G1")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut coords = Vec::with_capacity(3);
        while let Some(c) = seq.next_element::<String>()? {
            coords.push(c);
        }
        match coords.as_slice() {
            [x, y, z] => g1_from_strings_inner(x, y, z, self.0)
                .map_err(|_| de::Error::custom("invalid projective point on G1")),
            _ => Err(de::Error::invalid_length(coords.len(), &self)),
        }
    }
}

impl<'de> de::Visitor<'de> for G1SeqVisitor {
    type Value = Vec<G1Affine>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence of projective G1 points, each a sequence of 3 strings")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut points = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(point) = seq.next_element::<Vec<String>>()? {
            let [x, y, z] = point.as_slice() else {
                return Err(de::Error::invalid_length(point.len(), &self));
            };
            points.push(
                g1_from_strings_inner(x, y, z, self.0)
                    .map_err(|_| de::Error::custom("invalid projective point on G1"))?,
            );
        }
        Ok(points)
    }
}

impl<'de> de::Visitor<'de> for G2Visitor {
    type Value = G2Affine;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str(
            "a sequence of 3 pairs of strings, representing a projective point on G2",
        )
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut coords = Vec::with_capacity(3);
        while let Some(c) = seq.next_element::<Vec<String>>()? {
            coords.push(c);
        }
        match coords.as_slice() {
            [x, y, z] => g2_from_strings(x, y, z, self.0)
                .map_err(|_| de::Error::custom("invalid projective point on G2")),
            _ => Err(de::Error::invalid_length(coords.len(), &self)),
        }
    }
}

impl<'de> de::Visitor<'de> for GtVisitor {
    type Value = Fq12;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an Fq12 element of shape [[[String; 2]; 3]; 2]")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut halves = Vec::with_capacity(2);
        while let Some(half) = seq.next_element::<Vec<Vec<String>>>()? {
            halves.push(fq6_from_strings(&half).map_err(|_| {
                de::Error::custom("invalid cubic extension element in target group")
            })?);
        }
        match halves.as_slice() {
            [c0, c1] => Ok(Fq12::new(*c0, *c1)),
            _ => Err(de::Error::invalid_length(halves.len(), &self)),
        }
    }
}

fn fq6_from_strings(strings: &[Vec<String>]) -> Result<Fq6, SerdeCompatError> {
    match strings {
        [c0, c1, c2] => Ok(Fq6::new(
            fq2_from_strings(c0)?,
            fq2_from_strings(c1)?,
            fq2_from_strings(c2)?,
        )),
        _ => Err(SerdeCompatError),
    }
}
