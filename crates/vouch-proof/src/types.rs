use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use vouch_core::FixedHash;

use crate::error::ProofError;

// ---------------------------------------------------------------------------
// Field types and values
// ---------------------------------------------------------------------------

/// The closed set of declared field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Uint,
    Int,
    Bool,
    String,
    Bytes,
    Address,
}

impl FieldType {
    /// Type-tag byte that opens every canonical encoding.
    pub fn tag(&self) -> u8 {
        match self {
            FieldType::Uint => 0x01,
            FieldType::Int => 0x02,
            FieldType::Bool => 0x03,
            FieldType::String => 0x04,
            FieldType::Bytes => 0x05,
            FieldType::Address => 0x06,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Uint => "uint",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Address => "address",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uint" => Ok(FieldType::Uint),
            "int" => Ok(FieldType::Int),
            "bool" => Ok(FieldType::Bool),
            "string" => Ok(FieldType::String),
            "bytes" => Ok(FieldType::Bytes),
            "address" => Ok(FieldType::Address),
            other => Err(ProofError::UnsupportedType(other.to_string())),
        }
    }
}

/// Tagged field value. Each variant corresponds to exactly one [`FieldType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Uint(u128),
    Int(i128),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Address([u8; 20]),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Uint(_) => FieldType::Uint,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Bytes(_) => FieldType::Bytes,
            FieldValue::Address(_) => FieldType::Address,
        }
    }
}

/// A named, typed field of a record.
///
/// `declared_type` is kept separately from the value so that records built
/// from loosely-typed input can be checked for agreement at encoding time.
/// On the wire a field is `{ "name", "type", "value" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawField", into = "RawField")]
pub struct Field {
    pub name: String,
    pub declared_type: FieldType,
    pub value: FieldValue,
}

impl Field {
    /// Field whose declared type is taken from the value.
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            declared_type: value.field_type(),
            value,
        }
    }

    pub fn uint(name: impl Into<String>, value: u128) -> Self {
        Self::new(name, FieldValue::Uint(value))
    }

    pub fn int(name: impl Into<String>, value: i128) -> Self {
        Self::new(name, FieldValue::Int(value))
    }

    pub fn bool(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, FieldValue::Bool(value))
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FieldValue::String(value.into()))
    }

    pub fn bytes(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(name, FieldValue::Bytes(value.into()))
    }

    pub fn address(name: impl Into<String>, value: [u8; 20]) -> Self {
        Self::new(name, FieldValue::Address(value))
    }
}

/// Loosely-typed wire form of a [`Field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub value: serde_json::Value,
}

impl TryFrom<RawField> for Field {
    type Error = ProofError;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        crate::canonical::coerce_raw_field(raw)
    }
}

impl From<Field> for RawField {
    fn from(field: Field) -> Self {
        crate::canonical::to_raw_field(&field)
    }
}

// ---------------------------------------------------------------------------
// Encodings and leaves
// ---------------------------------------------------------------------------

/// Deterministic bytes for one field at one positional index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalEncoding {
    pub index: u32,
    #[serde(with = "hex_vec")]
    pub bytes: Vec<u8>,
}

impl CanonicalEncoding {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A hashed, indexed commitment to one field. `digest = H(index ‖ encoding)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leaf {
    pub index: u32,
    pub field: Field,
    pub encoding: CanonicalEncoding,
    pub digest: FixedHash,
}

impl Leaf {
    pub fn name(&self) -> &str {
        &self.field.name
    }
}

// ---------------------------------------------------------------------------
// Proofs
// ---------------------------------------------------------------------------

/// One level of an authentication path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    pub sibling: FixedHash,
    pub sibling_is_on_right: bool,
    /// Set when the node was paired with itself under the odd-trailing rule.
    #[serde(default)]
    pub duplicate: bool,
}

/// Sibling digests from one leaf up to (not including) the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthenticationPath {
    pub leaf_index: u32,
    pub steps: Vec<PathStep>,
}

impl AuthenticationPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevealedField {
    pub leaf: Leaf,
    pub path: AuthenticationPath,
}

/// Selective-disclosure proof over a subset of a record's fields.
///
/// Revealed fields are ordered by leaf index and never empty when produced
/// by [`crate::generate_proof`]. Deserialized proofs are untrusted; the
/// verifier re-checks every structural property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub root: FixedHash,
    pub leaf_count: u32,
    pub revealed_fields: Vec<RevealedField>,
}

impl Proof {
    pub fn revealed_names(&self) -> Vec<&str> {
        self.revealed_fields.iter().map(|r| r.leaf.name()).collect()
    }

    pub fn revealed(&self, name: &str) -> Option<&Field> {
        self.revealed_fields
            .iter()
            .find(|r| r.leaf.name() == name)
            .map(|r| &r.leaf.field)
    }
}

// ---------------------------------------------------------------------------
// Verification report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVerdict {
    pub index: u32,
    pub name: String,
    pub valid: bool,
    /// Root the path folded to; absent when the leaf could not be recomputed.
    pub recomputed_root: Option<FixedHash>,
}

/// Per-field outcome plus the overall result of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub fields: Vec<FieldVerdict>,
    pub proof_root: FixedHash,
    pub expected_root: FixedHash,
    pub outcome: Result<(), ProofError>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn failure(&self) -> Option<&ProofError> {
        self.outcome.as_ref().err()
    }
}

// ---------------------------------------------------------------------------
// Serde helper: variable-length bytes as hex
// ---------------------------------------------------------------------------

pub(crate) mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_parse() {
        assert_eq!("uint".parse::<FieldType>().unwrap(), FieldType::Uint);
        assert_eq!("address".parse::<FieldType>().unwrap(), FieldType::Address);
        assert_eq!(
            "float".parse::<FieldType>(),
            Err(ProofError::UnsupportedType("float".into()))
        );
    }

    #[test]
    fn test_field_type_tags_distinct() {
        let all = [
            FieldType::Uint,
            FieldType::Int,
            FieldType::Bool,
            FieldType::String,
            FieldType::Bytes,
            FieldType::Address,
        ];
        let mut tags: Vec<u8> = all.iter().map(|t| t.tag()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), all.len());
    }

    #[test]
    fn test_field_constructors_set_declared_type() {
        assert_eq!(Field::uint("p", 7500).declared_type, FieldType::Uint);
        assert_eq!(Field::string("m", "x").declared_type, FieldType::String);
        assert_eq!(Field::address("a", [0; 20]).declared_type, FieldType::Address);
    }

    #[test]
    fn test_field_json_shape() {
        let field = Field::uint("probability", 7500);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "probability", "type": "uint", "value": 7500 })
        );
        let back: Field = serde_json::from_value(json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_field_json_rejects_unknown_type() {
        let json = serde_json::json!({ "name": "p", "type": "float", "value": 1.5 });
        let err = serde_json::from_value::<Field>(json).unwrap_err();
        assert!(err.to_string().contains("unsupported field type"));
    }

    #[test]
    fn test_path_step_duplicate_defaults_false() {
        let json = format!(
            "{{\"sibling\":\"{}\",\"sibling_is_on_right\":true}}",
            "00".repeat(32)
        );
        let step: PathStep = serde_json::from_str(&json).unwrap();
        assert!(!step.duplicate);
    }
}
