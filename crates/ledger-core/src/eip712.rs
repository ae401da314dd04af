//! EIP-712 typed structured data hashing.
//!
//! This module implements [EIP-712] for hashing typed structured data. The
//! hardware signer never sees the raw message: it receives (and shows on its
//! screen) the two hashes computed here, so any mismatch in encoding is a
//! signature over something the user did not verify.
//!
//! # Overview
//!
//! Typed data consists of:
//!
//! 1. **Domain**: identifies the application and prevents cross-app replay
//! 2. **Types**: struct definitions, optionally including `EIP712Domain`
//! 3. **Message**: the payload, an instance of the primary type
//!
//! # Hash Computation
//!
//! ```text
//! hashStruct(s)   = keccak256(typeHash(s) || encodeData(s))
//! signing hash    = keccak256("\x19\x01" || hashStruct(domain) || hashStruct(message))
//! ```
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::{Eip712Domain, TypedData};
//! use serde_json::json;
//!
//! let domain = Eip712Domain {
//!     name: Some("My DApp".to_string()),
//!     version: Some("1".to_string()),
//!     chain_id: Some(9001),
//!     verifying_contract: None,
//!     salt: None,
//! };
//!
//! let types = json!({
//!     "Person": [
//!         {"name": "name", "type": "string"},
//!         {"name": "wallet", "type": "address"}
//!     ]
//! });
//!
//! let message = json!({
//!     "name": "Alice",
//!     "wallet": "0x0000000000000000000000000000000000000001"
//! });
//!
//! let typed_data = TypedData::new(domain, types, "Person".to_string(), message);
//! let domain_hash = typed_data.domain_separator().unwrap();
//! let digest = typed_data.signing_hash().unwrap();
//! assert_ne!(domain_hash, digest);
//! ```
//!
//! [EIP-712]: https://eips.ethereum.org/EIPS/eip-712

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{B256, U256, keccak256};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::address::Address;
use crate::error::{Error, Result};

/// Name of the reserved domain struct.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// The EIP-712 domain separator parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    /// The human-readable name of the signing domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The version of the signing domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// The chain ID where signatures are valid.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_chain_id"
    )]
    pub chain_id: Option<u64>,

    /// The address of the contract verifying the signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,

    /// A disambiguating salt for the protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl Eip712Domain {
    /// Returns the canonical `EIP712Domain` field list for the fields that are
    /// set, in the order the standard prescribes.
    #[must_use]
    pub fn type_fields(&self) -> Vec<TypeField> {
        let candidates = [
            (self.name.is_some(), "name", "string"),
            (self.version.is_some(), "version", "string"),
            (self.chain_id.is_some(), "chainId", "uint256"),
            (self.verifying_contract.is_some(), "verifyingContract", "address"),
            (self.salt.is_some(), "salt", "bytes32"),
        ];

        candidates
            .into_iter()
            .filter(|(present, _, _)| *present)
            .map(|(_, name, field_type)| TypeField::new(name, field_type))
            .collect()
    }

    /// Returns the domain as a JSON object, omitting unset fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`] if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Computes the domain separator using the inferred field list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTypedData`] if a field value cannot be encoded
    /// (for example a malformed `verifyingContract`).
    pub fn separator_hash(&self) -> Result<B256> {
        let typed_data = TypedData {
            domain: self.clone(),
            types: BTreeMap::new(),
            primary_type: DOMAIN_TYPE.to_string(),
            message: Value::Null,
        };
        typed_data.domain_separator()
    }
}

/// A type field definition for EIP-712.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeField {
    /// The name of the field.
    pub name: String,

    /// The type of the field (e.g., "string", "uint256", "Person[]").
    #[serde(rename = "type")]
    pub field_type: String,
}

impl TypeField {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// Typed structured data for EIP-712 signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// The EIP-712 domain.
    #[serde(default)]
    pub domain: Eip712Domain,

    /// The type definitions, keyed by struct name.
    pub types: BTreeMap<String, Vec<TypeField>>,

    /// The primary type being signed.
    pub primary_type: String,

    /// The message data.
    pub message: Value,
}

impl TypedData {
    /// Creates a new typed data instance.
    ///
    /// # Arguments
    ///
    /// * `domain` - The EIP-712 domain separator parameters
    /// * `types` - JSON object containing type definitions
    /// * `primary_type` - The name of the primary type being signed
    /// * `message` - The message data as a JSON value
    ///
    /// Malformed type entries in `types` are skipped.
    #[must_use]
    pub fn new(domain: Eip712Domain, types: Value, primary_type: String, message: Value) -> Self {
        Self {
            domain,
            types: parse_types(&types),
            primary_type,
            message,
        }
    }

    /// Parses typed data from its standard JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`] if parsing fails.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses typed data from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`] if parsing fails.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serializes the typed data to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the domain as the field map hashed under `EIP712Domain`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonError`] if serialization fails.
    pub fn domain_map(&self) -> Result<Value> {
        self.domain.to_value()
    }

    /// Computes `hashStruct` of the domain.
    ///
    /// # Errors
    ///
    /// See [`TypedData::hash_struct`].
    pub fn domain_separator(&self) -> Result<B256> {
        self.hash_struct(DOMAIN_TYPE, &self.domain_map()?)
    }

    /// Computes `hashStruct` of the message under the primary type.
    ///
    /// # Errors
    ///
    /// See [`TypedData::hash_struct`].
    pub fn message_hash(&self) -> Result<B256> {
        self.hash_struct(&self.primary_type, &self.message)
    }

    /// Computes the digest a signer signs.
    ///
    /// `keccak256("\x19\x01" || domainSeparator || hashStruct(message))`
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedType`] or [`Error::InvalidTypedData`] if the
    /// type definitions or message are malformed.
    pub fn signing_hash(&self) -> Result<B256> {
        let domain_separator = self.domain_separator()?;
        let message_hash = self.message_hash()?;
        Ok(signing_digest(&domain_separator, &message_hash))
    }

    /// Computes the hash of a named struct.
    ///
    /// `hashStruct(s) = keccak256(typeHash || encodeData(s))`
    ///
    /// # Arguments
    ///
    /// * `type_name` - The struct to hash, which must be defined in `types`
    ///   (or be `EIP712Domain`, whose fields may be inferred)
    /// * `data` - A JSON object holding a value for every field
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedType`] if `type_name` or a referenced struct is
    /// not defined, and [`Error::InvalidTypedData`] if a value does not match
    /// its declared type.
    pub fn hash_struct(&self, type_name: &str, data: &Value) -> Result<B256> {
        let type_hash = keccak256(self.encode_type(type_name)?.as_bytes());
        let encoded_data = self.encode_data(type_name, data)?;

        let mut buf = Vec::with_capacity(32 + encoded_data.len());
        buf.extend_from_slice(type_hash.as_slice());
        buf.extend_from_slice(&encoded_data);

        Ok(keccak256(&buf))
    }

    /// Encodes the type signature: the struct itself followed by every struct
    /// it references, directly or not, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedType`] if `type_name` is not defined.
    pub fn encode_type(&self, type_name: &str) -> Result<String> {
        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(type_name, &mut dependencies)?;
        dependencies.remove(type_name);

        let mut result = self.format_type(type_name)?;
        for dependency in dependencies {
            result.push_str(&self.format_type(dependency)?);
        }
        Ok(result)
    }

    /// Returns the fields of a struct. `EIP712Domain` falls back to the
    /// fields inferred from the domain when the types do not define it.
    fn fields(&self, type_name: &str) -> Result<Cow<'_, [TypeField]>> {
        match self.types.get(type_name) {
            Some(fields) => Ok(Cow::Borrowed(fields.as_slice())),
            None if type_name == DOMAIN_TYPE => Ok(Cow::Owned(self.domain.type_fields())),
            None => Err(Error::UndefinedType(type_name.to_string())),
        }
    }

    fn format_type(&self, type_name: &str) -> Result<String> {
        let fields = self.fields(type_name)?;
        let members: Vec<String> = fields
            .iter()
            .map(|f| format!("{} {}", f.field_type, f.name))
            .collect();
        Ok(format!("{type_name}({})", members.join(",")))
    }

    fn collect_dependencies<'a>(
        &'a self,
        type_name: &'a str,
        found: &mut BTreeSet<&'a str>,
    ) -> Result<()> {
        if !found.insert(type_name) {
            return Ok(());
        }

        let Some(fields) = self.types.get(type_name) else {
            return if type_name == DOMAIN_TYPE {
                Ok(())
            } else {
                Err(Error::UndefinedType(type_name.to_string()))
            };
        };

        for field in fields {
            let base = base_type(&field.field_type);
            if self.types.contains_key(base) {
                self.collect_dependencies(base, found)?;
            }
        }
        Ok(())
    }

    fn encode_data(&self, type_name: &str, data: &Value) -> Result<Vec<u8>> {
        let fields = self.fields(type_name)?;

        let obj = data.as_object().ok_or_else(|| {
            Error::InvalidTypedData(format!("expected object for {type_name}"))
        })?;
        if obj.len() > fields.len() {
            return Err(Error::InvalidTypedData(format!(
                "extra data in {type_name}: expected {} fields, got {}",
                fields.len(),
                obj.len()
            )));
        }

        let mut encoded = Vec::with_capacity(32 * fields.len());
        for field in fields.iter() {
            let value = obj.get(&field.name).ok_or_else(|| {
                Error::InvalidTypedData(format!("missing field {type_name}.{}", field.name))
            })?;
            encoded.extend_from_slice(&self.encode_field(&field.field_type, value)?);
        }

        Ok(encoded)
    }

    fn encode_field(&self, field_type: &str, value: &Value) -> Result<[u8; 32]> {
        if let Some((item_type, length)) = split_array(field_type)? {
            let items = value.as_array().ok_or_else(|| {
                Error::InvalidTypedData(format!("expected array for {field_type}"))
            })?;
            if let Some(expected) = length
                && items.len() != expected
            {
                return Err(Error::InvalidTypedData(format!(
                    "{field_type} expects {expected} items, got {}",
                    items.len()
                )));
            }

            let mut concatenated = Vec::with_capacity(32 * items.len());
            for item in items {
                concatenated.extend_from_slice(&self.encode_field(item_type, item)?);
            }
            return Ok(keccak256(&concatenated).0);
        }

        if self.types.contains_key(field_type) {
            return Ok(self.hash_struct(field_type, value)?.0);
        }

        encode_primitive(field_type, value)
    }
}

/// Combines the two struct hashes into the final EIP-712 digest.
#[must_use]
pub fn signing_digest(domain_separator: &B256, message_hash: &B256) -> B256 {
    let mut data = [0u8; 66];
    data[..2].copy_from_slice(&[0x19, 0x01]);
    data[2..34].copy_from_slice(domain_separator.as_slice());
    data[34..].copy_from_slice(message_hash.as_slice());
    keccak256(data)
}

/// Strips every array suffix, `Person[][2]` -> `Person`.
fn base_type(field_type: &str) -> &str {
    field_type.split('[').next().unwrap_or(field_type)
}

/// Splits `T[]` / `T[n]` into the item type and optional fixed length.
fn split_array(field_type: &str) -> Result<Option<(&str, Option<usize>)>> {
    let Some(inner) = field_type.strip_suffix(']') else {
        return Ok(None);
    };
    let Some(open) = inner.rfind('[') else {
        return Err(Error::InvalidTypedData(format!("bad array type {field_type}")));
    };

    let (item_type, length) = (&inner[..open], &inner[open + 1..]);
    if length.is_empty() {
        return Ok(Some((item_type, None)));
    }
    let length = length
        .parse()
        .map_err(|_| Error::InvalidTypedData(format!("bad array length in {field_type}")))?;
    Ok(Some((item_type, Some(length))))
}

/// Parses type definitions from JSON.
fn parse_types(types: &Value) -> BTreeMap<String, Vec<TypeField>> {
    let Some(obj) = types.as_object() else {
        return BTreeMap::new();
    };

    obj.iter()
        .filter_map(|(type_name, fields)| {
            let fields = fields
                .as_array()?
                .iter()
                .filter_map(|f| TypeField::deserialize(f).ok())
                .collect();
            Some((type_name.clone(), fields))
        })
        .collect()
}

/// Encodes an atomic or dynamic primitive into one 32-byte word.
fn encode_primitive(field_type: &str, value: &Value) -> Result<[u8; 32]> {
    let mut word = [0u8; 32];

    match field_type {
        "string" => {
            let s = expect_str(field_type, value)?;
            Ok(keccak256(s.as_bytes()).0)
        }
        "bytes" => {
            let bytes = decode_hex(expect_str(field_type, value)?)?;
            Ok(keccak256(&bytes).0)
        }
        "bool" => {
            let b = match value {
                Value::Bool(b) => *b,
                Value::String(s) if s == "true" || s == "false" => s == "true",
                _ => return Err(Error::InvalidTypedData("expected bool".to_string())),
            };
            word[31] = u8::from(b);
            Ok(word)
        }
        "address" => {
            let addr = Address::from_hex(expect_str(field_type, value)?)
                .map_err(|e| Error::InvalidTypedData(format!("invalid address: {e}")))?;
            word[12..].copy_from_slice(addr.as_bytes());
            Ok(word)
        }
        t if t.starts_with("bytes") => {
            let size = bit_suffix(t, "bytes")?;
            if size == 0 || size > 32 {
                return Err(Error::InvalidTypedData(format!("invalid type {t}")));
            }

            let bytes = decode_hex(expect_str(field_type, value)?)?;
            if bytes.len() > size {
                return Err(Error::InvalidTypedData(format!(
                    "{} bytes do not fit in {t}",
                    bytes.len()
                )));
            }
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(word)
        }
        t if t.starts_with("uint") => {
            let bits = check_integer_width(t, "uint")?;
            let n = parse_uint(value)?;
            if n.bit_len() > bits {
                return Err(Error::InvalidTypedData(format!("integer larger than {t}")));
            }
            Ok(n.to_be_bytes::<32>())
        }
        t if t.starts_with("int") => {
            let bits = check_integer_width(t, "int")?;
            let (negative, magnitude) = parse_int(value)?;
            let limit = U256::from(1u8) << (bits - 1);
            let fits = if negative {
                magnitude <= limit
            } else {
                magnitude < limit
            };
            if !fits {
                return Err(Error::InvalidTypedData(format!("integer out of range for {t}")));
            }
            let word = if negative {
                magnitude.wrapping_neg()
            } else {
                magnitude
            };
            Ok(word.to_be_bytes::<32>())
        }
        _ => Err(Error::InvalidTypedData(format!(
            "unsupported type: {field_type}"
        ))),
    }
}

fn expect_str<'a>(field_type: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::InvalidTypedData(format!("expected string for {field_type}")))
}

/// Returns the numeric suffix of `uint64`, `bytes4` and the like. A bare
/// `uint`/`int` means 256 bits.
fn bit_suffix(field_type: &str, prefix: &str) -> Result<usize> {
    let suffix = &field_type[prefix.len()..];
    if suffix.is_empty() {
        return Ok(256);
    }
    suffix
        .parse()
        .map_err(|_| Error::InvalidTypedData(format!("unsupported type: {field_type}")))
}

/// Returns the bit width of a well-formed `uintN`/`intN`.
fn check_integer_width(field_type: &str, prefix: &str) -> Result<usize> {
    let bits = bit_suffix(field_type, prefix)?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(Error::InvalidTypedData(format!("invalid type {field_type}")));
    }
    Ok(bits)
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(s)?)
}

/// Parses an unsigned integer from a JSON number, decimal or `0x` string.
fn parse_uint(value: &Value) -> Result<U256> {
    if let Some(n) = value.as_u64() {
        return Ok(U256::from(n));
    }
    if let Some(s) = value.as_str() {
        if let Some(hex_str) = s.strip_prefix("0x") {
            return U256::from_str_radix(hex_str, 16)
                .map_err(|_| Error::InvalidTypedData(format!("invalid hex uint: {s}")));
        }
        return U256::from_str_radix(s, 10)
            .map_err(|_| Error::InvalidTypedData(format!("invalid uint: {s}")));
    }
    Err(Error::InvalidTypedData(format!("expected uint, got {value}")))
}

/// Parses a signed integer into its sign and magnitude.
fn parse_int(value: &Value) -> Result<(bool, U256)> {
    if let Some(n) = value.as_i64()
        && n < 0
    {
        return Ok((true, U256::from(n.unsigned_abs())));
    }
    if let Some(s) = value.as_str()
        && let Some(magnitude) = s.strip_prefix('-')
    {
        let magnitude = parse_uint(&Value::String(magnitude.to_string()))?;
        return Ok((!magnitude.is_zero(), magnitude));
    }
    Ok((false, parse_uint(value)?))
}

/// Accepts `chainId` as a number or a decimal/hex string.
fn deserialize_chain_id<'de, D>(deserializer: D) -> core::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let parsed = parse_uint(&value).map_err(D::Error::custom)?;
    u64::try_from(parsed)
        .map(Some)
        .map_err(|_| D::Error::custom("chainId does not fit in 64 bits"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn mail() -> TypedData {
        let json = json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"}
                ],
                "Person": [
                    {"name": "name", "type": "string"},
                    {"name": "wallet", "type": "address"}
                ],
                "Mail": [
                    {"name": "from", "type": "Person"},
                    {"name": "to", "type": "Person"},
                    {"name": "contents", "type": "string"}
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "message": {
                "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                "contents": "Hello, Bob!"
            }
        });
        TypedData::from_json(&json.to_string()).unwrap()
    }

    fn hex32(s: &str) -> B256 {
        s.parse().unwrap()
    }

    #[test]
    fn mail_reference_vector() {
        let typed_data = mail();

        assert_eq!(
            typed_data.encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
        assert_eq!(
            typed_data.domain_separator().unwrap(),
            hex32("0xf2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f")
        );
        assert_eq!(
            typed_data.message_hash().unwrap(),
            hex32("0xc52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e")
        );
        assert_eq!(
            typed_data.signing_hash().unwrap(),
            hex32("0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2")
        );
    }

    #[test]
    fn inferred_domain_matches_declared() {
        let mut typed_data = mail();
        let declared = typed_data.domain_separator().unwrap();

        typed_data.types.remove(DOMAIN_TYPE);
        assert_eq!(typed_data.domain_separator().unwrap(), declared);
        assert_eq!(typed_data.domain.separator_hash().unwrap(), declared);
    }

    #[test]
    fn domain_map_omits_unset_fields() {
        let domain = Eip712Domain {
            name: Some("Evmos".to_string()),
            chain_id: Some(9001),
            ..Eip712Domain::default()
        };
        assert_eq!(
            domain.to_value().unwrap(),
            json!({"name": "Evmos", "chainId": 9001})
        );
        assert_eq!(domain.type_fields().len(), 2);
    }

    #[test]
    fn chain_id_accepts_strings() {
        let domain: Eip712Domain = serde_json::from_value(json!({"chainId": "9001"})).unwrap();
        assert_eq!(domain.chain_id, Some(9001));

        let domain: Eip712Domain = serde_json::from_value(json!({"chainId": "0x2329"})).unwrap();
        assert_eq!(domain.chain_id, Some(9001));
    }

    #[test]
    fn transitive_dependencies_are_sorted() {
        let types = json!({
            "Order": [{"name": "maker", "type": "Party"}, {"name": "fee", "type": "Amount"}],
            "Party": [{"name": "id", "type": "Id"}],
            "Id": [{"name": "value", "type": "uint64"}],
            "Amount": [{"name": "value", "type": "uint256"}]
        });
        let typed_data = TypedData::new(
            Eip712Domain::default(),
            types,
            "Order".to_string(),
            Value::Null,
        );

        assert_eq!(
            typed_data.encode_type("Order").unwrap(),
            "Order(Party maker,Amount fee)Amount(uint256 value)Id(uint64 value)Party(Id id)"
        );
    }

    #[test]
    fn arrays_of_structs_and_fixed_arrays() {
        let types = json!({
            "Batch": [
                {"name": "people", "type": "Person[]"},
                {"name": "pair", "type": "uint8[2]"}
            ],
            "Person": [{"name": "name", "type": "string"}]
        });
        let message = json!({
            "people": [{"name": "a"}, {"name": "b"}],
            "pair": [1, 2]
        });
        let typed_data = TypedData::new(
            Eip712Domain::default(),
            types.clone(),
            "Batch".to_string(),
            message,
        );
        assert!(typed_data.message_hash().is_ok());
        assert_eq!(
            typed_data.encode_type("Batch").unwrap(),
            "Batch(Person[] people,uint8[2] pair)Person(string name)"
        );

        let wrong_length = TypedData::new(
            Eip712Domain::default(),
            types,
            "Batch".to_string(),
            json!({"people": [], "pair": [1]}),
        );
        assert!(matches!(
            wrong_length.message_hash(),
            Err(Error::InvalidTypedData(_))
        ));
    }

    #[test]
    fn negative_int_is_twos_complement() {
        let word = encode_primitive("int256", &json!(-1)).unwrap();
        assert_eq!(word, [0xff; 32]);

        let word = encode_primitive("int64", &json!("-2")).unwrap();
        let mut expected = [0xff; 32];
        expected[31] = 0xfe;
        assert_eq!(word, expected);
    }

    #[test]
    fn encode_primitive_types() {
        let word = encode_primitive("bool", &json!(true)).unwrap();
        assert_eq!(word[31], 1);

        let word = encode_primitive("uint256", &json!("0x2a")).unwrap();
        assert_eq!(word[31], 42);

        let word = encode_primitive("bytes4", &json!("0xdeadbeef")).unwrap();
        assert_eq!(&word[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(word[4..].iter().all(|b| *b == 0));

        let word = encode_primitive(
            "address",
            &json!("0x0000000000000000000000000000000000000001"),
        )
        .unwrap();
        assert_eq!(word[31], 1);
    }

    #[test]
    fn bad_primitives_are_rejected() {
        assert!(encode_primitive("bytes33", &json!("0x00")).is_err());
        assert!(encode_primitive("bytes2", &json!("0x000000")).is_err());
        assert!(encode_primitive("uint7", &json!(1)).is_err());
        assert!(encode_primitive("string", &json!(1)).is_err());
        assert!(encode_primitive("Unknown", &json!("x")).is_err());
    }

    #[test]
    fn integers_must_fit_declared_width() {
        assert!(encode_primitive("uint8", &json!(255)).is_ok());
        assert!(encode_primitive("uint8", &json!(300)).is_err());
        assert!(encode_primitive("uint16", &json!("0x10000")).is_err());
        assert!(encode_primitive("uint8", &json!(-1)).is_err());
        assert!(encode_primitive("uint8", &json!("-1")).is_err());

        assert!(encode_primitive("int8", &json!(127)).is_ok());
        assert!(encode_primitive("int8", &json!(-128)).is_ok());
        assert!(encode_primitive("int8", &json!(128)).is_err());
        assert!(encode_primitive("int8", &json!(-129)).is_err());
        assert!(encode_primitive("int8", &json!("-1000")).is_err());
        assert_eq!(encode_primitive("int256", &json!("-0")).unwrap(), [0u8; 32]);

        let typed_data = TypedData::new(
            Eip712Domain::default(),
            json!({"T": [{"name": "v", "type": "uint8"}]}),
            "T".to_string(),
            json!({"v": 300}),
        );
        assert!(matches!(
            typed_data.message_hash(),
            Err(Error::InvalidTypedData(_))
        ));
    }

    #[test]
    fn undeclared_message_field_is_rejected() {
        let typed_data = TypedData::new(
            Eip712Domain::default(),
            json!({"Tx": [{"name": "memo", "type": "string"}]}),
            "Tx".to_string(),
            json!({"memo": "hi", "to_address": "evmos1recipient", "amount": "999999"}),
        );
        assert!(matches!(
            typed_data.message_hash(),
            Err(Error::InvalidTypedData(_))
        ));
    }

    #[test]
    fn missing_field_is_reported() {
        let typed_data = TypedData::new(
            Eip712Domain::default(),
            json!({"Tx": [{"name": "memo", "type": "string"}]}),
            "Tx".to_string(),
            json!({}),
        );
        assert!(matches!(
            typed_data.message_hash(),
            Err(Error::InvalidTypedData(_))
        ));
    }

    #[test]
    fn undefined_type_error() {
        let typed_data = TypedData::new(
            Eip712Domain::default(),
            json!({}),
            "NonExistent".to_string(),
            json!({"foo": "bar"}),
        );
        assert!(matches!(
            typed_data.signing_hash(),
            Err(Error::UndefinedType(_))
        ));
    }

    #[test]
    fn json_roundtrip_preserves_hash() {
        let original = mail();
        let recovered = TypedData::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(original, recovered);
        assert_eq!(
            original.signing_hash().unwrap(),
            recovered.signing_hash().unwrap()
        );
    }
}
