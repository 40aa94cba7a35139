//! Key generators.
//!
//! [`JsonKeyGenerator`] is the default: it renders the arguments as canonical
//! JSON. Sequences keep their order, record fields are emitted sorted by
//! name, and scalars use their JSON spelling. Two argument values that
//! serialize to the same structure get the same key regardless of how the
//! source type orders its fields or map entries.
//!
//! Values that have no JSON form are rejected with a
//! [`KeyGenerationError`]. This covers maps keyed by non-string types and any
//! `Serialize` impl that reports an error. Closures and function pointers do
//! not implement `Serialize`, so they are rejected at compile time.
//!
//! Some values have a JSON form that another value of the same type shares.
//! Those are rejected too, before anything is rendered:
//!
//! - non-finite floats (`inf`, `-inf`, `NaN`), which JSON writes as `null`
//! - `Some` around a value that renders as `null`, such as `Some(None)` of an
//!   `Option<Option<T>>` or `Some(())`, which would share `None`'s key

use serde::ser;
use serde::Serialize;
use serde_json::Value;
use sha3::{Digest, Sha3_256};

use memento_core::error::Result;
use memento_core::traits::KeyGenerator;

/// Canonical structural serializer for argument values.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonKeyGenerator;

impl JsonKeyGenerator {
    /// Creates the generator.
    pub fn new() -> Self {
        Self
    }
}

impl<A> KeyGenerator<A> for JsonKeyGenerator
where
    A: Serialize + ?Sized,
{
    fn generate(&self, args: &A) -> Result<String> {
        args.serialize(Guard::default())?;
        let value = serde_json::to_value(args)?;
        let mut key = String::new();
        write_canonical(&value, &mut key)?;
        Ok(key)
    }
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(fields) => {
            let mut sorted: Vec<(&String, &Value)> = fields.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, field)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(name)?);
                out.push(':');
                write_canonical(field, out)?;
            }
            out.push('}');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

type Checked = std::result::Result<(), serde_json::Error>;

/// Serializer that only walks a value, failing on anything whose JSON form
/// would be ambiguous.
#[derive(Clone, Copy, Default)]
struct Guard {
    /// Directly inside `Some`, where a `null` rendering reads as `None`
    in_some: bool,
}

impl Guard {
    fn null(self, what: &str) -> Checked {
        if self.in_some {
            Err(ser::Error::custom(format!("`Some` around {what} renders like `None`")))
        } else {
            Ok(())
        }
    }

    fn float(self, v: f64) -> Checked {
        if v.is_finite() {
            Ok(())
        } else {
            Err(ser::Error::custom(format!("non-finite float {v} has no key form")))
        }
    }
}

impl ser::Serializer for Guard {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Guard;
    type SerializeTuple = Guard;
    type SerializeTupleStruct = Guard;
    type SerializeTupleVariant = Guard;
    type SerializeMap = Guard;
    type SerializeStruct = Guard;
    type SerializeStructVariant = Guard;

    fn serialize_bool(self, _: bool) -> Checked {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Checked {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Checked {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Checked {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Checked {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> Checked {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Checked {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Checked {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Checked {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Checked {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> Checked {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Checked {
        self.float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Checked {
        self.float(v)
    }

    fn serialize_char(self, _: char) -> Checked {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Checked {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Checked {
        Ok(())
    }

    fn serialize_none(self) -> Checked {
        self.null("`None`")
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(Guard { in_some: true })
    }

    fn serialize_unit(self) -> Checked {
        self.null("`()`")
    }

    fn serialize_unit_struct(self, name: &'static str) -> Checked {
        self.null(name)
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Checked {
        Ok(())
    }

    // Newtype structs render as their content.
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(Guard::default())
    }

    fn serialize_seq(self, _: Option<usize>) -> std::result::Result<Guard, serde_json::Error> {
        Ok(Guard::default())
    }

    fn serialize_tuple(self, _: usize) -> std::result::Result<Guard, serde_json::Error> {
        Ok(Guard::default())
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Guard, serde_json::Error> {
        Ok(Guard::default())
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Guard, serde_json::Error> {
        Ok(Guard::default())
    }

    fn serialize_map(self, _: Option<usize>) -> std::result::Result<Guard, serde_json::Error> {
        Ok(Guard::default())
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Guard, serde_json::Error> {
        Ok(Guard::default())
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Guard, serde_json::Error> {
        Ok(Guard::default())
    }
}

impl ser::SerializeSeq for Guard {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(Guard::default())
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTuple for Guard {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(Guard::default())
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Guard {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(Guard::default())
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Guard {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(Guard::default())
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeMap for Guard {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Checked {
        key.serialize(Guard::default())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(Guard::default())
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStruct for Guard {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Checked {
        value.serialize(Guard::default())
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Guard {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Checked {
        value.serialize(Guard::default())
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

/// Replaces another generator's key by its SHA3-256 digest.
///
/// Keys become 64 hex characters regardless of argument size. Distinct inner
/// keys map to distinct digests barring a hash collision.
#[derive(Clone, Debug, Default)]
pub struct HashedKeyGenerator<G = JsonKeyGenerator> {
    inner: G,
}

impl<G> HashedKeyGenerator<G> {
    /// Hashes the keys produced by `inner`.
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    /// Returns the wrapped generator.
    pub fn inner(&self) -> &G {
        &self.inner
    }
}

impl<A, G> KeyGenerator<A> for HashedKeyGenerator<G>
where
    A: ?Sized,
    G: KeyGenerator<A>,
{
    fn generate(&self, args: &A) -> Result<String> {
        let key = self.inner.generate(args)?;
        Ok(hex::encode(Sha3_256::digest(key.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    use proptest::prelude::*;
    use test_case::test_case;

    use memento_core::error::KeyGenerationError;

    fn key<A: Serialize + ?Sized>(args: &A) -> String {
        JsonKeyGenerator.generate(args).unwrap()
    }

    fn rejection<A: Serialize + ?Sized>(args: &A) -> KeyGenerationError {
        JsonKeyGenerator.generate(args).unwrap_err()
    }

    #[test_case(key(&(1, 2)), "[1,2]" ; "pair")]
    #[test_case(key(&(2, 1)), "[2,1]" ; "order matters")]
    #[test_case(key(&("a", true, ())), "[\"a\",true,null]" ; "mixed scalars")]
    #[test_case(key(&(vec![1, 2], 3.5)), "[[1,2],3.5]" ; "nested sequence")]
    fn test_default_key_spelling(actual: String, expected: &str) {
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_argument_order_changes_key() {
        assert_ne!(key(&(1, 2)), key(&(2, 1)));
    }

    #[test]
    fn test_record_fields_are_sorted() {
        #[derive(Serialize)]
        struct Forward {
            alpha: u8,
            beta: u8,
        }
        #[derive(Serialize)]
        struct Reversed {
            beta: u8,
            alpha: u8,
        }

        let a = key(&(Forward { alpha: 1, beta: 2 },));
        let b = key(&(Reversed { beta: 2, alpha: 1 },));
        assert_eq!(a, b);
        assert_eq!(a, "[{\"alpha\":1,\"beta\":2}]");
    }

    #[test]
    fn test_hash_map_order_is_irrelevant() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for i in 0..32 {
            first.insert(format!("k{i}"), i);
        }
        for i in (0..32).rev() {
            second.insert(format!("k{i}"), i);
        }
        assert_eq!(key(&[&first]), key(&[&second]));
    }

    #[test]
    fn test_strings_are_escaped() {
        assert_eq!(key(&["a\"b"]), "[\"a\\\"b\"]");
        assert_ne!(key(&["a,b"]), key(&["a", "b"]));
    }

    #[test]
    fn test_non_string_map_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "value");
        let err = JsonKeyGenerator.generate(&(map,)).unwrap_err();
        assert!(matches!(err, KeyGenerationError::Unserializable(_)));
    }

    #[test]
    fn test_failing_serialize_is_rejected() {
        struct Opaque;
        impl Serialize for Opaque {
            fn serialize<S>(&self, _: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                Err(serde::ser::Error::custom("opaque handles have no key"))
            }
        }
        let err = JsonKeyGenerator.generate(&(1, Opaque)).unwrap_err();
        assert!(err.to_string().contains("opaque handles have no key"));
    }

    #[test_case(f64::INFINITY ; "positive infinity")]
    #[test_case(f64::NEG_INFINITY ; "negative infinity")]
    #[test_case(f64::NAN ; "not a number")]
    fn test_non_finite_floats_are_rejected(value: f64) {
        let err = rejection(&(value,));
        assert!(matches!(err, KeyGenerationError::Unserializable(_)));
        assert!(err.to_string().contains("non-finite float"));

        let err = rejection(&(vec![1.0, value as f32],));
        assert!(matches!(err, KeyGenerationError::Unserializable(_)));
    }

    #[test]
    fn test_non_finite_float_does_not_share_none_key() {
        assert_eq!(key(&(None::<f64>,)), "[null]");
        assert_eq!(key(&(Some(-0.5),)), "[-0.5]");

        let err = rejection(&(Some(f64::INFINITY),));
        assert!(err.to_string().contains("non-finite float inf"));
    }

    #[test]
    fn test_nested_none_is_rejected() {
        assert_eq!(key(&(None::<Option<i32>>,)), "[null]");
        assert_eq!(key(&(Some(Some(1)),)), "[1]");

        let err = rejection(&(Some(None::<i32>),));
        assert!(matches!(err, KeyGenerationError::Unserializable(_)));
        assert!(err.to_string().contains("renders like `None`"));
    }

    #[test]
    fn test_some_around_null_rendering_is_rejected() {
        #[derive(Serialize)]
        struct Marker;
        #[derive(Serialize)]
        struct Wrapper(Option<u8>);

        rejection(&(Some(()),));
        rejection(&(Some(Marker),));
        rejection(&(Some(Wrapper(None)),));
        assert_eq!(key(&(Some(Wrapper(Some(3))),)), "[3]");
        assert_eq!(key(&(Some(vec![None::<u8>]),)), "[[null]]");
        assert_eq!(key(&(Wrapper(None),)), "[null]");
    }

    #[test]
    fn test_hashed_key_is_fixed_width_hex() {
        let hashed = HashedKeyGenerator::new(JsonKeyGenerator);
        let short = hashed.generate(&(1,)).unwrap();
        let long = hashed.generate(&(vec![0u64; 1024],)).unwrap();
        assert_eq!(short.len(), 64);
        assert_eq!(long.len(), 64);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(short, long);
    }

    #[test]
    fn test_hashed_key_propagates_inner_failure() {
        let hashed = HashedKeyGenerator::new(|_: &u8| -> Result<String> {
            Err(KeyGenerationError::rejected("nope"))
        });
        assert!(matches!(hashed.generate(&0u8), Err(KeyGenerationError::Rejected(_))));
    }

    proptest! {
        #[test]
        fn prop_key_is_deterministic(args in proptest::collection::vec(any::<i64>(), 0..16)) {
            prop_assert_eq!(key(&args), key(&args.clone()));
        }

        #[test]
        fn prop_distinct_args_get_distinct_keys(
            a in proptest::collection::vec(any::<i64>(), 0..8),
            b in proptest::collection::vec(any::<i64>(), 0..8),
        ) {
            prop_assert_eq!(a == b, key(&a) == key(&b));
        }

        #[test]
        fn prop_distinct_strings_get_distinct_keys(a in ".*", b in ".*") {
            prop_assert_eq!(a == b, key(&(&a,)) == key(&(&b,)));
        }
    }
}
