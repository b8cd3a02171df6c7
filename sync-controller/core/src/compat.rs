//! Serde helpers for payloads produced by the gateway's Lua JSON encoder.
//!
//! That encoder cannot tell an empty array from an empty table, so empty lists are sent as `{}`.

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::{fmt, marker::PhantomData};

/// Deserializes a list that may be encoded as an empty object.
///
/// `[...]` yields its items, `{}` and `null` yield an empty list, and any non-empty object is
/// rejected as malformed.
pub fn vec_or_empty_object<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    deserializer.deserialize_any(ListVisitor(PhantomData))
}

struct ListVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for ListVisitor<T> {
    type Value = Vec<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list or an empty object")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(items)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        if map.next_key::<IgnoredAny>()?.is_some() {
            return Err(de::Error::custom("unexpected non-empty object"));
        }
        Ok(Vec::new())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "vec_or_empty_object")]
        items: Vec<u32>,
    }

    #[test]
    fn accepts_arrays_and_empty_objects() {
        let w: Wrapper = serde_json::from_str(r#"{"items":[1,2]}"#).unwrap();
        assert_eq!(w.items, vec![1, 2]);

        let w: Wrapper = serde_json::from_str(r#"{"items":{}}"#).unwrap();
        assert!(w.items.is_empty());

        let w: Wrapper = serde_json::from_str(r#"{"items":null}"#).unwrap();
        assert!(w.items.is_empty());
    }

    #[test]
    fn rejects_non_empty_objects() {
        let err = serde_json::from_str::<Wrapper>(r#"{"items":{"a":"b"}}"#).unwrap_err();
        assert!(
            err.to_string().contains("unexpected non-empty object"),
            "{err}"
        );
    }
}
