//! A stored collection that keeps the elements it cannot decode.
//!
//! Each array element is decoded on its own. An element that fails is held
//! as raw JSON next to the typed items and written back unchanged after
//! them, so one bad record never costs the rest of the collection.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct EntityList<T> {
    items: Vec<T>,
    unreadable: Vec<Value>,
}

impl<T> Default for EntityList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            unreadable: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for EntityList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items,
            unreadable: Vec::new(),
        }
    }
}

impl<T> EntityList<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Stored elements that did not decode, in stored order.
    pub fn unreadable(&self) -> &[Value] {
        &self.unreadable
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Same list with `items` as the typed part. Unreadable elements carry over.
    pub fn with_items(&self, items: Vec<T>) -> Self {
        Self {
            items,
            unreadable: self.unreadable.clone(),
        }
    }
}

impl<T: Serialize> Serialize for EntityList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len() + self.unreadable.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        for raw in &self.unreadable {
            seq.serialize_element(raw)?;
        }
        seq.end()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for EntityList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_option(ListVisitor(PhantomData))
    }
}

struct ListVisitor<T>(PhantomData<T>);

impl<'de, T: DeserializeOwned> Visitor<'de> for ListVisitor<T> {
    type Value = EntityList<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of records or null")
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(EntityList::default())
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(EntityList::default())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut list = EntityList::default();
        while let Some(raw) = seq.next_element::<Value>()? {
            match T::deserialize(&raw) {
                Ok(item) => list.items.push(item),
                Err(err) => {
                    tracing::warn!(error = %err, "keeping undecodable record as stored");
                    list.unreadable.push(raw);
                }
            }
        }
        Ok(list)
    }
}
