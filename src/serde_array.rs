//! `serde(with = ...)` helpers for fixed-size arrays with a generic const
//! length, which `serde`'s derive macros cannot handle directly.

use std::array;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use serde::Deserialize;

pub fn serialize<S, T, const N: usize>(value: &[T; N], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut tup = serializer.serialize_tuple(N)?;
    for elem in value {
        tup.serialize_element(elem)?;
    }
    tup.end()
}

pub fn deserialize<'de, D, T, const N: usize>(deserializer: D) -> Result<[T; N], D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct ArrayVisitor<T, const N: usize>(PhantomData<T>);

    impl<'de, T, const N: usize> Visitor<'de> for ArrayVisitor<T, N>
    where
        T: Deserialize<'de>,
    {
        type Value = [T; N];

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "an array of length {}", N)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut slots: [Option<T>; N] = array::from_fn(|_| None);
            for (i, slot) in slots.iter_mut().enumerate() {
                *slot = Some(seq.next_element()?.ok_or_else(|| {
                    serde::de::Error::invalid_length(i, &self)
                })?);
            }

            Ok(array::from_fn(|i| slots[i].take().unwrap()))
        }
    }

    deserializer.deserialize_tuple(N, ArrayVisitor(PhantomData))
}
