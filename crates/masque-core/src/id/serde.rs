use std::str::FromStr as _;

use super::{AnonymousPostId, FollowId, PersonaId, PublicPostId, PublicUserId};

macro_rules! impl_serde_str {
    ($t:tt) => {
        impl ::serde::Serialize for $t {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                if s.is_human_readable() {
                    s.collect_str(self)
                } else {
                    s.serialize_bytes(self.as_slice())
                }
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $t {
            fn deserialize<D>(d: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                if d.is_human_readable() {
                    let s = <String>::deserialize(d)?;
                    $t::from_str(&s).map_err(|e| {
                        ::serde::de::Error::custom(format!("base32 deserialization error: {e}"))
                    })
                } else {
                    let bytes = <Vec<u8>>::deserialize(d)?;
                    let bytes = bytes
                        .try_into()
                        .map_err(|_| ::serde::de::Error::custom("Invalid length"))?;
                    Ok($t::from_bytes(bytes))
                }
            }
        }
    };
}

impl_serde_str!(PublicUserId);
impl_serde_str!(PersonaId);
impl_serde_str!(FollowId);
impl_serde_str!(PublicPostId);
impl_serde_str!(AnonymousPostId);
