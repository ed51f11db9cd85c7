pub mod content;
pub mod id;
mod mode;
mod order;
mod timestamp;

pub use self::content::{ContentValidationError, PostContent, Username, UsernameValidationError};
pub use self::mode::Mode;
pub use self::order::FeedOrderKey;
pub use self::timestamp::Timestamp;

#[macro_export]
macro_rules! define_array_type_no_serde {
    (
        $(#[$outer:meta])*
        struct $t:tt, $n:literal
    ) => {
        $(#[$outer])*
        #[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
        #[derive(Copy, Clone, Hash, Debug)]
        pub struct $t([u8; $n]);

        impl $t {
            pub const ZERO: Self = Self([0; $n]);
            pub const MAX: Self = Self([0xff; $n]);

            pub fn as_slice(&self) -> &[u8] {
                self.0.as_slice()
            }

            pub const fn from_bytes(bytes: [u8; $n]) -> Self {
                Self(bytes)
            }
        }

        #[cfg(feature = "rand")]
        impl $t {
            pub fn generate() -> Self {
                Self(::rand::random())
            }
        }
    }
}

/// Ids are compared and ordered byte-wise, which is also the order
/// they are stored in.
#[macro_export]
macro_rules! define_array_type_public_no_serde {
    (
        $(#[$outer:meta])*
        struct $t:tt, $n:literal
    ) => {
        $crate::define_array_type_no_serde!(
            #[derive(PartialOrd, Ord, PartialEq, Eq)]
            $(#[$outer])*
            struct $t, $n
        );
    }
}

/// Human readable form of all ids: unpadded base32.
macro_rules! impl_base32_str {
    (
        $t:tt
    ) => {
        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                data_encoding::BASE32_NOPAD.encode_write(self.as_slice(), f)
            }
        }

        impl std::str::FromStr for $t {
            type Err = data_encoding::DecodeError;

            fn from_str(s: &str) -> Result<$t, Self::Err> {
                let v = data_encoding::BASE32_NOPAD.decode(s.as_bytes())?;
                let a = v.try_into().map_err(|_| data_encoding::DecodeError {
                    position: 0,
                    kind: data_encoding::DecodeKind::Length,
                })?;
                Ok(Self(a))
            }
        }
    };
}
pub(crate) use impl_base32_str;
