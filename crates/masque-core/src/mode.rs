/// Which identity a user currently posts and reads as
///
/// Stored per public user; `Public` unless the user switched it.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Mode {
    #[default]
    Public,
    Anonymous,
}

impl Mode {
    pub fn from_is_anonymous(is_anonymous: bool) -> Self {
        if is_anonymous {
            Self::Anonymous
        } else {
            Self::Public
        }
    }

    pub fn is_anonymous(self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl From<bool> for Mode {
    fn from(is_anonymous: bool) -> Self {
        Self::from_is_anonymous(is_anonymous)
    }
}
