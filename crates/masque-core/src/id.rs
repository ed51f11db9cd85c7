//! Identifiers of everything the service stores.
//!
//! Each kind of entity gets its own type, so e.g. an [`AnonymousPostId`] can
//! never be passed where a [`PublicPostId`] is expected, and a [`PersonaId`]
//! can never be confused with the [`PublicUserId`] it belongs to.

#[cfg(feature = "serde")]
mod serde;

use crate::define_array_type_public_no_serde;
use crate::impl_base32_str;

define_array_type_public_no_serde!(
    /// Id of a public user identity
    struct PublicUserId, 16
);
impl_base32_str!(PublicUserId);

define_array_type_public_no_serde!(
    /// Id of the anonymous persona linked to a public user
    ///
    /// Nothing about the value itself is derived from the owning
    /// [`PublicUserId`].
    struct PersonaId, 16
);
impl_base32_str!(PersonaId);

define_array_type_public_no_serde!(
    /// Id of a follow edge
    struct FollowId, 16
);
impl_base32_str!(FollowId);

define_array_type_public_no_serde!(
    /// Id of a post in the public pool
    struct PublicPostId, 16
);
impl_base32_str!(PublicPostId);

define_array_type_public_no_serde!(
    /// Id of a post in the anonymous pool
    struct AnonymousPostId, 16
);
impl_base32_str!(AnonymousPostId);
