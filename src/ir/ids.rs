//! Typed ids for canonical dataset records.
//!
//! Each id is a transparent `u64` on the wire; distinct Rust types keep an
//! image id from being passed where a category id belongs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            #[inline]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Image id. Assigned from 0 in input order.
    ImageId
);
define_id!(
    /// Annotation id. Assigned from 0, contiguous in emission order.
    AnnotationId
);
define_id!(
    /// Category id. Assigned from 1 in first-seen label order.
    CategoryId
);
define_id!(LicenseId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_and_display() {
        assert!(ImageId(0) < ImageId(1));
        assert_eq!(CategoryId::new(7).to_string(), "7");
        assert_eq!(format!("{:?}", AnnotationId(3)), "AnnotationId(3)");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&[ImageId(0), ImageId(12)]).unwrap();
        assert_eq!(json, "[0,12]");
        let back: LicenseId = serde_json::from_str("4").unwrap();
        assert_eq!(back, LicenseId(4));
    }
}
