//! Fixed-depth hardware return stack.

use crate::Address;

/// Circular return-address stack of depth `N`.
///
/// Pushing when the pointer reaches `N` wraps it to zero without error, the
/// same way the on-chip stacks silently overwrite their oldest entry. A pop
/// at pointer zero wraps to `N - 1` once the stack has wrapped at least once;
/// before that it is an underflow.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CallStack<const N: usize> {
    #[cfg_attr(feature = "serde", serde(with = "serde_slots"))]
    slots: [Address; N],
    sp: usize,
    wrapped: bool,
}

impl<const N: usize> Default for CallStack<N> {
    fn default() -> Self {
        Self {
            slots: [0; N],
            sp: 0,
            wrapped: false,
        }
    }
}

impl<const N: usize> CallStack<N> {
    /// Declared depth.
    pub const DEPTH: usize = N;

    /// Stack pointer, always in `0..N`.
    #[must_use]
    pub const fn pointer(&self) -> usize {
        self.sp
    }

    /// Saved return addresses in slot order.
    #[must_use]
    pub const fn slots(&self) -> &[Address; N] {
        &self.slots
    }

    /// Stores `pc` at the pointer and advances it, wrapping at `N`.
    pub fn push(&mut self, pc: Address) {
        self.slots[self.sp] = pc;
        self.sp += 1;
        if self.sp >= N {
            self.sp = 0;
            self.wrapped = true;
        }
    }

    /// Steps the pointer back and returns the saved address.
    ///
    /// Returns `None` when nothing was ever pushed past this point.
    pub fn pop(&mut self) -> Option<Address> {
        if self.sp == 0 {
            if !self.wrapped {
                return None;
            }
            self.sp = N - 1;
        } else {
            self.sp -= 1;
        }
        Some(self.slots[self.sp])
    }
}

#[cfg(feature = "serde")]
mod serde_slots {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::Address;

    pub fn serialize<S: Serializer, const N: usize>(
        slots: &[Address; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        slots.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[Address; N], D::Error> {
        let values = Vec::<Address>::deserialize(deserializer)?;
        values
            .try_into()
            .map_err(|_| serde::de::Error::custom("stack slot count mismatch"))
    }
}
