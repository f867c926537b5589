// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ownership regimes for values crossing the boundary.
//!
//! The engine never sees Rust ownership, so every crossing states its regime
//! through the signature that performs it:
//!
//! | Regime        | Rust shape                                  |
//! |---------------|---------------------------------------------|
//! | Borrowed      | [`Borrowed<'a, H>`], `&H`                   |
//! | TransferIn    | [`Handle::from_opaque`] returning owned `H` |
//! | TransferOut   | [`Handle::into_opaque`] consuming `H`       |
//! | Pinned        | [`Pinned<H>`]                               |

use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::Deref;

mod reconcile;

pub use reconcile::{flush, reconcile_if_due, reconciler, ObjectRef, Reconciler};

/// Lifetime regime of one boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Valid for the duration of the call only.
    Borrowed,
    /// The engine produced the value and the receiver must release it.
    TransferIn,
    /// Ownership moves to the engine; the sender must not release it.
    TransferOut,
    /// Kept alive at a fixed address until explicitly released.
    Pinned,
}

/// Engine-owned storage with a fixed opaque representation.
///
/// # Safety
///
/// `Opaque` must be the exact storage the engine reads and writes, and
/// dropping `Self` must release it exactly once.
pub unsafe trait Handle: Sized {
    type Opaque: Copy;

    /// The raw storage, without transferring ownership.
    fn opaque(&self) -> Self::Opaque;

    /// Take ownership of storage produced by the engine (TransferIn).
    ///
    /// # Safety
    ///
    /// `opaque` must be initialized storage nobody else will release.
    unsafe fn from_opaque(opaque: Self::Opaque) -> Self;

    /// Give the storage to the engine (TransferOut). The destructor does not
    /// run on the Rust side.
    fn into_opaque(self) -> Self::Opaque {
        let opaque = self.opaque();
        std::mem::forget(self);
        opaque
    }
}

/// A handle the engine lent for the current call.
///
/// Never runs the destructor; call [`Borrowed::to_owned`] to keep a copy.
pub struct Borrowed<'a, H: Handle> {
    inner: ManuallyDrop<H>,
    _call: PhantomData<&'a H>,
}

impl<'a, H: Handle> Borrowed<'a, H> {
    /// Borrow the storage behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a live value of type `H` that stays valid for `'a`.
    pub unsafe fn from_sys(ptr: *const std::ffi::c_void) -> Self {
        let opaque = ptr.cast::<H::Opaque>().read();
        Self {
            inner: ManuallyDrop::new(H::from_opaque(opaque)),
            _call: PhantomData,
        }
    }

    #[must_use]
    pub const fn regime(&self) -> Ownership {
        Ownership::Borrowed
    }
}

impl<H: Handle + Clone> Borrowed<'_, H> {
    /// Owned copy that may outlive the call.
    #[must_use]
    pub fn to_owned(&self) -> H {
        H::clone(&self.inner)
    }
}

impl<H: Handle> Deref for Borrowed<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.inner
    }
}

/// A value kept at a stable address, typically a class or property name the
/// engine keeps pointers to until unregistration.
pub struct Pinned<H> {
    value: Box<H>,
}

impl<H> Pinned<H> {
    pub fn new(value: H) -> Self {
        Self {
            value: Box::new(value),
        }
    }

    /// Address that stays valid until the pin is released.
    #[must_use]
    pub fn as_ptr(&self) -> *const H {
        &*self.value
    }

    /// Release the pin and get the value back.
    pub fn unpin(self) -> H {
        *self.value
    }
}

impl<H> Deref for Pinned<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.value
    }
}

impl<H: std::fmt::Debug> std::fmt::Debug for Pinned<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pinned").field(&*self.value).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Token([u64; 1]);

    unsafe impl Handle for Token {
        type Opaque = [u64; 1];

        fn opaque(&self) -> [u64; 1] {
            self.0
        }

        unsafe fn from_opaque(opaque: [u64; 1]) -> Self {
            Self(opaque)
        }
    }

    impl Clone for Token {
        fn clone(&self) -> Self {
            Self([self.0[0] + 1])
        }
    }

    impl Drop for Token {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn transfer_and_borrow_release_exactly_once() {
        let before = DROPS.load(Ordering::SeqCst);

        let out = Token([5]).into_opaque();
        assert_eq!(out, [5]);
        assert_eq!(DROPS.load(Ordering::SeqCst), before);

        let storage = [9u64];
        {
            let borrowed = unsafe { Borrowed::<Token>::from_sys(storage.as_ptr().cast()) };
            assert_eq!(borrowed.regime(), Ownership::Borrowed);
            assert_eq!(borrowed.opaque(), [9]);
            let owned = borrowed.to_owned();
            assert_eq!(owned.0, [10]);
        }
        // Only the owned copy was released.
        assert_eq!(DROPS.load(Ordering::SeqCst), before + 1);

        drop(unsafe { Token::from_opaque(out) });
        assert_eq!(DROPS.load(Ordering::SeqCst), before + 2);
    }

    #[test]
    fn pinned_keeps_address_until_unpinned() {
        let pinned = Pinned::new(String::from("Player"));
        let addr = pinned.as_ptr();
        let moved = pinned;
        assert_eq!(moved.as_ptr(), addr);
        assert_eq!(moved.unpin(), "Player");
    }
}
