#![no_std]

#[doc(hidden)]
pub extern crate paste;

/// Declares a transparent wrapper over an unsigned integer with a `get_*`/`set_*` pair per
/// field. Setters are `const` and builder-style: they return the updated value.
///
/// ```
/// bitfield::bitfield! {
///     #[derive(Clone, Copy)]
///     #[repr(transparent)]
///     pub unsafe struct Selector: u16 {
///         pub rpl: 0..2,
///         pub index: 3..16,
///     }
/// }
///
/// let sel = Selector::zero().set_index(2);
/// assert_eq!(sel.as_u16(), 0x10);
/// ```
#[macro_export]
macro_rules! bitfield {
    (
        $(#[$outer:meta])*
        $vis:vis unsafe struct $bitfield:ident: $T:ty {
            $(
                $(#[$inner:ident $($args:tt)*])*
                $ivis:vis $bit:ident: $idx:expr,
            )*
        }
    ) => {

        $(#[$outer])*
        ///
        /// ## Warning:
        ///
        /// This structure is a bitfield, overlaping ranges are not checked for. Values written
        /// through a setter are masked to the width of their range.
        $vis struct $bitfield ($T);

        #[allow(dead_code)]
        impl $bitfield {
            const BITS: usize = ::core::mem::size_of::<$T>() * 8;

            $vis const fn zero() -> Self {
                Self(0)
            }

            /// # Safety
            ///
            /// Reserved bits of `value` are not validated.
            $vis const unsafe fn raw(value: $T) -> Self {
                Self(value)
            }

            $crate::paste::paste! {
                $vis const fn [<as_ $T>](self) -> $T {
                    self.0
                }
            }
        $(

            $crate::paste::paste! {
                $(#[$inner $($args)*])*
                ///
                #[doc = concat!(" ", stringify!(_Bitfield_: This field covers the exclusive range $idx))]
                $ivis const fn [<get_ $bit>](&self) -> $T {
                    const RANGE: (usize, usize) = $crate::decompose_range($idx);
                    (self.0 >> RANGE.0) & $crate::field_mask!($T, RANGE)
                }
            }

            $crate::paste::paste! {
                $(#[$inner $($args)*])*
                ///
                /// ## Range:
                #[doc = concat!(" ", stringify!(This field covers the range: $idx))]
                ///
                $ivis const fn [<set_ $bit>](self, val: $T) -> Self {
                    const RANGE: (usize, usize) = $crate::decompose_range($idx);
                    let mask = $crate::field_mask!($T, RANGE);
                    Self((self.0 & !(mask << RANGE.0)) | ((val & mask) << RANGE.0))
                }
            }
        )*
        }


        impl ::core::fmt::Debug for $bitfield {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> Result<(), ::core::fmt::Error> {
                let mut s = f.debug_struct(stringify!($bitfield));
                s.field(".0", &format_args!("{:#0b}", self.0));
                $(
                    $crate::paste::paste! {
                        s.field(stringify!($bit), &{ self.[<get_ $bit>]() });
                    }
                )*
                s.finish()
            }
        }
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! field_mask {
    ($T:ty, $range:expr) => {{
        let width = $range.1 - $range.0;
        if width >= ::core::mem::size_of::<$T>() * 8 {
            !0
        } else {
            ((1 as $T) << width) - 1
        }
    }};
}

#[doc(hidden)]
#[must_use]
pub const fn decompose_range(range: core::ops::Range<usize>) -> (usize, usize) {
    assert!(range.start < range.end, "empty bitfield range");
    (range.start, range.end)
}
