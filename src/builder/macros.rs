//! Macros for declaring state identifiers.

/// Declare an enum usable as a state identifier.
///
/// The enum derives `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Debug` and
/// serde's `Serialize`/`Deserialize`, and gains a `name()` method, a
/// `Display` impl and an `ALL` slice listing every variant.
///
/// # Example
///
/// ```
/// use statewalk::state_enum;
///
/// state_enum! {
///     pub enum OrderState {
///         Placed,
///         Paid,
///         Shipped,
///     }
/// }
///
/// assert_eq!(OrderState::Paid.name(), "Paid");
/// assert_eq!(OrderState::Shipped.to_string(), "Shipped");
/// assert_eq!(OrderState::ALL.len(), 3);
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            #[allow(dead_code)]
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            #[allow(dead_code)]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}
