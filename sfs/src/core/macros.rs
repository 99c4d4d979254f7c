// SPDX-License-Identifier: MIT

/// Generates the `From` conversions between the layered error enums.
///
/// - `top`: each sub-error converts into the matching top-level variant
/// - `str_into`: `&'static str` converts into `Other(..)` of each listed type and of the top type
/// - `sub`: inter-layer conversions (`BlockIOError -> FsFormatterError::IO`, ...)
#[macro_export]
macro_rules! fs_error_wiring {
    (
        top => $top:ty {
            $($top_src:ty : $top_variant:ident),+ $(,)?
        },
        str_into => [ $($str_tgt:ty),* $(,)? ],
        sub => {
            $($src_sub:ty => [ $($dst_sub:ident::$dst_variant:ident),+ ] ),* $(,)?
        } $(,)?
    ) => {
        $(
            impl From<$top_src> for $top {
                #[inline]
                fn from(e: $top_src) -> Self { <$top>::$top_variant(e) }
            }
        )+

        $(
            impl From<&'static str> for $str_tgt {
                #[inline]
                fn from(msg: &'static str) -> Self { <$str_tgt>::Other(msg) }
            }
        )*
        impl From<&'static str> for $top {
            #[inline]
            fn from(msg: &'static str) -> Self { <$top>::Other(msg) }
        }

        $(
            $(
                impl From<$src_sub> for $dst_sub {
                    #[inline]
                    fn from(e: $src_sub) -> Self { <$dst_sub>::$dst_variant(e) }
                }
            )+
        )*
    };
}

/// Returns early with `$err.into()` unless `$cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

/// Returns early with `$err.into()`.
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}
