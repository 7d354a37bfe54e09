#![no_std]

//! Logging facade shared by the workspace crates.
//!
//! The backend is picked by this crate's features, so callers only forward
//! their own `log` / `defmt` features here. `defmt` takes precedence when both
//! are enabled. With neither, the arguments are type checked and discarded.
//!
//! Format strings must stay within the subset both backends understand:
//! `{}` for integers and strings, `{:?}` for types implementing both `Debug`
//! and `defmt::Format`, and `{:#x}` for hex.

#[cfg(all(feature = "log", not(feature = "defmt")))]
#[doc(hidden)]
pub use log as __log;

#[cfg(feature = "defmt")]
#[doc(hidden)]
pub use defmt as __defmt;

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! trace {
    ($($args:tt)*) => {
        $crate::__defmt::trace!($($args)*)
    };
}

#[cfg(all(feature = "log", not(feature = "defmt")))]
#[macro_export]
macro_rules! trace {
    ($($args:tt)*) => {
        $crate::__log::trace!($($args)*)
    };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[macro_export]
macro_rules! trace {
    ($($args:tt)*) => {{
        let _ = ::core::format_args!($($args)*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! debug {
    ($($args:tt)*) => {
        $crate::__defmt::debug!($($args)*)
    };
}

#[cfg(all(feature = "log", not(feature = "defmt")))]
#[macro_export]
macro_rules! debug {
    ($($args:tt)*) => {
        $crate::__log::debug!($($args)*)
    };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[macro_export]
macro_rules! debug {
    ($($args:tt)*) => {{
        let _ = ::core::format_args!($($args)*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! info {
    ($($args:tt)*) => {
        $crate::__defmt::info!($($args)*)
    };
}

#[cfg(all(feature = "log", not(feature = "defmt")))]
#[macro_export]
macro_rules! info {
    ($($args:tt)*) => {
        $crate::__log::info!($($args)*)
    };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[macro_export]
macro_rules! info {
    ($($args:tt)*) => {{
        let _ = ::core::format_args!($($args)*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! warn {
    ($($args:tt)*) => {
        $crate::__defmt::warn!($($args)*)
    };
}

#[cfg(all(feature = "log", not(feature = "defmt")))]
#[macro_export]
macro_rules! warn {
    ($($args:tt)*) => {
        $crate::__log::warn!($($args)*)
    };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[macro_export]
macro_rules! warn {
    ($($args:tt)*) => {{
        let _ = ::core::format_args!($($args)*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! error {
    ($($args:tt)*) => {
        $crate::__defmt::error!($($args)*)
    };
}

#[cfg(all(feature = "log", not(feature = "defmt")))]
#[macro_export]
macro_rules! error {
    ($($args:tt)*) => {
        $crate::__log::error!($($args)*)
    };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[macro_export]
macro_rules! error {
    ($($args:tt)*) => {{
        let _ = ::core::format_args!($($args)*);
    }};
}
