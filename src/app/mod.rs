//! Application shell for the stellar parameters view.
//!
//! | Sub-module       | Responsibility |
//! | ---------------- | -------------- |
//! | [`stellar_app`]  | [`StellarViewApp`] (eframe) owning the session, tab state and panels |
//! | [`run`]          | Top-level [`run_stellar_view()`] entry point |

mod run;
mod stellar_app;

pub use run::run_stellar_view;
pub use stellar_app::StellarViewApp;
