//! tabkeeper: duplicate-view suppression for document workspaces.
//!
//! When a document that is already open somewhere is opened again, the
//! existing view is brought forward instead of loading a second copy.
//!
//! - [`registry`] caches which view shows which document.
//! - [`intercept`] decorates the host's open path with the dedupe policy.
//! - [`observe`] is the passive variant that corrects focus after the fact.
//! - [`plugin`] wires either mode into a [`host::Host`] and tears it down.

pub mod host;
pub mod intercept;
pub mod observe;
pub mod plugin;
pub mod registry;
pub mod scenario;
pub mod workspace;
