//! The backend for the OpsGuard workforce scheduling service.
//!
//! Guards submit availability and worked shifts; admins assign schedules
//! and reconcile hours and payment status. The interesting logic lives in
//! identity resolution ([models::user::User::resolve_reference]), the
//! per-key availability upsert ([models::availability::Availability::upsert]),
//! and the role checks in [auth].

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod util;
