pub mod access;
pub mod admin;
pub mod ai;
pub mod booking;
pub mod bootstrap;
pub mod catalog;
pub mod guide;
pub mod identity;
pub mod payments;
pub mod pricing;
pub mod roles;
