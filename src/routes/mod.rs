/**
 * Routes Module
 * API route handlers
 */

pub mod categories;
pub mod health;
pub mod items;
pub mod profile;
pub mod shares;
pub mod wishlists;
