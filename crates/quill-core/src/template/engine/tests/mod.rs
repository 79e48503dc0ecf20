//! Tests for template engine
//!
//! This module contains comprehensive tests for the template engine,
//! organized into focused submodules for better maintainability.

use super::*;

// Test helper functions
mod helpers;

// TokenStream and parser tests
mod parser;
mod tokenstream;

mod render_escaping;
