//! Common test utilities and helpers.
//!
//! This module provides shared functionality for all tests, including:
//! - Document fixture builders (PDF, DOCX, plain text)
//! - Assertions over anonymization results and output documents

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
