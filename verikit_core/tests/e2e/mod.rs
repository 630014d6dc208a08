//! E2E Tests for VeriKit
//!
//! End-to-end tests organized by waves.
