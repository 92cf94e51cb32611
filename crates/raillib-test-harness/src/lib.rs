//! raillib-test-harness: Test utilities for raillib.
//!
//! This crate provides [`MockTransport`], a scripted byte stream standing in
//! for a Base connection, and [`MockCodec`], a table-driven
//! [`CommandCodec`](raillib_core::CommandCodec) for tests that push TMCC
//! commands through pass-through frames.

pub mod mock_codec;
pub mod mock_transport;

pub use mock_codec::MockCodec;
pub use mock_transport::MockTransport;
