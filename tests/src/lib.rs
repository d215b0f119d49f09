//! # Kestrel-Chain Test Suite
//!
//! Cross-crate scenarios that need more than one subsystem, usually more
//! than one node.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Multi-node scenarios over in-process channels
//!     ├── sync.rs       # Catching up and reorganising across nodes
//!     ├── relay.rs      # Block and transaction propagation
//!     ├── misbehaviour.rs
//!     └── light_sync.rs # Chain proof path
//!
//! tests/benches/        # Criterion benchmarks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p kc-tests
//! cargo test -p kc-tests integration::relay
//! cargo bench -p kc-tests
//! ```

pub mod integration;
