//! Benchmark-only crate; see `benches/` for the criterion targets.
