//! Integration tests spanning the core and infrastructure crates

#[cfg(test)]
mod pipeline_integration;
